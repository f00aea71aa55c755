//! Clipsmith API server binary.
//!
//! Exit codes: 0 clean exit, 1 configuration error, 2 unrecoverable runtime
//! error, 130 cancelled by signal.

use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use clipsmith_api::{create_router, ApiConfig, AppState};
use clipsmith_media::ArtifactStore;
use clipsmith_worker::{Coordinator, CoordinatorConfig, Pipeline};

const EXIT_CONFIG: i32 = 1;
const EXIT_RUNTIME: i32 = 2;
const EXIT_SIGNAL: i32 = 130;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    init_tracing();

    // Required external tools are a startup-time configuration concern
    if let Err(err) = clipsmith_media::check_ffmpeg() {
        error!("{err}");
        std::process::exit(EXIT_CONFIG);
    }
    if let Err(err) = clipsmith_media::check_ffprobe() {
        error!("{err}");
        std::process::exit(EXIT_CONFIG);
    }
    if clipsmith_media::check_ytdlp().is_err() {
        info!("yt-dlp not found; /fetch will be unavailable");
    }

    let hardware = clipsmith_engine::hardware::profile();

    let store = ArtifactStore::from_env();
    if let Err(err) = store.ensure_layout().await {
        error!(error = %err, "Failed to create artifact directories");
        std::process::exit(EXIT_CONFIG);
    }

    let pipeline = match Pipeline::from_env() {
        Ok(pipeline) => pipeline,
        Err(err) => {
            error!(error = %err, "Failed to build pipeline");
            std::process::exit(EXIT_CONFIG);
        }
    };

    let coordinator = Coordinator::new(
        CoordinatorConfig::from_env(hardware.processing_concurrency),
        store.clone(),
        Arc::new(pipeline),
    );
    coordinator.start();

    let config = ApiConfig::from_env();
    let addr = config.bind_addr();
    let state = AppState::new(config, store, coordinator);
    let router = create_router(state);

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err) => {
            error!(addr = %addr, error = %err, "Failed to bind");
            std::process::exit(EXIT_RUNTIME);
        }
    };

    info!(addr = %addr, "Clipsmith API listening");

    let serve = axum::serve(listener, router).with_graceful_shutdown(async {
        tokio::signal::ctrl_c().await.ok();
        info!("Received shutdown signal");
    });

    match serve.await {
        Ok(()) => {
            info!("Shutdown complete");
            std::process::exit(EXIT_SIGNAL);
        }
        Err(err) => {
            error!(error = %err, "Server error");
            std::process::exit(EXIT_RUNTIME);
        }
    }
}

fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,clipsmith=info"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(true).with_target(true))
            .with(env_filter)
            .init();
    }
}

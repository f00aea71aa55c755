//! One-time hardware probe.
//!
//! The profile is chosen once at startup and stays immutable for the process
//! lifetime; every job snapshots it verbatim.

use std::sync::OnceLock;

use tracing::info;

use clipsmith_models::{HardwareProfile, Precision};

static PROFILE: OnceLock<HardwareProfile> = OnceLock::new();

/// Detect (once) the hardware profile for this process.
pub fn profile() -> &'static HardwareProfile {
    PROFILE.get_or_init(|| {
        let profile = detect();
        info!(
            accelerator = profile.accelerator,
            decoder_model = %profile.decoder_model,
            precision = %profile.precision.as_str(),
            video_codec = %profile.video_codec,
            concurrency = profile.processing_concurrency,
            renders = profile.max_parallel_renders,
            "Hardware profile selected"
        );
        profile
    })
}

fn detect() -> HardwareProfile {
    let accelerator = accelerator_present();

    let mut profile = if accelerator {
        HardwareProfile {
            accelerator: true,
            decoder_model: "medium".to_string(),
            retry_model: "large".to_string(),
            precision: Precision::Float16,
            video_codec: "h264_nvenc".to_string(),
            processing_concurrency: 2,
            max_parallel_renders: if accelerator_memory_gb() >= 16 { 6 } else { 3 },
        }
    } else {
        HardwareProfile::cpu()
    };

    // Env knobs win over detection
    if let Ok(model) = std::env::var("TRANSCRIBER_MODEL") {
        profile.decoder_model = model;
    }
    if let Ok(model) = std::env::var("RETRY_MODEL") {
        profile.retry_model = model;
    }
    if let Some(n) = env_usize("PROCESSING_CONCURRENCY") {
        profile.processing_concurrency = n.max(1);
    }
    if let Some(n) = env_usize("MAX_PARALLEL_RENDERS") {
        profile.max_parallel_renders = n.max(1);
    }

    profile
}

fn env_usize(key: &str) -> Option<usize> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}

/// Whether an NVIDIA accelerator is visible. `CLIPSMITH_FORCE_CPU=1`
/// overrides for deterministic test environments.
fn accelerator_present() -> bool {
    if std::env::var("CLIPSMITH_FORCE_CPU").is_ok() {
        return false;
    }
    which::which("nvidia-smi").is_ok()
}

/// Best-effort accelerator memory estimate in GiB (0 when unknown).
fn accelerator_memory_gb() -> u64 {
    std::process::Command::new("nvidia-smi")
        .args(["--query-gpu=memory.total", "--format=csv,noheader,nounits"])
        .output()
        .ok()
        .and_then(|out| {
            String::from_utf8_lossy(&out.stdout)
                .lines()
                .next()
                .and_then(|l| l.trim().parse::<u64>().ok())
        })
        .map(|mib| mib / 1024)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cpu_profile_defaults() {
        let profile = HardwareProfile::cpu();
        assert!(!profile.accelerator);
        assert_eq!(profile.precision, Precision::Int8);
        assert_eq!(profile.processing_concurrency, 1);
        assert_eq!(profile.max_parallel_renders, 2);
        assert_eq!(profile.video_codec, "libx264");
    }

    #[test]
    fn test_profile_is_stable() {
        let first = profile() as *const _;
        let second = profile() as *const _;
        assert_eq!(first, second);
    }
}

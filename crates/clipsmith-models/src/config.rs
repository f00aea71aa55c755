//! Per-job configuration snapshot.
//!
//! A job freezes every knob it depends on at enqueue time so re-running the
//! same source with the same options reproduces the same selection, and so
//! `metadata.json` records exactly what produced the clips.

use serde::{Deserialize, Serialize};

use crate::ProcessOptions;

/// Decoder compute precision, chosen once per process by the hardware probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Precision {
    Float16,
    Int8,
}

impl Precision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Precision::Float16 => "float16",
            Precision::Int8 => "int8",
        }
    }
}

/// The immutable hardware profile chosen at startup (§5). Included verbatim
/// in every job's config snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HardwareProfile {
    /// True when an accelerator was detected
    pub accelerator: bool,
    /// Decoder model for the primary pass
    pub decoder_model: String,
    /// Larger decoder model for the retry pass
    pub retry_model: String,
    /// Decoder compute precision
    pub precision: Precision,
    /// Renderer video codec (hardware encoder when available)
    pub video_codec: String,
    /// Process-wide worker count
    pub processing_concurrency: usize,
    /// Per-job renderer pool size
    pub max_parallel_renders: usize,
}

impl HardwareProfile {
    /// Conservative CPU-only profile, used as the fallback.
    pub fn cpu() -> Self {
        Self {
            accelerator: false,
            decoder_model: "medium".to_string(),
            retry_model: "large".to_string(),
            precision: Precision::Int8,
            video_codec: "libx264".to_string(),
            processing_concurrency: 1,
            max_parallel_renders: 2,
        }
    }
}

/// Vertical placement of the hook overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum HookPosition {
    Top,
    #[default]
    Center,
    Bottom,
}

/// Encoding target for rendered clips.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderTarget {
    pub width: u32,
    pub height: u32,
    pub video_codec: String,
    pub audio_codec: String,
    pub video_bitrate: String,
    pub audio_bitrate: String,
}

impl Default for RenderTarget {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            video_codec: "libx264".to_string(),
            audio_codec: "aac".to_string(),
            video_bitrate: "4M".to_string(),
            audio_bitrate: "192k".to_string(),
        }
    }
}

/// Hook overlay rendering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HookSettings {
    pub enabled: bool,
    /// Seconds the overlay is visible from clip start
    pub duration: f64,
    pub position: HookPosition,
    pub font_size: u32,
    pub font_color: String,
    pub box_color: String,
}

impl Default for HookSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            duration: 4.0,
            position: HookPosition::Center,
            font_size: 48,
            font_color: "white".to_string(),
            box_color: "black@0.6".to_string(),
        }
    }
}

/// Silence compaction settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SilenceSettings {
    pub enabled: bool,
    /// Silence threshold in dBFS
    pub threshold_db: f64,
    /// Minimum silence duration to remove, seconds
    pub min_silence: f64,
    /// Padding preserved on each side of speech, seconds
    pub padding: f64,
}

impl Default for SilenceSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            threshold_db: -35.0,
            min_silence: 0.4,
            padding: 0.05,
        }
    }
}

/// The full per-job config snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    /// Request options as submitted
    pub options: ProcessOptions,

    /// Minimum clip duration in seconds (≥ 5 by contract)
    pub clip_min: f64,
    /// Maximum clip duration in seconds
    pub clip_max: f64,
    /// Minimum number of clips a completed job must produce
    pub min_clips_floor: usize,
    /// Maximum number of clips selected
    pub max_clips: usize,
    /// Minimum viral score for selection before the fallback ladder
    pub min_viral: f64,

    pub render: RenderTarget,
    pub hook: HookSettings,
    pub silence: SilenceSettings,

    /// Per-job renderer pool size
    pub max_parallel_renders: usize,

    /// The process-wide hardware profile, verbatim
    pub hardware: HardwareProfile,
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(default)
}

impl ConfigSnapshot {
    /// Build a snapshot from environment knobs, the hardware profile and the
    /// request options. The configured minimum is clamped to 5 s.
    pub fn from_env(options: ProcessOptions, hardware: HardwareProfile) -> Self {
        let (default_w, default_h) = options.aspect_ratio.default_dimensions();
        Self {
            options,
            clip_min: env_parse("CLIP_MIN", 9.0_f64).max(5.0),
            clip_max: env_parse("CLIP_MAX", 50.0),
            min_clips_floor: env_parse("MIN_CLIPS_FLOOR", 5),
            max_clips: env_parse("MAX_CLIPS", 20),
            min_viral: env_parse("MIN_VIRAL", 0.08),
            render: RenderTarget {
                width: env_parse("TARGET_WIDTH", default_w),
                height: env_parse("TARGET_HEIGHT", default_h),
                video_codec: hardware.video_codec.clone(),
                audio_codec: "aac".to_string(),
                video_bitrate: std::env::var("VIDEO_BITRATE").unwrap_or_else(|_| "4M".to_string()),
                audio_bitrate: std::env::var("AUDIO_BITRATE").unwrap_or_else(|_| "192k".to_string()),
            },
            hook: HookSettings {
                enabled: env_bool("HOOK_ENABLED", true),
                duration: env_parse("HOOK_DURATION", 4.0),
                position: match std::env::var("HOOK_POSITION").as_deref() {
                    Ok("top") => HookPosition::Top,
                    Ok("bottom") => HookPosition::Bottom,
                    _ => HookPosition::Center,
                },
                ..HookSettings::default()
            },
            silence: SilenceSettings {
                enabled: env_bool("SILENCE_REMOVAL", false),
                threshold_db: env_parse("SILENCE_DB", -35.0),
                min_silence: env_parse("MIN_SILENCE", 0.4),
                padding: env_parse("SILENCE_PAD", 0.05),
            },
            max_parallel_renders: env_parse("MAX_PARALLEL_RENDERS", hardware.max_parallel_renders),
            hardware,
        }
    }
}

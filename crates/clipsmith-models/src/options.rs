//! Per-request processing options.

use serde::{Deserialize, Serialize};

/// Requested duration class for output clips.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DurationClass {
    /// 9–15 s
    Short,
    /// 18–22 s
    Medium,
    /// 28–32 s
    Long,
    /// 40–50 s
    Extended,
    /// No duration preference
    #[default]
    Any,
}

impl DurationClass {
    /// The nominal `[min, max]` range in seconds, `None` for `Any`.
    pub fn range(&self) -> Option<(f64, f64)> {
        match self {
            DurationClass::Short => Some((9.0, 15.0)),
            DurationClass::Medium => Some((18.0, 22.0)),
            DurationClass::Long => Some((28.0, 32.0)),
            DurationClass::Extended => Some((40.0, 50.0)),
            DurationClass::Any => None,
        }
    }

    /// Whether `duration` fits this class with a ±10% tolerance.
    pub fn admits(&self, duration: f64) -> bool {
        match self.range() {
            Some((min, max)) => duration >= min * 0.9 && duration <= max * 1.1,
            None => true,
        }
    }
}

/// Content style steering the scorer's style bonus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ClipStyle {
    Funny,
    Educational,
    Dramatic,
    Controversial,
    #[default]
    Balanced,
}

/// Output aspect ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AspectRatio {
    #[default]
    Landscape,
    Portrait,
}

impl AspectRatio {
    /// Default pixel dimensions for this aspect.
    pub fn default_dimensions(&self) -> (u32, u32) {
        match self {
            AspectRatio::Landscape => (1920, 1080),
            AspectRatio::Portrait => (1080, 1920),
        }
    }
}

/// Options submitted with a process request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessOptions {
    /// Language hint for the decoder ("auto" lets the decoder pick)
    #[serde(default = "default_language")]
    pub language: String,

    #[serde(default)]
    pub target_duration: DurationClass,

    #[serde(default)]
    pub style: ClipStyle,

    /// Render the opening-hook overlay
    #[serde(default)]
    pub use_hook: bool,

    /// Emit a timed-caption sidecar per clip
    #[serde(default)]
    pub auto_caption: bool,

    #[serde(default)]
    pub aspect_ratio: AspectRatio,
}

fn default_language() -> String {
    "auto".to_string()
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            language: default_language(),
            target_duration: DurationClass::Any,
            style: ClipStyle::Balanced,
            use_hook: false,
            auto_caption: false,
            aspect_ratio: AspectRatio::Landscape,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_class_tolerance() {
        // Medium is 18-22 with ±10%
        assert!(DurationClass::Medium.admits(18.0));
        assert!(DurationClass::Medium.admits(16.2));
        assert!(DurationClass::Medium.admits(24.2));
        assert!(!DurationClass::Medium.admits(16.0));
        assert!(!DurationClass::Medium.admits(25.0));
        assert!(DurationClass::Any.admits(120.0));
    }

    #[test]
    fn test_options_defaults() {
        let opts: ProcessOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(opts.language, "auto");
        assert_eq!(opts.target_duration, DurationClass::Any);
        assert!(!opts.use_hook);
    }

    #[test]
    fn test_aspect_dimensions() {
        assert_eq!(AspectRatio::Portrait.default_dimensions(), (1080, 1920));
    }
}

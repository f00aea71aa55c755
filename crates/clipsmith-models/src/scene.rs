//! Visual scenes produced by the analyzer.

use serde::{Deserialize, Serialize};

/// A detected (or synthesized) visual scene with its per-scene signals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scene {
    /// Start time in seconds
    pub start: f64,

    /// End time in seconds
    pub end: f64,

    /// Mean face presence in [0, 1] (detected faces / 2, clipped)
    pub face_ratio: f64,

    /// Mean inter-frame motion mapped to [0, 1]
    pub motion: f64,

    /// Brightness quality score in [0, 1], peaking at mid-gray
    pub brightness: f64,

    /// True when this boundary was fabricated to cover a monolog source
    #[serde(default)]
    pub synthetic: bool,
}

impl Scene {
    pub fn duration(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }

    /// A synthetic talking-head scene covering `[start, end]` with the
    /// monolog prior signals.
    pub fn synthetic(start: f64, end: f64) -> Self {
        Self {
            start,
            end,
            face_ratio: 1.0,
            motion: 0.3,
            brightness: 0.6,
            synthetic: true,
        }
    }
}

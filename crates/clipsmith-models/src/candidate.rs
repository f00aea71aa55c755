//! Scored candidate segments.

use serde::{Deserialize, Serialize};

use crate::Scene;

/// Per-axis audio scores for a candidate, each in [0, 1] unless noted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AudioScores {
    pub hook: f64,
    pub emotional: f64,
    pub controversial: f64,
    pub educational: f64,
    pub entertaining: f64,
    pub money: f64,
    pub urgency: f64,
    /// Subtracted from engagement; capped at 0.4
    pub filler_penalty: f64,
    /// Weighted composite, clipped to [0, 1]
    pub engagement: f64,
    pub has_question: bool,
    pub has_number: bool,
    pub has_exclamation: bool,
}

/// Visual roll-up of the candidate's scene.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VisualScores {
    pub face_ratio: f64,
    pub motion: f64,
    pub brightness: f64,
    /// Weighted composite with closeup/motion bonuses, clipped to [0, 1]
    pub engagement: f64,
    /// Lineage flag: signals came from the monolog prior
    #[serde(default)]
    pub synthetic: bool,
}

impl VisualScores {
    /// Roll up a scene's raw signals; the composite is filled by the scorer.
    pub fn from_scene(scene: &Scene) -> Self {
        Self {
            face_ratio: scene.face_ratio,
            motion: scene.motion,
            brightness: scene.brightness,
            engagement: 0.0,
            synthetic: scene.synthetic,
        }
    }
}

/// Candidate category, the dominant content axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Educational,
    Entertaining,
    Emotional,
    Controversial,
    #[default]
    Balanced,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Educational => "educational",
            Category::Entertaining => "entertaining",
            Category::Emotional => "emotional",
            Category::Controversial => "controversial",
            Category::Balanced => "balanced",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A generated opening-hook overlay for a candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HookRecord {
    /// The overlay text
    pub text: String,
    /// Detected theme label
    pub theme: String,
    /// Generator confidence in [0, 1]
    pub confidence: f64,
    /// The source fragment the hook was built from
    pub source_fragment: String,
}

/// One merged scene-and-speech window, scored and ready for selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    /// Start time in seconds (inherited from the scene, not the speech union)
    pub start: f64,

    /// End time in seconds
    pub end: f64,

    /// Concatenated text of overlapping speech, time-ordered
    pub text: String,

    /// Visual roll-up
    pub visual: VisualScores,

    /// Audio roll-up
    pub audio: AudioScores,

    /// Composite viral score in [0, 1]
    pub viral_score: f64,

    /// Dominant content category
    pub category: Category,

    /// Deterministic human-readable scoring rationale
    pub rationale: String,

    /// True when the candidate passes all context-completeness rules
    pub context_complete: bool,

    /// Optional opening-hook overlay
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hook: Option<HookRecord>,

    /// True when selected only to satisfy the minimum-output floor
    #[serde(default)]
    pub fallback: bool,
}

impl Candidate {
    pub fn duration(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }

    /// Length of the time intersection with another candidate, in seconds.
    pub fn overlap_with(&self, other: &Candidate) -> f64 {
        (self.end.min(other.end) - self.start.max(other.start)).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(start: f64, end: f64) -> Candidate {
        Candidate {
            start,
            end,
            text: String::new(),
            visual: VisualScores::default(),
            audio: AudioScores::default(),
            viral_score: 0.0,
            category: Category::Balanced,
            rationale: String::new(),
            context_complete: false,
            hook: None,
            fallback: false,
        }
    }

    #[test]
    fn test_overlap() {
        let a = candidate(0.0, 10.0);
        let b = candidate(9.0, 20.0);
        let c = candidate(30.0, 40.0);
        assert!((a.overlap_with(&b) - 1.0).abs() < 1e-9);
        assert!(a.overlap_with(&c).abs() < 1e-9);
    }

    #[test]
    fn test_category_serde() {
        let json = serde_json::to_string(&Category::Educational).unwrap();
        assert_eq!(json, "\"educational\"");
    }
}

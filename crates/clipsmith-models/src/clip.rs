//! Rendered clips and viral tiers.

use serde::{Deserialize, Serialize};

use crate::{Candidate, Category};

/// Coarse bucketing of the viral score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViralTier {
    High,
    Medium,
    Low,
}

impl ViralTier {
    /// Bucket a composite score: high ≥ 0.75, medium ≥ 0.5, low otherwise.
    pub fn from_score(score: f64) -> Self {
        if score >= 0.75 {
            ViralTier::High
        } else if score >= 0.5 {
            ViralTier::Medium
        } else {
            ViralTier::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ViralTier::High => "high",
            ViralTier::Medium => "medium",
            ViralTier::Low => "low",
        }
    }
}

/// A candidate that has been rendered to an output file.
///
/// `start_seconds`/`end_seconds` always record the pre-compaction source
/// range; silence compaction only shortens the rendered file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Clip {
    /// 1-indexed position in clip time order
    pub index: u32,

    /// Output filename (relative to the job's output directory)
    pub file: String,

    pub start_seconds: f64,
    pub end_seconds: f64,
    pub duration_seconds: f64,

    /// Duration of the rendered file (differs from `duration_seconds` when
    /// silence compaction removed material)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rendered_duration: Option<f64>,

    pub viral_score: f64,
    pub viral_tier: ViralTier,
    pub category: Category,
    pub rationale: String,
    pub context_complete: bool,

    #[serde(default)]
    pub fallback: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub hook_text: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption_file: Option<String>,
}

impl Clip {
    /// Build a clip record from a selected candidate, before rendering.
    pub fn from_candidate(index: u32, file: impl Into<String>, candidate: &Candidate) -> Self {
        Self {
            index,
            file: file.into(),
            start_seconds: candidate.start,
            end_seconds: candidate.end,
            duration_seconds: candidate.duration(),
            rendered_duration: None,
            viral_score: candidate.viral_score,
            viral_tier: ViralTier::from_score(candidate.viral_score),
            category: candidate.category,
            rationale: candidate.rationale.clone(),
            context_complete: candidate.context_complete,
            fallback: candidate.fallback,
            hook_text: candidate.hook.as_ref().map(|h| h.text.clone()),
            caption_file: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_buckets() {
        assert_eq!(ViralTier::from_score(0.9), ViralTier::High);
        assert_eq!(ViralTier::from_score(0.75), ViralTier::High);
        assert_eq!(ViralTier::from_score(0.6), ViralTier::Medium);
        assert_eq!(ViralTier::from_score(0.5), ViralTier::Medium);
        assert_eq!(ViralTier::from_score(0.1), ViralTier::Low);
    }
}

//! Timestamped speech segments produced by the transcriber.

use serde::{Deserialize, Serialize};

/// Maximum tolerated overlap between adjacent segments, in seconds.
/// Anything beyond this is resolved by truncating the earlier segment.
pub const MAX_SEGMENT_OVERLAP: f64 = 0.05;

/// A single decoded speech segment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechSegment {
    /// Start time in seconds, relative to the source
    pub start: f64,

    /// End time in seconds, relative to the source
    pub end: f64,

    /// Decoded text, trimmed
    pub text: String,

    /// Decoder confidence in [0, 1]
    pub confidence: f64,

    /// BCP-47-ish language tag reported by the decoder
    pub language: String,
}

impl SpeechSegment {
    pub fn new(start: f64, end: f64, text: impl Into<String>, confidence: f64) -> Self {
        Self {
            start,
            end,
            text: text.into(),
            confidence: confidence.clamp(0.0, 1.0),
            language: String::new(),
        }
    }

    /// A placeholder segment standing in for a failed decode window.
    pub fn placeholder(start: f64, end: f64) -> Self {
        Self::new(start, end, "", 0.0)
    }

    /// True when this segment carries no decoded text.
    pub fn is_placeholder(&self) -> bool {
        self.text.trim().is_empty()
    }

    pub fn duration(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }

    /// Length of the intersection with `[start, end]`, in seconds.
    pub fn overlap_with(&self, start: f64, end: f64) -> f64 {
        (self.end.min(end) - self.start.max(start)).max(0.0)
    }
}

/// Normalize a decoded segment list: sort by start, drop whitespace-only
/// entries, and resolve overlaps exceeding [`MAX_SEGMENT_OVERLAP`] by
/// truncating the earlier segment's end.
pub fn normalize_segments(mut segments: Vec<SpeechSegment>) -> Vec<SpeechSegment> {
    segments.retain(|s| !s.text.trim().is_empty());
    segments.sort_by(|a, b| a.start.partial_cmp(&b.start).unwrap_or(std::cmp::Ordering::Equal));

    for i in 1..segments.len() {
        let prev_end = segments[i - 1].end;
        let cur_start = segments[i].start;
        if prev_end - cur_start > MAX_SEGMENT_OVERLAP {
            segments[i - 1].end = cur_start;
        }
    }

    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlap_with() {
        let seg = SpeechSegment::new(10.0, 20.0, "hello", 0.9);
        assert!((seg.overlap_with(15.0, 25.0) - 5.0).abs() < 1e-9);
        assert!((seg.overlap_with(0.0, 5.0)).abs() < 1e-9);
        assert!((seg.overlap_with(0.0, 30.0) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_normalize_drops_empty() {
        let segments = vec![
            SpeechSegment::new(0.0, 2.0, "  ", 0.8),
            SpeechSegment::new(2.0, 4.0, "kept", 0.8),
        ];
        let out = normalize_segments(segments);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].text, "kept");
    }

    #[test]
    fn test_normalize_truncates_overlap() {
        let segments = vec![
            SpeechSegment::new(0.0, 5.0, "first", 0.8),
            SpeechSegment::new(4.0, 8.0, "second", 0.8),
        ];
        let out = normalize_segments(segments);
        assert!((out[0].end - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_normalize_keeps_small_overlap() {
        let segments = vec![
            SpeechSegment::new(0.0, 5.0, "first", 0.8),
            SpeechSegment::new(4.97, 8.0, "second", 0.8),
        ];
        let out = normalize_segments(segments);
        // 30ms overlap is within tolerance
        assert!((out[0].end - 5.0).abs() < 1e-9);
    }
}

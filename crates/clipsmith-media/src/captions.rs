//! Timed-caption sidecars (SRT).
//!
//! Each record: a 1-indexed counter, an `HH:MM:SS,mmm --> HH:MM:SS,mmm`
//! line, one or more text lines and a blank terminator. Timestamps are
//! clip-local.

use std::path::Path;

use clipsmith_models::{
    format_srt_timestamp, parse_srt_timestamp, SpeechSegment,
};

use crate::error::MediaResult;

/// Minimum on-screen duration for a caption entry, seconds.
const MIN_ENTRY_SECONDS: f64 = 0.15;

/// A single caption record with clip-local timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionEntry {
    pub index: u32,
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// Build caption entries for a clip covering `[clip_start, clip_end]` of the
/// source. Segment timestamps are re-based to clip-local time and clamped to
/// the clip range; entries shorter than 150 ms are skipped.
pub fn build_entries(
    clip_start: f64,
    clip_end: f64,
    segments: &[SpeechSegment],
) -> Vec<CaptionEntry> {
    let mut entries = Vec::new();

    for segment in segments {
        if segment.end <= clip_start || segment.start >= clip_end {
            continue;
        }
        let text = segment.text.trim();
        if text.is_empty() {
            continue;
        }

        let relative_start = segment.start.max(clip_start) - clip_start;
        let relative_end = segment.end.min(clip_end) - clip_start;
        if relative_end - relative_start < MIN_ENTRY_SECONDS {
            continue;
        }

        entries.push(CaptionEntry {
            index: entries.len() as u32 + 1,
            start: relative_start,
            end: relative_end,
            text: text.to_string(),
        });
    }

    entries
}

/// Serialize entries to SRT text.
pub fn to_srt(entries: &[CaptionEntry]) -> String {
    let mut out = String::new();
    for entry in entries {
        out.push_str(&format!(
            "{}\n{} --> {}\n{}\n\n",
            entry.index,
            format_srt_timestamp(entry.start),
            format_srt_timestamp(entry.end),
            entry.text
        ));
    }
    out
}

/// Write an SRT sidecar file.
pub async fn write_srt(path: &Path, entries: &[CaptionEntry]) -> MediaResult<()> {
    tokio::fs::write(path, to_srt(entries)).await?;
    Ok(())
}

/// Parse SRT text back into caption entries. Tolerates CRLF and multi-line
/// payloads (joined with a single space).
pub fn parse_srt(content: &str) -> Vec<CaptionEntry> {
    let mut entries = Vec::new();

    for block in content.replace("\r\n", "\n").split("\n\n") {
        let mut lines = block.lines().filter(|l| !l.trim().is_empty());
        let Some(index_line) = lines.next() else { continue };
        let Ok(index) = index_line.trim().parse::<u32>() else {
            continue;
        };
        let Some(time_line) = lines.next() else { continue };
        let Some((start_s, end_s)) = time_line.split_once("-->") else {
            continue;
        };
        let (Some(start), Some(end)) = (
            parse_srt_timestamp(start_s.trim()),
            parse_srt_timestamp(end_s.trim()),
        ) else {
            continue;
        };
        let text = lines.collect::<Vec<_>>().join(" ");
        if text.is_empty() {
            continue;
        }
        entries.push(CaptionEntry { index, start, end, text });
    }

    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(start: f64, end: f64, text: &str) -> SpeechSegment {
        SpeechSegment::new(start, end, text, 0.9)
    }

    #[test]
    fn test_build_entries_rebased() {
        let segments = vec![
            seg(8.0, 12.0, "before and into"),
            seg(12.0, 16.0, "fully inside"),
            seg(19.5, 25.0, "tail"),
            seg(30.0, 35.0, "past the clip"),
        ];
        let entries = build_entries(10.0, 20.0, &segments);
        assert_eq!(entries.len(), 3);
        assert!((entries[0].start - 0.0).abs() < 1e-9);
        assert!((entries[0].end - 2.0).abs() < 1e-9);
        assert!((entries[1].start - 2.0).abs() < 1e-9);
        assert!((entries[2].end - 10.0).abs() < 1e-9);
        assert_eq!(entries[2].index, 3);
    }

    #[test]
    fn test_build_entries_skips_tiny() {
        let segments = vec![seg(9.95, 10.05, "blip")];
        assert!(build_entries(10.0, 20.0, &segments).is_empty());
    }

    #[test]
    fn test_srt_round_trip() {
        let segments = vec![seg(11.0, 14.2, "hello world"), seg(15.0, 18.5, "again")];
        let entries = build_entries(10.0, 20.0, &segments);
        let srt = to_srt(&entries);
        let parsed = parse_srt(&srt);
        assert_eq!(parsed.len(), entries.len());
        for (a, b) in entries.iter().zip(parsed.iter()) {
            assert_eq!(a.index, b.index);
            assert_eq!(a.text, b.text);
            assert!((a.start - b.start).abs() < 0.001);
            assert!((a.end - b.end).abs() < 0.001);
        }
    }

    #[test]
    fn test_srt_format_shape() {
        let entries = vec![CaptionEntry {
            index: 1,
            start: 0.5,
            end: 2.0,
            text: "line".to_string(),
        }];
        let srt = to_srt(&entries);
        assert!(srt.starts_with("1\n00:00:00,500 --> 00:00:02,000\nline\n\n"));
    }
}

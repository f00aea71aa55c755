//! Silence detection and compaction.
//!
//! Detection runs ffmpeg's `silencedetect` filter over the cut range and
//! parses its stderr report. Compaction concatenates the remaining speaking
//! segments with a trim/atrim/concat filter graph, trimming silence at the
//! head and tail and leaving a small padding around preserved speech.

use std::path::Path;

use regex::Regex;
use tracing::debug;

use clipsmith_models::SilenceSettings;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::MediaResult;

/// A detected silent span.
#[derive(Debug, Clone, PartialEq)]
pub struct SilenceSpan {
    pub start: f64,
    pub end: f64,
}

impl SilenceSpan {
    pub fn duration(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }
}

/// A span of preserved speech, relative to the cut.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeakingSpan {
    pub start: f64,
    pub end: f64,
}

impl SpeakingSpan {
    pub fn duration(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }
}

/// Run silencedetect over `[start, start+duration]` of `input`.
pub async fn detect_silences(
    input: &Path,
    start: f64,
    duration: f64,
    settings: &SilenceSettings,
) -> MediaResult<Vec<SilenceSpan>> {
    let cmd = FfmpegCommand::analysis(input)
        .seek(start)
        .duration(duration)
        .audio_filter(format!(
            "silencedetect=noise={}dB:d={}",
            settings.threshold_db, settings.min_silence
        ));

    let stderr = FfmpegRunner::new()
        .with_log_level("info")
        .with_timeout(120)
        .run_capturing(&cmd)
        .await?;

    let spans = parse_silencedetect(&stderr);
    debug!(
        count = spans.len(),
        start, duration, "Silence detection complete"
    );
    Ok(spans)
}

/// Parse ffmpeg silencedetect stderr output into spans.
pub fn parse_silencedetect(stderr: &str) -> Vec<SilenceSpan> {
    let start_re = Regex::new(r"silence_start:\s*([0-9.]+)").unwrap();
    let end_re = Regex::new(r"silence_end:\s*([0-9.]+)").unwrap();

    let mut spans = Vec::new();
    let mut current_start: Option<f64> = None;

    for line in stderr.lines() {
        if let Some(caps) = start_re.captures(line) {
            current_start = caps[1].parse().ok();
        } else if let Some(caps) = end_re.captures(line) {
            if let (Some(start), Ok(end)) = (current_start.take(), caps[1].parse::<f64>()) {
                if end > start {
                    spans.push(SilenceSpan { start, end });
                }
            }
        }
    }

    spans
}

/// Convert silence spans into the speaking spans to keep.
///
/// Padding is preserved on each side of speech; silence at the head and tail
/// of the cut is trimmed entirely. Returns the full range when nothing was
/// detected.
pub fn speaking_spans(
    silences: &[SilenceSpan],
    total_duration: f64,
    settings: &SilenceSettings,
) -> Vec<SpeakingSpan> {
    if silences.is_empty() {
        return vec![SpeakingSpan {
            start: 0.0,
            end: total_duration,
        }];
    }

    let pad = settings.padding;
    let mut spans = Vec::new();
    let mut cursor = 0.0_f64;

    for (i, silence) in silences.iter().enumerate() {
        let head = i == 0 && silence.start <= f64::EPSILON;
        if !head && silence.start > cursor {
            let end = (silence.start + pad).min(total_duration);
            if end > cursor {
                spans.push(SpeakingSpan { start: cursor, end });
            }
        }
        cursor = cursor.max(silence.end - pad);
        if i == 0 && head {
            // Head silence is trimmed without padding
            cursor = silence.end;
        }
    }

    if cursor < total_duration {
        let tail_is_silent = silences
            .last()
            .map(|s| s.end >= total_duration - 0.01)
            .unwrap_or(false);
        if !tail_is_silent {
            spans.push(SpeakingSpan {
                start: cursor,
                end: total_duration,
            });
        }
    }

    spans.retain(|s| s.duration() > 0.01);
    spans
}

/// Build the trim/atrim/concat filter graph for the speaking spans.
pub fn build_compaction_filter(spans: &[SpeakingSpan]) -> String {
    let mut parts = Vec::new();
    let mut concat_inputs = String::new();

    for (i, span) in spans.iter().enumerate() {
        parts.push(format!(
            "[0:v]trim=start={:.3}:end={:.3},setpts=PTS-STARTPTS[v{i}];",
            span.start, span.end
        ));
        parts.push(format!(
            "[0:a]atrim=start={:.3}:end={:.3},asetpts=PTS-STARTPTS[a{i}];",
            span.start, span.end
        ));
        concat_inputs.push_str(&format!("[v{i}][a{i}]"));
    }

    format!(
        "{}{}concat=n={}:v=1:a=1[outv][outa]",
        parts.concat(),
        concat_inputs,
        spans.len()
    )
}

/// Total duration of the compacted output.
pub fn compacted_duration(spans: &[SpeakingSpan]) -> f64 {
    spans.iter().map(|s| s.duration()).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> SilenceSettings {
        SilenceSettings {
            enabled: true,
            threshold_db: -35.0,
            min_silence: 0.4,
            padding: 0.05,
        }
    }

    #[test]
    fn test_parse_silencedetect() {
        let stderr = "\
[silencedetect @ 0x5555] silence_start: 1.5\n\
[silencedetect @ 0x5555] silence_end: 2.25 | silence_duration: 0.75\n\
[silencedetect @ 0x5555] silence_start: 8.0\n\
[silencedetect @ 0x5555] silence_end: 9.1 | silence_duration: 1.1\n";
        let spans = parse_silencedetect(stderr);
        assert_eq!(spans.len(), 2);
        assert!((spans[0].start - 1.5).abs() < 1e-9);
        assert!((spans[1].end - 9.1).abs() < 1e-9);
    }

    #[test]
    fn test_parse_unterminated_silence() {
        let stderr = "[silencedetect @ 0x5555] silence_start: 4.0\n";
        assert!(parse_silencedetect(stderr).is_empty());
    }

    #[test]
    fn test_speaking_spans_no_silence() {
        let spans = speaking_spans(&[], 20.0, &settings());
        assert_eq!(spans.len(), 1);
        assert!((spans[0].end - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_speaking_spans_interior_silence() {
        let silences = vec![SilenceSpan { start: 5.0, end: 7.0 }];
        let spans = speaking_spans(&silences, 20.0, &settings());
        assert_eq!(spans.len(), 2);
        // First span keeps padding after speech
        assert!((spans[0].start).abs() < 1e-9);
        assert!((spans[0].end - 5.05).abs() < 1e-9);
        // Second span starts padding before speech resumes
        assert!((spans[1].start - 6.95).abs() < 1e-9);
        assert!((spans[1].end - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_head_and_tail_silence_trimmed() {
        let silences = vec![
            SilenceSpan { start: 0.0, end: 2.0 },
            SilenceSpan { start: 18.0, end: 20.0 },
        ];
        let spans = speaking_spans(&silences, 20.0, &settings());
        assert_eq!(spans.len(), 1);
        assert!((spans[0].start - 2.0).abs() < 1e-9);
        assert!((spans[0].end - 18.05).abs() < 1e-9);
    }

    #[test]
    fn test_compaction_filter_shape() {
        let spans = vec![
            SpeakingSpan { start: 0.0, end: 5.0 },
            SpeakingSpan { start: 7.0, end: 12.0 },
        ];
        let filter = build_compaction_filter(&spans);
        assert!(filter.contains("trim=start=0.000:end=5.000"));
        assert!(filter.contains("atrim=start=7.000:end=12.000"));
        assert!(filter.ends_with("concat=n=2:v=1:a=1[outv][outa]"));
    }

    #[test]
    fn test_compacted_duration() {
        let spans = vec![
            SpeakingSpan { start: 0.0, end: 5.0 },
            SpeakingSpan { start: 7.0, end: 12.0 },
        ];
        assert!((compacted_duration(&spans) - 10.0).abs() < 1e-9);
    }
}

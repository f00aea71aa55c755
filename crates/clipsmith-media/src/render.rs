//! Clip rendering through the external media tool.
//!
//! Each render cuts the source range, re-encodes to the configured target
//! with letterbox/pillarbox padding, and optionally draws the hook overlay
//! and compacts silence. Every invocation runs under a hard deadline of
//! `max(60 s, 4 × clip duration)`; on deadline the process is killed and the
//! clip is retried once with overlays and compaction disabled.

use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use tracing::{info, warn};

use clipsmith_models::{HookPosition, HookSettings, RenderTarget, SilenceSettings};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::silence::{
    build_compaction_filter, compacted_duration, detect_silences, speaking_spans,
};

/// One render request for a selected candidate.
#[derive(Debug, Clone)]
pub struct RenderRequest {
    /// Source start, seconds
    pub start: f64,
    /// Source end, seconds
    pub end: f64,
    /// Encoding target
    pub target: RenderTarget,
    /// Hook overlay text, when enabled for this clip
    pub hook_text: Option<String>,
    /// Hook rendering settings
    pub hook: HookSettings,
    /// Silence compaction settings
    pub silence: SilenceSettings,
}

impl RenderRequest {
    pub fn duration(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }

    /// The hard deadline for one invocation.
    pub fn deadline_secs(&self) -> u64 {
        (4.0 * self.duration()).max(60.0) as u64
    }
}

/// Result of a successful render.
#[derive(Debug, Clone)]
pub struct RenderOutcome {
    /// Duration of the rendered file (shorter than the source range when
    /// silence was compacted)
    pub rendered_duration: f64,
    /// Whether the fallback plain render was used
    pub degraded: bool,
}

/// The letterbox/pillarbox scaling filter for a target.
fn scale_pad_filter(target: &RenderTarget) -> String {
    format!(
        "scale=w={w}:h={h}:force_original_aspect_ratio=decrease,pad={w}:{h}:(ow-iw)/2:(oh-ih)/2:black",
        w = target.width,
        h = target.height
    )
}

/// Escape text for use inside a drawtext filter argument.
fn escape_drawtext(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\\\\\'"),
            ':' => out.push_str("\\:"),
            '%' => out.push_str("\\%"),
            ',' => out.push_str("\\,"),
            '[' | ']' => {}
            _ => out.push(c),
        }
    }
    out
}

/// Build the drawtext filter for the hook overlay: visible for the first
/// `hook.duration` seconds with 0.5 s alpha fades on each end.
fn hook_overlay_filter(text: &str, hook: &HookSettings) -> String {
    let fade = 0.5_f64;
    let dur = hook.duration.max(fade * 2.0);
    let y = match hook.position {
        HookPosition::Top => "h*0.12".to_string(),
        HookPosition::Center => "(h-text_h)/2".to_string(),
        HookPosition::Bottom => "h*0.8".to_string(),
    };
    format!(
        "drawtext=text='{text}':fontsize={size}:fontcolor={color}:box=1:boxcolor={boxcolor}:boxborderw=18:\
x=(w-text_w)/2:y={y}:enable='between(t,0,{dur:.2})':\
alpha='if(lt(t,{fade}),t/{fade},if(lt(t,{body:.2}),1,if(lt(t,{dur:.2}),({dur:.2}-t)/{fade},0)))'",
        text = escape_drawtext(text),
        size = hook.font_size,
        color = hook.font_color,
        boxcolor = hook.box_color,
        body = dur - fade,
    )
}

/// Render one clip, with the degraded retry on deadline or encode failure.
pub async fn render_clip(
    input: &Path,
    output: &Path,
    request: &RenderRequest,
    cancel: Arc<AtomicBool>,
) -> MediaResult<RenderOutcome> {
    match render_once(input, output, request, cancel.clone(), false).await {
        Ok(outcome) => Ok(outcome),
        Err(MediaError::Cancelled) => Err(MediaError::Cancelled),
        Err(err) => {
            warn!(
                output = %output.display(),
                error = %err,
                "Render failed, retrying without overlays and compaction"
            );
            let mut outcome = render_once(input, output, request, cancel, true).await?;
            outcome.degraded = true;
            Ok(outcome)
        }
    }
}

/// One render invocation. `plain` disables the hook overlay and compaction.
async fn render_once(
    input: &Path,
    output: &Path,
    request: &RenderRequest,
    cancel: Arc<AtomicBool>,
    plain: bool,
) -> MediaResult<RenderOutcome> {
    let duration = request.duration();
    let scale = scale_pad_filter(&request.target);

    let compaction = if !plain && request.silence.enabled {
        let silences = detect_silences(input, request.start, duration, &request.silence).await?;
        let spans = speaking_spans(&silences, duration, &request.silence);
        // Nothing worth cutting keeps the plain path
        if spans.len() == 1 && (compacted_duration(&spans) - duration).abs() < 0.5 {
            None
        } else {
            Some(spans)
        }
    } else {
        None
    };

    let hook_filter = if !plain && request.hook.enabled {
        request
            .hook_text
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .map(|t| hook_overlay_filter(t, &request.hook))
    } else {
        None
    };

    let mut cmd = FfmpegCommand::new(input, output)
        .seek(request.start)
        .duration(duration);

    let rendered_duration = match &compaction {
        Some(spans) => {
            let mut graph = build_compaction_filter(spans);
            // Re-route the concat video output through scaling (and the
            // overlay, which applies to the compacted timeline)
            graph = graph.replace("[outv][outa]", "[cv][outa]");
            graph.push_str(&format!(";[cv]{scale}[sv]"));
            match &hook_filter {
                Some(hook) => graph.push_str(&format!(";[sv]{hook}[outv]")),
                None => graph = graph.replace("[sv]", "[outv]"),
            }
            cmd = cmd
                .filter_complex(graph)
                .output_args(["-map", "[outv]", "-map", "[outa]"]);
            compacted_duration(spans)
        }
        None => {
            let filter = match &hook_filter {
                Some(hook) => format!("{scale},{hook}"),
                None => scale,
            };
            cmd = cmd.video_filter(filter);
            duration
        }
    };

    cmd = cmd
        .video_codec(&request.target.video_codec)
        .video_bitrate(&request.target.video_bitrate)
        .audio_codec(&request.target.audio_codec)
        .audio_bitrate(&request.target.audio_bitrate)
        .preset("fast");

    FfmpegRunner::new()
        .with_timeout(request.deadline_secs())
        .with_cancel(cancel)
        .run(&cmd)
        .await?;

    info!(
        output = %output.display(),
        duration = rendered_duration,
        compacted = compaction.is_some(),
        "Clip rendered"
    );

    Ok(RenderOutcome {
        rendered_duration,
        degraded: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> RenderTarget {
        RenderTarget::default()
    }

    #[test]
    fn test_deadline_floor() {
        let request = RenderRequest {
            start: 0.0,
            end: 10.0,
            target: target(),
            hook_text: None,
            hook: HookSettings::default(),
            silence: SilenceSettings::default(),
        };
        assert_eq!(request.deadline_secs(), 60);

        let long = RenderRequest { end: 45.0, ..request };
        assert_eq!(long.deadline_secs(), 180);
    }

    #[test]
    fn test_scale_pad_filter() {
        let filter = scale_pad_filter(&target());
        assert!(filter.contains("scale=w=1920:h=1080"));
        assert!(filter.contains("pad=1920:1080"));
        assert!(filter.ends_with(":black"));
    }

    #[test]
    fn test_escape_drawtext() {
        assert_eq!(escape_drawtext("a:b"), "a\\:b");
        assert_eq!(escape_drawtext("100%"), "100\\%");
        assert!(!escape_drawtext("x[y]").contains('['));
    }

    #[test]
    fn test_hook_filter_shape() {
        let filter = hook_overlay_filter("Watch this", &HookSettings::default());
        assert!(filter.starts_with("drawtext=text='Watch this'"));
        assert!(filter.contains("enable='between(t,0,4.00)'"));
        assert!(filter.contains("fontsize=48"));
        // center position
        assert!(filter.contains("y=(h-text_h)/2"));
    }
}

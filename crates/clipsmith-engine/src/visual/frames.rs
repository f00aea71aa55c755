//! Gray-frame extraction and luminance statistics.
//!
//! Frames come out of ffmpeg as raw 8-bit grayscale planes; everything the
//! analyzer needs (histograms, mean luma, inter-frame differences) is
//! computed here on those planes.

use std::path::Path;

use clipsmith_media::{FfmpegCommand, FfmpegRunner};

use crate::error::{EngineError, EngineResult};

/// Boundary-pass sample resolution.
pub const BOUNDARY_W: usize = 160;
pub const BOUNDARY_H: usize = 90;

/// One raw grayscale frame.
pub type GrayFrame = Vec<u8>;

/// Extract frames at `rate` fps across the whole source, scaled to
/// `width`×`height` grayscale.
pub async fn sample_frames(
    source: &Path,
    rate: f64,
    width: usize,
    height: usize,
) -> EngineResult<Vec<GrayFrame>> {
    let workdir = tempfile::tempdir()?;
    let raw_path = workdir.path().join("frames.raw");

    let cmd = FfmpegCommand::new(source, &raw_path)
        .video_filter(format!("fps={rate},scale={width}:{height},format=gray"))
        .output_arg("-an")
        .output_args(["-f", "rawvideo"]);
    FfmpegRunner::new().with_timeout(600).run(&cmd).await?;

    let bytes = tokio::fs::read(&raw_path).await?;
    let frame_size = width * height;
    if frame_size == 0 {
        return Err(EngineError::visual_failed("zero frame size"));
    }

    Ok(bytes
        .chunks_exact(frame_size)
        .map(|c| c.to_vec())
        .collect())
}

/// Extract a single grayscale frame at `time`, scaled to `width`×`height`.
pub async fn frame_at(
    source: &Path,
    time: f64,
    width: usize,
    height: usize,
) -> EngineResult<Option<GrayFrame>> {
    let workdir = tempfile::tempdir()?;
    let raw_path = workdir.path().join("frame.raw");

    let cmd = FfmpegCommand::new(source, &raw_path)
        .seek(time.max(0.0))
        .video_filter(format!("scale={width}:{height},format=gray"))
        .output_args(["-frames:v", "1", "-an", "-f", "rawvideo"]);
    FfmpegRunner::new().with_timeout(60).run(&cmd).await?;

    let bytes = tokio::fs::read(&raw_path).await?;
    let frame_size = width * height;
    if bytes.len() < frame_size {
        // Seek past EOF produces an empty file
        return Ok(None);
    }
    Ok(Some(bytes[..frame_size].to_vec()))
}

/// Extract a single PNG frame at `time` for the external face probe,
/// downsampled to half resolution.
pub async fn png_frame_at(source: &Path, time: f64, output: &Path) -> EngineResult<()> {
    let cmd = FfmpegCommand::new(source, output)
        .seek(time.max(0.0))
        .video_filter("scale=iw/2:ih/2")
        .output_args(["-frames:v", "1", "-an"]);
    FfmpegRunner::new().with_timeout(60).run(&cmd).await?;
    Ok(())
}

/// 256-bin luminance histogram normalized so the bins sum to 100.
pub fn histogram(frame: &[u8]) -> [f64; 256] {
    let mut bins = [0.0f64; 256];
    for &px in frame {
        bins[px as usize] += 1.0;
    }
    if !frame.is_empty() {
        let scale = 100.0 / frame.len() as f64;
        for bin in &mut bins {
            *bin *= scale;
        }
    }
    bins
}

/// Histogram distance in [0, 100]: the share of pixel mass that moved bins.
pub fn histogram_distance(a: &[f64; 256], b: &[f64; 256]) -> f64 {
    0.5 * a.iter().zip(b.iter()).map(|(x, y)| (x - y).abs()).sum::<f64>()
}

/// Mean luminance of a frame, 0..255.
pub fn mean_luma(frame: &[u8]) -> f64 {
    if frame.is_empty() {
        return 0.0;
    }
    frame.iter().map(|&p| p as f64).sum::<f64>() / frame.len() as f64
}

/// Mean absolute per-pixel difference between two frames, 0..255.
pub fn mean_abs_diff(a: &[u8], b: &[u8]) -> f64 {
    let len = a.len().min(b.len());
    if len == 0 {
        return 0.0;
    }
    a.iter()
        .zip(b.iter())
        .map(|(&x, &y)| (x as i16 - y as i16).unsigned_abs() as f64)
        .sum::<f64>()
        / len as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_histogram_normalized() {
        let frame = vec![0u8; 50].into_iter().chain(vec![255u8; 50]).collect::<Vec<_>>();
        let hist = histogram(&frame);
        assert!((hist[0] - 50.0).abs() < 1e-9);
        assert!((hist[255] - 50.0).abs() < 1e-9);
        assert!((hist.iter().sum::<f64>() - 100.0).abs() < 1e-6);
    }

    #[test]
    fn test_histogram_distance_identical() {
        let frame = vec![128u8; 100];
        let hist = histogram(&frame);
        assert!(histogram_distance(&hist, &hist).abs() < 1e-9);
    }

    #[test]
    fn test_histogram_distance_disjoint() {
        let black = histogram(&vec![0u8; 100]);
        let white = histogram(&vec![255u8; 100]);
        assert!((histogram_distance(&black, &white) - 100.0).abs() < 1e-6);
    }

    #[test]
    fn test_mean_luma() {
        assert!((mean_luma(&[0, 255]) - 127.5).abs() < 1e-9);
        assert!(mean_luma(&[]).abs() < 1e-9);
    }

    #[test]
    fn test_mean_abs_diff() {
        assert!((mean_abs_diff(&[10, 20], &[20, 10]) - 10.0).abs() < 1e-9);
        assert!(mean_abs_diff(&[5], &[5]).abs() < 1e-9);
    }
}

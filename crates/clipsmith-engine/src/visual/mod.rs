//! Visual analysis: scene boundaries, monolog synthesis and per-scene
//! signals.

pub mod faces;
pub mod frames;

use std::path::Path;

use tracing::{debug, info, warn};

use clipsmith_media::VideoInfo;
use clipsmith_models::Scene;

use crate::error::{EngineError, EngineResult};
use faces::FaceProbe;
use frames::{GrayFrame, BOUNDARY_H, BOUNDARY_W};

/// Synthetic window lengths, rotated to diversify durations.
const MONOLOG_WINDOWS: [f64; 4] = [15.0, 20.0, 25.0, 30.0];

/// Shortest synthetic window worth emitting.
const MIN_SYNTH_WINDOW: f64 = 9.0;

/// Frames sampled per scene for signal measurement.
const SIGNAL_SAMPLES: usize = 5;

/// Analyzer configuration.
#[derive(Debug, Clone)]
pub struct VisualConfig {
    /// Histogram-distance boundary threshold
    pub scene_threshold: f64,
    /// Scenes shorter than this merge into their successor, seconds
    pub min_scene: f64,
    /// Scenes longer than this split at equal offsets, seconds
    pub max_scene: f64,
}

impl Default for VisualConfig {
    fn default() -> Self {
        Self {
            scene_threshold: 12.0,
            min_scene: 3.0,
            max_scene: 60.0,
        }
    }
}

impl VisualConfig {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            scene_threshold: std::env::var("SCENE_THRESHOLD")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default.scene_threshold),
            min_scene: std::env::var("MIN_SCENE_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default.min_scene),
            max_scene: std::env::var("MAX_SCENE_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default.max_scene),
        }
    }
}

/// The visual analyzer.
pub struct VisualAnalyzer {
    config: VisualConfig,
    face_probe: FaceProbe,
}

impl VisualAnalyzer {
    pub fn new(config: VisualConfig) -> Self {
        Self {
            config,
            face_probe: FaceProbe::from_env(),
        }
    }

    /// Sampling rate adapted to source duration: 1 fps below 10 min,
    /// 0.5 fps below 30 min, 0.2 fps above.
    pub fn sampling_rate(duration: f64) -> f64 {
        if duration < 600.0 {
            1.0
        } else if duration < 1800.0 {
            0.5
        } else {
            0.2
        }
    }

    /// Analyze a source into scenes with per-scene signals.
    pub async fn analyze(&self, source: &Path, info: &VideoInfo) -> EngineResult<Vec<Scene>> {
        let duration = info.duration;
        let rate = Self::sampling_rate(duration);

        let samples = frames::sample_frames(source, rate, BOUNDARY_W, BOUNDARY_H).await?;
        debug!(frames = samples.len(), rate, "Boundary pass sampled");

        let ranges = self.detect_ranges(&samples, rate, duration);
        info!(scenes = ranges.len(), "Scene boundaries detected");

        let mut scenes = Vec::with_capacity(ranges.len());
        for (start, end) in &ranges {
            match self.measure_scene(source, info, *start, *end).await {
                Ok(scene) => scenes.push(scene),
                Err(err) => {
                    // A single unreadable scene loses its signals, not the job
                    warn!(start, end, error = %err, "Scene signal measurement failed");
                    scenes.push(Scene {
                        start: *start,
                        end: *end,
                        face_ratio: 0.0,
                        motion: 0.0,
                        brightness: 0.0,
                        synthetic: false,
                    });
                }
            }
        }

        // Monolog synthesis for sparse-scene sources
        let scenes_per_min = if duration > 0.0 {
            scenes.len() as f64 / (duration / 60.0)
        } else {
            0.0
        };
        if scenes_per_min <= 0.5 || scenes.len() < 3 {
            let synthetic = synthesize_monolog(duration);
            info!(
                detected = scenes.len(),
                synthetic = synthetic.len(),
                scenes_per_min,
                "Monolog synthesis triggered"
            );
            scenes.extend(synthetic);
        }

        if scenes.is_empty() {
            return Err(EngineError::visual_failed(format!(
                "no scenes produced for {duration:.1}s source"
            )));
        }

        scenes.sort_by(|a, b| a.start.partial_cmp(&b.start).unwrap_or(std::cmp::Ordering::Equal));
        Ok(scenes)
    }

    /// Turn sampled frames into `(start, end)` ranges: threshold the
    /// histogram distance, then apply the min-merge and max-split rules.
    fn detect_ranges(&self, samples: &[GrayFrame], rate: f64, duration: f64) -> Vec<(f64, f64)> {
        let mut boundaries = vec![0.0];
        let mut prev_hist = samples.first().map(|f| frames::histogram(f));

        for (i, frame) in samples.iter().enumerate().skip(1) {
            let hist = frames::histogram(frame);
            if let Some(prev) = &prev_hist {
                let distance = frames::histogram_distance(prev, &hist);
                if distance > self.config.scene_threshold {
                    boundaries.push(i as f64 / rate);
                }
            }
            prev_hist = Some(hist);
        }
        boundaries.push(duration);

        let mut ranges: Vec<(f64, f64)> = boundaries
            .windows(2)
            .filter(|w| w[1] > w[0])
            .map(|w| (w[0], w[1]))
            .collect();

        ranges = merge_short(ranges, self.config.min_scene);
        split_long(ranges, self.config.max_scene)
    }

    /// Measure per-scene signals from up to 5 frames at half resolution.
    async fn measure_scene(
        &self,
        source: &Path,
        info: &VideoInfo,
        start: f64,
        end: f64,
    ) -> EngineResult<Scene> {
        let width = ((info.width / 2).max(2)) as usize;
        let height = ((info.height / 2).max(2)) as usize;

        let span = end - start;
        let times: Vec<f64> = (0..SIGNAL_SAMPLES)
            .map(|i| start + span * i as f64 / (SIGNAL_SAMPLES - 1) as f64)
            .collect();

        let mut face_counts = Vec::new();
        let mut motion_diffs = Vec::new();
        let mut lumas = Vec::new();
        let mut prev: Option<GrayFrame> = None;

        let probe_dir = if self.face_probe.available() {
            Some(tempfile::tempdir()?)
        } else {
            None
        };

        for (i, &time) in times.iter().enumerate() {
            let Some(frame) = frames::frame_at(source, time, width, height).await? else {
                continue;
            };

            lumas.push(frames::mean_luma(&frame));
            if let Some(prev_frame) = &prev {
                motion_diffs.push(frames::mean_abs_diff(prev_frame, &frame));
            }

            if let Some(dir) = &probe_dir {
                let png = dir.path().join(format!("frame_{i}.png"));
                if frames::png_frame_at(source, time, &png).await.is_ok() {
                    face_counts.push(self.face_probe.count(&png).await);
                }
            }

            prev = Some(frame);
        }

        let mean_faces = mean(&face_counts);
        let mean_motion = mean(&motion_diffs);
        let mean_luma = mean(&lumas);

        Ok(Scene {
            start,
            end,
            face_ratio: (mean_faces / 2.0).clamp(0.0, 1.0),
            motion: (mean_motion / 50.0).min(1.0),
            brightness: 1.0 - (mean_luma - 127.0).abs() / 127.0,
            synthetic: false,
        })
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Merge scenes shorter than `min_scene` into their successor (the last one
/// merges backwards). A lone sub-minimum scene is dropped.
fn merge_short(ranges: Vec<(f64, f64)>, min_scene: f64) -> Vec<(f64, f64)> {
    let mut out: Vec<(f64, f64)> = Vec::with_capacity(ranges.len());
    let mut pending: Option<(f64, f64)> = None;

    for range in ranges {
        let range = match pending.take() {
            Some((start, _)) => (start, range.1),
            None => range,
        };
        if range.1 - range.0 < min_scene {
            pending = Some(range);
        } else {
            out.push(range);
        }
    }

    if let Some(last) = pending {
        match out.last_mut() {
            Some(prev) => prev.1 = last.1,
            None if last.1 - last.0 >= min_scene => out.push(last),
            None => {}
        }
    }

    out
}

/// Split scenes longer than `max_scene` into equal parts.
fn split_long(ranges: Vec<(f64, f64)>, max_scene: f64) -> Vec<(f64, f64)> {
    let mut out = Vec::with_capacity(ranges.len());
    for (start, end) in ranges {
        let span = end - start;
        if span <= max_scene {
            out.push((start, end));
            continue;
        }
        let parts = (span / max_scene).ceil() as usize;
        let step = span / parts as f64;
        for i in 0..parts {
            let s = start + step * i as f64;
            let e = if i == parts - 1 { end } else { s + step };
            out.push((s, e));
        }
    }
    out
}

/// Tile the whole source duration with synthetic talking-head scenes using
/// rotating window lengths.
fn synthesize_monolog(duration: f64) -> Vec<Scene> {
    let mut scenes = Vec::new();
    let mut cursor = 0.0;
    let mut rotation = 0usize;

    while cursor < duration {
        let window = MONOLOG_WINDOWS[rotation % MONOLOG_WINDOWS.len()];
        let end = (cursor + window).min(duration);
        if end - cursor >= MIN_SYNTH_WINDOW {
            scenes.push(Scene::synthetic(cursor, end));
        }
        cursor = end;
        rotation += 1;
    }

    scenes
}

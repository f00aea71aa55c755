//! Scene and speech fusion.
//!
//! Each scene collects the speech segments intersecting it by at least
//! half a second and becomes one pre-scoring window. Scenes with no speech
//! still produce a window; their audio axes stay at zero.

use clipsmith_models::{Scene, SpeechSegment};

/// Minimum intersection for a speech segment to join a scene, seconds.
const MIN_INTERSECTION: f64 = 0.5;

/// One merged scene-and-speech window, ready for scoring.
#[derive(Debug, Clone)]
pub struct FusedWindow {
    pub scene: Scene,
    /// Time-ordered concatenation of overlapping speech
    pub text: String,
    /// Largest gap between consecutive overlapping segments, seconds
    pub max_speech_gap: f64,
}

/// Fuse scenes with overlapping speech. The window inherits the scene's
/// time range, not the speech union.
pub fn fuse(scenes: &[Scene], speech: &[SpeechSegment]) -> Vec<FusedWindow> {
    scenes
        .iter()
        .map(|scene| {
            let overlapping: Vec<&SpeechSegment> = speech
                .iter()
                .filter(|seg| seg.overlap_with(scene.start, scene.end) >= MIN_INTERSECTION)
                .collect();

            let text = overlapping
                .iter()
                .map(|seg| seg.text.trim())
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
                .join(" ");

            let max_speech_gap = overlapping
                .windows(2)
                .map(|pair| (pair[1].start - pair[0].end).max(0.0))
                .fold(0.0, f64::max);

            FusedWindow {
                scene: scene.clone(),
                text,
                max_speech_gap,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene(start: f64, end: f64) -> Scene {
        Scene {
            start,
            end,
            face_ratio: 0.5,
            motion: 0.2,
            brightness: 0.8,
            synthetic: false,
        }
    }

    fn seg(start: f64, end: f64, text: &str) -> SpeechSegment {
        SpeechSegment::new(start, end, text, 0.9)
    }

    #[test]
    fn test_fuse_concatenates_in_time_order() {
        let scenes = vec![scene(0.0, 20.0)];
        let speech = vec![
            seg(1.0, 5.0, "first part"),
            seg(6.0, 10.0, "second part"),
            seg(25.0, 30.0, "outside"),
        ];
        let windows = fuse(&scenes, &speech);
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].text, "first part second part");
        assert!((windows[0].max_speech_gap - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_fuse_requires_half_second_overlap() {
        let scenes = vec![scene(10.0, 20.0)];
        // Only 0.3s inside the scene
        let speech = vec![seg(9.0, 10.3, "barely")];
        let windows = fuse(&scenes, &speech);
        assert_eq!(windows[0].text, "");
    }

    #[test]
    fn test_fuse_speechless_scene_still_produces_window() {
        let scenes = vec![scene(0.0, 15.0)];
        let windows = fuse(&scenes, &[]);
        assert_eq!(windows.len(), 1);
        assert!(windows[0].text.is_empty());
        assert!(windows[0].max_speech_gap.abs() < 1e-9);
    }

    #[test]
    fn test_window_inherits_scene_range() {
        let scenes = vec![scene(10.0, 30.0)];
        let speech = vec![seg(12.0, 14.0, "short burst")];
        let windows = fuse(&scenes, &speech);
        assert!((windows[0].scene.start - 10.0).abs() < 1e-9);
        assert!((windows[0].scene.end - 30.0).abs() < 1e-9);
    }
}

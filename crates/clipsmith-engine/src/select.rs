//! Clip selection.
//!
//! A strict pass greedy-picks context-complete candidates by viral score
//! under the duration-class filter. When the minimum-output floor is not
//! met, the ladder relaxes: first the score threshold drops to zero over
//! every candidate (picks added here carry the fallback flag), then the
//! source timeline is tiled with fabricated coverage windows. Candidates
//! whose duration falls outside the configured clip range are never
//! selectable in any step.

use tracing::{debug, info};

use clipsmith_models::{Candidate, Category, DurationClass, VisualScores};

use crate::error::{EngineError, EngineResult};

/// Overlap at or above this is a collision, seconds.
const OVERLAP_LIMIT: f64 = 0.5;

/// Default fabricated coverage window, seconds.
const COVERAGE_WINDOW: f64 = 20.0;

/// Selector configuration for one job.
#[derive(Debug, Clone)]
pub struct SelectorConfig {
    pub min_clips_floor: usize,
    pub max_clips: usize,
    pub min_viral: f64,
    pub duration_class: DurationClass,
    pub clip_min: f64,
    pub clip_max: f64,
}

/// Select the output clip set from scored candidates.
///
/// Returns a time-sorted list. Fails with `InsufficientMaterial` only when
/// nothing at all can be selected; a non-empty result below the floor is
/// returned and surfaced as a coverage warning by the caller.
pub fn select(
    candidates: &[Candidate],
    source_duration: f64,
    config: &SelectorConfig,
) -> EngineResult<Vec<Candidate>> {
    // Duration bounds are a hard invariant on every selected clip
    let in_bounds: Vec<&Candidate> = candidates
        .iter()
        .filter(|c| c.duration() >= config.clip_min && c.duration() <= config.clip_max)
        .collect();

    // Step 1: duration-class filter, widened to "any" when too few survive
    let mut class_filtered: Vec<&Candidate> = in_bounds
        .iter()
        .copied()
        .filter(|c| config.duration_class.admits(c.duration()))
        .collect();
    if class_filtered.len() < config.min_clips_floor {
        debug!(
            survived = class_filtered.len(),
            "Duration class too strict, widening to any"
        );
        class_filtered = in_bounds.clone();
    }

    // Steps 2-3: strict greedy pass over context-complete candidates
    let mut strict_pool: Vec<&Candidate> = class_filtered
        .iter()
        .copied()
        .filter(|c| c.context_complete)
        .collect();
    sort_ranked(&mut strict_pool);

    let mut selected: Vec<Candidate> = Vec::new();
    greedy_pick(
        &strict_pool,
        config.min_viral,
        config.max_clips,
        false,
        &mut selected,
    );
    info!(picked = selected.len(), "Strict selection pass complete");

    // Step 4: relax threshold to zero over all in-bounds candidates
    if selected.len() < config.min_clips_floor {
        let mut relaxed_pool: Vec<&Candidate> = in_bounds.clone();
        sort_ranked(&mut relaxed_pool);
        greedy_pick(&relaxed_pool, 0.0, config.max_clips, true, &mut selected);
        debug!(picked = selected.len(), "Relaxed selection pass complete");
    }

    // Step 5: fabricate coverage windows tiling the timeline
    if selected.len() < config.min_clips_floor {
        let tiles = coverage_tiles(source_duration, &selected, config);
        info!(tiles = tiles.len(), "Coverage fallback tiling applied");
        selected.extend(tiles);
        selected.truncate(config.max_clips);
    }

    // Step 6: nothing selectable at all
    if selected.is_empty() {
        return Err(EngineError::insufficient_material(format!(
            "no selectable window of at least {:.0}s fits a {:.1}s source",
            config.clip_min, source_duration
        )));
    }

    selected.sort_by(|a, b| a.start.partial_cmp(&b.start).unwrap_or(std::cmp::Ordering::Equal));
    Ok(selected)
}

/// Ranking order: viral score descending, hook axis descending, start
/// ascending.
fn sort_ranked(pool: &mut [&Candidate]) {
    pool.sort_by(|a, b| {
        b.viral_score
            .partial_cmp(&a.viral_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(
                b.audio
                    .hook
                    .partial_cmp(&a.audio.hook)
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
            .then(
                a.start
                    .partial_cmp(&b.start)
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
    });
}

/// Greedy non-overlapping pick from a ranked pool into `selected`.
fn greedy_pick(
    pool: &[&Candidate],
    min_viral: f64,
    max_clips: usize,
    mark_fallback: bool,
    selected: &mut Vec<Candidate>,
) {
    for candidate in pool {
        if selected.len() >= max_clips {
            break;
        }
        if candidate.viral_score < min_viral {
            break;
        }
        if collides(candidate.start, candidate.end, selected) {
            continue;
        }
        let mut chosen = (*candidate).clone();
        if mark_fallback {
            chosen.fallback = true;
        }
        selected.push(chosen);
    }
}

fn collides(start: f64, end: f64, selected: &[Candidate]) -> bool {
    selected
        .iter()
        .any(|c| (end.min(c.end) - start.max(c.start)) >= OVERLAP_LIMIT)
}

/// Fabricate non-overlapping coverage windows over the source timeline.
///
/// The window defaults to 20 s; when the timeline cannot fit the remaining
/// floor at that size, it shrinks to an equal split bounded below by the
/// configured minimum duration.
fn coverage_tiles(
    source_duration: f64,
    selected: &[Candidate],
    config: &SelectorConfig,
) -> Vec<Candidate> {
    let needed = config.min_clips_floor.saturating_sub(selected.len());
    if needed == 0 || source_duration < config.clip_min {
        return Vec::new();
    }

    let mut window = COVERAGE_WINDOW.min(config.clip_max);
    if source_duration / window < config.min_clips_floor as f64 {
        window = (source_duration / config.min_clips_floor as f64).max(config.clip_min);
    }
    if window < config.clip_min {
        return Vec::new();
    }

    let mut tiles: Vec<Candidate> = Vec::new();
    let mut cursor = 0.0_f64;

    while tiles.len() < needed && cursor + window <= source_duration + 1e-6 {
        let end = (cursor + window).min(source_duration);

        let collision = selected
            .iter()
            .chain(tiles.iter())
            .filter(|c| (end.min(c.end) - cursor.max(c.start)) >= OVERLAP_LIMIT)
            .map(|c| c.end)
            .fold(None::<f64>, |acc, e| Some(acc.map_or(e, |a| a.max(e))));

        match collision {
            Some(skip_to) => {
                cursor = skip_to.max(cursor + 0.5);
            }
            None => {
                tiles.push(fabricated(cursor, end));
                cursor = end;
            }
        }
    }

    tiles
}

fn fabricated(start: f64, end: f64) -> Candidate {
    Candidate {
        start,
        end,
        text: String::new(),
        visual: VisualScores::default(),
        audio: Default::default(),
        viral_score: 0.0,
        category: Category::Balanced,
        rationale: "coverage fallback".to_string(),
        context_complete: false,
        hook: None,
        fallback: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clipsmith_models::AudioScores;

    fn candidate(start: f64, end: f64, viral: f64, complete: bool) -> Candidate {
        Candidate {
            start,
            end,
            text: "text".to_string(),
            visual: VisualScores::default(),
            audio: AudioScores::default(),
            viral_score: viral,
            category: Category::Balanced,
            rationale: String::new(),
            context_complete: complete,
            hook: None,
            fallback: false,
        }
    }

    fn config() -> SelectorConfig {
        SelectorConfig {
            min_clips_floor: 2,
            max_clips: 5,
            min_viral: 0.08,
            duration_class: DurationClass::Any,
            clip_min: 9.0,
            clip_max: 50.0,
        }
    }

    #[test]
    fn test_picks_by_score_without_overlap() {
        let candidates = vec![
            candidate(0.0, 15.0, 0.9, true),
            candidate(5.0, 20.0, 0.8, true),  // overlaps the first
            candidate(30.0, 45.0, 0.7, true),
        ];
        let selected = select(&candidates, 100.0, &config()).unwrap();
        assert_eq!(selected.len(), 2);
        assert!((selected[0].start - 0.0).abs() < 1e-9);
        assert!((selected[1].start - 30.0).abs() < 1e-9);
        assert!(selected.iter().all(|c| !c.fallback));
    }

    #[test]
    fn test_output_time_sorted() {
        let candidates = vec![
            candidate(60.0, 75.0, 0.9, true),
            candidate(0.0, 15.0, 0.5, true),
        ];
        let selected = select(&candidates, 100.0, &config()).unwrap();
        assert!(selected[0].start < selected[1].start);
    }

    #[test]
    fn test_tie_break_by_hook_then_start() {
        let mut a = candidate(50.0, 65.0, 0.5, true);
        a.audio.hook = 0.9;
        let b = candidate(0.0, 15.0, 0.5, true);
        let c = candidate(20.0, 35.0, 0.5, true);

        let mut config = config();
        config.max_clips = 1;
        // a wins on hook despite later start
        let selected = select(&[a.clone(), b.clone(), c], 100.0, &config).unwrap();
        assert!((selected[0].start - 50.0).abs() < 1e-9);

        // Equal hook: earlier start wins
        let d = candidate(10.0, 25.0, 0.5, true);
        let e = candidate(40.0, 55.0, 0.5, true);
        let selected = select(&[e, d], 100.0, &config).unwrap();
        assert!((selected[0].start - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_min_viral_threshold_stops_strict_pass() {
        let candidates = vec![
            candidate(0.0, 15.0, 0.9, true),
            candidate(20.0, 35.0, 0.05, true), // below MIN_VIRAL
        ];
        let mut cfg = config();
        cfg.min_clips_floor = 1;
        let selected = select(&candidates, 100.0, &cfg).unwrap();
        assert_eq!(selected.len(), 1);
    }

    #[test]
    fn test_relax_marks_fallback() {
        let candidates = vec![
            candidate(0.0, 15.0, 0.9, true),
            candidate(20.0, 35.0, 0.05, true),
        ];
        // Floor of 2 forces the relaxed pass to pick the weak candidate
        let selected = select(&candidates, 35.0, &config()).unwrap();
        assert_eq!(selected.len(), 2);
        let weak = selected.iter().find(|c| c.viral_score < 0.08).unwrap();
        assert!(weak.fallback);
        let strong = selected.iter().find(|c| c.viral_score > 0.5).unwrap();
        assert!(!strong.fallback);
    }

    #[test]
    fn test_incomplete_candidates_only_via_fallback() {
        let candidates = vec![
            candidate(0.0, 15.0, 0.9, false), // incomplete, high score
            candidate(20.0, 35.0, 0.4, true),
        ];
        let mut cfg = config();
        cfg.min_clips_floor = 1;
        let selected = select(&candidates, 100.0, &cfg).unwrap();
        // Strict pass takes only the complete one; floor satisfied
        assert_eq!(selected.len(), 1);
        assert!(selected[0].context_complete);

        // With a floor of 2 the incomplete one joins, flagged
        cfg.min_clips_floor = 2;
        let selected = select(&candidates, 100.0, &cfg).unwrap();
        assert_eq!(selected.len(), 2);
        let incomplete = selected.iter().find(|c| !c.context_complete).unwrap();
        assert!(incomplete.fallback);
    }

    #[test]
    fn test_duration_class_filter_and_widening() {
        let mut cfg = config();
        cfg.duration_class = DurationClass::Medium;
        cfg.min_clips_floor = 1;
        let candidates = vec![
            candidate(0.0, 20.0, 0.5, true),  // 20s fits medium
            candidate(30.0, 42.0, 0.9, true), // 12s does not
        ];
        let selected = select(&candidates, 100.0, &cfg).unwrap();
        assert_eq!(selected.len(), 1);
        assert!((selected[0].duration() - 20.0).abs() < 1e-9);

        // With nothing in class, the filter widens instead of failing
        let only_short = vec![candidate(0.0, 12.0, 0.9, true)];
        let selected = select(&only_short, 100.0, &cfg).unwrap();
        assert_eq!(selected.len(), 1);
    }

    #[test]
    fn test_out_of_bounds_durations_never_selected() {
        let candidates = vec![
            candidate(0.0, 5.0, 0.99, true),   // 5s, below clip_min
            candidate(10.0, 80.0, 0.99, true), // 70s, above clip_max
        ];
        let err = select(&candidates, 5.0, &config()).unwrap_err();
        assert!(matches!(err, EngineError::InsufficientMaterial(_)));
    }

    #[test]
    fn test_coverage_tiling_no_speech() {
        // No candidates at all: a 60s source with floor 5 gets equal 12s tiles
        let mut cfg = config();
        cfg.min_clips_floor = 5;
        let selected = select(&[], 60.0, &cfg).unwrap();
        assert_eq!(selected.len(), 5);
        for clip in &selected {
            assert!(clip.fallback);
            assert!(!clip.context_complete);
            assert_eq!(clip.rationale, "coverage fallback");
            assert!(clip.viral_score.abs() < 1e-9);
            assert!((clip.duration() - 12.0).abs() < 1e-6);
        }
        // Non-overlapping
        for pair in selected.windows(2) {
            assert!(pair[0].end <= pair[1].start + 1e-6);
        }
    }

    #[test]
    fn test_coverage_tiling_twenty_second_default() {
        let mut cfg = config();
        cfg.min_clips_floor = 5;
        let selected = select(&[], 300.0, &cfg).unwrap();
        assert_eq!(selected.len(), 5);
        assert!((selected[0].duration() - 20.0).abs() < 1e-6);
    }

    #[test]
    fn test_tiling_avoids_existing_picks() {
        let mut cfg = config();
        cfg.min_clips_floor = 3;
        let candidates = vec![candidate(10.0, 25.0, 0.9, true)];
        let selected = select(&candidates, 120.0, &cfg).unwrap();
        assert!(selected.len() >= 3);
        for pair in selected.windows(2) {
            let overlap = pair[0].end.min(pair[1].end) - pair[1].start.max(pair[0].start);
            assert!(overlap < OVERLAP_LIMIT);
        }
    }

    #[test]
    fn test_nine_second_source_single_fallback_clip() {
        // One incomplete 9s candidate; floor 5 unreachable by tiling
        let candidates = vec![candidate(0.0, 9.0, 0.2, false)];
        let mut cfg = config();
        cfg.min_clips_floor = 5;
        let selected = select(&candidates, 9.0, &cfg).unwrap();
        assert_eq!(selected.len(), 1);
        assert!(selected[0].fallback);
        assert!(!selected[0].context_complete);
    }

    #[test]
    fn test_five_second_source_insufficient() {
        let candidates = vec![candidate(0.0, 5.0, 0.3, false)];
        let err = select(&candidates, 5.0, &config()).unwrap_err();
        assert!(matches!(err, EngineError::InsufficientMaterial(_)));
    }

    #[test]
    fn test_max_clips_cap() {
        let mut cfg = config();
        cfg.max_clips = 3;
        cfg.min_clips_floor = 1;
        let candidates: Vec<Candidate> = (0..10)
            .map(|i| candidate(i as f64 * 20.0, i as f64 * 20.0 + 15.0, 0.9, true))
            .collect();
        let selected = select(&candidates, 500.0, &cfg).unwrap();
        assert_eq!(selected.len(), 3);
    }

    #[test]
    fn test_selection_deterministic() {
        let candidates: Vec<Candidate> = (0..6)
            .map(|i| candidate(i as f64 * 20.0, i as f64 * 20.0 + 15.0, 0.5, true))
            .collect();
        let a = select(&candidates, 200.0, &config()).unwrap();
        let b = select(&candidates, 200.0, &config()).unwrap();
        let starts_a: Vec<f64> = a.iter().map(|c| c.start).collect();
        let starts_b: Vec<f64> = b.iter().map(|c| c.start).collect();
        assert_eq!(starts_a, starts_b);
    }
}

//! Candidate scoring.
//!
//! Every fused window receives independent per-axis scores, two composite
//! engagement scores and the final viral score. Scoring is a pure function
//! of its inputs: identical windows always produce identical scores,
//! categories and rationales.

pub mod hook;
pub mod lexicon;

use clipsmith_models::{
    AudioScores, Candidate, Category, ClipStyle, VisualScores,
};

use crate::fuse::FusedWindow;
use hook::HookGenerator;
use lexicon::{tokenize, Lexicon};

/// Largest allowed gap between consecutive speech segments for a candidate
/// to count as context-complete, seconds.
const MAX_CONTEXT_GAP: f64 = 3.0;

/// Penalty multiplier applied to context-incomplete candidates.
const INCOMPLETE_PENALTY: f64 = 0.6;

/// Scorer configuration for one job.
#[derive(Debug, Clone)]
pub struct ScorerConfig {
    pub style: ClipStyle,
    /// Valid clip duration range, from the config snapshot
    pub clip_min: f64,
    pub clip_max: f64,
    /// Generate hook records for candidates
    pub use_hook: bool,
}

/// The scorer.
pub struct Scorer {
    lexicon: Lexicon,
    config: ScorerConfig,
    hook_generator: HookGenerator,
}

impl Scorer {
    pub fn new(lexicon: Lexicon, config: ScorerConfig) -> Self {
        Self {
            lexicon,
            config,
            hook_generator: HookGenerator,
        }
    }

    /// Score every fused window into a candidate.
    pub fn score_all(&self, windows: &[FusedWindow]) -> Vec<Candidate> {
        windows.iter().map(|w| self.score(w)).collect()
    }

    /// Score one window.
    pub fn score(&self, window: &FusedWindow) -> Candidate {
        let words = tokenize(&window.text);
        let audio = self.audio_scores(&window.text, &words);
        let visual = self.visual_scores(window);
        let duration = window.scene.duration();

        let category = categorize(&audio);
        let context_complete = self.context_complete(window, &words);

        let mut viral_score = 0.35 * audio.hook
            + 0.25 * audio.engagement
            + 0.25 * visual.engagement
            + pacing_bonus(duration)
            + self.style_bonus(&audio);
        viral_score = viral_score.clamp(0.0, 1.0);

        if !context_complete {
            viral_score *= INCOMPLETE_PENALTY;
        }

        let hook = if self.config.use_hook {
            self.hook_generator.generate(&window.text, &audio)
        } else {
            None
        };

        let rationale = rationale(&audio, &visual);

        Candidate {
            start: window.scene.start,
            end: window.scene.end,
            text: window.text.clone(),
            visual,
            audio,
            viral_score,
            category,
            rationale,
            context_complete,
            hook,
            fallback: false,
        }
    }

    fn audio_scores(&self, text: &str, words: &[String]) -> AudioScores {
        let lex = &self.lexicon;
        let hook = Lexicon::axis_score(words, &lex.hook);
        let emotional = Lexicon::axis_score(words, &lex.emotional);
        let controversial = Lexicon::axis_score(words, &lex.controversial);
        let educational = Lexicon::axis_score(words, &lex.educational);
        let entertaining = Lexicon::axis_score(words, &lex.entertaining);
        let money = Lexicon::axis_score(words, &lex.money);
        let urgency = Lexicon::axis_score(words, &lex.urgency);
        let filler_penalty = lex.filler_penalty(words);

        let has_question = text.contains('?');
        let has_number = words.iter().any(|w| w.chars().any(|c| c.is_ascii_digit()));
        let has_exclamation = text.contains('!');

        let engagement = (0.25 * hook
            + 0.18 * emotional
            + 0.12 * controversial
            + 0.12 * educational
            + 0.12 * entertaining
            + 0.15 * money
            + 0.15 * urgency
            + if has_question { 0.05 } else { 0.0 }
            + if has_number { 0.05 } else { 0.0 }
            + if has_exclamation { 0.05 } else { 0.0 }
            - filler_penalty)
            .clamp(0.0, 1.0);

        AudioScores {
            hook,
            emotional,
            controversial,
            educational,
            entertaining,
            money,
            urgency,
            filler_penalty,
            engagement,
            has_question,
            has_number,
            has_exclamation,
        }
    }

    fn visual_scores(&self, window: &FusedWindow) -> VisualScores {
        let scene = &window.scene;
        let mut engagement =
            0.5 * scene.face_ratio + 0.3 * scene.motion + 0.2 * scene.brightness;
        if scene.face_ratio > 0.5 {
            engagement += 0.08;
        }
        if scene.motion > 0.6 {
            engagement += 0.08;
        }

        VisualScores {
            face_ratio: scene.face_ratio,
            motion: scene.motion,
            brightness: scene.brightness,
            engagement: engagement.clamp(0.0, 1.0),
            synthetic: scene.synthetic,
        }
    }

    fn style_bonus(&self, audio: &AudioScores) -> f64 {
        let axis = match self.config.style {
            ClipStyle::Funny => audio.entertaining,
            ClipStyle::Educational => audio.educational,
            ClipStyle::Dramatic => audio.emotional,
            ClipStyle::Controversial => audio.controversial,
            ClipStyle::Balanced => return 0.0,
        };
        0.10 * axis
    }

    /// All six completeness rules must hold.
    fn context_complete(&self, window: &FusedWindow, words: &[String]) -> bool {
        let text = window.text.trim();
        if text.is_empty() {
            return false;
        }

        // 1. Opens at a sentence-like boundary
        if let Some(first) = words.first() {
            if self.lexicon.transitions.contains(first) {
                return false;
            }
        }

        // 2. Ends with terminal punctuation or a conclusion phrase
        let terminal = text.ends_with('.')
            || text.ends_with('!')
            || text.ends_with('?')
            || text.ends_with('…');
        if !terminal && !self.lexicon.ends_with_conclusion(text) {
            return false;
        }

        // 3. Duration inside the configured clip range
        let duration = window.scene.duration();
        if duration < self.config.clip_min || duration > self.config.clip_max {
            return false;
        }

        // 5. No single speech gap above the threshold
        if window.max_speech_gap > MAX_CONTEXT_GAP {
            return false;
        }

        // 6. At least one non-filler content word
        self.lexicon.has_content_word(words)
    }
}

/// Pacing bonus for shorter, punchier clips.
fn pacing_bonus(duration: f64) -> f64 {
    if duration <= 15.0 {
        0.15
    } else if duration <= 25.0 {
        0.10
    } else {
        0.05
    }
}

/// Dominant content axis; balanced when every axis is weak. Ties resolve in
/// the fixed educational → entertaining → emotional → controversial order.
fn categorize(audio: &AudioScores) -> Category {
    let axes = [
        (Category::Educational, audio.educational),
        (Category::Entertaining, audio.entertaining),
        (Category::Emotional, audio.emotional),
        (Category::Controversial, audio.controversial),
    ];
    let mut best = axes[0];
    for axis in &axes[1..] {
        if axis.1 > best.1 {
            best = *axis;
        }
    }
    if best.1 < 0.3 {
        Category::Balanced
    } else {
        best.0
    }
}

/// Deterministic rationale: a fixed-order concatenation of the axes that
/// cleared 0.5, with a generic fallback.
fn rationale(audio: &AudioScores, visual: &VisualScores) -> String {
    let mut phrases: Vec<&str> = Vec::new();
    if audio.hook > 0.5 {
        phrases.push("strong hook");
    }
    if audio.emotional > 0.5 {
        phrases.push("emotional content");
    }
    if audio.controversial > 0.5 {
        phrases.push("controversial take");
    }
    if audio.educational > 0.5 {
        phrases.push("clear teaching moment");
    }
    if audio.entertaining > 0.5 {
        phrases.push("high entertainment");
    }
    if audio.money > 0.5 {
        phrases.push("money talk");
    }
    if audio.urgency > 0.5 {
        phrases.push("time pressure");
    }
    if visual.face_ratio > 0.5 {
        phrases.push("closeup speaker");
    }
    if visual.motion > 0.6 {
        phrases.push("dynamic visuals");
    }
    if phrases.is_empty() {
        phrases.push("informative content");
    }
    phrases.join(" + ")
}

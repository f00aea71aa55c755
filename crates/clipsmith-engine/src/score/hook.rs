//! Opening-hook generation.
//!
//! Builds a short, punchy overlay line from the candidate's own text:
//! detect the dominant theme, pick a focus phrase from the strongest
//! sentence, then fill a theme template. Selection is driven by a stable
//! hash of the input so identical inputs always produce identical hooks.

use std::collections::HashMap;

use clipsmith_models::{AudioScores, HookRecord};

use super::lexicon::tokenize;

/// FNV-1a, used instead of `RandomState` so template choice is stable
/// across runs and processes.
fn stable_hash(input: &str) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for byte in input.bytes() {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

fn pick<'a>(options: &'a [&'a str], seed: &str) -> &'a str {
    options[(stable_hash(seed) % options.len() as u64) as usize]
}

/// Maximum words carried into the focus phrase.
const FOCUS_WORDS: usize = 14;

struct Theme {
    name: &'static str,
    keywords: &'static [&'static str],
    templates: &'static [&'static str],
}

const THEMES: &[Theme] = &[
    Theme {
        name: "closing",
        keywords: &[
            "closing", "close", "deal", "prospek", "prospect", "client", "pitch", "pitching",
            "sales", "nego", "customer",
        ],
        templates: &[
            "{opener}! This is why {focus}. {command}.",
            "{opener}! The fastest way to make {focus} work. {command}.",
            "{opener}! You keep losing because {focus}. {command}.",
        ],
    },
    Theme {
        name: "money",
        keywords: &[
            "cuan", "omset", "omzet", "profit", "untung", "uang", "duit", "gaji", "revenue",
            "bonus", "money", "income", "cash",
        ],
        templates: &[
            "{opener}! {focus} is where the money leaks. {command}.",
            "{opener}! Want bigger numbers? Stop ignoring {focus}. {command}.",
            "{opener}! {focus} can flip your whole month. {command}.",
        ],
    },
    Theme {
        name: "mindset",
        keywords: &[
            "mindset", "mental", "takut", "percaya", "berani", "malu", "fokus", "disiplin",
            "komit", "fear", "focus", "discipline", "confidence",
        ],
        templates: &[
            "{opener}! If {focus}, your head isn't ready yet. {command}.",
            "{opener}! {focus} separates winners from quitters. {command}.",
            "{opener}! Everyone skips {focus} and wonders why. {command}.",
        ],
    },
    Theme {
        name: "urgency",
        keywords: &[
            "sekarang", "deadline", "detik", "malam", "cepetan", "nunda", "kesempatan",
            "chance", "now", "today", "hurry", "tonight",
        ],
        templates: &[
            "{opener}! {focus}. {command}.",
            "{opener}! You waited so long that {focus}. {command}.",
            "{opener}! {focus} if you keep stalling. {command}.",
        ],
    },
];

const DEFAULT_TEMPLATES: &[&str] = &[
    "{opener}! {focus}. {command}.",
    "{opener}! Here's the blueprint: {focus}. {command}.",
    "{opener}! Don't repeat {focus}. {command}.",
];

const OPENERS: &[&str] = &[
    "Hold on a second",
    "Let me be honest",
    "Nobody tells you this",
    "This is brutal",
    "You need to hear this",
];

const COMMANDS: &[&str] = &[
    "Write this down now",
    "Don't wait until next week",
    "Try it today",
    "Stop overthinking it",
    "Test it on your next attempt",
];

/// Deterministic hook generator.
#[derive(Debug, Default)]
pub struct HookGenerator;

impl HookGenerator {
    /// Generate a hook for candidate text, or `None` for empty text.
    pub fn generate(&self, text: &str, audio: &AudioScores) -> Option<HookRecord> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        let tokens = tokenize(text);
        let (theme, theme_score) = detect_theme(&tokens);
        let focus = focus_phrase(text, theme);

        let opener = pick(OPENERS, text);
        let command = pick(COMMANDS, &format!("{text}{focus}"));
        let templates = THEMES
            .iter()
            .find(|t| t.name == theme)
            .map(|t| t.templates)
            .unwrap_or(DEFAULT_TEMPLATES);
        let template = pick(templates, &format!("{text}{theme}"));

        let hook_text = template
            .replace("{opener}", opener)
            .replace("{focus}", &focus)
            .replace("{command}", command);

        let confidence = (0.45 + audio.hook * 0.25 + audio.engagement * 0.2 + theme_score * 0.1)
            .min(1.0);

        Some(HookRecord {
            text: hook_text,
            theme: theme.to_string(),
            confidence,
            source_fragment: focus,
        })
    }
}

/// Strongest theme by keyword density; "default" when nothing matches.
fn detect_theme(tokens: &[String]) -> (&'static str, f64) {
    let mut best = ("default", 0.0f64);
    for theme in THEMES {
        let keywords: HashMap<&str, ()> = theme.keywords.iter().map(|k| (*k, ())).collect();
        let matches = tokens.iter().filter(|t| keywords.contains_key(t.as_str())).count();
        let score = (matches as f64 / 4.0).min(1.0);
        if score > best.1 {
            best = (theme.name, score);
        }
    }
    best
}

/// The sentence scoring highest on theme keywords, clipped to 14 words.
fn focus_phrase(text: &str, theme: &str) -> String {
    let sentences: Vec<&str> = text
        .split(['.', '!', '?'])
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();
    if sentences.is_empty() {
        return text.split_whitespace().take(FOCUS_WORDS).collect::<Vec<_>>().join(" ");
    }

    let keywords: Vec<&str> = THEMES
        .iter()
        .find(|t| t.name == theme)
        .map(|t| t.keywords.to_vec())
        .unwrap_or_default();

    let mut best = (0usize, sentences[0]);
    for sentence in &sentences {
        let tokens = tokenize(sentence);
        let score = tokens
            .iter()
            .filter(|t| keywords.contains(&t.as_str()))
            .count();
        if score > best.0 {
            best = (score, sentence);
        }
    }

    best.1
        .split_whitespace()
        .take(FOCUS_WORDS)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn audio(hook: f64, engagement: f64) -> AudioScores {
        AudioScores {
            hook,
            engagement,
            ..AudioScores::default()
        }
    }

    #[test]
    fn test_empty_text_yields_none() {
        let generator = HookGenerator;
        assert!(generator.generate("   ", &audio(0.0, 0.0)).is_none());
    }

    #[test]
    fn test_deterministic() {
        let generator = HookGenerator;
        let text = "Closing a deal starts before the pitch. Most sales people skip this.";
        let a = generator.generate(text, &audio(0.4, 0.5)).unwrap();
        let b = generator.generate(text, &audio(0.4, 0.5)).unwrap();
        assert_eq!(a.text, b.text);
        assert_eq!(a.theme, b.theme);
        assert!((a.confidence - b.confidence).abs() < 1e-9);
    }

    #[test]
    fn test_theme_detection() {
        let tokens = tokenize("profit revenue cash money untung");
        let (theme, score) = detect_theme(&tokens);
        assert_eq!(theme, "money");
        assert!(score > 0.9);

        let (theme, score) = detect_theme(&tokenize("the weather is nice"));
        assert_eq!(theme, "default");
        assert!(score.abs() < 1e-9);
    }

    #[test]
    fn test_focus_phrase_clipped() {
        let long = "one two three four five six seven eight nine ten eleven twelve thirteen fourteen fifteen sixteen";
        let phrase = focus_phrase(long, "default");
        assert_eq!(phrase.split_whitespace().count(), FOCUS_WORDS);
    }

    #[test]
    fn test_confidence_capped() {
        let generator = HookGenerator;
        let record = generator
            .generate("profit profit profit profit money cash now", &audio(1.0, 1.0))
            .unwrap();
        assert!(record.confidence <= 1.0);
        assert!(record.confidence >= 0.45);
    }
}

//! Content-keyword lexicons.
//!
//! Lexicons are configuration, not code: `LEXICON_FILE` can point at a JSON
//! file replacing the built-in sets. The built-in defaults cover Indonesian
//! and English, mirroring the vocabulary the scoring model was tuned on.

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;

use crate::error::EngineResult;

/// Keyword sets backing the per-axis scores.
#[derive(Debug, Clone, Deserialize)]
pub struct Lexicon {
    pub hook: HashSet<String>,
    pub emotional: HashSet<String>,
    pub controversial: HashSet<String>,
    pub educational: HashSet<String>,
    pub entertaining: HashSet<String>,
    pub money: HashSet<String>,
    pub urgency: HashSet<String>,
    /// Disfluencies, counted negatively
    pub filler: HashSet<String>,
    /// Mid-sentence transition words a clip must not open with
    pub transitions: HashSet<String>,
    /// Phrases that close a thought; accepted in place of terminal punctuation
    pub conclusions: Vec<String>,
}

fn set(words: &[&str]) -> HashSet<String> {
    words.iter().map(|w| w.to_string()).collect()
}

impl Lexicon {
    /// Load from `LEXICON_FILE` when set, else the built-in defaults.
    pub fn from_env() -> EngineResult<Self> {
        match std::env::var("LEXICON_FILE") {
            Ok(path) => Self::from_json_file(Path::new(&path)),
            Err(_) => Ok(Self::builtin()),
        }
    }

    pub fn from_json_file(path: &Path) -> EngineResult<Self> {
        let bytes = std::fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Built-in Indonesian + English defaults.
    pub fn builtin() -> Self {
        Self {
            hook: set(&[
                "rahasia", "secret", "truth", "fakta", "fact", "shocking", "mengejutkan",
                "ternyata", "jangan", "never", "harus", "must", "wajib", "stop", "warning",
                "awas", "penting", "important", "listen", "dengerin", "bongkar", "terbukti",
            ]),
            emotional: set(&[
                "gagal", "failed", "sukses", "success", "menang", "kalah", "sedih", "bahagia",
                "marah", "kecewa", "bangga", "sad", "happy", "angry", "proud", "disappointed",
                "nangis", "cry", "takut", "fear", "cinta", "love", "benci", "hate", "nyesel",
            ]),
            controversial: set(&[
                "kontroversial", "controversial", "debat", "debate", "salah", "wrong", "benar",
                "right", "bohong", "lie", "jujur", "honest", "kebohongan", "scam", "tipu",
                "hoax", "mitos", "myth", "dusta", "fake",
            ]),
            educational: set(&[
                "cara", "tips", "trik", "trick", "tutorial", "belajar", "learn", "pelajaran",
                "lesson", "panduan", "guide", "langkah", "step", "metode", "method", "rumus",
                "formula", "contoh", "example", "caranya", "strategi", "strategy",
            ]),
            entertaining: set(&[
                "lucu", "funny", "ngakak", "hilarious", "kocak", "gokil", "epic", "amazing",
                "gila", "crazy", "insane", "keren", "seru", "wild", "unbelievable", "absurd",
            ]),
            money: set(&[
                "cuan", "omset", "omzet", "profit", "untung", "uang", "duit", "gaji",
                "revenue", "bonus", "modal", "investasi", "invest", "money", "cash", "income",
                "harga", "price", "diskon", "juta", "jutaan", "miliar", "billion", "million",
            ]),
            urgency: set(&[
                "sekarang", "deadline", "cepetan", "buruan", "kesempatan", "chance", "now",
                "today", "hurry", "limited", "terbatas", "segera", "langsung", "nunda",
                "telat", "late", "detik", "malam",
            ]),
            filler: set(&[
                "ehm", "emm", "umm", "uh", "um", "eh", "hmm", "anu", "gitu", "kayak",
                "kayaknya", "nah", "like", "basically", "literally", "actually",
            ]),
            transitions: set(&[
                // English
                "and", "but", "or", "so", "because", "then", "also", "however", "although",
                "though", "since", "while", "meanwhile", "moreover", "furthermore",
                "therefore", "thus", "hence", "anyway", "besides", "plus", "instead",
                "otherwise", "nevertheless", "nonetheless", "additionally", "consequently",
                "accordingly", "yet", "which", "whereas", "unless", "until", "nor",
                "neither", "either", "secondly", "thirdly",
                // Indonesian
                "dan", "tapi", "tetapi", "atau", "jadi", "karena", "lalu", "terus",
                "kemudian", "namun", "walaupun", "meskipun", "sementara", "selain",
                "makanya", "sehingga", "soalnya", "padahal", "apalagi", "bahkan", "malah",
                "sedangkan", "kalau", "kalo", "kecuali", "sampai", "sampe", "biar",
                "supaya", "agar", "yaitu", "yakni", "misalnya", "contohnya", "pokoknya",
            ]),
            conclusions: [
                // English
                "that's it", "that is it", "in conclusion", "to sum up", "that's all",
                "thank you", "thanks for watching", "the end", "that's why",
                "and that's how", "bottom line", "at the end of the day",
                "see you next time", "hope that helps", "that's the point",
                "simple as that", "it's that simple", "end of story",
                // Indonesian
                "itulah", "begitulah", "sekian", "terima kasih", "makasih", "itu aja",
                "itu saja", "gitu aja", "segitu aja", "intinya begitu",
                "kurang lebih begitu", "sesimpel itu", "selesai", "udah gitu aja",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }

    /// Raw axis score: `min(matches / 3, 1)`.
    pub fn axis_score(words: &[String], keywords: &HashSet<String>) -> f64 {
        let matches = words.iter().filter(|w| keywords.contains(*w)).count();
        (matches as f64 / 3.0).min(1.0)
    }

    /// Filler penalty: `min(0.08 × matches, 0.4)`.
    pub fn filler_penalty(&self, words: &[String]) -> f64 {
        let matches = words.iter().filter(|w| self.filler.contains(*w)).count();
        (0.08 * matches as f64).min(0.4)
    }

    /// Whether any non-filler content word is present.
    pub fn has_content_word(&self, words: &[String]) -> bool {
        words.iter().any(|w| !self.filler.contains(w))
    }

    /// Whether lowercased text ends with one of the conclusion phrases
    /// (trailing punctuation ignored).
    pub fn ends_with_conclusion(&self, text: &str) -> bool {
        let trimmed = text
            .trim_end()
            .trim_end_matches(['.', '!', '?', ',', '…'])
            .trim_end()
            .to_lowercase();
        self.conclusions.iter().any(|phrase| trimmed.ends_with(phrase))
    }
}

/// Lowercased word tokens of a text.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric() && c != '\'')
        .map(|t| t.trim_matches('\''))
        .filter(|t| !t.is_empty())
        .map(|t| t.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize() {
        assert_eq!(
            tokenize("Rahasia sukses, jangan nunda!"),
            vec!["rahasia", "sukses", "jangan", "nunda"]
        );
        assert_eq!(tokenize("it's fine"), vec!["it's", "fine"]);
        assert!(tokenize("  !!  ").is_empty());
    }

    #[test]
    fn test_axis_score_saturates_at_three() {
        let lex = Lexicon::builtin();
        let words = tokenize("rahasia fakta shocking ternyata jangan");
        assert!((Lexicon::axis_score(&words, &lex.hook) - 1.0).abs() < 1e-9);

        let one = tokenize("rahasia besar");
        assert!((Lexicon::axis_score(&one, &lex.hook) - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_filler_penalty_cap() {
        let lex = Lexicon::builtin();
        let words: Vec<String> = std::iter::repeat("umm".to_string()).take(10).collect();
        assert!((lex.filler_penalty(&words) - 0.4).abs() < 1e-9);

        let two = tokenize("umm anu oke");
        assert!((lex.filler_penalty(&two) - 0.16).abs() < 1e-9);
    }

    #[test]
    fn test_has_content_word() {
        let lex = Lexicon::builtin();
        assert!(!lex.has_content_word(&tokenize("umm uh kayak")));
        assert!(lex.has_content_word(&tokenize("umm penting")));
    }

    #[test]
    fn test_conclusion_phrases() {
        let lex = Lexicon::builtin();
        assert!(lex.ends_with_conclusion("Pokoknya intinya begitu."));
        assert!(lex.ends_with_conclusion("And that's why"));
        assert!(!lex.ends_with_conclusion("and then we went"));
    }

    #[test]
    fn test_builtin_sizes() {
        let lex = Lexicon::builtin();
        assert!(lex.transitions.len() >= 50);
        assert!(lex.conclusions.len() >= 30);
    }
}

//! Analysis engine for Clipsmith.
//!
//! Turns an admitted source into a ranked, selected set of candidates:
//! transcription (with the retry ladder), visual analysis (with monolog
//! synthesis), fusion, scoring and selection. Everything here is either a
//! pure function or a supervised external-tool invocation; job state lives
//! in the worker crate.

pub mod error;
pub mod fuse;
pub mod hardware;
pub mod score;
pub mod select;
pub mod transcribe;
pub mod visual;

pub use error::{EngineError, EngineResult};
pub use fuse::{fuse, FusedWindow};
pub use score::lexicon::Lexicon;
pub use score::{Scorer, ScorerConfig};
pub use select::{select, SelectorConfig};
pub use transcribe::{Transcriber, TranscriberConfig};
pub use visual::{VisualAnalyzer, VisualConfig};

//! Shared data models for the Clipsmith backend.
//!
//! This crate provides Serde-serializable types for:
//! - Source videos and admission metadata
//! - Speech segments and visual scenes
//! - Scored candidates and rendered clips
//! - Jobs, snapshots and the bounded log ring
//! - Processing options and the per-job config snapshot

pub mod candidate;
pub mod clip;
pub mod config;
pub mod job;
pub mod options;
pub mod scene;
pub mod source;
pub mod speech;
pub mod timestamp;

// Re-export common types
pub use candidate::{AudioScores, Candidate, Category, HookRecord, VisualScores};
pub use clip::{Clip, ViralTier};
pub use config::{
    ConfigSnapshot, HardwareProfile, HookPosition, HookSettings, Precision, RenderTarget,
    SilenceSettings,
};
pub use job::{ErrorKind, JobId, JobSnapshot, JobStatus, LogEntry, LogRing};
pub use options::{AspectRatio, ClipStyle, DurationClass, ProcessOptions};
pub use scene::Scene;
pub use source::{sanitize_source_id, SourceId, SourceVideo};
pub use speech::{normalize_segments, SpeechSegment};
pub use timestamp::{format_seconds, format_srt_timestamp, parse_srt_timestamp, parse_timestamp};

//! Job identity, status, snapshots and the bounded log ring.

use std::collections::VecDeque;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Clip;

/// Unique identifier for a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Job lifecycle state. Transitions only along
/// `queued → running → {completed, error}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    #[default]
    Queued,
    Running,
    Completed,
    Error,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Error)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Error => "error",
        }
    }
}

/// The named failure kinds surfaced in `Job.message` when status is error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    UnreadableMedia,
    SourceTooLarge,
    TranscriptionUnreliable,
    VisualAnalysisFailed,
    InsufficientMaterial,
    RenderFailedAll,
    BackendUnavailable,
    Cancelled,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::UnreadableMedia => "unreadable-media",
            ErrorKind::SourceTooLarge => "source-too-large",
            ErrorKind::TranscriptionUnreliable => "transcription-unreliable",
            ErrorKind::VisualAnalysisFailed => "visual-analysis-failed",
            ErrorKind::InsufficientMaterial => "insufficient-material",
            ErrorKind::RenderFailedAll => "render-failed-all",
            ErrorKind::BackendUnavailable => "backend-unavailable",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry in a job's log ring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub at: DateTime<Utc>,
    pub message: String,
}

/// Bounded, causally ordered log of job activity. Oldest entries are evicted
/// once the capacity is reached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRing {
    entries: VecDeque<LogEntry>,
    capacity: usize,
}

impl LogRing {
    pub const DEFAULT_CAPACITY: usize = 10;

    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, message: impl Into<String>) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(LogEntry {
            at: Utc::now(),
            message: message.into(),
        });
    }

    pub fn entries(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_vec(&self) -> Vec<LogEntry> {
        self.entries.iter().cloned().collect()
    }
}

impl Default for LogRing {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

/// Deep copy of a job's public fields, returned by the status query path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub job_id: JobId,
    pub status: JobStatus,
    /// Monotonically non-decreasing, 0..=100
    pub progress: u8,
    pub message: String,
    pub log: Vec<LogEntry>,
    pub clips: Vec<Clip>,
    pub last_activity: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_ring_bounded() {
        let mut ring = LogRing::new(3);
        for i in 0..5 {
            ring.push(format!("entry {i}"));
        }
        assert_eq!(ring.len(), 3);
        let messages: Vec<_> = ring.entries().map(|e| e.message.clone()).collect();
        assert_eq!(messages, vec!["entry 2", "entry 3", "entry 4"]);
    }

    #[test]
    fn test_error_kind_strings() {
        assert_eq!(ErrorKind::InsufficientMaterial.as_str(), "insufficient-material");
        assert_eq!(ErrorKind::RenderFailedAll.as_str(), "render-failed-all");
        let json = serde_json::to_string(&ErrorKind::UnreadableMedia).unwrap();
        assert_eq!(json, "\"unreadable-media\"");
    }

    #[test]
    fn test_status_terminal() {
        assert!(!JobStatus::Queued.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Error.is_terminal());
    }
}

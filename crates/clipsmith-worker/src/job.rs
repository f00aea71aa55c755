//! Per-job mutable state.
//!
//! Each job's public fields live behind a single per-job lock held only for
//! the duration of a field update or a snapshot copy. The cancel flag is a
//! separate atomic so stage-boundary polls never contend with status reads.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use chrono::Utc;
use tracing::debug;

use clipsmith_models::{
    Clip, ConfigSnapshot, ErrorKind, JobId, JobSnapshot, JobStatus, LogRing, SourceVideo,
};

/// The mutable record behind a job's per-job lock.
#[derive(Debug)]
pub struct JobRecord {
    pub status: JobStatus,
    pub progress: u8,
    pub message: String,
    pub log: LogRing,
    pub clips: Vec<Clip>,
    pub error_kind: Option<ErrorKind>,
    pub last_activity: chrono::DateTime<Utc>,
}

/// One job: immutable identity plus the locked record and the cancel flag.
#[derive(Debug)]
pub struct JobEntry {
    pub id: JobId,
    pub source: SourceVideo,
    pub config: ConfigSnapshot,
    record: Mutex<JobRecord>,
    cancel: AtomicBool,
}

impl JobEntry {
    pub fn new(id: JobId, source: SourceVideo, config: ConfigSnapshot) -> Self {
        Self {
            id,
            source,
            config,
            record: Mutex::new(JobRecord {
                status: JobStatus::Queued,
                progress: 0,
                message: "queued".to_string(),
                log: LogRing::default(),
                clips: Vec::new(),
                error_kind: None,
                last_activity: Utc::now(),
            }),
            cancel: AtomicBool::new(false),
        }
    }

    /// Deep copy of the public fields.
    pub fn snapshot(&self) -> JobSnapshot {
        let record = self.record.lock().unwrap();
        JobSnapshot {
            job_id: self.id.clone(),
            status: record.status,
            progress: record.progress,
            message: record.message.clone(),
            log: record.log.to_vec(),
            clips: record.clips.clone(),
            last_activity: record.last_activity,
        }
    }

    pub fn status(&self) -> JobStatus {
        self.record.lock().unwrap().status
    }

    /// Progress only moves forward.
    pub fn set_progress(&self, progress: u8, message: impl Into<String>) {
        let mut record = self.record.lock().unwrap();
        record.progress = record.progress.max(progress.min(100));
        record.message = message.into();
        let message = record.message.clone();
        record.log.push(message);
        record.last_activity = Utc::now();
        debug!(job_id = %self.id, progress = record.progress, "{}", record.message);
    }

    /// Append a log entry without touching progress.
    pub fn log(&self, message: impl Into<String>) {
        let mut record = self.record.lock().unwrap();
        record.log.push(message.into());
        record.last_activity = Utc::now();
    }

    pub fn mark_running(&self) {
        let mut record = self.record.lock().unwrap();
        record.status = JobStatus::Running;
        record.message = "running".to_string();
        record.last_activity = Utc::now();
    }

    /// Terminal success. An optional warning survives in the message.
    pub fn mark_completed(&self, clips: Vec<Clip>, warning: Option<String>) {
        let mut record = self.record.lock().unwrap();
        record.status = JobStatus::Completed;
        record.progress = 100;
        record.clips = clips;
        record.message = warning.unwrap_or_else(|| "completed".to_string());
        let message = record.message.clone();
        record.log.push(message);
        record.last_activity = Utc::now();
    }

    /// Terminal failure; the error kind is the message.
    pub fn mark_error(&self, kind: ErrorKind, detail: impl Into<String>) {
        let mut record = self.record.lock().unwrap();
        record.status = JobStatus::Error;
        record.error_kind = Some(kind);
        record.message = kind.as_str().to_string();
        record.clips = Vec::new();
        record.log.push(format!("{}: {}", kind, detail.into()));
        record.last_activity = Utc::now();
    }

    pub fn request_cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    pub fn cancel_requested(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    /// Shared handle to the cancel flag for render workers.
    pub fn cancel_flag(&self) -> &AtomicBool {
        &self.cancel
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clipsmith_models::{
        sanitize_source_id, HardwareProfile, ProcessOptions,
    };

    fn entry() -> JobEntry {
        let source = SourceVideo {
            id: sanitize_source_id("test.mp4"),
            path: "/tmp/test.mp4".into(),
            duration: 120.0,
            fps: 30.0,
            width: 1920,
            height: 1080,
            codec: "h264".into(),
            title: None,
            channel: None,
        };
        let config = ConfigSnapshot::from_env(ProcessOptions::default(), HardwareProfile::cpu());
        JobEntry::new(JobId::new(), source, config)
    }

    #[test]
    fn test_progress_monotone() {
        let job = entry();
        job.set_progress(40, "transcribed");
        job.set_progress(10, "stale update");
        assert_eq!(job.snapshot().progress, 40);
        job.set_progress(55, "visual done");
        assert_eq!(job.snapshot().progress, 55);
    }

    #[test]
    fn test_error_clears_clips_and_sets_kind_message() {
        let job = entry();
        job.mark_error(ErrorKind::InsufficientMaterial, "too short");
        let snapshot = job.snapshot();
        assert_eq!(snapshot.status, JobStatus::Error);
        assert_eq!(snapshot.message, "insufficient-material");
        assert!(snapshot.clips.is_empty());
    }

    #[test]
    fn test_completed_with_warning() {
        let job = entry();
        job.mark_completed(Vec::new(), Some("2 of 5 clips dropped".into()));
        let snapshot = job.snapshot();
        assert_eq!(snapshot.status, JobStatus::Completed);
        assert_eq!(snapshot.progress, 100);
        assert!(snapshot.message.contains("dropped"));
    }

    #[test]
    fn test_cancel_flag() {
        let job = entry();
        assert!(!job.cancel_requested());
        job.request_cancel();
        assert!(job.cancel_requested());
    }

    #[test]
    fn test_log_ring_visible_in_snapshot() {
        let job = entry();
        for i in 0..15 {
            job.log(format!("step {i}"));
        }
        let snapshot = job.snapshot();
        assert_eq!(snapshot.log.len(), LogRing::DEFAULT_CAPACITY);
        assert_eq!(snapshot.log.last().unwrap().message, "step 14");
    }
}

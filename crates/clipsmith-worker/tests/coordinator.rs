//! Coordinator lifecycle tests driven by stub processors.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use clipsmith_media::ArtifactStore;
use clipsmith_models::{
    sanitize_source_id, Clip, JobStatus, ProcessOptions, SourceVideo, ViralTier,
};
use clipsmith_worker::{
    Coordinator, CoordinatorConfig, CoordinatorError, JobEntry, JobProcessor, ProcessOutcome,
    WorkerError, WorkerResult,
};

fn source(name: &str) -> SourceVideo {
    SourceVideo {
        id: sanitize_source_id(name),
        path: format!("/tmp/{name}").into(),
        duration: 120.0,
        fps: 30.0,
        width: 1920,
        height: 1080,
        codec: "h264".into(),
        title: None,
        channel: None,
    }
}

fn fake_clip(index: u32) -> Clip {
    Clip {
        index,
        file: format!("clip_{index:03}.mp4"),
        start_seconds: index as f64 * 20.0,
        end_seconds: index as f64 * 20.0 + 15.0,
        duration_seconds: 15.0,
        rendered_duration: Some(15.0),
        viral_score: 0.5,
        viral_tier: ViralTier::Medium,
        category: clipsmith_models::Category::Balanced,
        rationale: "test".into(),
        context_complete: true,
        fallback: false,
        hook_text: None,
        caption_file: None,
    }
}

/// Processor that reports canonical progress points, then succeeds.
struct HappyProcessor {
    delay: Duration,
    processed: AtomicUsize,
}

#[async_trait]
impl JobProcessor for HappyProcessor {
    async fn process(
        &self,
        job: Arc<JobEntry>,
        _store: ArtifactStore,
    ) -> WorkerResult<ProcessOutcome> {
        for (progress, message) in [
            (5u8, "probing source"),
            (40, "transcribe done"),
            (55, "visual done"),
            (75, "selected"),
            (95, "render done"),
        ] {
            job.set_progress(progress, message);
            tokio::time::sleep(self.delay).await;
            if job.cancel_requested() {
                return Err(WorkerError::Cancelled);
            }
        }
        self.processed.fetch_add(1, Ordering::SeqCst);
        Ok(ProcessOutcome {
            clips: vec![fake_clip(1), fake_clip(2)],
            warning: None,
        })
    }
}

/// Processor that always fails with an engine error.
struct FailingProcessor;

#[async_trait]
impl JobProcessor for FailingProcessor {
    async fn process(
        &self,
        _job: Arc<JobEntry>,
        _store: ArtifactStore,
    ) -> WorkerResult<ProcessOutcome> {
        Err(WorkerError::Engine(
            clipsmith_engine::EngineError::insufficient_material("5s source"),
        ))
    }
}

fn coordinator_with(
    processor: Arc<dyn JobProcessor>,
    concurrency: usize,
    root: &std::path::Path,
) -> Coordinator {
    let coordinator = Coordinator::new(
        CoordinatorConfig {
            concurrency,
            cooldown: Duration::from_millis(10),
        },
        ArtifactStore::new(root),
        processor,
    );
    coordinator.start();
    coordinator
}

async fn wait_terminal(coordinator: &Coordinator, job_id: &clipsmith_models::JobId) -> JobStatus {
    for _ in 0..200 {
        let snapshot = coordinator.status(job_id).unwrap();
        if snapshot.status.is_terminal() {
            return snapshot.status;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job did not reach a terminal state");
}

#[tokio::test]
async fn test_job_completes_with_clips() {
    let tmp = tempfile::tempdir().unwrap();
    let coordinator = coordinator_with(
        Arc::new(HappyProcessor {
            delay: Duration::from_millis(5),
            processed: AtomicUsize::new(0),
        }),
        1,
        tmp.path(),
    );

    let job_id = coordinator
        .enqueue(source("a.mp4"), ProcessOptions::default())
        .unwrap();
    let status = wait_terminal(&coordinator, &job_id).await;
    assert_eq!(status, JobStatus::Completed);

    let snapshot = coordinator.status(&job_id).unwrap();
    assert_eq!(snapshot.progress, 100);
    assert_eq!(snapshot.clips.len(), 2);
}

#[tokio::test]
async fn test_progress_is_monotone_under_polling() {
    let tmp = tempfile::tempdir().unwrap();
    let coordinator = coordinator_with(
        Arc::new(HappyProcessor {
            delay: Duration::from_millis(10),
            processed: AtomicUsize::new(0),
        }),
        1,
        tmp.path(),
    );

    let job_id = coordinator
        .enqueue(source("b.mp4"), ProcessOptions::default())
        .unwrap();

    let mut last = 0u8;
    for _ in 0..100 {
        let snapshot = coordinator.status(&job_id).unwrap();
        assert!(snapshot.progress >= last, "progress went backwards");
        last = snapshot.progress;
        if snapshot.status.is_terminal() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(last, 100);
}

#[tokio::test]
async fn test_admission_busy_when_queue_full() {
    let tmp = tempfile::tempdir().unwrap();
    let coordinator = coordinator_with(
        Arc::new(HappyProcessor {
            delay: Duration::from_millis(200),
            processed: AtomicUsize::new(0),
        }),
        1,
        tmp.path(),
    );

    // concurrency 1 + queue capacity 1: the third admission is rejected
    let first = coordinator.enqueue(source("one.mp4"), ProcessOptions::default());
    assert!(first.is_ok());
    // Give the worker a moment to pull the first job off the queue
    tokio::time::sleep(Duration::from_millis(50)).await;
    let second = coordinator.enqueue(source("two.mp4"), ProcessOptions::default());
    assert!(second.is_ok());
    let third = coordinator.enqueue(source("three.mp4"), ProcessOptions::default());
    assert_eq!(third.unwrap_err(), CoordinatorError::Busy);
}

#[tokio::test]
async fn test_queued_job_waits_for_running_job() {
    let tmp = tempfile::tempdir().unwrap();
    let coordinator = coordinator_with(
        Arc::new(HappyProcessor {
            delay: Duration::from_millis(50),
            processed: AtomicUsize::new(0),
        }),
        1,
        tmp.path(),
    );

    let first = coordinator
        .enqueue(source("first.mp4"), ProcessOptions::default())
        .unwrap();
    let second = coordinator
        .enqueue(source("second.mp4"), ProcessOptions::default())
        .unwrap();

    tokio::time::sleep(Duration::from_millis(60)).await;
    let first_status = coordinator.status(&first).unwrap().status;
    let second_status = coordinator.status(&second).unwrap().status;
    assert_eq!(first_status, JobStatus::Running);
    assert_eq!(second_status, JobStatus::Queued);

    assert_eq!(wait_terminal(&coordinator, &first).await, JobStatus::Completed);
    assert_eq!(wait_terminal(&coordinator, &second).await, JobStatus::Completed);
}

#[tokio::test]
async fn test_failure_kind_in_message() {
    let tmp = tempfile::tempdir().unwrap();
    let coordinator = coordinator_with(Arc::new(FailingProcessor), 1, tmp.path());

    let job_id = coordinator
        .enqueue(source("short.mp4"), ProcessOptions::default())
        .unwrap();
    let status = wait_terminal(&coordinator, &job_id).await;
    assert_eq!(status, JobStatus::Error);

    let snapshot = coordinator.status(&job_id).unwrap();
    assert_eq!(snapshot.message, "insufficient-material");
    assert!(snapshot.clips.is_empty());
}

#[tokio::test]
async fn test_cancel_queued_job() {
    let tmp = tempfile::tempdir().unwrap();
    let coordinator = coordinator_with(
        Arc::new(HappyProcessor {
            delay: Duration::from_millis(100),
            processed: AtomicUsize::new(0),
        }),
        1,
        tmp.path(),
    );

    let running = coordinator
        .enqueue(source("running.mp4"), ProcessOptions::default())
        .unwrap();
    let queued = coordinator
        .enqueue(source("queued.mp4"), ProcessOptions::default())
        .unwrap();

    tokio::time::sleep(Duration::from_millis(30)).await;
    coordinator.cancel(&queued).unwrap();

    let snapshot = coordinator.status(&queued).unwrap();
    assert_eq!(snapshot.status, JobStatus::Error);
    assert_eq!(snapshot.message, "cancelled");

    // The running job is unaffected
    assert_eq!(wait_terminal(&coordinator, &running).await, JobStatus::Completed);
}

#[tokio::test]
async fn test_cancel_running_job_between_stages() {
    let tmp = tempfile::tempdir().unwrap();
    let coordinator = coordinator_with(
        Arc::new(HappyProcessor {
            delay: Duration::from_millis(50),
            processed: AtomicUsize::new(0),
        }),
        1,
        tmp.path(),
    );

    let job_id = coordinator
        .enqueue(source("c.mp4"), ProcessOptions::default())
        .unwrap();
    tokio::time::sleep(Duration::from_millis(60)).await;
    coordinator.cancel(&job_id).unwrap();

    let status = wait_terminal(&coordinator, &job_id).await;
    assert_eq!(status, JobStatus::Error);
    assert_eq!(coordinator.status(&job_id).unwrap().message, "cancelled");
}

#[tokio::test]
async fn test_cancel_finished_job_conflicts() {
    let tmp = tempfile::tempdir().unwrap();
    let coordinator = coordinator_with(
        Arc::new(HappyProcessor {
            delay: Duration::from_millis(1),
            processed: AtomicUsize::new(0),
        }),
        1,
        tmp.path(),
    );

    let job_id = coordinator
        .enqueue(source("d.mp4"), ProcessOptions::default())
        .unwrap();
    wait_terminal(&coordinator, &job_id).await;
    assert_eq!(
        coordinator.cancel(&job_id).unwrap_err(),
        CoordinatorError::Conflict("finished")
    );
}

#[tokio::test]
async fn test_cleanup_rejected_while_running_then_idempotent() {
    let tmp = tempfile::tempdir().unwrap();
    let coordinator = coordinator_with(
        Arc::new(HappyProcessor {
            delay: Duration::from_millis(50),
            processed: AtomicUsize::new(0),
        }),
        1,
        tmp.path(),
    );

    let job_id = coordinator
        .enqueue(source("e.mp4"), ProcessOptions::default())
        .unwrap();
    tokio::time::sleep(Duration::from_millis(60)).await;

    // Rejected while running
    assert_eq!(
        coordinator.cleanup(&job_id).await.unwrap_err(),
        CoordinatorError::Conflict("running")
    );

    wait_terminal(&coordinator, &job_id).await;
    coordinator.cleanup(&job_id).await.unwrap();

    // Second cleanup: the record is gone
    assert_eq!(
        coordinator.cleanup(&job_id).await.unwrap_err(),
        CoordinatorError::NotFound
    );
    assert_eq!(
        coordinator.status(&job_id).unwrap_err(),
        CoordinatorError::NotFound
    );
}

#[tokio::test]
async fn test_unknown_job_not_found() {
    let tmp = tempfile::tempdir().unwrap();
    let coordinator = coordinator_with(Arc::new(FailingProcessor), 1, tmp.path());
    let ghost = clipsmith_models::JobId::new();
    assert_eq!(
        coordinator.status(&ghost).unwrap_err(),
        CoordinatorError::NotFound
    );
    assert_eq!(
        coordinator.cancel(&ghost).unwrap_err(),
        CoordinatorError::NotFound
    );
}

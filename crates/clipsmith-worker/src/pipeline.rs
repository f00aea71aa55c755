//! The production pipeline: probe → transcribe → visual → fuse+score →
//! select → render → finalize.
//!
//! Progress lands on the canonical points (5/10/40/55/70/75/80/95/100) and
//! the cancel flag is polled at every stage boundary and between clip
//! renders. Per-clip render failures are contained: a failed clip is
//! dropped, and only an empty final list is terminal.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use clipsmith_engine::{
    fuse, select, Lexicon, Scorer, ScorerConfig, SelectorConfig, Transcriber, TranscriberConfig,
    VisualAnalyzer, VisualConfig,
};
use clipsmith_media::{
    build_entries, probe_video, render_clip, write_srt, ArtifactStore, RenderRequest,
};
use clipsmith_models::{Candidate, Clip, ConfigSnapshot, SpeechSegment};

use crate::coordinator::{JobProcessor, ProcessOutcome};
use crate::error::{WorkerError, WorkerResult};
use crate::job::JobEntry;

/// Output container extension for rendered clips.
const CLIP_EXT: &str = "mp4";

/// `metadata.json` document, written atomically on completion.
#[derive(Debug, Serialize)]
struct JobMetadata<'a> {
    job_id: &'a str,
    source: SourceMetadata<'a>,
    config_snapshot: &'a ConfigSnapshot,
    clips: &'a [Clip],
}

#[derive(Debug, Serialize)]
struct SourceMetadata<'a> {
    path: &'a str,
    duration: f64,
}

/// The production pipeline. One instance is shared by all workers; the
/// decoder and analyzer inside hold no per-job state.
pub struct Pipeline {
    transcriber: Transcriber,
    visual: VisualAnalyzer,
    lexicon: Lexicon,
}

impl Pipeline {
    pub fn new(transcriber: Transcriber, visual: VisualAnalyzer, lexicon: Lexicon) -> Self {
        Self {
            transcriber,
            visual,
            lexicon,
        }
    }

    /// Build from env + the process hardware profile.
    pub fn from_env() -> WorkerResult<Self> {
        let hardware = clipsmith_engine::hardware::profile();
        let lexicon = Lexicon::from_env().map_err(WorkerError::Engine)?;
        Ok(Self::new(
            Transcriber::new(TranscriberConfig::from_env(hardware)),
            VisualAnalyzer::new(VisualConfig::from_env()),
            lexicon,
        ))
    }

    fn check_cancel(job: &JobEntry) -> WorkerResult<()> {
        if job.cancel_requested() {
            Err(WorkerError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Render all selected candidates through the bounded pool. Returns the
    /// surviving clips in time order.
    async fn render_all(
        &self,
        job: &Arc<JobEntry>,
        store: &ArtifactStore,
        selected: &[Candidate],
        segments: &[SpeechSegment],
    ) -> WorkerResult<Vec<Clip>> {
        let config = &job.config;
        store.ensure_job_dir(&job.id).await.map_err(WorkerError::Media)?;

        let pool = Arc::new(Semaphore::new(config.max_parallel_renders.max(1)));
        let mut handles = Vec::with_capacity(selected.len());

        for (i, candidate) in selected.iter().enumerate() {
            // Cancel is observed between clip renders; in-flight renders
            // finish their clip and the result is discarded
            if job.cancel_requested() {
                break;
            }

            let index = i as u32 + 1;
            let mut clip = Clip::from_candidate(
                index,
                ArtifactStore::clip_filename(index, CLIP_EXT),
                candidate,
            );
            if !(config.hook.enabled && config.options.use_hook) {
                clip.hook_text = None;
            }

            let output = store.clip_path(&job.id, index, CLIP_EXT);
            let caption_path = store.caption_path(&job.id, index);
            let caption_entries = if config.options.auto_caption {
                build_entries(candidate.start, candidate.end, segments)
            } else {
                Vec::new()
            };

            let request = RenderRequest {
                start: candidate.start,
                end: candidate.end,
                target: config.render.clone(),
                hook_text: clip.hook_text.clone(),
                hook: config.hook.clone(),
                silence: config.silence.clone(),
            };

            let pool = pool.clone();
            let job_handle = job.clone();
            let source_path = job.source.path.clone();
            let cancel: Arc<AtomicBool> = Arc::new(AtomicBool::new(false));
            let cancel_probe = cancel.clone();

            handles.push(tokio::spawn(async move {
                let _permit = pool.acquire().await.expect("render pool closed");
                // Mirror the job's cancel flag at acquisition time
                cancel_probe.store(job_handle.cancel_requested(), Ordering::Relaxed);

                match render_clip(&source_path, &output, &request, cancel).await {
                    Ok(outcome) => {
                        clip.rendered_duration = Some(outcome.rendered_duration);
                        if outcome.degraded {
                            job_handle.log(format!("clip {index} rendered without extras"));
                        }
                        if !caption_entries.is_empty() {
                            match write_srt(&caption_path, &caption_entries).await {
                                Ok(()) => {
                                    clip.caption_file =
                                        Some(ArtifactStore::caption_filename(index));
                                }
                                Err(err) => {
                                    warn!(index, error = %err, "Caption sidecar write failed");
                                }
                            }
                        }
                        Some(clip)
                    }
                    Err(err) => {
                        warn!(index, error = %err, "Clip render failed, dropping");
                        job_handle.log(format!("clip {index} render failed: {err}"));
                        None
                    }
                }
            }));
        }

        let mut clips = Vec::new();
        for handle in handles {
            if let Ok(Some(clip)) = handle.await {
                clips.push(clip);
            }
        }

        Self::check_cancel(job)?;

        if clips.is_empty() {
            return Err(WorkerError::RenderFailedAll(format!(
                "0 of {} renders succeeded",
                selected.len()
            )));
        }

        clips.sort_by(|a, b| {
            a.start_seconds
                .partial_cmp(&b.start_seconds)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        self.renumber(store, &job.id, &mut clips).await;
        Ok(clips)
    }

    /// Dropped renders leave index gaps; close them so filenames stay
    /// contiguous, 1-indexed and in clip time order.
    async fn renumber(
        &self,
        store: &ArtifactStore,
        job_id: &clipsmith_models::JobId,
        clips: &mut [Clip],
    ) {
        for (i, clip) in clips.iter_mut().enumerate() {
            let index = i as u32 + 1;
            if clip.index == index {
                continue;
            }
            let old_path = store.clip_path(job_id, clip.index, CLIP_EXT);
            let new_path = store.clip_path(job_id, index, CLIP_EXT);
            if let Err(err) = tokio::fs::rename(&old_path, &new_path).await {
                warn!(from = clip.index, to = index, error = %err, "Clip renumber failed");
                continue;
            }
            if clip.caption_file.is_some() {
                let old_caption = store.caption_path(job_id, clip.index);
                let new_caption = store.caption_path(job_id, index);
                if tokio::fs::rename(&old_caption, &new_caption).await.is_ok() {
                    clip.caption_file = Some(ArtifactStore::caption_filename(index));
                }
            }
            clip.index = index;
            clip.file = ArtifactStore::clip_filename(index, CLIP_EXT);
        }
    }
}

#[async_trait]
impl JobProcessor for Pipeline {
    async fn process(
        &self,
        job: Arc<JobEntry>,
        store: ArtifactStore,
    ) -> WorkerResult<ProcessOutcome> {
        let config = job.config.clone();
        let source = job.source.clone();

        // Probe
        job.set_progress(5, "probing source");
        let info = probe_video(&source.path).await.map_err(WorkerError::Media)?;
        Self::check_cancel(&job)?;

        // Transcribe
        job.set_progress(10, "transcribing audio");
        let segments = self
            .transcriber
            .transcribe(&source.path, info.duration, &config.options.language)
            .await?;
        job.set_progress(40, format!("transcribed {} segments", segments.len()));
        Self::check_cancel(&job)?;

        // Visual analysis (sequential with transcription; they compete for
        // the same hardware)
        let scenes = self.visual.analyze(&source.path, &info).await?;
        job.set_progress(55, format!("analyzed {} scenes", scenes.len()));
        Self::check_cancel(&job)?;

        // Fuse + score
        let windows = fuse(&scenes, &segments);
        let scorer = Scorer::new(
            self.lexicon.clone(),
            ScorerConfig {
                style: config.options.style,
                clip_min: config.clip_min,
                clip_max: config.clip_max,
                use_hook: config.options.use_hook && config.hook.enabled,
            },
        );
        let candidates = scorer.score_all(&windows);
        job.set_progress(70, format!("scored {} candidates", candidates.len()));
        Self::check_cancel(&job)?;

        // Select
        let selector_config = SelectorConfig {
            min_clips_floor: config.min_clips_floor,
            max_clips: config.max_clips,
            min_viral: config.min_viral,
            duration_class: config.options.target_duration,
            clip_min: config.clip_min,
            clip_max: config.clip_max,
        };
        let selected = select(&candidates, info.duration, &selector_config)?;
        job.set_progress(75, format!("selected {} clips", selected.len()));
        Self::check_cancel(&job)?;

        // Render
        job.set_progress(80, "rendering clips");
        let clips = self.render_all(&job, &store, &selected, &segments).await?;
        job.set_progress(95, format!("rendered {} clips", clips.len()));
        Self::check_cancel(&job)?;

        // Finalize
        let source_path = source.path.to_string_lossy();
        let metadata = JobMetadata {
            job_id: job.id.as_str(),
            source: SourceMetadata {
                path: &source_path,
                duration: info.duration,
            },
            config_snapshot: &config,
            clips: &clips,
        };
        store
            .write_metadata(&job.id, &metadata)
            .await
            .map_err(WorkerError::Media)?;
        job.set_progress(100, "finalized");

        let warning = if clips.len() < config.min_clips_floor {
            Some(format!(
                "completed with {} of {} minimum clips",
                clips.len(),
                config.min_clips_floor
            ))
        } else if clips.len() < selected.len() {
            Some(format!(
                "completed with {} clips ({} dropped)",
                clips.len(),
                selected.len() - clips.len()
            ))
        } else {
            None
        };

        info!(job_id = %job.id, clips = clips.len(), "Pipeline finished");
        Ok(ProcessOutcome { clips, warning })
    }
}

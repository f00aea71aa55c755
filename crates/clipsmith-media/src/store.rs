//! On-disk artifact layout.
//!
//! ```text
//! <root>/uploads/<source-id>.<ext>
//! <root>/outputs/<job-id>/clip_<nnn>.<ext>
//! <root>/outputs/<job-id>/clip_<nnn>.captions
//! <root>/outputs/<job-id>/metadata.json
//! ```

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use clipsmith_models::{JobId, SourceId};

use crate::error::{MediaError, MediaResult};

/// Artifact store rooted at a single directory, partitioned per job.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root from the `ARTIFACT_ROOT` env var, defaulting to `./data`.
    pub fn from_env() -> Self {
        let root = std::env::var("ARTIFACT_ROOT").unwrap_or_else(|_| "data".to_string());
        Self::new(root)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.root.join("uploads")
    }

    pub fn outputs_dir(&self) -> PathBuf {
        self.root.join("outputs")
    }

    /// Create the uploads and outputs directories.
    pub async fn ensure_layout(&self) -> MediaResult<()> {
        tokio::fs::create_dir_all(self.uploads_dir()).await?;
        tokio::fs::create_dir_all(self.outputs_dir()).await?;
        Ok(())
    }

    pub fn upload_path(&self, source_id: &SourceId, ext: &str) -> PathBuf {
        self.uploads_dir().join(format!("{}.{}", source_id, ext))
    }

    pub fn job_dir(&self, job_id: &JobId) -> PathBuf {
        self.outputs_dir().join(job_id.as_str())
    }

    /// Create the per-job output directory.
    pub async fn ensure_job_dir(&self, job_id: &JobId) -> MediaResult<PathBuf> {
        let dir = self.job_dir(job_id);
        tokio::fs::create_dir_all(&dir).await?;
        Ok(dir)
    }

    /// Clip filename for a 1-indexed position: `clip_001.mp4`.
    pub fn clip_filename(index: u32, ext: &str) -> String {
        format!("clip_{:03}.{}", index, ext)
    }

    /// Caption sidecar filename for a clip: `clip_001.captions`.
    pub fn caption_filename(index: u32) -> String {
        format!("clip_{:03}.captions", index)
    }

    pub fn clip_path(&self, job_id: &JobId, index: u32, ext: &str) -> PathBuf {
        self.job_dir(job_id).join(Self::clip_filename(index, ext))
    }

    pub fn caption_path(&self, job_id: &JobId, index: u32) -> PathBuf {
        self.job_dir(job_id).join(Self::caption_filename(index))
    }

    pub fn metadata_path(&self, job_id: &JobId) -> PathBuf {
        self.job_dir(job_id).join("metadata.json")
    }

    /// Resolve a download request to a file inside the job directory,
    /// rejecting traversal outside it.
    pub fn resolve_artifact(&self, job_id: &JobId, file: &str) -> MediaResult<PathBuf> {
        if file.contains("..") || file.contains('/') || file.contains('\\') {
            return Err(MediaError::FileNotFound(PathBuf::from(file)));
        }
        let path = self.job_dir(job_id).join(file);
        if !path.exists() {
            return Err(MediaError::FileNotFound(path));
        }
        Ok(path)
    }

    /// Write `metadata.json` atomically: serialize into a temp file in the
    /// same directory, then rename over the target.
    pub async fn write_metadata<T: Serialize>(
        &self,
        job_id: &JobId,
        metadata: &T,
    ) -> MediaResult<()> {
        let dir = self.ensure_job_dir(job_id).await?;
        let target = self.metadata_path(job_id);
        let payload = serde_json::to_vec_pretty(metadata)?;

        let dir_clone = dir.clone();
        let target_clone = target.clone();
        tokio::task::spawn_blocking(move || -> MediaResult<()> {
            let mut tmp = tempfile::NamedTempFile::new_in(&dir_clone)?;
            tmp.write_all(&payload)?;
            tmp.flush()?;
            tmp.persist(&target_clone)
                .map_err(|e| MediaError::Io(e.error))?;
            Ok(())
        })
        .await
        .map_err(|e| MediaError::Io(std::io::Error::other(e)))??;

        info!(job_id = %job_id, path = %target.display(), "Metadata written");
        Ok(())
    }

    /// Remove every artifact of a job. Idempotent.
    pub async fn cleanup_job(&self, job_id: &JobId) -> MediaResult<()> {
        let dir = self.job_dir(job_id);
        if dir.exists() {
            tokio::fs::remove_dir_all(&dir).await?;
            info!(job_id = %job_id, "Job artifacts removed");
        }
        Ok(())
    }

    /// Remove an uploaded source file.
    pub async fn remove_upload(&self, path: &Path) -> MediaResult<()> {
        if path.starts_with(self.uploads_dir()) && path.exists() {
            tokio::fs::remove_file(path).await?;
        }
        Ok(())
    }

    /// Bundle all files in a job directory into a zip archive next to it.
    /// Returns the archive path. Blocking work runs off the async runtime.
    pub async fn archive_job(&self, job_id: &JobId) -> MediaResult<PathBuf> {
        let dir = self.job_dir(job_id);
        if !dir.exists() {
            return Err(MediaError::FileNotFound(dir));
        }
        let archive_path = self
            .outputs_dir()
            .join(format!("{}_clips.zip", job_id.as_str()));

        let archive_clone = archive_path.clone();
        tokio::task::spawn_blocking(move || -> MediaResult<()> {
            let file = std::fs::File::create(&archive_clone)?;
            let mut writer = zip::ZipWriter::new(file);
            let options = zip::write::SimpleFileOptions::default()
                .compression_method(zip::CompressionMethod::Deflated);

            let mut names: Vec<_> = std::fs::read_dir(&dir)?
                .filter_map(|e| e.ok())
                .filter(|e| e.path().is_file())
                .collect();
            names.sort_by_key(|e| e.file_name());

            for entry in names {
                let name = entry.file_name().to_string_lossy().to_string();
                writer.start_file(name, options)?;
                let bytes = std::fs::read(entry.path())?;
                writer.write_all(&bytes)?;
            }
            writer.finish()?;
            Ok(())
        })
        .await
        .map_err(|e| MediaError::Io(std::io::Error::other(e)))??;

        Ok(archive_path)
    }
}

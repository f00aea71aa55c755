//! External face-count probe.
//!
//! Face detection itself lives outside this system (the object-detection
//! add-on). When a probe binary is configured it is invoked per sampled
//! frame and asked for a face count; without one, scenes carry a zero face
//! signal and the monolog prior remains the only source of face presence.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use serde::Deserialize;
use tokio::process::Command;
use tracing::warn;

/// Wrapper around the configured face probe binary.
#[derive(Debug, Clone, Default)]
pub struct FaceProbe {
    bin: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct ProbeReport {
    faces: u32,
}

impl FaceProbe {
    /// Configure from `FACE_PROBE_BIN`; unset means no face signal.
    pub fn from_env() -> Self {
        let bin = std::env::var("FACE_PROBE_BIN")
            .ok()
            .map(PathBuf::from)
            .filter(|p| which::which(p).is_ok() || p.exists());
        Self { bin }
    }

    pub fn available(&self) -> bool {
        self.bin.is_some()
    }

    /// Count faces in one image. Probe failures degrade to zero rather than
    /// failing the scene.
    pub async fn count(&self, image: &Path) -> f64 {
        let Some(bin) = &self.bin else {
            return 0.0;
        };

        let result = tokio::time::timeout(
            Duration::from_secs(30),
            Command::new(bin)
                .arg(image)
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::null())
                .output(),
        )
        .await;

        let output = match result {
            Ok(Ok(output)) if output.status.success() => output,
            Ok(Ok(output)) => {
                warn!(code = ?output.status.code(), "Face probe exited non-zero");
                return 0.0;
            }
            Ok(Err(err)) => {
                warn!(error = %err, "Face probe failed to run");
                return 0.0;
            }
            Err(_) => {
                warn!("Face probe timed out");
                return 0.0;
            }
        };

        parse_count(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Accept either a bare integer or a `{"faces": n}` JSON report.
fn parse_count(stdout: &str) -> f64 {
    let trimmed = stdout.trim();
    if let Ok(n) = trimmed.parse::<u32>() {
        return n as f64;
    }
    if let Ok(report) = serde_json::from_str::<ProbeReport>(trimmed) {
        return report.faces as f64;
    }
    0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_count_integer() {
        assert!((parse_count("2\n") - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_parse_count_json() {
        assert!((parse_count(r#"{"faces": 3}"#) - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_parse_count_garbage() {
        assert!(parse_count("not a number").abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_unconfigured_probe_returns_zero() {
        let probe = FaceProbe::default();
        assert!(!probe.available());
        assert!(probe.count(Path::new("/tmp/x.png")).await.abs() < 1e-9);
    }
}

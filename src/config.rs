//! Run configuration and output directory preparation.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::batch::MAX_WORKERS;
use crate::http::RetryPolicy;
use crate::media::{DEFAULT_BINARY, DEFAULT_BITRATE_KBPS};
use crate::pipeline::PipelineConfig;
use crate::progress::ProgressMode;
use crate::spotify::Credentials;

pub const DEFAULT_OUTPUT_DIR: &str = "downloads";
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_RETRIES: u32 = 2;

/// Everything a run needs, validated once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub output_dir: PathBuf,
    pub workers: usize,
    /// None disables catalog matching
    pub credentials: Option<Credentials>,
    pub ytdlp_binary: PathBuf,
    pub bitrate_kbps: u32,
    pub timeout: Duration,
    pub retry: RetryPolicy,
    pub strict_cover: bool,
    pub progress: ProgressMode,
    pub report_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            workers: 1,
            credentials: None,
            ytdlp_binary: PathBuf::from(DEFAULT_BINARY),
            bitrate_kbps: DEFAULT_BITRATE_KBPS,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            retry: RetryPolicy::new(DEFAULT_RETRIES),
            strict_cover: false,
            progress: ProgressMode::Bar,
            report_path: None,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 || self.workers > MAX_WORKERS {
            bail!("--workers must be between 1 and {}, got {}", MAX_WORKERS, self.workers);
        }
        if self.bitrate_kbps == 0 {
            bail!("--bitrate must be positive");
        }
        if self.timeout.is_zero() {
            bail!("--timeout-secs must be positive");
        }
        Ok(())
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            output_dir: self.output_dir.clone(),
            strict_cover: self.strict_cover,
        }
    }
}

/// Build credentials only when both halves are present and non-blank.
pub fn credentials_from(client_id: Option<String>, client_secret: Option<String>) -> Option<Credentials> {
    let client_id = client_id.filter(|v| !v.trim().is_empty())?;
    let client_secret = client_secret.filter(|v| !v.trim().is_empty())?;
    Some(Credentials {
        client_id: client_id.trim().to_string(),
        client_secret: client_secret.trim().to_string(),
    })
}

/// Create the output directory if needed. A regular file at the path is
/// an error; nothing is ever deleted here.
pub fn prepare_output_dir(path: &Path) -> Result<()> {
    if path.exists() && !path.is_dir() {
        bail!(
            "Output path '{}' exists and is not a directory",
            path.display()
        );
    }
    std::fs::create_dir_all(path)
        .with_context(|| format!("Failed to create output directory '{}'", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.output_dir, PathBuf::from("downloads"));
        assert_eq!(config.retry.max_attempts, 3);
    }

    #[test]
    fn test_worker_bounds() {
        for workers in [0, MAX_WORKERS + 1] {
            let config = Config {
                workers,
                ..Config::default()
            };
            assert!(config.validate().is_err());
        }
        let config = Config {
            workers: MAX_WORKERS,
            ..Config::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_credentials_need_both_halves() {
        assert!(credentials_from(Some("id".into()), None).is_none());
        assert!(credentials_from(Some(" ".into()), Some("secret".into())).is_none());
        let credentials = credentials_from(Some(" id ".into()), Some("secret".into())).unwrap();
        assert_eq!(credentials.client_id, "id");
    }

    #[test]
    fn test_prepare_creates_nested_dir() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("a").join("b");
        prepare_output_dir(&out).unwrap();
        assert!(out.is_dir());
        // Existing directory is fine
        prepare_output_dir(&out).unwrap();
    }

    #[test]
    fn test_prepare_rejects_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("downloads");
        std::fs::write(&file, b"not a dir").unwrap();
        let err = prepare_output_dir(&file).unwrap_err();
        assert!(err.to_string().contains("not a directory"));
        assert!(file.is_file());
    }
}

//! Cover art download and the transient cover file.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::FetchError;
use crate::http::{read_body, with_retry, RetryPolicy};

/// Retrieves cover image bytes for a catalog cover URL.
pub trait CoverArtFetcher: Send + Sync {
    fn fetch(&self, cover_url: &str) -> Result<Vec<u8>, FetchError>;
}

pub struct HttpCoverFetcher {
    agent: ureq::Agent,
    retry: RetryPolicy,
}

impl HttpCoverFetcher {
    pub fn new(agent: ureq::Agent, retry: RetryPolicy) -> Self {
        Self { agent, retry }
    }
}

impl CoverArtFetcher for HttpCoverFetcher {
    fn fetch(&self, cover_url: &str) -> Result<Vec<u8>, FetchError> {
        let response = with_retry(self.retry, "cover fetch", || self.agent.get(cover_url).call())
            .map_err(|err| match err {
                ureq::Error::Status(code, _) => FetchError::Status(code),
                ureq::Error::Transport(transport) => FetchError::Transport(transport.to_string()),
            })?;
        Ok(read_body(response)?)
    }
}

/// A cover image on disk that lives only until it is dropped.
///
/// Dropping the guard deletes the file on every exit path, including
/// early returns after a failed embed.
#[derive(Debug)]
pub struct CoverFile {
    path: PathBuf,
}

impl CoverFile {
    /// Write `bytes` to `path` and take ownership of the file.
    pub fn create(path: impl Into<PathBuf>, bytes: &[u8]) -> io::Result<Self> {
        // Guard first so a partial write is removed too
        let cover = Self { path: path.into() };
        fs::write(&cover.path, bytes)?;
        Ok(cover)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for CoverFile {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => debug!("Removed cover file {}", self.path.display()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => warn!("Could not remove cover file {}: {}", self.path.display(), err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cover_file_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cover.jpg");
        {
            let cover = CoverFile::create(&path, b"\xFF\xD8\xFF").unwrap();
            assert!(cover.path().exists());
            assert_eq!(fs::read(cover.path()).unwrap(), b"\xFF\xD8\xFF");
        }
        assert!(!path.exists());
    }

    #[test]
    fn test_cover_file_removed_on_error_path() {
        fn failing_step(cover: &CoverFile) -> Result<(), String> {
            assert!(cover.path().exists());
            Err("embed failed".to_string())
        }

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cover.jpg");
        let result = (|| {
            let cover = CoverFile::create(&path, b"img").map_err(|e| e.to_string())?;
            failing_step(&cover)
        })();
        assert!(result.is_err());
        assert!(!path.exists());
    }

    #[test]
    fn test_drop_tolerates_already_removed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cover.jpg");
        let cover = CoverFile::create(&path, b"img").unwrap();
        fs::remove_file(&path).unwrap();
        drop(cover);
    }

    #[test]
    fn test_create_in_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("cover.jpg");
        assert!(CoverFile::create(&path, b"img").is_err());
    }
}

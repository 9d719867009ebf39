//! Error types for the enrichment pipeline.
//!
//! Catalog errors are always absorbed by the matcher. Everything else is
//! fatal to one item and surfaces as a `PipelineError` tagged with the stage
//! it happened in; the batch runner logs it and moves on.

use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Catalog access failures. None of these abort an item.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Credential exchange failed or no credentials were configured
    #[error("catalog credential unavailable: {0}")]
    Auth(String),

    /// 401/403 from the search endpoint
    #[error("catalog rejected the request as unauthorized (HTTP {0})")]
    Unauthorized(u16),

    #[error("catalog request failed: {0}")]
    Transport(String),

    #[error("catalog response could not be decoded: {0}")]
    Decode(String),
}

/// Cover image download failure.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("cover request returned HTTP {0}")]
    Status(u16),

    #[error("cover transport failure: {0}")]
    Transport(String),

    #[error("cover body could not be read: {0}")]
    Io(#[from] io::Error),
}

/// Failures of the external media tool (enumeration, resolution, download).
#[derive(Debug, Error)]
pub enum AcquireError {
    #[error("failed to launch {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: io::Error,
    },

    #[error("{tool} exited with {status}: {stderr}")]
    ToolFailed {
        tool: String,
        status: String,
        stderr: String,
    },

    #[error("media tool output is not valid info JSON: {0}")]
    Decode(String),

    #[error("source entry has no usable locator")]
    MissingLocator,

    #[error("expected audio file was not produced: {}", .0.display())]
    MissingOutput(PathBuf),
}

/// Tag container failures beyond the recoverable missing/corrupt tag case.
#[derive(Debug, Error)]
pub enum TagWriteError {
    #[error("media file not found: {}", .0.display())]
    MissingMedia(PathBuf),

    #[error("tag I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("tag encoding failed: {0}")]
    Id3(#[from] id3::Error),

    #[error("could not replace {}: {source}", path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Per-item pipeline stage, used to report where an item stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Resolving,
    Normalizing,
    Matching,
    Reconciling,
    AcquiringMedia,
    FetchingCover,
    Embedding,
    CleaningUp,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Resolving => "resolving",
            Stage::Normalizing => "normalizing",
            Stage::Matching => "matching",
            Stage::Reconciling => "reconciling",
            Stage::AcquiringMedia => "acquiring media",
            Stage::FetchingCover => "fetching cover",
            Stage::Embedding => "embedding",
            Stage::CleaningUp => "cleaning up",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

/// Item-fatal failure.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("could not resolve entry: {0}")]
    Resolve(#[source] AcquireError),

    #[error("media acquisition failed: {0}")]
    Acquire(#[source] AcquireError),

    #[error("cover fetch failed: {0}")]
    Cover(#[from] FetchError),

    #[error("cover file could not be written: {0}")]
    CoverFile(#[source] io::Error),

    #[error("tag write failed: {0}")]
    Tag(#[from] TagWriteError),
}

impl PipelineError {
    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::Resolve(_) => Stage::Resolving,
            PipelineError::Acquire(_) => Stage::AcquiringMedia,
            PipelineError::Cover(_) | PipelineError::CoverFile(_) => Stage::FetchingCover,
            PipelineError::Tag(_) => Stage::Embedding,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_of_error() {
        let err = PipelineError::Acquire(AcquireError::MissingOutput(PathBuf::from("a.mp3")));
        assert_eq!(err.stage(), Stage::AcquiringMedia);
        assert_eq!(err.stage().to_string(), "acquiring media");

        let err = PipelineError::from(FetchError::Status(404));
        assert_eq!(err.stage(), Stage::FetchingCover);
        assert!(err.to_string().contains("404"));
    }
}

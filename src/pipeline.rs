//! Per-item enrichment pipeline.
//!
//! One item moves linearly through resolving (for unresolved entries),
//! normalizing, matching, reconciling, media acquisition, cover fetch,
//! embedding and cleanup. Any item-fatal failure stops the item and comes
//! back tagged with its stage. There are no retries at this level.

use std::collections::HashMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, info_span, warn};

use crate::catalog::CatalogMatcher;
use crate::cover::{CoverArtFetcher, CoverFile};
use crate::error::{PipelineError, Stage};
use crate::media::{MediaDownloader, MediaSource};
use crate::models::{BatchEntry, ItemSuccess, RawItem};
use crate::normalize::{normalize, safe_file_stem};
use crate::reconcile::reconcile;
use crate::tagging::TagWriter;

/// Settings fixed at pipeline construction.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub output_dir: PathBuf,
    /// Abort the item when the cover cannot be fetched
    pub strict_cover: bool,
}

impl PipelineConfig {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            strict_cover: false,
        }
    }
}

/// `base` + `.ext` without touching dots already in the file name.
fn with_suffix(base: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = base.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

pub struct TrackPipeline {
    config: PipelineConfig,
    matcher: CatalogMatcher,
    source: Box<dyn MediaSource>,
    downloader: Box<dyn MediaDownloader>,
    covers: Box<dyn CoverArtFetcher>,
    tags: TagWriter,
    /// One lock per output stem; items sharing a stem write one at a time
    stem_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl TrackPipeline {
    pub fn new(
        config: PipelineConfig,
        matcher: CatalogMatcher,
        source: Box<dyn MediaSource>,
        downloader: Box<dyn MediaDownloader>,
        covers: Box<dyn CoverArtFetcher>,
    ) -> Self {
        Self {
            config,
            matcher,
            source,
            downloader,
            covers,
            tags: TagWriter::default(),
            stem_locks: Mutex::new(HashMap::new()),
        }
    }

    fn stem_lock(&self, stem: &str) -> Arc<Mutex<()>> {
        let mut locks = self.stem_locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(stem.to_string()).or_default())
    }

    /// Audio path for a file stem.
    pub fn media_path(&self, stem: &str) -> PathBuf {
        with_suffix(&self.config.output_dir.join(stem), ".mp3")
    }

    /// Transient cover path; the ordinal keeps parallel items apart.
    pub fn cover_path(&self, stem: &str, ordinal: u32) -> PathBuf {
        with_suffix(&self.config.output_dir.join(stem), &format!(".{}.jpg", ordinal))
    }

    /// Run one entry end to end. `ordinal` is its 1-based batch position.
    pub fn process(&self, entry: &BatchEntry, ordinal: u32) -> Result<ItemSuccess, PipelineError> {
        let _span = info_span!("item", ordinal).entered();

        let raw = match entry {
            BatchEntry::Ready(item) => item.clone(),
            BatchEntry::Unresolved(locator) => {
                debug!("Stage: {}", Stage::Resolving);
                self.source.resolve(locator).map_err(PipelineError::Resolve)?
            }
        };
        // Track number falls back to the batch position
        let raw = match raw.position {
            Some(_) => raw,
            None => raw.with_position(ordinal),
        };
        info!(
            "{} ({})",
            raw.display_title,
            raw.artist.as_deref().unwrap_or("unknown artist")
        );

        self.enrich(&raw, ordinal)
    }

    fn enrich(&self, raw: &RawItem, ordinal: u32) -> Result<ItemSuccess, PipelineError> {
        debug!("Stage: {}", Stage::Normalizing);
        let normalized = normalize(&raw.display_title);

        debug!("Stage: {}", Stage::Matching);
        let candidate =
            self.matcher
                .match_track(&normalized, raw.artist.as_deref(), raw.album.as_deref());

        debug!("Stage: {}", Stage::Reconciling);
        let record = reconcile(raw, candidate.as_ref());
        match &candidate {
            Some(c) => info!("Catalog match: {} - {} ({})", c.artist, c.title, c.album),
            None => info!("No catalog match, using source metadata"),
        }

        debug!("Stage: {}", Stage::AcquiringMedia);
        let stem = safe_file_stem(&record.artist, &record.title);
        // Held through cleanup so a duplicate stem waits, then overwrites
        let lock = self.stem_lock(&stem);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        let expected = self.media_path(&stem);
        if expected.exists() {
            warn!("{} already exists and will be overwritten", expected.display());
        }
        let base = self.config.output_dir.join(&stem);
        let media_path = self
            .downloader
            .download(raw, &base)
            .map_err(PipelineError::Acquire)?;

        let cover = match record.cover_url.as_deref() {
            Some(url) => {
                debug!("Stage: {}", Stage::FetchingCover);
                self.fetch_cover(url, &self.cover_path(&stem, ordinal))?
            }
            None => None,
        };

        debug!("Stage: {}", Stage::Embedding);
        self.tags
            .embed(&media_path, cover.as_ref().map(CoverFile::path), &record)?;
        let cover_embedded = cover.is_some();

        debug!("Stage: {}", Stage::CleaningUp);
        drop(cover);
        debug!("Stage: {}", Stage::Done);

        info!("Done: {}", media_path.display());
        Ok(ItemSuccess {
            path: media_path,
            title: record.title,
            artist: record.artist,
            catalog_matched: candidate.is_some(),
            cover_embedded,
        })
    }

    /// Fetch the cover into a scoped file. Failures degrade to "no cover"
    /// unless strict cover handling is configured.
    fn fetch_cover(&self, url: &str, path: &Path) -> Result<Option<CoverFile>, PipelineError> {
        let result = self
            .covers
            .fetch(url)
            .map_err(PipelineError::from)
            .and_then(|bytes| CoverFile::create(path, &bytes).map_err(PipelineError::CoverFile));

        match result {
            Ok(cover) => Ok(Some(cover)),
            Err(err) if self.config.strict_cover => Err(err),
            Err(err) => {
                warn!("{}; continuing without cover art", err);
                Ok(None)
            }
        }
    }
}

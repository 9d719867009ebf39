//! Core data models for the enrichment pipeline.
//!
//! This module contains the item, candidate and record types that flow
//! between normalization, catalog matching, reconciliation and tagging,
//! plus the serializable batch report.

use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;

// ============================================================================
// Source Field Precedence
// ============================================================================

/// Info-dict keys that may carry the artist, in precedence order.
pub const ARTIST_FIELDS: &[&str] = &["artist", "creator", "uploader"];

/// Info-dict keys that may carry the item locator, in precedence order.
pub const LOCATOR_FIELDS: &[&str] = &["webpage_url", "url"];

pub const UNKNOWN_TITLE: &str = "Unknown Title";
pub const UNKNOWN_ARTIST: &str = "Unknown Artist";

/// Return the first key in `fields` holding a non-empty string.
pub fn first_present(info: &Value, fields: &[&str]) -> Option<String> {
    fields
        .iter()
        .filter_map(|key| info.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .find(|value| !value.is_empty())
        .map(str::to_string)
}

// ============================================================================
// Source Models
// ============================================================================

/// One item as reported by the media source, before any cleanup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawItem {
    pub display_title: String,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub locator: String,
    pub position: Option<u32>, // 1-based, becomes the track number
}

impl RawItem {
    /// Build an item from a yt-dlp style info dict.
    /// Returns None when no locator can be found.
    pub fn from_info(info: &Value) -> Option<Self> {
        let locator = first_present(info, LOCATOR_FIELDS)?;
        Some(Self {
            display_title: first_present(info, &["title"])
                .unwrap_or_else(|| UNKNOWN_TITLE.to_string()),
            artist: first_present(info, ARTIST_FIELDS),
            album: first_present(info, &["album"]),
            locator,
            position: None,
        })
    }

    pub fn with_position(mut self, position: u32) -> Self {
        self.position = Some(position);
        self
    }
}

/// Result of enumerating a top-level locator.
#[derive(Clone, Debug)]
pub enum SourceListing {
    Single(RawItem),
    /// Entries carry only a locator and must be resolved individually.
    Collection {
        title: Option<String>,
        entries: Vec<String>,
    },
}

/// Work unit handed to the batch runner.
#[derive(Clone, Debug)]
pub enum BatchEntry {
    Ready(RawItem),
    Unresolved(String),
}

impl BatchEntry {
    pub fn label(&self) -> &str {
        match self {
            BatchEntry::Ready(item) => &item.display_title,
            BatchEntry::Unresolved(locator) => locator,
        }
    }
}

impl From<SourceListing> for Vec<BatchEntry> {
    fn from(listing: SourceListing) -> Self {
        match listing {
            SourceListing::Single(item) => vec![BatchEntry::Ready(item)],
            SourceListing::Collection { entries, .. } => {
                entries.into_iter().map(BatchEntry::Unresolved).collect()
            }
        }
    }
}

// ============================================================================
// Normalization / Catalog Models
// ============================================================================

/// Display title after noise removal and "Artist - Title" splitting.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NormalizedTitle {
    pub clean_title: String,
    pub extracted_artist: Option<String>,
}

/// One result row from the metadata catalog.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CatalogCandidate {
    pub title: String,
    pub artist: String, // Primary (first credited) artist
    pub album: String,
    pub cover_url: Option<String>,
}

/// Reconciled metadata for one output file.
///
/// `title` and `artist` are never empty.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CanonicalRecord {
    pub title: String,
    pub artist: String,
    pub album: Option<String>,
    pub track_number: Option<u32>,
    pub cover_url: Option<String>,
}

// ============================================================================
// Outcomes
// ============================================================================

/// What a successful item produced.
#[derive(Clone, Debug, Serialize)]
pub struct ItemSuccess {
    pub path: PathBuf,
    pub title: String,
    pub artist: String,
    pub catalog_matched: bool,
    pub cover_embedded: bool,
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ItemStatus {
    Succeeded(ItemSuccess),
    Failed { stage: String, reason: String },
}

#[derive(Clone, Debug, Serialize)]
pub struct ItemOutcome {
    pub ordinal: u32,
    pub label: String,
    #[serde(flatten)]
    pub status: ItemStatus,
}

impl ItemOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self.status, ItemStatus::Succeeded(_))
    }
}

/// Aggregate result of one batch run.
#[derive(Default, Debug, Clone, Serialize)]
pub struct BatchReport {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub catalog_matched: usize,
    pub elapsed_seconds: f64,
    pub outcomes: Vec<ItemOutcome>,
}

impl BatchReport {
    /// Build a report from outcomes already in input order.
    pub fn from_outcomes(outcomes: Vec<ItemOutcome>) -> Self {
        let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
        let catalog_matched = outcomes
            .iter()
            .filter(|o| matches!(&o.status, ItemStatus::Succeeded(s) if s.catalog_matched))
            .count();
        Self {
            attempted: outcomes.len(),
            succeeded,
            failed: outcomes.len() - succeeded,
            catalog_matched,
            elapsed_seconds: 0.0,
            outcomes,
        }
    }

    /// Write the report to a JSON file
    pub fn write_to_file(&self, path: &std::path::Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

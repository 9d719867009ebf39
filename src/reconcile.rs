//! Merge catalog and source metadata into one canonical record.
//!
//! A catalog candidate wins outright. Without one, the record is built
//! from the normalized display title and the source fields. The track
//! number always comes from the item's position.

use crate::models::{CanonicalRecord, CatalogCandidate, RawItem, UNKNOWN_ARTIST, UNKNOWN_TITLE};
use crate::normalize::normalize;

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Build the record for `raw`, preferring `candidate` when present. Total.
pub fn reconcile(raw: &RawItem, candidate: Option<&CatalogCandidate>) -> CanonicalRecord {
    let track_number = raw.position;

    if let Some(candidate) = candidate {
        return CanonicalRecord {
            title: candidate.title.clone(),
            artist: candidate.artist.clone(),
            album: Some(candidate.album.clone()),
            track_number,
            cover_url: candidate.cover_url.clone(),
        };
    }

    let normalized = normalize(&raw.display_title);
    let title = non_empty(&normalized.clean_title)
        .or_else(|| non_empty(&raw.display_title))
        .unwrap_or_else(|| UNKNOWN_TITLE.to_string());
    let artist = normalized
        .extracted_artist
        .as_deref()
        .and_then(non_empty)
        .or_else(|| raw.artist.as_deref().and_then(non_empty))
        .unwrap_or_else(|| UNKNOWN_ARTIST.to_string());

    CanonicalRecord {
        title,
        artist,
        album: raw.album.clone(),
        track_number,
        cover_url: None,
    }
}

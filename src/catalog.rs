//! Catalog matching: cascading query strategies plus album tie-break.
//!
//! The matcher never fails. Missing credentials, unauthorized answers and
//! transport errors all come back as "no candidate", which sends the
//! caller to the source-native metadata.

use tracing::{debug, warn};

use crate::error::CatalogError;
use crate::models::{CatalogCandidate, NormalizedTitle};

/// Result-count cap per query.
pub const SEARCH_LIMIT: usize = 5;

// ============================================================================
// Seams
// ============================================================================

/// Track search against an external catalog.
pub trait CatalogSearch: Send + Sync {
    /// Results in catalog rank order, at most `limit` of them.
    fn search(&self, query: &str, limit: usize) -> Result<Vec<CatalogCandidate>, CatalogError>;
}

/// One way of turning (title, artist) into a catalog query.
pub trait QueryStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// None when the strategy needs information we do not have.
    fn build_query(&self, title: &str, artist: Option<&str>) -> Option<String>;
}

// ============================================================================
// Strategies
// ============================================================================

/// `track:"{title}" artist:"{artist}"`
#[derive(Debug, Clone, Copy)]
pub struct FieldQuery;

/// `{title} {artist}` as plain terms.
#[derive(Debug, Clone, Copy)]
pub struct TitleArtistTerms;

/// `{title}` alone.
#[derive(Debug, Clone, Copy)]
pub struct TitleOnly;

fn unquoted(value: &str) -> String {
    value.replace('"', "")
}

impl QueryStrategy for FieldQuery {
    fn name(&self) -> &'static str {
        "field"
    }

    fn build_query(&self, title: &str, artist: Option<&str>) -> Option<String> {
        let artist = artist?;
        Some(format!(
            "track:\"{}\" artist:\"{}\"",
            unquoted(title),
            unquoted(artist)
        ))
    }
}

impl QueryStrategy for TitleArtistTerms {
    fn name(&self) -> &'static str {
        "title+artist"
    }

    fn build_query(&self, title: &str, artist: Option<&str>) -> Option<String> {
        artist.map(|artist| format!("{} {}", title, artist))
    }
}

impl QueryStrategy for TitleOnly {
    fn name(&self) -> &'static str {
        "title"
    }

    fn build_query(&self, title: &str, _artist: Option<&str>) -> Option<String> {
        Some(title.to_string())
    }
}

/// Strategies in fallback order, most specific first.
pub fn default_strategies() -> Vec<Box<dyn QueryStrategy>> {
    vec![
        Box::new(FieldQuery),
        Box::new(TitleArtistTerms),
        Box::new(TitleOnly),
    ]
}

// ============================================================================
// Matcher
// ============================================================================

pub struct CatalogMatcher {
    search: Option<Box<dyn CatalogSearch>>,
    strategies: Vec<Box<dyn QueryStrategy>>,
}

impl CatalogMatcher {
    pub fn new(search: Box<dyn CatalogSearch>) -> Self {
        Self {
            search: Some(search),
            strategies: default_strategies(),
        }
    }

    /// A matcher without catalog access; every lookup comes back empty.
    pub fn disabled() -> Self {
        Self {
            search: None,
            strategies: default_strategies(),
        }
    }

    pub fn with_strategies(mut self, strategies: Vec<Box<dyn QueryStrategy>>) -> Self {
        self.strategies = strategies;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.search.is_some()
    }

    /// Find the best catalog candidate for a normalized title.
    ///
    /// The extracted artist wins over `fallback_artist`. Strategies run in
    /// order until one returns a non-empty result set; any catalog error
    /// ends the cascade with no candidate.
    pub fn match_track(
        &self,
        normalized: &NormalizedTitle,
        fallback_artist: Option<&str>,
        fallback_album: Option<&str>,
    ) -> Option<CatalogCandidate> {
        let search = self.search.as_ref()?;

        let title = normalized.clean_title.trim();
        if title.is_empty() {
            debug!("Nothing left of the title to search for");
            return None;
        }
        let artist = normalized
            .extracted_artist
            .as_deref()
            .or(fallback_artist)
            .map(str::trim)
            .filter(|a| !a.is_empty());

        for strategy in &self.strategies {
            let Some(query) = strategy.build_query(title, artist) else {
                continue;
            };
            debug!("Searching catalog [{}]: {}", strategy.name(), query);

            match search.search(&query, SEARCH_LIMIT) {
                Ok(candidates) if candidates.is_empty() => continue,
                Ok(mut candidates) => {
                    candidates.truncate(SEARCH_LIMIT);
                    return select_candidate(candidates, fallback_album);
                }
                Err(CatalogError::Unauthorized(code)) => {
                    warn!("Catalog answered HTTP {}; check client id and secret", code);
                    return None;
                }
                Err(err) => {
                    warn!("{}", err);
                    return None;
                }
            }
        }

        None
    }
}

/// Album tie-break over candidates in catalog order.
///
/// With a known album, the first candidate whose album name contains it
/// (case-insensitive) wins; otherwise the first candidate.
pub fn select_candidate(
    candidates: Vec<CatalogCandidate>,
    fallback_album: Option<&str>,
) -> Option<CatalogCandidate> {
    let wanted = fallback_album
        .map(|album| album.trim().to_lowercase())
        .filter(|album| !album.is_empty());

    if let Some(wanted) = wanted {
        if let Some(index) = candidates
            .iter()
            .position(|c| c.album.to_lowercase().contains(&wanted))
        {
            return candidates.into_iter().nth(index);
        }
    }
    candidates.into_iter().next()
}

// ============================================================================
// TESTS
// ============================================================================

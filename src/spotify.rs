//! Spotify Web API catalog client.
//!
//! Exchanges client credentials for a bearer token once per run and serves
//! track searches through the `CatalogSearch` seam. The token is never
//! refreshed; a 401 after expiry degrades to fallback metadata like any
//! other unauthorized answer.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;
use std::fmt;
use tracing::info;

use crate::catalog::CatalogSearch;
use crate::error::CatalogError;
use crate::http::{with_retry, RetryPolicy};
use crate::models::CatalogCandidate;

pub const TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
pub const SEARCH_URL: &str = "https://api.spotify.com/v1/search";

/// Client id/secret pair for the client-credentials flow.
#[derive(Clone)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    /// `Authorization` header value for the token endpoint.
    pub fn basic_authorization(&self) -> String {
        let pair = format!("{}:{}", self.client_id, self.client_secret);
        format!("Basic {}", STANDARD.encode(pair))
    }
}

// ============================================================================
// Wire Models
// ============================================================================

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    tracks: Option<TrackPage>,
}

#[derive(Debug, Deserialize)]
struct TrackPage {
    #[serde(default)]
    items: Vec<TrackObject>,
}

#[derive(Debug, Deserialize)]
struct TrackObject {
    #[serde(default)]
    name: String,
    #[serde(default)]
    artists: Vec<ArtistObject>,
    album: Option<AlbumObject>,
}

#[derive(Debug, Deserialize)]
struct ArtistObject {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct AlbumObject {
    #[serde(default)]
    name: String,
    #[serde(default)]
    images: Vec<ImageObject>,
}

#[derive(Debug, Deserialize)]
struct ImageObject {
    url: String,
}

impl TrackObject {
    /// Rows without a title or a credited artist are dropped.
    fn into_candidate(self) -> Option<CatalogCandidate> {
        let title = self.name.trim().to_string();
        let artist = self
            .artists
            .into_iter()
            .map(|a| a.name.trim().to_string())
            .find(|name| !name.is_empty())?;
        if title.is_empty() {
            return None;
        }
        let (album, cover_url) = match self.album {
            // Images come largest first
            Some(album) => (album.name, album.images.into_iter().next().map(|i| i.url)),
            None => (String::new(), None),
        };
        Some(CatalogCandidate {
            title,
            artist,
            album,
            cover_url,
        })
    }
}

impl SearchResponse {
    /// Candidates in catalog order, at most `limit`.
    pub fn into_candidates(self, limit: usize) -> Vec<CatalogCandidate> {
        self.tracks
            .map(|page| page.items)
            .unwrap_or_default()
            .into_iter()
            .filter_map(TrackObject::into_candidate)
            .take(limit)
            .collect()
    }
}

// ============================================================================
// Client
// ============================================================================

pub struct SpotifyClient {
    agent: ureq::Agent,
    token: String,
    retry: RetryPolicy,
}

impl SpotifyClient {
    /// Run the client-credentials exchange. Any failure means "no credential".
    pub fn connect(
        agent: ureq::Agent,
        credentials: &Credentials,
        retry: RetryPolicy,
    ) -> Result<Self, CatalogError> {
        let authorization = credentials.basic_authorization();
        let response = with_retry(retry, "token exchange", || {
            agent
                .post(TOKEN_URL)
                .set("Authorization", &authorization)
                .send_form(&[("grant_type", "client_credentials")])
        })
        .map_err(|err| CatalogError::Auth(err.to_string()))?;

        let token: TokenResponse = response
            .into_json()
            .map_err(|err| CatalogError::Auth(format!("unreadable token response: {}", err)))?;

        info!("Catalog token acquired");
        Ok(Self {
            agent,
            token: token.access_token,
            retry,
        })
    }
}

impl CatalogSearch for SpotifyClient {
    fn search(&self, query: &str, limit: usize) -> Result<Vec<CatalogCandidate>, CatalogError> {
        let bearer = format!("Bearer {}", self.token);
        let limit_param = limit.to_string();

        let response = with_retry(self.retry, "catalog search", || {
            self.agent
                .get(SEARCH_URL)
                .set("Authorization", &bearer)
                .query("q", query)
                .query("type", "track")
                .query("limit", &limit_param)
                .call()
        });

        let response = match response {
            Ok(response) => response,
            Err(ureq::Error::Status(code @ (401 | 403), _)) => {
                return Err(CatalogError::Unauthorized(code))
            }
            Err(err) => return Err(CatalogError::Transport(err.to_string())),
        };

        let body: SearchResponse = response
            .into_json()
            .map_err(|err| CatalogError::Decode(err.to_string()))?;
        Ok(body.into_candidates(limit))
    }
}

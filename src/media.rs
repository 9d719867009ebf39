//! Media source collaborators: enumeration, entry resolution and audio
//! acquisition, backed by the `yt-dlp` command line tool.

use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::AcquireError;
use crate::models::{first_present, RawItem, SourceListing, LOCATOR_FIELDS};

pub const DEFAULT_BINARY: &str = "yt-dlp";
pub const DEFAULT_BITRATE_KBPS: u32 = 320;
pub const DEFAULT_SOCKET_TIMEOUT: Duration = Duration::from_secs(15);

// ============================================================================
// Seams
// ============================================================================

/// Lists and resolves source items.
pub trait MediaSource: Send + Sync {
    /// Inspect a top-level locator: one item, or a collection of entry
    /// locators that still need resolving.
    fn enumerate(&self, locator: &str) -> Result<SourceListing, AcquireError>;

    /// Fetch full metadata for a single entry locator.
    fn resolve(&self, locator: &str) -> Result<RawItem, AcquireError>;
}

/// Downloads and transcodes an item's audio.
pub trait MediaDownloader: Send + Sync {
    /// Produce `{base}.mp3` for `item` and return its path.
    fn download(&self, item: &RawItem, base: &Path) -> Result<PathBuf, AcquireError>;
}

// ============================================================================
// Info JSON
// ============================================================================

/// Interpret the JSON printed by `yt-dlp -J --flat-playlist`.
pub fn parse_listing(json: &str) -> Result<SourceListing, AcquireError> {
    let info: Value =
        serde_json::from_str(json).map_err(|err| AcquireError::Decode(err.to_string()))?;

    if info.get("_type").and_then(Value::as_str) != Some("playlist") {
        return RawItem::from_info(&info)
            .ok_or(AcquireError::MissingLocator)
            .map(SourceListing::Single);
    }

    let title = first_present(&info, &["title"]);
    let raw_entries = info
        .get("entries")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let mut entries = Vec::with_capacity(raw_entries.len());
    for (index, entry) in raw_entries.iter().enumerate() {
        // Unavailable entries come back as null or without any locator
        match first_present(entry, LOCATOR_FIELDS) {
            Some(locator) => entries.push(locator),
            None => warn!("Skipping collection entry {} with no locator", index + 1),
        }
    }

    Ok(SourceListing::Collection { title, entries })
}

/// Interpret the JSON printed by `yt-dlp -J --no-playlist`.
pub fn parse_item(json: &str) -> Result<RawItem, AcquireError> {
    let info: Value =
        serde_json::from_str(json).map_err(|err| AcquireError::Decode(err.to_string()))?;
    RawItem::from_info(&info).ok_or(AcquireError::MissingLocator)
}

/// yt-dlp treats `%` in output templates as a field marker.
pub fn output_template(base: &Path) -> String {
    format!("{}.%(ext)s", base.to_string_lossy().replace('%', "%%"))
}

// ============================================================================
// yt-dlp Adapter
// ============================================================================

#[derive(Debug, Clone)]
pub struct YtDlp {
    binary: PathBuf,
    bitrate_kbps: u32,
    socket_timeout: Duration,
}

impl Default for YtDlp {
    fn default() -> Self {
        Self::new(DEFAULT_BINARY, DEFAULT_BITRATE_KBPS)
    }
}

impl YtDlp {
    pub fn new(binary: impl Into<PathBuf>, bitrate_kbps: u32) -> Self {
        Self {
            binary: binary.into(),
            bitrate_kbps,
            socket_timeout: DEFAULT_SOCKET_TIMEOUT,
        }
    }

    /// Network timeout handed to every invocation.
    pub fn with_socket_timeout(mut self, timeout: Duration) -> Self {
        self.socket_timeout = timeout;
        self
    }

    fn socket_timeout_secs(&self) -> String {
        self.socket_timeout.as_secs().max(1).to_string()
    }

    fn tool_name(&self) -> String {
        self.binary.display().to_string()
    }

    pub fn download_args(&self, locator: &str, base: &Path) -> Vec<String> {
        vec![
            "--quiet".to_string(),
            "--no-warnings".to_string(),
            "--no-playlist".to_string(),
            "--force-overwrites".to_string(),
            "--socket-timeout".to_string(),
            self.socket_timeout_secs(),
            "-f".to_string(),
            "bestaudio/best".to_string(),
            "-x".to_string(),
            "--audio-format".to_string(),
            "mp3".to_string(),
            "--audio-quality".to_string(),
            format!("{}K", self.bitrate_kbps),
            "-o".to_string(),
            output_template(base),
            locator.to_string(),
        ]
    }

    fn run(&self, args: &[String]) -> Result<Output, AcquireError> {
        debug!("Running {} {}", self.tool_name(), args.join(" "));
        let output = Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|source| AcquireError::Spawn {
                tool: self.tool_name(),
                source,
            })?;

        if !output.status.success() {
            return Err(AcquireError::ToolFailed {
                tool: self.tool_name(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(output)
    }

    /// Arguments for an info dump; `mode` is `--flat-playlist` or `--no-playlist`.
    pub fn info_args(&self, locator: &str, mode: &str) -> Vec<String> {
        vec![
            "-J".to_string(),
            mode.to_string(),
            "--no-warnings".to_string(),
            "--socket-timeout".to_string(),
            self.socket_timeout_secs(),
            locator.to_string(),
        ]
    }

    fn dump_json(&self, locator: &str, mode: &str) -> Result<String, AcquireError> {
        let output = self.run(&self.info_args(locator, mode))?;
        String::from_utf8(output.stdout).map_err(|err| AcquireError::Decode(err.to_string()))
    }
}

impl MediaSource for YtDlp {
    fn enumerate(&self, locator: &str) -> Result<SourceListing, AcquireError> {
        let listing = parse_listing(&self.dump_json(locator, "--flat-playlist")?)?;
        if let SourceListing::Collection { title, entries } = &listing {
            info!(
                "Collection detected: '{}' with {} entries",
                title.as_deref().unwrap_or("untitled"),
                entries.len()
            );
        }
        Ok(listing)
    }

    fn resolve(&self, locator: &str) -> Result<RawItem, AcquireError> {
        parse_item(&self.dump_json(locator, "--no-playlist")?)
    }
}

impl MediaDownloader for YtDlp {
    fn download(&self, item: &RawItem, base: &Path) -> Result<PathBuf, AcquireError> {
        self.run(&self.download_args(&item.locator, base))?;

        let mut produced = base.as_os_str().to_owned();
        produced.push(".mp3");
        let produced = PathBuf::from(produced);
        if !produced.is_file() {
            return Err(AcquireError::MissingOutput(produced));
        }
        Ok(produced)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BatchEntry;

    #[test]
    fn test_parse_single_item() {
        let json = r#"{
            "_type": "video",
            "title": "Artist - Song (Official Video)",
            "uploader": "ArtistVEVO",
            "webpage_url": "https://music.youtube.com/watch?v=abc"
        }"#;
        match parse_listing(json).unwrap() {
            SourceListing::Single(item) => {
                assert_eq!(item.display_title, "Artist - Song (Official Video)");
                assert_eq!(item.artist.as_deref(), Some("ArtistVEVO"));
                assert_eq!(item.locator, "https://music.youtube.com/watch?v=abc");
            }
            other => panic!("expected a single item, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_collection_skips_unavailable_entries() {
        let json = r#"{
            "_type": "playlist",
            "title": "Road Trip",
            "entries": [
                {"url": "https://www.youtube.com/watch?v=1", "title": "One"},
                null,
                {"title": "Private video"},
                {"webpage_url": "https://www.youtube.com/watch?v=3"}
            ]
        }"#;
        match parse_listing(json).unwrap() {
            SourceListing::Collection { title, entries } => {
                assert_eq!(title.as_deref(), Some("Road Trip"));
                assert_eq!(
                    entries,
                    vec![
                        "https://www.youtube.com/watch?v=1".to_string(),
                        "https://www.youtube.com/watch?v=3".to_string(),
                    ]
                );
            }
            other => panic!("expected a collection, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_empty_collection() {
        let listing = parse_listing(r#"{"_type": "playlist", "title": "Empty"}"#).unwrap();
        let entries: Vec<BatchEntry> = listing.into();
        assert!(entries.is_empty());
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(parse_listing("not json"), Err(AcquireError::Decode(_))));
        assert!(matches!(
            parse_item(r#"{"title": "No locator"}"#),
            Err(AcquireError::MissingLocator)
        ));
    }

    #[test]
    fn test_output_template_escapes_percent() {
        let template = output_template(Path::new("downloads/100% Pure - Song"));
        assert_eq!(template, "downloads/100%% Pure - Song.%(ext)s");
    }

    #[test]
    fn test_download_args() {
        let ytdlp = YtDlp::new("yt-dlp", 192);
        let args = ytdlp.download_args("https://example.com/v", Path::new("out/A - B"));
        assert!(args.windows(2).any(|w| w == ["--audio-quality", "192K"]));
        assert!(args.windows(2).any(|w| w == ["--socket-timeout", "15"]));
        assert!(args.windows(2).any(|w| w == ["-f", "bestaudio/best"]));
        assert!(args.windows(2).any(|w| w == ["-o", "out/A - B.%(ext)s"]));
        assert_eq!(args.last().map(String::as_str), Some("https://example.com/v"));
    }

    #[test]
    fn test_info_args_carry_socket_timeout() {
        let ytdlp = YtDlp::default().with_socket_timeout(Duration::from_secs(30));
        let args = ytdlp.info_args("https://example.com/list", "--flat-playlist");
        assert_eq!(&args[..2], ["-J", "--flat-playlist"]);
        assert!(args.windows(2).any(|w| w == ["--socket-timeout", "30"]));
        assert_eq!(args.last().map(String::as_str), Some("https://example.com/list"));

        // Sub-second timeouts still pass a usable value
        let ytdlp = YtDlp::default().with_socket_timeout(Duration::from_millis(200));
        let args = ytdlp.download_args("https://example.com/v", Path::new("out/A - B"));
        assert!(args.windows(2).any(|w| w == ["--socket-timeout", "1"]));
    }

    #[test]
    fn test_missing_binary_is_spawn_error() {
        let ytdlp = YtDlp::new("/nonexistent/yt-dlp-binary", 320);
        assert!(matches!(
            ytdlp.resolve("https://example.com/v"),
            Err(AcquireError::Spawn { .. })
        ));
    }
}

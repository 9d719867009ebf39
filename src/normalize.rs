//! Display-title cleanup for catalog lookups.
//!
//! Source titles look like "Artist - Song (Official Video) [HD] ft. Someone".
//! `normalize` strips the noise and splits off an embedded artist; the
//! result feeds both the catalog queries and the fallback metadata.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::NormalizedTitle;

/// Separator between an embedded artist and the song title.
pub const ARTIST_TITLE_SEPARATOR: &str = " - ";

// ============================================================================
// REGEX PATTERNS
// ============================================================================

/// Noise removal patterns (applied in order, each on the output of the previous).
pub static NOISE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        // Parenthesized qualifiers: "(Full Album)", "(Full Album 2019)"
        Regex::new(r"(?i)\s*\(full album[^)]*\)").unwrap(),
        // "(Official Video)", "(Official Music Video)", "(Official Audio)"
        Regex::new(r"(?i)\s*\(official[^)]*\)").unwrap(),
        // "(Lyrics)", "(Lyric Video)"
        Regex::new(r"(?i)\s*\(lyrics?[^)]*\)").unwrap(),
        Regex::new(r"(?i)\s*\(audio[^)]*\)").unwrap(),
        Regex::new(r"(?i)\s*\(video[^)]*\)").unwrap(),
        // "(Visualizer)", "(Visualiser)"
        Regex::new(r"(?i)\s*\(visuali[sz]er[^)]*\)").unwrap(),
        // "(Live)", "(Live at Wembley)"
        Regex::new(r"(?i)\s*\(live[^)]*\)").unwrap(),
        // Any bracketed annotation: "[HD]", "[Official Audio]", "[4K]"
        Regex::new(r"\s*\[[^\]]*\]").unwrap(),
        // Credit suffix to end of string: "Song ft. Other", "Song (feat. Other)"
        // Word-bounded so "Left. Right" survives.
        Regex::new(r"(?i)\s*[(]?\b(?:ft|feat)\..*$").unwrap(),
    ]
});

/// Characters that are not allowed in output file names.
pub static UNSAFE_FILENAME_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[\\/*?:"<>|]"#).unwrap());

/// Regex to collapse whitespace runs left behind by removals
pub static MULTI_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s{2,}").unwrap());

// ============================================================================
// NORMALIZATION FUNCTIONS
// ============================================================================

/// Remove noise markers without splitting off an artist.
pub fn strip_noise(title: &str) -> String {
    let mut result = title.to_string();
    for pattern in NOISE_PATTERNS.iter() {
        result = pattern.replace_all(&result, "").to_string();
    }
    MULTI_SPACE.replace_all(&result, " ").trim().to_string()
}

/// Normalize a raw display title.
///
/// Splits on the FIRST `" - "` remaining after noise removal: the left side
/// is the extracted artist, the right side the clean title. Without a
/// separator the whole cleaned string is the title. Never fails; a title
/// made only of noise yields an empty `clean_title`.
pub fn normalize(raw_title: &str) -> NormalizedTitle {
    let cleaned = strip_noise(raw_title);

    match cleaned.split_once(ARTIST_TITLE_SEPARATOR) {
        Some((artist, title)) => NormalizedTitle {
            clean_title: title.trim().to_string(),
            extracted_artist: Some(artist.trim().to_string()),
        },
        None => NormalizedTitle {
            clean_title: cleaned,
            extracted_artist: None,
        },
    }
}

/// Build the output file stem `"{artist} - {title}"` with unsafe characters removed.
pub fn safe_file_stem(artist: &str, title: &str) -> String {
    let name = format!("{}{}{}", artist, ARTIST_TITLE_SEPARATOR, title);
    UNSAFE_FILENAME_CHARS.replace_all(&name, "").trim().to_string()
}

// ============================================================================
// TESTS
// ============================================================================

//! ID3 tag embedding.
//!
//! Tags are staged in a temporary copy next to the media file and moved
//! over the original in one rename, so a crash mid-write never leaves a
//! half-tagged file behind. Re-embedding replaces frames instead of
//! duplicating them.

use id3::frame::{Picture, PictureType};
use id3::{Tag, TagLike, Version};
use std::fs;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::error::TagWriteError;
use crate::models::CanonicalRecord;

pub const COVER_MIME_TYPE: &str = "image/jpeg";
pub const COVER_DESCRIPTION: &str = "Cover";

/// Writes canonical metadata and cover art into audio files.
#[derive(Debug, Clone, Copy)]
pub struct TagWriter {
    version: Version,
}

impl Default for TagWriter {
    fn default() -> Self {
        Self {
            version: Version::Id3v24,
        }
    }
}

impl TagWriter {
    /// Embed `record` (and the cover at `cover_path`, if it exists) into
    /// `media_path`.
    ///
    /// A missing or unreadable tag is replaced by a fresh one. Frames
    /// unrelated to title, artist, album, track and front cover are kept.
    pub fn embed(
        &self,
        media_path: &Path,
        cover_path: Option<&Path>,
        record: &CanonicalRecord,
    ) -> Result<(), TagWriteError> {
        if !media_path.is_file() {
            return Err(TagWriteError::MissingMedia(media_path.to_path_buf()));
        }

        let mut tag = load_tag(media_path)?;
        apply_record(&mut tag, record);

        if let Some(cover_path) = cover_path {
            if cover_path.is_file() {
                let data = fs::read(cover_path)?;
                replace_front_cover(&mut tag, data);
            } else {
                debug!("No cover at {}, leaving artwork unchanged", cover_path.display());
            }
        }

        self.write_staged(media_path, &tag)
    }

    /// Copy the media to a sibling temp file, tag the copy, then rename it
    /// over the original.
    fn write_staged(&self, media_path: &Path, tag: &Tag) -> Result<(), TagWriteError> {
        let dir = match media_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let staged = NamedTempFile::new_in(dir)?;
        fs::copy(media_path, staged.path())?;
        tag.write_to_path(staged.path(), self.version)?;

        staged
            .persist(media_path)
            .map_err(|err| TagWriteError::Persist {
                path: media_path.to_path_buf(),
                source: err.error,
            })?;
        Ok(())
    }
}

/// Read the existing tag. Missing tags start fresh; corrupt tags keep
/// whatever frames could be parsed. I/O failures propagate.
fn load_tag(media_path: &Path) -> Result<Tag, TagWriteError> {
    match Tag::read_from_path(media_path) {
        Ok(tag) => Ok(tag),
        Err(id3::Error {
            kind: id3::ErrorKind::NoTag,
            ..
        }) => Ok(Tag::new()),
        Err(id3::Error {
            kind: id3::ErrorKind::Io(err),
            ..
        }) => Err(TagWriteError::Io(err)),
        Err(err) => {
            warn!(
                "Discarding unreadable tag in {}: {}",
                media_path.display(),
                err.description
            );
            Ok(err.partial_tag.unwrap_or_else(Tag::new))
        }
    }
}

fn apply_record(tag: &mut Tag, record: &CanonicalRecord) {
    tag.set_title(record.title.as_str());
    tag.set_artist(record.artist.as_str());
    if let Some(album) = record.album.as_deref().filter(|a| !a.is_empty()) {
        tag.set_album(album);
    }
    if let Some(track) = record.track_number {
        tag.set_track(track);
    }
}

fn replace_front_cover(tag: &mut Tag, data: Vec<u8>) {
    tag.remove_picture_by_type(PictureType::CoverFront);
    tag.add_frame(Picture {
        mime_type: COVER_MIME_TYPE.to_string(),
        picture_type: PictureType::CoverFront,
        description: COVER_DESCRIPTION.to_string(),
        data,
    });
}

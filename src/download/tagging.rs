//! ID3 tagging of downloaded MP3 files.

use std::path::{Path, PathBuf};

use lofty::error::LoftyError;
use lofty::{Accessor, Picture, PictureType, Probe, Tag, TagExt, TaggedFileExt};
use thiserror::Error;
use tracing::debug;

use crate::item::WorkItem;

/// Artist written when neither reader nor author is known.
pub const UNKNOWN_ARTIST: &str = "Unknown";

#[derive(Debug, Error)]
pub enum TagError {
    #[error("cannot read audio file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: LoftyError,
    },

    #[error("cannot write tags to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: LoftyError,
    },

    #[error("cannot read cover {path}: {source}")]
    CoverIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported cover image {path}: {source}")]
    Cover {
        path: PathBuf,
        #[source]
        source: LoftyError,
    },
}

/// Values written to one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackTags {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub cover: Option<PathBuf>,
}

impl TrackTags {
    /// Tags for a file of `item`: the track title when known, else the item title.
    /// The reader is credited as artist before the author.
    #[must_use]
    pub fn for_item(item: &WorkItem, track_title: Option<&str>, cover: Option<&Path>) -> Self {
        let album = item
            .title
            .clone()
            .unwrap_or_else(|| crate::site::slug_from_url(&item.source_url));
        Self {
            title: track_title.map_or_else(|| album.clone(), str::to_string),
            artist: item
                .reader
                .clone()
                .or_else(|| item.author.clone())
                .unwrap_or_else(|| UNKNOWN_ARTIST.to_string()),
            album,
            cover: cover.map(Path::to_path_buf),
        }
    }
}

/// Writes title, artist, album and front cover into the file's primary tag.
///
/// Blocking; run it off the async executor.
///
/// # Errors
///
/// Returns [`TagError`] when the file is not a readable audio file, the
/// cover cannot be loaded, or the tag cannot be saved.
pub fn tag_mp3(path: &Path, tags: &TrackTags) -> Result<(), TagError> {
    let tagged = Probe::open(path)
        .and_then(Probe::read)
        .map_err(|source| TagError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    let tag_type = tagged.primary_tag_type();
    let mut tag = tagged
        .tag(tag_type)
        .cloned()
        .unwrap_or_else(|| Tag::new(tag_type));

    tag.set_title(tags.title.clone());
    tag.set_artist(tags.artist.clone());
    tag.set_album(tags.album.clone());

    if let Some(cover_path) = &tags.cover {
        let bytes = std::fs::read(cover_path).map_err(|source| TagError::CoverIo {
            path: cover_path.clone(),
            source,
        })?;
        let mut picture =
            Picture::from_reader(&mut bytes.as_slice()).map_err(|source| TagError::Cover {
                path: cover_path.clone(),
                source,
            })?;
        picture.set_pic_type(PictureType::CoverFront);
        tag.remove_picture_type(PictureType::CoverFront);
        tag.push_picture(picture);
    }

    tag.save_to_path(path).map_err(|source| TagError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), title = %tags.title, "tags written");
    Ok(())
}

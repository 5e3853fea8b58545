//! The audiotags module reads the raw metadata of an audio file.
//!
//! Reading is behind the `MetadataReader` trait so that the extractor and the miner can be driven
//! by fake readers in tests. The default implementation reads ID3 tags with the `id3` crate.

use std::fs;
use std::io;
use std::path::Path;

use chrono::{DateTime, Datelike, Local};
use id3::{Tag as Id3Tag, TagLike};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("Failed to read tags: {0}")]
    Tag(#[from] id3::Error),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("{0}")]
    Other(String),
}

/// Tag values exactly as found in the file. Nothing is defaulted here; see `Extractor` for that.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTags {
    pub performer: Option<String>,
    pub title: Option<String>,
    pub album: Option<String>,
    pub year: Option<i32>,
    pub genre: Option<String>,
    pub track_number: Option<u32>,
    pub total_tracks: Option<u32>,
}

pub trait MetadataReader: Send {
    fn read(&self, path: &Path) -> Result<RawTags, MetadataError>;

    /// Year the file was created, in local time. Filesystems without a creation time fall back to
    /// the modification time.
    fn creation_year(&self, path: &Path) -> io::Result<i32> {
        let meta = fs::metadata(path)?;
        let time = meta.created().or_else(|_| meta.modified())?;
        Ok(DateTime::<Local>::from(time).year())
    }
}

/// Reads ID3v1/ID3v2 tags. A file without any tag is read as empty tags rather than an error, so
/// that it is still indexed with default values.
#[derive(Debug, Clone, Copy, Default)]
pub struct Id3Reader;

fn non_empty(s: Option<&str>) -> Option<String> {
    s.map(|s| s.trim_end_matches('\0').to_string()).filter(|s| !s.is_empty())
}

impl MetadataReader for Id3Reader {
    fn read(&self, path: &Path) -> Result<RawTags, MetadataError> {
        let tag = match Id3Tag::read_from_path(path) {
            Ok(tag) => tag,
            Err(e) if matches!(e.kind, id3::ErrorKind::NoTag) => {
                debug!("no ID3 tag in {}", path.display());
                return Ok(RawTags::default());
            }
            Err(e) => return Err(e.into()),
        };

        Ok(RawTags {
            performer: non_empty(tag.artist()),
            title: non_empty(tag.title()),
            album: non_empty(tag.album()),
            year: tag.year().or_else(|| tag.date_recorded().map(|ts| ts.year)),
            genre: tag.genre_parsed().and_then(|g| non_empty(Some(&*g))),
            track_number: tag.track(),
            total_tracks: tag.total_tracks(),
        })
    }
}

//! The extractor turns the raw tags of one file into the fields of a track, filling in defaults
//! for anything the tags leave out.

use std::path::{Path, PathBuf};

use crate::audiotags::MetadataReader;
use crate::error::{Result, RolasExpectedError};

/// Stands in for a missing performer, title, album or genre.
pub const UNKNOWN: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackFields {
    pub path: PathBuf,
    pub performer: String,
    pub title: String,
    pub album: String,
    pub genre: String,
    pub year: i32,
    pub track_number: u32,
    pub total_tracks: Option<u32>,
}

impl TrackFields {
    /// "3/12" when the total is known, "3" otherwise. Used for display only.
    pub fn track_display(&self) -> String {
        match self.total_tracks {
            Some(total) if total > 0 => format!("{}/{}", self.track_number, total),
            _ => self.track_number.to_string(),
        }
    }

    /// The directory the file lives in. Albums are keyed by this path together with their name.
    pub fn album_path(&self) -> PathBuf {
        self.path.parent().map(Path::to_path_buf).unwrap_or_default()
    }
}

fn or_unknown(value: Option<String>) -> String {
    match value.map(|s| s.trim_end_matches('\0').to_string()) {
        Some(s) if !s.trim().is_empty() => s,
        _ => UNKNOWN.to_string(),
    }
}

pub struct Extractor<R> {
    reader: R,
}

impl<R: MetadataReader> Extractor<R> {
    pub fn new(reader: R) -> Self {
        Extractor { reader }
    }

    pub fn extract(&self, path: &Path) -> Result<TrackFields> {
        let failed = |cause: String| RolasExpectedError::ExtractionFailed { path: path.to_path_buf(), cause };

        let raw = self.reader.read(path).map_err(|e| failed(e.to_string()))?;
        let year = match raw.year.filter(|y| *y != 0) {
            Some(y) => y,
            None => self.reader.creation_year(path).map_err(|e| failed(format!("cannot determine creation year: {}", e)))?,
        };

        Ok(TrackFields {
            path: path.to_path_buf(),
            performer: or_unknown(raw.performer),
            title: or_unknown(raw.title),
            album: or_unknown(raw.album),
            genre: or_unknown(raw.genre),
            year,
            track_number: raw.track_number.unwrap_or(0),
            total_tracks: raw.total_tracks,
        })
    }
}

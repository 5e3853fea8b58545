//! The crawler module finds the audio files below a music directory.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::{Result, RolasExpectedError};

/// The only audio format that is indexed. Matched case-insensitively.
pub const AUDIO_EXTENSION: &str = "mp3";

pub fn is_audio_file(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()).is_some_and(|e| e.eq_ignore_ascii_case(AUDIO_EXTENSION))
}

/// A directory entry the crawl could not descend into or stat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEntry {
    pub path: PathBuf,
    pub reason: String,
}

/// A lazy, recursive traversal yielding audio files in file name order. Symlinks are followed.
/// Entries that fail below the root are skipped and remembered instead of ending the traversal.
pub struct Crawl {
    walker: walkdir::IntoIter,
    skipped: Vec<SkippedEntry>,
}

impl std::fmt::Debug for Crawl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Crawl").field("skipped", &self.skipped).finish_non_exhaustive()
    }
}

/// Starts a traversal of `root`. Fails up front when the root itself cannot be listed.
pub fn crawl(root: &Path) -> Result<Crawl> {
    fs::read_dir(root).map_err(|e| RolasExpectedError::IoUnavailable { path: root.to_path_buf(), source: e })?;
    debug!("crawling {}", root.display());
    Ok(Crawl { walker: WalkDir::new(root).follow_links(true).sort_by_file_name().into_iter(), skipped: Vec::new() })
}

/// Number of audio files below `root`, used as the progress total of a mining run.
pub fn count_audio_files(root: &Path) -> Result<usize> {
    Ok(crawl(root)?.count())
}

impl Crawl {
    pub fn skipped(&self) -> &[SkippedEntry] {
        &self.skipped
    }

    pub fn take_skipped(&mut self) -> Vec<SkippedEntry> {
        std::mem::take(&mut self.skipped)
    }
}

impl Iterator for Crawl {
    type Item = PathBuf;

    fn next(&mut self) -> Option<PathBuf> {
        loop {
            match self.walker.next()? {
                Ok(entry) => {
                    if entry.file_type().is_file() && is_audio_file(entry.path()) {
                        return Some(entry.into_path());
                    }
                }
                Err(e) => {
                    let path = e.path().map(Path::to_path_buf).unwrap_or_default();
                    warn!("skipping {}: {}", path.display(), e);
                    self.skipped.push(SkippedEntry { path, reason: e.to_string() });
                }
            }
        }
    }
}

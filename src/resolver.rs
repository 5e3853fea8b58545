//! Lookup-or-create of the performers and albums that tracks point at.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use rusqlite::Connection;
use tracing::debug;

use crate::albums::{get_album, insert_album, Album};
use crate::error::StorageResult;
use crate::performers::{get_performer, insert_performer, Performer};

/// Resolves names to ids, creating rows on first sight. Ids are cached for the lifetime of the
/// resolver, which is one mining run. A cached id is only trusted while its row still carries the
/// same key, since the store may be edited between files.
#[derive(Debug, Default)]
pub struct EntityResolver {
    performers: HashMap<String, i64>,
    albums: HashMap<(String, PathBuf), i64>,
}

impl EntityResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// New performers start out with kind Unknown.
    pub fn resolve_performer(&mut self, conn: &Connection, name: &str) -> StorageResult<i64> {
        if let Some(&id) = self.performers.get(name) {
            if get_performer(conn, id)?.is_some_and(|p| p.name == name) {
                return Ok(id);
            }
            debug!("cached performer {} ({}) changed in the store", name, id);
            self.performers.remove(name);
        }
        let inserted = insert_performer(conn, &Performer::new(name))?;
        debug!("resolved performer {} to {} (new: {})", name, inserted.id(), inserted.is_new());
        self.performers.insert(name.to_string(), inserted.id());
        Ok(inserted.id())
    }

    /// The year is only used when the album is created; an existing album keeps its own.
    pub fn resolve_album(&mut self, conn: &Connection, name: &str, path: &Path, year: i32) -> StorageResult<i64> {
        let key = (name.to_string(), path.to_path_buf());
        if let Some(&id) = self.albums.get(&key) {
            if get_album(conn, id)?.is_some_and(|a| a.name == name && a.path == path) {
                return Ok(id);
            }
            debug!("cached album {} ({}) changed in the store", name, id);
            self.albums.remove(&key);
        }
        let album = Album { id: 0, path: path.to_path_buf(), name: name.to_string(), year };
        let inserted = insert_album(conn, &album)?;
        debug!("resolved album {} to {} (new: {})", name, inserted.id(), inserted.is_new());
        self.albums.insert(key, inserted.id());
        Ok(inserted.id())
    }

    /// Forgets cached ids, e.g. after a transaction that created them was rolled back.
    pub fn clear(&mut self) {
        self.performers.clear();
        self.albums.clear();
    }
}

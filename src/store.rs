//! The store module owns the SQLite database that holds the library.
//!
//! A `Store` wraps a single connection behind a mutex, so it can be shared between the foreground
//! and a background mining run through an `Arc<Store>`. Every operation takes the lock for its
//! duration. Mining runs additionally hold `mining_guard()`, which serializes them against each
//! other without blocking foreground reads between files.
//!
//! The entity operations themselves live in the per-entity modules as free functions over a
//! `&Connection`; the methods here lock, delegate, and in a few places wrap the call in a
//! transaction.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use rusqlite::Connection;
use tracing::{debug, info};

use crate::albums::{self, Album};
use crate::common::Inserted;
use crate::config::Config;
use crate::error::{StorageError, StorageResult};
use crate::filters::{Filter, Params};
use crate::groups::{self, Group};
use crate::performers::{self, Performer, PerformerDefinition, PerformerKind};
use crate::persons::{self, Person};
use crate::tracks::{self, Track};

static SCHEMA: &str = include_str!("schema.sql");

pub struct Store {
    conn: Mutex<Option<Connection>>,
    mining: Mutex<()>,
    path: Option<PathBuf>,
}

fn configure(conn: &Connection) -> StorageResult<()> {
    conn.execute_batch(
        "
        PRAGMA foreign_keys = ON;
        PRAGMA journal_mode = WAL;
        PRAGMA busy_timeout = 15000;
        ",
    )?;
    Ok(())
}

impl Store {
    /// Opens the database at `path`, creating the file, its parent directory and the schema if
    /// they do not exist yet.
    pub fn open(path: &Path) -> StorageResult<Store> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| StorageError::Unavailable(format!("cannot create directory {}: {}", parent.display(), e)))?;
        }
        let is_new = !path.exists();
        let conn = Connection::open(path).map_err(|e| StorageError::Unavailable(format!("cannot open {}: {}", path.display(), e)))?;
        configure(&conn)?;
        let store = Store { conn: Mutex::new(Some(conn)), mining: Mutex::new(()), path: Some(path.to_path_buf()) };
        if is_new {
            info!("creating new database at {}", path.display());
        }
        store.create_schema()?;
        Ok(store)
    }

    pub fn open_in_memory() -> StorageResult<Store> {
        let conn = Connection::open_in_memory()?;
        configure(&conn)?;
        let store = Store { conn: Mutex::new(Some(conn)), mining: Mutex::new(()), path: None };
        store.create_schema()?;
        Ok(store)
    }

    pub fn from_config(c: &Config) -> StorageResult<Store> {
        Store::open(&c.database_path)
    }

    /// The database file, or None for an in-memory store.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn with_connection<T>(&self, f: impl FnOnce(&Connection) -> StorageResult<T>) -> StorageResult<T> {
        let guard = self.conn.lock().map_err(|_| StorageError::Unavailable("store lock poisoned".to_string()))?;
        let conn = guard.as_ref().ok_or_else(|| StorageError::Unavailable("store is closed".to_string()))?;
        f(conn)
    }

    /// Runs `f` inside a transaction that is committed if `f` succeeds and rolled back otherwise.
    pub fn transaction<T>(&self, f: impl FnOnce(&Connection) -> StorageResult<T>) -> StorageResult<T> {
        let mut guard = self.conn.lock().map_err(|_| StorageError::Unavailable("store lock poisoned".to_string()))?;
        let conn = guard.as_mut().ok_or_else(|| StorageError::Unavailable("store is closed".to_string()))?;
        let tx = conn.transaction()?;
        let rv = f(&tx)?;
        tx.commit()?;
        Ok(rv)
    }

    /// Held for the whole of a mining run. A second run blocks here until the first finishes.
    pub fn mining_guard(&self) -> StorageResult<MutexGuard<'_, ()>> {
        self.mining.lock().map_err(|_| StorageError::Unavailable("mining lock poisoned".to_string()))
    }

    pub fn create_schema(&self) -> StorageResult<()> {
        self.with_connection(|conn| {
            conn.execute_batch(SCHEMA)?;
            debug!("schema is up to date");
            Ok(())
        })
    }

    /// True when no track has been stored yet.
    pub fn is_empty(&self) -> StorageResult<bool> {
        Ok(self.with_connection(tracks::count_tracks)? == 0)
    }

    /// Closes the connection. Closing twice is a no-op; any other operation on a closed store
    /// fails with `StorageError::Unavailable`.
    pub fn close(&self) -> StorageResult<()> {
        let mut guard = self.conn.lock().map_err(|_| StorageError::Unavailable("store lock poisoned".to_string()))?;
        if let Some(conn) = guard.take() {
            conn.close().map_err(|(_, e)| StorageError::from(e))?;
            info!("closed database");
        }
        Ok(())
    }

    // Performers

    pub fn insert_performer(&self, performer: &Performer) -> StorageResult<Inserted> {
        self.with_connection(|conn| performers::insert_performer(conn, performer))
    }

    pub fn get_performer(&self, id: i64) -> StorageResult<Option<Performer>> {
        self.with_connection(|conn| performers::get_performer(conn, id))
    }

    pub fn get_performer_by_name(&self, name: &str) -> StorageResult<Option<Performer>> {
        self.with_connection(|conn| performers::get_performer_by_name(conn, name))
    }

    pub fn performer_kind(&self, name: &str) -> StorageResult<Option<PerformerKind>> {
        self.with_connection(|conn| performers::performer_kind(conn, name))
    }

    pub fn update_performer(&self, performer: &Performer) -> StorageResult<bool> {
        self.with_connection(|conn| performers::update_performer(conn, performer))
    }

    pub fn list_performers(&self) -> StorageResult<Vec<Performer>> {
        self.with_connection(performers::list_performers)
    }

    pub fn query_performers(&self, filter: &Filter, params: &Params) -> StorageResult<Vec<Performer>> {
        self.with_connection(|conn| performers::query_performers(conn, filter, params))
    }

    pub fn redefine_performer(&self, performer_id: i64, definition: &PerformerDefinition) -> StorageResult<i64> {
        self.transaction(|conn| performers::redefine_performer(conn, performer_id, definition))
    }

    // Persons

    pub fn insert_person(&self, person: &Person) -> StorageResult<Inserted> {
        self.with_connection(|conn| persons::insert_person(conn, person))
    }

    pub fn get_person(&self, id: i64) -> StorageResult<Option<Person>> {
        self.with_connection(|conn| persons::get_person(conn, id))
    }

    pub fn get_person_by_stage_name(&self, stage_name: &str) -> StorageResult<Option<Person>> {
        self.with_connection(|conn| persons::get_person_by_stage_name(conn, stage_name))
    }

    pub fn update_person(&self, person: &Person) -> StorageResult<bool> {
        self.with_connection(|conn| persons::update_person(conn, person))
    }

    pub fn list_persons(&self) -> StorageResult<Vec<Person>> {
        self.with_connection(persons::list_persons)
    }

    // Groups and membership

    pub fn insert_group(&self, group: &Group) -> StorageResult<Inserted> {
        self.with_connection(|conn| groups::insert_group(conn, group))
    }

    pub fn get_group(&self, id: i64) -> StorageResult<Option<Group>> {
        self.with_connection(|conn| groups::get_group(conn, id))
    }

    pub fn get_group_by_name(&self, name: &str) -> StorageResult<Option<Group>> {
        self.with_connection(|conn| groups::get_group_by_name(conn, name))
    }

    pub fn update_group(&self, group: &Group) -> StorageResult<bool> {
        self.with_connection(|conn| groups::update_group(conn, group))
    }

    pub fn list_groups(&self) -> StorageResult<Vec<Group>> {
        self.with_connection(groups::list_groups)
    }

    pub fn insert_membership(&self, person_id: i64, group_id: i64) -> StorageResult<bool> {
        self.with_connection(|conn| groups::insert_membership(conn, person_id, group_id))
    }

    pub fn is_membership(&self, person_id: i64, group_id: i64) -> StorageResult<bool> {
        self.with_connection(|conn| groups::is_membership(conn, person_id, group_id))
    }

    pub fn members_of(&self, group_id: i64) -> StorageResult<Vec<Person>> {
        self.with_connection(|conn| groups::members_of(conn, group_id))
    }

    pub fn groups_of(&self, person_id: i64) -> StorageResult<Vec<Group>> {
        self.with_connection(|conn| groups::groups_of(conn, person_id))
    }

    // Albums

    pub fn insert_album(&self, album: &Album) -> StorageResult<Inserted> {
        self.with_connection(|conn| albums::insert_album(conn, album))
    }

    pub fn get_album(&self, id: i64) -> StorageResult<Option<Album>> {
        self.with_connection(|conn| albums::get_album(conn, id))
    }

    pub fn get_album_by_name_and_path(&self, name: &str, path: &Path) -> StorageResult<Option<Album>> {
        self.with_connection(|conn| albums::get_album_by_name_and_path(conn, name, path))
    }

    pub fn update_album(&self, album: &Album) -> StorageResult<bool> {
        self.with_connection(|conn| albums::update_album(conn, album))
    }

    pub fn list_albums(&self) -> StorageResult<Vec<Album>> {
        self.with_connection(albums::list_albums)
    }

    pub fn query_albums(&self, filter: &Filter, params: &Params) -> StorageResult<Vec<Album>> {
        self.with_connection(|conn| albums::query_albums(conn, filter, params))
    }

    // Tracks

    pub fn insert_track(&self, track: &Track) -> StorageResult<Inserted> {
        self.with_connection(|conn| tracks::insert_track(conn, track))
    }

    pub fn get_track(&self, id: i64) -> StorageResult<Option<Track>> {
        self.with_connection(|conn| tracks::get_track(conn, id))
    }

    pub fn get_track_by_title_and_path(&self, title: &str, path: &Path) -> StorageResult<Option<Track>> {
        self.with_connection(|conn| tracks::get_track_by_title_and_path(conn, title, path))
    }

    pub fn update_track(&self, track: &Track) -> StorageResult<bool> {
        self.with_connection(|conn| tracks::update_track(conn, track))
    }

    pub fn delete_track(&self, id: i64) -> StorageResult<bool> {
        self.with_connection(|conn| tracks::delete_track(conn, id))
    }

    pub fn list_tracks(&self) -> StorageResult<Vec<Track>> {
        self.with_connection(tracks::list_tracks)
    }

    pub fn tracks_by_performer(&self, performer_id: i64) -> StorageResult<Vec<Track>> {
        self.with_connection(|conn| tracks::tracks_by_performer(conn, performer_id))
    }

    pub fn tracks_in_album(&self, album_id: i64) -> StorageResult<Vec<Track>> {
        self.with_connection(|conn| tracks::tracks_in_album(conn, album_id))
    }

    pub fn query_tracks(&self, filter: &Filter, params: &Params) -> StorageResult<Vec<Track>> {
        self.with_connection(|conn| tracks::query_tracks(conn, filter, params))
    }
}

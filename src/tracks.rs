//! The tracks module stores one row per mined audio file ("rola"). A track belongs to exactly one
//! performer and one album, and is deduplicated by its title together with its file path.

use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, info};

use crate::common::{path_from_sql, path_to_sql, Inserted};
use crate::error::StorageResult;
use crate::filters::{compile, Filter, Params, QueryTarget};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub id: i64,
    pub performer_id: i64,
    pub album_id: i64,
    pub path: PathBuf,
    pub title: String,
    pub track_number: u32,
    pub year: i32,
    pub genre: String,
}

const TRACK_COLUMNS: &str = "t.id, t.performer_id, t.album_id, t.path, t.title, t.track_number, t.year, t.genre";

fn track_from_row(row: &Row) -> rusqlite::Result<Track> {
    Ok(Track {
        id: row.get("id")?,
        performer_id: row.get("performer_id")?,
        album_id: row.get("album_id")?,
        path: path_from_sql(row.get("path")?),
        title: row.get("title")?,
        track_number: row.get("track_number")?,
        year: row.get("year")?,
        genre: row.get("genre")?,
    })
}

fn select_tracks<P: rusqlite::Params>(conn: &Connection, where_clause: &str, params: P) -> StorageResult<Vec<Track>> {
    let sql = format!(
        "SELECT {} FROM tracks t
         JOIN performers p ON p.id = t.performer_id
         JOIN albums a ON a.id = t.album_id
         WHERE {}
         ORDER BY t.id",
        TRACK_COLUMNS, where_clause
    );
    let mut stmt = conn.prepare(&sql)?;
    let tracks = stmt.query_map(params, track_from_row)?.collect::<Result<Vec<_>, _>>()?;
    Ok(tracks)
}

/// Inserts the track unless a track with the same title and path exists. The performer and album
/// ids must already exist.
pub fn insert_track(conn: &Connection, track: &Track) -> StorageResult<Inserted> {
    if let Some(existing) = get_track_by_title_and_path(conn, &track.title, &track.path)? {
        debug!("track {} at {} already exists with id {}", existing.title, existing.path.display(), existing.id);
        return Ok(Inserted::Existing(existing.id));
    }
    conn.execute(
        "INSERT INTO tracks (performer_id, album_id, path, title, track_number, year, genre)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![track.performer_id, track.album_id, path_to_sql(&track.path), track.title, track.track_number, track.year, track.genre],
    )?;
    let id = conn.last_insert_rowid();
    info!("created track {} with id {}", track.title, id);
    Ok(Inserted::New(id))
}

pub fn get_track(conn: &Connection, id: i64) -> StorageResult<Option<Track>> {
    Ok(select_tracks(conn, "t.id = ?1", [id])?.into_iter().next())
}

pub fn get_track_by_title_and_path(conn: &Connection, title: &str, path: &Path) -> StorageResult<Option<Track>> {
    let sql = format!("SELECT {} FROM tracks t WHERE t.title = ?1 AND t.path = ?2", TRACK_COLUMNS);
    Ok(conn.query_row(&sql, params![title, path_to_sql(path)], track_from_row).optional()?)
}

pub fn update_track(conn: &Connection, track: &Track) -> StorageResult<bool> {
    let changed = conn.execute(
        "UPDATE tracks
         SET performer_id = ?1, album_id = ?2, path = ?3, title = ?4, track_number = ?5, year = ?6, genre = ?7
         WHERE id = ?8",
        params![
            track.performer_id,
            track.album_id,
            path_to_sql(&track.path),
            track.title,
            track.track_number,
            track.year,
            track.genre,
            track.id
        ],
    )?;
    debug!("updated track {}: {} row(s)", track.id, changed);
    Ok(changed > 0)
}

pub fn delete_track(conn: &Connection, id: i64) -> StorageResult<bool> {
    let changed = conn.execute("DELETE FROM tracks WHERE id = ?1", [id])?;
    if changed > 0 {
        info!("deleted track {}", id);
    }
    Ok(changed > 0)
}

pub fn list_tracks(conn: &Connection) -> StorageResult<Vec<Track>> {
    select_tracks(conn, "1 = 1", params![])
}

pub fn tracks_by_performer(conn: &Connection, performer_id: i64) -> StorageResult<Vec<Track>> {
    select_tracks(conn, "t.performer_id = ?1", [performer_id])
}

pub fn tracks_in_album(conn: &Connection, album_id: i64) -> StorageResult<Vec<Track>> {
    select_tracks(conn, "t.album_id = ?1", [album_id])
}

pub fn query_tracks(conn: &Connection, filter: &Filter, params: &Params) -> StorageResult<Vec<Track>> {
    let compiled = compile(filter, QueryTarget::Tracks, params)?;
    debug!("querying tracks where {}", compiled.sql);
    select_tracks(conn, &compiled.sql, compiled.bindings().as_slice())
}

pub fn count_tracks(conn: &Connection) -> StorageResult<u64> {
    let n: i64 = conn.query_row("SELECT COUNT(*) FROM tracks", [], |row| row.get(0))?;
    Ok(n as u64)
}

//! Albums are identified by their name together with the directory their tracks were found in, so
//! two different records that share a title do not collapse into one.

use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, info};

use crate::common::{path_from_sql, path_to_sql, Inserted};
use crate::error::StorageResult;
use crate::filters::{compile, Filter, Params, QueryTarget};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Album {
    pub id: i64,
    pub path: PathBuf,
    pub name: String,
    pub year: i32,
}

fn album_from_row(row: &Row) -> rusqlite::Result<Album> {
    Ok(Album { id: row.get("id")?, path: path_from_sql(row.get("path")?), name: row.get("name")?, year: row.get("year")? })
}

pub fn insert_album(conn: &Connection, album: &Album) -> StorageResult<Inserted> {
    if let Some(existing) = get_album_by_name_and_path(conn, &album.name, &album.path)? {
        debug!("album {} at {} already exists with id {}", existing.name, existing.path.display(), existing.id);
        return Ok(Inserted::Existing(existing.id));
    }
    conn.execute(
        "INSERT INTO albums (path, name, year) VALUES (?1, ?2, ?3)",
        params![path_to_sql(&album.path), album.name, album.year],
    )?;
    let id = conn.last_insert_rowid();
    info!("created album {} with id {}", album.name, id);
    Ok(Inserted::New(id))
}

pub fn get_album(conn: &Connection, id: i64) -> StorageResult<Option<Album>> {
    Ok(conn.query_row("SELECT id, path, name, year FROM albums WHERE id = ?1", [id], album_from_row).optional()?)
}

pub fn get_album_by_name_and_path(conn: &Connection, name: &str, path: &Path) -> StorageResult<Option<Album>> {
    Ok(conn
        .query_row(
            "SELECT id, path, name, year FROM albums WHERE name = ?1 AND path = ?2",
            params![name, path_to_sql(path)],
            album_from_row,
        )
        .optional()?)
}

/// Replaces the album row. Tracks keep pointing at the album by id, so nothing else changes.
pub fn update_album(conn: &Connection, album: &Album) -> StorageResult<bool> {
    let changed = conn.execute(
        "UPDATE albums SET path = ?1, name = ?2, year = ?3 WHERE id = ?4",
        params![path_to_sql(&album.path), album.name, album.year, album.id],
    )?;
    Ok(changed > 0)
}

pub fn list_albums(conn: &Connection) -> StorageResult<Vec<Album>> {
    let mut stmt = conn.prepare("SELECT id, path, name, year FROM albums ORDER BY id")?;
    let albums = stmt.query_map([], album_from_row)?.collect::<Result<Vec<_>, _>>()?;
    Ok(albums)
}

pub fn query_albums(conn: &Connection, filter: &Filter, params: &Params) -> StorageResult<Vec<Album>> {
    let compiled = compile(filter, QueryTarget::Albums, params)?;
    let sql = format!("SELECT a.id, a.path, a.name, a.year FROM albums a WHERE {} ORDER BY a.id", compiled.sql);
    debug!("querying albums: {}", sql);
    let mut stmt = conn.prepare(&sql)?;
    let albums = stmt.query_map(compiled.bindings().as_slice(), album_from_row)?.collect::<Result<Vec<_>, _>>()?;
    Ok(albums)
}

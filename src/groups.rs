//! Groups and the membership relation between persons and groups.

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, info};

use crate::common::Inserted;
use crate::error::StorageResult;
use crate::persons::{person_from_row, Person};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub id: i64,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

fn group_from_row(row: &Row) -> rusqlite::Result<Group> {
    Ok(Group { id: row.get("id")?, name: row.get("name")?, start_date: row.get("start_date")?, end_date: row.get("end_date")? })
}

pub fn insert_group(conn: &Connection, group: &Group) -> StorageResult<Inserted> {
    if let Some(existing) = get_group_by_name(conn, &group.name)? {
        debug!("group {} already exists with id {}", existing.name, existing.id);
        return Ok(Inserted::Existing(existing.id));
    }
    conn.execute(
        r#"INSERT INTO "groups" (name, start_date, end_date) VALUES (?1, ?2, ?3)"#,
        params![group.name, group.start_date, group.end_date],
    )?;
    let id = conn.last_insert_rowid();
    info!("created group {} with id {}", group.name, id);
    Ok(Inserted::New(id))
}

pub fn get_group(conn: &Connection, id: i64) -> StorageResult<Option<Group>> {
    Ok(conn
        .query_row(r#"SELECT id, name, start_date, end_date FROM "groups" WHERE id = ?1"#, [id], group_from_row)
        .optional()?)
}

pub fn get_group_by_name(conn: &Connection, name: &str) -> StorageResult<Option<Group>> {
    Ok(conn
        .query_row(r#"SELECT id, name, start_date, end_date FROM "groups" WHERE name = ?1"#, [name], group_from_row)
        .optional()?)
}

pub fn update_group(conn: &Connection, group: &Group) -> StorageResult<bool> {
    let changed = conn.execute(
        r#"UPDATE "groups" SET name = ?1, start_date = ?2, end_date = ?3 WHERE id = ?4"#,
        params![group.name, group.start_date, group.end_date, group.id],
    )?;
    Ok(changed > 0)
}

pub fn list_groups(conn: &Connection) -> StorageResult<Vec<Group>> {
    let mut stmt = conn.prepare(r#"SELECT id, name, start_date, end_date FROM "groups" ORDER BY id"#)?;
    let groups = stmt.query_map([], group_from_row)?.collect::<Result<Vec<_>, _>>()?;
    Ok(groups)
}

pub fn is_membership(conn: &Connection, person_id: i64, group_id: i64) -> StorageResult<bool> {
    let found: Option<i64> = conn
        .query_row("SELECT 1 FROM membership WHERE person_id = ?1 AND group_id = ?2", [person_id, group_id], |row| row.get(0))
        .optional()?;
    Ok(found.is_some())
}

/// Returns false when the pair is already recorded. Unknown person or group ids are rejected by
/// the foreign keys.
pub fn insert_membership(conn: &Connection, person_id: i64, group_id: i64) -> StorageResult<bool> {
    if is_membership(conn, person_id, group_id)? {
        debug!("person {} is already a member of group {}", person_id, group_id);
        return Ok(false);
    }
    conn.execute("INSERT INTO membership (person_id, group_id) VALUES (?1, ?2)", [person_id, group_id])?;
    info!("added person {} to group {}", person_id, group_id);
    Ok(true)
}

pub fn members_of(conn: &Connection, group_id: i64) -> StorageResult<Vec<Person>> {
    let mut stmt = conn.prepare(
        "SELECT p.id, p.stage_name, p.real_name, p.birth_date, p.death_date
         FROM persons p JOIN membership m ON m.person_id = p.id
         WHERE m.group_id = ?1
         ORDER BY p.id",
    )?;
    let persons = stmt.query_map([group_id], person_from_row)?.collect::<Result<Vec<_>, _>>()?;
    Ok(persons)
}

pub fn groups_of(conn: &Connection, person_id: i64) -> StorageResult<Vec<Group>> {
    let mut stmt = conn.prepare(
        r#"SELECT g.id, g.name, g.start_date, g.end_date
           FROM "groups" g JOIN membership m ON m.group_id = g.id
           WHERE m.person_id = ?1
           ORDER BY g.id"#,
    )?;
    let groups = stmt.query_map([person_id], group_from_row)?.collect::<Result<Vec<_>, _>>()?;
    Ok(groups)
}

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, info};

use crate::common::Inserted;
use crate::error::StorageResult;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Person {
    pub id: i64,
    pub stage_name: String,
    pub real_name: String,
    pub birth_date: NaiveDate,
    pub death_date: Option<NaiveDate>,
}

pub(crate) const PERSON_COLUMNS: &str = "id, stage_name, real_name, birth_date, death_date";

pub(crate) fn person_from_row(row: &Row) -> rusqlite::Result<Person> {
    Ok(Person {
        id: row.get("id")?,
        stage_name: row.get("stage_name")?,
        real_name: row.get("real_name")?,
        birth_date: row.get("birth_date")?,
        death_date: row.get("death_date")?,
    })
}

pub fn insert_person(conn: &Connection, person: &Person) -> StorageResult<Inserted> {
    if let Some(existing) = get_person_by_stage_name(conn, &person.stage_name)? {
        debug!("person {} already exists with id {}", existing.stage_name, existing.id);
        return Ok(Inserted::Existing(existing.id));
    }
    conn.execute(
        "INSERT INTO persons (stage_name, real_name, birth_date, death_date) VALUES (?1, ?2, ?3, ?4)",
        params![person.stage_name, person.real_name, person.birth_date, person.death_date],
    )?;
    let id = conn.last_insert_rowid();
    info!("created person {} with id {}", person.stage_name, id);
    Ok(Inserted::New(id))
}

pub fn get_person(conn: &Connection, id: i64) -> StorageResult<Option<Person>> {
    let sql = format!("SELECT {} FROM persons WHERE id = ?1", PERSON_COLUMNS);
    Ok(conn.query_row(&sql, [id], person_from_row).optional()?)
}

pub fn get_person_by_stage_name(conn: &Connection, stage_name: &str) -> StorageResult<Option<Person>> {
    let sql = format!("SELECT {} FROM persons WHERE stage_name = ?1", PERSON_COLUMNS);
    Ok(conn.query_row(&sql, [stage_name], person_from_row).optional()?)
}

pub fn update_person(conn: &Connection, person: &Person) -> StorageResult<bool> {
    let changed = conn.execute(
        "UPDATE persons SET stage_name = ?1, real_name = ?2, birth_date = ?3, death_date = ?4 WHERE id = ?5",
        params![person.stage_name, person.real_name, person.birth_date, person.death_date, person.id],
    )?;
    Ok(changed > 0)
}

pub fn list_persons(conn: &Connection) -> StorageResult<Vec<Person>> {
    let sql = format!("SELECT {} FROM persons ORDER BY id", PERSON_COLUMNS);
    let mut stmt = conn.prepare(&sql)?;
    let persons = stmt.query_map([], person_from_row)?.collect::<Result<Vec<_>, _>>()?;
    Ok(persons)
}

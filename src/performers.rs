//! Performers are the names found in the artist tag of mined files. A performer is created with
//! kind Unknown while mining and may later be redefined as a Person or a Group.

use std::fmt;

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::common::Inserted;
use crate::error::{StorageError, StorageResult};
use crate::filters::{compile, Filter, Params, QueryTarget};
use crate::groups::{get_group_by_name, insert_group, update_group, Group};
use crate::persons::{get_person_by_stage_name, insert_person, update_person, Person};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PerformerKind {
    Person = 0,
    Group = 1,
    Unknown = 2,
}

impl PerformerKind {
    pub const ALL: [PerformerKind; 3] = [PerformerKind::Person, PerformerKind::Group, PerformerKind::Unknown];

    pub fn id(self) -> i64 {
        self as i64
    }

    pub fn from_id(id: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.id() == id)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PerformerKind::Person => "Person",
            PerformerKind::Group => "Group",
            PerformerKind::Unknown => "Unknown",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == name)
    }
}

impl fmt::Display for PerformerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl ToSql for PerformerKind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.id()))
    }
}

impl FromSql for PerformerKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        i64::column_result(value).and_then(|id| PerformerKind::from_id(id).ok_or(FromSqlError::OutOfRange(id)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Performer {
    pub id: i64,
    pub kind: PerformerKind,
    pub name: String,
}

impl Performer {
    /// A performer that has not been stored yet. The id is assigned on insert.
    pub fn new(name: impl Into<String>) -> Self {
        Performer { id: 0, kind: PerformerKind::Unknown, name: name.into() }
    }
}

/// What a performer turns out to be once the user has identified it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PerformerDefinition {
    Person(Person),
    Group(Group),
}

impl PerformerDefinition {
    /// The name the definition is keyed by: a person's stage name or a group's name.
    pub fn name(&self) -> &str {
        match self {
            PerformerDefinition::Person(person) => &person.stage_name,
            PerformerDefinition::Group(group) => &group.name,
        }
    }
}

fn performer_from_row(row: &Row) -> rusqlite::Result<Performer> {
    Ok(Performer { id: row.get("id")?, kind: row.get("type_id")?, name: row.get("name")? })
}

pub fn insert_performer(conn: &Connection, performer: &Performer) -> StorageResult<Inserted> {
    if let Some(existing) = get_performer_by_name(conn, &performer.name)? {
        debug!("performer {} already exists with id {}", existing.name, existing.id);
        return Ok(Inserted::Existing(existing.id));
    }
    conn.execute("INSERT INTO performers (type_id, name) VALUES (?1, ?2)", params![performer.kind, performer.name])?;
    let id = conn.last_insert_rowid();
    info!("created performer {} with id {}", performer.name, id);
    Ok(Inserted::New(id))
}

pub fn get_performer(conn: &Connection, id: i64) -> StorageResult<Option<Performer>> {
    let performer = conn.query_row("SELECT id, type_id, name FROM performers WHERE id = ?1", [id], performer_from_row).optional()?;
    Ok(performer)
}

pub fn get_performer_by_name(conn: &Connection, name: &str) -> StorageResult<Option<Performer>> {
    let performer = conn.query_row("SELECT id, type_id, name FROM performers WHERE name = ?1", [name], performer_from_row).optional()?;
    Ok(performer)
}

/// The current kind of the named performer, so that callers can ask for confirmation before
/// redefining a performer that is already a Person or a Group.
pub fn performer_kind(conn: &Connection, name: &str) -> StorageResult<Option<PerformerKind>> {
    Ok(get_performer_by_name(conn, name)?.map(|p| p.kind))
}

pub fn update_performer(conn: &Connection, performer: &Performer) -> StorageResult<bool> {
    let changed = conn.execute(
        "UPDATE performers SET type_id = ?1, name = ?2 WHERE id = ?3",
        params![performer.kind, performer.name, performer.id],
    )?;
    debug!("updated performer {}: {} row(s)", performer.id, changed);
    Ok(changed > 0)
}

pub fn list_performers(conn: &Connection) -> StorageResult<Vec<Performer>> {
    let mut stmt = conn.prepare("SELECT id, type_id, name FROM performers ORDER BY id")?;
    let performers = stmt.query_map([], performer_from_row)?.collect::<Result<Vec<_>, _>>()?;
    Ok(performers)
}

pub fn query_performers(conn: &Connection, filter: &Filter, params: &Params) -> StorageResult<Vec<Performer>> {
    let compiled = compile(filter, QueryTarget::Performers, params)?;
    let sql = format!("SELECT p.id, p.type_id, p.name FROM performers p WHERE {} ORDER BY p.id", compiled.sql);
    debug!("querying performers: {}", sql);
    let mut stmt = conn.prepare(&sql)?;
    let performers = stmt.query_map(compiled.bindings().as_slice(), performer_from_row)?.collect::<Result<Vec<_>, _>>()?;
    Ok(performers)
}

/// Records who a performer really is. The definition must carry the performer's name: the person
/// is matched by stage name and the group by name, an existing row is overwritten with the new
/// details, otherwise one is created. The performer's kind is then switched accordingly. Returns
/// the id of the person or group row.
///
/// Callers should run this inside a transaction so that a failure leaves the performer untouched.
pub fn redefine_performer(conn: &Connection, performer_id: i64, definition: &PerformerDefinition) -> StorageResult<i64> {
    let performer = get_performer(conn, performer_id)?
        .ok_or_else(|| StorageError::IntegrityViolation(format!("performer {} does not exist", performer_id)))?;
    if definition.name() != performer.name {
        return Err(StorageError::IntegrityViolation(format!(
            "cannot define performer {} as {}: names differ",
            performer.name,
            definition.name()
        )));
    }

    let (kind, target_id) = match definition {
        PerformerDefinition::Person(person) => {
            let id = match get_person_by_stage_name(conn, &person.stage_name)? {
                Some(existing) => {
                    update_person(conn, &Person { id: existing.id, ..person.clone() })?;
                    existing.id
                }
                None => insert_person(conn, person)?.id(),
            };
            (PerformerKind::Person, id)
        }
        PerformerDefinition::Group(group) => {
            let id = match get_group_by_name(conn, &group.name)? {
                Some(existing) => {
                    update_group(conn, &Group { id: existing.id, ..group.clone() })?;
                    existing.id
                }
                None => insert_group(conn, group)?.id(),
            };
            (PerformerKind::Group, id)
        }
    };

    conn.execute("UPDATE performers SET type_id = ?1 WHERE id = ?2", params![kind, performer.id])?;
    info!("redefined performer {} from {} to {} (id {})", performer.name, performer.kind, kind, target_id);
    Ok(target_id)
}

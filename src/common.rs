/// The common module is our grab bag of small types shared by the entity modules and the miner.
use std::path::{Path, PathBuf};

/// Outcome of an insert that first checks the entity's dedup key. Either way the caller gets the
/// id of the row that now represents the entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inserted {
    New(i64),
    Existing(i64),
}

impl Inserted {
    pub fn id(&self) -> i64 {
        match self {
            Inserted::New(id) | Inserted::Existing(id) => *id,
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, Inserted::New(_))
    }
}

/// Paths are persisted as text. Non-UTF-8 bytes are replaced rather than rejected so that a
/// single odd filename does not abort a whole mining run.
pub fn path_to_sql(p: &Path) -> String {
    p.to_string_lossy().into_owned()
}

pub fn path_from_sql(s: String) -> PathBuf {
    PathBuf::from(s)
}

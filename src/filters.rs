//! Filter expressions for querying tracks, performers and albums.
//!
//! A `Filter` is a small expression tree of comparisons joined by `and`, `or` and `not`. It is
//! compiled into a SQL `WHERE` fragment in which every value, literal or parameter, is bound as a
//! named SQL parameter. Values never end up inside the SQL text itself.
//!
//! Filters can be built in code or parsed from their textual form, see `filter_parser`:
//!
//! ```text
//! title ~ "love" and (year >= :from or kind = "Group")
//! ```

use std::collections::HashMap;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::types::{ToSql, Value};

use crate::error::{StorageError, StorageResult};
use crate::performers::PerformerKind;

/// Named values referenced from a filter by `Operand::Param`.
pub type Params = HashMap<String, Value>;

static PARAM_NAME_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryTarget {
    Tracks,
    Performers,
    Albums,
}

impl fmt::Display for QueryTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            QueryTarget::Tracks => "tracks",
            QueryTarget::Performers => "performers",
            QueryTarget::Albums => "albums",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Id,
    Title,
    Performer,
    Album,
    Kind,
    Path,
    Year,
    Genre,
    TrackNumber,
}

impl Field {
    pub const ALL: [Field; 9] =
        [Field::Id, Field::Title, Field::Performer, Field::Album, Field::Kind, Field::Path, Field::Year, Field::Genre, Field::TrackNumber];

    pub fn as_str(self) -> &'static str {
        match self {
            Field::Id => "id",
            Field::Title => "title",
            Field::Performer => "performer",
            Field::Album => "album",
            Field::Kind => "kind",
            Field::Path => "path",
            Field::Year => "year",
            Field::Genre => "genre",
            Field::TrackNumber => "track",
        }
    }

    pub fn from_name(name: &str) -> Option<Field> {
        if name == "tracknumber" {
            return Some(Field::TrackNumber);
        }
        Field::ALL.into_iter().find(|f| f.as_str() == name)
    }

    /// The column a field refers to when querying `target`. Track queries join the performer as
    /// `p` and the album as `a`, so a track can be filtered by its performer's name or kind.
    fn column(self, target: QueryTarget) -> Option<&'static str> {
        match (target, self) {
            (QueryTarget::Tracks, Field::Id) => Some("t.id"),
            (QueryTarget::Tracks, Field::Title) => Some("t.title"),
            (QueryTarget::Tracks, Field::Performer) => Some("p.name"),
            (QueryTarget::Tracks, Field::Album) => Some("a.name"),
            (QueryTarget::Tracks, Field::Kind) => Some("p.type_id"),
            (QueryTarget::Tracks, Field::Path) => Some("t.path"),
            (QueryTarget::Tracks, Field::Year) => Some("t.year"),
            (QueryTarget::Tracks, Field::Genre) => Some("t.genre"),
            (QueryTarget::Tracks, Field::TrackNumber) => Some("t.track_number"),
            (QueryTarget::Performers, Field::Id) => Some("p.id"),
            (QueryTarget::Performers, Field::Performer) => Some("p.name"),
            (QueryTarget::Performers, Field::Kind) => Some("p.type_id"),
            (QueryTarget::Albums, Field::Id) => Some("a.id"),
            (QueryTarget::Albums, Field::Album) => Some("a.name"),
            (QueryTarget::Albums, Field::Path) => Some("a.path"),
            (QueryTarget::Albums, Field::Year) => Some("a.year"),
            _ => None,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    /// Case-sensitive substring match.
    Contains,
    StartsWith,
}

impl Op {
    pub fn as_str(self) -> &'static str {
        match self {
            Op::Eq => "=",
            Op::Ne => "!=",
            Op::Lt => "<",
            Op::Le => "<=",
            Op::Gt => ">",
            Op::Ge => ">=",
            Op::Contains => "~",
            Op::StartsWith => "^=",
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Value(Value),
    Param(String),
}

impl Operand {
    pub fn param(name: impl Into<String>) -> Self {
        Operand::Param(name.into())
    }
}

impl From<&str> for Operand {
    fn from(s: &str) -> Self {
        Operand::Value(Value::Text(s.to_string()))
    }
}

impl From<String> for Operand {
    fn from(s: String) -> Self {
        Operand::Value(Value::Text(s))
    }
}

impl From<i64> for Operand {
    fn from(i: i64) -> Self {
        Operand::Value(Value::Integer(i))
    }
}

impl From<i32> for Operand {
    fn from(i: i32) -> Self {
        Operand::Value(Value::Integer(i64::from(i)))
    }
}

impl From<PerformerKind> for Operand {
    fn from(k: PerformerKind) -> Self {
        Operand::Value(Value::Integer(k.id()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Matches every row.
    All,
    Compare { field: Field, op: Op, operand: Operand },
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
}

impl Filter {
    pub fn compare(field: Field, op: Op, operand: impl Into<Operand>) -> Filter {
        Filter::Compare { field, op, operand: operand.into() }
    }

    pub fn and(self, other: Filter) -> Filter {
        match self {
            Filter::And(mut fs) => {
                fs.push(other);
                Filter::And(fs)
            }
            f => Filter::And(vec![f, other]),
        }
    }

    pub fn or(self, other: Filter) -> Filter {
        match self {
            Filter::Or(mut fs) => {
                fs.push(other);
                Filter::Or(fs)
            }
            f => Filter::Or(vec![f, other]),
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Filter {
        Filter::Not(Box::new(self))
    }
}

fn fmt_value(f: &mut fmt::Formatter<'_>, v: &Value) -> fmt::Result {
    match v {
        Value::Null => write!(f, "null"),
        Value::Integer(i) => write!(f, "{}", i),
        // SQLite stores a NaN as NULL.
        Value::Real(r) if r.is_nan() => write!(f, "null"),
        // Overflows back to infinity when parsed.
        Value::Real(r) if r.is_infinite() => write!(f, "{}9e999", if *r < 0.0 { "-" } else { "" }),
        // Debug keeps the fraction, so that 1.0 reads back as a real.
        Value::Real(r) => write!(f, "{:?}", r),
        Value::Text(s) => write!(f, "\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\"")),
        Value::Blob(b) => {
            write!(f, "x\"")?;
            for byte in b {
                write!(f, "{:02x}", byte)?;
            }
            write!(f, "\"")
        }
    }
}

/// Renders the textual form accepted by `Filter::parse`. `All` and an empty `And` render as `all`,
/// an empty `Or` as `not all`.
impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::All => write!(f, "all"),
            Filter::And(fs) if fs.is_empty() => write!(f, "all"),
            Filter::Or(fs) if fs.is_empty() => write!(f, "not all"),
            Filter::Compare { field, op, operand } => {
                write!(f, "{} {} ", field, op)?;
                match operand {
                    Operand::Value(v) => fmt_value(f, v),
                    Operand::Param(name) => write!(f, ":{}", name),
                }
            }
            Filter::And(fs) | Filter::Or(fs) => {
                let sep = if matches!(self, Filter::And(_)) { " and " } else { " or " };
                write!(f, "(")?;
                for (i, x) in fs.iter().enumerate() {
                    if i > 0 {
                        write!(f, "{}", sep)?;
                    }
                    write!(f, "{}", x)?;
                }
                write!(f, ")")
            }
            Filter::Not(x) => write!(f, "not ({})", x),
        }
    }
}

/// A compiled `WHERE` fragment together with the values to bind to its placeholders.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledFilter {
    pub sql: String,
    pub params: Vec<(String, Value)>,
}

impl CompiledFilter {
    pub fn bindings(&self) -> Vec<(&str, &dyn ToSql)> {
        self.params.iter().map(|(name, value)| (name.as_str(), value as &dyn ToSql)).collect()
    }
}

pub fn compile(filter: &Filter, target: QueryTarget, params: &Params) -> StorageResult<CompiledFilter> {
    let mut compiler = Compiler { target, params, out: Vec::new() };
    let sql = compiler.compile(filter)?;
    Ok(CompiledFilter { sql, params: compiler.out })
}

struct Compiler<'a> {
    target: QueryTarget,
    params: &'a Params,
    out: Vec<(String, Value)>,
}

impl Compiler<'_> {
    fn compile(&mut self, filter: &Filter) -> StorageResult<String> {
        match filter {
            Filter::All => Ok("1 = 1".to_string()),
            Filter::And(fs) if fs.is_empty() => Ok("1 = 1".to_string()),
            Filter::Or(fs) if fs.is_empty() => Ok("1 = 0".to_string()),
            Filter::And(fs) => self.join(fs, " AND "),
            Filter::Or(fs) => self.join(fs, " OR "),
            Filter::Not(f) => Ok(format!("NOT ({})", self.compile(f)?)),
            Filter::Compare { field, op, operand } => self.compare(*field, *op, operand),
        }
    }

    fn join(&mut self, fs: &[Filter], sep: &str) -> StorageResult<String> {
        let parts = fs.iter().map(|f| self.compile(f)).collect::<StorageResult<Vec<_>>>()?;
        Ok(format!("({})", parts.join(sep)))
    }

    fn compare(&mut self, field: Field, op: Op, operand: &Operand) -> StorageResult<String> {
        let column = field
            .column(self.target)
            .ok_or_else(|| StorageError::InvalidQuery(format!("field {} cannot be used to query {}", field, self.target)))?;

        let value = match operand {
            Operand::Value(v) => v.clone(),
            Operand::Param(name) => {
                if !PARAM_NAME_REGEX.is_match(name) {
                    return Err(StorageError::InvalidQuery(format!("invalid parameter name :{}", name)));
                }
                self.params.get(name).cloned().ok_or_else(|| StorageError::InvalidQuery(format!("parameter :{} is not bound", name)))?
            }
        };
        let value = if field == Field::Kind { kind_value(value)? } else { value };

        match (op, &value) {
            (Op::Eq, Value::Null) => return Ok(format!("{} IS NULL", column)),
            (Op::Ne, Value::Null) => return Ok(format!("{} IS NOT NULL", column)),
            _ => {}
        }

        let placeholder = format!(":p{}", self.out.len());
        let sql = match op {
            Op::Eq => format!("{} = {}", column, placeholder),
            Op::Ne => format!("{} <> {}", column, placeholder),
            Op::Lt => format!("{} < {}", column, placeholder),
            Op::Le => format!("{} <= {}", column, placeholder),
            Op::Gt => format!("{} > {}", column, placeholder),
            Op::Ge => format!("{} >= {}", column, placeholder),
            Op::Contains => format!("instr({}, {}) > 0", column, placeholder),
            Op::StartsWith => format!("instr({}, {}) = 1", column, placeholder),
        };
        self.out.push((placeholder, value));
        Ok(sql)
    }
}

/// Kinds are stored as ids; accept either the id or the kind's name.
fn kind_value(value: Value) -> StorageResult<Value> {
    let kind = match &value {
        Value::Integer(i) => PerformerKind::from_id(*i),
        Value::Text(s) => PerformerKind::from_name(s),
        _ => None,
    };
    kind.map(|k| Value::Integer(k.id()))
        .ok_or_else(|| StorageError::InvalidQuery(format!("{:?} is not a performer kind; expected Person, Group or Unknown", value)))
}

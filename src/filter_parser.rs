//! The filter_parser module parses the textual form of a `Filter`.
//!
//! The grammar, loosest binding first:
//!
//! ```text
//! filter     := or | <empty>
//! or         := and ("or" and)*
//! and        := not ("and" not)*
//! not        := "not" not | atom
//! atom       := "(" or ")" | "all" | comparison
//! comparison := field op operand
//! op         := "=" | "!=" | "<" | "<=" | ">" | ">=" | "~" | "^="
//! operand    := ":" name | "null" | number | '"' string '"' | 'x"' hex '"'
//! number     := "-"? digits ("." digits)? (("e" | "E") ("+" | "-")? digits)?
//! ```
//!
//! Keywords are case-insensitive. Strings support `\"` and `\\` escapes. A number with a fraction
//! or an exponent is a real, otherwise an integer. Every filter's `Display` output parses back.

use std::fmt;

use rusqlite::types::Value;

use crate::error::StorageError;
use crate::filters::{Field, Filter, Op, Operand};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterSyntaxError {
    filter: String,
    index: usize,
    feedback: String,
}

impl FilterSyntaxError {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn feedback(&self) -> &str {
        &self.feedback
    }
}

impl fmt::Display for FilterSyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Failed to parse filter, invalid syntax:\n\n    {}\n    {}^\n    {}{}",
            self.filter,
            " ".repeat(self.index),
            " ".repeat(self.index),
            self.feedback
        )
    }
}

impl std::error::Error for FilterSyntaxError {}

impl From<FilterSyntaxError> for StorageError {
    fn from(err: FilterSyntaxError) -> Self {
        StorageError::InvalidQuery(err.to_string())
    }
}

// Longer operators first so that "<=" is not read as "<".
const OPERATORS: [(&str, Op); 8] = [
    ("<=", Op::Le),
    (">=", Op::Ge),
    ("!=", Op::Ne),
    ("^=", Op::StartsWith),
    ("=", Op::Eq),
    ("<", Op::Lt),
    (">", Op::Gt),
    ("~", Op::Contains),
];

impl Filter {
    pub fn parse(raw: &str) -> Result<Filter, FilterSyntaxError> {
        let mut p = Parser { raw, idx: 0 };
        p.skip_whitespace();
        if p.at_end() {
            return Ok(Filter::All);
        }
        let filter = p.parse_or()?;
        p.skip_whitespace();
        if !p.at_end() {
            return Err(p.error(p.idx, "Unexpected input after the end of the filter"));
        }
        Ok(filter)
    }
}

struct Parser<'a> {
    raw: &'a str,
    // Byte offset into raw, always on a char boundary.
    idx: usize,
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

impl<'a> Parser<'a> {
    fn rest(&self) -> &str {
        &self.raw[self.idx..]
    }

    fn at_end(&self) -> bool {
        self.idx >= self.raw.len()
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn error(&self, byte_idx: usize, feedback: &str) -> FilterSyntaxError {
        FilterSyntaxError { filter: self.raw.to_string(), index: self.raw[..byte_idx].chars().count(), feedback: feedback.to_string() }
    }

    fn skip_whitespace(&mut self) {
        let remaining = self.rest().trim_start().len();
        self.idx = self.raw.len() - remaining;
    }

    fn ident(&mut self) -> &'a str {
        let raw = self.raw;
        let start = self.idx;
        let len = raw[start..].find(|c: char| !is_ident_char(c)).unwrap_or(raw.len() - start);
        self.idx += len;
        &raw[start..self.idx]
    }

    fn keyword(&mut self, kw: &str) -> bool {
        self.skip_whitespace();
        let rest = self.rest();
        if rest.len() < kw.len() || !rest.is_char_boundary(kw.len()) || !rest[..kw.len()].eq_ignore_ascii_case(kw) {
            return false;
        }
        if rest[kw.len()..].chars().next().is_some_and(is_ident_char) {
            return false;
        }
        self.idx += kw.len();
        true
    }

    fn parse_or(&mut self) -> Result<Filter, FilterSyntaxError> {
        let mut parts = vec![self.parse_and()?];
        while self.keyword("or") {
            parts.push(self.parse_and()?);
        }
        Ok(if parts.len() == 1 { parts.remove(0) } else { Filter::Or(parts) })
    }

    fn parse_and(&mut self) -> Result<Filter, FilterSyntaxError> {
        let mut parts = vec![self.parse_not()?];
        while self.keyword("and") {
            parts.push(self.parse_not()?);
        }
        Ok(if parts.len() == 1 { parts.remove(0) } else { Filter::And(parts) })
    }

    fn parse_not(&mut self) -> Result<Filter, FilterSyntaxError> {
        if self.keyword("not") {
            return Ok(Filter::Not(Box::new(self.parse_not()?)));
        }
        self.parse_atom()
    }

    fn parse_atom(&mut self) -> Result<Filter, FilterSyntaxError> {
        self.skip_whitespace();
        if self.peek() == Some('(') {
            let open = self.idx;
            self.idx += 1;
            self.skip_whitespace();
            if self.peek() == Some(')') {
                return Err(self.error(self.idx, "Empty parentheses"));
            }
            let inner = self.parse_or()?;
            self.skip_whitespace();
            if self.peek() != Some(')') {
                let at = if self.at_end() { open } else { self.idx };
                return Err(self.error(at, "Unclosed parenthesis"));
            }
            self.idx += 1;
            return Ok(inner);
        }
        if self.keyword("all") {
            return Ok(Filter::All);
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Filter, FilterSyntaxError> {
        let start = self.idx;
        let name = self.ident().to_ascii_lowercase();
        if name.is_empty() {
            return Err(self.error(start, "Expected a field name"));
        }
        let field = Field::from_name(&name).ok_or_else(|| {
            let names = Field::ALL.iter().map(|f| f.as_str()).collect::<Vec<_>>().join(", ");
            self.error(start, &format!("Unknown field {}; valid fields are {}", name, names))
        })?;

        self.skip_whitespace();
        let op_start = self.idx;
        let (symbol, op) = OPERATORS
            .iter()
            .find(|(symbol, _)| self.rest().starts_with(symbol))
            .copied()
            .ok_or_else(|| self.error(op_start, "Expected an operator (=, !=, <, <=, >, >=, ~ or ^=)"))?;
        self.idx += symbol.len();

        self.skip_whitespace();
        let operand = self.parse_operand()?;
        Ok(Filter::Compare { field, op, operand })
    }

    fn parse_operand(&mut self) -> Result<Operand, FilterSyntaxError> {
        if self.keyword("null") {
            return Ok(Operand::Value(Value::Null));
        }
        let start = self.idx;
        match self.peek() {
            Some(':') => {
                self.idx += 1;
                let name = self.ident();
                if name.is_empty() || name.starts_with(|c: char| c.is_ascii_digit()) {
                    return Err(self.error(start + 1, "Expected a parameter name after ':'"));
                }
                Ok(Operand::Param(name.to_string()))
            }
            Some('"') => {
                self.idx += 1;
                let mut value = String::new();
                let mut escaped = false;
                let raw = self.raw;
                for c in raw[self.idx..].chars() {
                    self.idx += c.len_utf8();
                    if escaped {
                        value.push(c);
                        escaped = false;
                    } else if c == '\\' {
                        escaped = true;
                    } else if c == '"' {
                        return Ok(Operand::Value(Value::Text(value)));
                    } else {
                        value.push(c);
                    }
                }
                Err(self.error(start, "Unterminated string"))
            }
            Some(c) if c == '-' || c.is_ascii_digit() => self.parse_number(),
            Some('x') | Some('X') if self.rest()[1..].starts_with('"') => {
                self.idx += 2;
                let digits_start = self.idx;
                let len = self.rest().find(|c: char| !c.is_ascii_hexdigit()).unwrap_or(self.rest().len());
                self.idx += len;
                if self.peek() != Some('"') || len % 2 != 0 {
                    return Err(self.error(start, "Invalid blob; expected an even number of hex digits in x\"...\""));
                }
                let hex = &self.raw[digits_start..self.idx];
                self.idx += 1;
                let bytes = (0..hex.len())
                    .step_by(2)
                    .map(|i| u8::from_str_radix(&hex[i..i + 2], 16))
                    .collect::<Result<Vec<u8>, _>>()
                    .map_err(|_| self.error(start, "Invalid blob"))?;
                Ok(Operand::Value(Value::Blob(bytes)))
            }
            _ => Err(self.error(start, "Expected a value: a quoted string, a number, null or a :parameter")),
        }
    }

    // Consumes a run of ASCII digits and returns its length.
    fn digits(&mut self) -> usize {
        let len = self.rest().find(|c: char| !c.is_ascii_digit()).unwrap_or(self.rest().len());
        self.idx += len;
        len
    }

    fn parse_number(&mut self) -> Result<Operand, FilterSyntaxError> {
        let start = self.idx;
        if self.peek() == Some('-') {
            self.idx += 1;
        }
        if self.digits() == 0 {
            return Err(self.error(start, "Expected digits"));
        }
        let mut real = false;
        if self.peek() == Some('.') {
            self.idx += 1;
            real = true;
            if self.digits() == 0 {
                return Err(self.error(start, "Expected digits after '.'"));
            }
        }
        if matches!(self.peek(), Some('e') | Some('E')) {
            self.idx += 1;
            real = true;
            if matches!(self.peek(), Some('+') | Some('-')) {
                self.idx += 1;
            }
            if self.digits() == 0 {
                return Err(self.error(start, "Expected digits in exponent"));
            }
        }
        if self.peek().is_some_and(is_ident_char) {
            return Err(self.error(start, "Invalid number"));
        }
        let text = &self.raw[start..self.idx];
        if real {
            text.parse::<f64>().map(|r| Operand::Value(Value::Real(r))).map_err(|_| self.error(start, "Invalid number"))
        } else {
            text.parse::<i64>().map(|i| Operand::Value(Value::Integer(i))).map_err(|_| self.error(start, "Invalid integer"))
        }
    }
}

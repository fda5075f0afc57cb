// used for timestamps
use chrono::{DateTime, NaiveDate, Utc};
// used when values travel to and from index files
use serde::{Deserialize, Serialize};

// used to print out readable forms of a value
use std::fmt;
// comparisons between normalized values
use std::cmp::Ordering;

use crate::error::{BoutinfError, Result};

/// The runtime type of a [`Value`], used in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Boolean,
    Number,
    Text,
    Time,
    List,
    Absent,
}
impl Kind {
    pub fn name(&self) -> &'static str {
        match self {
            Kind::Boolean => "boolean",
            Kind::Number => "number",
            Kind::Text => "text",
            Kind::Time => "time",
            Kind::List => "list",
            Kind::Absent => "absent",
        }
    }
}
impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Everything a predicate can produce and everything an attribute index can hold.
///
/// `Absent` stands for an attribute that neither the index nor the message
/// source knows about; it never equals, orders or matches anything.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Boolean(bool),
    Number(i64),
    Text(String),
    Time(DateTime<Utc>),
    List(Vec<Value>),
    Absent,
}

impl Value {
    pub fn kind(&self) -> Kind {
        match self {
            Value::Boolean(_) => Kind::Boolean,
            Value::Number(_) => Kind::Number,
            Value::Text(_) => Kind::Text,
            Value::Time(_) => Kind::Time,
            Value::List(_) => Kind::List,
            Value::Absent => Kind::Absent,
        }
    }
    pub fn is_absent(&self) -> bool {
        matches!(self, Value::Absent)
    }

    /// Equality after normalizing both sides to a common representation.
    /// `Absent` on either side is never equal to anything.
    pub fn loose_eq(&self, other: &Value) -> Result<bool> {
        let equal = match (self, other) {
            (Value::Absent, _) | (_, Value::Absent) => false,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Time(a), Value::Time(b)) => a == b,
            (Value::Number(n), Value::Text(t)) | (Value::Text(t), Value::Number(n)) => {
                n.to_string() == t.trim()
            }
            (Value::Time(time), Value::Text(t)) | (Value::Text(t), Value::Time(time)) => {
                parse_time(t).is_some_and(|parsed| parsed == *time)
            }
            (Value::Time(time), Value::Number(n)) | (Value::Number(n), Value::Time(time)) => {
                time.timestamp_millis() == *n
            }
            (Value::Boolean(b), Value::Text(t)) | (Value::Text(t), Value::Boolean(b)) => {
                t.trim() == if *b { "true" } else { "false" }
            }
            (Value::List(a), Value::List(b)) => {
                if a.len() != b.len() {
                    return Ok(false);
                }
                for (x, y) in a.iter().zip(b.iter()) {
                    if !x.loose_eq(y)? {
                        return Ok(false);
                    }
                }
                true
            }
            (a, b) => return Err(mismatch("equality", a, b)),
        };
        Ok(equal)
    }

    /// Ordering after normalization. `None` when either side is absent.
    pub fn loose_cmp(&self, other: &Value) -> Result<Option<Ordering>> {
        let ordering = match (self, other) {
            (Value::Absent, _) | (_, Value::Absent) => return Ok(None),
            (Value::Number(a), Value::Number(b)) => a.cmp(b),
            (Value::Time(a), Value::Time(b)) => a.cmp(b),
            (Value::Time(a), Value::Number(b)) => a.timestamp_millis().cmp(b),
            (Value::Number(a), Value::Time(b)) => a.cmp(&b.timestamp_millis()),
            (Value::Number(a), Value::Text(t)) => a.cmp(&parse_number(t)?),
            (Value::Text(t), Value::Number(b)) => parse_number(t)?.cmp(b),
            (Value::Time(a), Value::Text(t)) => a.cmp(&parse_time(t).ok_or_else(|| not_a_time(t))?),
            (Value::Text(t), Value::Time(b)) => parse_time(t).ok_or_else(|| not_a_time(t))?.cmp(b),
            (Value::Text(_), Value::Text(_)) => {
                return Err(BoutinfError::EvaluationType(
                    "Ordering comparison not allowed between text values".to_string(),
                ));
            }
            (a, b) => return Err(mismatch("ordering", a, b)),
        };
        Ok(Some(ordering))
    }

    /// Text used for keyword matching; `None` when absent.
    pub fn searchable_text(&self) -> Result<Option<String>> {
        match self {
            Value::Absent => Ok(None),
            Value::Text(t) => Ok(Some(t.clone())),
            Value::Number(_) | Value::Time(_) => Ok(Some(self.to_string())),
            other => Err(BoutinfError::EvaluationType(format!(
                "keyword matching needs text, got {}",
                other.kind()
            ))),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", n),
            Value::Text(t) => write!(f, "{}", t),
            Value::Time(t) => write!(f, "{}", t.to_rfc3339()),
            Value::List(items) => {
                let items: Vec<String> = items.iter().map(|i| i.to_string()).collect();
                write!(f, "[{}]", items.join(", "))
            }
            Value::Absent => write!(f, "absent"),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self { Value::Boolean(b) }
}
impl From<i64> for Value {
    fn from(n: i64) -> Self { Value::Number(n) }
}
impl From<&str> for Value {
    fn from(t: &str) -> Self { Value::Text(t.to_string()) }
}
impl From<String> for Value {
    fn from(t: String) -> Self { Value::Text(t) }
}
impl From<DateTime<Utc>> for Value {
    fn from(t: DateTime<Utc>) -> Self { Value::Time(t) }
}

/// Accepts RFC 3339 timestamps and plain `YYYY-MM-DD` dates (taken as UTC midnight).
pub fn parse_time(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(time) = DateTime::parse_from_rfc3339(text) {
        return Some(time.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Message and bout numbers as a `Number`; ids beyond `i64::MAX` do not fit.
pub fn id_number(id: u64) -> Result<Value> {
    i64::try_from(id).map(Value::Number).map_err(|_| {
        BoutinfError::EvaluationType(format!("id {} does not fit a number", id))
    })
}

fn parse_number(text: &str) -> Result<i64> {
    text.trim().parse::<i64>().map_err(|_| {
        BoutinfError::EvaluationType(format!("'{}' cannot be compared as a number", text))
    })
}

fn not_a_time(text: &str) -> BoutinfError {
    BoutinfError::EvaluationType(format!("'{}' cannot be compared as a time", text))
}

fn mismatch(operation: &str, a: &Value, b: &Value) -> BoutinfError {
    BoutinfError::EvaluationType(format!(
        "{} not defined between {} and {}",
        operation,
        a.kind(),
        b.kind()
    ))
}

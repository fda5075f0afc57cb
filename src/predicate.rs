//! The predicate tree produced by the query parser and its evaluation.
//!
//! A [`Predicate`] is evaluated against one candidate message and the
//! current result position, inside a [`Context`] that gives access to the
//! index store, the upstream message source and the "now" of the pass.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::datatype::{self, Value};
use crate::error::{BoutinfError, Result};
use crate::index::{IndexStore, MessageId};
use crate::keywords;
use crate::source::MessageSource;

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// The empty query.
    Always,
    Literal(Value),
    /// `$pos`, results accepted so far.
    Position,
    /// `$now`, fixed for one evaluation pass.
    Now,
    /// `$number`, the candidate message itself.
    Number,
    /// `$name` for any other name, resolved through the index store.
    Attribute(String),
    Equal(Box<Predicate>, Box<Predicate>),
    Matches(Box<Predicate>, Box<Predicate>),
    Greater(Box<Predicate>, Box<Predicate>),
    Less(Box<Predicate>, Box<Predicate>),
    Contains(Box<Predicate>, Box<Predicate>),
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Not(Box<Predicate>),
    /// Accepts while fewer than `n` results were accepted.
    Limit(usize),
}

// ------------- Context -------------
pub struct Context<'e> {
    store: &'e IndexStore,
    source: &'e dyn MessageSource,
    now: DateTime<Utc>,
}

impl<'e> Context<'e> {
    pub fn new(store: &'e IndexStore, source: &'e dyn MessageSource, now: DateTime<Utc>) -> Self {
        Self { store, source, now }
    }
    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }
    /// Index first; on a miss the source is asked and the index warmed with
    /// its answer. Unknown everywhere yields `Absent`.
    pub fn attribute(&self, message: MessageId, name: &str) -> Result<Value> {
        let index = self.store.index_for(name)?;
        if let Some(value) = index.get(message)? {
            return Ok(value);
        }
        match self.source.attribute(message, name)? {
            Some(value) => {
                index.put(message, value.clone())?;
                debug!(index = name, message, "index warmed from source");
                Ok(value)
            }
            None => {
                debug!(attribute = name, message, "attribute missing");
                Ok(Value::Absent)
            }
        }
    }
}

// ------------- Evaluation -------------
impl Predicate {
    pub fn evaluate(&self, context: &Context, message: MessageId, position: usize) -> Result<Value> {
        let value = match self {
            Predicate::Always => Value::Boolean(true),
            Predicate::Literal(value) => value.clone(),
            Predicate::Position => Value::Number(position as i64),
            Predicate::Now => Value::Time(context.now()),
            Predicate::Number => datatype::id_number(message)?,
            Predicate::Attribute(name) => context.attribute(message, name)?,
            Predicate::Equal(a, b) => {
                let a = a.evaluate(context, message, position)?;
                let b = b.evaluate(context, message, position)?;
                Value::Boolean(a.loose_eq(&b)?)
            }
            Predicate::Matches(query, target) => {
                let query = query.evaluate(context, message, position)?;
                let target = target.evaluate(context, message, position)?;
                match (query.searchable_text()?, target.searchable_text()?) {
                    (Some(query), Some(target)) => Value::Boolean(keywords::matches(&query, &target)),
                    _ => Value::Boolean(false),
                }
            }
            Predicate::Greater(a, b) => Value::Boolean(
                Self::compare(context, a, b, message, position)? == Some(Ordering::Greater),
            ),
            Predicate::Less(a, b) => Value::Boolean(
                Self::compare(context, a, b, message, position)? == Some(Ordering::Less),
            ),
            Predicate::Contains(list, item) => {
                let list = list.evaluate(context, message, position)?;
                let item = item.evaluate(context, message, position)?;
                match list {
                    Value::Absent => Value::Boolean(false),
                    Value::List(items) => {
                        let mut found = false;
                        for candidate in items.iter() {
                            if candidate.loose_eq(&item)? {
                                found = true;
                                break;
                            }
                        }
                        Value::Boolean(found)
                    }
                    other => {
                        return Err(BoutinfError::EvaluationType(format!(
                            "contains needs a list, got {}",
                            other.kind()
                        )));
                    }
                }
            }
            Predicate::And(children) => {
                for child in children {
                    if !child.truth(context, message, position)? {
                        return Ok(Value::Boolean(false));
                    }
                }
                Value::Boolean(true)
            }
            Predicate::Or(children) => {
                for child in children {
                    if child.truth(context, message, position)? {
                        return Ok(Value::Boolean(true));
                    }
                }
                Value::Boolean(false)
            }
            Predicate::Not(child) => Value::Boolean(!child.truth(context, message, position)?),
            Predicate::Limit(n) => Value::Boolean(position < *n),
        };
        Ok(value)
    }

    /// Evaluates a predicate that must yield a boolean.
    pub fn truth(&self, context: &Context, message: MessageId, position: usize) -> Result<bool> {
        match self.evaluate(context, message, position)? {
            Value::Boolean(b) => Ok(b),
            other => Err(BoutinfError::EvaluationType(format!(
                "expected a boolean from {}, got {}",
                self,
                other.kind()
            ))),
        }
    }

    fn compare(
        context: &Context,
        a: &Predicate,
        b: &Predicate,
        message: MessageId,
        position: usize,
    ) -> Result<Option<Ordering>> {
        let a = a.evaluate(context, message, position)?;
        let b = b.evaluate(context, message, position)?;
        a.loose_cmp(&b)
    }
}

// ------------- Rendering -------------
// Renders the canonical query text; parsing it gives back an equal tree.
impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Predicate::Always => Ok(()),
            Predicate::Literal(Value::Text(t)) => {
                write!(f, "\"{}\"", t.replace('\\', "\\\\").replace('"', "\\\""))
            }
            Predicate::Literal(value) => write!(f, "{}", value),
            Predicate::Position => write!(f, "$pos"),
            Predicate::Now => write!(f, "$now"),
            Predicate::Number => write!(f, "$number"),
            Predicate::Attribute(name) => write!(f, "${}", name),
            Predicate::Equal(a, b) => write!(f, "(equal {} {})", a, b),
            Predicate::Matches(a, b) => write!(f, "(matches {} {})", a, b),
            Predicate::Greater(a, b) => write!(f, "(greater {} {})", a, b),
            Predicate::Less(a, b) => write!(f, "(less {} {})", a, b),
            Predicate::Contains(a, b) => write!(f, "(contains {} {})", a, b),
            Predicate::And(children) => write_list(f, "and", children),
            Predicate::Or(children) => write_list(f, "or", children),
            Predicate::Not(child) => write!(f, "(not {})", child),
            Predicate::Limit(n) => write!(f, "(limit {})", n),
        }
    }
}

fn write_list(f: &mut fmt::Formatter, name: &str, children: &[Predicate]) -> fmt::Result {
    write!(f, "({}", name)?;
    for child in children {
        write!(f, " {}", child)?;
    }
    write!(f, ")")
}

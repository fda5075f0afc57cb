//! The named predicates a query may use, with their arity and the kind of
//! argument accepted at each position.
//!
//! | name       | arguments                  |
//! |------------|----------------------------|
//! | `equal`    | two predicates             |
//! | `matches`  | two predicates (query, text) |
//! | `greater`  | two predicates             |
//! | `less`     | two predicates             |
//! | `contains` | two predicates (list, item) |
//! | `and`      | one or more predicates     |
//! | `or`       | one or more predicates     |
//! | `not`      | one predicate              |
//! | `limit`    | one numeric literal        |

use std::fmt;

use crate::datatype::Value;
use crate::predicate::Predicate;

/// What may stand at an argument position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    /// Anything: a nested expression, a variable or a literal.
    Predicate,
    /// Only a string or number literal.
    Literal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exactly(usize),
    AtLeast(usize),
}
impl Arity {
    pub fn admits(&self, count: usize) -> bool {
        match self {
            Arity::Exactly(n) => count == *n,
            Arity::AtLeast(n) => count >= *n,
        }
    }
    /// Whether a form that already holds `count` arguments may take another.
    pub fn has_room(&self, count: usize) -> bool {
        match self {
            Arity::Exactly(n) => count < *n,
            Arity::AtLeast(_) => true,
        }
    }
}
impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Arity::Exactly(1) => write!(f, "exactly 1 argument"),
            Arity::Exactly(n) => write!(f, "exactly {} arguments", n),
            Arity::AtLeast(1) => write!(f, "at least 1 argument"),
            Arity::AtLeast(n) => write!(f, "at least {} arguments", n),
        }
    }
}

type Build = fn(Vec<Predicate>) -> std::result::Result<Predicate, String>;

pub struct Signature {
    pub name: &'static str,
    pub arity: Arity,
    // the last kind repeats for variadic forms
    kinds: &'static [ArgKind],
    build: Build,
}

impl Signature {
    pub fn kind(&self, position: usize) -> ArgKind {
        self.kinds
            .get(position)
            .or_else(|| self.kinds.last())
            .copied()
            .unwrap_or(ArgKind::Predicate)
    }
    /// Builds the node. Arity and kinds must already have been checked by
    /// the caller; the builder only checks what a kind cannot express.
    pub fn construct(&self, arguments: Vec<Predicate>) -> std::result::Result<Predicate, String> {
        if !self.arity.admits(arguments.len()) {
            return Err(format!(
                "'{}' takes {}, got {}",
                self.name,
                self.arity,
                arguments.len()
            ));
        }
        (self.build)(arguments)
    }
}

const BINARY: &[ArgKind] = &[ArgKind::Predicate, ArgKind::Predicate];
const VARIADIC: &[ArgKind] = &[ArgKind::Predicate];
const LITERAL: &[ArgKind] = &[ArgKind::Literal];

pub static CATALOG: &[Signature] = &[
    Signature { name: "equal", arity: Arity::Exactly(2), kinds: BINARY, build: |a| binary(a, Predicate::Equal) },
    Signature { name: "matches", arity: Arity::Exactly(2), kinds: BINARY, build: |a| binary(a, Predicate::Matches) },
    Signature { name: "greater", arity: Arity::Exactly(2), kinds: BINARY, build: |a| binary(a, Predicate::Greater) },
    Signature { name: "less", arity: Arity::Exactly(2), kinds: BINARY, build: |a| binary(a, Predicate::Less) },
    Signature { name: "contains", arity: Arity::Exactly(2), kinds: BINARY, build: |a| binary(a, Predicate::Contains) },
    Signature { name: "and", arity: Arity::AtLeast(1), kinds: VARIADIC, build: |a| Ok(Predicate::And(a)) },
    Signature { name: "or", arity: Arity::AtLeast(1), kinds: VARIADIC, build: |a| Ok(Predicate::Or(a)) },
    Signature { name: "not", arity: Arity::Exactly(1), kinds: VARIADIC, build: not },
    Signature { name: "limit", arity: Arity::Exactly(1), kinds: LITERAL, build: limit },
];

pub fn lookup(name: &str) -> Option<&'static Signature> {
    CATALOG.iter().find(|s| s.name == name)
}

pub fn names() -> impl Iterator<Item = &'static str> {
    CATALOG.iter().map(|s| s.name)
}

fn binary(
    arguments: Vec<Predicate>,
    node: fn(Box<Predicate>, Box<Predicate>) -> Predicate,
) -> std::result::Result<Predicate, String> {
    let mut arguments = arguments.into_iter();
    match (arguments.next(), arguments.next()) {
        (Some(a), Some(b)) => Ok(node(Box::new(a), Box::new(b))),
        _ => Err("two arguments expected".to_string()),
    }
}

fn not(arguments: Vec<Predicate>) -> std::result::Result<Predicate, String> {
    arguments
        .into_iter()
        .next()
        .map(|child| Predicate::Not(Box::new(child)))
        .ok_or_else(|| "one argument expected".to_string())
}

fn limit(arguments: Vec<Predicate>) -> std::result::Result<Predicate, String> {
    match arguments.first() {
        Some(Predicate::Literal(Value::Number(n))) if *n >= 0 => Ok(Predicate::Limit(*n as usize)),
        Some(Predicate::Literal(Value::Number(n))) => Err(format!("'limit' needs a non-negative number, got {}", n)),
        _ => Err("'limit' needs a numeric literal".to_string()),
    }
}

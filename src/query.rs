//! Parser of the query language.
//!
//! ```text
//! (and (matches "project plan" $text) (limit 10))
//! (equal $pos 0)
//! ```
//!
//! The grammar in `query.pest` only recognizes the shape of a query. The
//! tree is then built by recursive descent over the parse pairs: each form's
//! name is resolved in the [`catalog`](crate::catalog), each argument is
//! checked against the kind the catalog declares for its position, and the
//! node is constructed once all of its arguments are. The first problem
//! found aborts the whole parse.

use pest::Parser;
use pest::iterators::Pair;
use pest_derive::Parser;

use crate::catalog::{self, ArgKind};
use crate::datatype::Value;
use crate::error::{BoutinfError, Result};
use crate::predicate::Predicate;

#[derive(Parser)]
#[grammar = "query.pest"]
struct QueryGrammar;

/// Parses a query. Empty (or blank) queries accept everything.
pub fn parse(query: &str) -> Result<Predicate> {
    if query.trim().is_empty() {
        return Ok(Predicate::Always);
    }
    let mut pairs = QueryGrammar::parse(Rule::query, query)?;
    let expression = pairs
        .next()
        .and_then(|q| q.into_inner().find(|p| p.as_rule() == Rule::expression))
        .ok_or_else(|| BoutinfError::parse("empty query", 1, 1))?;
    build_expression(expression)
}

fn error_at(pair: &Pair<Rule>, message: String) -> BoutinfError {
    let (line, col) = pair.as_span().start_pos().line_col();
    BoutinfError::parse(message, line, col)
}

fn build_expression(pair: Pair<Rule>) -> Result<Predicate> {
    let form = pair.clone();
    let mut inner = pair.into_inner();
    let name = inner
        .next()
        .ok_or_else(|| error_at(&form, "missing predicate name".to_string()))?;
    let signature = catalog::lookup(name.as_str()).ok_or_else(|| {
        error_at(
            &name,
            format!(
                "Unknown predicate '{}', expected one of: {}",
                name.as_str(),
                catalog::names().collect::<Vec<_>>().join(", ")
            ),
        )
    })?;
    let mut arguments = Vec::new();
    for argument in inner {
        if !signature.arity.has_room(arguments.len()) {
            return Err(error_at(
                &argument,
                format!("'{}' takes {}, got more", signature.name, signature.arity),
            ));
        }
        let kind = signature.kind(arguments.len());
        arguments.push(build_argument(argument, kind, signature.name)?);
    }
    signature.construct(arguments).map_err(|message| error_at(&form, message))
}

fn build_argument(pair: Pair<Rule>, kind: ArgKind, owner: &str) -> Result<Predicate> {
    match pair.as_rule() {
        Rule::number => {
            let n = pair
                .as_str()
                .parse::<i64>()
                .map_err(|e| error_at(&pair, format!("bad number '{}': {}", pair.as_str(), e)))?;
            Ok(Predicate::Literal(Value::Number(n)))
        }
        Rule::text => {
            let content = pair.clone().into_inner().next().map(|c| c.as_str()).unwrap_or("");
            Ok(Predicate::Literal(Value::Text(unescape(content))))
        }
        Rule::word => Ok(Predicate::Literal(Value::Text(pair.as_str().to_string()))),
        Rule::variable if kind == ArgKind::Predicate => Ok(variable(&pair.as_str()[1..])),
        Rule::expression if kind == ArgKind::Predicate => build_expression(pair),
        Rule::variable | Rule::expression => Err(error_at(
            &pair,
            format!("'{}' expects a literal here, got '{}'", owner, pair.as_str()),
        )),
        other => Err(error_at(&pair, format!("unexpected {:?}", other))),
    }
}

fn variable(name: &str) -> Predicate {
    match name {
        "pos" => Predicate::Position,
        "now" => Predicate::Now,
        "number" => Predicate::Number,
        attribute => Predicate::Attribute(attribute.to_string()),
    }
}

// a backslash keeps the character after it, whatever it is
fn unescape(content: &str) -> String {
    let mut text = String::with_capacity(content.len());
    let mut chars = content.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(escaped) = chars.next() {
                text.push(escaped);
            }
        } else {
            text.push(c);
        }
    }
    text
}

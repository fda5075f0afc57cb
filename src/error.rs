use thiserror::Error;

use crate::query::Rule;

#[derive(Error, Debug)]
pub enum BoutinfError {
    #[error("Config error: {0}")]
    Config(String),
    #[error("Persistence error: {0}")]
    Persistence(String),
    #[error("Index '{name}' is corrupted: {message}")]
    IndexCorruption { name: String, message: String },
    #[error("Invalid index name: '{0}'")]
    InvalidIndexName(String),
    #[error("Parse error: {message}")]
    Parse { message: String, line: Option<usize>, col: Option<usize> },
    #[error("Type mismatch: {0}")]
    EvaluationType(String),
    #[error("Message source error: {0}")]
    Source(String),
    #[error("Lock poisoned: {0}")]
    Lock(String),
    #[error("Query cancelled")]
    Cancelled,
    #[error("Query timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u128 },
}

pub type Result<T> = std::result::Result<T, BoutinfError>;

impl BoutinfError {
    pub fn parse(message: impl Into<String>, line: usize, col: usize) -> Self {
        Self::Parse { message: message.into(), line: Some(line), col: Some(col) }
    }
    pub fn corruption(name: &str, message: impl Into<String>) -> Self {
        Self::IndexCorruption { name: name.to_string(), message: message.into() }
    }
    pub fn is_parse(&self) -> bool {
        matches!(self, Self::Parse { .. })
    }
}

// Helper conversions
impl From<std::io::Error> for BoutinfError {
    fn from(e: std::io::Error) -> Self { Self::Persistence(e.to_string()) }
}
impl From<rusqlite::Error> for BoutinfError {
    fn from(e: rusqlite::Error) -> Self { Self::Source(e.to_string()) }
}
impl From<config::ConfigError> for BoutinfError {
    fn from(e: config::ConfigError) -> Self { Self::Config(e.to_string()) }
}
impl From<pest::error::Error<Rule>> for BoutinfError {
    fn from(e: pest::error::Error<Rule>) -> Self {
        let (line, col) = match e.line_col {
            pest::error::LineColLocation::Pos(pos) => pos,
            pest::error::LineColLocation::Span(start, _) => start,
        };
        Self::Parse { message: e.variant.message().to_string(), line: Some(line), col: Some(col) }
    }
}
impl<T> From<std::sync::PoisonError<T>> for BoutinfError {
    fn from(e: std::sync::PoisonError<T>) -> Self { Self::Lock(e.to_string()) }
}

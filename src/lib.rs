//! Boutinf – indexing and querying the messages of conversations ("bouts").
//!
//! Messages are filtered with a small prefix query language:
//!
//! ```text
//! (matches "project plan" $text)
//! (and (equal $author "alice") (limit 3))
//! (equal $pos 0)
//! ```
//!
//! A query names a predicate from the [`catalog`] and gives it arguments:
//! nested forms, `"quoted"` or bare strings, integers, and `$variables`.
//! `$pos` is the number of results accepted so far, `$now` the time of the
//! evaluation and `$number` the message itself; every other `$name` reads an
//! attribute of the message (`$author`, `$text`, `$date`, `$bout`,
//! `$participants`, ...). The empty query accepts every message.
//!
//! ## Modules
//! * [`index`] – [`index::AttributeIndex`] (message → value for one attribute)
//!   and the directory-backed [`index::IndexStore`] that materializes each index
//!   once, on first use, and flushes them on demand and on drop.
//! * [`persist`] – the checksummed file format of an index.
//! * [`datatype`] – the [`datatype::Value`] every predicate produces, with the
//!   normalizing equality and ordering used by comparisons.
//! * [`keywords`] – tokenization and fuzzy keyword containment behind `matches`.
//! * [`predicate`] – the closed [`predicate::Predicate`] tree and its evaluation.
//! * [`catalog`] – predicate names, arities and argument kinds.
//! * [`query`] – the parser turning query text into a predicate tree.
//! * [`engine`] – [`engine::Engine`], which caches parsed queries and folds
//!   candidates through them while counting accepted results.
//! * [`source`] – the upstream message source consulted on index misses.
//! * [`interface`] – background execution with cancellation and time budgets.
//! * [`settings`] – layered configuration.
//!
//! ## Quick Start
//! ```
//! use std::sync::Arc;
//! use chrono::Utc;
//! use boutinf::{engine::Engine, index::IndexStore, source::{MemorySource, Message}};
//! let dir = std::env::temp_dir().join(format!("boutinf-doc-{}", std::process::id()));
//! let store = Arc::new(IndexStore::open(&dir).unwrap());
//! let source = Arc::new(MemorySource::new());
//! for n in 1..=3 {
//!     source.post(Message::new(n, 1, "alice", "hi there, what's up", Utc::now())).unwrap();
//! }
//! let engine = Engine::new(store, source);
//! let first = engine.select("(equal $pos 0)", &[3u64, 2, 1]).unwrap();
//! assert_eq!(first, vec![3]);
//! let up = engine.select("(matches \"up?\" $text)", &[3u64, 2, 1]).unwrap();
//! assert_eq!(up.len(), 3);
//! ```

pub mod catalog;
pub mod datatype;
pub mod engine;
pub mod error;
pub mod index;
pub mod interface;
pub mod keywords;
pub mod persist;
pub mod predicate;
pub mod query;
pub mod settings;
pub mod source;

pub use error::{BoutinfError, Result};

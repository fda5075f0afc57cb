//! Runs queries over candidate messages.
//!
//! Candidates arrive already ordered by the caller (newest first for a
//! bout). They are folded through the parsed predicate one after another:
//! a candidate is evaluated with the number of results accepted before it as
//! its position, so `(equal $pos 0)` keeps only the first candidate that
//! passes and `(limit 5)` the first five. The fold is strictly sequential.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use chrono::Utc;
use tracing::{debug, info};

use crate::error::{BoutinfError, Result};
use crate::index::{IndexStore, MessageId, OtherHasher};
use crate::interface::CancelToken;
use crate::predicate::{Context, Predicate};
use crate::query;
use crate::source::{BoutId, Message, MessageSource};

pub const DEFAULT_CACHE_SIZE: usize = 256;

/// Anything that identifies a message can be a candidate.
pub trait Candidate {
    fn number(&self) -> MessageId;
}
impl Candidate for MessageId {
    fn number(&self) -> MessageId {
        *self
    }
}
impl Candidate for Message {
    fn number(&self) -> MessageId {
        self.number
    }
}

pub struct Engine {
    store: Arc<IndexStore>,
    source: Arc<dyn MessageSource>,
    parsed: Mutex<HashMap<String, Arc<Predicate>, OtherHasher>>,
    cache_size: usize,
}

impl Engine {
    pub fn new(store: Arc<IndexStore>, source: Arc<dyn MessageSource>) -> Self {
        Self::with_cache_size(store, source, DEFAULT_CACHE_SIZE)
    }
    pub fn with_cache_size(store: Arc<IndexStore>, source: Arc<dyn MessageSource>, cache_size: usize) -> Self {
        Self {
            store,
            source,
            parsed: Mutex::new(HashMap::default()),
            cache_size,
        }
    }
    pub fn store(&self) -> &Arc<IndexStore> {
        &self.store
    }
    pub fn source(&self) -> &Arc<dyn MessageSource> {
        &self.source
    }

    /// Parses a query, reusing the tree of an earlier identical query.
    pub fn parse(&self, query: &str) -> Result<Arc<Predicate>> {
        if let Some(predicate) = self.parsed.lock()?.get(query) {
            debug!(query, "parsed query reused");
            return Ok(Arc::clone(predicate));
        }
        // parsed outside the lock, concurrent misses may both parse
        let predicate = Arc::new(query::parse(query)?);
        let mut parsed = self.parsed.lock()?;
        if parsed.len() >= self.cache_size {
            parsed.clear();
        }
        if self.cache_size > 0 {
            parsed.insert(query.to_string(), Arc::clone(&predicate));
        }
        Ok(predicate)
    }

    /// The candidates accepted by `query`, in their original order.
    pub fn select<M: Candidate + Clone>(&self, query: &str, candidates: &[M]) -> Result<Vec<M>> {
        let predicate = self.parse(query)?;
        self.fold(&predicate, candidates, None)
    }

    pub fn select_cancellable<M: Candidate + Clone>(
        &self,
        query: &str,
        candidates: &[M],
        cancel: &CancelToken,
    ) -> Result<Vec<M>> {
        let predicate = self.parse(query)?;
        self.fold(&predicate, candidates, Some(cancel))
    }

    /// Messages of a bout accepted by `query`, newest first.
    pub fn messages(&self, bout: BoutId, query: &str) -> Result<Vec<Message>> {
        let predicate = self.parse(query)?;
        let candidates = self.source.messages(bout)?;
        self.fold(&predicate, &candidates, None)
    }

    /// Writer side: puts every attribute a message carries into its index.
    pub fn index_message(&self, message: &Message) -> Result<()> {
        for name in Message::ATTRIBUTES {
            if let Some(value) = message.attribute(name)? {
                self.store.index_for(name)?.put(message.number, value)?;
            }
        }
        debug!(message = message.number, bout = message.bout, "message indexed");
        Ok(())
    }

    /// A type error aborts the whole pass; nothing accepted so far is returned.
    fn fold<M: Candidate + Clone>(
        &self,
        predicate: &Predicate,
        candidates: &[M],
        cancel: Option<&CancelToken>,
    ) -> Result<Vec<M>> {
        let started = Instant::now();
        let context = Context::new(&self.store, self.source.as_ref(), Utc::now());
        let mut accepted = Vec::new();
        for candidate in candidates {
            if cancel.is_some_and(|c| c.is_cancelled()) {
                return Err(BoutinfError::Cancelled);
            }
            if predicate.truth(&context, candidate.number(), accepted.len())? {
                accepted.push(candidate.clone());
            }
        }
        info!(
            query = %predicate,
            candidates = candidates.len(),
            accepted = accepted.len(),
            ms = started.elapsed().as_secs_f64() * 1000.0,
            "query complete"
        );
        Ok(accepted)
    }
}

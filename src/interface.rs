//! Running queries on worker threads under an optional wall-clock budget.
//!
//! [`QueryInterface::start_query`] hands the query and its candidates to a
//! thread of its own and returns a [`QueryHandle`]; the outcome comes back
//! over a channel. Stopping is cooperative: the engine looks at the
//! [`CancelToken`] before each candidate. A query that runs out of budget is
//! cancelled and its partial output dropped. Evaluation only ever warms
//! indexes with values the source already holds, so dropping it midway
//! leaves nothing to undo.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::engine::Engine;
use crate::error::{BoutinfError, Result};
use crate::source::Message;

#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QueryId(u64);

type Outcome = Result<Vec<Message>>;

pub struct QueryHandle {
    pub id: QueryId,
    token: CancelToken,
    started: Instant,
    budget: Option<Duration>,
    worker: Option<thread::JoinHandle<()>>,
    outcome: Receiver<Outcome>,
}

impl QueryHandle {
    /// Asks the worker to stop; it does so before its next candidate.
    pub fn cancel(&self) {
        self.token.cancel();
    }
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
    /// Blocks until the query finishes or its budget is spent, whichever
    /// comes first. A spent budget cancels the worker and yields `Timeout`.
    pub fn wait(mut self) -> Outcome {
        let received = match self.budget {
            None => self.outcome.recv().map_err(|_| RecvTimeoutError::Disconnected),
            Some(budget) => self
                .outcome
                .recv_timeout(budget.saturating_sub(self.started.elapsed())),
        };
        let outcome = match received {
            Ok(outcome) => outcome,
            Err(RecvTimeoutError::Timeout) => {
                self.token.cancel();
                let elapsed_ms = self.started.elapsed().as_millis();
                warn!(id = self.id.0, elapsed_ms, "query over budget, abandoned");
                // not joined, the worker winds down by itself
                return Err(BoutinfError::Timeout { elapsed_ms });
            }
            Err(RecvTimeoutError::Disconnected) => Err(BoutinfError::Cancelled),
        };
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
        outcome
    }
}

#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    /// No budget when `None`.
    pub timeout: Option<Duration>,
}

pub struct QueryInterface {
    engine: Arc<Engine>,
    last_id: AtomicU64,
    // tokens of the queries still running, by id
    running: Arc<Mutex<HashMap<QueryId, CancelToken>>>,
}

impl QueryInterface {
    pub fn new(engine: Arc<Engine>) -> Self {
        Self {
            engine,
            last_id: AtomicU64::new(0),
            running: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    pub fn start_query(&self, query: String, candidates: Vec<Message>, options: QueryOptions) -> Result<QueryHandle> {
        let id = QueryId(self.last_id.fetch_add(1, Ordering::Relaxed) + 1);
        let token = CancelToken::new();
        self.running.lock()?.insert(id, token.clone());

        let (sender, outcome) = mpsc::channel();
        let engine = Arc::clone(&self.engine);
        let running = Arc::clone(&self.running);
        let worker_token = token.clone();
        let worker = thread::spawn(move || {
            let result = engine.select_cancellable(&query, &candidates, &worker_token);
            if let Ok(mut running) = running.lock() {
                running.remove(&id);
            }
            debug!(id = id.0, ok = result.is_ok(), "query worker done");
            // nobody listens any more once the caller timed out
            let _ = sender.send(result);
        });

        Ok(QueryHandle {
            id,
            token,
            started: Instant::now(),
            budget: options.timeout,
            worker: Some(worker),
            outcome,
        })
    }

    /// Same as [`Engine::select`], on the calling thread.
    pub fn run_sync(&self, query: &str, candidates: &[Message]) -> Outcome {
        self.engine.select(query, candidates)
    }

    /// Returns false when no query with that id is running.
    pub fn cancel(&self, id: QueryId) -> bool {
        let Ok(running) = self.running.lock() else {
            return false;
        };
        running.get(&id).map(CancelToken::cancel).is_some()
    }

    pub fn running(&self) -> usize {
        self.running.lock().map(|running| running.len()).unwrap_or(0)
    }
}

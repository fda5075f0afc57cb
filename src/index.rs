//! Attribute indexes and the directory-backed store that keeps them.
//!
//! An [`AttributeIndex`] maps message numbers to one attribute's [`Value`].
//! The [`IndexStore`] owns every index of a directory and follows a keeper
//! pattern: the first [`IndexStore::index_for`] call for a name loads (or
//! creates) the index, and every later call hands out the same `Arc`.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::fs;
use std::hash::BuildHasherDefault;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use once_cell::sync::OnceCell;
use seahash::SeaHasher;
use tracing::{debug, info, warn};

use crate::datatype::Value;
use crate::error::{BoutinfError, Result};
use crate::persist;

// ------------- Message identity -------------
pub type MessageId = u64;

pub type IdHasher = BuildHasherDefault<SeaHasher>;
pub type OtherHasher = BuildHasherDefault<SeaHasher>;

// ------------- AttributeIndex -------------
#[derive(Debug)]
pub struct AttributeIndex {
    name: String,
    path: PathBuf,
    entries: RwLock<HashMap<MessageId, Value, IdHasher>>,
    // set by every put, cleared when a flush takes its snapshot
    dirty: AtomicBool,
    // one writer of the file at a time
    flushing: Mutex<()>,
}

impl AttributeIndex {
    fn load(directory: &Path, name: &str) -> Result<Self> {
        let path = persist::index_path(directory, name);
        let mut entries = HashMap::default();
        if let Some(restored) = persist::read_index(&path, name)? {
            entries.extend(restored);
        }
        debug!(index = name, entries = entries.len(), "index materialized");
        Ok(Self {
            name: name.to_string(),
            path,
            entries: RwLock::new(entries),
            dirty: AtomicBool::new(false),
            flushing: Mutex::new(()),
        })
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn path(&self) -> &Path {
        &self.path
    }
    pub fn get(&self, message: MessageId) -> Result<Option<Value>> {
        Ok(self.entries.read()?.get(&message).cloned())
    }
    /// Last write wins.
    pub fn put(&self, message: MessageId, value: Value) -> Result<()> {
        self.entries.write()?.insert(message, value);
        self.dirty.store(true, Ordering::Release);
        Ok(())
    }
    pub fn len(&self) -> Result<usize> {
        Ok(self.entries.read()?.len())
    }
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }
    /// Writes a snapshot of the index to its file. Returns whether anything
    /// was written; an index without changes since its last flush is left alone.
    pub fn flush(&self) -> Result<bool> {
        let _guard = self.flushing.lock()?;
        if !self.dirty.swap(false, Ordering::AcqRel) {
            return Ok(false);
        }
        let snapshot: Vec<(MessageId, Value)> = match self.entries.read() {
            Ok(entries) => entries.iter().map(|(k, v)| (*k, v.clone())).collect(),
            Err(e) => {
                self.dirty.store(true, Ordering::Release);
                return Err(e.into());
            }
        };
        if let Err(e) = persist::write_index(&self.path, &self.name, snapshot) {
            // keep the changes eligible for the next flush
            self.dirty.store(true, Ordering::Release);
            return Err(e);
        }
        Ok(true)
    }
}

// ------------- IndexStore -------------
type Slot = Arc<OnceCell<Arc<AttributeIndex>>>;

#[derive(Debug)]
pub struct IndexStore {
    directory: PathBuf,
    // the lock only guards finding or adding a slot; loading happens in the slot
    slots: Mutex<HashMap<String, Slot, OtherHasher>>,
}

impl IndexStore {
    pub fn open(directory: impl Into<PathBuf>) -> Result<Self> {
        let directory = directory.into();
        fs::create_dir_all(&directory)?;
        info!(directory = %directory.display(), "index store opened");
        Ok(Self {
            directory,
            slots: Mutex::new(HashMap::default()),
        })
    }
    pub fn directory(&self) -> &Path {
        &self.directory
    }
    /// The index for `name`, loaded from disk on first use. Concurrent first
    /// calls for the same name load it once and all receive that instance.
    /// A failed load leaves nothing behind, so a later call tries again.
    pub fn index_for(&self, name: &str) -> Result<Arc<AttributeIndex>> {
        validate_name(name)?;
        let slot = {
            let mut slots = self.slots.lock()?;
            Arc::clone(slots.entry(name.to_string()).or_default())
        };
        let index = slot.get_or_try_init(|| AttributeIndex::load(&self.directory, name).map(Arc::new))?;
        Ok(Arc::clone(index))
    }
    fn materialized(&self) -> Result<Vec<Arc<AttributeIndex>>> {
        let slots = self.slots.lock()?;
        let mut indexes: Vec<Arc<AttributeIndex>> = slots.values().filter_map(|slot| slot.get().cloned()).collect();
        indexes.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(indexes)
    }
    /// Flushes every materialized index. A failing index does not stop the
    /// others; the first failure is reported once all have been attempted.
    /// Returns how many indexes were written.
    pub fn flush_all(&self) -> Result<usize> {
        let mut written = 0;
        let mut failure = None;
        for index in self.materialized()? {
            match index.flush() {
                Ok(true) => written += 1,
                Ok(false) => (),
                Err(e) => {
                    warn!(index = index.name(), error = %e, "flush failed");
                    failure.get_or_insert(e);
                }
            }
        }
        match failure {
            Some(e) => Err(e),
            None => {
                info!(written, directory = %self.directory.display(), "index store flushed");
                Ok(written)
            }
        }
    }
    pub fn statistics(&self) -> Result<String> {
        let indexes = self.materialized()?;
        let mut text = String::new();
        let _ = writeln!(
            text,
            "{} index(es) materialized in {}",
            indexes.len(),
            self.directory.display()
        );
        for index in indexes {
            let on_disk = fs::metadata(index.path()).map(|m| m.len()).unwrap_or(0);
            let _ = writeln!(
                text,
                "  {}: {} entries, {} bytes on disk{}",
                index.name(),
                index.len()?,
                on_disk,
                if index.is_dirty() { ", unflushed changes" } else { "" }
            );
        }
        Ok(text)
    }
}

impl Drop for IndexStore {
    fn drop(&mut self) {
        if let Err(e) = self.flush_all() {
            warn!(error = %e, directory = %self.directory.display(), "flush on shutdown failed");
        }
    }
}

fn validate_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && !name.starts_with('.')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    if valid { Ok(()) } else { Err(BoutinfError::InvalidIndexName(name.to_string())) }
}

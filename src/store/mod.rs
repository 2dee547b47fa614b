use anyhow::{Context, Result};
use fs_err as fs;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};

use crate::apply::write_atomic;
use crate::errors::ForgeError;
use crate::wire::{HandoffPayload, SavedPageRecord};

pub const MAX_SAVED_PAGES: usize = 50;
pub const HANDOFF_KEY: &str = "shopforge-load";

/// Saved pages, most recent first. Implementations own the cap and the ordering.
pub trait PageRepository: Send + Sync {
    fn all(&self) -> Result<Vec<SavedPageRecord>, ForgeError>;

    /// Puts `record` at the front and drops whatever falls past the cap.
    fn append(&self, record: SavedPageRecord) -> Result<(), ForgeError>;

    /// Returns whether anything was removed; unknown ids are not an error.
    fn delete(&self, id: &str) -> Result<bool, ForgeError>;

    fn get(&self, id: &str) -> Result<Option<SavedPageRecord>, ForgeError> {
        Ok(self.all()?.into_iter().find(|r| r.id == id))
    }
}

fn push_capped(list: &mut Vec<SavedPageRecord>, record: SavedPageRecord) {
    list.retain(|r| r.id != record.id);
    list.insert(0, record);
    list.truncate(MAX_SAVED_PAGES);
}

fn remove_id(list: &mut Vec<SavedPageRecord>, id: &str) -> bool {
    let before = list.len();
    list.retain(|r| r.id != id);
    list.len() != before
}

fn storage(e: anyhow::Error) -> ForgeError {
    ForgeError::Storage(format!("{e:#}"))
}

#[derive(Default)]
pub struct MemoryRepository {
    pages: Mutex<Vec<SavedPageRecord>>,
}

impl PageRepository for MemoryRepository {
    fn all(&self) -> Result<Vec<SavedPageRecord>, ForgeError> {
        Ok(self.pages.lock().clone())
    }

    fn append(&self, record: SavedPageRecord) -> Result<(), ForgeError> {
        push_capped(&mut self.pages.lock(), record);
        Ok(())
    }

    fn delete(&self, id: &str) -> Result<bool, ForgeError> {
        Ok(remove_id(&mut self.pages.lock(), id))
    }
}

/// One JSON array per namespace, at `<dir>/<namespace>.json`.
///
/// Every mutation re-reads the whole list under a lock before writing it back.
pub struct JsonFileRepository {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileRepository {
    pub fn new(dir: &Path, namespace: &str) -> Self {
        Self { path: dir.join(format!("{namespace}.json")), lock: Mutex::new(()) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Vec<SavedPageRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let text = fs::read_to_string(&self.path)?;
        match serde_json::from_str::<Vec<SavedPageRecord>>(&text) {
            Ok(list) => Ok(list),
            Err(e) => {
                log::warn!("store: {} is unreadable ({e}); starting from an empty list", self.path.display());
                Ok(Vec::new())
            }
        }
    }

    fn persist(&self, list: &[SavedPageRecord]) -> Result<()> {
        let data = serde_json::to_vec_pretty(list)?;
        write_atomic(&self.path, &data).with_context(|| format!("failed to save {}", self.path.display()))
    }

    fn update<T>(&self, f: impl FnOnce(&mut Vec<SavedPageRecord>) -> T) -> Result<T, ForgeError> {
        let _guard = self.lock.lock();
        let mut list = self.load().map_err(storage)?;
        let out = f(&mut list);
        self.persist(&list).map_err(storage)?;
        Ok(out)
    }
}

impl PageRepository for JsonFileRepository {
    fn all(&self) -> Result<Vec<SavedPageRecord>, ForgeError> {
        let _guard = self.lock.lock();
        self.load().map_err(storage)
    }

    fn append(&self, record: SavedPageRecord) -> Result<(), ForgeError> {
        log::debug!("store: saving {}", record.id);
        self.update(|list| push_capped(list, record))
    }

    fn delete(&self, id: &str) -> Result<bool, ForgeError> {
        self.update(|list| remove_id(list, id))
    }
}

/// Single-read slot passing a saved page back to the generator.
pub struct HandoffSlot {
    path: PathBuf,
}

impl HandoffSlot {
    pub fn new(dir: &Path) -> Self {
        Self { path: dir.join(format!("{HANDOFF_KEY}.json")) }
    }

    pub fn put(&self, payload: &HandoffPayload) -> Result<()> {
        write_atomic(&self.path, &serde_json::to_vec(payload)?)
    }

    /// Reads and clears the slot. A corrupt payload is cleared and ignored.
    pub fn take(&self) -> Result<Option<HandoffPayload>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let text = fs::read_to_string(&self.path)?;
        fs::remove_file(&self.path)?;
        match serde_json::from_str(&text) {
            Ok(p) => Ok(Some(p)),
            Err(e) => {
                log::warn!("store: discarding unreadable hand-off payload: {e}");
                Ok(None)
            }
        }
    }
}

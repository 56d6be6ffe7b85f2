use std::collections::BTreeSet;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WatchListError {
    #[error("watch list has been destroyed")]
    Destroyed,
    #[error("watch list lock is poisoned")]
    Poisoned,
    #[error("process name must be non-empty without surrounding whitespace")]
    InvalidName,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    AlreadyPresent,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed,
    NotPresent,
}

fn validate_name(name: &str) -> Result<(), WatchListError> {
    if name.is_empty() || name.trim() != name {
        return Err(WatchListError::InvalidName);
    }
    Ok(())
}

/// Set of process names to intercept.
///
/// Every mutation and every iteration happens inside one critical section, so a reader never
/// sees a half-applied edit. `None` marks a destroyed list.
#[derive(Debug)]
pub struct WatchList {
    entries: Mutex<Option<BTreeSet<String>>>,
}

impl Default for WatchList {
    fn default() -> Self {
        Self::new()
    }
}

impl WatchList {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Some(BTreeSet::new())),
        }
    }

    pub fn with_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            entries: Mutex::new(Some(entries.into_iter().map(Into::into).collect())),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Option<BTreeSet<String>>>, WatchListError> {
        self.entries.lock().map_err(|_| WatchListError::Poisoned)
    }

    /// Loads one name per line; blank lines and `#` comments are skipped. An unreadable file
    /// leaves the list as it is.
    pub fn init(&self, path: impl AsRef<Path>) -> Result<usize, WatchListError> {
        let path = path.as_ref();
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                warn!("Could not read watch list file {:?}: {}", path, e);
                return Ok(0);
            }
        };

        let mut guard = self.lock()?;
        let entries = guard.as_mut().ok_or(WatchListError::Destroyed)?;
        let mut loaded = 0;
        for name in content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
        {
            if entries.insert(name.to_string()) {
                loaded += 1;
            }
        }

        info!("Loaded {} watch list entries from {:?}", loaded, path);
        Ok(loaded)
    }

    /// Names match exactly; one that is empty or padded with whitespace is rejected.
    pub fn add(&self, name: &str) -> Result<AddOutcome, WatchListError> {
        validate_name(name)?;

        let mut guard = self.lock()?;
        let entries = guard.as_mut().ok_or(WatchListError::Destroyed)?;
        if entries.insert(name.to_string()) {
            debug!("watch list: added {}", name);
            Ok(AddOutcome::Added)
        } else {
            Ok(AddOutcome::AlreadyPresent)
        }
    }

    pub fn remove(&self, name: &str) -> Result<RemoveOutcome, WatchListError> {
        validate_name(name)?;

        let mut guard = self.lock()?;
        let entries = guard.as_mut().ok_or(WatchListError::Destroyed)?;
        if entries.remove(name) {
            debug!("watch list: removed {}", name);
            Ok(RemoveOutcome::Removed)
        } else {
            Ok(RemoveOutcome::NotPresent)
        }
    }

    /// Visits every entry while holding the lock. `visit` must not block or touch the list.
    pub fn snapshot_iterate<F>(&self, mut visit: F) -> Result<(), WatchListError>
    where
        F: FnMut(&str),
    {
        let guard = self.lock()?;
        let entries = guard.as_ref().ok_or(WatchListError::Destroyed)?;
        for name in entries {
            visit(name);
        }
        Ok(())
    }

    pub fn contains(&self, name: &str) -> Result<bool, WatchListError> {
        let mut found = false;
        self.snapshot_iterate(|entry| found |= entry == name)?;
        Ok(found)
    }

    pub fn snapshot(&self) -> Result<Vec<String>, WatchListError> {
        let mut names = Vec::new();
        self.snapshot_iterate(|entry| names.push(entry.to_string()))?;
        Ok(names)
    }

    pub fn len(&self) -> Result<usize, WatchListError> {
        let guard = self.lock()?;
        guard
            .as_ref()
            .map(BTreeSet::len)
            .ok_or(WatchListError::Destroyed)
    }

    pub fn is_empty(&self) -> Result<bool, WatchListError> {
        Ok(self.len()? == 0)
    }

    /// Drops every entry. Any later call fails with [`WatchListError::Destroyed`].
    pub fn destroy(&self) {
        match self.entries.lock() {
            Ok(mut guard) => *guard = None,
            // nobody can observe a torn set through a poisoned lock, clear it anyway
            Err(poisoned) => *poisoned.into_inner() = None,
        }
    }

    pub fn is_destroyed(&self) -> bool {
        self.lock().map(|guard| guard.is_none()).unwrap_or(true)
    }
}

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{StorageError, UnknownClass};
use crate::schema::ClassSet;

pub mod storage;

pub use storage::{KeyValueStorage, MemoryStorage};

/// Slot the ledger is persisted under.
pub const HISTORY_KEY: &str = "ecosim_history";

/// Predicted class labels, newest first. Serialized as a JSON array.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HistoryLedger {
    entries: VecDeque<String>,
}

impl HistoryLedger {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    pub fn newest(&self) -> Option<&str> {
        self.entries.front().map(String::as_str)
    }
}

/// Occurrences per class, always covering the whole class set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassCounts {
    counts: Vec<(String, usize)>,
}

impl ClassCounts {
    fn tally(classes: &ClassSet, ledger: &HistoryLedger) -> Self {
        let mut counts: Vec<(String, usize)> =
            classes.iter().map(|c| (c.to_string(), 0)).collect();
        for label in ledger.iter() {
            if let Some(idx) = classes.index_of(label) {
                counts[idx].1 += 1;
            }
        }
        Self { counts }
    }

    pub fn get(&self, class: &str) -> Option<usize> {
        self.counts
            .iter()
            .find(|(c, _)| c == class)
            .map(|(_, n)| *n)
    }

    /// Counts in canonical class order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.counts.iter().map(|(c, n)| (c.as_str(), *n))
    }

    pub fn total(&self) -> usize {
        self.counts.iter().map(|(_, n)| n).sum()
    }

    /// Bar lengths relative to the most frequent class, in percent.
    pub fn bar_percentages(&self) -> Vec<(&str, f64)> {
        let max = self.counts.iter().map(|(_, n)| *n).max().unwrap_or(0).max(1);
        self.iter()
            .map(|(c, n)| (c, n as f64 / max as f64 * 100.0))
            .collect()
    }
}

/// Append-only ledger of predictions, persisted after every change.
///
/// Storage failures never reach the caller: the store logs them and carries on
/// in memory.
#[derive(Debug)]
pub struct PredictionHistoryStore<S> {
    storage: S,
    classes: ClassSet,
    ledger: HistoryLedger,
    max_len: Option<usize>,
    persistent: bool,
    /// The slot has been read (or deliberately replaced) since opening.
    /// Until then nothing is written, so an unreadable slot is never clobbered.
    restored: bool,
}

impl<S: KeyValueStorage> PredictionHistoryStore<S> {
    /// Restore the ledger from `storage`, or start empty.
    pub fn open(storage: S, classes: ClassSet) -> Self {
        let mut store = Self {
            storage,
            classes,
            ledger: HistoryLedger::default(),
            max_len: None,
            persistent: true,
            restored: false,
        };

        match Self::restore(&store.storage, &store.classes) {
            Ok((ledger, dropped)) => {
                store.ledger = ledger;
                store.restored = true;
                if dropped > 0 {
                    store.persist();
                }
            }
            Err(err @ StorageError::Unavailable(_)) => {
                warn!(%err, "history storage unavailable, keeping history in memory");
                store.persistent = false;
            }
            Err(err) => {
                warn!(%err, "discarding unreadable prediction history");
                store.restored = true;
            }
        }
        debug!(entries = store.ledger.len(), "restored prediction history");

        store
    }

    /// Keep at most `max_len` entries, dropping the oldest.
    pub fn with_max_len(mut self, max_len: usize) -> Self {
        self.max_len = Some(max_len);
        if self.ledger.len() > max_len {
            self.ledger.entries.truncate(max_len);
            self.persist();
        }
        self
    }

    /// Read the slot, dropping labels outside `classes`. Also returns how many
    /// were dropped.
    fn restore(storage: &S, classes: &ClassSet) -> Result<(HistoryLedger, usize), StorageError> {
        let Some(raw) = storage.read(HISTORY_KEY)? else {
            return Ok((HistoryLedger::default(), 0));
        };

        let mut ledger: HistoryLedger =
            serde_json::from_str(&raw).map_err(|source| StorageError::Corrupt {
                key: HISTORY_KEY.to_string(),
                source,
            })?;

        let before = ledger.len();
        ledger.entries.retain(|label| classes.contains(label));
        let dropped = before - ledger.len();
        if dropped > 0 {
            warn!(dropped, "dropped history entries with unknown classes");
        }

        Ok((ledger, dropped))
    }

    pub fn append(&mut self, class: &str) -> Result<(), UnknownClass> {
        self.classes.check(class)?;
        self.ledger.entries.push_front(class.to_string());
        self.truncate();
        self.persist();
        Ok(())
    }

    /// Empty the ledger. This replaces whatever the slot holds, even if it
    /// could not be read at startup.
    pub fn clear(&mut self) {
        self.ledger.entries.clear();
        self.restored = true;
        self.persist();
    }

    /// Recomputed from the ledger on every call.
    pub fn counts(&self) -> ClassCounts {
        ClassCounts::tally(&self.classes, &self.ledger)
    }

    pub fn ledger(&self) -> &HistoryLedger {
        &self.ledger
    }

    pub fn classes(&self) -> &ClassSet {
        &self.classes
    }

    /// Whether the last storage operation succeeded.
    pub fn is_persistent(&self) -> bool {
        self.persistent
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    fn truncate(&mut self) {
        if let Some(max_len) = self.max_len {
            self.ledger.entries.truncate(max_len);
        }
    }

    /// Retry a failed startup read. Stored entries are older than anything
    /// recorded since, so they go after the in-memory ones.
    fn catch_up(&mut self) -> Result<(), StorageError> {
        match Self::restore(&self.storage, &self.classes) {
            Ok((stored, _)) => self.ledger.entries.extend(stored.entries),
            Err(StorageError::Corrupt { .. }) => {}
            Err(err) => return Err(err),
        }
        self.truncate();
        self.restored = true;
        debug!(entries = self.ledger.len(), "caught up with stored history");
        Ok(())
    }

    fn persist(&mut self) {
        let result = if self.restored {
            Ok(())
        } else {
            self.catch_up()
        };
        let result = result
            .and_then(|()| {
                serde_json::to_string(&self.ledger)
                    .map_err(|e| StorageError::Unavailable(e.to_string()))
            })
            .and_then(|json| self.storage.write(HISTORY_KEY, &json));

        match result {
            Ok(()) => self.persistent = true,
            Err(err) => {
                if self.persistent {
                    warn!(%err, "could not persist prediction history, continuing in memory");
                }
                self.persistent = false;
            }
        }
    }
}

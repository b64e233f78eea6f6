//! Failed-broadcast journal.
//!
//! A transaction that was built and signed but never made it onto the
//! network cannot be rebuilt from the request alone: the wallet may already
//! have moved on to other outputs. The journal keeps the signed bytes, the
//! intent they were built from, and the broadcast error, so an operator can
//! inspect and rebroadcast by hand.
//!
//! Capacity is fixed; once full, the oldest entry is evicted.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;

use coinhost_core::constants::DEFAULT_JOURNAL_CAPACITY;
use coinhost_core::types::{TransferIntent, WireTx};

/// One transaction that failed to broadcast.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FailedBroadcast {
    /// Monotonic id, unique for the lifetime of the journal.
    pub id: u64,
    pub recorded_at: DateTime<Utc>,
    pub intent: TransferIntent,
    /// Signed transaction, hex encoded when serialized.
    pub tx: WireTx,
    pub error: String,
}

#[derive(Debug)]
struct Inner {
    entries: VecDeque<FailedBroadcast>,
    next_id: u64,
}

/// Bounded in-memory store of [`FailedBroadcast`] entries, oldest first.
#[derive(Debug)]
pub struct BroadcastJournal {
    inner: Mutex<Inner>,
    capacity: usize,
}

impl Default for BroadcastJournal {
    fn default() -> Self {
        Self::new(DEFAULT_JOURNAL_CAPACITY)
    }
}

impl BroadcastJournal {
    /// Create a journal holding at most `capacity` entries (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Mutex::new(Inner {
                entries: VecDeque::with_capacity(capacity),
                next_id: 1,
            }),
            capacity,
        }
    }

    /// Store a failed broadcast and return its id.
    pub fn record(&self, intent: TransferIntent, tx: WireTx, error: impl Into<String>) -> u64 {
        let mut inner = self.inner.lock();
        let id = inner.next_id;
        inner.next_id += 1;

        if inner.entries.len() == self.capacity {
            inner.entries.pop_front();
        }
        inner.entries.push_back(FailedBroadcast {
            id,
            recorded_at: Utc::now(),
            intent,
            tx,
            error: error.into(),
        });
        id
    }

    /// Copy of all entries, oldest first.
    pub fn entries(&self) -> Vec<FailedBroadcast> {
        self.inner.lock().entries.iter().cloned().collect()
    }

    pub fn get(&self, id: u64) -> Option<FailedBroadcast> {
        self.inner.lock().entries.iter().find(|e| e.id == id).cloned()
    }

    /// Acknowledge an entry, e.g. after manual rebroadcast.
    pub fn remove(&self, id: u64) -> Option<FailedBroadcast> {
        let mut inner = self.inner.lock();
        let pos = inner.entries.iter().position(|e| e.id == id)?;
        inner.entries.remove(pos)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

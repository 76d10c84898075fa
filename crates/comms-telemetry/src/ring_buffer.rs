//! Fixed-capacity newest-first collection.
//!
//! Every bounded list in the collector (error records, request records, voice
//! samples) is a `RingBuffer`. Insertion always goes to the front and, once
//! the capacity is exceeded, the oldest entry at the back is evicted.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock a guarded collection, recovering the data if a writer panicked.
///
/// Every mutation under these locks completes without suspension, so a
/// poisoned guard still holds a consistent buffer.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Bounded collection ordered newest-first.
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> RingBuffer<T> {
    /// Create an empty buffer holding at most `capacity` entries.
    ///
    /// A capacity of zero is clamped to one so `push` always retains the
    /// newest record.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Insert a record as the newest entry, evicting the oldest on overflow.
    pub fn push(&mut self, record: T) {
        self.items.push_front(record);
        while self.items.len() > self.capacity {
            self.items.pop_back();
        }
    }

    /// Iterate newest-first without cloning.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    /// Most recently pushed entry.
    #[must_use]
    pub fn newest(&self) -> Option<&T> {
        self.items.front()
    }

    /// Remove every entry.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<T: Clone> RingBuffer<T> {
    /// Snapshot of the contents, newest-first.
    #[must_use]
    pub fn all(&self) -> Vec<T> {
        self.items.iter().cloned().collect()
    }
}

impl RingBuffer<f64> {
    /// Arithmetic mean of the current contents, `None` when empty.
    #[must_use]
    #[allow(clippy::cast_precision_loss)] // Buffer lengths are tiny
    pub fn mean(&self) -> Option<f64> {
        if self.items.is_empty() {
            return None;
        }
        let sum: f64 = self.items.iter().sum();
        Some(sum / self.items.len() as f64)
    }
}

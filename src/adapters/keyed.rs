//! Keyed lock table: one mutex per key.
//!
//! Lookups take a short shard lock inside the `DashMap` only to fetch or
//! create the key's cell; the cell's own mutex is then taken with the map
//! released. Work on different keys never waits on each other's mutex, and
//! a caller holds at most one cell lock at a time.
//!
//! # Mutex Behavior
//!
//! Cells are always replaced wholesale under the lock, so a poisoned cell
//! still holds a consistent value and is recovered rather than propagated.

use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use dashmap::DashMap;

pub struct KeyedLocks<K, V>
where
    K: Eq + Hash,
{
    cells: DashMap<K, Arc<Mutex<V>>>,
}

impl<K, V> Default for KeyedLocks<K, V>
where
    K: Eq + Hash + Clone,
    V: Default,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> KeyedLocks<K, V>
where
    K: Eq + Hash + Clone,
    V: Default,
{
    #[must_use]
    pub fn new() -> Self {
        Self {
            cells: DashMap::new(),
        }
    }

    /// Fetch the cell for `key`, creating a default one if absent.
    fn cell(&self, key: &K) -> Arc<Mutex<V>> {
        if let Some(cell) = self.cells.get(key) {
            return Arc::clone(cell.value());
        }
        Arc::clone(self.cells.entry(key.clone()).or_default().value())
    }

    fn lock(cell: &Mutex<V>) -> MutexGuard<'_, V> {
        cell.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` with exclusive access to the value for `key`.
    ///
    /// This is the atomic read-modify-write step: no other caller can
    /// observe or change the same key while `f` runs.
    pub fn with<R>(&self, key: &K, f: impl FnOnce(&mut V) -> R) -> R {
        let cell = self.cell(key);
        let mut guard = Self::lock(&cell);
        f(&mut guard)
    }

    /// Read the value for `key` without creating a cell.
    pub fn peek<R>(&self, key: &K, f: impl FnOnce(&V) -> R) -> Option<R> {
        let cell = self.cells.get(key).map(|c| Arc::clone(c.value()))?;
        let guard = Self::lock(&cell);
        Some(f(&guard))
    }

    /// Count values matching a predicate.
    ///
    /// Each cell is locked individually; the result is a point-in-time
    /// view, not a consistent cross-key snapshot.
    pub fn count_where(&self, pred: impl Fn(&V) -> bool) -> usize {
        let cells: Vec<Arc<Mutex<V>>> = self.cells.iter().map(|c| Arc::clone(c.value())).collect();
        cells.iter().filter(|cell| pred(&Self::lock(cell))).count()
    }

    /// Number of keys that have a cell.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;
    use std::thread;

    #[test]
    fn test_with_creates_and_updates() {
        let table: KeyedLocks<String, u32> = KeyedLocks::new();
        assert!(table.peek(&"a".to_string(), |v| *v).is_none());

        let after = table.with(&"a".to_string(), |v| {
            *v += 1;
            *v
        });
        assert_eq!(after, 1);
        assert_eq!(table.peek(&"a".to_string(), |v| *v), Some(1));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_concurrent_increments_are_atomic() {
        let table: Arc<KeyedLocks<&'static str, u32>> = Arc::new(KeyedLocks::new());
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let table = Arc::clone(&table);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    for _ in 0..100 {
                        table.with(&"phone", |v| *v += 1);
                    }
                })
            })
            .collect();

        for h in handles {
            h.join().expect("Thread should finish");
        }

        assert_eq!(table.peek(&"phone", |v| *v), Some(800));
    }

    #[test]
    fn test_count_where() {
        let table: KeyedLocks<u8, Option<u8>> = KeyedLocks::new();
        table.with(&1, |v| *v = Some(1));
        table.with(&2, |_| ());
        table.with(&3, |v| *v = Some(3));

        assert_eq!(table.count_where(Option::is_some), 2);
    }
}

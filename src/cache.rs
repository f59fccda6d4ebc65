//! Query cache (§4.6): bounded LRU keyed by `(fingerprint, executor mode,
//! fainder mode)`, with an in-flight waiter list so concurrent requests for
//! the same key share a single evaluation instead of racing each other.
//!
//! Grounded on the teacher's `execution::cache` module (LRU eviction,
//! capacity as a plain integer); the teacher's file is a stub (imports
//! only, no body), so the eviction and waiter-list logic here is original
//! to this crate, built the way `dashmap`/`parking_lot`'s own usage
//! patterns in the teacher's other modules handle shared mutable state —
//! internal exclusion, no lock held across a potentially slow computation.

use crate::executor::{EvalResult, ExecutorError, ExecutorMode};
use crate::evaluators::FainderMode;
use parking_lot::{Condvar, Mutex};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub fingerprint: u64,
    pub executor_mode: ExecutorMode,
    pub fainder_mode: FainderMode,
}

type PendingCell = Arc<(Mutex<Option<Result<EvalResult, ExecutorError>>>, Condvar)>;

struct CacheState {
    capacity: usize,
    values: HashMap<CacheKey, EvalResult>,
    /// Most-recently-used at the back; eviction pops the front.
    order: VecDeque<CacheKey>,
    pending: HashMap<CacheKey, PendingCell>,
}

impl CacheState {
    fn touch(&mut self, key: &CacheKey) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            self.order.remove(pos);
        }
        self.order.push_back(key.clone());
    }

    fn insert(&mut self, key: CacheKey, value: EvalResult) {
        self.values.insert(key.clone(), value);
        self.touch(&key);
        while self.values.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.values.remove(&oldest);
            } else {
                break;
            }
        }
    }
}

/// Per-key linearizability (§5 "the cache provides per-key linearizability
/// via the waiter list"): at most one computation per key runs at a time;
/// every other concurrent caller for that key blocks on the same result.
pub struct QueryCache {
    state: Mutex<CacheState>,
}

impl QueryCache {
    pub fn new(capacity: usize) -> Self {
        QueryCache {
            state: Mutex::new(CacheState {
                capacity: capacity.max(1),
                values: HashMap::new(),
                order: VecDeque::new(),
                pending: HashMap::new(),
            }),
        }
    }

    /// Returns the cached value for `key`, computing it with `compute` on a
    /// cache miss. If another caller is already computing the same key,
    /// blocks until that computation publishes its result instead of
    /// recomputing (§4.6 "Insertion is at-most-once per key per lifetime of
    /// the cache").
    pub fn get_or_compute(
        &self,
        key: CacheKey,
        compute: impl FnOnce() -> Result<EvalResult, ExecutorError>,
    ) -> Result<EvalResult, ExecutorError> {
        let pending = {
            let mut state = self.state.lock();
            if let Some(hit) = state.values.get(&key).cloned() {
                state.touch(&key);
                return Ok(hit);
            }
            if let Some(cell) = state.pending.get(&key) {
                Arc::clone(cell)
            } else {
                let cell: PendingCell = Arc::new((Mutex::new(None), Condvar::new()));
                state.pending.insert(key.clone(), Arc::clone(&cell));
                drop(state);
                return self.compute_and_publish(key, cell, compute);
            }
        };

        let (lock, condvar) = &*pending;
        let mut guard = lock.lock();
        while guard.is_none() {
            condvar.wait(&mut guard);
        }
        guard.clone().expect("woken waiter always finds a published result")
    }

    fn compute_and_publish(
        &self,
        key: CacheKey,
        cell: PendingCell,
        compute: impl FnOnce() -> Result<EvalResult, ExecutorError>,
    ) -> Result<EvalResult, ExecutorError> {
        let result = compute();

        {
            let mut state = self.state.lock();
            state.pending.remove(&key);
            if let Ok(value) = &result {
                state.insert(key, value.clone());
            }
        }

        let (lock, condvar) = &*cell;
        *lock.lock() = Some(result.clone());
        condvar.notify_all();
        result
    }

    pub fn len(&self) -> usize {
        self.state.lock().values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.values.clear();
        state.order.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn key(fp: u64) -> CacheKey {
        CacheKey { fingerprint: fp, executor_mode: ExecutorMode::Sequential, fainder_mode: FainderMode::Exact }
    }

    #[test]
    fn miss_then_hit_does_not_recompute() {
        let cache = QueryCache::new(10);
        let calls = AtomicUsize::new(0);
        let compute = || {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(EvalResult::default())
        };
        cache.get_or_compute(key(1), compute).unwrap();
        cache.get_or_compute(key(1), || {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(EvalResult::default())
        })
        .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn eviction_drops_the_least_recently_used_entry() {
        let cache = QueryCache::new(2);
        cache.get_or_compute(key(1), || Ok(EvalResult::default())).unwrap();
        cache.get_or_compute(key(2), || Ok(EvalResult::default())).unwrap();
        cache.get_or_compute(key(3), || Ok(EvalResult::default())).unwrap();
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn a_failed_computation_is_not_cached() {
        let cache = QueryCache::new(10);
        let _ = cache.get_or_compute(key(1), || Err(ExecutorError::Cancelled));
        assert!(cache.is_empty());
    }

    #[test]
    fn concurrent_callers_for_the_same_key_share_one_computation() {
        use std::thread;

        let cache = Arc::new(QueryCache::new(10));
        let calls = Arc::new(AtomicUsize::new(0));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = Arc::clone(&cache);
            let calls = Arc::clone(&calls);
            handles.push(thread::spawn(move || {
                cache
                    .get_or_compute(key(42), || {
                        calls.fetch_add(1, Ordering::SeqCst);
                        thread::sleep(std::time::Duration::from_millis(20));
                        Ok(EvalResult::default())
                    })
                    .unwrap();
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}

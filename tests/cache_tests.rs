//! Query cache integration tests (§4.6): exercised through the public
//! `QueryCache` API with keys that vary by executor/fainder mode, the way
//! `Engine::execute` actually constructs them.

use fainder_query::cache::{CacheKey, QueryCache};
use fainder_query::evaluators::FainderMode;
use fainder_query::executor::{EvalResult, ExecutorError, ExecutorMode};

fn key(fp: u64, mode: ExecutorMode, fainder_mode: FainderMode) -> CacheKey {
    CacheKey { fingerprint: fp, executor_mode: mode, fainder_mode }
}

#[test]
fn the_same_fingerprint_under_different_executor_modes_is_a_different_key() {
    let cache = QueryCache::new(10);
    cache
        .get_or_compute(key(1, ExecutorMode::Sequential, FainderMode::Exact), || Ok(EvalResult::default()))
        .unwrap();
    cache
        .get_or_compute(key(1, ExecutorMode::Threaded, FainderMode::Exact), || Ok(EvalResult::default()))
        .unwrap();
    assert_eq!(cache.len(), 2, "mode is part of the cache key, not just the fingerprint");
}

#[test]
fn the_same_fingerprint_under_different_fainder_modes_is_a_different_key() {
    let cache = QueryCache::new(10);
    cache
        .get_or_compute(key(1, ExecutorMode::Prefilter, FainderMode::LowMemory), || Ok(EvalResult::default()))
        .unwrap();
    cache
        .get_or_compute(key(1, ExecutorMode::Prefilter, FainderMode::FullRecall), || Ok(EvalResult::default()))
        .unwrap();
    assert_eq!(cache.len(), 2);
}

#[test]
fn reading_an_entry_protects_it_from_eviction_ahead_of_a_colder_one() {
    let cache = QueryCache::new(2);
    let a = key(1, ExecutorMode::Sequential, FainderMode::Exact);
    let b = key(2, ExecutorMode::Sequential, FainderMode::Exact);
    let c = key(3, ExecutorMode::Sequential, FainderMode::Exact);

    cache.get_or_compute(a.clone(), || Ok(EvalResult::default())).unwrap();
    cache.get_or_compute(b, || Ok(EvalResult::default())).unwrap();
    // Touch `a` again so `b`, not `a`, is now the least-recently-used entry.
    cache.get_or_compute(a.clone(), || panic!("should be a hit, not recomputed")).unwrap();
    cache.get_or_compute(c.clone(), || Ok(EvalResult::default())).unwrap();

    assert_eq!(cache.len(), 2);
    // `a` survives, `c` was just inserted; `b` was the one evicted.
    cache.get_or_compute(a, || panic!("a should still be cached")).unwrap();
    cache.get_or_compute(c, || panic!("c should still be cached")).unwrap();
}

#[test]
fn clear_empties_the_cache_but_leaves_it_usable() {
    let cache = QueryCache::new(10);
    let a = key(1, ExecutorMode::Sequential, FainderMode::Exact);
    cache.get_or_compute(a.clone(), || Ok(EvalResult::default())).unwrap();
    cache.clear();
    assert!(cache.is_empty());

    let mut recomputed = false;
    cache
        .get_or_compute(a, || {
            recomputed = true;
            Ok(EvalResult::default())
        })
        .unwrap();
    assert!(recomputed, "a cleared cache must recompute on the next request");
}

#[test]
fn a_cancelled_computation_is_not_cached_and_is_retried_later() {
    let cache = QueryCache::new(10);
    let a = key(1, ExecutorMode::Sequential, FainderMode::Exact);
    let err = cache.get_or_compute(a.clone(), || Err(ExecutorError::Cancelled)).unwrap_err();
    assert!(matches!(err, ExecutorError::Cancelled));
    assert!(cache.is_empty());

    cache.get_or_compute(a, || Ok(EvalResult::default())).unwrap();
    assert_eq!(cache.len(), 1);
}

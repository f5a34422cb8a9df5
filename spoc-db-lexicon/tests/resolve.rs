//! Batch term resolution through the cache.

use spoc_db_core::TermId;
use spoc_db_lexicon::{
    LexiconError, MemoryTermSource, Result, TermCache, TermCacheConfig, TermResolver, TermSource,
    TermValue,
};
use std::sync::Arc;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("spoc_db_lexicon=debug")
        .with_test_writer()
        .try_init();
}

/// Ids 1..=n, odd ones literals
fn make_source(n: u64) -> MemoryTermSource {
    let source = MemoryTermSource::new();
    for i in 1..=n {
        let value = if i % 2 == 1 {
            TermValue::literal(format!("v{}", i))
        } else {
            TermValue::uri(format!("http://example.org/{}", i))
        };
        source.insert(TermId(i), value);
    }
    source
}

/// Fails every chunk that contains one of its poisoned ids
struct FailingSource {
    inner: MemoryTermSource,
    poisoned: Vec<TermId>,
}

impl TermSource for FailingSource {
    fn resolve_chunk(&self, ids: &[TermId]) -> Result<Vec<(TermId, TermValue)>> {
        if let Some(bad) = ids.iter().find(|id| self.poisoned.contains(id)) {
            return Err(LexiconError::resolve(format!("cannot read {}", bad)));
        }
        self.inner.resolve_chunk(ids)
    }
}

#[test]
fn unknown_ids_are_omitted() {
    init_tracing();
    let source = make_source(10);
    let resolver = TermResolver::new(Arc::new(TermCache::new(16)), 100);
    let got = resolver
        .resolve(&[TermId(2), TermId(42), TermId(3), TermId(2), TermId::NULL], &source)
        .unwrap();
    assert_eq!(got.len(), 2);
    assert_eq!(got[&TermId(3)].as_ref(), &TermValue::literal("v3"));
    assert!(!got.contains_key(&TermId(42)));
    assert_eq!(source.calls(), 1);
}

#[test]
fn cached_ids_skip_the_source() {
    let source = make_source(10);
    let resolver = TermResolver::new(Arc::new(TermCache::new(16)), 100);
    let first = resolver.resolve(&[TermId(4), TermId(5)], &source).unwrap();
    assert_eq!(source.calls(), 1);

    let second = resolver.resolve(&[TermId(5), TermId(4)], &source).unwrap();
    assert_eq!(source.calls(), 1);
    assert!(Arc::ptr_eq(&first[&TermId(4)], &second[&TermId(4)]));
}

#[test]
fn large_batches_resolve_in_parallel_chunks() {
    init_tracing();
    let source = make_source(10_000);
    let resolver = TermResolver::new(Arc::new(TermCache::new(0)), 512);
    let ids: Vec<TermId> = (1..=10_000u64).rev().map(TermId).collect();
    let got = resolver.resolve(&ids, &source).unwrap();
    assert_eq!(got.len(), 10_000);
    assert_eq!(source.calls(), (10_000 + 511) / 512);
    assert_eq!(
        got[&TermId(10_000)].as_ref(),
        &TermValue::uri("http://example.org/10000")
    );
}

#[test]
fn chunk_failures_are_aggregated() {
    let source = FailingSource {
        inner: make_source(100),
        poisoned: vec![TermId(5), TermId(95)],
    };
    let resolver = TermResolver::new(Arc::new(TermCache::new(100)), 10);
    let ids: Vec<TermId> = (1..=100u64).map(TermId).collect();
    let err = resolver.resolve(&ids, &source).unwrap_err();
    match err {
        LexiconError::Aggregate(errors) => {
            assert_eq!(errors.len(), 2);
            assert!(errors.iter().all(|e| matches!(e, LexiconError::Resolve(_))));
        }
        other => panic!("expected aggregate, got {other}"),
    }
    // chunks that succeeded were cached
    assert!(resolver.cache().contains(TermId(50)));
    assert!(!resolver.cache().contains(TermId(5)));
}

#[test]
fn single_failure_is_not_wrapped() {
    let source = FailingSource {
        inner: make_source(10),
        poisoned: vec![TermId(1)],
    };
    let resolver = TermResolver::new(Arc::new(TermCache::new(0)), 100);
    let err = resolver.resolve(&[TermId(1), TermId(2)], &source).unwrap_err();
    assert!(matches!(err, LexiconError::Resolve(_)));
}

#[test]
fn weak_cache_forgets_dropped_results() {
    let source = make_source(4);
    let resolver = TermResolver::from_config(&TermCacheConfig::weak_only());
    let got = resolver.resolve(&[TermId(1), TermId(2)], &source).unwrap();
    assert!(resolver.cache().contains(TermId(1)));
    drop(got);
    assert!(resolver.cache().get(TermId(1)).is_none());

    resolver.resolve(&[TermId(1)], &source).unwrap();
    assert_eq!(source.calls(), 2);
}

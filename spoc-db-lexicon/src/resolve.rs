//! Batch resolution of term identifiers to values
//!
//! Identifiers already in the [`TermCache`] are served from it. The rest are
//! sorted, deduplicated and handed to a [`TermSource`] in chunks; when there
//! is more than one chunk they are resolved in parallel on the rayon pool.
//! Identifiers the source does not know are omitted from the result.

use crate::cache::TermCache;
use crate::config::TermCacheConfig;
use crate::error::{LexiconError, Result};
use crate::term::{Iv, TermValue};
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHasher};
use spoc_db_core::TermId;
use std::hash::BuildHasherDefault;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Reverse dictionary: identifier to value
pub trait TermSource: Send + Sync {
    /// Values for `ids`, which are ascending and distinct. Unknown ids are
    /// left out.
    fn resolve_chunk(&self, ids: &[TermId]) -> Result<Vec<(TermId, TermValue)>>;
}

/// Resolves identifier batches through a shared cache
pub struct TermResolver {
    cache: Arc<TermCache>,
    chunk_size: usize,
}

impl TermResolver {
    pub fn new(cache: Arc<TermCache>, chunk_size: usize) -> Self {
        Self {
            cache,
            chunk_size: chunk_size.max(1),
        }
    }

    /// Resolver with its own cache, sized from `config`
    pub fn from_config(config: &TermCacheConfig) -> Self {
        Self::new(
            Arc::new(TermCache::from_config(config)),
            config.resolve_chunk_size,
        )
    }

    pub fn cache(&self) -> &Arc<TermCache> {
        &self.cache
    }

    /// Resolve `ids` to values.
    ///
    /// Resolved values are cached. If any chunk fails, every failure is
    /// returned together; values from the chunks that succeeded stay cached.
    pub fn resolve(
        &self,
        ids: &[TermId],
        source: &dyn TermSource,
    ) -> Result<FxHashMap<TermId, Arc<TermValue>>> {
        let span = tracing::info_span!("resolve_terms", requested = ids.len());
        let _guard = span.enter();

        let mut out: FxHashMap<TermId, Arc<TermValue>> = FxHashMap::default();
        let mut misses = Vec::new();
        for &id in ids {
            if id.is_null() || out.contains_key(&id) {
                continue;
            }
            match self.cache.get(id) {
                Some(value) => {
                    out.insert(id, value);
                }
                None => misses.push(id),
            }
        }
        misses.sort_unstable();
        misses.dedup();
        let cached = out.len();
        if misses.is_empty() {
            tracing::debug!(cached, "all terms cached");
            return Ok(out);
        }

        let resolved: DashMap<TermId, Arc<TermValue>, BuildHasherDefault<FxHasher>> =
            DashMap::with_capacity_and_hasher(misses.len(), Default::default());
        let errors: Mutex<Vec<LexiconError>> = Mutex::new(Vec::new());

        let run = |chunk: &[TermId]| match source.resolve_chunk(chunk) {
            Ok(values) => {
                for (id, value) in values {
                    let value = self.cache.put_if_absent(&Iv::new(id), Arc::new(value));
                    resolved.insert(id, value);
                }
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    first = ?chunk.first(),
                    len = chunk.len(),
                    "term chunk failed"
                );
                errors.lock().push(e);
            }
        };

        if misses.len() <= self.chunk_size {
            run(&misses);
        } else {
            tracing::debug!(
                misses = misses.len(),
                chunk_size = self.chunk_size,
                "resolving in parallel"
            );
            misses.par_chunks(self.chunk_size).for_each(&run);
        }

        let errors = errors.into_inner();
        if !errors.is_empty() {
            return Err(LexiconError::aggregate(errors));
        }

        for id in misses.iter().filter(|id| !resolved.contains_key(*id)) {
            tracing::debug!(term = %id, "unknown term omitted");
        }
        let found = resolved.len();
        out.extend(resolved);
        tracing::debug!(cached, resolved = found, missing = misses.len() - found, "terms resolved");
        Ok(out)
    }
}

/// In-memory [`TermSource`]
#[derive(Default)]
pub struct MemoryTermSource {
    terms: RwLock<FxHashMap<TermId, TermValue>>,
    calls: AtomicUsize,
}

impl MemoryTermSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, id: TermId, value: TermValue) {
        self.terms.write().insert(id, value);
    }

    /// Number of chunks served so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

impl TermSource for MemoryTermSource {
    fn resolve_chunk(&self, ids: &[TermId]) -> Result<Vec<(TermId, TermValue)>> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        let terms = self.terms.read();
        Ok(ids
            .iter()
            .filter_map(|id| terms.get(id).map(|v| (*id, v.clone())))
            .collect())
    }
}

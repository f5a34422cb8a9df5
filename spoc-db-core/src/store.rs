//! Statement index collaborator
//!
//! [`StatementIndex`] is the boundary to the sorted-index storage engine: ranged
//! scans per key order, fast range counts, batched presence checks, and
//! distinct term scans. Everything above this layer (backward chainers,
//! prefetching readers) is written against the trait.
//!
//! [`MemoryStore`] keeps one sorted map of encoded keys per key order. It backs
//! tests and serves as the private scratch index of the sameAs chainers.

use crate::error::{Error, Result};
use crate::ids::TermId;
use crate::iter::{BoxedIterator, ChunkedArrayIterator, DEFAULT_CHUNK_SIZE};
use crate::key_order::KeyOrder;
use crate::spo::{Spo, SpoField, SpoPattern, StatementType};
use parking_lot::RwLock;
use rustc_hash::FxHashSet;
use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Arc;

/// Storage primitives consumed by the iteration and entailment layers
pub trait StatementIndex: Send + Sync {
    /// True if statements carry a context (quad mode)
    fn quads(&self) -> bool;

    /// Ranged scan of the statements matching `pattern`, in `order`.
    ///
    /// Only the leading bound fields of `pattern` under `order` narrow the key
    /// range; remaining bound fields are filtered.
    fn scan(&self, order: KeyOrder, pattern: &SpoPattern) -> Result<BoxedIterator>;

    /// Fast upper bound on the number of statements matching `pattern`
    fn range_count(&self, order: KeyOrder, pattern: &SpoPattern) -> Result<u64>;

    /// The candidates that are not present in the index, in input order
    fn filter_absent(&self, order: KeyOrder, candidates: &[Spo]) -> Result<Vec<Spo>>;

    /// Ascending, distinct ids appearing in `field` position
    fn distinct_terms(&self, field: SpoField) -> Result<Box<dyn Iterator<Item = TermId> + Send>>;

    /// True if `id` names a literal (never a resource)
    fn is_literal(&self, id: TermId) -> bool;
}

impl<T: StatementIndex + ?Sized> StatementIndex for Arc<T> {
    fn quads(&self) -> bool {
        (**self).quads()
    }

    fn scan(&self, order: KeyOrder, pattern: &SpoPattern) -> Result<BoxedIterator> {
        (**self).scan(order, pattern)
    }

    fn range_count(&self, order: KeyOrder, pattern: &SpoPattern) -> Result<u64> {
        (**self).range_count(order, pattern)
    }

    fn filter_absent(&self, order: KeyOrder, candidates: &[Spo]) -> Result<Vec<Spo>> {
        (**self).filter_absent(order, candidates)
    }

    fn distinct_terms(&self, field: SpoField) -> Result<Box<dyn Iterator<Item = TermId> + Send>> {
        (**self).distinct_terms(field)
    }

    fn is_literal(&self, id: TermId) -> bool {
        (**self).is_literal(id)
    }
}

// ============================================================================
// MemoryStore
// ============================================================================

struct Inner {
    /// One sorted index per key order of the store's mode, by order index
    indices: BTreeMap<KeyOrder, BTreeMap<Vec<u8>, StatementType>>,
    literals: FxHashSet<TermId>,
}

/// In-memory statement index
pub struct MemoryStore {
    quads: bool,
    chunk_size: usize,
    inner: RwLock<Inner>,
}

impl MemoryStore {
    /// Triple-mode store
    pub fn new() -> Self {
        Self::with_mode(false)
    }

    /// Quad-mode store
    pub fn new_quads() -> Self {
        Self::with_mode(true)
    }

    pub fn with_mode(quads: bool) -> Self {
        let orders = if quads {
            KeyOrder::quad_orders()
        } else {
            KeyOrder::triple_orders()
        };
        Self {
            quads,
            chunk_size: DEFAULT_CHUNK_SIZE,
            inner: RwLock::new(Inner {
                indices: orders.iter().map(|k| (*k, BTreeMap::new())).collect(),
                literals: FxHashSet::default(),
            }),
        }
    }

    /// Chunk size of the scans this store hands out
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    fn primary(&self) -> KeyOrder {
        KeyOrder::primary(self.quads)
    }

    fn check_order(&self, order: KeyOrder) -> Result<()> {
        if order.is_quad() != self.quads {
            return Err(Error::invalid_key_order(format!(
                "{} not available in {} mode",
                order,
                if self.quads { "quad" } else { "triple" }
            )));
        }
        Ok(())
    }

    /// Insert a statement. An existing statement keeps the stronger of the
    /// two provenance tags. Returns true if the statement was new.
    pub fn insert(&self, spo: Spo) -> bool {
        let mut inner = self.inner.write();
        let mut added = false;
        for (order, index) in inner.indices.iter_mut() {
            let key = order.encode_key(&spo);
            match index.get_mut(&key) {
                Some(existing) => *existing = (*existing).max(spo.stmt_type),
                None => {
                    index.insert(key, spo.stmt_type);
                    added = true;
                }
            }
        }
        added
    }

    /// Insert many statements; returns how many were new
    pub fn insert_all(&self, spos: impl IntoIterator<Item = Spo>) -> usize {
        spos.into_iter().filter(|spo| self.insert(*spo)).count()
    }

    /// Remove a statement; returns true if it was present
    pub fn remove(&self, spo: &Spo) -> bool {
        let mut inner = self.inner.write();
        let mut removed = false;
        for (order, index) in inner.indices.iter_mut() {
            removed |= index.remove(&order.encode_key(spo)).is_some();
        }
        removed
    }

    /// Mark a term as a literal
    pub fn mark_literal(&self, id: TermId) {
        self.inner.write().literals.insert(id);
    }

    /// Stored provenance of a statement, if present
    pub fn get(&self, spo: &Spo) -> Option<StatementType> {
        let order = self.primary();
        self.inner
            .read()
            .indices
            .get(&order)
            .and_then(|index| index.get(&order.encode_key(spo)).copied())
    }

    pub fn contains(&self, spo: &Spo) -> bool {
        self.get(spo).is_some()
    }

    /// Number of statements
    pub fn len(&self) -> usize {
        let order = self.primary();
        self.inner.read().indices.get(&order).map_or(0, |i| i.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Matching statements in `order`
    fn collect(&self, order: KeyOrder, pattern: &SpoPattern) -> Result<Vec<Spo>> {
        self.check_order(order)?;
        let from = order.from_key(pattern);
        let upper = match order.to_key(pattern) {
            Some(to) => Bound::Excluded(to),
            None => Bound::Unbounded,
        };
        let inner = self.inner.read();
        let Some(index) = inner.indices.get(&order) else {
            return Ok(Vec::new());
        };
        let mut out = Vec::new();
        for (key, stmt_type) in index.range((Bound::Included(from), upper)) {
            let spo = order.decode_key(key)?.with_type(*stmt_type);
            if pattern.matches(&spo) {
                out.push(spo);
            }
        }
        Ok(out)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StatementIndex for MemoryStore {
    fn quads(&self) -> bool {
        self.quads
    }

    fn scan(&self, order: KeyOrder, pattern: &SpoPattern) -> Result<BoxedIterator> {
        let items = self.collect(order, pattern)?;
        tracing::trace!(%order, %pattern, n = items.len(), "memory scan");
        Ok(Box::new(ChunkedArrayIterator::with_chunk_size(
            items,
            Some(order),
            self.chunk_size,
        )))
    }

    fn range_count(&self, order: KeyOrder, pattern: &SpoPattern) -> Result<u64> {
        Ok(self.collect(order, pattern)?.len() as u64)
    }

    fn filter_absent(&self, order: KeyOrder, candidates: &[Spo]) -> Result<Vec<Spo>> {
        self.check_order(order)?;
        let inner = self.inner.read();
        let Some(index) = inner.indices.get(&order) else {
            return Ok(candidates.to_vec());
        };
        Ok(candidates
            .iter()
            .filter(|spo| !index.contains_key(&order.encode_key(spo)))
            .copied()
            .collect())
    }

    fn distinct_terms(&self, field: SpoField) -> Result<Box<dyn Iterator<Item = TermId> + Send>> {
        let order = self
            .inner
            .read()
            .indices
            .keys()
            .copied()
            .find(|k| k.fields()[0] == field)
            .ok_or_else(|| {
                Error::invalid_argument(format!("no index leads with field {}", field))
            })?;
        let mut ids: Vec<TermId> = self
            .collect(order, &SpoPattern::any())?
            .iter()
            .map(|spo| spo.get(field))
            .collect();
        ids.dedup();
        Ok(Box::new(ids.into_iter()))
    }

    fn is_literal(&self, id: TermId) -> bool {
        self.inner.read().literals.contains(&id)
    }
}

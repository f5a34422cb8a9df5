//! Batch assignment of identifiers to term values
//!
//! [`TermWriter::write_terms`] sorts and deduplicates the incoming values,
//! splits them into chunks and runs the chunks on the rayon pool. A value
//! already in the [`TermDictionary`] keeps its identifier. A new value gets
//! one minted from the writer's partition counter and scattered with a
//! [`TermIdEncoder`]. Failed chunks are reported together.
//!
//! A read-only writer never mints: values the dictionary does not know map
//! to [`TermId::NULL`] and are counted as unknown.

use crate::config::TermWriterConfig;
use crate::error::{LexiconError, Result};
use crate::resolve::TermSource;
use crate::term::TermValue;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHasher};
use spoc_db_core::{TermId, TermIdEncoder};
use std::hash::BuildHasherDefault;
use std::sync::atomic::{AtomicU32, Ordering};

type FxBuildHasher = BuildHasherDefault<FxHasher>;

/// Forward dictionary: value to identifier
pub trait TermDictionary: Send + Sync {
    /// Identifier already assigned to `value`
    fn lookup(&self, value: &TermValue) -> Result<Option<TermId>>;

    /// Record `id` for `value` unless another writer got there first.
    /// Returns the identifier that ends up assigned.
    fn assign(&self, value: &TermValue, id: TermId) -> Result<TermId>;
}

/// Result of one [`TermWriter::write_terms`] call
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TermWriteOutcome {
    /// One identifier per input value, in input order; `NULL` when unknown
    pub ids: Vec<TermId>,
    /// Distinct values in the batch
    pub distinct: usize,
    /// Identifiers minted and kept by this call
    pub minted: usize,
    /// Distinct values a read-only writer could not resolve
    pub unknown: usize,
}

struct ChunkIds {
    ids: Vec<TermId>,
    minted: usize,
    unknown: usize,
}

/// Assigns identifiers to term values for one dictionary partition
pub struct TermWriter {
    partition: u32,
    /// Last local counter handed out; 0 before the first
    counter: AtomicU32,
    encoder: TermIdEncoder,
    chunk_size: usize,
    store_blank_nodes: bool,
    read_only: bool,
}

impl TermWriter {
    pub fn new(partition: u32, encoder: TermIdEncoder, chunk_size: usize) -> Self {
        Self {
            partition,
            counter: AtomicU32::new(0),
            encoder,
            chunk_size: chunk_size.max(1),
            store_blank_nodes: false,
            read_only: false,
        }
    }

    pub fn from_config(config: &TermWriterConfig) -> Result<Self> {
        let encoder = TermIdEncoder::new(config.term_id_bits_to_reverse)?;
        Ok(Self::new(config.partition, encoder, config.write_chunk_size)
            .with_store_blank_nodes(config.store_blank_nodes))
    }

    /// Resume minting after local counter `last`
    pub fn with_counter(self, last: u32) -> Self {
        self.counter.store(last, Ordering::SeqCst);
        self
    }

    pub fn with_store_blank_nodes(mut self, store: bool) -> Self {
        self.store_blank_nodes = store;
        self
    }

    /// Look terms up without minting
    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn partition(&self) -> u32 {
        self.partition
    }

    /// Last local counter handed out
    pub fn counter(&self) -> u32 {
        self.counter.load(Ordering::SeqCst)
    }

    pub fn encoder(&self) -> &TermIdEncoder {
        &self.encoder
    }

    /// Identifiers for `terms`, minting the ones `dict` does not know.
    ///
    /// If any chunk fails, every failure is returned together. Identifiers
    /// assigned by the chunks that succeeded stay in `dict`.
    pub fn write_terms(
        &self,
        terms: &[TermValue],
        dict: &dyn TermDictionary,
    ) -> Result<TermWriteOutcome> {
        let span = tracing::info_span!(
            "write_terms",
            requested = terms.len(),
            partition = self.partition,
            read_only = self.read_only
        );
        let _guard = span.enter();

        let mut distinct: Vec<&TermValue> = terms.iter().collect();
        distinct.sort_unstable();
        distinct.dedup();
        if distinct.is_empty() {
            return Ok(TermWriteOutcome::default());
        }

        let results: Vec<Result<ChunkIds>> = if distinct.len() <= self.chunk_size {
            vec![self.write_chunk(&distinct, dict)]
        } else {
            tracing::debug!(
                distinct = distinct.len(),
                chunk_size = self.chunk_size,
                "writing in parallel"
            );
            distinct
                .par_chunks(self.chunk_size)
                .map(|chunk| self.write_chunk(chunk, dict))
                .collect()
        };

        let mut assigned: FxHashMap<&TermValue, TermId> = FxHashMap::default();
        let mut errors = Vec::new();
        let (mut minted, mut unknown) = (0, 0);
        for (chunk, result) in distinct.chunks(self.chunk_size).zip(results) {
            match result {
                Ok(done) => {
                    minted += done.minted;
                    unknown += done.unknown;
                    assigned.extend(chunk.iter().copied().zip(done.ids));
                }
                Err(e) => {
                    tracing::warn!(error = %e, len = chunk.len(), "term write chunk failed");
                    errors.push(e);
                }
            }
        }
        if !errors.is_empty() {
            return Err(LexiconError::aggregate(errors));
        }

        let ids = terms
            .iter()
            .map(|t| assigned.get(t).copied().unwrap_or(TermId::NULL))
            .collect();
        tracing::debug!(distinct = distinct.len(), minted, unknown, "terms written");
        Ok(TermWriteOutcome {
            ids,
            distinct: distinct.len(),
            minted,
            unknown,
        })
    }

    fn write_chunk(&self, chunk: &[&TermValue], dict: &dyn TermDictionary) -> Result<ChunkIds> {
        let mut out = ChunkIds {
            ids: Vec::with_capacity(chunk.len()),
            minted: 0,
            unknown: 0,
        };
        for &value in chunk {
            // unstored blank nodes are never looked up or recorded
            let transient = value.is_bnode() && !self.store_blank_nodes;
            let known = if transient {
                None
            } else {
                dict.lookup(value)?
            };
            let id = match known {
                Some(id) => id,
                None if self.read_only => {
                    out.unknown += 1;
                    TermId::NULL
                }
                None => {
                    let fresh = self.mint()?;
                    let id = if transient {
                        fresh
                    } else {
                        dict.assign(value, fresh)?
                    };
                    if id == fresh {
                        out.minted += 1;
                    }
                    id
                }
            };
            out.ids.push(id);
        }
        Ok(out)
    }

    fn mint(&self) -> Result<TermId> {
        let last = self
            .counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |c| c.checked_add(1))
            .map_err(|_| {
                LexiconError::write(format!("partition {} counter exhausted", self.partition))
            })?;
        let raw = TermId::combine(self.partition, last + 1);
        Ok(TermId(self.encoder.encode(raw.as_u64())?))
    }
}

/// In-memory [`TermDictionary`], readable back as a [`TermSource`]
#[derive(Default)]
pub struct MemoryTermDictionary {
    forward: DashMap<TermValue, TermId, FxBuildHasher>,
    reverse: DashMap<TermId, TermValue, FxBuildHasher>,
}

impl MemoryTermDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    pub fn contains(&self, value: &TermValue) -> bool {
        self.forward.contains_key(value)
    }
}

impl TermDictionary for MemoryTermDictionary {
    fn lookup(&self, value: &TermValue) -> Result<Option<TermId>> {
        Ok(self.forward.get(value).map(|id| *id))
    }

    fn assign(&self, value: &TermValue, id: TermId) -> Result<TermId> {
        match self.forward.entry(value.clone()) {
            Entry::Occupied(existing) => Ok(*existing.get()),
            Entry::Vacant(vacant) => {
                vacant.insert(id);
                self.reverse.insert(id, value.clone());
                Ok(id)
            }
        }
    }
}

impl TermSource for MemoryTermDictionary {
    fn resolve_chunk(&self, ids: &[TermId]) -> Result<Vec<(TermId, TermValue)>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.reverse.get(id).map(|v| (*id, v.clone())))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_writer(bits: u32) -> TermWriter {
        TermWriter::new(0, TermIdEncoder::new(bits).unwrap(), 100)
    }

    #[test]
    fn counter_starts_after_null() {
        let writer = make_writer(0);
        assert_eq!(writer.mint().unwrap(), TermId(1));
        assert_eq!(writer.mint().unwrap(), TermId(2));
        assert_eq!(writer.counter(), 2);
    }

    #[test]
    fn partition_lands_in_high_word() {
        let writer = TermWriter::new(5, TermIdEncoder::new(0).unwrap(), 10).with_counter(41);
        let id = writer.mint().unwrap();
        assert_eq!(id.partition_id(), 5);
        assert_eq!(id.local_counter(), 42);
    }

    #[test]
    fn exhausted_counter_is_an_error() {
        let writer = make_writer(0).with_counter(u32::MAX);
        assert!(matches!(writer.mint(), Err(LexiconError::Write(_))));
        assert_eq!(writer.counter(), u32::MAX);
    }
}

//! Chunked ordered iteration over statement tuples
//!
//! Every statement-producing component (raw index scans, backward chainers,
//! prefetching readers) implements [`ChunkedOrderedIterator`]. Tuples are
//! delivered in dense chunks; a stream declares its native [`KeyOrder`] or
//! `None` when chunks arrive in different orders.
//!
//! ## Chunk boundaries
//!
//! A single chunk never mixes tuples whose declared key orders differ. A
//! stream that switches from a raw scan to synthesizing tuples in another
//! order starts a new chunk at the switch. Consumers that need a uniform order
//! call [`next_chunk_in`](ChunkedOrderedIterator::next_chunk_in).
//!
//! ## Lifecycle
//!
//! `close()` is idempotent and propagates to wrapped sources. Pulling from a
//! closed stream is an `IllegalState` error; `has_next()` on a closed stream
//! is simply `false`.

pub mod buffered;
pub mod merge;
pub mod pushback;

pub use buffered::{AsyncBufferedIterator, BufferConfig};
pub use merge::MergedOrderedIterator;
pub use pushback::PushbackIterator;

use crate::error::{Error, Result};
use crate::key_order::KeyOrder;
use crate::spo::{Spo, SpoField};
use std::collections::VecDeque;

/// Default number of tuples per chunk
pub const DEFAULT_CHUNK_SIZE: usize = 10_000;

/// Streaming contract for statement producers
pub trait ChunkedOrderedIterator: Send {
    /// True if another tuple is available. Never errors on a closed stream.
    fn has_next(&mut self) -> Result<bool>;

    /// Next tuple, or `None` when exhausted
    fn next(&mut self) -> Result<Option<Spo>>;

    /// Next dense chunk. Empty only when the stream is exhausted.
    fn next_chunk(&mut self) -> Result<Vec<Spo>>;

    /// Next chunk sorted under `order`.
    ///
    /// Streams whose chunks can differ in order override this to consult the
    /// order of the chunk actually produced.
    fn next_chunk_in(&mut self, order: KeyOrder) -> Result<Vec<Spo>> {
        let mut chunk = self.next_chunk()?;
        if self.key_order() != Some(order) {
            order.sort(&mut chunk);
        }
        Ok(chunk)
    }

    /// Native order of the stream, `None` if unordered
    fn key_order(&self) -> Option<KeyOrder>;

    /// Release resources. Idempotent.
    fn close(&mut self);
}

/// Boxed iterator for dynamic dispatch
pub type BoxedIterator = Box<dyn ChunkedOrderedIterator>;

impl<I: ChunkedOrderedIterator + ?Sized> ChunkedOrderedIterator for Box<I> {
    fn has_next(&mut self) -> Result<bool> {
        (**self).has_next()
    }

    fn next(&mut self) -> Result<Option<Spo>> {
        (**self).next()
    }

    fn next_chunk(&mut self) -> Result<Vec<Spo>> {
        (**self).next_chunk()
    }

    fn next_chunk_in(&mut self, order: KeyOrder) -> Result<Vec<Spo>> {
        (**self).next_chunk_in(order)
    }

    fn key_order(&self) -> Option<KeyOrder> {
        (**self).key_order()
    }

    fn close(&mut self) {
        (**self).close()
    }
}

/// Lifecycle of a stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterState {
    /// Producing tuples
    Open,
    /// Source drained; further pulls return nothing
    Exhausted,
    /// `close()` was called
    Closed,
}

impl IterState {
    pub fn is_closed(&self) -> bool {
        matches!(self, IterState::Closed)
    }

    /// Error for a pull against a closed stream
    pub fn check_open(&self, what: &str) -> Result<()> {
        if self.is_closed() {
            Err(Error::illegal_state(format!("{} called on a closed iterator", what)))
        } else {
            Ok(())
        }
    }
}

/// Element-at-a-time view over the current chunk.
///
/// Implementations keep one of these to serve `next()` out of the chunk they
/// last fetched.
#[derive(Debug, Default)]
pub struct ChunkCursor {
    buf: VecDeque<Spo>,
}

impl ChunkCursor {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn has_buffered(&self) -> bool {
        !self.buf.is_empty()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Replace the buffered remainder with a new chunk
    pub fn load(&mut self, chunk: Vec<Spo>) {
        self.buf = chunk.into();
    }

    pub fn pop(&mut self) -> Option<Spo> {
        self.buf.pop_front()
    }

    /// Take the unconsumed remainder of the current chunk
    pub fn take(&mut self) -> Vec<Spo> {
        std::mem::take(&mut self.buf).into()
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }
}

// ============================================================================
// Simple sources
// ============================================================================

/// Stream that produces nothing
#[derive(Debug)]
pub struct EmptyIterator {
    key_order: Option<KeyOrder>,
    state: IterState,
}

impl EmptyIterator {
    pub fn new(key_order: Option<KeyOrder>) -> Self {
        Self {
            key_order,
            state: IterState::Exhausted,
        }
    }
}

impl ChunkedOrderedIterator for EmptyIterator {
    fn has_next(&mut self) -> Result<bool> {
        Ok(false)
    }

    fn next(&mut self) -> Result<Option<Spo>> {
        self.state.check_open("next")?;
        Ok(None)
    }

    fn next_chunk(&mut self) -> Result<Vec<Spo>> {
        self.state.check_open("next_chunk")?;
        Ok(Vec::new())
    }

    fn key_order(&self) -> Option<KeyOrder> {
        self.key_order
    }

    fn close(&mut self) {
        self.state = IterState::Closed;
    }
}

/// Stream over an owned vector of tuples
#[derive(Debug)]
pub struct ChunkedArrayIterator {
    items: Vec<Spo>,
    pos: usize,
    chunk_size: usize,
    key_order: Option<KeyOrder>,
    state: IterState,
}

impl ChunkedArrayIterator {
    /// `key_order` is trusted: the caller asserts `items` is sorted that way.
    pub fn new(items: Vec<Spo>, key_order: Option<KeyOrder>) -> Self {
        Self::with_chunk_size(items, key_order, DEFAULT_CHUNK_SIZE)
    }

    pub fn with_chunk_size(
        items: Vec<Spo>,
        key_order: Option<KeyOrder>,
        chunk_size: usize,
    ) -> Self {
        debug_assert!(
            key_order.map_or(true, |k| k.is_sorted(&items)),
            "items not sorted in declared order"
        );
        Self {
            items,
            pos: 0,
            chunk_size: chunk_size.max(1),
            key_order,
            state: IterState::Open,
        }
    }

    /// Sort `items` under `order` and stream them
    pub fn sorted(mut items: Vec<Spo>, order: KeyOrder) -> Self {
        order.sort(&mut items);
        Self::new(items, Some(order))
    }

    /// Tuples not yet delivered
    pub fn remaining(&self) -> usize {
        self.items.len() - self.pos
    }
}

impl ChunkedOrderedIterator for ChunkedArrayIterator {
    fn has_next(&mut self) -> Result<bool> {
        Ok(!self.state.is_closed() && self.pos < self.items.len())
    }

    fn next(&mut self) -> Result<Option<Spo>> {
        self.state.check_open("next")?;
        let item = self.items.get(self.pos).copied();
        if item.is_some() {
            self.pos += 1;
        } else {
            self.state = IterState::Exhausted;
        }
        Ok(item)
    }

    fn next_chunk(&mut self) -> Result<Vec<Spo>> {
        self.state.check_open("next_chunk")?;
        let end = (self.pos + self.chunk_size).min(self.items.len());
        let chunk = self.items[self.pos..end].to_vec();
        self.pos = end;
        if self.pos == self.items.len() {
            self.state = IterState::Exhausted;
        }
        Ok(chunk)
    }

    fn key_order(&self) -> Option<KeyOrder> {
        self.key_order
    }

    fn close(&mut self) {
        if !self.state.is_closed() {
            self.state = IterState::Closed;
            self.items = Vec::new();
            self.pos = 0;
        }
    }
}

// ============================================================================
// Filter
// ============================================================================

/// Drops tuples rejected by a predicate. Order is preserved.
///
/// Chunks follow the source's chunk boundaries, so a filtered chunk can be
/// smaller than the source chunk; empty filtered chunks are skipped.
pub struct FilteredIterator<I, F> {
    src: I,
    keep: F,
    cursor: ChunkCursor,
    state: IterState,
}

impl<I, F> FilteredIterator<I, F>
where
    I: ChunkedOrderedIterator,
    F: FnMut(&Spo) -> bool + Send,
{
    pub fn new(src: I, keep: F) -> Self {
        Self {
            src,
            keep,
            cursor: ChunkCursor::new(),
            state: IterState::Open,
        }
    }

    fn fetch(&mut self) -> Result<Vec<Spo>> {
        loop {
            let mut chunk = self.src.next_chunk()?;
            if chunk.is_empty() {
                self.state = IterState::Exhausted;
                return Ok(chunk);
            }
            chunk.retain(|spo| (self.keep)(spo));
            if !chunk.is_empty() {
                return Ok(chunk);
            }
        }
    }
}

impl<I, F> ChunkedOrderedIterator for FilteredIterator<I, F>
where
    I: ChunkedOrderedIterator,
    F: FnMut(&Spo) -> bool + Send,
{
    fn has_next(&mut self) -> Result<bool> {
        if self.cursor.has_buffered() {
            return Ok(true);
        }
        if self.state != IterState::Open {
            return Ok(false);
        }
        let chunk = self.fetch()?;
        let any = !chunk.is_empty();
        self.cursor.load(chunk);
        Ok(any)
    }

    fn next(&mut self) -> Result<Option<Spo>> {
        self.state.check_open("next")?;
        if !self.has_next()? {
            return Ok(None);
        }
        Ok(self.cursor.pop())
    }

    fn next_chunk(&mut self) -> Result<Vec<Spo>> {
        self.state.check_open("next_chunk")?;
        if self.cursor.has_buffered() {
            return Ok(self.cursor.take());
        }
        if self.state == IterState::Exhausted {
            return Ok(Vec::new());
        }
        self.fetch()
    }

    fn key_order(&self) -> Option<KeyOrder> {
        self.src.key_order()
    }

    fn close(&mut self) {
        if !self.state.is_closed() {
            self.state = IterState::Closed;
            self.cursor.clear();
            self.src.close();
        }
    }
}

// ============================================================================
// Term projection
// ============================================================================

/// A tuple stream read as a plain iterator of tuples.
///
/// Plain iterators cannot report failure, so a source error ends the
/// iteration and is parked; check [`take_error`](Self::take_error) once
/// it stops.
pub struct TupleStream {
    src: BoxedIterator,
    cursor: ChunkCursor,
    error: Option<Error>,
    done: bool,
}

impl TupleStream {
    pub fn new(src: BoxedIterator) -> Self {
        Self {
            src,
            cursor: ChunkCursor::new(),
            error: None,
            done: false,
        }
    }

    /// Error that ended the stream early, if any
    pub fn take_error(&mut self) -> Option<Error> {
        self.error.take()
    }

    pub fn close(&mut self) {
        self.done = true;
        self.cursor.clear();
        self.src.close();
    }
}

impl Iterator for TupleStream {
    type Item = Spo;

    fn next(&mut self) -> Option<Spo> {
        loop {
            if let Some(spo) = self.cursor.pop() {
                return Some(spo);
            }
            if self.done {
                return None;
            }
            match self.src.next_chunk() {
                Ok(chunk) if chunk.is_empty() => {
                    self.done = true;
                }
                Ok(chunk) => self.cursor.load(chunk),
                Err(e) => {
                    tracing::warn!(error = %e, "tuple stream source failed");
                    self.error = Some(e);
                    self.done = true;
                }
            }
        }
    }
}

/// Projects one field out of a tuple stream as a plain iterator of term ids.
///
/// A source error ends the projection and is parked, as for [`TupleStream`].
pub struct TermProjection {
    inner: TupleStream,
    field: SpoField,
}

impl TermProjection {
    pub fn new(src: BoxedIterator, field: SpoField) -> Self {
        Self {
            inner: TupleStream::new(src),
            field,
        }
    }

    /// Error that ended the projection early, if any
    pub fn take_error(&mut self) -> Option<Error> {
        self.inner.take_error()
    }

    pub fn close(&mut self) {
        self.inner.close();
    }
}

impl Iterator for TermProjection {
    type Item = crate::ids::TermId;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|spo| spo.get(self.field))
    }
}

/// Drain a stream into a vector and close it
pub fn drain<I: ChunkedOrderedIterator + ?Sized>(iter: &mut I) -> Result<Vec<Spo>> {
    let mut out = Vec::new();
    loop {
        let chunk = match iter.next_chunk() {
            Ok(chunk) => chunk,
            Err(e) => {
                iter.close();
                return Err(e);
            }
        };
        if chunk.is_empty() {
            break;
        }
        out.extend(chunk);
    }
    iter.close();
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::TermId;
    use crate::spo::StatementType;

    fn make_spo(s: u64, p: u64, o: u64) -> Spo {
        Spo::triple(TermId(s), TermId(p), TermId(o), StatementType::Explicit)
    }

    fn make_items(n: u64) -> Vec<Spo> {
        (1..=n).map(|i| make_spo(i, 1, 1)).collect()
    }

    #[test]
    fn array_iterator_chunks_are_dense() {
        let mut it = ChunkedArrayIterator::with_chunk_size(make_items(25), Some(KeyOrder::Spo), 10);
        assert_eq!(it.next_chunk().unwrap().len(), 10);
        assert_eq!(it.next_chunk().unwrap().len(), 10);
        assert_eq!(it.next_chunk().unwrap().len(), 5);
        assert!(it.next_chunk().unwrap().is_empty());
        assert!(!it.has_next().unwrap());
    }

    #[test]
    fn array_iterator_mixes_next_and_chunk() {
        let mut it = ChunkedArrayIterator::with_chunk_size(make_items(5), Some(KeyOrder::Spo), 3);
        assert_eq!(it.next().unwrap().unwrap().s, TermId(1));
        let chunk = it.next_chunk().unwrap();
        assert_eq!(chunk.iter().map(|s| s.s.0).collect::<Vec<_>>(), vec![2, 3, 4]);
        assert_eq!(it.next().unwrap().unwrap().s, TermId(5));
        assert_eq!(it.next().unwrap(), None);
    }

    #[test]
    fn close_is_idempotent_and_blocks_pulls() {
        let mut it = ChunkedArrayIterator::new(make_items(3), None);
        it.close();
        it.close();
        assert!(!it.has_next().unwrap());
        assert!(matches!(it.next(), Err(Error::IllegalState(_))));
        assert!(matches!(it.next_chunk(), Err(Error::IllegalState(_))));
    }

    #[test]
    fn next_chunk_in_resorts_when_order_differs() {
        let items = vec![make_spo(1, 9, 3), make_spo(2, 1, 2), make_spo(3, 5, 1)];
        let mut it = ChunkedArrayIterator::new(items, Some(KeyOrder::Spo));
        let chunk = it.next_chunk_in(KeyOrder::Pos).unwrap();
        assert_eq!(chunk.iter().map(|s| s.p.0).collect::<Vec<_>>(), vec![1, 5, 9]);
    }

    #[test]
    fn filter_skips_and_keeps_order() {
        let src = ChunkedArrayIterator::with_chunk_size(make_items(20), Some(KeyOrder::Spo), 4);
        let mut it = FilteredIterator::new(src, |spo: &Spo| spo.s.0 % 5 == 0);
        assert_eq!(it.key_order(), Some(KeyOrder::Spo));
        let all = drain(&mut it).unwrap();
        assert_eq!(all.iter().map(|s| s.s.0).collect::<Vec<_>>(), vec![5, 10, 15, 20]);
    }

    #[test]
    fn term_projection_yields_field() {
        let src: BoxedIterator = Box::new(ChunkedArrayIterator::with_chunk_size(
            make_items(4),
            Some(KeyOrder::Spo),
            3,
        ));
        let mut proj = TermProjection::new(src, SpoField::S);
        let ids: Vec<u64> = proj.by_ref().map(|t| t.0).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
        assert!(proj.take_error().is_none());
    }

    #[test]
    fn tuple_stream_keeps_provenance() {
        let mut items = make_items(3);
        items[1].stmt_type = StatementType::Axiom;
        let src: BoxedIterator = Box::new(ChunkedArrayIterator::with_chunk_size(items, None, 2));
        let mut stream = TupleStream::new(src);
        let tags: Vec<_> = stream.by_ref().map(|spo| (spo.s.0, spo.stmt_type)).collect();
        assert_eq!(
            tags,
            vec![
                (1, StatementType::Explicit),
                (2, StatementType::Axiom),
                (3, StatementType::Explicit)
            ]
        );
        assert!(stream.take_error().is_none());
    }

    #[test]
    fn empty_iterator() {
        let mut it = EmptyIterator::new(Some(KeyOrder::Pos));
        assert!(!it.has_next().unwrap());
        assert!(it.next_chunk().unwrap().is_empty());
        assert_eq!(it.key_order(), Some(KeyOrder::Pos));
    }
}

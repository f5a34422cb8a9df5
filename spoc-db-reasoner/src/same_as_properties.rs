//! Backward chaining of owl:sameAs property copying
//!
//! If `x owl:sameAs y`, every statement about `x` also holds for `y`, in
//! subject and in object position. [`SameAsPropertiesIterator`] reads the
//! scan for an access pattern and then emits the inferred statements that
//! match the same pattern but are not stored.
//!
//! Each base statement `(a p b)` whose subject is equivalent to the pattern's
//! subject (or any subject, if unbound) and whose object is equivalent to the
//! pattern's object (or any object) yields candidates `(s' p o')`:
//! - `s'` is the bound subject, or each member of the class of `a`
//! - `o'` is the bound object, or each member of the class of `b`
//!
//! The base statement itself and `(x owl:sameAs x)` are never candidates.
//! Candidates are checked against the store in batches; the absent ones are
//! collected in a private auxiliary index and emitted after the scan.

use crate::error::Result;
use crate::options::DEFAULT_ENTAILMENT_CHUNK_SIZE;
use crate::same_as::SameAsClosure;
use crate::vocab::Vocabulary;
use spoc_db_core::{
    BoxedIterator, ChunkCursor, ChunkedOrderedIterator, IterState, KeyOrder, MemoryStore, Spo,
    SpoPattern, StatementIndex, StatementType, TermId,
};
use std::fmt;
use std::sync::Arc;

type CoreResult<T> = spoc_db_core::Result<T>;

/// Which of subject and object the access pattern binds
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Shape {
    /// Subject and object bound
    Spo,
    /// Subject bound
    Sp,
    /// Object bound
    Po,
    /// Neither bound
    P,
}

impl Shape {
    pub fn of(pattern: &SpoPattern) -> Self {
        match (pattern.s.is_some(), pattern.o.is_some()) {
            (true, true) => Shape::Spo,
            (true, false) => Shape::Sp,
            (false, true) => Shape::Po,
            (false, false) => Shape::P,
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Shape::Spo => "SPO",
            Shape::Sp => "SP",
            Shape::Po => "PO",
            Shape::P => "P",
        };
        f.write_str(name)
    }
}

enum Phase {
    Source,
    Entailments(BoxedIterator),
    Done,
}

/// Wraps a scan and adds statements copied across owl:sameAs
pub struct SameAsPropertiesIterator {
    src: BoxedIterator,
    src_order: Option<KeyOrder>,
    store: Arc<dyn StatementIndex>,
    pattern: SpoPattern,
    shape: Shape,
    closure: SameAsClosure,
    same_as: TermId,
    /// Index order used for presence checks
    primary: KeyOrder,
    /// Confirmed-absent candidates
    aux: MemoryStore,
    aux_order: KeyOrder,
    pending: Vec<Spo>,
    chunk_size: usize,
    phase: Phase,
    cursor: ChunkCursor,
    chunk_order: Option<KeyOrder>,
    state: IterState,
    inferred: usize,
}

impl SameAsPropertiesIterator {
    pub fn new(
        src: BoxedIterator,
        pattern: &SpoPattern,
        store: Arc<dyn StatementIndex>,
        vocab: Vocabulary,
        chunk_size: usize,
    ) -> Result<Self> {
        vocab.require_same_as()?;
        let quads = store.quads();
        let closure = SameAsClosure::new(Arc::clone(&store), vocab.owl_same_as)?;
        let chunk_size = if chunk_size == 0 {
            DEFAULT_ENTAILMENT_CHUNK_SIZE
        } else {
            chunk_size
        };
        let src_order = src.key_order();
        let primary = KeyOrder::primary(quads);
        let aux_order = src_order.unwrap_or(primary);
        let shape = Shape::of(pattern);

        tracing::debug!(%pattern, %shape, ?src_order, chunk_size, "sameAs property backchainer");
        Ok(Self {
            src,
            src_order,
            store,
            pattern: *pattern,
            shape,
            closure,
            same_as: vocab.owl_same_as,
            primary,
            aux: MemoryStore::with_mode(quads).with_chunk_size(chunk_size),
            aux_order,
            pending: Vec::with_capacity(chunk_size),
            chunk_size,
            phase: Phase::Source,
            cursor: ChunkCursor::new(),
            chunk_order: src_order,
            state: IterState::Open,
            inferred: 0,
        })
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    /// Number of inferred statements confirmed absent so far
    pub fn inferred_count(&self) -> usize {
        self.inferred
    }

    /// The bound term, or the class of the base statement's term
    fn alternatives(&mut self, bound: Option<TermId>, actual: TermId) -> CoreResult<Arc<[TermId]>> {
        match bound {
            Some(t) => Ok(Arc::from(&[t][..])),
            None => self.closure.with_self(actual),
        }
    }

    fn expand(&mut self, base: &Spo) -> CoreResult<()> {
        let subjects = self.alternatives(self.pattern.s, base.s)?;
        let objects = self.alternatives(self.pattern.o, base.o)?;
        for &s in subjects.iter() {
            for &o in objects.iter() {
                if (s == base.s && o == base.o) || (base.p == self.same_as && s == o) {
                    continue;
                }
                self.pending.push(Spo {
                    s,
                    o,
                    stmt_type: StatementType::Inferred,
                    ..*base
                });
                if self.pending.len() >= self.chunk_size {
                    self.flush()?;
                }
            }
        }
        Ok(())
    }

    /// Batch presence check; absent candidates go to the auxiliary index
    fn flush(&mut self) -> CoreResult<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let batch = std::mem::take(&mut self.pending);
        let absent = self.store.filter_absent(self.primary, &batch)?;
        tracing::trace!(candidates = batch.len(), absent = absent.len(), "sameAs flush");
        for spo in absent {
            if self.aux.insert(spo) {
                self.inferred += 1;
            }
        }
        self.pending = batch;
        self.pending.clear();
        Ok(())
    }

    /// Probe every equivalent rewrite of the pattern other than the pattern
    /// itself, which the source already covered.
    fn expand_equivalents(&mut self) -> CoreResult<()> {
        let subjects = self.bound_class(self.pattern.s)?;
        let objects = self.bound_class(self.pattern.o)?;
        let quads = self.store.quads();
        for &s in &subjects {
            for &o in &objects {
                if s == self.pattern.s && o == self.pattern.o {
                    continue;
                }
                let probe = SpoPattern { s, o, ..self.pattern };
                let mut scan = self.store.scan(KeyOrder::for_pattern(&probe, quads), &probe)?;
                loop {
                    let chunk = scan.next_chunk()?;
                    if chunk.is_empty() {
                        break;
                    }
                    for spo in &chunk {
                        self.expand(spo)?;
                    }
                }
                scan.close();
            }
        }
        self.flush()
    }

    fn bound_class(&mut self, bound: Option<TermId>) -> CoreResult<Vec<Option<TermId>>> {
        match bound {
            Some(t) => Ok(self.closure.with_self(t)?.iter().map(|x| Some(*x)).collect()),
            None => Ok(vec![None]),
        }
    }

    fn fetch(&mut self) -> CoreResult<Vec<Spo>> {
        loop {
            match &mut self.phase {
                Phase::Source => {
                    let chunk = self.src.next_chunk()?;
                    if chunk.is_empty() {
                        self.expand_equivalents()?;
                        tracing::debug!(
                            shape = %self.shape,
                            inferred = self.inferred,
                            probes = self.closure.probes(),
                            "sameAs: source drained"
                        );
                        let entailments = self.aux.scan(self.aux_order, &SpoPattern::any())?;
                        self.phase = Phase::Entailments(entailments);
                        continue;
                    }
                    for spo in &chunk {
                        self.expand(spo)?;
                    }
                    self.chunk_order = self.src_order;
                    return Ok(chunk);
                }
                Phase::Entailments(entailments) => {
                    let chunk = entailments.next_chunk()?;
                    if chunk.is_empty() {
                        entailments.close();
                        self.phase = Phase::Done;
                        self.state = IterState::Exhausted;
                        continue;
                    }
                    self.chunk_order = Some(self.aux_order);
                    return Ok(chunk);
                }
                Phase::Done => return Ok(Vec::new()),
            }
        }
    }
}

impl ChunkedOrderedIterator for SameAsPropertiesIterator {
    fn has_next(&mut self) -> CoreResult<bool> {
        if self.state.is_closed() {
            return Ok(false);
        }
        if self.cursor.has_buffered() {
            return Ok(true);
        }
        let chunk = self.fetch()?;
        let any = !chunk.is_empty();
        self.cursor.load(chunk);
        Ok(any)
    }

    fn next(&mut self) -> CoreResult<Option<Spo>> {
        self.state.check_open("next")?;
        if !self.has_next()? {
            return Ok(None);
        }
        Ok(self.cursor.pop())
    }

    fn next_chunk(&mut self) -> CoreResult<Vec<Spo>> {
        self.state.check_open("next_chunk")?;
        if self.cursor.has_buffered() {
            return Ok(self.cursor.take());
        }
        self.fetch()
    }

    fn next_chunk_in(&mut self, order: KeyOrder) -> CoreResult<Vec<Spo>> {
        let mut chunk = self.next_chunk()?;
        if self.chunk_order != Some(order) {
            order.sort(&mut chunk);
        }
        Ok(chunk)
    }

    fn key_order(&self) -> Option<KeyOrder> {
        self.src_order
    }

    fn close(&mut self) {
        if self.state.is_closed() {
            return;
        }
        self.state = IterState::Closed;
        self.cursor.clear();
        self.pending.clear();
        self.src.close();
        if let Phase::Entailments(entailments) = &mut self.phase {
            entailments.close();
        }
        self.phase = Phase::Done;
    }
}

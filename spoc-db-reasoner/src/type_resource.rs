//! Backward chaining of `(x rdf:type rdfs:Resource)`
//!
//! Every resource is an `rdfs:Resource`. Rather than storing one such
//! statement per resource, [`TypeResourceIterator`] synthesizes them while a
//! scan is read.
//!
//! ## Subject unbound
//!
//! Candidate resources are the merged, ascending, distinct union of every
//! subject and every non-literal object in the store. They are merged against
//! the stored `(? rdf:type rdfs:Resource)` statements, whatever their
//! provenance, ordered by subject:
//! - candidate < stored: emit the candidate as `Inferred`, push back the
//!   stored head
//! - equal: emit the stored statement as is, advance both
//! - candidate > stored: push back the candidate, emit the stored head
//!
//! The wrapped scan has its own `(x rdf:type rdfs:Resource)` tuples removed;
//! the merge re-emits each of them once, with its own type and context.
//! Synthesized tuples come after the scan, starting on a fresh chunk, in POS
//! order (or the scan's order).
//!
//! The candidate set assumes every resource appears in at least one stored
//! statement. Resources only reachable through other backward-chained
//! entailments are not covered.
//!
//! ## Subject bound
//!
//! At most one tuple is synthesized, `(s rdf:type rdfs:Resource)`, and it is
//! dropped if the scan turns out to contain it in any context.

use crate::error::Result;
use crate::options::DEFAULT_ENTAILMENT_CHUNK_SIZE;
use crate::vocab::Vocabulary;
use spoc_db_core::{
    drain, BoxedIterator, ChunkCursor, ChunkedArrayIterator, ChunkedOrderedIterator,
    FilteredIterator, IterState, KeyOrder, MergedOrderedIterator, PushbackIterator, Spo, SpoField,
    SpoPattern, StatementIndex, StatementType, TermId, TupleStream,
};
use std::sync::Arc;

type CoreResult<T> = spoc_db_core::Result<T>;

/// Ascending distinct resource ids: subjects merged with non-literal objects
type ResourceIds = MergedOrderedIterator<
    Box<dyn Iterator<Item = TermId> + Send>,
    Box<dyn Iterator<Item = TermId> + Send>,
    TermId,
>;

enum Entailments {
    /// Merge of candidate resources against stored type-Resource statements
    Unbound {
        resources: PushbackIterator<ResourceIds>,
        stored: PushbackIterator<TupleStream>,
    },
    /// The single candidate for a bound subject; `None` once seen in the scan
    Bound { appender: Option<Spo> },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Source,
    Entailments,
    Done,
}

/// Wraps a scan and adds `(x rdf:type rdfs:Resource)` entailments
pub struct TypeResourceIterator {
    src: BoxedIterator,
    src_order: Option<KeyOrder>,
    entailments: Entailments,
    vocab: Vocabulary,
    chunk_size: usize,
    phase: Phase,
    cursor: ChunkCursor,
    /// Declared order of the chunk most recently produced
    chunk_order: Option<KeyOrder>,
    state: IterState,
    inferred: usize,
}

impl TypeResourceIterator {
    /// True if `pattern` can match a `(x rdf:type rdfs:Resource)` tuple.
    ///
    /// Synthesized tuples carry no context, so a bound context never matches.
    pub fn applies(pattern: &SpoPattern, vocab: &Vocabulary) -> bool {
        pattern.o.map_or(true, |o| o == vocab.rdfs_resource)
            && pattern.p.map_or(true, |p| p == vocab.rdf_type)
            && pattern.c.is_none()
    }

    /// Wrap `src` if the pattern admits type-Resource entailments, otherwise
    /// return it untouched.
    pub fn new_instance(
        src: BoxedIterator,
        pattern: &SpoPattern,
        store: Arc<dyn StatementIndex>,
        vocab: Vocabulary,
        chunk_size: usize,
    ) -> Result<BoxedIterator> {
        if !Self::applies(pattern, &vocab) {
            tracing::trace!(%pattern, "type-resource: pattern cannot match, passing through");
            return Ok(src);
        }
        Ok(Box::new(Self::new(src, pattern, store, vocab, chunk_size)?))
    }

    pub fn new(
        src: BoxedIterator,
        pattern: &SpoPattern,
        store: Arc<dyn StatementIndex>,
        vocab: Vocabulary,
        chunk_size: usize,
    ) -> Result<Self> {
        vocab.require_type_resource()?;
        let src_order = src.key_order();
        let chunk_size = if chunk_size == 0 {
            DEFAULT_ENTAILMENT_CHUNK_SIZE
        } else {
            chunk_size
        };

        let (src, entailments): (BoxedIterator, Entailments) = match pattern.s {
            Some(s) => {
                let appender =
                    Spo::triple(s, vocab.rdf_type, vocab.rdfs_resource, StatementType::Inferred);
                (src, Entailments::Bound {
                    appender: Some(appender),
                })
            }
            None => {
                let (rdf_type, rdfs_resource) = (vocab.rdf_type, vocab.rdfs_resource);
                let filtered: BoxedIterator =
                    Box::new(FilteredIterator::new(src, move |spo: &Spo| {
                        !(spo.p == rdf_type && spo.o == rdfs_resource)
                    }));
                let entailments = Entailments::Unbound {
                    resources: PushbackIterator::new(resource_ids(&store)?),
                    stored: PushbackIterator::new(stored_type_resource(&store, &vocab)?),
                };
                (filtered, entailments)
            }
        };

        tracing::debug!(%pattern, ?src_order, chunk_size, "type-resource backchainer");
        Ok(Self {
            src,
            src_order,
            entailments,
            vocab,
            chunk_size,
            phase: Phase::Source,
            cursor: ChunkCursor::new(),
            chunk_order: src_order,
            state: IterState::Open,
            inferred: 0,
        })
    }

    /// Number of `Inferred` tuples synthesized so far
    pub fn inferred_count(&self) -> usize {
        self.inferred
    }

    /// Next merged entailment, unbound-subject case
    fn next_merged(&mut self) -> CoreResult<Option<Spo>> {
        let Entailments::Unbound { resources, stored } = &mut self.entailments else {
            return Ok(None);
        };
        let candidate = resources.next();
        let asserted = stored.next();
        if asserted.is_none() {
            if let Some(e) = stored.get_mut().take_error() {
                return Err(e);
            }
        }
        let spo = match (candidate, asserted) {
            (None, None) => return Ok(None),
            (Some(s1), None) => {
                self.inferred += 1;
                Spo::triple(
                    s1,
                    self.vocab.rdf_type,
                    self.vocab.rdfs_resource,
                    StatementType::Inferred,
                )
            }
            (None, Some(spo)) => spo,
            (Some(s1), Some(spo)) if s1 < spo.s => {
                stored.pushback()?;
                self.inferred += 1;
                Spo::triple(
                    s1,
                    self.vocab.rdf_type,
                    self.vocab.rdfs_resource,
                    StatementType::Inferred,
                )
            }
            (Some(s1), Some(spo)) if s1 == spo.s => spo,
            (Some(_), Some(spo)) => {
                resources.pushback()?;
                spo
            }
        };
        tracing::trace!(term = %spo.s, stmt_type = %spo.stmt_type, "type-resource merge");
        Ok(Some(spo))
    }

    /// Fill one chunk of entailments
    fn next_entailment_chunk(&mut self) -> CoreResult<Vec<Spo>> {
        let mut chunk = Vec::new();
        if let Entailments::Bound { appender } = &mut self.entailments {
            if let Some(spo) = appender.take() {
                self.inferred += 1;
                chunk.push(spo);
            }
        } else {
            while chunk.len() < self.chunk_size {
                match self.next_merged()? {
                    Some(spo) => chunk.push(spo),
                    None => break,
                }
            }
        }
        // entailments are generated in POS order
        match self.src_order {
            Some(order) if order != KeyOrder::Pos => {
                order.sort(&mut chunk);
                self.chunk_order = Some(order);
            }
            _ => self.chunk_order = Some(KeyOrder::Pos),
        }
        Ok(chunk)
    }

    fn fetch(&mut self) -> CoreResult<Vec<Spo>> {
        loop {
            match self.phase {
                Phase::Source => {
                    let chunk = self.src.next_chunk()?;
                    if chunk.is_empty() {
                        tracing::debug!("type-resource: source drained, synthesizing");
                        self.phase = Phase::Entailments;
                        continue;
                    }
                    if let Entailments::Bound { appender } = &mut self.entailments {
                        // any context counts; the appender itself has none
                        let seen = appender.as_ref().is_some_and(|a| {
                            chunk.iter().any(|spo| spo.s == a.s && spo.p == a.p && spo.o == a.o)
                        });
                        if seen {
                            *appender = None;
                        }
                    }
                    self.chunk_order = self.src_order;
                    return Ok(chunk);
                }
                Phase::Entailments => {
                    let chunk = self.next_entailment_chunk()?;
                    if chunk.is_empty() {
                        tracing::debug!(inferred = self.inferred, "type-resource: done");
                        self.phase = Phase::Done;
                        self.state = IterState::Exhausted;
                        continue;
                    }
                    return Ok(chunk);
                }
                Phase::Done => return Ok(Vec::new()),
            }
        }
    }
}

impl ChunkedOrderedIterator for TypeResourceIterator {
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
        self.src.close();
        if let Entailments::Unbound { stored, .. } = &mut self.entailments {
            stored.get_mut().close();
        }
        self.entailments = Entailments::Bound { appender: None };
    }
}

/// Distinct subjects merged with distinct non-literal objects
fn resource_ids(store: &Arc<dyn StatementIndex>) -> Result<ResourceIds> {
    let subjects = store.distinct_terms(SpoField::S)?;
    let objects = store.distinct_terms(SpoField::O)?;
    let literal_filter = Arc::clone(store);
    let resources: Box<dyn Iterator<Item = TermId> + Send> =
        Box::new(objects.filter(move |id| !literal_filter.is_literal(*id)));
    Ok(MergedOrderedIterator::new(subjects, resources))
}

/// Stored `(? rdf:type rdfs:Resource)` statements, ascending by subject
fn stored_type_resource(
    store: &Arc<dyn StatementIndex>,
    vocab: &Vocabulary,
) -> Result<TupleStream> {
    let pattern = SpoPattern::any()
        .with_p(vocab.rdf_type)
        .with_o(vocab.rdfs_resource);
    let order = KeyOrder::for_pattern(&pattern, store.quads());
    let mut scan = store.scan(order, &pattern)?;
    // quad orders put the context ahead of the subject; regroup by subject
    if order.is_quad() {
        let mut tuples = drain(&mut scan)?;
        tuples.sort_unstable_by_key(|spo| (spo.s, spo.c));
        scan = Box::new(ChunkedArrayIterator::new(tuples, None));
    }
    Ok(TupleStream::new(scan))
}

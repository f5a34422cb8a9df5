//! Read-time entailment for access paths
//!
//! [`wrap_with_backchaining`] decides, from the [`InferenceOptions`], which
//! entailments the forward closure left out and wraps a scan with the
//! chainers that synthesize them:
//!
//! 1. owl:sameAs property copying, when the closure stores the sameAs
//!    relation but not the copied properties, and the store has at least one
//!    sameAs statement
//! 2. `(x rdf:type rdfs:Resource)`, when the closure does not store it and
//!    the pattern can match it
//!
//! Anything else returns the scan unchanged.

use crate::error::Result;
use crate::options::InferenceOptions;
use crate::same_as_properties::SameAsPropertiesIterator;
use crate::type_resource::TypeResourceIterator;
use crate::vocab::Vocabulary;
use spoc_db_core::{
    AsyncBufferedIterator, BoxedIterator, BufferConfig, ChunkedOrderedIterator, KeyOrder,
    SpoPattern, StatementIndex,
};
use std::sync::Arc;

/// Wrap `src` with whichever backward chainers `options` call for.
pub fn wrap_with_backchaining(
    src: BoxedIterator,
    pattern: &SpoPattern,
    store: Arc<dyn StatementIndex>,
    vocab: Vocabulary,
    options: &InferenceOptions,
) -> Result<BoxedIterator> {
    wrap(src, pattern, store, vocab, options, None)
}

fn wrap(
    src: BoxedIterator,
    pattern: &SpoPattern,
    store: Arc<dyn StatementIndex>,
    vocab: Vocabulary,
    options: &InferenceOptions,
    same_as_used: Option<bool>,
) -> Result<BoxedIterator> {
    let mut it = src;

    if options.backchain_same_as() {
        let used = match same_as_used {
            Some(used) => used,
            None => store_uses_same_as(store.as_ref(), &vocab)?,
        };
        if used {
            it = Box::new(SameAsPropertiesIterator::new(
                it,
                pattern,
                Arc::clone(&store),
                vocab,
                options.chunk_size,
            )?);
        } else {
            tracing::debug!("no owl:sameAs statements, skipping property expansion");
        }
    }

    if options.backchain_type_resource() {
        it = TypeResourceIterator::new_instance(it, pattern, store, vocab, options.chunk_size)?;
    }

    Ok(it)
}

/// True if the store holds at least one owl:sameAs statement
fn store_uses_same_as(store: &dyn StatementIndex, vocab: &Vocabulary) -> Result<bool> {
    vocab.require_same_as()?;
    let probe = SpoPattern::any().with_p(vocab.owl_same_as);
    let mut scan = store.scan(KeyOrder::for_pattern(&probe, store.quads()), &probe)?;
    let used = scan.has_next()?;
    scan.close();
    Ok(used)
}

/// An access pattern over a statement index, read with backward chaining
pub struct BackchainAccessPath {
    store: Arc<dyn StatementIndex>,
    pattern: SpoPattern,
    order: KeyOrder,
    vocab: Vocabulary,
    options: InferenceOptions,
    /// Known answer to "does the store use owl:sameAs", skipping the probe
    same_as_used: Option<bool>,
    buffer: Option<BufferConfig>,
}

impl BackchainAccessPath {
    pub fn new(
        store: Arc<dyn StatementIndex>,
        pattern: SpoPattern,
        vocab: Vocabulary,
        options: InferenceOptions,
    ) -> Self {
        let order = KeyOrder::for_pattern(&pattern, store.quads());
        Self {
            store,
            pattern,
            order,
            vocab,
            options,
            same_as_used: None,
            buffer: None,
        }
    }

    pub fn with_same_as_used(mut self, used: bool) -> Self {
        self.same_as_used = Some(used);
        self
    }

    /// Prefetch the raw scan before the chainers read it
    pub fn with_buffer(mut self, config: BufferConfig) -> Self {
        self.buffer = Some(config);
        self
    }

    pub fn pattern(&self) -> &SpoPattern {
        &self.pattern
    }

    pub fn key_order(&self) -> KeyOrder {
        self.order
    }

    /// Scan the index and wrap the scan with the configured chainers
    pub fn iterator(&self) -> Result<BoxedIterator> {
        let mut src = self.store.scan(self.order, &self.pattern)?;
        if let Some(config) = &self.buffer {
            let count = self.store.range_count(self.order, &self.pattern)?;
            src = Box::new(AsyncBufferedIterator::with_config(src, count, config)?);
        }
        wrap(
            src,
            &self.pattern,
            Arc::clone(&self.store),
            self.vocab,
            &self.options,
            self.same_as_used,
        )
    }

    /// Number of statements on the path.
    ///
    /// The fast count is the raw index range and ignores entailments; the
    /// exact count reads the whole backchained stream.
    pub fn range_count(&self, exact: bool) -> Result<u64> {
        if !exact {
            return Ok(self.store.range_count(self.order, &self.pattern)?);
        }
        let mut it = self.iterator()?;
        let mut n = 0u64;
        loop {
            let chunk = it.next_chunk()?;
            if chunk.is_empty() {
                break;
            }
            n += chunk.len() as u64;
        }
        it.close();
        tracing::debug!(pattern = %self.pattern, count = n, "exact range count");
        Ok(n)
    }
}

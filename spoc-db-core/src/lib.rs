//! # SPOC DB Core
//!
//! Statement tuples, index key orders and the streaming substrate shared by
//! scans and backward chainers.
//!
//! This crate provides:
//! - [`Spo`] statement tuples with provenance ([`StatementType`])
//! - [`KeyOrder`]: the nine index permutations with key codecs and comparators
//! - [`TermIdEncoder`]: partition-scattering codec for term identifiers
//! - [`ChunkedOrderedIterator`]: the chunked streaming contract, plus
//!   pushback, merge, filter and prefetching combinators
//! - [`StatementIndex`]: the storage collaborator, with [`MemoryStore`]
//!
//! ## Example
//!
//! ```
//! use spoc_db_core::{
//!     drain, KeyOrder, MemoryStore, Spo, SpoPattern, StatementIndex, StatementType, TermId,
//! };
//!
//! let store = MemoryStore::new();
//! store.insert(Spo::triple(TermId(1), TermId(2), TermId(3), StatementType::Explicit));
//!
//! let mut scan = store.scan(KeyOrder::Pos, &SpoPattern::any().with_p(TermId(2))).unwrap();
//! assert_eq!(drain(&mut scan).unwrap().len(), 1);
//! ```

pub mod error;
pub mod ids;
pub mod iter;
pub mod key_order;
pub mod spo;
pub mod store;
pub mod term_id_encoder;

// Re-exports for convenience
pub use error::{Error, Result};
pub use ids::TermId;
pub use iter::{
    drain, AsyncBufferedIterator, BoxedIterator, BufferConfig, ChunkCursor, ChunkedArrayIterator,
    ChunkedOrderedIterator, EmptyIterator, FilteredIterator, IterState, MergedOrderedIterator,
    PushbackIterator, TermProjection, TupleStream, DEFAULT_CHUNK_SIZE,
};
pub use key_order::{KeyOrder, MAX_INDEX_COUNT};
pub use spo::{Spo, SpoField, SpoPattern, StatementType};
pub use store::{MemoryStore, StatementIndex};
pub use term_id_encoder::TermIdEncoder;

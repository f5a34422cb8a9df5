//! # SPOC DB Lexicon
//!
//! Term values, identifier handles, term resolution and identifier assignment.
//!
//! This crate provides:
//! - [`TermValue`] and the [`Iv`] identifier handle
//! - [`TermCache`]: concurrent, first-writer-wins cache that never pins values
//! - [`TermResolver`]: chunked, parallel resolution through a [`TermSource`]
//! - [`TermWriter`]: chunked, parallel identifier assignment through a
//!   [`TermDictionary`], with a read-only lookup mode
//! - [`TermCacheConfig`] and [`TermWriterConfig`]: loadable from TOML
//!
//! ## Example
//!
//! ```
//! use spoc_db_core::TermId;
//! use spoc_db_lexicon::{MemoryTermSource, TermCacheConfig, TermResolver, TermValue};
//!
//! let source = MemoryTermSource::new();
//! source.insert(TermId(1), TermValue::uri("http://example.org/a"));
//!
//! let resolver = TermResolver::from_config(&TermCacheConfig::default());
//! let values = resolver.resolve(&[TermId(1), TermId(2)], &source).unwrap();
//! assert_eq!(values.len(), 1);
//! assert!(resolver.cache().contains(TermId(1)));
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod resolve;
pub mod term;
pub mod write;

// Re-exports for convenience
pub use cache::TermCache;
pub use config::{
    TermCacheConfig, TermWriterConfig, DEFAULT_RESOLVE_CHUNK_SIZE, DEFAULT_STRONG_CAPACITY,
    DEFAULT_WRITE_CHUNK_SIZE,
};
pub use error::{LexiconError, Result};
pub use resolve::{MemoryTermSource, TermResolver, TermSource};
pub use term::{Iv, TermValue};
pub use write::{MemoryTermDictionary, TermDictionary, TermWriteOutcome, TermWriter};

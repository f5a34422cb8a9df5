//! # SPOC DB Reasoner
//!
//! Backward chaining over SPOC scans: entailments the forward closure chose
//! not to store are synthesized while an access path is read.
//!
//! This crate provides:
//! - [`TypeResourceIterator`]: `(x rdf:type rdfs:Resource)` for every resource
//! - [`SameAsClosure`]: memoised owl:sameAs equivalence classes
//! - [`SameAsPropertiesIterator`]: statements copied across owl:sameAs
//! - [`wrap_with_backchaining`] and [`BackchainAccessPath`]: pick the chainers
//!   an [`InferenceOptions`] calls for
//!
//! ## Example
//!
//! ```
//! use spoc_db_core::{drain, MemoryStore, Spo, SpoPattern, StatementIndex, StatementType, TermId};
//! use spoc_db_reasoner::{BackchainAccessPath, InferenceOptions, Vocabulary};
//! use std::sync::Arc;
//!
//! let vocab = Vocabulary::new(TermId(1), TermId(2), TermId(3));
//! let store = MemoryStore::new();
//! store.insert(Spo::triple(TermId(10), TermId(20), TermId(30), StatementType::Explicit));
//! let store: Arc<dyn StatementIndex> = Arc::new(store);
//!
//! let path = BackchainAccessPath::new(
//!     store,
//!     SpoPattern::any().with_p(TermId(1)),
//!     vocab,
//!     InferenceOptions::default(),
//! );
//! let mut it = path.iterator().unwrap();
//! // 10 and 30 are resources
//! assert_eq!(drain(&mut it).unwrap().len(), 2);
//! ```

pub mod backchain;
pub mod error;
pub mod options;
pub mod same_as;
pub mod same_as_properties;
pub mod type_resource;
pub mod vocab;

// Re-exports for convenience
pub use backchain::{wrap_with_backchaining, BackchainAccessPath};
pub use error::{ReasonerError, Result};
pub use options::{AxiomModel, InferenceOptions, DEFAULT_ENTAILMENT_CHUNK_SIZE};
pub use same_as::SameAsClosure;
pub use same_as_properties::{SameAsPropertiesIterator, Shape};
pub use type_resource::TypeResourceIterator;
pub use vocab::Vocabulary;

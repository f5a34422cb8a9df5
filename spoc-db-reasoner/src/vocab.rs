//! Vocabulary terms the backward chainers reason about
//!
//! Chainers work on term identifiers only. [`Vocabulary`] carries the ids the
//! lexicon assigned to the handful of IRIs the entailments mention.

use crate::error::{ReasonerError, Result};
use serde::{Deserialize, Serialize};
use spoc_db_core::TermId;

/// RDF vocabulary constants
pub mod rdf {
    /// rdf:type IRI
    pub const TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
}

/// RDFS vocabulary constants
pub mod rdfs {
    /// rdfs:Resource IRI
    pub const RESOURCE: &str = "http://www.w3.org/2000/01/rdf-schema#Resource";
}

/// OWL vocabulary constants
pub mod owl {
    /// owl:sameAs IRI
    pub const SAME_AS: &str = "http://www.w3.org/2002/07/owl#sameAs";
}

/// Term ids of the entailment vocabulary
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vocabulary {
    /// rdf:type
    pub rdf_type: TermId,
    /// rdfs:Resource
    pub rdfs_resource: TermId,
    /// owl:sameAs
    pub owl_same_as: TermId,
}

impl Vocabulary {
    pub fn new(rdf_type: TermId, rdfs_resource: TermId, owl_same_as: TermId) -> Self {
        Self {
            rdf_type,
            rdfs_resource,
            owl_same_as,
        }
    }

    /// Build from an IRI lookup (e.g. the lexicon's term-to-id index).
    pub fn from_lookup(mut lookup: impl FnMut(&str) -> Option<TermId>) -> Result<Self> {
        let mut get = |iri: &str| {
            lookup(iri)
                .and_then(TermId::non_null)
                .ok_or_else(|| ReasonerError::invalid_argument(format!("no term id for {}", iri)))
        };
        Ok(Self {
            rdf_type: get(rdf::TYPE)?,
            rdfs_resource: get(rdfs::RESOURCE)?,
            owl_same_as: get(owl::SAME_AS)?,
        })
    }

    /// Require rdf:type and rdfs:Resource
    pub fn require_type_resource(&self) -> Result<()> {
        if self.rdf_type.is_null() || self.rdfs_resource.is_null() {
            return Err(ReasonerError::invalid_argument(
                "rdf:type and rdfs:Resource must be bound",
            ));
        }
        Ok(())
    }

    /// Require owl:sameAs
    pub fn require_same_as(&self) -> Result<()> {
        if self.owl_same_as.is_null() {
            return Err(ReasonerError::invalid_argument("owl:sameAs must be bound"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_lookup_resolves_all_terms() {
        let vocab = Vocabulary::from_lookup(|iri| match iri {
            rdf::TYPE => Some(TermId(1)),
            rdfs::RESOURCE => Some(TermId(2)),
            owl::SAME_AS => Some(TermId(3)),
            _ => None,
        })
        .unwrap();
        assert_eq!(vocab, Vocabulary::new(TermId(1), TermId(2), TermId(3)));
    }

    #[test]
    fn from_lookup_rejects_missing_or_null() {
        assert!(Vocabulary::from_lookup(|_| None).is_err());
        assert!(Vocabulary::from_lookup(|_| Some(TermId::NULL)).is_err());
    }

    #[test]
    fn null_same_as_is_invalid() {
        let vocab = Vocabulary::new(TermId(1), TermId(2), TermId::NULL);
        assert!(vocab.require_type_resource().is_ok());
        assert!(matches!(
            vocab.require_same_as(),
            Err(ReasonerError::InvalidArgument(_))
        ));
    }
}

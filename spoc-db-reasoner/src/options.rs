//! Inference configuration
//!
//! Mirrors the knobs of the forward-closure engine: whichever entailments the
//! closure already materialized must not be synthesized again at read time.

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Default number of synthesized tuples per chunk
pub const DEFAULT_ENTAILMENT_CHUNK_SIZE: usize = 100;

/// Axiom model of the knowledge base
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AxiomModel {
    /// No entailments at all
    None,
    /// RDF Schema entailments
    #[default]
    Rdfs,
    /// RDF Schema plus the owl:sameAs fragment
    Owl,
}

impl AxiomModel {
    pub fn is_rdf_schema(self) -> bool {
        matches!(self, AxiomModel::Rdfs | AxiomModel::Owl)
    }

    pub fn is_owl_same_as(self) -> bool {
        matches!(self, AxiomModel::Owl)
    }
}

/// Which entailments the closure stores and which are backward chained
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceOptions {
    pub axioms: AxiomModel,
    /// `(x rdf:type rdfs:Resource)` is stored by the closure
    pub forward_chain_rdf_type_rdfs_resource: bool,
    /// The owl:sameAs closure itself is stored by the closure
    pub forward_chain_owl_same_as_closure: bool,
    /// Properties are copied across owl:sameAs by the closure
    pub forward_chain_owl_same_as_properties: bool,
    /// Synthesized tuples per chunk
    pub chunk_size: usize,
}

impl Default for InferenceOptions {
    fn default() -> Self {
        Self {
            axioms: AxiomModel::Rdfs,
            forward_chain_rdf_type_rdfs_resource: false,
            forward_chain_owl_same_as_closure: true,
            forward_chain_owl_same_as_properties: false,
            chunk_size: DEFAULT_ENTAILMENT_CHUNK_SIZE,
        }
    }
}

impl InferenceOptions {
    /// Options with no backward chaining at all
    pub fn none() -> Self {
        Self {
            axioms: AxiomModel::None,
            ..Self::default()
        }
    }

    /// Parse from TOML; missing keys take their defaults
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let mut opts: Self = toml::from_str(s)?;
        opts.chunk_size = opts.chunk_size.max(1);
        Ok(opts)
    }

    /// owl:sameAs property expansion happens at read time
    pub fn backchain_same_as(&self) -> bool {
        self.axioms.is_owl_same_as()
            && self.forward_chain_owl_same_as_closure
            && !self.forward_chain_owl_same_as_properties
    }

    /// `(x rdf:type rdfs:Resource)` happens at read time
    pub fn backchain_type_resource(&self) -> bool {
        self.axioms.is_rdf_schema() && !self.forward_chain_rdf_type_rdfs_resource
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_backchain_type_resource_only() {
        let opts = InferenceOptions::default();
        assert!(opts.backchain_type_resource());
        assert!(!opts.backchain_same_as());
        assert!(!InferenceOptions::none().backchain_type_resource());
    }

    #[test]
    fn owl_enables_same_as_unless_forward_chained() {
        let mut opts = InferenceOptions {
            axioms: AxiomModel::Owl,
            ..Default::default()
        };
        assert!(opts.backchain_same_as());
        opts.forward_chain_owl_same_as_properties = true;
        assert!(!opts.backchain_same_as());
        opts.forward_chain_owl_same_as_properties = false;
        opts.forward_chain_owl_same_as_closure = false;
        assert!(!opts.backchain_same_as());
    }

    #[test]
    fn from_toml_partial() {
        let opts = InferenceOptions::from_toml_str(
            r#"
            axioms = "owl"
            forward_chain_rdf_type_rdfs_resource = true
            chunk_size = 0
            "#,
        )
        .unwrap();
        assert_eq!(opts.axioms, AxiomModel::Owl);
        assert!(!opts.backchain_type_resource());
        assert!(opts.backchain_same_as());
        assert_eq!(opts.chunk_size, 1);
    }

    #[test]
    fn from_toml_rejects_unknown_axiom_model() {
        assert!(InferenceOptions::from_toml_str(r#"axioms = "rdfs-plus""#).is_err());
    }
}

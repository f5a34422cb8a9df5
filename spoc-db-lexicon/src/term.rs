//! Term values and identifier handles

use serde::{Deserialize, Serialize};
use spoc_db_core::TermId;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// The value a term identifier stands for
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TermValue {
    Uri {
        iri: String,
    },
    Literal {
        lexical: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        datatype: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        lang: Option<String>,
    },
    #[serde(rename = "bnode")]
    BNode {
        id: String,
    },
}

impl TermValue {
    pub fn uri(iri: impl Into<String>) -> Self {
        TermValue::Uri { iri: iri.into() }
    }

    /// Plain literal
    pub fn literal(lexical: impl Into<String>) -> Self {
        TermValue::Literal {
            lexical: lexical.into(),
            datatype: None,
            lang: None,
        }
    }

    pub fn typed_literal(lexical: impl Into<String>, datatype: impl Into<String>) -> Self {
        TermValue::Literal {
            lexical: lexical.into(),
            datatype: Some(datatype.into()),
            lang: None,
        }
    }

    pub fn lang_literal(lexical: impl Into<String>, lang: impl Into<String>) -> Self {
        TermValue::Literal {
            lexical: lexical.into(),
            datatype: None,
            lang: Some(lang.into()),
        }
    }

    pub fn bnode(id: impl Into<String>) -> Self {
        TermValue::BNode { id: id.into() }
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, TermValue::Literal { .. })
    }

    pub fn is_bnode(&self) -> bool {
        matches!(self, TermValue::BNode { .. })
    }
}

impl fmt::Display for TermValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TermValue::Uri { iri } => write!(f, "<{}>", iri),
            TermValue::Literal {
                lexical,
                datatype,
                lang,
            } => {
                write!(f, "\"{}\"", lexical)?;
                if let Some(lang) = lang {
                    write!(f, "@{}", lang)?;
                } else if let Some(dt) = datatype {
                    write!(f, "^^<{}>", dt)?;
                }
                Ok(())
            }
            TermValue::BNode { id } => write!(f, "_:{}", id),
        }
    }
}

/// Identifier handle, optionally carrying its resolved value.
///
/// Equality and hashing use the identifier only.
#[derive(Clone, Debug)]
pub struct Iv {
    id: TermId,
    value: Option<Arc<TermValue>>,
}

impl Iv {
    pub fn new(id: TermId) -> Self {
        Self { id, value: None }
    }

    pub fn with_value(id: TermId, value: Arc<TermValue>) -> Self {
        Self {
            id,
            value: Some(value),
        }
    }

    pub fn id(&self) -> TermId {
        self.id
    }

    pub fn value(&self) -> Option<&Arc<TermValue>> {
        self.value.as_ref()
    }

    pub fn has_value(&self) -> bool {
        self.value.is_some()
    }

    pub fn set_value(&mut self, value: Arc<TermValue>) {
        self.value = Some(value);
    }

    /// Same identifier, no cached value
    pub fn clone_without_value(&self) -> Self {
        Self::new(self.id)
    }
}

impl PartialEq for Iv {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Iv {}

impl Hash for Iv {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl From<TermId> for Iv {
    fn from(id: TermId) -> Self {
        Iv::new(id)
    }
}

impl fmt::Display for Iv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(v) => write!(f, "{}={}", self.id, v),
            None => write!(f, "{}", self.id),
        }
    }
}

//! Term cache and term writer configuration

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default number of values kept alive by the cache itself
pub const DEFAULT_STRONG_CAPACITY: usize = 10_000;

/// Default number of identifiers per resolution chunk
pub const DEFAULT_RESOLVE_CHUNK_SIZE: usize = 4_000;

/// Default number of terms per write chunk
pub const DEFAULT_WRITE_CHUNK_SIZE: usize = 4_000;

/// Sizing of the term cache and of batch resolution
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TermCacheConfig {
    /// Recently used values held strongly; 0 keeps values only while callers
    /// hold them
    pub strong_capacity: usize,
    /// Identifiers per resolution chunk; larger batches are split and
    /// resolved in parallel
    pub resolve_chunk_size: usize,
}

impl Default for TermCacheConfig {
    fn default() -> Self {
        Self {
            strong_capacity: DEFAULT_STRONG_CAPACITY,
            resolve_chunk_size: DEFAULT_RESOLVE_CHUNK_SIZE,
        }
    }
}

impl TermCacheConfig {
    /// Weak-only cache
    pub fn weak_only() -> Self {
        Self {
            strong_capacity: 0,
            ..Self::default()
        }
    }

    /// Parse from TOML; missing keys take their defaults
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(s)?;
        config.resolve_chunk_size = config.resolve_chunk_size.max(1);
        Ok(config)
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        tracing::debug!(path = %path.display(), "loading term cache config");
        Self::from_toml_str(&text)
    }
}

/// Identifier assignment for one dictionary partition
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TermWriterConfig {
    /// Partition whose counter mints new identifiers
    pub partition: u32,
    /// Low identifier bits reversed into the high bits, see
    /// [`TermIdEncoder`](spoc_db_core::TermIdEncoder)
    pub term_id_bits_to_reverse: u32,
    /// Distinct terms per write chunk
    pub write_chunk_size: usize,
    /// Record blank nodes in the dictionary; otherwise each write mints a
    /// fresh identifier for them
    pub store_blank_nodes: bool,
}

impl Default for TermWriterConfig {
    fn default() -> Self {
        Self {
            partition: 0,
            term_id_bits_to_reverse: 0,
            write_chunk_size: DEFAULT_WRITE_CHUNK_SIZE,
            store_blank_nodes: false,
        }
    }
}

impl TermWriterConfig {
    /// Parse from TOML; missing keys take their defaults
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(s)?;
        config.write_chunk_size = config.write_chunk_size.max(1);
        Ok(config)
    }
}

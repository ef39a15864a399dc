// File: src/config.rs
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Tunables for index construction and query expansion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Raw entries (insert pass) or buckets (dedup pass) handled per tick.
    pub build_batch_size: usize,
    /// Upper bound on `(final, tone)` choices tried for one position.
    pub max_fanout_per_position: usize,
    /// Upper bound on live candidate keys at any generation level.
    pub max_query_keys: usize,
    pub prefilter: PrefilterConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PrefilterConfig {
    pub enabled: bool,
    pub bits_per_key: usize,
    pub hash_count: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            build_batch_size: 5000,
            max_fanout_per_position: 64,
            max_query_keys: 8192,
            prefilter: PrefilterConfig::default(),
        }
    }
}

impl Default for PrefilterConfig {
    fn default() -> Self {
        Self { enabled: true, bits_per_key: 10, hash_count: 3 }
    }
}

impl EngineConfig {
    /// Reads a JSON config file. Missing fields fall back to their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let config: EngineConfig = serde_json::from_reader(reader)?;
        Ok(config.sanitized())
    }

    /// Zero-valued limits would stall the builder or drop every key.
    pub fn sanitized(mut self) -> Self {
        self.build_batch_size = self.build_batch_size.max(1);
        self.max_fanout_per_position = self.max_fanout_per_position.max(1);
        self.max_query_keys = self.max_query_keys.max(1);
        self.prefilter.hash_count = self.prefilter.hash_count.max(1);
        self.prefilter.bits_per_key = self.prefilter.bits_per_key.max(1);
        self
    }
}

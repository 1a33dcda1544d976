//! Ledger configuration.
//!
//! A single `LedgerConfig` tells [`crate::storage::ChainStore`] where the
//! backing file lives and what the genesis block carries. Binaries build it
//! from defaults and command-line / environment overrides.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::block::GENESIS_MARKER;

/// Default backing file, relative to the working directory.
pub const DEFAULT_CHAIN_FILE: &str = "chain.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Path of the JSON file holding the whole chain.
    pub chain_file: PathBuf,
    /// Payload written into the genesis block on bootstrap.
    pub genesis_marker: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            chain_file: PathBuf::from(DEFAULT_CHAIN_FILE),
            genesis_marker: GENESIS_MARKER.to_string(),
        }
    }
}

impl LedgerConfig {
    /// Default config pointed at `path`.
    pub fn at(path: impl AsRef<Path>) -> Self {
        Self::default().with_chain_file(path)
    }

    pub fn with_chain_file(mut self, path: impl AsRef<Path>) -> Self {
        self.chain_file = path.as_ref().to_path_buf();
        self
    }

    pub fn with_genesis_marker(mut self, marker: impl Into<String>) -> Self {
        self.genesis_marker = marker.into();
        self
    }
}

use crate::ballot::Ballot;
use crate::block::Block;
use crate::config::LedgerConfig;
use crate::error::{LedgerError, Result};
use crate::verify::{verify_chain, VerifyReport};
use chrono::Utc;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Sole owner of the chain and its backing file.
///
/// The whole chain lives in memory and is rewritten to a single indented
/// JSON file on every mutation. There is no locking: mutating calls take
/// `&mut self`, and two processes sharing one file will race.
#[derive(Debug)]
pub struct ChainStore {
    path: PathBuf,
    blocks: Vec<Block>,
    outcome: LoadOutcome,
}

/// How [`ChainStore::open`] obtained its chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The backing file parsed into this many blocks.
    Loaded { blocks: usize },
    /// The backing file was missing or invalid and a fresh genesis
    /// chain replaced it.
    Bootstrapped { reason: String },
}

impl ChainStore {
    /// Load the chain from the configured file, or bootstrap a genesis
    /// chain if the file is absent, unreadable or malformed.
    ///
    /// A bad backing file is not an error; it is replaced and the reason
    /// kept in [`ChainStore::load_outcome`]. Only failing to write the new
    /// genesis chain is reported.
    pub fn open(config: &LedgerConfig) -> Result<Self> {
        let path = config.chain_file.clone();
        match read_chain(&path) {
            Ok(blocks) => {
                debug!(path = %path.display(), blocks = blocks.len(), "chain loaded");
                Ok(Self {
                    path,
                    outcome: LoadOutcome::Loaded {
                        blocks: blocks.len(),
                    },
                    blocks,
                })
            }
            Err(reason) => {
                warn!(path = %path.display(), %reason, "bootstrapping genesis chain");
                let store = Self {
                    path,
                    blocks: vec![Block::genesis(Utc::now(), &config.genesis_marker)],
                    outcome: LoadOutcome::Bootstrapped { reason },
                };
                store.persist()?;
                Ok(store)
            }
        }
    }

    /// Append a payload as a new block linked to the current last block.
    pub fn append(&mut self, payload: &str) -> Result<Block> {
        let last = self.last();
        let id = last
            .id
            .checked_add(1)
            .ok_or(LedgerError::IdOverflow(last.id))?;
        let block = Block::new(id, Utc::now(), payload.into(), last.hash.clone());
        self.blocks.push(block.clone());
        if let Err(e) = self.persist() {
            self.blocks.pop();
            return Err(e);
        }
        info!(id = block.id, hash = block.short_hash(), "block appended");
        Ok(block)
    }

    /// Recompute every digest and predecessor link. Read-only.
    pub fn verify(&self) -> VerifyReport {
        let report = verify_chain(&self.blocks);
        debug!(
            valid = report.valid,
            discrepancies = report.discrepancies.len(),
            "chain verified"
        );
        report
    }

    /// Deliberately tamper with a block: overwrite its `data` and nothing
    /// else, then persist.
    ///
    /// The stored `hash` and `prev_hash` are left as they were so that
    /// [`ChainStore::verify`] reports the edit. Returns `false` without
    /// touching anything if no block has `id`.
    pub fn corrupt(&mut self, id: u64, new_data: &str) -> Result<bool> {
        let Some(idx) = self.blocks.iter().position(|b| b.id == id) else {
            return Ok(false);
        };
        let old = std::mem::replace(&mut self.blocks[idx].data, new_data.into());
        if let Err(e) = self.persist() {
            self.blocks[idx].data = old;
            return Err(e);
        }
        warn!(id, "block data overwritten without rehashing");
        Ok(true)
    }

    /// Write a snapshot of the chain to `target` in the backing-file format.
    pub fn export(&self, target: &Path) -> Result<()> {
        write_chain(target, &self.blocks)?;
        info!(target = %target.display(), blocks = self.blocks.len(), "chain exported");
        Ok(())
    }

    /// All blocks in chain order.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Look up a block by id.
    pub fn get(&self, id: u64) -> Option<&Block> {
        self.blocks.iter().find(|b| b.id == id)
    }

    pub fn last(&self) -> &Block {
        // `open` never leaves the chain empty and blocks are never removed.
        &self.blocks[self.blocks.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load_outcome(&self) -> &LoadOutcome {
        &self.outcome
    }

    /// Chain statistics.
    pub fn stats(&self) -> Result<ChainStats> {
        Ok(ChainStats {
            block_count: self.blocks.len(),
            ballot_count: self
                .blocks
                .iter()
                .filter(|b| Ballot::from_payload(&b.data).is_some())
                .count(),
            last_id: self.last().id,
            disk_usage: fs::metadata(&self.path)?.len(),
        })
    }

    fn persist(&self) -> Result<()> {
        write_chain(&self.path, &self.blocks)
    }
}

/// Read and parse a chain file. Errors are returned as text because the
/// caller only logs them before bootstrapping.
fn read_chain(path: &Path) -> std::result::Result<Vec<Block>, String> {
    let data = fs::read(path).map_err(|e| format!("cannot read chain file: {}", e))?;
    let blocks: Vec<Block> =
        serde_json::from_slice(&data).map_err(|e| format!("malformed chain file: {}", e))?;
    if blocks.is_empty() {
        return Err("chain file holds no blocks".into());
    }
    Ok(blocks)
}

fn write_chain(path: &Path, blocks: &[Block]) -> Result<()> {
    let data = serde_json::to_vec_pretty(blocks)?;
    fs::write(path, data)?;
    Ok(())
}

/// Chain statistics.
#[derive(Debug, Clone)]
pub struct ChainStats {
    pub block_count: usize,
    pub ballot_count: usize,
    pub last_id: u64,
    pub disk_usage: u64,
}

impl fmt::Display for ChainStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Blocks:   {}", self.block_count)?;
        writeln!(f, "Ballots:  {}", self.ballot_count)?;
        writeln!(f, "Last id:  {}", self.last_id)?;
        writeln!(f, "Disk:     {} bytes", self.disk_usage)?;
        Ok(())
    }
}

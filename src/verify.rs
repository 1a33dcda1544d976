use crate::block::{Block, BlockHash};
use std::fmt;

/// One integrity problem found by a verification pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Discrepancy {
    /// The block's stored hash no longer matches its own fields.
    HashMismatch {
        id: u64,
        recomputed: BlockHash,
        stored: BlockHash,
    },
    /// The block's `prev_hash` does not match its predecessor's stored hash.
    PrevHashMismatch {
        id: u64,
        prev_hash: BlockHash,
        predecessor_hash: BlockHash,
    },
}

impl Discrepancy {
    /// Id of the block the problem is attributed to.
    pub fn block_id(&self) -> u64 {
        match self {
            Discrepancy::HashMismatch { id, .. } | Discrepancy::PrevHashMismatch { id, .. } => *id,
        }
    }
}

impl fmt::Display for Discrepancy {
    /// `{}` gives the short form, `{:#}` adds the compared hashes.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Discrepancy::HashMismatch {
                id,
                recomputed,
                stored,
            } => {
                write!(f, "block {} hash mismatch", id)?;
                if f.alternate() {
                    write!(f, " (recomputed {} != stored {})", recomputed, stored)?;
                }
            }
            Discrepancy::PrevHashMismatch {
                id,
                prev_hash,
                predecessor_hash,
            } => {
                write!(f, "block {} prev_hash mismatch", id)?;
                if f.alternate() {
                    write!(f, " ({} != predecessor {})", prev_hash, predecessor_hash)?;
                }
            }
        }
        Ok(())
    }
}

/// Outcome of a verification pass, discrepancies in chain order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifyReport {
    pub valid: bool,
    pub discrepancies: Vec<Discrepancy>,
}

impl VerifyReport {
    /// Short human-readable description of each discrepancy.
    pub fn messages(&self) -> Vec<String> {
        self.discrepancies.iter().map(|d| d.to_string()).collect()
    }

    /// `(valid, messages)` pair for callers that only display results.
    pub fn into_parts(self) -> (bool, Vec<String>) {
        let messages = self.messages();
        (self.valid, messages)
    }
}

/// Recompute every digest and check every predecessor link.
///
/// Each block can contribute up to two independent discrepancies. The
/// link check compares stored hashes only, so tampering with one block's
/// data does not cascade into its successor.
pub fn verify_chain(blocks: &[Block]) -> VerifyReport {
    let mut discrepancies = Vec::new();

    for (i, block) in blocks.iter().enumerate() {
        let recomputed = block.digest();
        if recomputed != block.hash {
            discrepancies.push(Discrepancy::HashMismatch {
                id: block.id,
                recomputed,
                stored: block.hash.clone(),
            });
        }

        if i > 0 {
            let prev = &blocks[i - 1];
            if block.prev_hash != prev.hash {
                discrepancies.push(Discrepancy::PrevHashMismatch {
                    id: block.id,
                    prev_hash: block.prev_hash.clone(),
                    predecessor_hash: prev.hash.clone(),
                });
            }
        }
    }

    VerifyReport {
        valid: discrepancies.is_empty(),
        discrepancies,
    }
}

//! Tamper-evident append-only ledger for classroom voting.
//!
//! A [`storage::ChainStore`] owns a hash-linked sequence of
//! [`block::Block`]s persisted as one JSON file. [`ballot`] layers the
//! vote record and one-vote-per-student rule on top of it.

pub mod ballot;
pub mod block;
pub mod config;
pub mod error;
pub mod storage;
pub mod verify;

pub use ballot::Ballot;
pub use block::Block;
pub use config::LedgerConfig;
pub use error::{LedgerError, Result};
pub use storage::{ChainStore, LoadOutcome};
pub use verify::{Discrepancy, VerifyReport};

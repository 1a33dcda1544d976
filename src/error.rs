use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Block id overflow after {0}")]
    IdOverflow(u64),

    #[error("Block not found: {0}")]
    BlockNotFound(u64),

    #[error("Invalid ballot: {0}")]
    InvalidBallot(String),

    #[error("Student {0} has already voted")]
    DuplicateVote(String),
}

pub type Result<T> = std::result::Result<T, LedgerError>;

//! Vote records carried in block payloads.
//!
//! The ledger treats payloads as opaque text. This module is the voting
//! front end's view of them: a ballot is a compact JSON object, and the
//! one-vote-per-student rule is enforced here by scanning the chain, not
//! by the store.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::block::Block;
use crate::error::{LedgerError, Result};
use crate::storage::ChainStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ballot {
    #[serde(alias = "estudiante_nombre")]
    pub student_name: String,
    #[serde(alias = "estudiante_apellido")]
    pub student_surname: String,
    #[serde(alias = "estudiante_id")]
    pub student_id: String,
    #[serde(alias = "candidato")]
    pub candidate: String,
}

impl Ballot {
    /// Validate and build a ballot. Fields are trimmed; the student id
    /// must be all digits.
    pub fn new(name: &str, surname: &str, student_id: &str, candidate: &str) -> Result<Self> {
        let ballot = Self {
            student_name: name.trim().to_string(),
            student_surname: surname.trim().to_string(),
            student_id: student_id.trim().to_string(),
            candidate: candidate.trim().to_string(),
        };
        for (field, value) in [
            ("student_name", &ballot.student_name),
            ("student_surname", &ballot.student_surname),
            ("student_id", &ballot.student_id),
            ("candidate", &ballot.candidate),
        ] {
            if value.is_empty() {
                return Err(LedgerError::InvalidBallot(format!("{} is empty", field)));
            }
        }
        if !ballot.student_id.chars().all(|c| c.is_ascii_digit()) {
            return Err(LedgerError::InvalidBallot(format!(
                "student id must contain only digits: {}",
                ballot.student_id
            )));
        }
        Ok(ballot)
    }

    /// Payload text stored in a block.
    pub fn to_payload(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a block payload; `None` for anything that is not a ballot.
    pub fn from_payload(data: &str) -> Option<Self> {
        serde_json::from_str(data).ok()
    }
}

/// Whether any block already carries a ballot from `student_id`.
pub fn has_voted(blocks: &[Block], student_id: &str) -> bool {
    let student_id = student_id.trim();
    blocks
        .iter()
        .filter_map(|b| Ballot::from_payload(&b.data))
        .any(|ballot| ballot.student_id == student_id)
}

/// Ballot count per candidate, ordered by candidate name.
pub fn tally(blocks: &[Block]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for ballot in blocks.iter().filter_map(|b| Ballot::from_payload(&b.data)) {
        *counts.entry(ballot.candidate).or_insert(0) += 1;
    }
    counts
}

/// Record a ballot unless the student already voted.
pub fn cast(store: &mut ChainStore, ballot: &Ballot) -> Result<Block> {
    if has_voted(store.blocks(), &ballot.student_id) {
        return Err(LedgerError::DuplicateVote(ballot.student_id.clone()));
    }
    let block = store.append(&ballot.to_payload()?)?;
    info!(block = block.id, candidate = %ballot.candidate, "ballot recorded");
    Ok(block)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LedgerConfig;

    fn ballot(id: &str, candidate: &str) -> Ballot {
        Ballot::new("Ana", "Ruiz", id, candidate).unwrap()
    }

    fn test_store() -> (tempfile::TempDir, ChainStore) {
        let tmp = tempfile::tempdir().unwrap();
        let store = ChainStore::open(&LedgerConfig::at(tmp.path().join("chain.json"))).unwrap();
        (tmp, store)
    }

    #[test]
    fn rejects_incomplete_ballot() {
        assert!(matches!(
            Ballot::new("Ana", "  ", "123", "Lista A"),
            Err(LedgerError::InvalidBallot(_))
        ));
    }

    #[test]
    fn rejects_non_numeric_student_id() {
        assert!(matches!(
            Ballot::new("Ana", "Ruiz", "12a", "Lista A"),
            Err(LedgerError::InvalidBallot(_))
        ));
    }

    #[test]
    fn payload_parses_back() {
        let b = ballot("2024001", "Lista A");
        let payload = b.to_payload().unwrap();
        assert_eq!(Ballot::from_payload(&payload), Some(b));
        assert_eq!(Ballot::from_payload("Genesis Block"), None);
    }

    #[test]
    fn spanish_payload_keys_are_read() {
        let payload = r#"{"estudiante_nombre": "Ana", "estudiante_apellido": "Ruiz", "estudiante_id": "2024001", "candidato": "Vicente Fernández"}"#;
        let b = Ballot::from_payload(payload).unwrap();
        assert_eq!(b, Ballot::new("Ana", "Ruiz", "2024001", "Vicente Fernández").unwrap());
    }

    #[test]
    fn duplicate_vote_refused() {
        let (_tmp, mut store) = test_store();
        cast(&mut store, &ballot("42", "Lista A")).unwrap();
        let err = cast(&mut store, &ballot("42", "Lista B")).unwrap_err();
        assert!(matches!(err, LedgerError::DuplicateVote(id) if id == "42"));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn has_voted_ignores_foreign_payloads() {
        let (_tmp, mut store) = test_store();
        store.append("not a ballot").unwrap();
        store.append(r#"{"student_id":"7"}"#).unwrap();
        assert!(!has_voted(store.blocks(), "7"));
        cast(&mut store, &ballot("7", "Lista A")).unwrap();
        assert!(has_voted(store.blocks(), " 7 "));
    }

    #[test]
    fn tally_counts_per_candidate() {
        let (_tmp, mut store) = test_store();
        cast(&mut store, &ballot("1", "Lista B")).unwrap();
        cast(&mut store, &ballot("2", "Lista A")).unwrap();
        cast(&mut store, &ballot("3", "Lista B")).unwrap();
        let counts = tally(store.blocks());
        let pairs: Vec<_> = counts.iter().map(|(k, v)| (k.as_str(), *v)).collect();
        assert_eq!(pairs, vec![("Lista A", 1), ("Lista B", 2)]);
    }
}

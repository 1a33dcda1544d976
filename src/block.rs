use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// SHA-256 hash as lowercase hex string.
pub type BlockHash = String;

/// Predecessor link carried by the genesis block.
pub const GENESIS_PREV_HASH: &str =
    "0000000000000000000000000000000000000000000000000000000000000000";

/// Default payload of the genesis block.
pub const GENESIS_MARKER: &str = "Genesis Block";

/// One ledger entry, bound to its predecessor through `prev_hash`.
///
/// Every field is kept exactly as stored, `timestamp` included, and the
/// digest runs over that text. Nothing is recomputed or normalized on load,
/// so an out-of-band edit to any field shows up in [`Block::is_intact`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Block {
    pub id: u64,
    pub timestamp: String,
    pub data: String,
    pub prev_hash: BlockHash,
    #[serde(alias = "hash_actual")]
    pub hash: BlockHash,
}

impl Block {
    /// Build a block stamped with `timestamp`; the hash is computed from
    /// the other fields.
    pub fn new(id: u64, timestamp: DateTime<Utc>, data: String, prev_hash: BlockHash) -> Self {
        let timestamp = format_timestamp(&timestamp);
        let hash = digest_fields(id, &timestamp, &data, &prev_hash);
        Self {
            id,
            timestamp,
            data,
            prev_hash,
            hash,
        }
    }

    /// Build a block from stored text, with an explicit, possibly stale, hash.
    pub fn from_parts(
        id: u64,
        timestamp: String,
        data: String,
        prev_hash: BlockHash,
        hash: BlockHash,
    ) -> Self {
        Self {
            id,
            timestamp,
            data,
            prev_hash,
            hash,
        }
    }

    /// The first block of a chain.
    pub fn genesis(timestamp: DateTime<Utc>, marker: &str) -> Self {
        Self::new(0, timestamp, marker.into(), GENESIS_PREV_HASH.into())
    }

    /// Recompute the digest from the block's current fields.
    pub fn digest(&self) -> BlockHash {
        digest_fields(self.id, &self.timestamp, &self.data, &self.prev_hash)
    }

    /// Whether the stored hash still matches the block's contents.
    pub fn is_intact(&self) -> bool {
        self.digest() == self.hash
    }

    /// The stored timestamp as an instant. Accepts RFC 3339 and offset-less
    /// ISO-8601 text (read as UTC); `None` if it is neither.
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.timestamp)
    }

    /// Abbreviated hash for display.
    pub fn short_hash(&self) -> &str {
        &self.hash[..8.min(self.hash.len())]
    }
}

/// Text form given to new block timestamps: RFC 3339, UTC, microseconds.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse stored timestamp text.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Compute the SHA-256 hex digest of some data.
pub fn compute_hash(data: &[u8]) -> BlockHash {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

fn digest_fields(id: u64, timestamp: &str, data: &str, prev_hash: &str) -> BlockHash {
    let payload = format!("{}|{}|{}|{}", id, timestamp, data, prev_hash);
    compute_hash(payload.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap()
    }

    #[test]
    fn digest_matches_pipe_joined_fields() {
        let b = Block::new(3, fixed_ts(), "vote".into(), "ab".repeat(32));
        let expected = compute_hash(
            format!("3|2024-05-01T12:30:00.000000Z|vote|{}", "ab".repeat(32)).as_bytes(),
        );
        assert_eq!(b.hash, expected);
        assert_eq!(b.hash.len(), 64);
        assert!(b.hash.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn genesis_shape() {
        let g = Block::genesis(fixed_ts(), GENESIS_MARKER);
        assert_eq!(g.id, 0);
        assert_eq!(g.prev_hash.len(), 64);
        assert!(g.prev_hash.chars().all(|c| c == '0'));
        let expected = compute_hash(
            format!("0|{}|{}|{}", g.timestamp, GENESIS_MARKER, GENESIS_PREV_HASH).as_bytes(),
        );
        assert_eq!(g.hash, expected);
    }

    #[test]
    fn new_timestamps_use_micros() {
        let ts = Utc.timestamp_opt(1_700_000_000, 123_456_789).unwrap();
        let b = Block::new(1, ts, "x".into(), GENESIS_PREV_HASH.into());
        assert_eq!(b.timestamp, "2023-11-14T22:13:20.123456Z");
        assert!(b.is_intact());
    }

    #[test]
    fn digest_covers_timestamp_text_verbatim() {
        // Offset-less ISO-8601, as older chain files carry.
        let b = Block::from_parts(
            1,
            "2024-05-01T12:31:00".into(),
            "x".into(),
            GENESIS_PREV_HASH.into(),
            "a9d17dde28d04bfd65082a0ea15c32a846332e7f623d233996087247b5f5f963".into(),
        );
        assert!(b.is_intact());

        let mut same_instant = b.clone();
        same_instant.timestamp = "2024-05-01T12:31:00+00:00".into();
        assert_eq!(same_instant.created_at(), b.created_at());
        assert!(!same_instant.is_intact());
    }

    #[test]
    fn created_at_parses_both_forms() {
        let expected = Utc.with_ymd_and_hms(2024, 5, 1, 12, 31, 0).unwrap();
        for raw in ["2024-05-01T12:31:00", "2024-05-01T12:31:00.000000Z"] {
            assert_eq!(parse_timestamp(raw), Some(expected), "{}", raw);
        }
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn from_parts_keeps_supplied_hash() {
        let b = Block::from_parts(
            1,
            "2024-05-01T12:30:00".into(),
            "x".into(),
            GENESIS_PREV_HASH.into(),
            "e".repeat(64),
        );
        assert_eq!(b.hash, "e".repeat(64));
        assert!(!b.is_intact());
        assert_eq!(b.short_hash(), "eeeeeeee");
    }

    #[test]
    fn tampered_data_fails_integrity() {
        let mut b = Block::new(1, fixed_ts(), "original".into(), GENESIS_PREV_HASH.into());
        b.data = "tampered".into();
        assert!(!b.is_intact());
    }

    #[test]
    fn stored_fields_survive_deserialization() {
        let json = format!(
            r#"{{"id":1,"timestamp":"2024-05-01 12:30","data":"x","prev_hash":"{}","hash":"{}"}}"#,
            GENESIS_PREV_HASH,
            "f".repeat(64)
        );
        let b: Block = serde_json::from_str(&json).unwrap();
        assert_eq!(b.timestamp, "2024-05-01 12:30");
        assert_eq!(b.hash, "f".repeat(64));
        assert!(!b.is_intact());
        assert_eq!(serde_json::to_value(&b).unwrap()["timestamp"], "2024-05-01 12:30");
    }

    #[test]
    fn legacy_hash_field_is_accepted() {
        let good = Block::new(2, fixed_ts(), "y".into(), GENESIS_PREV_HASH.into());
        let json = format!(
            r#"{{"id":2,"timestamp":"{}","data":"y","prev_hash":"{}","hash_actual":"{}"}}"#,
            good.timestamp, GENESIS_PREV_HASH, good.hash
        );
        let b: Block = serde_json::from_str(&json).unwrap();
        assert_eq!(b, good);
    }
}

//! Interaction check audit log (append-only, hash-chained).
//!
//! `record_hash = sha256(prev_hash || payload)`, hex-encoded, where payload
//! is the canonical JSON of the record. The first record chains from
//! [`GENESIS_HASH`].

use rusqlite::{params, OptionalExtension, Row};
use sha2::{Digest, Sha256};

use super::{Database, DbResult};
use crate::models::{InteractionCheckRecord, StoredCheck};

/// Previous-hash value of the first record in the chain.
pub const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// Outcome of re-verifying the audit chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainStatus {
    /// Records examined (up to and including the first broken link)
    pub checked: usize,
    /// Check id of the first record whose link does not verify
    pub first_broken: Option<String>,
}

impl ChainStatus {
    pub fn is_intact(&self) -> bool {
        self.first_broken.is_none()
    }
}

/// SHA-256 of `data`, hex-encoded.
pub fn hash_data(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Chain link hash for a payload.
pub fn chain_hash(prev_hash: &str, payload: &str) -> String {
    hash_data(format!("{}{}", prev_hash, payload).as_bytes())
}

impl Database {
    /// Append a check record to the chain.
    pub fn append_check(&self, record: &InteractionCheckRecord) -> DbResult<StoredCheck> {
        let payload = record.to_canonical_json()?;
        let tx = self.conn.unchecked_transaction()?;

        let prev_hash: String = tx
            .query_row(
                "SELECT record_hash FROM interaction_checks ORDER BY seq DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?
            .unwrap_or_else(|| GENESIS_HASH.to_string());
        let record_hash = chain_hash(&prev_hash, &payload);

        tx.execute(
            r#"
            INSERT INTO interaction_checks (
                check_id, user_id, risk_score, checked_at, payload, prev_hash, record_hash
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                record.check_id,
                record.user_id,
                record.risk_score,
                record.checked_at,
                payload,
                prev_hash,
                record_hash,
            ],
        )?;
        let seq = tx.last_insert_rowid();
        tx.commit()?;

        Ok(StoredCheck {
            seq,
            record: record.clone(),
            prev_hash,
            record_hash,
        })
    }

    /// Get a stored check by id.
    pub fn get_check(&self, check_id: &str) -> DbResult<Option<StoredCheck>> {
        let row = self
            .conn
            .query_row(
                r#"
                SELECT seq, payload, prev_hash, record_hash
                FROM interaction_checks
                WHERE check_id = ?
                "#,
                [check_id],
                CheckRow::from_row,
            )
            .optional()?;

        row.map(StoredCheck::try_from).transpose()
    }

    /// A user's most recent checks, newest first.
    pub fn recent_checks(&self, user_id: &str, limit: usize) -> DbResult<Vec<StoredCheck>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT seq, payload, prev_hash, record_hash
            FROM interaction_checks
            WHERE user_id = ?1
            ORDER BY seq DESC
            LIMIT ?2
            "#,
        )?;

        let rows = stmt.query_map(params![user_id, limit as i64], CheckRow::from_row)?;

        let mut checks = Vec::new();
        for row in rows {
            checks.push(row?.try_into()?);
        }
        Ok(checks)
    }

    /// Total number of recorded checks.
    pub fn check_count(&self) -> DbResult<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM interaction_checks", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Recompute every link of the chain in append order.
    pub fn verify_chain(&self) -> DbResult<ChainStatus> {
        let mut stmt = self.conn.prepare(
            "SELECT check_id, payload, prev_hash, record_hash FROM interaction_checks ORDER BY seq",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;

        let mut expected_prev = GENESIS_HASH.to_string();
        let mut checked = 0;
        for row in rows {
            let (check_id, payload, prev_hash, record_hash) = row?;
            checked += 1;
            if prev_hash != expected_prev || chain_hash(&prev_hash, &payload) != record_hash {
                return Ok(ChainStatus {
                    checked,
                    first_broken: Some(check_id),
                });
            }
            expected_prev = record_hash;
        }

        Ok(ChainStatus {
            checked,
            first_broken: None,
        })
    }
}

/// Intermediate row struct for database mapping.
struct CheckRow {
    seq: i64,
    payload: String,
    prev_hash: String,
    record_hash: String,
}

impl CheckRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(CheckRow {
            seq: row.get(0)?,
            payload: row.get(1)?,
            prev_hash: row.get(2)?,
            record_hash: row.get(3)?,
        })
    }
}

impl TryFrom<CheckRow> for StoredCheck {
    type Error = super::DbError;

    fn try_from(row: CheckRow) -> Result<Self, Self::Error> {
        Ok(StoredCheck {
            seq: row.seq,
            record: serde_json::from_str(&row.payload)?,
            prev_hash: row.prev_hash,
            record_hash: row.record_hash,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Medication;

    fn record(user: &str, risk: u32) -> InteractionCheckRecord {
        InteractionCheckRecord::new(
            user,
            vec![Medication::new("Warfarin", "5mg"), Medication::new("Aspirin", "81mg")],
            Some(70),
            vec![],
            vec![],
            risk,
        )
    }

    #[test]
    fn test_hash_data() {
        assert_eq!(
            hash_data(b"hello"),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn test_first_record_chains_from_genesis() {
        let db = Database::open_in_memory().unwrap();
        let stored = db.append_check(&record("u1", 0)).unwrap();
        assert_eq!(stored.prev_hash, GENESIS_HASH);
        assert_eq!(stored.record_hash.len(), 64);
    }

    #[test]
    fn test_chain_links() {
        let db = Database::open_in_memory().unwrap();
        let first = db.append_check(&record("u1", 1)).unwrap();
        let second = db.append_check(&record("u2", 2)).unwrap();
        assert_eq!(second.prev_hash, first.record_hash);
        assert!(second.seq > first.seq);

        let status = db.verify_chain().unwrap();
        assert!(status.is_intact());
        assert_eq!(status.checked, 2);
    }

    #[test]
    fn test_get_check_roundtrip() {
        let db = Database::open_in_memory().unwrap();
        let rec = record("u1", 4);
        let stored = db.append_check(&rec).unwrap();

        let loaded = db.get_check(&rec.check_id).unwrap().unwrap();
        assert_eq!(loaded, stored);
        assert!(db.get_check("missing").unwrap().is_none());
    }

    #[test]
    fn test_recent_checks_newest_first() {
        let db = Database::open_in_memory().unwrap();
        for risk in 0..12 {
            db.append_check(&record("u1", risk % 5)).unwrap();
        }
        db.append_check(&record("u2", 3)).unwrap();

        let history = db.recent_checks("u1", 10).unwrap();
        assert_eq!(history.len(), 10);
        assert!(history.windows(2).all(|w| w[0].seq > w[1].seq));
        assert!(history.iter().all(|c| c.record.user_id == "u1"));
        assert_eq!(db.check_count().unwrap(), 13);
    }

    #[test]
    fn test_update_and_delete_rejected() {
        let db = Database::open_in_memory().unwrap();
        db.append_check(&record("u1", 0)).unwrap();

        assert!(db
            .conn()
            .execute("UPDATE interaction_checks SET risk_score = 4", [])
            .is_err());
        assert!(db.conn().execute("DELETE FROM interaction_checks", []).is_err());
        assert_eq!(db.check_count().unwrap(), 1);
    }
}

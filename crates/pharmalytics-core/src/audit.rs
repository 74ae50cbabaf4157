//! Audit recording for interaction checks and AI analyses.

use thiserror::Error;

use crate::db::{Database, DbError};
use crate::models::{AiAnalysisRecord, InteractionCheckRecord};

/// Audit errors.
#[derive(Error, Debug)]
pub enum AuditError {
    #[error("Audit store error: {0}")]
    Store(#[from] DbError),

    #[error("Audit store unavailable: {0}")]
    Unavailable(String),
}

/// Append-only sink for check records.
pub trait AuditRecorder {
    /// Persist a record, returning its check id.
    fn record(&self, record: &InteractionCheckRecord) -> Result<String, AuditError>;
}

/// Sink for standalone AI analysis log entries.
pub trait AnalysisLog {
    fn log_analysis(&self, record: &AiAnalysisRecord) -> Result<(), AuditError>;
}

impl AuditRecorder for Database {
    fn record(&self, record: &InteractionCheckRecord) -> Result<String, AuditError> {
        let stored = self.append_check(record)?;
        tracing::debug!(
            check_id = %stored.record.check_id,
            seq = stored.seq,
            record_hash = %stored.record_hash,
            "Recorded interaction check"
        );
        Ok(stored.record.check_id)
    }
}

impl AnalysisLog for Database {
    fn log_analysis(&self, record: &AiAnalysisRecord) -> Result<(), AuditError> {
        self.insert_ai_analysis(record)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Medication;

    #[test]
    fn test_record_returns_check_id() {
        let db = Database::open_in_memory().unwrap();
        let record = InteractionCheckRecord::new(
            "u1",
            vec![Medication::new("a", ""), Medication::new("b", "")],
            None,
            vec![],
            vec![],
            0,
        );
        let id = db.record(&record).unwrap();
        assert_eq!(id, record.check_id);
        assert_eq!(db.check_count().unwrap(), 1);
    }

    #[test]
    fn test_duplicate_check_id_rejected() {
        let db = Database::open_in_memory().unwrap();
        let record = InteractionCheckRecord::new("u1", vec![], None, vec![], vec![], 0);
        db.record(&record).unwrap();
        assert!(matches!(
            db.record(&record),
            Err(AuditError::Store(DbError::Constraint(_)))
        ));
    }
}

//! AI analysis log operations.

use pharmalytics_llm::TaskKind;
use rusqlite::params;

use super::{Database, DbError, DbResult};
use crate::models::AiAnalysisRecord;

impl Database {
    /// Append an analysis log entry.
    pub fn insert_ai_analysis(&self, record: &AiAnalysisRecord) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO ai_analyses (
                analysis_id, user_id, analysis_type, input_data, result_data,
                processing_time, model_version, confidence_score, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                record.analysis_id,
                record.user_id,
                record.analysis_type.as_str(),
                serde_json::to_string(&record.input_data)?,
                serde_json::to_string(&record.result_data)?,
                record.processing_time,
                record.model_version,
                record.confidence_score,
                record.created_at,
            ],
        )?;
        Ok(())
    }

    /// A user's analyses, newest first.
    pub fn recent_ai_analyses(&self, user_id: &str, limit: usize) -> DbResult<Vec<AiAnalysisRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT analysis_id, user_id, analysis_type, input_data, result_data,
                   processing_time, model_version, confidence_score, created_at
            FROM ai_analyses
            WHERE user_id = ?1
            ORDER BY rowid DESC
            LIMIT ?2
            "#,
        )?;

        let rows = stmt.query_map(params![user_id, limit as i64], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, f64>(5)?,
                row.get::<_, String>(6)?,
                row.get::<_, Option<f64>>(7)?,
                row.get::<_, String>(8)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (
                analysis_id,
                user_id,
                kind,
                input,
                result,
                processing_time,
                model_version,
                confidence_score,
                created_at,
            ) = row?;
            let analysis_type = TaskKind::from_label(&kind)
                .ok_or_else(|| DbError::InvalidData(format!("analysis type {}", kind)))?;
            records.push(AiAnalysisRecord {
                analysis_id,
                user_id,
                analysis_type,
                input_data: serde_json::from_str(&input)?,
                result_data: serde_json::from_str(&result)?,
                processing_time,
                model_version,
                confidence_score,
                created_at,
            });
        }
        Ok(records)
    }
}

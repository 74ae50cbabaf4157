//! Known interaction operations.

use rusqlite::{params, OptionalExtension, Row};

use super::{name_needle, Database, DbError, DbResult};
use crate::models::KnownInteraction;

impl Database {
    /// Insert a known interaction. A second record for the same unordered
    /// pair is rejected with [`DbError::Constraint`].
    pub fn insert_interaction(&self, interaction: &KnownInteraction) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO drug_interactions (
                interaction_id, drug1_id, drug2_id, severity, description, mechanism,
                clinical_effects, management_recommendations, evidence_level, citations
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                interaction.interaction_id,
                interaction.drug1_id,
                interaction.drug2_id,
                interaction.severity.as_str(),
                interaction.description,
                interaction.mechanism,
                serde_json::to_string(&interaction.clinical_effects)?,
                interaction.management_recommendations,
                interaction.evidence_level,
                serde_json::to_string(&interaction.references)?,
            ],
        )?;
        Ok(())
    }

    /// Symmetric lookup by case-insensitive substring of the canonical
    /// names, folded with Unicode rules. The first match in store order wins; blank names match nothing.
    pub fn interaction_between(&self, name_a: &str, name_b: &str) -> DbResult<Option<KnownInteraction>> {
        let (Some(a), Some(b)) = (name_needle(name_a), name_needle(name_b)) else {
            return Ok(None);
        };

        let row = self
            .conn
            .query_row(
                r#"
                SELECT i.interaction_id, i.drug1_id, i.drug2_id, d1.name, d2.name,
                       i.severity, i.description, i.mechanism, i.clinical_effects,
                       i.management_recommendations, i.evidence_level, i.citations
                FROM drug_interactions i
                JOIN drugs d1 ON d1.drug_id = i.drug1_id
                JOIN drugs d2 ON d2.drug_id = i.drug2_id
                WHERE (instr(d1.name_folded, ?1) > 0 AND instr(d2.name_folded, ?2) > 0)
                   OR (instr(d1.name_folded, ?2) > 0 AND instr(d2.name_folded, ?1) > 0)
                ORDER BY i.rowid
                LIMIT 1
                "#,
                params![a, b],
                InteractionRow::from_row,
            )
            .optional()?;

        row.map(KnownInteraction::try_from).transpose()
    }
}

/// Intermediate row struct for database mapping.
struct InteractionRow {
    interaction_id: String,
    drug1_id: String,
    drug2_id: String,
    drug1_name: String,
    drug2_name: String,
    severity: String,
    description: String,
    mechanism: String,
    clinical_effects: String,
    management_recommendations: String,
    evidence_level: String,
    citations: String,
}

impl InteractionRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(InteractionRow {
            interaction_id: row.get(0)?,
            drug1_id: row.get(1)?,
            drug2_id: row.get(2)?,
            drug1_name: row.get(3)?,
            drug2_name: row.get(4)?,
            severity: row.get(5)?,
            description: row.get(6)?,
            mechanism: row.get(7)?,
            clinical_effects: row.get(8)?,
            management_recommendations: row.get(9)?,
            evidence_level: row.get(10)?,
            citations: row.get(11)?,
        })
    }
}

impl TryFrom<InteractionRow> for KnownInteraction {
    type Error = DbError;

    fn try_from(row: InteractionRow) -> Result<Self, Self::Error> {
        Ok(KnownInteraction {
            interaction_id: row.interaction_id,
            drug1_id: row.drug1_id,
            drug2_id: row.drug2_id,
            drug1_name: row.drug1_name,
            drug2_name: row.drug2_name,
            severity: row
                .severity
                .parse()
                .map_err(|e| DbError::InvalidData(format!("{}", e)))?,
            description: row.description,
            mechanism: row.mechanism,
            clinical_effects: serde_json::from_str(&row.clinical_effects)?,
            management_recommendations: row.management_recommendations,
            evidence_level: row.evidence_level,
            references: serde_json::from_str(&row.citations)?,
        })
    }
}

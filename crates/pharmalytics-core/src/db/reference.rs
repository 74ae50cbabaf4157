//! Dosage and alternative-medication reference operations.

use rusqlite::params;

use super::{Database, DbResult};
use crate::models::{AlternativeMedication, DosageRecommendation};

impl Database {
    /// Insert a dosage row.
    pub fn insert_dosage_recommendation(&self, rec: &DosageRecommendation) -> DbResult<i64> {
        self.conn.execute(
            r#"
            INSERT INTO dosage_recommendations (
                drug_id, age_group, min_age, max_age, weight_min, weight_max,
                indication, dosage_amount, frequency, route, duration, special_considerations
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
            params![
                rec.drug_id,
                rec.age_group,
                rec.min_age,
                rec.max_age,
                rec.weight_min,
                rec.weight_max,
                rec.indication,
                rec.dosage_amount,
                rec.frequency,
                rec.route,
                rec.duration,
                rec.special_considerations,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Insert an alternative for a drug.
    pub fn insert_alternative(&self, alt: &AlternativeMedication) -> DbResult<i64> {
        self.conn.execute(
            r#"
            INSERT INTO alternative_medications (
                original_drug_id, alternative_drug_id, reason, efficacy_comparison,
                safety_profile, cost_comparison, therapeutic_equivalence
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                alt.original_drug_id,
                alt.alternative_drug_id,
                alt.reason,
                alt.efficacy_comparison,
                alt.safety_profile,
                alt.cost_comparison,
                alt.therapeutic_equivalence,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// All dosage rows for a drug id, in insertion order.
    pub fn dosage_recommendations(&self, drug_id: &str) -> DbResult<Vec<DosageRecommendation>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT drug_id, age_group, min_age, max_age, weight_min, weight_max,
                   indication, dosage_amount, frequency, route, duration, special_considerations
            FROM dosage_recommendations
            WHERE drug_id = ?1
            ORDER BY id
            "#,
        )?;

        let rows = stmt.query_map([drug_id], |row| {
            Ok(DosageRecommendation {
                drug_id: row.get(0)?,
                age_group: row.get(1)?,
                min_age: row.get(2)?,
                max_age: row.get(3)?,
                weight_min: row.get(4)?,
                weight_max: row.get(5)?,
                indication: row.get(6)?,
                dosage_amount: row.get(7)?,
                frequency: row.get(8)?,
                route: row.get(9)?,
                duration: row.get(10)?,
                special_considerations: row.get(11)?,
            })
        })?;

        let mut recommendations = Vec::new();
        for row in rows {
            recommendations.push(row?);
        }
        Ok(recommendations)
    }

    /// First dosage row for the named drug whose age band covers `age`
    /// (see [`DosageRecommendation::covers_age`]).
    pub fn dosage_for_age(&self, drug_name: &str, age: u32) -> DbResult<Option<DosageRecommendation>> {
        let Some(drug) = self.find_drug_by_name(drug_name)? else {
            return Ok(None);
        };

        Ok(self
            .dosage_recommendations(&drug.drug_id)?
            .into_iter()
            .find(|rec| rec.covers_age(age)))
    }

    /// Alternatives for the named drug, in insertion order, capped at `limit`.
    pub fn alternatives_for(&self, drug_name: &str, limit: usize) -> DbResult<Vec<AlternativeMedication>> {
        let Some(drug) = self.find_drug_by_name(drug_name)? else {
            return Ok(Vec::new());
        };

        let mut stmt = self.conn.prepare(
            r#"
            SELECT a.original_drug_id, a.alternative_drug_id, d.name, a.reason,
                   a.efficacy_comparison, a.safety_profile, a.cost_comparison,
                   a.therapeutic_equivalence
            FROM alternative_medications a
            JOIN drugs d ON d.drug_id = a.alternative_drug_id
            WHERE a.original_drug_id = ?1
            ORDER BY a.id
            LIMIT ?2
            "#,
        )?;

        let rows = stmt.query_map(params![drug.drug_id, limit as i64], |row| {
            Ok(AlternativeMedication {
                original_drug_id: row.get(0)?,
                alternative_drug_id: row.get(1)?,
                alternative_name: row.get(2)?,
                reason: row.get(3)?,
                efficacy_comparison: row.get(4)?,
                safety_profile: row.get(5)?,
                cost_comparison: row.get(6)?,
                therapeutic_equivalence: row.get(7)?,
            })
        })?;

        let mut alternatives = Vec::new();
        for row in rows {
            alternatives.push(row?);
        }
        Ok(alternatives)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Drug;

    fn setup_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        for (id, name) in [
            ("DB00682", "Warfarin"),
            ("DB06605", "Apixaban"),
            ("DB06228", "Rivaroxaban"),
            ("DB08816", "Ticagrelor"),
            ("DB00758", "Clopidogrel"),
            ("DB00945", "Aspirin"),
        ] {
            db.upsert_drug(&Drug::new(id, name)).unwrap();
        }
        db
    }

    fn dosage(min: Option<u32>, max: Option<u32>, amount: &str) -> DosageRecommendation {
        DosageRecommendation {
            drug_id: "DB00945".into(),
            age_group: "adult".into(),
            min_age: min,
            max_age: max,
            weight_min: None,
            weight_max: None,
            indication: "cardioprotection".into(),
            dosage_amount: amount.into(),
            frequency: "once daily".into(),
            route: "oral".into(),
            duration: String::new(),
            special_considerations: String::new(),
        }
    }

    #[test]
    fn test_dosage_for_age_inclusive_bounds() {
        let db = setup_db();
        db.insert_dosage_recommendation(&dosage(Some(18), Some(64), "81mg")).unwrap();
        db.insert_dosage_recommendation(&dosage(Some(65), Some(120), "75mg")).unwrap();

        assert_eq!(db.dosage_for_age("aspirin", 18).unwrap().unwrap().dosage_amount, "81mg");
        assert_eq!(db.dosage_for_age("aspirin", 64).unwrap().unwrap().dosage_amount, "81mg");
        assert_eq!(db.dosage_for_age("Aspirin", 65).unwrap().unwrap().dosage_amount, "75mg");
        assert!(db.dosage_for_age("aspirin", 10).unwrap().is_none());
    }

    #[test]
    fn test_dosage_open_bound_ignored() {
        let db = setup_db();
        db.insert_dosage_recommendation(&dosage(None, Some(64), "100mg")).unwrap();
        db.insert_dosage_recommendation(&dosage(Some(18), None, "200mg")).unwrap();
        assert!(db.dosage_for_age("aspirin", 30).unwrap().is_none());
        assert_eq!(db.dosage_recommendations("DB00945").unwrap().len(), 2);
    }

    #[test]
    fn test_dosage_first_covering_row_wins() {
        let db = setup_db();
        db.insert_dosage_recommendation(&dosage(Some(18), Some(120), "81mg")).unwrap();
        db.insert_dosage_recommendation(&dosage(Some(65), Some(120), "75mg")).unwrap();
        assert_eq!(db.dosage_for_age("aspirin", 70).unwrap().unwrap().dosage_amount, "81mg");
    }

    #[test]
    fn test_dosage_unknown_drug() {
        let db = setup_db();
        assert!(db.dosage_for_age("nonexistent", 30).unwrap().is_none());
    }

    #[test]
    fn test_alternatives_capped_in_insertion_order() {
        let db = setup_db();
        for alt in ["DB06605", "DB06228", "DB08816", "DB00758"] {
            db.insert_alternative(&AlternativeMedication::new("DB00682", alt, "lower bleeding risk"))
                .unwrap();
        }

        let alternatives = db.alternatives_for("warfarin", 3).unwrap();
        let names: Vec<&str> = alternatives.iter().map(|a| a.alternative_name.as_str()).collect();
        assert_eq!(names, vec!["Apixaban", "Rivaroxaban", "Ticagrelor"]);
    }

    #[test]
    fn test_alternatives_none() {
        let db = setup_db();
        assert!(db.alternatives_for("aspirin", 3).unwrap().is_empty());
        assert!(db.alternatives_for("unknown", 3).unwrap().is_empty());
    }
}

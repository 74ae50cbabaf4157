//! Drug reference operations.

use rusqlite::{params, OptionalExtension, Row};
use strsim::jaro_winkler;

use super::{fold_name, name_needle, Database, DbError, DbResult};
use crate::models::Drug;

const DRUG_COLUMNS: &str = "drug_id, name, generic_name, brand_names, drug_class, \
     mechanism_of_action, indications, contraindications, dosage_forms";

impl Database {
    /// Insert or update a drug.
    pub fn upsert_drug(&self, drug: &Drug) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO drugs (
                drug_id, name, name_folded, generic_name, generic_folded, brand_names,
                drug_class, mechanism_of_action, indications, contraindications, dosage_forms,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, datetime('now'))
            ON CONFLICT(drug_id) DO UPDATE SET
                name = excluded.name,
                name_folded = excluded.name_folded,
                generic_name = excluded.generic_name,
                generic_folded = excluded.generic_folded,
                brand_names = excluded.brand_names,
                drug_class = excluded.drug_class,
                mechanism_of_action = excluded.mechanism_of_action,
                indications = excluded.indications,
                contraindications = excluded.contraindications,
                dosage_forms = excluded.dosage_forms,
                updated_at = datetime('now')
            "#,
            params![
                drug.drug_id,
                drug.name,
                fold_name(&drug.name),
                drug.generic_name,
                fold_name(&drug.generic_name),
                serde_json::to_string(&drug.brand_names)?,
                drug.drug_class,
                drug.mechanism_of_action,
                serde_json::to_string(&drug.indications)?,
                serde_json::to_string(&drug.contraindications)?,
                serde_json::to_string(&drug.dosage_forms)?,
            ],
        )?;
        Ok(())
    }

    /// Get a drug by its identifier.
    pub fn get_drug(&self, drug_id: &str) -> DbResult<Option<Drug>> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {} FROM drugs WHERE drug_id = ?", DRUG_COLUMNS),
                [drug_id],
                DrugRow::from_row,
            )
            .optional()?;

        row.map(Drug::try_from).transpose()
    }

    /// First drug (in store order) whose name contains `name`, ignoring case.
    pub fn find_drug_by_name(&self, name: &str) -> DbResult<Option<Drug>> {
        let Some(needle) = name_needle(name) else {
            return Ok(None);
        };

        let row = self
            .conn
            .query_row(
                &format!(
                    "SELECT {} FROM drugs WHERE instr(name_folded, ?) > 0 ORDER BY rowid LIMIT 1",
                    DRUG_COLUMNS
                ),
                [needle],
                DrugRow::from_row,
            )
            .optional()?;

        row.map(Drug::try_from).transpose()
    }

    /// Search by name or generic name, best Jaro-Winkler match first.
    pub fn search_drugs(&self, query: &str, limit: usize) -> DbResult<Vec<Drug>> {
        let Some(needle) = name_needle(query) else {
            return Ok(Vec::new());
        };

        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {}
            FROM drugs
            WHERE instr(name_folded, ?1) > 0 OR instr(generic_folded, ?1) > 0
            ORDER BY rowid
            "#,
            DRUG_COLUMNS
        ))?;

        let rows = stmt.query_map([&needle], DrugRow::from_row)?;

        let mut scored = Vec::new();
        for row in rows {
            let drug = Drug::try_from(row?)?;
            let similarity = jaro_winkler(&needle, &fold_name(&drug.name))
                .max(jaro_winkler(&needle, &fold_name(&drug.generic_name)));
            scored.push((similarity, drug));
        }

        // Stable sort keeps store order among equal scores
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        Ok(scored.into_iter().take(limit).map(|(_, drug)| drug).collect())
    }

    /// Number of drugs in the reference store.
    pub fn drug_count(&self) -> DbResult<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM drugs", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

/// Intermediate row struct for database mapping.
struct DrugRow {
    drug_id: String,
    name: String,
    generic_name: String,
    brand_names: String,
    drug_class: String,
    mechanism_of_action: String,
    indications: String,
    contraindications: String,
    dosage_forms: String,
}

impl DrugRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(DrugRow {
            drug_id: row.get(0)?,
            name: row.get(1)?,
            generic_name: row.get(2)?,
            brand_names: row.get(3)?,
            drug_class: row.get(4)?,
            mechanism_of_action: row.get(5)?,
            indications: row.get(6)?,
            contraindications: row.get(7)?,
            dosage_forms: row.get(8)?,
        })
    }
}

impl TryFrom<DrugRow> for Drug {
    type Error = DbError;

    fn try_from(row: DrugRow) -> Result<Self, Self::Error> {
        Ok(Drug {
            drug_id: row.drug_id,
            name: row.name,
            generic_name: row.generic_name,
            brand_names: serde_json::from_str(&row.brand_names)?,
            drug_class: row.drug_class,
            mechanism_of_action: row.mechanism_of_action,
            indications: serde_json::from_str(&row.indications)?,
            contraindications: serde_json::from_str(&row.contraindications)?,
            dosage_forms: serde_json::from_str(&row.dosage_forms)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        for (id, name, generic) in [
            ("DB00682", "Warfarin", "warfarin sodium"),
            ("DB00945", "Aspirin", "acetylsalicylic acid"),
            ("DB00316", "Acetaminophen", "paracetamol"),
            ("DB01050", "Ibuprofen", "ibuprofen"),
        ] {
            let mut drug = Drug::new(id, name);
            drug.generic_name = generic.into();
            db.upsert_drug(&drug).unwrap();
        }
        db
    }

    #[test]
    fn test_upsert_and_get() {
        let db = setup_db();

        let mut drug = Drug::new("DB00331", "Metformin");
        drug.brand_names = vec!["Glucophage".into()];
        drug.indications = vec!["type 2 diabetes".into()];
        db.upsert_drug(&drug).unwrap();

        let loaded = db.get_drug("DB00331").unwrap().unwrap();
        assert_eq!(loaded, drug);

        drug.drug_class = "biguanide".into();
        db.upsert_drug(&drug).unwrap();
        assert_eq!(db.get_drug("DB00331").unwrap().unwrap().drug_class, "biguanide");
    }

    #[test]
    fn test_get_missing_drug() {
        let db = setup_db();
        assert!(db.get_drug("nope").unwrap().is_none());
    }

    #[test]
    fn test_find_by_name_substring() {
        let db = setup_db();
        let drug = db.find_drug_by_name("ASPIR").unwrap().unwrap();
        assert_eq!(drug.drug_id, "DB00945");
        assert!(db.find_drug_by_name("").unwrap().is_none());
        assert!(db.find_drug_by_name("zzz").unwrap().is_none());
    }

    #[test]
    fn test_find_by_name_non_ascii_capitals() {
        let db = Database::open_in_memory().unwrap();
        db.upsert_drug(&Drug::new("DB00977", "Éthinylestradiol")).unwrap();

        for query in ["Éthinylestradiol", "éthinylestradiol", "ÉTHINYL"] {
            let drug = db.find_drug_by_name(query).unwrap();
            assert_eq!(drug.map(|d| d.drug_id).as_deref(), Some("DB00977"), "query {}", query);
        }

        let results = db.search_drugs("éthinyl", 20).unwrap();
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn test_rename_refreshes_folded_name() {
        let db = setup_db();
        db.upsert_drug(&Drug::new("DB00945", "Ácido acetilsalicílico")).unwrap();
        assert!(db.find_drug_by_name("aspirin").unwrap().is_none());
        assert!(db.find_drug_by_name("ÁCIDO").unwrap().is_some());
    }

    #[test]
    fn test_search_matches_generic_name() {
        let db = setup_db();
        let results = db.search_drugs("paracetamol", 20).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].name, "Acetaminophen");
    }

    #[test]
    fn test_search_ranks_closest_first() {
        let db = Database::open_in_memory().unwrap();
        db.upsert_drug(&Drug::new("DB11130", "Aspirin/Dipyridamole")).unwrap();
        db.upsert_drug(&Drug::new("DB00945", "Aspirin")).unwrap();

        let results = db.search_drugs("aspirin", 20).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].name, "Aspirin");
    }

    #[test]
    fn test_search_limit() {
        let db = setup_db();
        let results = db.search_drugs("in", 2).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(db.drug_count().unwrap(), 4);
    }
}

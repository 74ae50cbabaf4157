//! Reference interaction lookup.
//!
//! Matching is case-insensitive substring containment against canonical
//! drug names, so "aspirin" also hits "Aspirin/Dipyridamole". When several
//! records match, the first in store order wins.

use crate::db::{Database, DbResult};
use crate::models::{AlternativeMedication, DosageRecommendation, KnownInteraction};

/// Read-only access to reference drug data.
///
/// Not-found is `Ok(None)` or an empty list; `Err` means the store itself
/// failed.
pub trait ReferenceLookup {
    fn find_known_interaction(&self, name_a: &str, name_b: &str) -> DbResult<Option<KnownInteraction>>;

    fn find_alternatives(&self, drug_name: &str, limit: usize) -> DbResult<Vec<AlternativeMedication>>;

    fn find_dosage_for_age(&self, drug_name: &str, age: u32) -> DbResult<Option<DosageRecommendation>>;
}

impl ReferenceLookup for Database {
    fn find_known_interaction(&self, name_a: &str, name_b: &str) -> DbResult<Option<KnownInteraction>> {
        self.interaction_between(name_a, name_b)
    }

    fn find_alternatives(&self, drug_name: &str, limit: usize) -> DbResult<Vec<AlternativeMedication>> {
        self.alternatives_for(drug_name, limit)
    }

    fn find_dosage_for_age(&self, drug_name: &str, age: u32) -> DbResult<Option<DosageRecommendation>> {
        self.dosage_for_age(drug_name, age)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Drug;
    use crate::severity::Severity;

    #[test]
    fn test_database_lookup_through_trait() {
        let db = Database::open_in_memory().unwrap();
        db.upsert_drug(&Drug::new("DB00682", "Warfarin")).unwrap();
        db.upsert_drug(&Drug::new("DB00945", "Aspirin")).unwrap();
        db.insert_interaction(&KnownInteraction::new(
            "DB00682",
            "DB00945",
            Severity::Severe,
            "Bleeding",
        ))
        .unwrap();

        let lookup: &dyn ReferenceLookup = &db;
        let a = lookup.find_known_interaction("aspirin", "warfarin").unwrap();
        let b = lookup.find_known_interaction("warfarin", "aspirin").unwrap();
        assert!(a.is_some());
        assert_eq!(a, b);
        assert!(lookup.find_alternatives("aspirin", 3).unwrap().is_empty());
        assert!(lookup.find_dosage_for_age("aspirin", 40).unwrap().is_none());
    }
}

//! Reference drug data.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::severity::Severity;

/// A drug in the reference store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Drug {
    /// External identifier (e.g. DrugBank id)
    pub drug_id: String,
    /// Canonical name used for interaction matching
    pub name: String,
    pub generic_name: String,
    pub brand_names: Vec<String>,
    pub drug_class: String,
    pub mechanism_of_action: String,
    pub indications: Vec<String>,
    pub contraindications: Vec<String>,
    pub dosage_forms: Vec<String>,
}

impl Drug {
    /// Create a drug with only its id and name set.
    pub fn new(drug_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            drug_id: drug_id.into(),
            name: name.into(),
            generic_name: String::new(),
            brand_names: Vec::new(),
            drug_class: String::new(),
            mechanism_of_action: String::new(),
            indications: Vec::new(),
            contraindications: Vec::new(),
            dosage_forms: Vec::new(),
        }
    }
}

/// A known interaction between two drugs.
///
/// The pair is unordered: a record stored as (A, B) also describes (B, A).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KnownInteraction {
    pub interaction_id: String,
    pub drug1_id: String,
    pub drug2_id: String,
    /// Canonical names, resolved when read from the store
    #[serde(default)]
    pub drug1_name: String,
    #[serde(default)]
    pub drug2_name: String,
    pub severity: Severity,
    pub description: String,
    pub mechanism: String,
    pub clinical_effects: Vec<String>,
    pub management_recommendations: String,
    pub evidence_level: String,
    pub references: Vec<String>,
}

impl KnownInteraction {
    pub fn new(
        drug1_id: impl Into<String>,
        drug2_id: impl Into<String>,
        severity: Severity,
        description: impl Into<String>,
    ) -> Self {
        Self {
            interaction_id: Uuid::new_v4().to_string(),
            drug1_id: drug1_id.into(),
            drug2_id: drug2_id.into(),
            drug1_name: String::new(),
            drug2_name: String::new(),
            severity,
            description: description.into(),
            mechanism: String::new(),
            clinical_effects: Vec::new(),
            management_recommendations: String::new(),
            evidence_level: String::new(),
            references: Vec::new(),
        }
    }
}

/// Age-banded dosage guidance for a drug.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DosageRecommendation {
    pub drug_id: String,
    /// e.g. "pediatric", "adult", "geriatric"
    pub age_group: String,
    pub min_age: Option<u32>,
    pub max_age: Option<u32>,
    pub weight_min: Option<f64>,
    pub weight_max: Option<f64>,
    pub indication: String,
    pub dosage_amount: String,
    pub frequency: String,
    pub route: String,
    pub duration: String,
    pub special_considerations: String,
}

impl DosageRecommendation {
    /// Inclusive age check. Rows missing either bound never match.
    pub fn covers_age(&self, age: u32) -> bool {
        match (self.min_age, self.max_age) {
            (Some(min), Some(max)) => min <= age && age <= max,
            _ => false,
        }
    }

    /// Guidance text, e.g. "500mg twice daily via oral".
    pub fn summary(&self) -> String {
        format!("{} {} via {}", self.dosage_amount, self.frequency, self.route)
    }
}

/// A safer substitute for a drug.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AlternativeMedication {
    pub original_drug_id: String,
    pub alternative_drug_id: String,
    /// Resolved when read from the store
    #[serde(default)]
    pub alternative_name: String,
    pub reason: String,
    pub efficacy_comparison: String,
    pub safety_profile: String,
    pub cost_comparison: String,
    pub therapeutic_equivalence: String,
}

impl AlternativeMedication {
    pub fn new(
        original_drug_id: impl Into<String>,
        alternative_drug_id: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            original_drug_id: original_drug_id.into(),
            alternative_drug_id: alternative_drug_id.into(),
            alternative_name: String::new(),
            reason: reason.into(),
            efficacy_comparison: String::new(),
            safety_profile: String::new(),
            cost_comparison: String::new(),
            therapeutic_equivalence: String::new(),
        }
    }
}

//! Prompts for clinical drug analysis.
//!
//! Each prompt ends with an explicit answer format. The normalizer keys on
//! the labels used here, so a label change must be mirrored in the
//! corresponding marker set.

use serde::{Deserialize, Serialize};

use crate::TaskKind;

/// A medication as it appears in a prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrugRef<'a> {
    pub name: &'a str,
    pub dosage: &'a str,
}

impl<'a> DrugRef<'a> {
    pub fn new(name: &'a str, dosage: &'a str) -> Self {
        Self { name, dosage }
    }
}

/// Patient context that can be folded into a prompt.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatientContext {
    pub age: Option<u32>,
    #[serde(default)]
    pub medical_conditions: Vec<String>,
    #[serde(default)]
    pub allergies: Vec<String>,
}

/// A structured inference request; the prompt text is derived from it.
#[derive(Debug, Clone)]
pub enum InferenceRequest<'a> {
    Interaction {
        drug1: DrugRef<'a>,
        drug2: DrugRef<'a>,
        patient_age: Option<u32>,
        patient: Option<&'a PatientContext>,
    },
    Dosage {
        drug_name: &'a str,
        age: u32,
        weight_kg: Option<f64>,
        indication: Option<&'a str>,
    },
    SideEffect {
        medication: DrugRef<'a>,
        patient: &'a PatientContext,
    },
    Extraction {
        text: &'a str,
    },
}

impl InferenceRequest<'_> {
    pub fn task(&self) -> TaskKind {
        match self {
            InferenceRequest::Interaction { .. } => TaskKind::Interaction,
            InferenceRequest::Dosage { .. } => TaskKind::Dosage,
            InferenceRequest::SideEffect { .. } => TaskKind::SideEffect,
            InferenceRequest::Extraction { .. } => TaskKind::Extraction,
        }
    }

    /// Render the exact prompt text for this request.
    pub fn prompt(&self) -> String {
        match self {
            InferenceRequest::Interaction {
                drug1,
                drug2,
                patient_age,
                patient,
            } => make_interaction_prompt(*drug1, *drug2, *patient_age, *patient),
            InferenceRequest::Dosage {
                drug_name,
                age,
                weight_kg,
                indication,
            } => make_dosage_prompt(drug_name, *age, *weight_kg, *indication),
            InferenceRequest::SideEffect {
                medication,
                patient,
            } => make_side_effect_prompt(*medication, patient),
            InferenceRequest::Extraction { text } => make_extraction_prompt(text),
        }
    }
}

/// Pairwise interaction prompt.
pub fn make_interaction_prompt(
    drug1: DrugRef<'_>,
    drug2: DrugRef<'_>,
    patient_age: Option<u32>,
    patient: Option<&PatientContext>,
) -> String {
    let mut prompt = format!(
        r#"
As a clinical pharmacologist, analyze the potential drug interaction between:

Drug 1: {} ({})
Drug 2: {} ({})
"#,
        drug1.name, drug1.dosage, drug2.name, drug2.dosage
    );

    if let Some(age) = patient_age {
        prompt.push_str(&format!("Patient Age: {} years\n", age));
    }
    if let Some(patient) = patient {
        if !patient.medical_conditions.is_empty() {
            prompt.push_str(&format!(
                "Medical Conditions: {}\n",
                patient.medical_conditions.join(", ")
            ));
        }
        if !patient.allergies.is_empty() {
            prompt.push_str(&format!("Allergies: {}\n", patient.allergies.join(", ")));
        }
    }

    prompt.push_str(
        r#"
Provide analysis in the following format:
1. Interaction Severity: [None/Low/Moderate/High/Severe]
2. Mechanism: [Brief description of interaction mechanism]
3. Clinical Effects: [Potential clinical consequences]
4. Recommendations: [Management recommendations]
5. Monitoring: [What parameters to monitor]

Analysis:"#,
    );
    prompt
}

/// Age-specific dosage prompt.
pub fn make_dosage_prompt(
    drug_name: &str,
    age: u32,
    weight_kg: Option<f64>,
    indication: Option<&str>,
) -> String {
    let mut prompt = format!(
        r#"
As a clinical pharmacist, calculate the appropriate dosage for:

Medication: {}
Patient Age: {} years
"#,
        drug_name, age
    );

    if let Some(weight) = weight_kg {
        prompt.push_str(&format!("Patient Weight: {} kg\n", weight));
    }
    if let Some(indication) = indication {
        prompt.push_str(&format!("Indication: {}\n", indication));
    }

    prompt.push_str(
        r#"
Provide dosage recommendation in the following format:
1. Recommended Dose: [Amount and frequency]
2. Route of Administration: [Oral/IV/IM/etc.]
3. Duration: [Treatment duration if applicable]
4. Special Considerations: [Age-specific considerations]
5. Monitoring Parameters: [What to monitor]

Recommendation:"#,
    );
    prompt
}

/// Side-effect risk prompt.
pub fn make_side_effect_prompt(medication: DrugRef<'_>, patient: &PatientContext) -> String {
    let age = patient
        .age
        .map(|a| a.to_string())
        .unwrap_or_else(|| "Unknown".to_string());

    format!(
        r#"
Analyze potential side effects for the following medication and patient:

Medication: {} ({})
Patient Age: {}
Medical Conditions: {}
Allergies: {}

Provide analysis in this format:
1. Common Side Effects: [List with probability %]
2. Serious Side Effects: [List with probability %]
3. Patient-Specific Risks: [Based on profile]
4. Risk Score: [1-10 scale]
5. Precautions: [Special precautions for this patient]

Analysis:"#,
        medication.name,
        medication.dosage,
        age,
        patient.medical_conditions.join(", "),
        patient.allergies.join(", ")
    )
}

/// Medication extraction prompt for free clinical text.
pub fn make_extraction_prompt(text: &str) -> String {
    format!(
        r#"
Extract all medications, dosages, and frequencies from the following medical text:

Text: {}

For each medication found, provide in this format:
- Medication: [Name]
- Dosage: [Amount]
- Frequency: [How often]
- Route: [Administration route if mentioned]

Extracted Medications:"#,
        text
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interaction_prompt() {
        let prompt = make_interaction_prompt(
            DrugRef::new("Warfarin", "5mg"),
            DrugRef::new("Aspirin", "81mg"),
            Some(67),
            None,
        );
        assert!(prompt.contains("Drug 1: Warfarin (5mg)"));
        assert!(prompt.contains("Drug 2: Aspirin (81mg)"));
        assert!(prompt.contains("Patient Age: 67 years"));
        assert!(prompt.contains("Interaction Severity:"));
    }

    #[test]
    fn test_interaction_prompt_without_age() {
        let prompt = make_interaction_prompt(
            DrugRef::new("Warfarin", "5mg"),
            DrugRef::new("Aspirin", "81mg"),
            None,
            None,
        );
        assert!(!prompt.contains("Patient Age"));
    }

    #[test]
    fn test_interaction_prompt_with_profile() {
        let patient = PatientContext {
            age: None,
            medical_conditions: vec!["atrial fibrillation".into(), "CKD".into()],
            allergies: vec!["penicillin".into()],
        };
        let prompt = make_interaction_prompt(
            DrugRef::new("Warfarin", "5mg"),
            DrugRef::new("Aspirin", "81mg"),
            None,
            Some(&patient),
        );
        assert!(prompt.contains("Medical Conditions: atrial fibrillation, CKD"));
        assert!(prompt.contains("Allergies: penicillin"));
    }

    #[test]
    fn test_dosage_prompt_optional_lines() {
        let prompt = make_dosage_prompt("Amoxicillin", 8, Some(25.0), Some("otitis media"));
        assert!(prompt.contains("Patient Weight: 25 kg"));
        assert!(prompt.contains("Indication: otitis media"));

        let bare = make_dosage_prompt("Amoxicillin", 8, None, None);
        assert!(!bare.contains("Patient Weight"));
        assert!(!bare.contains("Indication:"));
    }

    #[test]
    fn test_side_effect_prompt_unknown_age() {
        let prompt = make_side_effect_prompt(
            DrugRef::new("Metformin", "500mg"),
            &PatientContext::default(),
        );
        assert!(prompt.contains("Patient Age: Unknown"));
        assert!(prompt.contains("Risk Score:"));
    }

    #[test]
    fn test_request_task_kind() {
        let request = InferenceRequest::Extraction {
            text: "Take ibuprofen 200mg",
        };
        assert_eq!(request.task(), TaskKind::Extraction);
        assert!(request.prompt().contains("Take ibuprofen 200mg"));
    }
}

//! Standalone AI analyses: dosage, side effects, medication extraction.
//!
//! Each call is logged to the analysis log with its input, normalized
//! result and processing time. A logging failure is only a warning.

use std::sync::Arc;
use std::time::Instant;

use pharmalytics_llm::{
    parse_dosage_response, parse_extraction_response, parse_side_effect_response, DosageAnalysis,
    DrugRef, ExtractedMedication, Inference, InferenceRequest, SideEffectAnalysis,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::audit::AnalysisLog;
use crate::models::{AiAnalysisRecord, Medication, PatientProfile};

/// Side-effect analysis for one medication.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MedicationSideEffects {
    pub medication: String,
    pub analysis: SideEffectAnalysis,
}

/// Runs single-shot model analyses and logs them.
pub struct AnalysisService<'a> {
    inference: Arc<Inference>,
    log: &'a dyn AnalysisLog,
}

impl<'a> AnalysisService<'a> {
    pub fn new(inference: Arc<Inference>, log: &'a dyn AnalysisLog) -> Self {
        Self { inference, log }
    }

    /// Age-specific dosage guidance from the model.
    pub fn recommend_dosage(
        &self,
        user_id: &str,
        drug_name: &str,
        age: u32,
        weight_kg: Option<f64>,
        indication: Option<&str>,
    ) -> DosageAnalysis {
        let request = InferenceRequest::Dosage {
            drug_name,
            age,
            weight_kg,
            indication,
        };
        let input = json!({
            "drug_name": drug_name,
            "patient_age": age,
            "patient_weight": weight_kg,
            "indication": indication,
        });
        self.run(user_id, &request, input, parse_dosage_response)
    }

    /// Side-effect risk for each medication against the patient profile.
    pub fn analyze_side_effects(
        &self,
        user_id: &str,
        medications: &[Medication],
        profile: &PatientProfile,
        age: Option<u32>,
    ) -> Vec<MedicationSideEffects> {
        let patient = profile.context(age);
        medications
            .iter()
            .map(|medication| {
                let request = InferenceRequest::SideEffect {
                    medication: DrugRef::new(&medication.name, &medication.dosage),
                    patient: &patient,
                };
                let input = json!({
                    "medication": medication,
                    "patient_profile": profile,
                    "patient_age": age,
                });
                MedicationSideEffects {
                    medication: medication.name.trim().to_string(),
                    analysis: self.run(user_id, &request, input, parse_side_effect_response),
                }
            })
            .collect()
    }

    /// Medications mentioned in free clinical text.
    pub fn extract_medications(&self, user_id: &str, text: &str) -> Vec<ExtractedMedication> {
        let request = InferenceRequest::Extraction { text };
        let input = json!({ "text": text });
        self.run(user_id, &request, input, parse_extraction_response)
    }

    fn run<T, F>(&self, user_id: &str, request: &InferenceRequest<'_>, input: Value, parse: F) -> T
    where
        T: Serialize + Default,
        F: FnOnce(&str) -> T,
    {
        let task = request.task();
        let started = Instant::now();
        let result = self
            .inference
            .infer(request)
            .map(|text| parse(&text))
            .unwrap_or_default();
        let processing_time = started.elapsed().as_secs_f64();

        let record = AiAnalysisRecord::new(
            user_id,
            task,
            input,
            serde_json::to_value(&result).unwrap_or(Value::Null),
            processing_time,
            self.inference.model_for(task),
        );
        if let Err(e) = self.log.log_analysis(&record) {
            tracing::warn!(task = %task, error = %e, "Failed to log AI analysis");
        }

        tracing::debug!(task = %task, processing_time, "AI analysis complete");
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use pharmalytics_llm::{MockInferenceClient, RetryPolicy, TaskKind};

    fn service_with<'a>(db: &'a Database, client: MockInferenceClient) -> AnalysisService<'a> {
        AnalysisService::new(
            Arc::new(Inference::new(Arc::new(client), RetryPolicy::none())),
            db,
        )
    }

    #[test]
    fn test_recommend_dosage_logs_analysis() {
        let db = Database::open_in_memory().unwrap();
        let service = service_with(
            &db,
            MockInferenceClient::new("").with_response(
                TaskKind::Dosage,
                "1. Recommended Dose: 250mg three times daily\n2. Route of Administration: Oral",
            ),
        );

        let dosage = service.recommend_dosage("u1", "Amoxicillin", 8, Some(25.0), None);
        assert_eq!(dosage.dose.as_deref(), Some("250mg three times daily"));
        assert_eq!(dosage.route.as_deref(), Some("Oral"));

        let logged = db.recent_ai_analyses("u1", 10).unwrap();
        assert_eq!(logged.len(), 1);
        assert_eq!(logged[0].analysis_type, TaskKind::Dosage);
        assert_eq!(logged[0].input_data["drug_name"], "Amoxicillin");
        assert_eq!(logged[0].result_data["dose"], "250mg three times daily");
        assert_eq!(logged[0].model_version, "mock");
    }

    #[test]
    fn test_side_effects_per_medication() {
        let db = Database::open_in_memory().unwrap();
        let service = service_with(&db, MockInferenceClient::new("Risk Score: 7/10"));
        let profile = PatientProfile {
            medical_conditions: vec!["CKD".into()],
            ..PatientProfile::default()
        };

        let results = service.analyze_side_effects(
            "u1",
            &[Medication::new("Metformin", "500mg"), Medication::new("Lisinopril", "10mg")],
            &profile,
            Some(70),
        );
        assert_eq!(results.len(), 2);
        assert_eq!(results[1].medication, "Lisinopril");
        assert!(results.iter().all(|r| r.analysis.risk_score == Some(7)));
        assert_eq!(db.recent_ai_analyses("u1", 10).unwrap().len(), 2);
    }

    #[test]
    fn test_extraction_failure_is_empty() {
        let db = Database::open_in_memory().unwrap();
        let service = service_with(
            &db,
            MockInferenceClient::failing(pharmalytics_llm::InferenceError::Timeout(30)),
        );

        let meds = service.extract_medications("u1", "Started on aspirin 81mg daily");
        assert!(meds.is_empty());
        assert_eq!(db.recent_ai_analyses("u1", 10).unwrap().len(), 1);
    }

    #[test]
    fn test_extraction_records() {
        let db = Database::open_in_memory().unwrap();
        let service = service_with(
            &db,
            MockInferenceClient::new(
                "- Medication: Aspirin\n- Dosage: 81mg\n- Frequency: daily\n- Medication: Atorvastatin\n- Dosage: 20mg",
            ),
        );

        let meds = service.extract_medications("u1", "aspirin 81mg daily, atorvastatin 20mg");
        assert_eq!(meds.len(), 2);
        assert_eq!(meds[1].name, "Atorvastatin");
        assert_eq!(meds[1].dosage.as_deref(), Some("20mg"));
    }
}

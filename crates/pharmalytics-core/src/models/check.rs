//! Interaction check inputs, results and audit records.

use chrono::Utc;
use pharmalytics_llm::{PatientContext, TaskKind};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::severity::Severity;

/// A medication as submitted by the caller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Medication {
    pub name: String,
    #[serde(default)]
    pub dosage: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,
}

impl Medication {
    pub fn new(name: impl Into<String>, dosage: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dosage: dosage.into(),
            route: None,
        }
    }
}

/// Optional patient context supplied with a check.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PatientProfile {
    #[serde(default)]
    pub medical_conditions: Vec<String>,
    #[serde(default)]
    pub allergies: Vec<String>,
}

impl PatientProfile {
    /// Prompt context for this profile.
    pub fn context(&self, age: Option<u32>) -> PatientContext {
        PatientContext {
            age,
            medical_conditions: self.medical_conditions.clone(),
            allergies: self.allergies.clone(),
        }
    }
}

/// Where a finding came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FindingSource {
    Reference,
    Inference,
}

/// A reported interaction between two submitted medications.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InteractionFinding {
    pub drug1: String,
    pub drug2: String,
    pub severity: Severity,
    pub description: String,
    pub recommendation: String,
    pub source: FindingSource,
}

/// One suggested substitute inside an alternative recommendation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AlternativeSuggestion {
    pub name: String,
    pub reason: String,
    pub efficacy: String,
}

/// Remediation guidance attached to a check.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Recommendation {
    Dosage {
        medication: String,
        recommendation: String,
    },
    Alternative {
        medication: String,
        recommendation: String,
        alternatives: Vec<AlternativeSuggestion>,
    },
    Monitoring {
        medication: String,
        recommendation: String,
    },
}

impl Recommendation {
    /// Target medication (or "A + B" for pair guidance).
    pub fn medication(&self) -> &str {
        match self {
            Recommendation::Dosage { medication, .. }
            | Recommendation::Alternative { medication, .. }
            | Recommendation::Monitoring { medication, .. } => medication,
        }
    }

    pub fn text(&self) -> &str {
        match self {
            Recommendation::Dosage { recommendation, .. }
            | Recommendation::Alternative { recommendation, .. }
            | Recommendation::Monitoring { recommendation, .. } => recommendation,
        }
    }
}

/// Finding counts per severity. All four buckets are always present.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SeverityBreakdown {
    pub low: u32,
    pub moderate: u32,
    pub high: u32,
    pub severe: u32,
}

impl SeverityBreakdown {
    pub fn from_findings(findings: &[InteractionFinding]) -> Self {
        let mut breakdown = Self::default();
        for finding in findings {
            breakdown.add(finding.severity);
        }
        breakdown
    }

    pub fn add(&mut self, severity: Severity) {
        match severity {
            Severity::Low => self.low += 1,
            Severity::Moderate => self.moderate += 1,
            Severity::High => self.high += 1,
            Severity::Severe => self.severe += 1,
        }
    }

    pub fn total(&self) -> u32 {
        self.low + self.moderate + self.high + self.severe
    }
}

/// Result of one interaction check.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InteractionReport {
    pub check_id: String,
    pub interactions: Vec<InteractionFinding>,
    pub recommendations: Vec<Recommendation>,
    pub overall_risk_score: u32,
    pub total_interactions_found: usize,
    pub severity_breakdown: SeverityBreakdown,
    /// Set only when the audit write failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audit_warning: Option<String>,
}

/// Append-only audit record of a check.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InteractionCheckRecord {
    pub check_id: String,
    pub user_id: String,
    pub medications: Vec<Medication>,
    pub patient_age: Option<u32>,
    pub interactions_found: Vec<InteractionFinding>,
    pub recommendations: Vec<Recommendation>,
    pub risk_score: u32,
    pub checked_at: String,
}

impl InteractionCheckRecord {
    pub fn new(
        user_id: impl Into<String>,
        medications: Vec<Medication>,
        patient_age: Option<u32>,
        interactions_found: Vec<InteractionFinding>,
        recommendations: Vec<Recommendation>,
        risk_score: u32,
    ) -> Self {
        Self {
            check_id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            medications,
            patient_age,
            interactions_found,
            recommendations,
            risk_score,
            checked_at: Utc::now().to_rfc3339(),
        }
    }

    /// Serialize to canonical JSON for hash chaining.
    pub fn to_canonical_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// A persisted check with its position in the hash chain.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredCheck {
    pub seq: i64,
    pub record: InteractionCheckRecord,
    pub prev_hash: String,
    pub record_hash: String,
}

/// Log entry for a standalone AI analysis.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AiAnalysisRecord {
    pub analysis_id: String,
    pub user_id: String,
    pub analysis_type: TaskKind,
    pub input_data: serde_json::Value,
    pub result_data: serde_json::Value,
    /// Wall-clock seconds spent on inference and normalization
    pub processing_time: f64,
    pub model_version: String,
    /// Model-reported confidence; unset when the response carries none
    #[serde(default)]
    pub confidence_score: Option<f64>,
    pub created_at: String,
}

impl AiAnalysisRecord {
    pub fn new(
        user_id: impl Into<String>,
        analysis_type: TaskKind,
        input_data: serde_json::Value,
        result_data: serde_json::Value,
        processing_time: f64,
        model_version: impl Into<String>,
    ) -> Self {
        Self {
            analysis_id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            analysis_type,
            input_data,
            result_data,
            processing_time,
            model_version: model_version.into(),
            confidence_score: None,
            created_at: Utc::now().to_rfc3339(),
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence_score = Some(confidence);
        self
    }
}

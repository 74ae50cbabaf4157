//! Drug interaction analysis engine.
//!
//! Pipeline: Reference lookup (all pairs) → Concurrent pair inference →
//! Merge in pair order → Dosage / alternatives → Risk score → Audit
//!
//! Reference data is authoritative for findings and severity. Model output
//! only adds monitoring guidance.

mod analysis;
mod pairs;

pub use analysis::*;
pub use pairs::*;

use std::sync::Arc;

use pharmalytics_llm::{Inference, InteractionAnalysis};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::audit::AuditRecorder;
use crate::config::EngineConfig;
use crate::db::DbError;
use crate::lookup::ReferenceLookup;
use crate::models::{
    AlternativeSuggestion, FindingSource, InteractionCheckRecord, InteractionFinding,
    InteractionReport, Medication, PatientProfile, Recommendation, SeverityBreakdown,
};
use crate::severity;

/// Engine errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("{0}")]
    Validation(String),

    #[error("Reference store error: {0}")]
    ReferenceStore(#[from] DbError),
}

pub type EngineResult<T> = Result<T, EngineError>;

/// Minimum number of medications for a check.
pub const MIN_MEDICATIONS: usize = 2;

/// A request to check a medication list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CheckRequest {
    pub user_id: String,
    pub medications: Vec<Medication>,
    #[serde(default)]
    pub patient_age: Option<u32>,
    #[serde(default)]
    pub patient_profile: Option<PatientProfile>,
}

/// The interaction engine. Borrows its stores, shares the inference handle.
pub struct InteractionEngine<'a> {
    lookup: &'a dyn ReferenceLookup,
    audit: &'a dyn AuditRecorder,
    inference: Arc<Inference>,
    config: EngineConfig,
}

impl<'a> InteractionEngine<'a> {
    pub fn new(
        lookup: &'a dyn ReferenceLookup,
        audit: &'a dyn AuditRecorder,
        inference: Arc<Inference>,
        config: EngineConfig,
    ) -> Self {
        Self {
            lookup,
            audit,
            inference,
            config,
        }
    }

    /// Check a medication list for interactions.
    ///
    /// Exactly one audit record is written per successful check. An audit
    /// failure does not fail the check; it is reported in
    /// [`InteractionReport::audit_warning`].
    pub fn check(&self, request: &CheckRequest) -> EngineResult<InteractionReport> {
        let medications = &request.medications;
        if medications.len() < MIN_MEDICATIONS {
            return Err(EngineError::Validation(
                "At least 2 medications are required for interaction checking".to_string(),
            ));
        }

        let pairs = unordered_pairs(medications.len());

        // Reference lookups stay on this thread and fail fast.
        let mut known = Vec::with_capacity(pairs.len());
        for &(i, j) in &pairs {
            known.push(
                self.lookup
                    .find_known_interaction(&medications[i].name, &medications[j].name)?,
            );
        }

        let patient = request
            .patient_profile
            .as_ref()
            .map(|profile| profile.context(request.patient_age));
        let analyses = analyze_pairs(
            &self.inference,
            medications,
            &pairs,
            request.patient_age,
            patient.as_ref(),
            self.config.max_workers,
        );

        let mut findings = Vec::new();
        let mut recommendations = Vec::new();
        for ((&(i, j), interaction), analysis) in pairs.iter().zip(known).zip(analyses) {
            if let Some(interaction) = interaction {
                findings.push(InteractionFinding {
                    drug1: medications[i].name.trim().to_string(),
                    drug2: medications[j].name.trim().to_string(),
                    severity: interaction.severity,
                    description: interaction.description,
                    recommendation: interaction.management_recommendations,
                    source: FindingSource::Reference,
                });
            }
            if let Some(analysis) = analysis {
                recommendations.extend(monitoring_recommendations(
                    pair_label(medications, (i, j)),
                    analysis,
                ));
            }
        }

        if let Some(age) = request.patient_age {
            for medication in medications {
                if let Some(dosage) = self.lookup.find_dosage_for_age(&medication.name, age)? {
                    recommendations.push(Recommendation::Dosage {
                        medication: medication.name.trim().to_string(),
                        recommendation: dosage.summary(),
                    });
                }
            }
        }

        recommendations.extend(self.alternative_recommendations(&findings)?);

        let overall_risk_score = severity::max_score(findings.iter().map(|f| f.severity.as_str()));
        let severity_breakdown = SeverityBreakdown::from_findings(&findings);

        let record = InteractionCheckRecord::new(
            request.user_id.clone(),
            medications.clone(),
            request.patient_age,
            findings.clone(),
            recommendations.clone(),
            overall_risk_score,
        );
        let check_id = record.check_id.clone();
        let audit_warning = match self.audit.record(&record) {
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(check_id = %check_id, error = %e, "Failed to record interaction check");
                Some(format!("Interaction check was not recorded in the audit log: {}", e))
            }
        };

        tracing::info!(
            check_id = %check_id,
            medications = medications.len(),
            pairs = pairs.len(),
            findings = findings.len(),
            risk = overall_risk_score,
            "Interaction check complete"
        );

        Ok(InteractionReport {
            check_id,
            total_interactions_found: findings.len(),
            interactions: findings,
            recommendations,
            overall_risk_score,
            severity_breakdown,
            audit_warning,
        })
    }

    /// Alternatives for high and severe findings, most severe first.
    fn alternative_recommendations(
        &self,
        findings: &[InteractionFinding],
    ) -> EngineResult<Vec<Recommendation>> {
        let mut flagged: Vec<&InteractionFinding> = findings
            .iter()
            .filter(|f| f.severity.warrants_alternatives())
            .collect();
        flagged.sort_by(|a, b| b.severity.cmp(&a.severity));

        let mut recommendations = Vec::new();
        for finding in flagged {
            let alternatives = self
                .lookup
                .find_alternatives(&finding.drug1, self.config.alternatives_limit)?;
            if alternatives.is_empty() {
                continue;
            }
            recommendations.push(Recommendation::Alternative {
                medication: finding.drug1.clone(),
                recommendation: format!(
                    "Consider replacing {} ({} interaction with {})",
                    finding.drug1, finding.severity, finding.drug2
                ),
                alternatives: alternatives
                    .into_iter()
                    .map(|alt| AlternativeSuggestion {
                        name: alt.alternative_name,
                        reason: alt.reason,
                        efficacy: alt.efficacy_comparison,
                    })
                    .collect(),
            });
        }
        Ok(recommendations)
    }
}

/// Fold a pair analysis into monitoring guidance targeting the pair.
fn monitoring_recommendations(target: String, analysis: InteractionAnalysis) -> Vec<Recommendation> {
    let mut out: Vec<Recommendation> = analysis
        .recommendations
        .into_iter()
        .map(|text| Recommendation::Monitoring {
            medication: target.clone(),
            recommendation: text,
        })
        .collect();
    if let Some(monitoring) = analysis.monitoring {
        out.push(Recommendation::Monitoring {
            medication: target,
            recommendation: format!("Monitor: {}", monitoring),
        });
    }
    out
}

//! Caller-facing JSON contract.
//!
//! Handlers take the raw request body and return a status code plus a JSON
//! body, independent of any HTTP server. Internal error detail never
//! reaches a 500 body.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use crate::db::Database;
use crate::engine::{AnalysisService, CheckRequest, EngineError, InteractionEngine};
use crate::models::{InteractionCheckRecord, Medication, PatientProfile};

/// Generic body for failed interaction checks.
pub const CHECK_FAILED_MESSAGE: &str = "An error occurred while checking drug interactions";

/// Maximum medication search results.
pub const SEARCH_LIMIT: usize = 20;

/// Minimum search query length (after trimming).
pub const MIN_QUERY_LEN: usize = 2;

/// API errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Internal(&'static str),
}

impl ApiError {
    pub fn status(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::NotFound(_) => 404,
            ApiError::Internal(_) => 500,
        }
    }

    pub fn into_response(self) -> ApiResponse {
        ApiResponse {
            status: self.status(),
            body: json!({ "error": self.to_string() }),
        }
    }
}

/// Status code and JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    fn ok<T: Serialize>(value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(body) => Self { status: 200, body },
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize response");
                ApiError::Internal("An error occurred while preparing the response").into_response()
            }
        }
    }

    fn from_result<T: Serialize>(result: Result<T, ApiError>) -> Self {
        match result {
            Ok(value) => Self::ok(&value),
            Err(e) => e.into_response(),
        }
    }
}

fn parse_body<'de, T: Deserialize<'de>>(body: &'de str) -> Result<T, ApiError> {
    serde_json::from_str(body).map_err(|e| ApiError::BadRequest(format!("Invalid request body: {}", e)))
}

// =========================================================================
// Interaction checks
// =========================================================================

/// Body of an interaction check request.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckInteractionsBody {
    #[serde(default)]
    pub medications: Vec<Medication>,
    #[serde(default)]
    pub patient_age: Option<u32>,
    #[serde(default)]
    pub patient_profile: Option<PatientProfile>,
}

/// POST check-interactions.
pub fn check_interactions(engine: &InteractionEngine<'_>, user_id: &str, body: &str) -> ApiResponse {
    ApiResponse::from_result(run_check(engine, user_id, body))
}

fn run_check(
    engine: &InteractionEngine<'_>,
    user_id: &str,
    body: &str,
) -> Result<crate::models::InteractionReport, ApiError> {
    let parsed: CheckInteractionsBody = parse_body(body)?;
    let request = CheckRequest {
        user_id: user_id.to_string(),
        medications: parsed.medications,
        patient_age: parsed.patient_age,
        patient_profile: parsed.patient_profile,
    };

    engine.check(&request).map_err(|e| match e {
        EngineError::Validation(msg) => ApiError::BadRequest(msg),
        EngineError::ReferenceStore(err) => {
            tracing::error!(error = %err, "Error in drug interaction check");
            ApiError::Internal(CHECK_FAILED_MESSAGE)
        }
    })
}

/// GET interaction-history: the user's latest checks, newest first.
pub fn interaction_history(db: &Database, user_id: &str, limit: usize) -> ApiResponse {
    let result = db
        .recent_checks(user_id, limit)
        .map(|checks| {
            checks
                .into_iter()
                .map(|stored| stored.record)
                .collect::<Vec<InteractionCheckRecord>>()
        })
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to load interaction history");
            ApiError::Internal("An error occurred while loading interaction history")
        });
    ApiResponse::from_result(result)
}

// =========================================================================
// Drug reference
// =========================================================================

/// One medication search hit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    pub name: String,
    pub generic_name: String,
    pub drug_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResponse {
    pub results: Vec<SearchResult>,
}

/// GET search?q=...
pub fn search_medications(db: &Database, query: &str) -> ApiResponse {
    ApiResponse::from_result(run_search(db, query))
}

fn run_search(db: &Database, query: &str) -> Result<SearchResponse, ApiError> {
    if query.trim().chars().count() < MIN_QUERY_LEN {
        return Err(ApiError::BadRequest(
            "Query must be at least 2 characters".to_string(),
        ));
    }

    let drugs = db.search_drugs(query, SEARCH_LIMIT).map_err(|e| {
        tracing::error!(error = %e, "Medication search failed");
        ApiError::Internal("An error occurred while searching medications")
    })?;

    Ok(SearchResponse {
        results: drugs
            .into_iter()
            .map(|drug| SearchResult {
                name: drug.name,
                generic_name: drug.generic_name,
                drug_id: drug.drug_id,
            })
            .collect(),
    })
}

/// GET drugs/{drug_id}.
pub fn drug_detail(db: &Database, drug_id: &str) -> ApiResponse {
    let result = match db.get_drug(drug_id) {
        Ok(Some(drug)) => Ok(drug),
        Ok(None) => Err(ApiError::NotFound("Drug not found".to_string())),
        Err(e) => {
            tracing::error!(error = %e, drug_id, "Failed to load drug");
            Err(ApiError::Internal("An error occurred while loading the drug"))
        }
    };
    ApiResponse::from_result(result)
}

// =========================================================================
// Standalone AI analyses
// =========================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct DosageBody {
    pub drug_name: String,
    pub patient_age: u32,
    #[serde(default)]
    pub patient_weight: Option<f64>,
    #[serde(default)]
    pub indication: Option<String>,
}

/// POST dosage-recommendation.
pub fn dosage_recommendation(service: &AnalysisService<'_>, user_id: &str, body: &str) -> ApiResponse {
    let result = parse_body::<DosageBody>(body).map(|req| {
        service.recommend_dosage(
            user_id,
            &req.drug_name,
            req.patient_age,
            req.patient_weight,
            req.indication.as_deref(),
        )
    });
    ApiResponse::from_result(result)
}

#[derive(Debug, Clone, Deserialize)]
pub struct SideEffectsBody {
    pub medications: Vec<Medication>,
    #[serde(default)]
    pub patient_profile: PatientProfile,
    #[serde(default)]
    pub patient_age: Option<u32>,
}

/// POST analyze-side-effects.
pub fn analyze_side_effects(service: &AnalysisService<'_>, user_id: &str, body: &str) -> ApiResponse {
    let result = parse_body::<SideEffectsBody>(body).and_then(|req| {
        if req.medications.is_empty() {
            return Err(ApiError::BadRequest("At least 1 medication is required".to_string()));
        }
        Ok(service.analyze_side_effects(user_id, &req.medications, &req.patient_profile, req.patient_age))
    });
    ApiResponse::from_result(result)
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExtractBody {
    #[serde(default)]
    pub text: String,
}

/// POST extract-from-text.
pub fn extract_from_text(service: &AnalysisService<'_>, user_id: &str, body: &str) -> ApiResponse {
    let result = parse_body::<ExtractBody>(body).and_then(|req| {
        if req.text.trim().is_empty() {
            return Err(ApiError::BadRequest("Text is required".to_string()));
        }
        Ok(json!({ "medications": service.extract_medications(user_id, &req.text) }))
    });
    ApiResponse::from_result(result)
}

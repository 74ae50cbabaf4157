//! Pharmalytics Core Library
//!
//! Drug interaction analysis engine with a hash-chained audit trail.
//!
//! # Architecture
//!
//! ```text
//! Medications ──► Pair enumeration (i < j)
//!                        │
//!          ┌─────────────┴──────────────┐
//!          ▼                            ▼
//!   Reference lookup            Model inference (bounded pool)
//!   (authoritative findings)    → Normalizer → monitoring guidance
//!          │                            │
//!          └─────────────┬──────────────┘
//!                        ▼
//!        Dosage rows · Alternatives (high/severe only)
//!                        │
//!                        ▼
//!          Risk score = max severity weight
//!                        │
//!                        ▼
//!     ┌──────────────────────────────────────────┐
//!     │  Audit record (append-only)              │
//!     │  hash = sha256(prev_hash || record_json) │
//!     └──────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`severity`]: Severity ordering and risk scores
//! - [`models`]: Domain types (Drug, KnownInteraction, InteractionReport, etc.)
//! - [`db`]: SQLite reference store and audit tables
//! - [`lookup`]: Reference interaction lookup
//! - [`audit`]: Audit recording
//! - [`engine`]: Interaction engine and standalone AI analyses
//! - [`api`]: Transport-independent JSON contract
//! - [`config`]: Environment-driven configuration

pub mod api;
pub mod audit;
pub mod config;
pub mod db;
pub mod engine;
pub mod lookup;
pub mod models;
pub mod severity;

pub use audit::{AnalysisLog, AuditError, AuditRecorder};
pub use config::{ConfigError, EngineConfig};
pub use db::{Database, DbError, DbResult};
pub use engine::{AnalysisService, CheckRequest, EngineError, EngineResult, InteractionEngine};
pub use lookup::ReferenceLookup;
pub use models::{
    Drug, InteractionCheckRecord, InteractionFinding, InteractionReport, KnownInteraction,
    Medication, PatientProfile, Recommendation, SeverityBreakdown,
};
pub use severity::Severity;

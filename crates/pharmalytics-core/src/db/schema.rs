//! SQLite schema definition.

/// Complete database schema for pharmalytics.
pub const SCHEMA: &str = r#"
PRAGMA foreign_keys = ON;

-- ============================================================================
-- Reference data (read-only for the engine)
-- ============================================================================

CREATE TABLE IF NOT EXISTS drugs (
    drug_id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    name_folded TEXT NOT NULL,                    -- Unicode-lowercased name for matching
    generic_name TEXT NOT NULL DEFAULT '',
    generic_folded TEXT NOT NULL DEFAULT '',
    brand_names TEXT NOT NULL DEFAULT '[]',       -- JSON array of strings
    drug_class TEXT NOT NULL DEFAULT '',
    mechanism_of_action TEXT NOT NULL DEFAULT '',
    indications TEXT NOT NULL DEFAULT '[]',       -- JSON array of strings
    contraindications TEXT NOT NULL DEFAULT '[]', -- JSON array of strings
    dosage_forms TEXT NOT NULL DEFAULT '[]',      -- JSON array of strings
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_drugs_name ON drugs(name_folded);

CREATE TABLE IF NOT EXISTS drug_interactions (
    interaction_id TEXT PRIMARY KEY,
    drug1_id TEXT NOT NULL REFERENCES drugs(drug_id),
    drug2_id TEXT NOT NULL REFERENCES drugs(drug_id),
    severity TEXT NOT NULL CHECK (severity IN ('low', 'moderate', 'high', 'severe')),
    description TEXT NOT NULL DEFAULT '',
    mechanism TEXT NOT NULL DEFAULT '',
    clinical_effects TEXT NOT NULL DEFAULT '[]',  -- JSON array of strings
    management_recommendations TEXT NOT NULL DEFAULT '',
    evidence_level TEXT NOT NULL DEFAULT '',
    citations TEXT NOT NULL DEFAULT '[]',         -- JSON array of strings
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- At most one record per unordered pair
CREATE UNIQUE INDEX IF NOT EXISTS idx_interactions_pair
    ON drug_interactions(min(drug1_id, drug2_id), max(drug1_id, drug2_id));

CREATE TABLE IF NOT EXISTS dosage_recommendations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    drug_id TEXT NOT NULL REFERENCES drugs(drug_id),
    age_group TEXT NOT NULL DEFAULT '',
    min_age INTEGER,
    max_age INTEGER,
    weight_min REAL,
    weight_max REAL,
    indication TEXT NOT NULL DEFAULT '',
    dosage_amount TEXT NOT NULL,
    frequency TEXT NOT NULL DEFAULT '',
    route TEXT NOT NULL DEFAULT '',
    duration TEXT NOT NULL DEFAULT '',
    special_considerations TEXT NOT NULL DEFAULT ''
);

CREATE INDEX IF NOT EXISTS idx_dosage_drug ON dosage_recommendations(drug_id);

CREATE TABLE IF NOT EXISTS alternative_medications (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    original_drug_id TEXT NOT NULL REFERENCES drugs(drug_id),
    alternative_drug_id TEXT NOT NULL REFERENCES drugs(drug_id),
    reason TEXT NOT NULL DEFAULT '',
    efficacy_comparison TEXT NOT NULL DEFAULT '',
    safety_profile TEXT NOT NULL DEFAULT '',
    cost_comparison TEXT NOT NULL DEFAULT '',
    therapeutic_equivalence TEXT NOT NULL DEFAULT ''
);

CREATE INDEX IF NOT EXISTS idx_alternatives_original ON alternative_medications(original_drug_id);

-- ============================================================================
-- Interaction checks (Append-Only, hash-chained)
-- ============================================================================

CREATE TABLE IF NOT EXISTS interaction_checks (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    check_id TEXT NOT NULL UNIQUE,
    user_id TEXT NOT NULL,
    risk_score INTEGER NOT NULL,
    checked_at TEXT NOT NULL,
    payload TEXT NOT NULL,                        -- canonical JSON of the record
    prev_hash TEXT NOT NULL,
    record_hash TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_checks_user ON interaction_checks(user_id, seq);

CREATE TRIGGER IF NOT EXISTS interaction_checks_no_update BEFORE UPDATE ON interaction_checks
BEGIN
    SELECT RAISE(ABORT, 'interaction_checks is append-only');
END;

CREATE TRIGGER IF NOT EXISTS interaction_checks_no_delete BEFORE DELETE ON interaction_checks
BEGIN
    SELECT RAISE(ABORT, 'interaction_checks is append-only');
END;

-- ============================================================================
-- AI analysis log
-- ============================================================================

CREATE TABLE IF NOT EXISTS ai_analyses (
    analysis_id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    analysis_type TEXT NOT NULL
        CHECK (analysis_type IN ('interaction', 'dosage', 'side_effect', 'text_extraction')),
    input_data TEXT NOT NULL,                     -- JSON object
    result_data TEXT NOT NULL,                    -- JSON object
    processing_time REAL NOT NULL,
    model_version TEXT NOT NULL,
    confidence_score REAL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_analyses_user ON ai_analyses(user_id, created_at);
"#;

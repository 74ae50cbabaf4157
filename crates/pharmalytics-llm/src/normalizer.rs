//! Normalization of free-text model output.
//!
//! Completions are scanned line by line against a [`MarkerSet`]:
//! - field markers capture the rest of their line (first occurrence wins)
//! - section markers open a list that collects the following plain lines
//! - record-start markers flush the buffered record and open a new one
//!
//! The scanner is total: malformed or empty text yields empty records.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::TaskKind;

/// Risk score used when the marker is present but its value is unusable.
pub const NEUTRAL_RISK_SCORE: u8 = 5;

/// What a marker does when it is found on a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerRole {
    Field,
    Section,
    RecordStart,
}

/// How markers are located on a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// Marker may appear anywhere on the line.
    Contains,
    /// Line must begin with the marker.
    Prefix,
}

/// A labeled marker and the key its value is stored under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Marker {
    pub label: &'static str,
    pub key: &'static str,
    pub role: MarkerRole,
}

/// Ordered marker table for one task kind.
#[derive(Debug, Clone)]
pub struct MarkerSet {
    markers: Vec<Marker>,
    mode: MatchMode,
}

impl MarkerSet {
    pub fn new(mode: MatchMode) -> Self {
        Self {
            markers: Vec::new(),
            mode,
        }
    }

    pub fn field(self, label: &'static str, key: &'static str) -> Self {
        self.with(label, key, MarkerRole::Field)
    }

    pub fn section(self, label: &'static str, key: &'static str) -> Self {
        self.with(label, key, MarkerRole::Section)
    }

    pub fn record_start(self, label: &'static str, key: &'static str) -> Self {
        self.with(label, key, MarkerRole::RecordStart)
    }

    fn with(mut self, label: &'static str, key: &'static str, role: MarkerRole) -> Self {
        self.markers.push(Marker { label, key, role });
        self
    }

    /// Markers for pairwise interaction analysis.
    pub fn interaction() -> Self {
        Self::new(MatchMode::Contains)
            .field("Severity:", "severity")
            .field("Mechanism:", "mechanism")
            .field("Clinical Effects:", "clinical_effects")
            .section("Recommendations:", "recommendations")
            .field("Monitoring:", "monitoring")
    }

    /// Markers for age-specific dosage guidance.
    pub fn dosage() -> Self {
        Self::new(MatchMode::Contains)
            .field("Recommended Dose:", "dose")
            .field("Route of Administration:", "route")
            .field("Duration:", "duration")
            .field("Special Considerations:", "considerations")
            .field("Monitoring Parameters:", "monitoring")
    }

    /// Markers for side-effect risk analysis.
    pub fn side_effect() -> Self {
        Self::new(MatchMode::Contains)
            .section("Common Side Effects:", "common")
            .section("Serious Side Effects:", "serious")
            .field("Patient-Specific Risks:", "patient_risks")
            .field("Risk Score:", "risk_score")
            .field("Precautions:", "precautions")
    }

    /// Markers for medication extraction from clinical text.
    pub fn extraction() -> Self {
        Self::new(MatchMode::Prefix)
            .record_start("- Medication:", "name")
            .field("- Dosage:", "dosage")
            .field("- Frequency:", "frequency")
            .field("- Route:", "route")
    }

    fn has_records(&self) -> bool {
        self.markers.iter().any(|m| m.role == MarkerRole::RecordStart)
    }

    /// First marker (in declaration order) found on the line, with the text
    /// following its first occurrence.
    fn match_line<'l>(&self, line: &'l str) -> Option<(&Marker, &'l str)> {
        self.markers.iter().find_map(|marker| {
            let pos = match self.mode {
                MatchMode::Contains => line.find(marker.label)?,
                MatchMode::Prefix => {
                    if !line.starts_with(marker.label) {
                        return None;
                    }
                    0
                }
            };
            Some((marker, line[pos + marker.label.len()..].trim()))
        })
    }
}

/// Fields and sections captured for one record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScannedBlock {
    fields: HashMap<&'static str, String>,
    sections: HashMap<&'static str, Vec<String>>,
}

impl ScannedBlock {
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    pub fn section(&self, key: &str) -> &[String] {
        self.sections.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.sections.values().all(Vec::is_empty)
    }

    fn take_field(&mut self, key: &str) -> Option<String> {
        self.fields.remove(key)
    }

    fn take_section(&mut self, key: &str) -> Vec<String> {
        self.sections.remove(key).unwrap_or_default()
    }

    fn set_field_once(&mut self, key: &'static str, value: &str) {
        self.fields.entry(key).or_insert_with(|| value.to_string());
    }
}

/// Result of scanning a completion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanOutput {
    /// Everything captured outside of records.
    pub preamble: ScannedBlock,
    /// Records flushed at each record-start marker and at end of input.
    pub records: Vec<ScannedBlock>,
}

/// Run the marker state machine over `text`.
pub fn scan(text: &str, markers: &MarkerSet) -> ScanOutput {
    let record_mode = markers.has_records();
    let mut output = ScanOutput::default();
    let mut current: Option<ScannedBlock> = None;
    let mut cursor: Option<&'static str> = None;

    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        match markers.match_line(line) {
            Some((marker, value)) => match marker.role {
                MarkerRole::RecordStart => {
                    if let Some(done) = current.take() {
                        output.records.push(done);
                    }
                    let mut block = ScannedBlock::default();
                    block.set_field_once(marker.key, value);
                    current = Some(block);
                    cursor = None;
                }
                MarkerRole::Field => {
                    cursor = None;
                    if let Some(block) = target(&mut output.preamble, &mut current, record_mode) {
                        block.set_field_once(marker.key, value);
                    }
                }
                MarkerRole::Section => {
                    if let Some(block) = target(&mut output.preamble, &mut current, record_mode) {
                        let items = block.sections.entry(marker.key).or_default();
                        if !value.is_empty() {
                            items.push(value.to_string());
                        }
                        cursor = Some(marker.key);
                    }
                }
            },
            None => {
                let Some(key) = cursor else { continue };
                if is_enumerator(line) {
                    continue;
                }
                if let Some(block) = target(&mut output.preamble, &mut current, record_mode) {
                    block.sections.entry(key).or_default().push(line.to_string());
                }
            }
        }
    }

    if let Some(done) = current.take() {
        output.records.push(done);
    }
    output
}

fn target<'b>(
    preamble: &'b mut ScannedBlock,
    current: &'b mut Option<ScannedBlock>,
    record_mode: bool,
) -> Option<&'b mut ScannedBlock> {
    if record_mode {
        current.as_mut()
    } else {
        Some(preamble)
    }
}

/// Bare answer-format enumerators ("1." to "5.") echoed from the prompt.
fn is_enumerator(line: &str) -> bool {
    let mut chars = line.chars();
    matches!(
        (chars.next(), chars.next(), chars.next()),
        (Some('1'..='5'), Some('.'), None) | (Some('1'..='5'), Some('.'), Some(' '))
    )
}

// =========================================================================
// Task records
// =========================================================================

/// Structured pairwise interaction analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InteractionAnalysis {
    /// Severity label as written by the model, lowercased.
    pub severity: Option<String>,
    pub mechanism: Option<String>,
    pub clinical_effects: Option<String>,
    pub recommendations: Vec<String>,
    pub monitoring: Option<String>,
}

impl InteractionAnalysis {
    pub fn is_empty(&self) -> bool {
        self.severity.is_none()
            && self.mechanism.is_none()
            && self.clinical_effects.is_none()
            && self.recommendations.is_empty()
            && self.monitoring.is_none()
    }
}

/// Structured dosage guidance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DosageAnalysis {
    pub dose: Option<String>,
    pub route: Option<String>,
    pub duration: Option<String>,
    pub considerations: Option<String>,
    pub monitoring: Option<String>,
}

/// Structured side-effect risk analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SideEffectAnalysis {
    pub common_side_effects: Vec<String>,
    pub serious_side_effects: Vec<String>,
    pub patient_risks: Option<String>,
    /// 1 to 10; `None` when the model gave no score at all.
    pub risk_score: Option<u8>,
    pub precautions: Option<String>,
}

/// A medication extracted from clinical text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedMedication {
    pub name: String,
    pub dosage: Option<String>,
    pub frequency: Option<String>,
    pub route: Option<String>,
}

/// Normalized output for any task kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "task", rename_all = "snake_case")]
pub enum NormalizedResponse {
    Interaction(InteractionAnalysis),
    Dosage(DosageAnalysis),
    SideEffect(SideEffectAnalysis),
    Extraction { medications: Vec<ExtractedMedication> },
}

/// Normalize a completion for the given task kind.
pub fn normalize(task: TaskKind, text: &str) -> NormalizedResponse {
    match task {
        TaskKind::Interaction => NormalizedResponse::Interaction(parse_interaction_response(text)),
        TaskKind::Dosage => NormalizedResponse::Dosage(parse_dosage_response(text)),
        TaskKind::SideEffect => NormalizedResponse::SideEffect(parse_side_effect_response(text)),
        TaskKind::Extraction => NormalizedResponse::Extraction {
            medications: parse_extraction_response(text),
        },
    }
}

pub fn parse_interaction_response(text: &str) -> InteractionAnalysis {
    let mut block = scan(text, &MarkerSet::interaction()).preamble;
    InteractionAnalysis {
        severity: non_empty(block.take_field("severity")).map(|s| s.to_lowercase()),
        mechanism: non_empty(block.take_field("mechanism")),
        clinical_effects: non_empty(block.take_field("clinical_effects")),
        recommendations: block.take_section("recommendations"),
        monitoring: non_empty(block.take_field("monitoring")),
    }
}

pub fn parse_dosage_response(text: &str) -> DosageAnalysis {
    let mut block = scan(text, &MarkerSet::dosage()).preamble;
    DosageAnalysis {
        dose: non_empty(block.take_field("dose")),
        route: non_empty(block.take_field("route")),
        duration: non_empty(block.take_field("duration")),
        considerations: non_empty(block.take_field("considerations")),
        monitoring: non_empty(block.take_field("monitoring")),
    }
}

pub fn parse_side_effect_response(text: &str) -> SideEffectAnalysis {
    let mut block = scan(text, &MarkerSet::side_effect()).preamble;
    SideEffectAnalysis {
        common_side_effects: block.take_section("common"),
        serious_side_effects: block.take_section("serious"),
        patient_risks: non_empty(block.take_field("patient_risks")),
        risk_score: block.take_field("risk_score").map(|raw| parse_risk_score(&raw)),
        precautions: non_empty(block.take_field("precautions")),
    }
}

pub fn parse_extraction_response(text: &str) -> Vec<ExtractedMedication> {
    scan(text, &MarkerSet::extraction())
        .records
        .into_iter()
        .map(|mut record| ExtractedMedication {
            name: record.take_field("name").unwrap_or_default(),
            dosage: non_empty(record.take_field("dosage")),
            frequency: non_empty(record.take_field("frequency")),
            route: non_empty(record.take_field("route")),
        })
        .collect()
}

/// Parse "7", "7/10" or "7 / 10"; anything else is the neutral score.
pub fn parse_risk_score(raw: &str) -> u8 {
    raw.split('/')
        .next()
        .map(str::trim)
        .and_then(|s| s.parse::<u8>().ok())
        .filter(|score| (1..=10).contains(score))
        .unwrap_or(NEUTRAL_RISK_SCORE)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

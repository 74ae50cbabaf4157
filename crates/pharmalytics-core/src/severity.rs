//! Severity ranking and numeric risk scores.
//!
//! Weights: low 1, moderate 2, high 3, severe 4. Unknown labels score 0.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Interaction severity, ordered from least to most dangerous.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Moderate,
    High,
    Severe,
}

/// Unrecognized severity label.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown severity: {0}")]
pub struct UnknownSeverity(pub String);

impl Severity {
    pub const ALL: [Severity; 4] = [
        Severity::Low,
        Severity::Moderate,
        Severity::High,
        Severity::Severe,
    ];

    pub fn weight(&self) -> u32 {
        match self {
            Severity::Low => 1,
            Severity::Moderate => 2,
            Severity::High => 3,
            Severity::Severe => 4,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Moderate => "moderate",
            Severity::High => "high",
            Severity::Severe => "severe",
        }
    }

    /// High and severe interactions warrant suggesting alternatives.
    pub fn warrants_alternatives(&self) -> bool {
        *self >= Severity::High
    }
}

impl FromStr for Severity {
    type Err = UnknownSeverity;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Severity::Low),
            "moderate" => Ok(Severity::Moderate),
            "high" => Ok(Severity::High),
            "severe" => Ok(Severity::Severe),
            _ => Err(UnknownSeverity(s.to_string())),
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Numeric score for a severity label. Never fails.
pub fn score(label: &str) -> u32 {
    label.parse::<Severity>().map(|s| s.weight()).unwrap_or(0)
}

/// Highest score among the labels, 0 when empty.
pub fn max_score<I, S>(labels: I) -> u32
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    labels
        .into_iter()
        .map(|label| score(label.as_ref()))
        .max()
        .unwrap_or(0)
}

/// Severities sorted most dangerous first.
pub fn rank<I: IntoIterator<Item = Severity>>(severities: I) -> Vec<Severity> {
    let mut ranked: Vec<Severity> = severities.into_iter().collect();
    ranked.sort_by(|a, b| b.cmp(a));
    ranked
}

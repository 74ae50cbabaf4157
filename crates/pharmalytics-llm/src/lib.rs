//! Generative-model layer for clinical drug analysis.
//!
//! This crate owns everything that touches the language model: prompt
//! construction per task kind, the HTTP inference client, and the
//! normalizer that turns free-text completions into structured records.
//! Nothing here reads the reference store.

pub mod client;
pub mod normalizer;
pub mod prompts;

pub use client::*;
pub use normalizer::*;
pub use prompts::*;

use serde::{Deserialize, Serialize};

/// The analysis tasks the model is asked to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Interaction,
    Dosage,
    SideEffect,
    Extraction,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::Interaction => "interaction",
            TaskKind::Dosage => "dosage",
            TaskKind::SideEffect => "side_effect",
            TaskKind::Extraction => "text_extraction",
        }
    }

    /// Inverse of [`TaskKind::as_str`].
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "interaction" => Some(TaskKind::Interaction),
            "dosage" => Some(TaskKind::Dosage),
            "side_effect" => Some(TaskKind::SideEffect),
            "text_extraction" => Some(TaskKind::Extraction),
            _ => None,
        }
    }
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use pharmalytics_core::api::{self, ApiResponse};
use pharmalytics_core::config::{inference_config_from_env, EngineConfig};
use pharmalytics_core::{AnalysisService, Database, InteractionEngine, Medication, PatientProfile};
use pharmalytics_llm::Inference;
use serde_json::json;

#[derive(Parser)]
#[command(name = "pharmalytics")]
#[command(about = "Drug interaction analysis engine")]
struct Cli {
    /// SQLite database path (overrides PHARMALYTICS_DATABASE_PATH)
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Concurrent inference calls per check
    #[arg(long, global = true)]
    workers: Option<usize>,

    /// User the request is made on behalf of
    #[arg(long, global = true, default_value = "cli")]
    user: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check medications for interactions
    Check {
        /// Medications as NAME or NAME:DOSAGE
        #[arg(required = true, num_args = 1..)]
        medications: Vec<String>,
        /// Patient age in years
        #[arg(long)]
        age: Option<u32>,
        /// Medical condition (repeatable)
        #[arg(long = "condition")]
        conditions: Vec<String>,
        /// Allergy (repeatable)
        #[arg(long = "allergy")]
        allergies: Vec<String>,
    },
    /// Show the user's latest checks
    History {
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Search medications by name
    Search { query: String },
    /// Show one drug
    Drug { drug_id: String },
    /// Re-verify the audit hash chain
    VerifyAudit,
    /// Extract medications from clinical text
    Extract { text: String },
    /// Analyze side-effect risk
    SideEffects {
        /// Medications as NAME or NAME:DOSAGE
        #[arg(required = true, num_args = 1..)]
        medications: Vec<String>,
        #[arg(long)]
        age: Option<u32>,
        #[arg(long = "condition")]
        conditions: Vec<String>,
        #[arg(long = "allergy")]
        allergies: Vec<String>,
    },
    /// Age-specific dosage guidance
    Dosage {
        drug: String,
        #[arg(long)]
        age: u32,
        #[arg(long)]
        weight: Option<f64>,
        #[arg(long)]
        indication: Option<String>,
    },
}

fn parse_medication(raw: &str) -> Medication {
    match raw.split_once(':') {
        Some((name, dosage)) => Medication::new(name.trim(), dosage.trim()),
        None => Medication::new(raw.trim(), ""),
    }
}

fn print_response(response: ApiResponse) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(&response.body)?);
    if response.status != 200 {
        bail!("request failed with status {}", response.status);
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("pharmalytics=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = EngineConfig::from_env()?;
    if let Some(path) = cli.database {
        config.database_path = path;
    }
    if let Some(workers) = cli.workers {
        config.max_workers = workers.max(1);
    }

    let db = Database::open(&config.database_path)
        .with_context(|| format!("opening {}", config.database_path.display()))?;
    let inference = || -> anyhow::Result<Arc<Inference>> {
        let inference_config = inference_config_from_env()?;
        Ok(Arc::new(Inference::from_config(&inference_config)?))
    };

    match cli.command {
        Commands::Check {
            medications,
            age,
            conditions,
            allergies,
        } => {
            let profile = (!conditions.is_empty() || !allergies.is_empty()).then(|| PatientProfile {
                medical_conditions: conditions,
                allergies,
            });
            let body = json!({
                "medications": medications.iter().map(|m| parse_medication(m)).collect::<Vec<_>>(),
                "patient_age": age,
                "patient_profile": profile,
            });
            let engine = InteractionEngine::new(&db, &db, inference()?, config);
            print_response(api::check_interactions(&engine, &cli.user, &body.to_string()))
        }
        Commands::History { limit } => print_response(api::interaction_history(
            &db,
            &cli.user,
            limit.unwrap_or(config.history_limit),
        )),
        Commands::Search { query } => print_response(api::search_medications(&db, &query)),
        Commands::Drug { drug_id } => print_response(api::drug_detail(&db, &drug_id)),
        Commands::VerifyAudit => {
            let status = db.verify_chain()?;
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({
                    "checked": status.checked,
                    "intact": status.is_intact(),
                    "first_broken": status.first_broken,
                }))?
            );
            if !status.is_intact() {
                bail!("audit chain is broken");
            }
            Ok(())
        }
        Commands::Extract { text } => {
            let service = AnalysisService::new(inference()?, &db);
            print_response(api::extract_from_text(
                &service,
                &cli.user,
                &json!({ "text": text }).to_string(),
            ))
        }
        Commands::SideEffects {
            medications,
            age,
            conditions,
            allergies,
        } => {
            let service = AnalysisService::new(inference()?, &db);
            let body = json!({
                "medications": medications.iter().map(|m| parse_medication(m)).collect::<Vec<_>>(),
                "patient_profile": PatientProfile {
                    medical_conditions: conditions,
                    allergies,
                },
                "patient_age": age,
            });
            print_response(api::analyze_side_effects(&service, &cli.user, &body.to_string()))
        }
        Commands::Dosage {
            drug,
            age,
            weight,
            indication,
        } => {
            let service = AnalysisService::new(inference()?, &db);
            let body = json!({
                "drug_name": drug,
                "patient_age": age,
                "patient_weight": weight,
                "indication": indication,
            });
            print_response(api::dosage_recommendation(&service, &cli.user, &body.to_string()))
        }
    }
}

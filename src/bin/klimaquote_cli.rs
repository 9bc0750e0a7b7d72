//! Klimaquote CLI - Bridge interface for the web and admin hosts
//!
//! Commands: quote, tier, compliance, checklist, labour
//! Outputs JSON to stdout, logs to stderr (RUST_LOG)
//! Returns 1 on bad input, 2 when a checklist cannot be finished

use chrono::Utc;
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use klimaquote_core::{
    build_quote, estimate_labour, evaluate_refrigerant_compliance, resolve_capacity_tier,
    ChecklistError, CommissioningChecklist, ConfigurationSnapshot, Product, QuoteOptions,
    RefrigerantSpec, Room, SettingCategory,
};

#[derive(Parser)]
#[command(name = "klimaquote-cli")]
#[command(about = "Klimaquote CLI - quote pricing and F-gas compliance")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to a configuration snapshot (JSON). Built-in fallbacks when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Price a quote
    Quote {
        /// JSON payload: { rooms, options, product }
        #[arg(short, long)]
        payload: String,
    },

    /// Resolve the capacity pricing tier for a capacity in kW
    Tier {
        #[arg(short, long)]
        capacity: f64,
    },

    /// Evaluate F-gas obligations
    Compliance {
        /// JSON payload (RefrigerantSpec)
        #[arg(short, long)]
        payload: String,
    },

    /// Report checklist completion, optionally issuing the installation record
    Checklist {
        /// JSON payload (CommissioningChecklist)
        #[arg(short, long)]
        payload: String,

        #[arg(long)]
        finish: bool,
    },

    /// Estimate installation labour
    Labour {
        #[arg(long)]
        hours: f64,

        #[arg(long, default_value = "airco")]
        category: String,
    },
}

#[derive(Deserialize)]
struct QuotePayload {
    #[serde(default)]
    rooms: Vec<Room>,
    #[serde(default)]
    options: QuoteOptions,
    product: Product,
}

fn emit(value: &impl Serialize) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => println!(r#"{{"error": "Failed to serialize output: {}"}}"#, e),
    }
}

fn fail(message: String) -> ExitCode {
    emit(&serde_json::json!({ "success": false, "error": message }));
    ExitCode::FAILURE
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => match ConfigurationSnapshot::load_from_file(path) {
            Ok(c) => c,
            Err(e) => return fail(format!("Failed to load configuration: {}", e)),
        },
        None => ConfigurationSnapshot::default(),
    };

    match cli.command {
        Commands::Quote { payload } => {
            let request: QuotePayload = match serde_json::from_str(&payload) {
                Ok(r) => r,
                Err(e) => return fail(format!("Invalid payload: {}", e)),
            };
            let quote = build_quote(&request.rooms, &request.options, &request.product, &config);
            emit(&quote);
            ExitCode::SUCCESS
        }

        Commands::Tier { capacity } => {
            let tier = resolve_capacity_tier(capacity, &config.capacity_pricing);
            emit(&serde_json::json!({ "capacity_kw": capacity, "tier": tier }));
            ExitCode::SUCCESS
        }

        Commands::Compliance { payload } => {
            let spec: RefrigerantSpec = match serde_json::from_str(&payload) {
                Ok(s) => s,
                Err(e) => return fail(format!("Invalid payload: {}", e)),
            };
            emit(&evaluate_refrigerant_compliance(&spec));
            ExitCode::SUCCESS
        }

        Commands::Checklist { payload, finish } => {
            let checklist: CommissioningChecklist = match serde_json::from_str(&payload) {
                Ok(c) => c,
                Err(e) => return fail(format!("Invalid payload: {}", e)),
            };

            if !finish {
                emit(&serde_json::json!({
                    "steps": checklist.step_statuses(),
                    "overall": checklist.overall_completion(),
                    "can_complete": checklist.can_complete(),
                    "missing": checklist.missing_requirements(),
                }));
                return ExitCode::SUCCESS;
            }

            match checklist.finish(Uuid::new_v4(), Utc::now()) {
                Ok(record) => {
                    emit(&serde_json::json!({ "success": true, "record": record }));
                    ExitCode::SUCCESS
                }
                Err(ChecklistError::Incomplete { missing }) => {
                    emit(&serde_json::json!({ "success": false, "missing": missing }));
                    ExitCode::from(2)
                }
                Err(e) => fail(e.to_string()),
            }
        }

        Commands::Labour { hours, category } => {
            let category = serde_json::from_value::<SettingCategory>(category.into());
            let category = match category {
                Ok(c) => c,
                Err(e) => return fail(format!("Invalid category: {}", e)),
            };
            emit(&estimate_labour(hours, category, &config));
            ExitCode::SUCCESS
        }
    }
}

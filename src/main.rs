use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use rusqlite::Connection;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use regime_forecast::{
    get_inference, get_regime_periods, import_periods, load_periods_csv, setup_database,
    upsert_inference, AppConfig, EntityRecord, InferenceEngine, InferenceResult, Partner,
    RegistryPayload,
};

#[derive(Parser)]
#[command(name = "regime-forecast", version, about = "Tax-regime classification and transition forecasts")]
struct Cli {
    /// JSON config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the configured database path
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the database tables
    Init,

    /// Bulk-load regime periods from CSV
    ImportPeriods {
        csv: PathBuf,
    },

    /// Analyze a merged entity record against its stored history and persist the result
    Analyze {
        /// Entity record JSON
        record: PathBuf,

        /// Partner list JSON
        #[arg(long)]
        partners: Option<PathBuf>,
    },

    /// Preview a registry payload without persisting anything
    Preview {
        payload: PathBuf,
    },

    /// Print the stored inference for an entity
    Show {
        entity_id: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(db) = cli.db {
        config.database_path = db;
    }

    init_tracing(&config.log_filter);

    let as_of = config.as_of.unwrap_or_else(|| Utc::now().date_naive());
    let engine = InferenceEngine::new();

    match cli.command {
        Command::Init => {
            let conn = open_database(&config.database_path)?;
            setup_database(&conn)?;
            println!("✓ Database initialized at {:?}", config.database_path);
        }
        Command::ImportPeriods { csv } => {
            let periods = load_periods_csv(&csv)?;
            let mut conn = open_database(&config.database_path)?;
            setup_database(&conn)?;
            let inserted = import_periods(&mut conn, &periods)?;
            println!("✓ Imported {} regime periods", inserted);
        }
        Command::Analyze { record, partners } => {
            let record: EntityRecord = read_json(&record)?;
            let partners: Vec<Partner> = match partners {
                Some(path) => read_json(&path)?,
                None => Vec::new(),
            };

            let conn = open_database(&config.database_path)?;
            setup_database(&conn)?;
            let periods = get_regime_periods(&conn, &record.entity_id)?;

            let result = engine.analyze_entity_record(&record, &partners, periods, as_of);
            upsert_inference(&conn, &result)?;
            print_result(&result)?;
        }
        Command::Preview { payload } => {
            let payload: RegistryPayload = read_json(&payload)?;
            let result = engine.preview_registry_payload(&payload, as_of);
            print_result(&result)?;
        }
        Command::Show { entity_id } => {
            let conn = open_database(&config.database_path)?;
            setup_database(&conn)?;
            match get_inference(&conn, &entity_id)? {
                Some(result) => print_result(&result)?,
                None => {
                    eprintln!("❌ No inference stored for {}", entity_id);
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}

fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn open_database(path: &Path) -> Result<Connection> {
    Connection::open(path).with_context(|| format!("Failed to open database: {:?}", path))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read JSON file: {:?}", path))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse JSON: {:?}", path))
}

fn print_result(result: &InferenceResult) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(result)?);
    Ok(())
}

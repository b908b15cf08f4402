//! Neo4j data-access service.
//!
//! # Architecture Overview
//!
//! ```text
//!   secrets manager ─┐
//!   .env / env vars ─┼─▶ config (merge, validate, cache) ─▶ Settings
//!   file secrets ────┘                                        │
//!                                                             ▼
//!   Client ──▶ http (axum, CORS, request id) ──▶ api ──▶ GraphClient
//!                                                             │
//!                                   QueryDispatch ◀───────────┘
//!                                        │
//!                      TracedRunner (optional) ──▶ span exporter ──▶ agent
//!                                        │
//!                                  Neo4j HTTP API
//! ```
//!
//! Settings are resolved before the runtime is built so that `WORKERS` and
//! `THREADS` can size it. Events raised while resolving go to stderr.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use neo4j_service::config::{get_settings_with, ConfigError, SourceLoader};
use neo4j_service::lifecycle;
use neo4j_service::observability::bootstrap_subscriber;

#[derive(Parser, Debug)]
#[command(name = "neo4j-service", version, about = "Neo4j data-access service")]
struct Cli {
    /// Dotenv file read into the environment source and for bootstrap toggles
    #[arg(long, default_value = ".env")]
    env_file: PathBuf,

    /// Directory of file secrets (overrides SECRETS_DIR)
    #[arg(long, env = "SECRETS_DIR")]
    secrets_dir: Option<PathBuf>,

    /// Print the resolved settings as JSON and exit
    #[arg(long)]
    check_config: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let resolve = || -> Result<_, ConfigError> {
        let loader = SourceLoader::from_env_file(Some(cli.env_file))?.secrets_dir(cli.secrets_dir);
        get_settings_with(&loader)
    };
    let resolved = tracing::subscriber::with_default(bootstrap_subscriber(), resolve);
    let settings = match resolved {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if cli.check_config {
        return match serde_json::to_string_pretty(settings.as_ref()) {
            Ok(json) => {
                println!("{}", json);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("failed to render settings: {}", e);
                ExitCode::FAILURE
            }
        };
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .worker_threads(settings.workers)
        .max_blocking_threads(settings.threads)
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("failed to build runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(lifecycle::serve(settings)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Service failed");
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}

//! Combat battle server.
//!
//! Reads combat requests as JSON lines on stdin, runs each as a scene and
//! writes one JSON line per state change on stdout. Logs go to stderr.
//!
//! # Usage
//!
//! ```bash
//! # Serve requests from stdin with the default config
//! cargo run -p combat_server
//!
//! # Custom config and data
//! cargo run -p combat_server -- --config server.ron --data data/combat.ron
//! ```
//!
//! See the protocol module for the request/response format.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use combat_core::data::DataStore;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinSet;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use combat_server::protocol::{CombatRequest, CombatResponse};
use combat_server::{SceneManager, ServerConfig, ServerError};

#[derive(Parser)]
#[command(name = "combat_server")]
#[command(about = "Battle server running combat scenes from JSON requests")]
#[command(version)]
struct Cli {
    /// Server config file (RON); defaults are used when it does not exist
    #[arg(short, long, default_value = "server.ron")]
    config: PathBuf,

    /// Combat data file, overriding the config
    #[arg(short, long)]
    data: Option<PathBuf>,

    /// Enable debug logging when RUST_LOG is unset
    #[arg(short, long)]
    verbose: bool,
}

fn load_store(path: &Path) -> Result<DataStore, ServerError> {
    let text = std::fs::read_to_string(path).map_err(|source| ServerError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let store = DataStore::from_ron_str(&path.display().to_string(), &text)?;
    for problem in store.validate() {
        tracing::warn!(path = %path.display(), "{problem}");
    }
    Ok(store)
}

async fn handle(manager: SceneManager, request: CombatRequest) {
    let started = match request.to_setup() {
        Ok(setup) => manager.create_scene(setup).await,
        Err(e) => Err(e),
    };
    let ticket = match started {
        Ok(ticket) => ticket,
        Err(e) => {
            let rejected = CombatResponse::Rejected {
                attacker_id: request.attacker_id,
                defender_id: request.defender_id,
                reason: e.to_string(),
            };
            println!("{}", rejected.to_line());
            return;
        }
    };

    let scene_id = ticket.id();
    let started = CombatResponse::Started {
        scene_id,
        attacker_id: request.attacker_id,
        defender_id: request.defender_id,
    };
    println!("{}", started.to_line());

    let line = match ticket.result().await {
        Ok(result) => CombatResponse::result(&request, scene_id, result.outcome),
        Err(e) => CombatResponse::Failed {
            scene_id,
            reason: e.to_string(),
        },
    };
    println!("{}", line.to_line());
}

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    let cli = Cli::parse();

    // Initialize tracing
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    tracing::info!("Starting combat battle server");

    let mut config = ServerConfig::load_or_default(&cli.config)?;
    if let Some(data) = cli.data {
        config.data_path = data;
    }
    let store = Arc::new(load_store(&config.data_path)?);
    tracing::info!(
        data = %config.data_path.display(),
        capacity = config.max_scenes_per_combat,
        "data loaded"
    );
    let manager = SceneManager::new(store, config);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut tasks = JoinSet::new();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(e) => {
                        tracing::error!(error = %e, "stdin read failed");
                        break;
                    }
                };
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<CombatRequest>(&line) {
                    Ok(request) => {
                        tasks.spawn(handle(manager.clone(), request));
                    }
                    Err(e) => tracing::warn!(error = %e, "malformed request skipped"),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupt received");
                manager.shutdown().await;
                break;
            }
        }
    }

    // Let accepted scenes finish (or report their cancellation).
    while tasks.join_next().await.is_some() {}
    tracing::info!("Battle server stopped");
    Ok(())
}

//! Combat development tools.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use combat_core::data::DataStore;
use combat_core::scene::SceneSetup;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use combat_tools::error::{Result, ToolError};
use combat_tools::simulate::{render, simulate, UnitSpec};
use combat_tools::validate::validate_data_directory;

#[derive(Parser)]
#[command(name = "combat-tools")]
#[command(about = "Development tools for the combat engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate data files
    Validate {
        /// Data file or directory of data files
        #[arg(default_value = "data")]
        path: PathBuf,
    },

    /// Run one scene offline and print its summary
    Simulate {
        /// Data file
        #[arg(short, long, default_value = "data/combat.ron")]
        data: PathBuf,

        /// Attacker as TYPE or TYPE:LEVEL (repeatable)
        #[arg(short, long, required = true)]
        attacker: Vec<UnitSpec>,

        /// Defender as TYPE or TYPE:LEVEL (repeatable)
        #[arg(short = 'D', long)]
        defender: Vec<UnitSpec>,

        /// Unit group joining the defence
        #[arg(short, long)]
        group: Option<u32>,

        /// Random seed
        #[arg(short, long, default_value = "1")]
        seed: u64,
    },
}

fn run_validate(path: &std::path::Path) -> Result<bool> {
    tracing::info!("Validating data files in: {}", path.display());
    let reports = validate_data_directory(path)?;
    let mut valid = true;
    for report in &reports {
        let sizes: Vec<String> = report
            .table_sizes
            .iter()
            .map(|(table, size)| format!("{table}={size}"))
            .collect();
        tracing::info!("{}: {}", report.path.display(), sizes.join(" "));
        for problem in &report.problems {
            tracing::error!("{}: {problem}", report.path.display());
        }
        valid &= report.is_valid();
    }
    Ok(valid)
}

fn run_simulate(data: &std::path::Path, setup: &SceneSetup) -> Result<()> {
    let text = std::fs::read_to_string(data).map_err(|source| ToolError::Io {
        path: data.to_path_buf(),
        source,
    })?;
    let store = DataStore::from_ron_str(&data.display().to_string(), &text)?;
    let summary = simulate(Arc::new(store), setup)?;
    println!("{}", render(&summary)?);
    Ok(())
}

fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Validate { path } => run_validate(&path).map(|valid| {
            if valid {
                tracing::info!("Validation passed");
            }
            valid
        }),
        Commands::Simulate {
            data,
            attacker,
            defender,
            group,
            seed,
        } => {
            let setup = SceneSetup {
                attackers: attacker.into_iter().map(UnitSpec::to_unit_info).collect(),
                defenders: defender.into_iter().map(UnitSpec::to_unit_info).collect(),
                unit_group: group,
                seed: Some(seed),
                ..SceneSetup::default()
            };
            run_simulate(&data, &setup).map(|()| true)
        }
    };

    match result {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            tracing::error!("{e}");
            std::process::exit(1);
        }
    }
}

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use locus_engine::config::EngineConfig;
use mimalloc::MiMalloc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{evaluate::EvaluateArgs, grid::GridArgs, search::SearchArgs};

mod evaluate;
mod file_utils;
mod format;
mod grid;
mod parsers;
mod search;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[arg(short, long)]
    debug: bool,

    /// Engine configuration (JSON), defaults are used when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Travel costs from one candidate point to a set of destinations
    #[command(visible_alias = "e")]
    Evaluate {
        #[command(flatten)]
        args: EvaluateArgs,
    },
    /// Ranks every grid point around the references
    #[command(visible_alias = "s")]
    Search {
        #[command(flatten)]
        args: SearchArgs,
    },
    /// Prints the candidate points of a grid
    Grid {
        #[command(flatten)]
        args: GridArgs,
    },
    /// Prints the JSON schema of the configuration file
    Schema,
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<EngineConfig> {
    let config = match path {
        Some(path) => EngineConfig::from_file(path)?,
        None => EngineConfig::default(),
    };

    Ok(config.with_env())
}

/// Cancelled on Ctrl-C so in-flight evaluations return what they have.
fn shutdown_token() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, finishing with partial results");
            trigger.cancel();
        }
    });

    token
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    dotenvy::from_filename("./.env.local").ok();

    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(if cli.debug {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .init();

    match cli.command {
        Some(Commands::Evaluate { args }) => {
            let config = load_config(cli.config.as_ref())?;
            evaluate::run(args, &config, &shutdown_token()).await?
        }
        Some(Commands::Search { args }) => {
            let config = load_config(cli.config.as_ref())?;
            search::run(args, &config, &shutdown_token()).await?
        }
        Some(Commands::Grid { args }) => grid::run(args)?,
        Some(Commands::Schema) => {
            let schema = schemars::schema_for!(EngineConfig);
            println!("{}", serde_json::to_string_pretty(&schema)?);
        }
        None => {
            info!("No command given, see --help");
        }
    }

    Ok(())
}

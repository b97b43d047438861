use std::path::PathBuf;

use clap::Args;
use comfy_table::Table;
use locus_engine::{
    Coordinate,
    config::EngineConfig,
    engine::{CandidateEvaluation, Engine},
    route_table::AVERAGE_KEY,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{file_utils::read_destinations, format::cost_cells, parsers};

#[derive(Args)]
pub struct EvaluateArgs {
    #[arg(long, allow_hyphen_values = true)]
    lon: f64,

    #[arg(long, allow_hyphen_values = true)]
    lat: f64,

    /// JSON array of `{name, lon, lat}` destinations
    #[arg(short, long)]
    destinations: PathBuf,

    /// Ignore cached results, the fresh ones are still stored
    #[arg(long, default_value_t = false)]
    override_cache: bool,

    /// Give up after this long (e.g., "30s", "5m", "PT1H30M")
    #[arg(short, long, value_parser = parsers::parse_duration)]
    timeout: Option<jiff::SignedDuration>,
}

pub fn routes_table(evaluation: &CandidateEvaluation) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["Destination", "Distance", "Duration"]);

    for (name, cost) in evaluation.routes.entries() {
        let [distance, duration] = cost_cells(cost);
        table.add_row(vec![name.to_string(), distance, duration]);
    }

    if let Some(average) = evaluation.routes.average() {
        let [distance, duration] = cost_cells(average);
        table.add_row(vec![AVERAGE_KEY.to_string(), distance, duration]);
    }

    table
}

pub async fn run(
    args: EvaluateArgs,
    config: &EngineConfig,
    shutdown: &CancellationToken,
) -> anyhow::Result<()> {
    let destinations = read_destinations(&args.destinations)?;
    let engine = Engine::from_config(config)?;

    let cancel = match args.timeout {
        Some(timeout) => Engine::with_deadline(shutdown, timeout.unsigned_abs()),
        None => shutdown.child_token(),
    };

    let coordinate = Coordinate::new(args.lon, args.lat);
    info!(
        "Evaluating {} against {} destinations",
        coordinate,
        destinations.len()
    );

    let evaluation = engine
        .evaluate_candidate(coordinate, &destinations, args.override_cache, &cancel)
        .await?;

    if !evaluation.complete {
        warn!(
            "Partial result: {} of {} destinations routed",
            evaluation.routes.len(),
            destinations.len()
        );
    }

    println!(
        "{}",
        if evaluation.address.is_empty() {
            "(no address)"
        } else {
            evaluation.address.as_str()
        }
    );
    println!("{}", routes_table(&evaluation));

    Ok(())
}

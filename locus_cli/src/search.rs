use std::{path::PathBuf, time::Duration};

use clap::Args;
use comfy_table::Table;
use indicatif::{ProgressBar, ProgressStyle};
use locus_engine::{
    config::EngineConfig,
    destination_source::{DestinationSource, JsonFileDestinations},
    engine::Engine,
    search::{Objective, SearchReport},
};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::{file_utils::read_references, format::cost_cells, parsers};

#[derive(Args)]
pub struct SearchArgs {
    /// Division whose destinations are loaded
    #[arg(long)]
    division: String,

    /// Folder holding one `<division>.json` per division
    #[arg(long)]
    destinations_dir: PathBuf,

    /// Grid step in degrees
    #[arg(short, long, value_parser = parsers::parse_step)]
    step: f64,

    /// Points spanning the search area, the destinations when omitted
    #[arg(short, long)]
    references: Option<PathBuf>,

    #[arg(short, long, default_value_t = Objective::Duration)]
    objective: Objective,

    /// Candidates to print
    #[arg(long, default_value_t = 10)]
    top: usize,

    /// Give up after this long (e.g., "30s", "5m", "PT1H30M")
    #[arg(short, long, value_parser = parsers::parse_duration)]
    timeout: Option<jiff::SignedDuration>,
}

fn ranking_table(report: &SearchReport, top: usize) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["#", "Coordinate", "Address", "Distance", "Duration"]);

    for (rank, candidate) in report.ranked.iter().take(top).enumerate() {
        let evaluation = &candidate.evaluation;
        let [distance, duration] = evaluation
            .routes
            .average()
            .map(cost_cells)
            .unwrap_or_default();

        table.add_row(vec![
            (rank + 1).to_string(),
            evaluation.coordinate.to_string(),
            evaluation.address.clone(),
            distance,
            duration,
        ]);
    }

    table
}

pub async fn run(
    args: SearchArgs,
    config: &EngineConfig,
    shutdown: &CancellationToken,
) -> anyhow::Result<()> {
    let source = JsonFileDestinations::new(&args.destinations_dir);
    let destinations = source.get_destinations(&args.division).await?;

    let references = match &args.references {
        Some(path) => read_references(path)?,
        None => destinations.iter().map(|d| d.coordinate).collect(),
    };

    let engine = Engine::from_config(config)?;

    let cancel = match args.timeout {
        Some(timeout) => Engine::with_deadline(shutdown, timeout.unsigned_abs()),
        None => shutdown.child_token(),
    };

    let spinner = ProgressBar::new_spinner();
    spinner.enable_steady_tick(Duration::from_millis(120));
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner} {msg} ({elapsed})") {
        spinner.set_style(style);
    }
    spinner.set_message(format!(
        "Searching {} for {} destinations",
        args.division,
        destinations.len()
    ));

    let report = engine
        .search(&references, args.step, &destinations, args.objective, &cancel)
        .await;

    spinner.finish_and_clear();
    let report = report?;

    info!(
        "{} candidates evaluated, {} ranked, {} failed",
        report.evaluated,
        report.ranked.len(),
        report.failed
    );

    println!("{}", ranking_table(&report, args.top));

    Ok(())
}

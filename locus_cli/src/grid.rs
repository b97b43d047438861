use std::path::PathBuf;

use clap::Args;
use locus_engine::{bbox::BoundingBox, grid::Grid};
use tracing::info;

use crate::{file_utils::read_references, parsers};

#[derive(Args)]
pub struct GridArgs {
    /// JSON array of `{lon, lat}` points spanning the grid
    #[arg(short, long)]
    references: PathBuf,

    /// Grid step in degrees
    #[arg(short, long, value_parser = parsers::parse_step)]
    step: f64,
}

pub fn run(args: GridArgs) -> anyhow::Result<()> {
    let references = read_references(&args.references)?;
    let bbox = BoundingBox::from_coordinates(&references)?;
    let grid = Grid::new(bbox, args.step)?;

    let mut count = 0;
    for coordinate in &grid {
        println!("{}", coordinate);
        count += 1;
    }

    info!("{} grid points over {:?}", count, bbox);

    Ok(())
}

use std::{fs::File, io::BufReader, path::Path};

use anyhow::Context;
use locus_engine::{Coordinate, Destination};
use serde::de::DeserializeOwned;

pub fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let file = File::open(path).with_context(|| format!("Cannot open {}", path.display()))?;
    let reader = BufReader::new(file);

    serde_json::from_reader(reader).with_context(|| format!("Cannot parse {}", path.display()))
}

/// `[{"name": .., "lon": .., "lat": ..}]`
pub fn read_destinations(path: &Path) -> anyhow::Result<Vec<Destination>> {
    read_json(path)
}

/// `[{"lon": .., "lat": ..}]`
pub fn read_references(path: &Path) -> anyhow::Result<Vec<Coordinate>> {
    read_json(path)
}

use futures::future::{self, BoxFuture};
use geo::{Distance, Haversine};

use crate::{
    coordinate::Coordinate, error::ProviderError, matrix_provider::MatrixProvider,
    travel_matrices::TravelMatrices,
};

/// Straight-line matrix at a constant speed. Never fails, so it is only useful
/// as the last provider of a chain.
pub struct AsTheCrowFlies {
    pub speed_kmh: f64,
}

pub fn as_the_crow_flies_matrices(
    sources: &[Coordinate],
    destinations: &[Coordinate],
    speed_kmh: f64,
) -> TravelMatrices {
    let haversine = Haversine;
    let meters_per_second = speed_kmh / 3.6;

    let mut distances = Vec::with_capacity(sources.len());
    let mut durations = Vec::with_capacity(sources.len());

    for from in sources {
        let from: geo_types::Point = from.into();

        let row: Vec<f64> = destinations
            .iter()
            .map(|to| haversine.distance(from, to.into()))
            .collect();

        durations.push(row.iter().map(|d| Some(d / meters_per_second)).collect());
        distances.push(row.into_iter().map(Some).collect());
    }

    TravelMatrices {
        distances,
        durations,
    }
}

impl MatrixProvider for AsTheCrowFlies {
    fn name(&self) -> &str {
        "as_the_crow_flies"
    }

    fn fetch_matrix<'a>(
        &'a self,
        sources: &'a [Coordinate],
        destinations: &'a [Coordinate],
    ) -> BoxFuture<'a, Result<TravelMatrices, ProviderError>> {
        Box::pin(future::ready(Ok(as_the_crow_flies_matrices(
            sources,
            destinations,
            self.speed_kmh,
        ))))
    }
}

use futures::future::BoxFuture;

use crate::{coordinate::Coordinate, error::ProviderError, travel_matrices::TravelMatrices};

/// A service able to compute a sources × destinations travel matrix.
///
/// Implementations return whatever the upstream answered; shape validation is
/// left to the caller so every provider is held to the same gate.
pub trait MatrixProvider: Send + Sync {
    fn name(&self) -> &str;

    fn fetch_matrix<'a>(
        &'a self,
        sources: &'a [Coordinate],
        destinations: &'a [Coordinate],
    ) -> BoxFuture<'a, Result<TravelMatrices, ProviderError>>;
}

use futures::future::BoxFuture;

use crate::{coordinate::Coordinate, error::ProviderError};

/// Forward and reverse geocoding capability.
///
/// `Ok(None)` means the provider answered but had no result.
pub trait GeocodeProvider: Send + Sync {
    fn name(&self) -> &str;

    fn geocode<'a>(
        &'a self,
        query: &'a str,
    ) -> BoxFuture<'a, Result<Option<Coordinate>, ProviderError>>;

    fn reverse_geocode<'a>(
        &'a self,
        coordinate: &'a Coordinate,
    ) -> BoxFuture<'a, Result<Option<String>, ProviderError>>;
}

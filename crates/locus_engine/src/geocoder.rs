use std::sync::Arc;

use locus_providers::geocode_provider::GeocodeProvider;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{
    Coordinate,
    cache::{CacheKey, CandidateCache, Computed},
};

type Providers = Arc<Vec<Box<dyn GeocodeProvider>>>;

/// Address <-> coordinate resolution over an ordered chain of providers,
/// cached per address and per coordinate.
///
/// Provider errors are logged and treated as "no result". Empty results are
/// returned but never cached.
pub struct Geocoder {
    providers: Providers,
    cache: CandidateCache,
}

async fn first_address(providers: &Providers, coordinate: &Coordinate) -> Option<String> {
    for provider in providers.iter() {
        match provider.reverse_geocode(coordinate).await {
            Ok(Some(address)) if !address.trim().is_empty() => return Some(address),
            Ok(_) => debug!("Geocoder: {} has no address for {}", provider.name(), coordinate),
            Err(error) => warn!("Geocoder: {} failed: {}", provider.name(), error),
        }
    }
    None
}

async fn first_coordinate(providers: &Providers, address: &str) -> Option<Coordinate> {
    for provider in providers.iter() {
        match provider.geocode(address).await {
            Ok(Some(coordinate)) if !coordinate.is_zero() => return Some(coordinate),
            Ok(_) => debug!("Geocoder: {} has no match for '{}'", provider.name(), address),
            Err(error) => warn!("Geocoder: {} failed: {}", provider.name(), error),
        }
    }
    None
}

impl Geocoder {
    pub fn new(providers: Vec<Box<dyn GeocodeProvider>>, cache: CandidateCache) -> Self {
        Self {
            providers: Arc::new(providers),
            cache,
        }
    }

    pub fn has_providers(&self) -> bool {
        !self.providers.is_empty()
    }

    /// Reverse geocodes `coordinate`, `""` when no provider knows it.
    pub async fn resolve_address(&self, coordinate: Coordinate) -> String {
        self.resolve_address_with(coordinate, false, &CancellationToken::new())
            .await
    }

    pub async fn resolve_address_with(
        &self,
        coordinate: Coordinate,
        override_cache: bool,
        cancel: &CancellationToken,
    ) -> String {
        if coordinate.is_zero() {
            return String::new();
        }

        let providers = Arc::clone(&self.providers);
        let observed = cancel.clone();

        let result = self
            .cache
            .get_or_compute(
                CacheKey::reverse_geocode(coordinate),
                override_cache,
                cancel,
                move || async move {
                    let address = tokio::select! {
                        _ = observed.cancelled() => None,
                        address = first_address(&providers, &coordinate) => address,
                    };

                    Ok(match address {
                        Some(address) => Computed::Complete(address),
                        None => Computed::Partial(String::new()),
                    })
                },
            )
            .await;

        result.unwrap_or_else(|error| {
            warn!("Geocoder: reverse lookup of {} failed: {}", coordinate, error);
            String::new()
        })
    }

    /// Geocodes `address`, [`Coordinate::ZERO`] when nothing matched. Blank
    /// addresses resolve to zero without any upstream call.
    pub async fn resolve_coordinate(&self, address: &str) -> Coordinate {
        self.resolve_coordinate_with(address, false, &CancellationToken::new())
            .await
    }

    pub async fn resolve_coordinate_with(
        &self,
        address: &str,
        override_cache: bool,
        cancel: &CancellationToken,
    ) -> Coordinate {
        let address = address.trim();
        if address.is_empty() {
            return Coordinate::ZERO;
        }

        let providers = Arc::clone(&self.providers);
        let observed = cancel.clone();
        let query = address.to_string();

        let result = self
            .cache
            .get_or_compute(CacheKey::geocode(address), override_cache, cancel, move || async move {
                let coordinate = tokio::select! {
                    _ = observed.cancelled() => None,
                    coordinate = first_coordinate(&providers, &query) => coordinate,
                };

                Ok(match coordinate {
                    Some(coordinate) => Computed::Complete(coordinate),
                    None => Computed::Partial(Coordinate::ZERO),
                })
            })
            .await;

        result.unwrap_or_else(|error| {
            warn!("Geocoder: lookup of '{}' failed: {}", address, error);
            Coordinate::ZERO
        })
    }
}

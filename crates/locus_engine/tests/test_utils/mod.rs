#![allow(dead_code)]

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};
use std::time::Duration;

use futures::{FutureExt, future::BoxFuture};
use locus_engine::{
    Coordinate, Destination,
    cache::{MemoryStore, PersistentStore},
    config::{BatchParams, EngineConfig},
    engine::Engine,
};
use locus_providers::{
    error::ProviderError, geocode_provider::GeocodeProvider, matrix_provider::MatrixProvider,
    travel_matrices::TravelMatrices,
};

/// Meters per degree of manhattan distance in the stub matrices.
pub const METERS_PER_DEGREE: f64 = 100_000.0;
/// Stub travel speed in meters per second.
pub const SPEED: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Behavior {
    /// Manhattan distance scaled by [`METERS_PER_DEGREE`]
    Costs,
    Fail,
    /// Fails whenever the coordinate is a source or a destination
    Poison(Coordinate),
    /// Reports `null` cells towards the coordinate
    Unreachable(Coordinate),
}

pub struct StubMatrix {
    name: &'static str,
    behavior: Behavior,
    delay: Option<Duration>,
    calls: Arc<AtomicUsize>,
}

impl StubMatrix {
    pub fn new(name: &'static str, behavior: Behavior) -> Self {
        Self {
            name,
            behavior,
            delay: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }

    pub fn boxed(self) -> Box<dyn MatrixProvider> {
        Box::new(self)
    }
}

pub fn stub_cost(from: &Coordinate, to: &Coordinate) -> (f64, f64) {
    let distance = ((from.lon - to.lon).abs() + (from.lat - to.lat).abs()) * METERS_PER_DEGREE;
    (distance, distance / SPEED)
}

impl MatrixProvider for StubMatrix {
    fn name(&self) -> &str {
        self.name
    }

    fn fetch_matrix<'a>(
        &'a self,
        sources: &'a [Coordinate],
        destinations: &'a [Coordinate],
    ) -> BoxFuture<'a, Result<TravelMatrices, ProviderError>> {
        async move {
            self.calls.fetch_add(1, Ordering::SeqCst);

            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }

            let unreachable = match self.behavior {
                Behavior::Fail => {
                    return Err(ProviderError::JobFailed(format!("{} is down", self.name)));
                }
                Behavior::Poison(poison)
                    if sources.contains(&poison) || destinations.contains(&poison) =>
                {
                    return Err(ProviderError::JobFailed(format!("{} hit poison", self.name)));
                }
                Behavior::Unreachable(coordinate) => Some(coordinate),
                _ => None,
            };

            let mut matrices = TravelMatrices::default();
            for source in sources {
                let (distances, durations): (Vec<_>, Vec<_>) = destinations
                    .iter()
                    .map(|destination| {
                        if Some(*destination) == unreachable {
                            (None, None)
                        } else {
                            let (distance, duration) = stub_cost(source, destination);
                            (Some(distance), Some(duration))
                        }
                    })
                    .unzip();
                matrices.distances.push(distances);
                matrices.durations.push(durations);
            }

            Ok(matrices)
        }
        .boxed()
    }
}

pub struct StubGeocoder {
    address: &'static str,
    calls: Arc<AtomicUsize>,
    failures: AtomicUsize,
}

impl StubGeocoder {
    pub fn new(address: &'static str) -> Self {
        Self {
            address,
            calls: Arc::new(AtomicUsize::new(0)),
            failures: AtomicUsize::new(0),
        }
    }

    /// Fails the first `failures` reverse lookups
    pub fn failing_first(self, failures: usize) -> Self {
        self.failures.store(failures, Ordering::SeqCst);
        self
    }

    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }

    pub fn boxed(self) -> Box<dyn GeocodeProvider> {
        Box::new(self)
    }
}

impl GeocodeProvider for StubGeocoder {
    fn name(&self) -> &str {
        "stub"
    }

    fn geocode<'a>(
        &'a self,
        _query: &'a str,
    ) -> BoxFuture<'a, Result<Option<Coordinate>, ProviderError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        futures::future::ready(Ok(Some(Coordinate::new(4.3677, 50.8427)))).boxed()
    }

    fn reverse_geocode<'a>(
        &'a self,
        _coordinate: &'a Coordinate,
    ) -> BoxFuture<'a, Result<Option<String>, ProviderError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let failing = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        let result = if failing {
            Err(ProviderError::Timeout(1))
        } else {
            Ok(Some(self.address.to_string()))
        };

        futures::future::ready(result).boxed()
    }
}

pub fn config(batch: BatchParams) -> EngineConfig {
    EngineConfig {
        batch,
        ..EngineConfig::default()
    }
}

pub fn batch_params(batch_size: usize, concurrency: usize, max_attempts: u32) -> BatchParams {
    BatchParams {
        batch_size,
        concurrency,
        max_attempts,
        ..BatchParams::default()
    }
}

pub fn engine(
    matrix_providers: Vec<Box<dyn MatrixProvider>>,
    geocode_providers: Vec<Box<dyn GeocodeProvider>>,
    config: &EngineConfig,
) -> (Engine, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::default());
    let engine = Engine::new(
        matrix_providers,
        geocode_providers,
        Arc::clone(&store) as Arc<dyn PersistentStore>,
        config,
    );
    (engine, store)
}

pub fn destination(name: &str, lon: f64, lat: f64) -> Destination {
    Destination::new(name, Coordinate::new(lon, lat))
}

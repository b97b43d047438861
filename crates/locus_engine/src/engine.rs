use std::{collections::HashSet, sync::Arc, time::Duration};

use locus_providers::{geocode_provider::GeocodeProvider, matrix_provider::MatrixProvider};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::{
    Coordinate, Destination,
    cache::{CacheKey, CandidateCache, Computed, PersistentStore},
    config::EngineConfig,
    error::LocusError,
    geocoder::Geocoder,
    matrix_router::MatrixRouter,
    orchestrator::BatchOrchestrator,
    route_table::{AVERAGE_KEY, RouteTable},
};

/// Address and travel costs of one candidate point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateEvaluation {
    pub coordinate: Coordinate,
    /// `""` when no geocoder could name the point
    pub address: String,
    pub routes: RouteTable,
    /// `false` when the evaluation was cut short by cancellation. Incomplete
    /// evaluations are never cached, neither are routed ones whose address
    /// could not be resolved.
    pub complete: bool,
}

/// Entry point of the travel-cost aggregation engine.
///
/// Constructed once and shared; the cache, the batch permits and the
/// in-flight registry are common to every evaluation it runs.
pub struct Engine {
    geocoder: Arc<Geocoder>,
    orchestrator: Arc<BatchOrchestrator>,
    cache: CandidateCache,
    pub(crate) candidate_concurrency: usize,
    request_timeout: Option<Duration>,
}

impl Engine {
    pub fn new(
        matrix_providers: Vec<Box<dyn MatrixProvider>>,
        geocode_providers: Vec<Box<dyn GeocodeProvider>>,
        store: Arc<dyn PersistentStore>,
        config: &EngineConfig,
    ) -> Self {
        let cache = CandidateCache::new(store, config.cache.clone());
        let router = Arc::new(MatrixRouter::new(matrix_providers));

        Self {
            geocoder: Arc::new(Geocoder::new(geocode_providers, cache.clone())),
            orchestrator: Arc::new(BatchOrchestrator::new(
                router,
                cache.clone(),
                config.batch.clone(),
            )),
            cache,
            candidate_concurrency: config.candidate_concurrency.max(1),
            request_timeout: config.request_timeout.map(|t| t.unsigned_abs()),
        }
    }

    pub fn from_config(config: &EngineConfig) -> anyhow::Result<Self> {
        config.validate()?;

        let matrix_providers = config.build_matrix_providers();
        if matrix_providers.is_empty() {
            anyhow::bail!("No usable matrix provider configured");
        }

        let geocode_providers = config.build_geocode_providers();
        let store = config.build_store()?;

        info!(
            "Engine: {} matrix providers, {} geocode providers, cache in {}",
            matrix_providers.len(),
            geocode_providers.len(),
            config
                .cache
                .folder
                .as_ref()
                .map(|f| f.display().to_string())
                .unwrap_or_else(|| "memory".to_string())
        );

        Ok(Self::new(matrix_providers, geocode_providers, store, config))
    }

    pub fn cache(&self) -> &CandidateCache {
        &self.cache
    }

    pub fn geocoder(&self) -> &Geocoder {
        &self.geocoder
    }

    pub fn orchestrator(&self) -> &BatchOrchestrator {
        &self.orchestrator
    }

    /// Token cancelled with `parent` or after `timeout`, whichever comes first.
    pub fn with_deadline(parent: &CancellationToken, timeout: Duration) -> CancellationToken {
        let token = parent.child_token();
        let timer = token.clone();

        tokio::spawn(async move {
            tokio::select! {
                _ = timer.cancelled() => {}
                _ = tokio::time::sleep(timeout) => timer.cancel(),
            }
        });

        token
    }

    /// Child of `parent` that is also cancelled once the configured request
    /// timeout elapses.
    fn request_token(&self, parent: &CancellationToken) -> CancellationToken {
        match self.request_timeout {
            Some(timeout) => Self::with_deadline(parent, timeout),
            None => parent.child_token(),
        }
    }

    /// Resolves the address of `coordinate` and its travel cost to every
    /// destination.
    ///
    /// Complete results are cached per coordinate and destination set. On
    /// cancellation the partial evaluation is returned uncached, or
    /// [`LocusError::Cancelled`] when nothing was routed yet.
    pub async fn evaluate_candidate(
        &self,
        coordinate: Coordinate,
        destinations: &[Destination],
        override_cache: bool,
        cancel: &CancellationToken,
    ) -> Result<CandidateEvaluation, LocusError> {
        validate_request(&coordinate, destinations)?;

        let key = CacheKey::candidate(coordinate, destinations);
        let geocoder = Arc::clone(&self.geocoder);
        let orchestrator = Arc::clone(&self.orchestrator);
        let destinations = destinations.to_vec();
        let cancel = self.request_token(cancel);
        let observed = cancel.clone();
        // Stops the deadline timer once the computation is over, or dropped
        // without running because another caller's result was joined.
        let deadline = cancel.clone().drop_guard();

        self.cache
            .get_or_compute(key, override_cache, &cancel, move || async move {
                let _deadline = deadline;

                let (address, outcome) = tokio::join!(
                    geocoder.resolve_address_with(coordinate, override_cache, &observed),
                    orchestrator.route_table(coordinate, &destinations, override_cache, &observed),
                );

                if outcome.cancelled {
                    if outcome.routes.is_empty() {
                        return Err(LocusError::Cancelled);
                    }

                    return Ok(Computed::Partial(CandidateEvaluation {
                        coordinate,
                        address,
                        routes: outcome.routes,
                        complete: false,
                    }));
                }

                if outcome.routes.is_empty() {
                    return Err(LocusError::ProviderExhausted(format!(
                        "none of the {} destinations could be routed from {}",
                        destinations.len(),
                        coordinate
                    )));
                }

                let unnamed = address.is_empty() && geocoder.has_providers();
                let evaluation = CandidateEvaluation {
                    coordinate,
                    address,
                    routes: outcome.routes,
                    complete: true,
                };

                // A missing address may be a transient geocoder failure, keep
                // it out of the cache so the next evaluation retries it.
                Ok(if unnamed {
                    Computed::Partial(evaluation)
                } else {
                    Computed::Complete(evaluation)
                })
            })
            .await
    }
}

fn validate_request(coordinate: &Coordinate, destinations: &[Destination]) -> Result<(), LocusError> {
    if destinations.is_empty() {
        return Err(LocusError::NoDestinations);
    }

    if coordinate.is_zero() || !coordinate.lon.is_finite() || !coordinate.lat.is_finite() {
        return Err(LocusError::InvalidInput(format!(
            "candidate coordinate {} is unresolved",
            coordinate
        )));
    }

    let mut names = HashSet::with_capacity(destinations.len());
    for destination in destinations {
        if destination.name == AVERAGE_KEY {
            return Err(LocusError::InvalidInput(format!(
                "destination name '{}' is reserved",
                AVERAGE_KEY
            )));
        }
        if !names.insert(destination.name.as_str()) {
            return Err(LocusError::InvalidInput(format!(
                "destination '{}' appears more than once",
                destination.name
            )));
        }
    }

    Ok(())
}

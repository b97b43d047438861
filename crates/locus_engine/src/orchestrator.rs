use std::sync::Arc;

use futures::future::join_all;
use locus_providers::travel_matrices::TravelMatrices;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{
    Coordinate, Destination,
    cache::{CacheKey, CandidateCache, Computed},
    config::BatchParams,
    error::LocusError,
    matrix_router::MatrixRouter,
    route_table::{RouteTable, TravelCost},
};

/// Lifecycle of one batch of destinations.
///
/// `Pending -> Running -> {Succeeded | RetryScheduled -> Running | Exhausted}`.
/// `Cancelled` can be reached from any non-terminal state.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BatchState {
    Pending,
    Running { attempt: u32 },
    RetryScheduled { attempt: u32 },
    Succeeded { attempts: u32 },
    Exhausted { attempts: u32 },
    Cancelled { attempts: u32 },
}

impl BatchState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BatchState::Succeeded { .. } | BatchState::Exhausted { .. } | BatchState::Cancelled { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchReport {
    pub index: usize,
    pub destinations: usize,
    pub state: BatchState,
}

#[derive(Debug, Clone)]
pub struct OrchestratorOutcome {
    pub routes: RouteTable,
    pub batches: Vec<BatchReport>,
    /// Set when the token fired before every batch finished. The routes are
    /// then partial and carry no average.
    pub cancelled: bool,
}

struct BatchRun {
    index: usize,
    state: BatchState,
}

impl BatchRun {
    fn transition(&mut self, state: BatchState) {
        debug!("Batch {}: {:?} -> {:?}", self.index, self.state, state);
        self.state = state;
    }
}

/// Splits destinations into batches and routes them with bounded parallelism,
/// retries and partial-failure tolerance.
pub struct BatchOrchestrator {
    router: Arc<MatrixRouter>,
    cache: CandidateCache,
    permits: Arc<Semaphore>,
    params: BatchParams,
}

impl BatchOrchestrator {
    pub fn new(router: Arc<MatrixRouter>, cache: CandidateCache, params: BatchParams) -> Self {
        Self {
            router,
            cache,
            permits: Arc::new(Semaphore::new(params.concurrency.max(1))),
            params,
        }
    }

    pub fn params(&self) -> &BatchParams {
        &self.params
    }

    /// Routes `source` to every destination. Batches that exhaust their
    /// attempts are left out of the table; the average is only computed once
    /// every batch reached a terminal state and the run wasn't cancelled.
    pub async fn route_table(
        &self,
        source: Coordinate,
        destinations: &[Destination],
        override_cache: bool,
        cancel: &CancellationToken,
    ) -> OrchestratorOutcome {
        let runs = destinations
            .chunks(self.params.batch_size.max(1))
            .enumerate()
            .map(|(index, batch)| self.run_batch(index, source, batch, override_cache, cancel));

        let results = join_all(runs).await;

        let mut routes = RouteTable::default();
        let mut batches = Vec::with_capacity(results.len());
        for (report, table) in results {
            routes.merge(table);
            batches.push(report);
        }

        let cancelled = batches
            .iter()
            .any(|b| matches!(b.state, BatchState::Cancelled { .. }));

        if !cancelled {
            routes.compute_average();
        }

        OrchestratorOutcome {
            routes,
            batches,
            cancelled,
        }
    }

    async fn run_batch(
        &self,
        index: usize,
        source: Coordinate,
        batch: &[Destination],
        override_cache: bool,
        cancel: &CancellationToken,
    ) -> (BatchReport, RouteTable) {
        let mut run = BatchRun {
            index,
            state: BatchState::Pending,
        };
        let mut attempts = 0;

        let table = loop {
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                permit = self.permits.acquire() => permit.ok(),
            };

            let Some(permit) = permit else {
                run.transition(BatchState::Cancelled { attempts });
                break RouteTable::default();
            };

            attempts += 1;
            run.transition(BatchState::Running { attempt: attempts });

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(LocusError::Cancelled),
                result = self.fetch_batch(source, batch, override_cache) => result,
            };
            drop(permit);

            match result {
                Ok(table) => {
                    run.transition(BatchState::Succeeded { attempts });
                    break table;
                }
                Err(LocusError::Cancelled) => {
                    run.transition(BatchState::Cancelled { attempts });
                    break RouteTable::default();
                }
                Err(error) if attempts >= self.params.max_attempts => {
                    warn!(
                        "Batch {}: giving up on {} destinations after {} attempts: {}",
                        index,
                        batch.len(),
                        attempts,
                        error
                    );
                    run.transition(BatchState::Exhausted { attempts });
                    break RouteTable::default();
                }
                Err(error) => {
                    let delay = self.params.backoff(attempts - 1);
                    warn!(
                        "Batch {}: attempt {} failed, retrying in {:?}: {}",
                        index, attempts, delay, error
                    );
                    run.transition(BatchState::RetryScheduled { attempt: attempts });

                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => {
                            run.transition(BatchState::Cancelled { attempts });
                            break RouteTable::default();
                        }
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        };

        let report = BatchReport {
            index,
            destinations: batch.len(),
            state: run.state,
        };

        (report, table)
    }

    async fn fetch_batch(
        &self,
        source: Coordinate,
        batch: &[Destination],
        override_cache: bool,
    ) -> Result<RouteTable, LocusError> {
        let coordinates: Vec<Coordinate> = batch.iter().map(|d| d.coordinate).collect();
        let key = CacheKey::matrix(&[source], &coordinates);
        let router = Arc::clone(&self.router);

        // Matrix fetches ignore cancellation: an abandoned fetch still
        // completes and lands in the cache for the next attempt.
        let matrices: TravelMatrices = self
            .cache
            .get_or_compute(key, override_cache, &CancellationToken::new(), move || async move {
                router
                    .get_matrix(&[source], &coordinates)
                    .await
                    .map(Computed::Complete)
            })
            .await?;

        let row: Vec<(Option<f64>, Option<f64>)> = matrices.row(0).collect();

        if row.is_empty() || row.len() < batch.len() {
            return Err(LocusError::UpstreamTransient(format!(
                "matrix row has {} entries for {} destinations",
                row.len(),
                batch.len()
            )));
        }

        let mut table = RouteTable::default();
        for (destination, cell) in batch.iter().zip(row) {
            match cell {
                (Some(distance), Some(duration)) if distance.is_finite() && duration.is_finite() => {
                    table.insert(
                        destination.name.clone(),
                        TravelCost::new(distance, duration),
                    )?;
                }
                _ => debug!("Batch: {} is unreachable from {}", destination.name, source),
            }
        }

        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(!BatchState::Pending.is_terminal());
        assert!(!BatchState::Running { attempt: 1 }.is_terminal());
        assert!(!BatchState::RetryScheduled { attempt: 1 }.is_terminal());
        assert!(BatchState::Succeeded { attempts: 1 }.is_terminal());
        assert!(BatchState::Exhausted { attempts: 5 }.is_terminal());
        assert!(BatchState::Cancelled { attempts: 0 }.is_terminal());
    }
}

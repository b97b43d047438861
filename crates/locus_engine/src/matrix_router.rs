use locus_providers::{matrix_provider::MatrixProvider, travel_matrices::TravelMatrices};
use tracing::{debug, warn};

use crate::{Coordinate, error::LocusError};

/// Ordered chain of matrix providers. The first well-formed answer wins.
pub struct MatrixRouter {
    providers: Vec<Box<dyn MatrixProvider>>,
}

impl MatrixRouter {
    pub fn new(providers: Vec<Box<dyn MatrixProvider>>) -> Self {
        Self { providers }
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Fails with [`LocusError::ProviderExhausted`] when no provider returned a
    /// matrix of `sources.len()` rows by `destinations.len()` columns.
    pub async fn get_matrix(
        &self,
        sources: &[Coordinate],
        destinations: &[Coordinate],
    ) -> Result<TravelMatrices, LocusError> {
        if sources.is_empty() || destinations.is_empty() {
            return Err(LocusError::InvalidInput(
                "matrix request needs at least one source and one destination".to_string(),
            ));
        }

        let mut failures = Vec::with_capacity(self.providers.len());

        for provider in &self.providers {
            let result = provider
                .fetch_matrix(sources, destinations)
                .await
                .and_then(|matrices| {
                    matrices.validate(sources.len(), destinations.len())?;
                    Ok(matrices)
                });

            match result {
                Ok(matrices) => {
                    debug!(
                        "MatrixRouter: {} answered {}x{}",
                        provider.name(),
                        sources.len(),
                        destinations.len()
                    );
                    return Ok(matrices);
                }
                Err(error) => {
                    warn!(
                        "MatrixRouter: {} failed, trying next provider: {}",
                        provider.name(),
                        error
                    );
                    failures.push(format!("{}: {}", provider.name(), error));
                }
            }
        }

        if failures.is_empty() {
            return Err(LocusError::ProviderExhausted(
                "no matrix provider configured".to_string(),
            ));
        }

        Err(LocusError::ProviderExhausted(failures.join("; ")))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use futures::future::{self, BoxFuture, FutureExt};
    use locus_providers::error::ProviderError;

    use super::*;

    enum Behavior {
        Fail,
        ShortRows,
        Full,
    }

    struct Scripted {
        behavior: Behavior,
        calls: Arc<AtomicUsize>,
    }

    impl Scripted {
        fn new(behavior: Behavior) -> Box<dyn MatrixProvider> {
            Self::counted(behavior, Arc::default())
        }

        fn counted(behavior: Behavior, calls: Arc<AtomicUsize>) -> Box<dyn MatrixProvider> {
            Box::new(Self { behavior, calls })
        }
    }

    impl MatrixProvider for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        fn fetch_matrix<'a>(
            &'a self,
            sources: &'a [Coordinate],
            destinations: &'a [Coordinate],
        ) -> BoxFuture<'a, Result<TravelMatrices, ProviderError>> {
            self.calls.fetch_add(1, Ordering::SeqCst);

            let columns = match self.behavior {
                Behavior::Fail => {
                    return future::ready(Err(ProviderError::Timeout(1))).boxed();
                }
                Behavior::ShortRows => destinations.len() - 1,
                Behavior::Full => destinations.len(),
            };

            let rows = vec![vec![Some(1.0); columns]; sources.len()];
            future::ready(Ok(TravelMatrices {
                distances: rows.clone(),
                durations: rows,
            }))
            .boxed()
        }
    }

    fn points(n: usize) -> Vec<Coordinate> {
        (0..n).map(|i| Coordinate::new(i as f64, 1.0)).collect()
    }

    #[tokio::test]
    async fn test_falls_back_to_next_provider() {
        let router = MatrixRouter::new(vec![
            Scripted::new(Behavior::Fail),
            Scripted::new(Behavior::Full),
        ]);

        let matrices = router.get_matrix(&points(1), &points(3)).await.unwrap();

        assert_eq!(matrices.distances, vec![vec![Some(1.0); 3]]);
    }

    #[tokio::test]
    async fn test_short_rows_trigger_fallback() {
        let router = MatrixRouter::new(vec![
            Scripted::new(Behavior::ShortRows),
            Scripted::new(Behavior::Full),
        ]);

        let matrices = router.get_matrix(&points(2), &points(3)).await.unwrap();

        assert!(matrices.validate(2, 3).is_ok());
    }

    #[tokio::test]
    async fn test_exhausted() {
        let router = MatrixRouter::new(vec![
            Scripted::new(Behavior::Fail),
            Scripted::new(Behavior::ShortRows),
        ]);

        let result = router.get_matrix(&points(1), &points(3)).await;

        assert!(matches!(result, Err(LocusError::ProviderExhausted(_))));
    }

    #[tokio::test]
    async fn test_no_providers() {
        let router = MatrixRouter::new(vec![]);

        assert!(matches!(
            router.get_matrix(&points(1), &points(1)).await,
            Err(LocusError::ProviderExhausted(_))
        ));
    }

    #[tokio::test]
    async fn test_stops_at_first_success() {
        let first_calls = Arc::new(AtomicUsize::new(0));
        let second_calls = Arc::new(AtomicUsize::new(0));
        let router = MatrixRouter::new(vec![
            Scripted::counted(Behavior::Full, Arc::clone(&first_calls)),
            Scripted::counted(Behavior::Full, Arc::clone(&second_calls)),
        ]);

        router.get_matrix(&points(1), &points(2)).await.unwrap();

        assert_eq!(first_calls.load(Ordering::SeqCst), 1);
        assert_eq!(second_calls.load(Ordering::SeqCst), 0);
    }
}

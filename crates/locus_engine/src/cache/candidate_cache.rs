use std::{
    future::Future,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use base64::{Engine, engine::general_purpose::STANDARD};
use futures::{
    FutureExt,
    future::{BoxFuture, Shared},
};
use fxhash::FxHashMap;
use jiff::{SignedDuration, Timestamp};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{
    cache::{
        codec,
        key::{CacheKey, CacheKind},
        store::PersistentStore,
    },
    config::CacheParams,
    error::LocusError,
};

/// Result of a computation handed to [`CandidateCache::get_or_compute`].
pub enum Computed<T> {
    /// Persisted and returned.
    Complete(T),
    /// Returned but never persisted, e.g. cancelled or unresolved results.
    Partial(T),
}

/// What is written to the store, as JSON.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub fingerprint: String,
    pub expires_at: Timestamp,
    /// Base64 of the codec output
    pub payload: String,
}

/// A computation running for one storage key, shared by every caller that
/// joins it.
struct InFlight {
    id: u64,
    /// Token the computation observes. Once cancelled, new callers start
    /// their own computation instead of joining.
    cancel: CancellationToken,
    /// Whether the computation starts with a store lookup
    reads_store: bool,
    result: Shared<BoxFuture<'static, Result<Arc<[u8]>, LocusError>>>,
}

impl InFlight {
    fn joinable(&self, override_cache: bool) -> bool {
        !self.cancel.is_cancelled() && !(override_cache && self.reads_store)
    }
}

type InFlightRegistry = Arc<Mutex<FxHashMap<String, InFlight>>>;

/// Removes the registry entry of a finished computation, unless a newer one
/// replaced it.
struct Registration {
    registry: InFlightRegistry,
    storage_key: String,
    id: u64,
}

impl Drop for Registration {
    fn drop(&mut self) {
        let mut registry = self.registry.lock();
        if registry
            .get(&self.storage_key)
            .is_some_and(|entry| entry.id == self.id)
        {
            registry.remove(&self.storage_key);
        }
    }
}

/// Cache-aside wrapper over a [`PersistentStore`].
///
/// Cheap to clone; clones share the store and the in-flight registry.
#[derive(Clone)]
pub struct CandidateCache {
    store: Arc<dyn PersistentStore>,
    in_flight: InFlightRegistry,
    next_id: Arc<AtomicU64>,
    params: Arc<CacheParams>,
}

impl CandidateCache {
    pub fn new(store: Arc<dyn PersistentStore>, params: CacheParams) -> Self {
        Self {
            store,
            in_flight: Arc::default(),
            next_id: Arc::default(),
            params: Arc::new(params),
        }
    }

    fn ttl(&self, kind: CacheKind) -> SignedDuration {
        match kind {
            CacheKind::Geocode | CacheKind::ReverseGeocode => self.params.geocode_ttl,
            CacheKind::Matrix => self.params.matrix_ttl,
            CacheKind::Candidate => self.params.candidate_ttl,
        }
    }

    /// Number of computations currently running.
    pub fn in_flight_len(&self) -> usize {
        self.in_flight.lock().len()
    }

    /// Looks `key` up in the store. Expired entries are misses; unreadable
    /// entries are [`LocusError::CacheCorruption`].
    pub async fn get<T>(&self, key: &CacheKey) -> Result<Option<T>, LocusError>
    where
        T: DeserializeOwned,
    {
        let Some(raw) = self.store.get_string(&key.storage_key()).await? else {
            return Ok(None);
        };

        let entry: CacheEntry = serde_json::from_str(&raw)
            .map_err(|e| LocusError::CacheCorruption(format!("envelope: {}", e)))?;

        if entry.fingerprint != key.fingerprint() {
            return Err(LocusError::CacheCorruption(
                "fingerprint mismatch".to_string(),
            ));
        }

        if entry.expires_at <= Timestamp::now() {
            debug!("Cache: {} expired at {}", key.kind().tag(), entry.expires_at);
            return Ok(None);
        }

        let compressed = STANDARD
            .decode(entry.payload.as_bytes())
            .map_err(|e| LocusError::CacheCorruption(format!("payload: {}", e)))?;
        let bytes = codec::decompress(&compressed)?;

        let value = serde_json::from_slice(&bytes)
            .map_err(|e| LocusError::CacheCorruption(format!("value: {}", e)))?;

        Ok(Some(value))
    }

    /// Returns the cached value for `key`, or runs `compute` and stores its
    /// result.
    ///
    /// One computation runs per key: it looks the store up, then runs
    /// `compute` on a miss. Other callers await it instead of starting their
    /// own, unless its `cancel` token already fired. The computation is
    /// spawned, so it finishes and unregisters itself even when every caller
    /// went away. Errors are returned to every waiter and nothing is stored.
    /// `override_cache` skips the lookup but still deduplicates and stores.
    pub async fn get_or_compute<T, F, Fut>(
        &self,
        key: CacheKey,
        override_cache: bool,
        cancel: &CancellationToken,
        compute: F,
    ) -> Result<T, LocusError>
    where
        T: Serialize + DeserializeOwned + Send + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Computed<T>, LocusError>> + Send + 'static,
    {
        let storage_key = key.storage_key();

        let in_flight = {
            let mut registry = self.in_flight.lock();

            let joined = registry
                .get(&storage_key)
                .filter(|entry| entry.joinable(override_cache))
                .map(|entry| entry.result.clone());

            match joined {
                Some(result) => {
                    debug!("Cache: joining in-flight {}", key.kind().tag());
                    result
                }
                None => {
                    let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                    let task = tokio::spawn(self.computation(
                        key,
                        storage_key.clone(),
                        id,
                        override_cache,
                        compute(),
                    ));

                    let result = task
                        .map(|joined| {
                            joined.unwrap_or_else(|error| {
                                Err(LocusError::UpstreamUnavailable(format!(
                                    "cache computation aborted: {}",
                                    error
                                )))
                            })
                        })
                        .boxed()
                        .shared();

                    registry.insert(
                        storage_key,
                        InFlight {
                            id,
                            cancel: cancel.clone(),
                            reads_store: !override_cache,
                            result: result.clone(),
                        },
                    );
                    result
                }
            }
        };

        let bytes = in_flight.await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn computation<T, Fut>(
        &self,
        key: CacheKey,
        storage_key: String,
        id: u64,
        override_cache: bool,
        compute: Fut,
    ) -> impl Future<Output = Result<Arc<[u8]>, LocusError>> + Send + 'static
    where
        T: Serialize + DeserializeOwned + Send + 'static,
        Fut: Future<Output = Result<Computed<T>, LocusError>> + Send + 'static,
    {
        let cache = self.clone();

        async move {
            let _registration = Registration {
                registry: Arc::clone(&cache.in_flight),
                storage_key: storage_key.clone(),
                id,
            };

            if !override_cache {
                match cache.get::<T>(&key).await {
                    Ok(Some(value)) => {
                        debug!("Cache: {} hit", key.kind().tag());
                        return Ok(Arc::from(serde_json::to_vec(&value)?));
                    }
                    Ok(None) => {}
                    Err(error) => warn!("Cache: {} treated as miss: {}", key.kind().tag(), error),
                }
            }

            match compute.await? {
                Computed::Complete(value) => {
                    let bytes = serde_json::to_vec(&value)?;
                    if let Err(error) = persist(
                        cache.store.as_ref(),
                        &storage_key,
                        key.fingerprint(),
                        cache.ttl(key.kind()),
                        &bytes,
                    )
                    .await
                    {
                        warn!("Cache: failed to store {}: {}", storage_key, error);
                    }
                    Ok(Arc::from(bytes))
                }
                Computed::Partial(value) => Ok(Arc::from(serde_json::to_vec(&value)?)),
            }
        }
    }
}

async fn persist(
    store: &dyn PersistentStore,
    storage_key: &str,
    fingerprint: String,
    ttl: SignedDuration,
    bytes: &[u8],
) -> Result<(), LocusError> {
    let expires_at = Timestamp::now()
        .checked_add(ttl)
        .map_err(|e| LocusError::Store(e.to_string()))?;

    let entry = CacheEntry {
        fingerprint,
        expires_at,
        payload: STANDARD.encode(codec::compress(bytes)?),
    };

    store
        .set_string(storage_key, serde_json::to_string(&entry)?)
        .await
}

use std::{fs::File, io::BufReader, path::Path, path::PathBuf, sync::Arc, time::Duration};

use jiff::SignedDuration;
use locus_providers::{
    as_the_crow_flies::AsTheCrowFlies,
    error::ProviderError,
    geocode_provider::GeocodeProvider,
    graphhopper_api::{GraphHopperMatrixClient, GraphHopperProfile, GraphhopperMatrixClientParams},
    matrix_provider::MatrixProvider,
    nominatim::{NOMINATIM_PUBLIC_URL, NominatimClient},
    osrm::{OsrmMatrixClient, OsrmMatrixClientParams},
    photon::{PHOTON_PUBLIC_URL, PhotonClient},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::cache::{FileStore, MemoryStore, PersistentStore};

const CACHE_FOLDER_ENV_VAR: &str = "LOCUS_CACHE_FOLDER";
const GRAPHHOPPER_API_KEY_ENV_VAR: &str = "GRAPHHOPPER_API_KEY";

#[derive(Deserialize, Serialize, JsonSchema, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MatrixProviderConfig {
    /// Self-hosted OSRM table service
    Osrm { url: String, profile: String },
    /// https://docs.graphhopper.com/openapi/matrices, key read from `GRAPHHOPPER_API_KEY`
    GraphHopperApi { profile: GraphHopperProfile },
    /// Straight-line distances at a constant speed
    AsTheCrowFlies { speed_kmh: f64 },
}

#[derive(Deserialize, Serialize, JsonSchema, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GeocodeProviderConfig {
    Nominatim { url: String },
    Photon { url: String },
}

#[derive(Deserialize, Serialize, JsonSchema, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct BatchParams {
    /// Destinations per matrix request
    pub batch_size: usize,
    /// Matrix requests in flight at once, across all candidates
    pub concurrency: usize,
    /// Attempts per batch before its destinations are dropped
    pub max_attempts: u32,
    /// Delay before the first retry, doubled on each following one
    pub base_delay: SignedDuration,
}

impl Default for BatchParams {
    fn default() -> Self {
        Self {
            batch_size: 25,
            concurrency: 4,
            max_attempts: 5,
            base_delay: SignedDuration::from_millis(500),
        }
    }
}

impl BatchParams {
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay
            .unsigned_abs()
            .saturating_mul(2u32.saturating_pow(attempt))
    }
}

#[derive(Deserialize, Serialize, JsonSchema, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct CacheParams {
    /// Folder for the file store; entries are kept in memory when unset
    pub folder: Option<PathBuf>,
    pub geocode_ttl: SignedDuration,
    pub matrix_ttl: SignedDuration,
    pub candidate_ttl: SignedDuration,
}

const FOUR_WEEKS: SignedDuration = SignedDuration::from_hours(24 * 28);

impl Default for CacheParams {
    fn default() -> Self {
        Self {
            folder: None,
            geocode_ttl: FOUR_WEEKS,
            matrix_ttl: FOUR_WEEKS,
            candidate_ttl: FOUR_WEEKS,
        }
    }
}

#[derive(Deserialize, Serialize, JsonSchema, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Tried in order until one returns a well-formed matrix
    pub matrix_providers: Vec<MatrixProviderConfig>,
    /// Tried in order until one returns a result
    pub geocode_providers: Vec<GeocodeProviderConfig>,
    pub batch: BatchParams,
    pub cache: CacheParams,
    /// Candidates evaluated at once during a grid search
    pub candidate_concurrency: usize,
    /// Deadline for a single candidate evaluation
    pub request_timeout: Option<SignedDuration>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            matrix_providers: vec![
                MatrixProviderConfig::Osrm {
                    url: "http://localhost:5000".to_string(),
                    profile: "driving".to_string(),
                },
                MatrixProviderConfig::GraphHopperApi {
                    profile: GraphHopperProfile::Car,
                },
            ],
            geocode_providers: vec![
                GeocodeProviderConfig::Nominatim {
                    url: NOMINATIM_PUBLIC_URL.to_string(),
                },
                GeocodeProviderConfig::Photon {
                    url: PHOTON_PUBLIC_URL.to_string(),
                },
            ],
            batch: BatchParams::default(),
            cache: CacheParams::default(),
            candidate_concurrency: 4,
            request_timeout: None,
        }
    }
}

impl EngineConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let file = File::open(path)?;
        let config: EngineConfig = serde_json::from_reader(BufReader::new(file))?;
        config.validate()?;
        Ok(config)
    }

    /// Applies `LOCUS_CACHE_FOLDER` on top of the loaded values.
    pub fn with_env(mut self) -> Self {
        if let Ok(folder) = std::env::var(CACHE_FOLDER_ENV_VAR) {
            self.cache.folder = Some(PathBuf::from(folder));
        }
        self
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.batch.batch_size == 0 {
            anyhow::bail!("batch.batch_size must be at least 1");
        }
        if self.batch.concurrency == 0 {
            anyhow::bail!("batch.concurrency must be at least 1");
        }
        if self.batch.max_attempts == 0 {
            anyhow::bail!("batch.max_attempts must be at least 1");
        }
        if self.candidate_concurrency == 0 {
            anyhow::bail!("candidate_concurrency must be at least 1");
        }
        Ok(())
    }

    pub fn build_matrix_providers(&self) -> Vec<Box<dyn MatrixProvider>> {
        self.matrix_providers
            .iter()
            .filter_map(|config| match build_matrix_provider(config) {
                Ok(provider) => Some(provider),
                Err(error) => {
                    warn!("Skipping matrix provider {:?}: {}", config, error);
                    None
                }
            })
            .collect()
    }

    pub fn build_geocode_providers(&self) -> Vec<Box<dyn GeocodeProvider>> {
        self.geocode_providers
            .iter()
            .filter_map(|config| match build_geocode_provider(config) {
                Ok(provider) => Some(provider),
                Err(error) => {
                    warn!("Skipping geocode provider {:?}: {}", config, error);
                    None
                }
            })
            .collect()
    }

    pub fn build_store(&self) -> anyhow::Result<Arc<dyn PersistentStore>> {
        match &self.cache.folder {
            Some(folder) => {
                std::fs::create_dir_all(folder)?;
                Ok(Arc::new(FileStore::new(folder)?))
            }
            None => Ok(Arc::new(MemoryStore::default())),
        }
    }
}

fn build_matrix_provider(
    config: &MatrixProviderConfig,
) -> Result<Box<dyn MatrixProvider>, ProviderError> {
    Ok(match config {
        MatrixProviderConfig::Osrm { url, profile } => {
            Box::new(OsrmMatrixClient::new(OsrmMatrixClientParams {
                osrm_url: url.clone(),
                profile: profile.clone(),
            }))
        }
        MatrixProviderConfig::GraphHopperApi { profile } => {
            let api_key = std::env::var(GRAPHHOPPER_API_KEY_ENV_VAR)
                .map_err(|_| ProviderError::MissingApiKey(GRAPHHOPPER_API_KEY_ENV_VAR))?;

            Box::new(GraphHopperMatrixClient::new(GraphhopperMatrixClientParams {
                api_key,
                profile: *profile,
                max_poll_attempts: 40, // max 20s, already really long time
                poll_interval: Duration::from_millis(500),
            }))
        }
        MatrixProviderConfig::AsTheCrowFlies { speed_kmh } => Box::new(AsTheCrowFlies {
            speed_kmh: *speed_kmh,
        }),
    })
}

fn build_geocode_provider(
    config: &GeocodeProviderConfig,
) -> Result<Box<dyn GeocodeProvider>, ProviderError> {
    Ok(match config {
        GeocodeProviderConfig::Nominatim { url } => Box::new(NominatimClient::new(url.clone())?),
        GeocodeProviderConfig::Photon { url } => Box::new(PhotonClient::new(url.clone())),
    })
}

use std::path::{Path, PathBuf};

use futures::{FutureExt, future::BoxFuture};
use fxhash::FxHashMap;
use tracing::debug;

use crate::{Destination, error::LocusError};

/// Supplies the destinations of an administrative division.
pub trait DestinationSource: Send + Sync {
    fn get_destinations<'a>(
        &'a self,
        division_id: &'a str,
    ) -> BoxFuture<'a, Result<Vec<Destination>, LocusError>>;
}

/// Destinations held in memory, keyed by division.
#[derive(Debug, Default, Clone)]
pub struct StaticDestinations {
    divisions: FxHashMap<String, Vec<Destination>>,
}

impl StaticDestinations {
    pub fn insert(&mut self, division_id: impl Into<String>, destinations: Vec<Destination>) {
        self.divisions.insert(division_id.into(), destinations);
    }
}

impl DestinationSource for StaticDestinations {
    fn get_destinations<'a>(
        &'a self,
        division_id: &'a str,
    ) -> BoxFuture<'a, Result<Vec<Destination>, LocusError>> {
        let result = self
            .divisions
            .get(division_id)
            .cloned()
            .ok_or_else(|| {
                LocusError::UpstreamUnavailable(format!("unknown division '{}'", division_id))
            });

        futures::future::ready(result).boxed()
    }
}

/// Reads `<folder>/<division_id>.json`, a JSON array of
/// `{"name": .., "lon": .., "lat": ..}` objects.
#[derive(Debug, Clone)]
pub struct JsonFileDestinations {
    folder: PathBuf,
}

impl JsonFileDestinations {
    pub fn new(folder: impl Into<PathBuf>) -> Self {
        Self {
            folder: folder.into(),
        }
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    fn path(&self, division_id: &str) -> Result<PathBuf, LocusError> {
        if division_id.is_empty()
            || division_id
                .chars()
                .any(|c| c == '/' || c == '\\' || c == '.')
        {
            return Err(LocusError::InvalidInput(format!(
                "invalid division id '{}'",
                division_id
            )));
        }

        Ok(self.folder.join(format!("{}.json", division_id)))
    }

    async fn read(&self, division_id: &str) -> Result<Vec<Destination>, LocusError> {
        let path = self.path(division_id)?;
        debug!("Loading destinations from {}", path.display());

        let content = tokio::fs::read_to_string(&path).await.map_err(|err| {
            LocusError::UpstreamUnavailable(format!("{}: {}", path.display(), err))
        })?;

        serde_json::from_str(&content).map_err(|err| {
            LocusError::UpstreamUnavailable(format!("{}: {}", path.display(), err))
        })
    }
}

impl DestinationSource for JsonFileDestinations {
    fn get_destinations<'a>(
        &'a self,
        division_id: &'a str,
    ) -> BoxFuture<'a, Result<Vec<Destination>, LocusError>> {
        self.read(division_id).boxed()
    }
}

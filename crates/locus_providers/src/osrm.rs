use futures::{FutureExt, future::BoxFuture};
use serde::Deserialize;
use tracing::debug;

use crate::{
    coordinate::Coordinate, error::ProviderError, matrix_provider::MatrixProvider,
    travel_matrices::TravelMatrices,
};

#[derive(Deserialize)]
struct OsrmTableResponse {
    code: String,
    message: Option<String>,
    /// Travel times in seconds
    durations: Option<Vec<Vec<Option<f64>>>>,
    /// Distances in meters
    distances: Option<Vec<Vec<Option<f64>>>>,
}

pub struct OsrmMatrixClientParams {
    pub osrm_url: String,
    pub profile: String,
}

pub const OSRM_TABLE_API_PATH: &str = "/table/v1/";

/// Client for a self-hosted OSRM `table` service.
pub struct OsrmMatrixClient {
    params: OsrmMatrixClientParams,
    client: reqwest::Client,
}

impl OsrmMatrixClient {
    pub fn new(params: OsrmMatrixClientParams) -> Self {
        Self {
            params,
            client: reqwest::Client::new(),
        }
    }

    fn table_url(&self, sources: &[Coordinate], destinations: &[Coordinate]) -> String {
        let mut url = self.params.osrm_url.trim_end_matches('/').to_string();
        url.push_str(OSRM_TABLE_API_PATH);
        url.push_str(&self.params.profile);
        url.push('/');

        let coordinates = sources
            .iter()
            .chain(destinations)
            .map(|c| format!("{},{}", c.lon, c.lat))
            .collect::<Vec<_>>()
            .join(";");
        url.push_str(&coordinates);

        url
    }

    pub async fn fetch_table(
        &self,
        sources: &[Coordinate],
        destinations: &[Coordinate],
    ) -> Result<TravelMatrices, ProviderError> {
        let source_indices = (0..sources.len())
            .map(|i| i.to_string())
            .collect::<Vec<_>>()
            .join(";");
        let destination_indices = (sources.len()..sources.len() + destinations.len())
            .map(|i| i.to_string())
            .collect::<Vec<_>>()
            .join(";");

        let response = self
            .client
            .get(self.table_url(sources, destinations))
            .query(&[
                ("annotations", "duration,distance"),
                ("skip_waypoints", "true"),
                ("sources", source_indices.as_str()),
                ("destinations", destination_indices.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ProviderError::from_response(response).await);
        }

        let table: OsrmTableResponse = response.json().await?;

        if table.code != "Ok" {
            return Err(ProviderError::Api {
                status: 200,
                message: table.message.unwrap_or(table.code),
            });
        }

        debug!(
            "Osrm: table {}x{} fetched",
            sources.len(),
            destinations.len()
        );

        Ok(TravelMatrices {
            durations: table
                .durations
                .ok_or_else(|| ProviderError::IncompleteResponse("durations".to_string()))?,
            distances: table
                .distances
                .ok_or_else(|| ProviderError::IncompleteResponse("distances".to_string()))?,
        })
    }
}

impl MatrixProvider for OsrmMatrixClient {
    fn name(&self) -> &str {
        "osrm"
    }

    fn fetch_matrix<'a>(
        &'a self,
        sources: &'a [Coordinate],
        destinations: &'a [Coordinate],
    ) -> BoxFuture<'a, Result<TravelMatrices, ProviderError>> {
        self.fetch_table(sources, destinations).boxed()
    }
}

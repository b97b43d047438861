use std::{fmt::Display, time::Duration};

use futures::{FutureExt, future::BoxFuture};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    coordinate::Coordinate, error::ProviderError, matrix_provider::MatrixProvider,
    travel_matrices::TravelMatrices,
};

pub type GHPoint = [f64; 2];

#[derive(Deserialize, Serialize, JsonSchema, Copy, Clone, Debug, Hash, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GraphHopperProfile {
    Car,
    Bike,
    Foot,
}

impl Display for GraphHopperProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                GraphHopperProfile::Car => "car",
                GraphHopperProfile::Bike => "bike",
                GraphHopperProfile::Foot => "foot",
            }
        )
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MatrixRequestBody {
    pub from_points: Vec<GHPoint>,

    pub to_points: Vec<GHPoint>,

    /// Which arrays to return: "weights", "times", "distances"
    pub out_arrays: Vec<String>,

    /// Routing profile (e.g., "car", "bike", "foot")
    pub profile: String,

    /// Fail fast on unreachable points, otherwise they are returned as null
    pub fail_fast: bool,
}

#[derive(Deserialize)]
struct MatrixSolution {
    /// Travel times in seconds
    times: Option<Vec<Vec<Option<f64>>>>,

    /// Distances in meters
    distances: Option<Vec<Vec<Option<f64>>>>,
}

#[derive(Deserialize)]
struct AsyncMatrixJobResponse {
    job_id: String,
}

#[derive(Deserialize)]
struct AsyncMatrixResponse {
    status: String,
    solution: Option<MatrixSolution>,
}

pub struct GraphhopperMatrixClientParams {
    pub api_key: String,
    pub profile: GraphHopperProfile,
    pub poll_interval: Duration,
    pub max_poll_attempts: u32,
}

pub const GRAPHOPPER_MATRIX_SYNC_API_URL: &str = "https://graphhopper.com/api/1/matrix";
pub const GRAPHOPPER_MATRIX_ASYNC_POST_API_URL: &str =
    "https://graphhopper.com/api/1/matrix/calculate";
pub const GRAPHOPPER_MATRIX_ASYNC_POLL_API_URL: &str =
    "https://graphhopper.com/api/1/matrix/solution";

/// Above this many points the synchronous endpoint refuses the request.
const SYNC_MAX_POINTS: usize = 25;

/// Metered GraphHopper Matrix API client.
pub struct GraphHopperMatrixClient {
    params: GraphhopperMatrixClientParams,
    client: reqwest::Client,
}

impl GraphHopperMatrixClient {
    pub fn new(params: GraphhopperMatrixClientParams) -> Self {
        Self {
            params,
            client: reqwest::Client::new(),
        }
    }

    pub async fn fetch(
        &self,
        sources: &[Coordinate],
        destinations: &[Coordinate],
    ) -> Result<TravelMatrices, ProviderError> {
        let to_gh = |c: &Coordinate| -> GHPoint { [c.lon, c.lat] };

        let body = MatrixRequestBody {
            from_points: sources.iter().map(to_gh).collect(),
            to_points: destinations.iter().map(to_gh).collect(),
            out_arrays: vec!["times".to_string(), "distances".to_string()],
            profile: self.params.profile.to_string(),
            fail_fast: false,
        };

        let solution = if sources.len() + destinations.len() <= SYNC_MAX_POINTS {
            self.sync_matrix_request(&body).await?
        } else {
            self.async_matrix_request(&body).await?
        };

        Ok(TravelMatrices {
            durations: solution
                .times
                .ok_or_else(|| ProviderError::IncompleteResponse("times".to_string()))?,
            distances: solution
                .distances
                .ok_or_else(|| ProviderError::IncompleteResponse("distances".to_string()))?,
        })
    }

    async fn sync_matrix_request(
        &self,
        body: &MatrixRequestBody,
    ) -> Result<MatrixSolution, ProviderError> {
        let response = self
            .client
            .post(GRAPHOPPER_MATRIX_SYNC_API_URL)
            .query(&[("key", &self.params.api_key)])
            .json(body)
            .send()
            .await?;

        self.handle_response(response).await
    }

    async fn async_matrix_request(
        &self,
        body: &MatrixRequestBody,
    ) -> Result<MatrixSolution, ProviderError> {
        let post_response = self
            .client
            .post(GRAPHOPPER_MATRIX_ASYNC_POST_API_URL)
            .query(&[("key", &self.params.api_key)])
            .json(body)
            .send()
            .await?;

        if !post_response.status().is_success() {
            return Err(ProviderError::from_response(post_response).await);
        }

        debug!("GraphHopperApi: Posted matrix request");

        let job_response: AsyncMatrixJobResponse = post_response.json().await?;

        self.poll_until_completed(&job_response.job_id).await
    }

    async fn get_solution(&self, job_id: &str) -> Result<Option<MatrixSolution>, ProviderError> {
        let url = format!("{}/{}", GRAPHOPPER_MATRIX_ASYNC_POLL_API_URL, job_id);
        let poll_response = self
            .client
            .get(url)
            .query(&[("key", &self.params.api_key)])
            .send()
            .await?;

        if !poll_response.status().is_success() {
            return Err(ProviderError::from_response(poll_response).await);
        }

        let async_response: AsyncMatrixResponse = poll_response.json().await?;

        match async_response.status.as_str() {
            "finished" => async_response
                .solution
                .map(Some)
                .ok_or_else(|| ProviderError::IncompleteResponse("solution".to_string())),
            "waiting" | "processing" => Ok(None),
            other => Err(ProviderError::JobFailed(other.to_string())),
        }
    }

    async fn poll_until_completed(&self, job_id: &str) -> Result<MatrixSolution, ProviderError> {
        for attempt in 1..=self.params.max_poll_attempts {
            debug!(
                "GraphHopperApi: Polling for job completion {}/{}",
                attempt, self.params.max_poll_attempts
            );
            if let Some(solution) = self.get_solution(job_id).await? {
                return Ok(solution);
            }

            tokio::time::sleep(self.params.poll_interval).await;
        }

        Err(ProviderError::Timeout(self.params.max_poll_attempts))
    }

    async fn handle_response(
        &self,
        response: reqwest::Response,
    ) -> Result<MatrixSolution, ProviderError> {
        if response.status().is_success() {
            let matrix_solution: MatrixSolution = response.json().await?;
            Ok(matrix_solution)
        } else {
            Err(ProviderError::from_response(response).await)
        }
    }
}

impl MatrixProvider for GraphHopperMatrixClient {
    fn name(&self) -> &str {
        "graphhopper"
    }

    fn fetch_matrix<'a>(
        &'a self,
        sources: &'a [Coordinate],
        destinations: &'a [Coordinate],
    ) -> BoxFuture<'a, Result<TravelMatrices, ProviderError>> {
        self.fetch(sources, destinations).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_uses_lon_lat_order() {
        let body = MatrixRequestBody {
            from_points: vec![[4.35, 50.85]],
            to_points: vec![[4.4, 50.9]],
            out_arrays: vec!["times".to_string()],
            profile: GraphHopperProfile::Car.to_string(),
            fail_fast: false,
        };

        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["from_points"][0][0], 4.35);
        assert_eq!(json["profile"], "car");
        assert_eq!(json["fail_fast"], false);
    }

    #[test]
    fn test_solution_with_missing_distances() {
        let solution: MatrixSolution = serde_json::from_str(r#"{ "times": [[1.0]] }"#).unwrap();

        assert!(solution.distances.is_none());
        assert_eq!(solution.times, Some(vec![vec![Some(1.0)]]));
    }
}

use futures::{FutureExt, future::BoxFuture};
use serde::Deserialize;

use crate::{coordinate::Coordinate, error::ProviderError, geocode_provider::GeocodeProvider};

pub const PHOTON_PUBLIC_URL: &str = "https://photon.komoot.io";

#[derive(Deserialize)]
struct PhotonFeatureCollection {
    features: Vec<PhotonFeature>,
}

#[derive(Deserialize)]
struct PhotonFeature {
    geometry: PhotonGeometry,
    #[serde(default)]
    properties: PhotonProperties,
}

#[derive(Deserialize)]
struct PhotonGeometry {
    coordinates: [f64; 2],
}

#[derive(Deserialize, Default)]
struct PhotonProperties {
    name: Option<String>,
    housenumber: Option<String>,
    street: Option<String>,
    postcode: Option<String>,
    city: Option<String>,
    country: Option<String>,
}

impl PhotonProperties {
    fn address(&self) -> Option<String> {
        let street = match (&self.housenumber, &self.street) {
            (Some(number), Some(street)) => Some(format!("{} {}", number, street)),
            (None, Some(street)) => Some(street.clone()),
            _ => None,
        };

        let locality = match (&self.postcode, &self.city) {
            (Some(postcode), Some(city)) => Some(format!("{} {}", postcode, city)),
            (None, Some(city)) => Some(city.clone()),
            (Some(postcode), None) => Some(postcode.clone()),
            (None, None) => None,
        };

        let parts: Vec<String> = [self.name.clone(), street, locality, self.country.clone()]
            .into_iter()
            .flatten()
            .filter(|part| !part.trim().is_empty())
            .collect();

        if parts.is_empty() {
            None
        } else {
            Some(parts.join(", "))
        }
    }
}

/// Photon (komoot) GeoJSON geocoder.
pub struct PhotonClient {
    url: String,
    client: reqwest::Client,
}

impl PhotonClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    async fn features(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<PhotonFeatureCollection, ProviderError> {
        let response = self
            .client
            .get(format!("{}{}", self.url, path))
            .query(query)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ProviderError::from_response(response).await);
        }

        Ok(response.json().await?)
    }

    pub async fn search(&self, query: &str) -> Result<Option<Coordinate>, ProviderError> {
        let collection = self
            .features("/api", &[("q", query.to_string()), ("limit", "1".to_string())])
            .await?;

        Ok(collection.features.first().map(|feature| {
            let [lon, lat] = feature.geometry.coordinates;
            Coordinate::new(lon, lat)
        }))
    }

    pub async fn reverse(&self, coordinate: &Coordinate) -> Result<Option<String>, ProviderError> {
        let collection = self
            .features(
                "/reverse",
                &[
                    ("lon", coordinate.lon.to_string()),
                    ("lat", coordinate.lat.to_string()),
                    ("limit", "1".to_string()),
                ],
            )
            .await?;

        Ok(collection
            .features
            .first()
            .and_then(|feature| feature.properties.address()))
    }
}

impl GeocodeProvider for PhotonClient {
    fn name(&self) -> &str {
        "photon"
    }

    fn geocode<'a>(
        &'a self,
        query: &'a str,
    ) -> BoxFuture<'a, Result<Option<Coordinate>, ProviderError>> {
        self.search(query).boxed()
    }

    fn reverse_geocode<'a>(
        &'a self,
        coordinate: &'a Coordinate,
    ) -> BoxFuture<'a, Result<Option<String>, ProviderError>> {
        self.reverse(coordinate).boxed()
    }
}

use futures::{FutureExt, future::BoxFuture};
use serde::Deserialize;

use crate::{coordinate::Coordinate, error::ProviderError, geocode_provider::GeocodeProvider};

pub const NOMINATIM_PUBLIC_URL: &str = "https://nominatim.openstreetmap.org";

#[derive(Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
}

#[derive(Deserialize)]
struct NominatimReverse {
    display_name: Option<String>,
}

/// Nominatim (OpenStreetMap) address search.
pub struct NominatimClient {
    url: String,
    client: reqwest::Client,
}

impl NominatimClient {
    pub fn new(url: impl Into<String>) -> Result<Self, ProviderError> {
        // Nominatim's usage policy rejects requests without a user agent
        let client = reqwest::Client::builder()
            .user_agent(concat!("locus/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            url: url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub async fn search(&self, query: &str) -> Result<Option<Coordinate>, ProviderError> {
        let response = self
            .client
            .get(format!("{}/search", self.url))
            .query(&[("q", query), ("format", "jsonv2"), ("limit", "1")])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ProviderError::from_response(response).await);
        }

        let places: Vec<NominatimPlace> = response.json().await?;

        Ok(places.first().and_then(parse_place))
    }

    pub async fn reverse(&self, coordinate: &Coordinate) -> Result<Option<String>, ProviderError> {
        let response = self
            .client
            .get(format!("{}/reverse", self.url))
            .query(&[
                ("lat", coordinate.lat.to_string()),
                ("lon", coordinate.lon.to_string()),
                ("format", "jsonv2".to_string()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ProviderError::from_response(response).await);
        }

        let place: NominatimReverse = response.json().await?;

        Ok(place.display_name.filter(|name| !name.trim().is_empty()))
    }
}

fn parse_place(place: &NominatimPlace) -> Option<Coordinate> {
    let lon = place.lon.parse::<f64>().ok()?;
    let lat = place.lat.parse::<f64>().ok()?;
    Some(Coordinate::new(lon, lat))
}

impl GeocodeProvider for NominatimClient {
    fn name(&self) -> &str {
        "nominatim"
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_place() {
        let places: Vec<NominatimPlace> =
            serde_json::from_str(r#"[{ "lat": "50.8466", "lon": "4.3528", "place_id": 1 }]"#)
                .unwrap();

        assert_eq!(parse_place(&places[0]), Some(Coordinate::new(4.3528, 50.8466)));
    }

    #[test]
    fn test_parse_place_rejects_garbage() {
        let place = NominatimPlace {
            lat: "north".to_string(),
            lon: "4.0".to_string(),
        };

        assert_eq!(parse_place(&place), None);
    }

    #[test]
    fn test_reverse_error_body_has_no_name() {
        let place: NominatimReverse =
            serde_json::from_str(r#"{ "error": "Unable to geocode" }"#).unwrap();

        assert!(place.display_name.is_none());
    }
}

use serde::{Deserialize, Serialize};

use crate::{Coordinate, error::LocusError};

/// Axis-aligned box around a non-empty set of coordinates.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    min_lat: f64,
    max_lat: f64,
    min_lon: f64,
    max_lon: f64,
}

impl BoundingBox {
    pub fn new(min_lat: f64, max_lat: f64, min_lon: f64, max_lon: f64) -> Result<Self, LocusError> {
        if !(min_lat <= max_lat && min_lon <= max_lon) {
            return Err(LocusError::InvalidInput(format!(
                "bounding box min must not exceed max (lat {}..{}, lon {}..{})",
                min_lat, max_lat, min_lon, max_lon
            )));
        }

        Ok(Self {
            min_lat,
            max_lat,
            min_lon,
            max_lon,
        })
    }

    pub fn from_coordinates<'a, I>(coordinates: I) -> Result<Self, LocusError>
    where
        I: IntoIterator<Item = &'a Coordinate>,
    {
        let mut coordinates = coordinates.into_iter();

        let first = coordinates.next().ok_or_else(|| {
            LocusError::InvalidInput("cannot build a bounding box from no coordinates".to_string())
        })?;

        let mut bbox = BoundingBox {
            min_lat: first.lat,
            max_lat: first.lat,
            min_lon: first.lon,
            max_lon: first.lon,
        };

        for coordinate in coordinates {
            bbox.extend(coordinate);
        }

        Ok(bbox)
    }

    fn extend(&mut self, coordinate: &Coordinate) {
        self.min_lat = self.min_lat.min(coordinate.lat);
        self.max_lat = self.max_lat.max(coordinate.lat);
        self.min_lon = self.min_lon.min(coordinate.lon);
        self.max_lon = self.max_lon.max(coordinate.lon);
    }

    pub fn min_lat(&self) -> f64 {
        self.min_lat
    }

    pub fn max_lat(&self) -> f64 {
        self.max_lat
    }

    pub fn min_lon(&self) -> f64 {
        self.min_lon
    }

    pub fn max_lon(&self) -> f64 {
        self.max_lon
    }

    pub fn contains(&self, coordinate: &Coordinate) -> bool {
        coordinate.lat >= self.min_lat
            && coordinate.lat <= self.max_lat
            && coordinate.lon >= self.min_lon
            && coordinate.lon <= self.max_lon
    }
}

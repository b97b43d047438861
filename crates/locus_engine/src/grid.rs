use crate::{Coordinate, bbox::BoundingBox, error::LocusError};

/// Candidate points over a bounding box at a fixed step.
///
/// Iteration order is longitude-major: the outer loop walks longitude from
/// `min_lon` to `max_lon` inclusive, the inner loop walks latitude. Steps are
/// accumulated without drift correction.
#[derive(Debug, Copy, Clone)]
pub struct Grid {
    bbox: BoundingBox,
    step: f64,
}

impl Grid {
    pub fn new(bbox: BoundingBox, step: f64) -> Result<Self, LocusError> {
        if !(step > 0.0) || !step.is_finite() {
            return Err(LocusError::InvalidInput(format!(
                "grid step must be positive, got {}",
                step
            )));
        }

        Ok(Self { bbox, step })
    }

    pub fn iter(&self) -> GridIter {
        GridIter {
            bbox: self.bbox,
            step: self.step,
            lon: self.bbox.min_lon(),
            lat: self.bbox.min_lat(),
        }
    }
}

impl IntoIterator for &Grid {
    type Item = Coordinate;
    type IntoIter = GridIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

pub struct GridIter {
    bbox: BoundingBox,
    step: f64,
    lon: f64,
    lat: f64,
}

impl Iterator for GridIter {
    type Item = Coordinate;

    fn next(&mut self) -> Option<Self::Item> {
        if self.lat > self.bbox.max_lat() {
            self.lon += self.step;
            self.lat = self.bbox.min_lat();
        }

        if self.lon > self.bbox.max_lon() {
            return None;
        }

        let point = Coordinate::new(self.lon, self.lat);
        self.lat += self.step;

        Some(point)
    }
}

/// Shorthand for `Grid::new(bbox, step)?.iter()`.
pub fn generate(bbox: BoundingBox, step: f64) -> Result<GridIter, LocusError> {
    Ok(Grid::new(bbox, step)?.iter())
}

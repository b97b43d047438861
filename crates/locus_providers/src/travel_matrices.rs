use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

/// TravelMatrices holds the distance and duration matrices between a set of
/// sources (rows) and destinations (columns).
/// Distances are in meters, durations in seconds. `None` marks an unreachable pair.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
pub struct TravelMatrices {
    pub distances: Vec<Vec<Option<f64>>>,
    pub durations: Vec<Vec<Option<f64>>>,
}

impl TravelMatrices {
    pub fn num_sources(&self) -> usize {
        self.distances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.distances.is_empty() || self.distances.iter().all(|row| row.is_empty())
    }

    /// Rejects matrices whose shape doesn't match the request.
    pub fn validate(&self, num_sources: usize, num_destinations: usize) -> Result<(), ProviderError> {
        if self.distances.len() != num_sources || self.durations.len() != num_sources {
            return Err(ProviderError::IncompleteResponse(format!(
                "expected {} rows, got {} distance rows and {} duration rows",
                num_sources,
                self.distances.len(),
                self.durations.len()
            )));
        }

        for (distances, durations) in self.distances.iter().zip(&self.durations) {
            if distances.len() != num_destinations || durations.len() != num_destinations {
                return Err(ProviderError::IncompleteResponse(format!(
                    "expected rows of {} columns, got {} distances and {} durations",
                    num_destinations,
                    distances.len(),
                    durations.len()
                )));
            }
        }

        Ok(())
    }

    /// Pairs of `(distance, duration)` for the given source row.
    pub fn row(&self, source: usize) -> impl Iterator<Item = (Option<f64>, Option<f64>)> + '_ {
        let distances = self.distances.get(source).map(Vec::as_slice).unwrap_or(&[]);
        let durations = self.durations.get(source).map(Vec::as_slice).unwrap_or(&[]);

        distances.iter().copied().zip(durations.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrices(rows: Vec<Vec<Option<f64>>>) -> TravelMatrices {
        TravelMatrices {
            durations: rows.clone(),
            distances: rows,
        }
    }

    #[test]
    fn test_validate_accepts_full_matrix() {
        let m = matrices(vec![vec![Some(1.0), None, Some(3.0)]]);
        assert!(m.validate(1, 3).is_ok());
    }

    #[test]
    fn test_validate_rejects_short_row() {
        let m = matrices(vec![vec![Some(1.0), Some(2.0)]]);
        assert!(matches!(
            m.validate(1, 3),
            Err(ProviderError::IncompleteResponse(_))
        ));
    }

    #[test]
    fn test_validate_rejects_missing_rows() {
        let m = TravelMatrices::default();
        assert!(m.validate(1, 3).is_err());
        assert!(m.is_empty());
    }

    #[test]
    fn test_validate_rejects_mismatched_durations() {
        let m = TravelMatrices {
            distances: vec![vec![Some(1.0), Some(2.0)]],
            durations: vec![vec![Some(1.0)]],
        };
        assert!(m.validate(1, 2).is_err());
    }
}

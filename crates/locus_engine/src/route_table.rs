use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{error::LocusError, trimean::trimean};

/// Name under which the aggregated cost is reported. No destination may use it.
pub const AVERAGE_KEY: &str = "Average";

/// Travel cost in meters and seconds.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct TravelCost {
    pub distance_meters: f64,
    pub duration_seconds: f64,
}

impl TravelCost {
    pub fn new(distance_meters: f64, duration_seconds: f64) -> Self {
        Self {
            distance_meters,
            duration_seconds,
        }
    }
}

/// Travel cost per destination name, plus the trimean across all of them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteTable {
    entries: BTreeMap<String, TravelCost>,
    average: Option<TravelCost>,
}

impl RouteTable {
    pub fn insert(&mut self, name: impl Into<String>, cost: TravelCost) -> Result<(), LocusError> {
        let name = name.into();
        if name == AVERAGE_KEY {
            return Err(LocusError::InvalidInput(format!(
                "destination name '{}' is reserved",
                AVERAGE_KEY
            )));
        }

        self.entries.insert(name, cost);
        Ok(())
    }

    /// Merges `other` into this table. Entries are keyed by destination name so
    /// merge order doesn't matter.
    pub fn merge(&mut self, other: RouteTable) {
        self.entries.extend(other.entries);
        self.average = None;
    }

    /// Computes the aggregate entry from the real entries. Does nothing on an
    /// empty table.
    pub fn compute_average(&mut self) {
        if self.entries.is_empty() {
            self.average = None;
            return;
        }

        let distances: Vec<f64> = self.entries.values().map(|c| c.distance_meters).collect();
        let durations: Vec<f64> = self.entries.values().map(|c| c.duration_seconds).collect();

        // Both inputs are non-empty here
        if let (Ok(distance), Ok(duration)) = (trimean(&distances), trimean(&durations)) {
            self.average = Some(TravelCost::new(distance, duration));
        }
    }

    pub fn get(&self, name: &str) -> Option<&TravelCost> {
        if name == AVERAGE_KEY {
            self.average.as_ref()
        } else {
            self.entries.get(name)
        }
    }

    pub fn average(&self) -> Option<&TravelCost> {
        self.average.as_ref()
    }

    /// Real entries, without the aggregate.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &TravelCost)> {
        self.entries.iter().map(|(name, cost)| (name.as_str(), cost))
    }

    /// Number of real entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_name_is_rejected() {
        let mut table = RouteTable::default();

        let result = table.insert(AVERAGE_KEY, TravelCost::new(1.0, 1.0));

        assert!(matches!(result, Err(LocusError::InvalidInput(_))));
        assert!(table.is_empty());
    }

    #[test]
    fn test_average_uses_trimean_per_axis() {
        let mut table = RouteTable::default();
        table.insert("a", TravelCost::new(1.0, 50.0)).unwrap();
        table.insert("b", TravelCost::new(2.0, 40.0)).unwrap();
        table.insert("c", TravelCost::new(3.0, 30.0)).unwrap();
        table.insert("d", TravelCost::new(4.0, 20.0)).unwrap();
        table.insert("e", TravelCost::new(100.0, 10.0)).unwrap();

        table.compute_average();

        assert_eq!(table.get(AVERAGE_KEY), Some(&TravelCost::new(3.0, 30.0)));
        assert_eq!(table.len(), 5);
    }

    #[test]
    fn test_empty_table_has_no_average() {
        let mut table = RouteTable::default();
        table.compute_average();

        assert!(table.average().is_none());
    }

    #[test]
    fn test_merge_drops_stale_average() {
        let mut left = RouteTable::default();
        left.insert("a", TravelCost::new(1.0, 1.0)).unwrap();
        left.compute_average();

        let mut right = RouteTable::default();
        right.insert("b", TravelCost::new(3.0, 3.0)).unwrap();

        left.merge(right);

        assert!(left.average().is_none());
        assert_eq!(left.len(), 2);
    }
}

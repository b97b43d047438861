use sha2::{Digest, Sha256};

use crate::{Coordinate, Destination};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum CacheKind {
    Geocode,
    ReverseGeocode,
    Matrix,
    Candidate,
}

impl CacheKind {
    pub fn tag(&self) -> &'static str {
        match self {
            CacheKind::Geocode => "geocode",
            CacheKind::ReverseGeocode => "reverse",
            CacheKind::Matrix => "matrix",
            CacheKind::Candidate => "candidate",
        }
    }
}

/// The logical request a cached value answers.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheKey {
    Geocode {
        address: String,
    },
    ReverseGeocode {
        coordinate: Coordinate,
    },
    Matrix {
        sources: Vec<Coordinate>,
        destinations: Vec<Coordinate>,
    },
    Candidate {
        coordinate: Coordinate,
        destinations: Vec<Destination>,
    },
}

fn hash_str(value: &str, hasher: &mut Sha256) {
    hasher.update((value.len() as u64).to_le_bytes());
    hasher.update(value.as_bytes());
}

fn hash_coordinate(coordinate: &Coordinate, hasher: &mut Sha256) {
    hasher.update(coordinate.lon.to_bits().to_le_bytes());
    hasher.update(coordinate.lat.to_bits().to_le_bytes());
}

fn hash_coordinates(coordinates: &[Coordinate], hasher: &mut Sha256) {
    hasher.update((coordinates.len() as u64).to_le_bytes());
    for coordinate in coordinates {
        hash_coordinate(coordinate, hasher);
    }
}

impl CacheKey {
    pub fn geocode(address: &str) -> Self {
        CacheKey::Geocode {
            address: address.trim().to_lowercase(),
        }
    }

    pub fn reverse_geocode(coordinate: Coordinate) -> Self {
        CacheKey::ReverseGeocode { coordinate }
    }

    /// Source and destination order is part of the key, rows line up with it.
    pub fn matrix(sources: &[Coordinate], destinations: &[Coordinate]) -> Self {
        CacheKey::Matrix {
            sources: sources.to_vec(),
            destinations: destinations.to_vec(),
        }
    }

    /// Destinations are identified as a set: their order doesn't change the key.
    pub fn candidate(coordinate: Coordinate, destinations: &[Destination]) -> Self {
        let mut destinations = destinations.to_vec();
        destinations.sort_by(|a, b| {
            a.name
                .cmp(&b.name)
                .then(a.coordinate.lon.total_cmp(&b.coordinate.lon))
                .then(a.coordinate.lat.total_cmp(&b.coordinate.lat))
        });

        CacheKey::Candidate {
            coordinate,
            destinations,
        }
    }

    pub fn kind(&self) -> CacheKind {
        match self {
            CacheKey::Geocode { .. } => CacheKind::Geocode,
            CacheKey::ReverseGeocode { .. } => CacheKind::ReverseGeocode,
            CacheKey::Matrix { .. } => CacheKind::Matrix,
            CacheKey::Candidate { .. } => CacheKind::Candidate,
        }
    }

    /// Hex SHA-256 of the key components. Stable across processes.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hash_str(self.kind().tag(), &mut hasher);

        match self {
            CacheKey::Geocode { address } => hash_str(address, &mut hasher),
            CacheKey::ReverseGeocode { coordinate } => hash_coordinate(coordinate, &mut hasher),
            CacheKey::Matrix {
                sources,
                destinations,
            } => {
                hash_coordinates(sources, &mut hasher);
                hash_coordinates(destinations, &mut hasher);
            }
            CacheKey::Candidate {
                coordinate,
                destinations,
            } => {
                hash_coordinate(coordinate, &mut hasher);
                hasher.update((destinations.len() as u64).to_le_bytes());
                for destination in destinations {
                    hash_str(&destination.name, &mut hasher);
                    hash_coordinate(&destination.coordinate, &mut hasher);
                }
            }
        }

        hex::encode(hasher.finalize())
    }

    /// Key under which the entry is persisted, `<kind>-<fingerprint>`.
    pub fn storage_key(&self) -> String {
        format!("{}-{}", self.kind().tag(), self.fingerprint())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn destinations() -> Vec<Destination> {
        vec![
            Destination::new("b", Coordinate::new(1.0, 1.0)),
            Destination::new("a", Coordinate::new(2.0, 2.0)),
        ]
    }

    #[test]
    fn test_fingerprint_is_deterministic() {
        let key = CacheKey::candidate(Coordinate::new(4.35, 50.85), &destinations());

        assert_eq!(key.fingerprint(), key.clone().fingerprint());
        assert_eq!(key.fingerprint().len(), 64);
    }

    #[test]
    fn test_geocode_key_normalizes_address() {
        let a = CacheKey::geocode("Grand Place, Brussels").fingerprint();
        let b = CacheKey::geocode("  grand place, brussels ").fingerprint();

        assert_eq!(a, b);
    }

    #[test]
    fn test_candidate_key_ignores_destination_order() {
        let mut reversed = destinations();
        reversed.reverse();

        let coordinate = Coordinate::new(4.35, 50.85);

        assert_eq!(
            CacheKey::candidate(coordinate, &destinations()).fingerprint(),
            CacheKey::candidate(coordinate, &reversed).fingerprint()
        );
    }

    #[test]
    fn test_matrix_key_depends_on_order() {
        let x = Coordinate::new(1.0, 1.0);
        let y = Coordinate::new(2.0, 2.0);
        let source = [Coordinate::new(0.0, 0.0)];

        assert_ne!(
            CacheKey::matrix(&source, &[x, y]).fingerprint(),
            CacheKey::matrix(&source, &[y, x]).fingerprint()
        );
    }

    #[test]
    fn test_kinds_do_not_collide() {
        let coordinate = Coordinate::new(1.0, 2.0);

        assert_ne!(
            CacheKey::reverse_geocode(coordinate).fingerprint(),
            CacheKey::candidate(coordinate, &[]).fingerprint()
        );
        assert!(
            CacheKey::reverse_geocode(coordinate)
                .storage_key()
                .starts_with("reverse-")
        );
    }
}

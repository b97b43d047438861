pub mod as_the_crow_flies;
pub mod coordinate;
pub mod error;
pub mod geocode_provider;
pub mod graphhopper_api;
pub mod matrix_provider;
pub mod nominatim;
pub mod osrm;
pub mod photon;
pub mod travel_matrices;

pub mod bbox;
pub mod cache;
pub mod config;
pub mod destination_source;
pub mod engine;
pub mod error;
pub mod geocoder;
pub mod grid;
pub mod matrix_router;
pub mod orchestrator;
pub mod route_table;
pub mod search;
pub mod trimean;

pub use locus_providers::coordinate::{Coordinate, Destination};

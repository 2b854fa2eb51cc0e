//! Fundamental types for the geogate precondition gate.
//!
//! This crate defines the values shared across every other crate in the workspace:
//! coordinates, connectivity snapshots, network classifications and session tokens.

pub mod classification;
pub mod coordinate;
pub mod error;
pub mod session;
pub mod snapshot;

pub use classification::NetworkClassification;
pub use coordinate::Coordinate;
pub use error::TypesError;
pub use session::SessionToken;
pub use snapshot::{ConnectivitySnapshot, Transport};

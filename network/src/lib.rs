//! Network precondition for the gate sequence.
//!
//! A [`NetworkCapability`] supplies one [`ConnectivitySnapshot`] per poll and
//! [`classify`] reduces it to a [`NetworkClassification`]. No I/O happens in
//! the classifier itself.
//!
//! [`ConnectivitySnapshot`]: geogate_types::ConnectivitySnapshot
//! [`NetworkClassification`]: geogate_types::NetworkClassification

pub mod capability;
pub mod classifier;
pub mod error;

pub use capability::NetworkCapability;
pub use classifier::classify;
pub use error::NetworkError;

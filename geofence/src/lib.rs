//! Geofencing for the gate sequence.
//!
//! - [`distance_km`]: haversine great-circle distance.
//! - [`evaluate`]: inclusive radius check against a [`GeofenceConfig`].
//! - [`LocationCapability`]: the platform contract for permission and position.

pub mod capability;
pub mod distance;
pub mod error;
pub mod evaluator;

pub use capability::{LocationCapability, PermissionStatus};
pub use distance::{distance_km, EARTH_RADIUS_KM};
pub use error::{GeofenceError, LocationError};
pub use evaluator::{evaluate, FenceDecision, GeofenceConfig};

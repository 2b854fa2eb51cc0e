use geogate_types::TypesError;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum GeofenceError {
    #[error("geofence radius must be a positive finite number of km, got {0}")]
    InvalidRadius(f64),

    #[error("invalid geofence center: {0}")]
    InvalidCenter(#[from] TypesError),
}

/// Failures reported by a [`LocationCapability`](crate::LocationCapability).
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LocationError {
    #[error("location permission denied")]
    PermissionDenied,

    #[error("position unavailable: {0}")]
    PositionUnavailable(String),

    #[error("location request timed out")]
    Timeout,
}

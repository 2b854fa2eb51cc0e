//! Geographic coordinate in decimal degrees.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::TypesError;

/// A WGS-84 position in decimal degrees.
///
/// Construct through [`Coordinate::new`] to get range checking. The fields are
/// public so that configuration files and capability bindings can build values
/// directly; call [`Coordinate::validate`] before trusting such values.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Latitude in degrees, within [-90, 90].
    pub latitude: f64,
    /// Longitude in degrees, within [-180, 180].
    pub longitude: f64,
}

impl Coordinate {
    pub const MAX_LATITUDE: f64 = 90.0;
    pub const MAX_LONGITUDE: f64 = 180.0;

    /// Create a coordinate, rejecting non-finite or out-of-range components.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, TypesError> {
        let coordinate = Self {
            latitude,
            longitude,
        };
        coordinate.validate()?;
        Ok(coordinate)
    }

    /// Check that both components are finite and inside their ranges.
    pub fn validate(&self) -> Result<(), TypesError> {
        if !self.latitude.is_finite() || !self.longitude.is_finite() {
            return Err(TypesError::NotFinite);
        }
        if self.latitude.abs() > Self::MAX_LATITUDE {
            return Err(TypesError::LatitudeOutOfRange(self.latitude));
        }
        if self.longitude.abs() > Self::MAX_LONGITUDE {
            return Err(TypesError::LongitudeOutOfRange(self.longitude));
        }
        Ok(())
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.4}, {:.4})", self.latitude, self.longitude)
    }
}

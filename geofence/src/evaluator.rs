//! Geofence configuration and the inside/outside decision.

use geogate_types::Coordinate;
use serde::{Deserialize, Serialize};

use crate::{distance_km, GeofenceError};

/// A circular region the operator must be inside.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeofenceConfig {
    center: Coordinate,
    radius_km: f64,
}

impl GeofenceConfig {
    /// Build a geofence, rejecting an invalid center or a radius that is not
    /// strictly positive and finite.
    pub fn new(center: Coordinate, radius_km: f64) -> Result<Self, GeofenceError> {
        center.validate()?;
        if !radius_km.is_finite() || radius_km <= 0.0 {
            return Err(GeofenceError::InvalidRadius(radius_km));
        }
        Ok(Self { center, radius_km })
    }

    pub fn center(&self) -> &Coordinate {
        &self.center
    }

    pub fn radius_km(&self) -> f64 {
        self.radius_km
    }

    /// Distance from `position` to the center, with the fence decision.
    pub fn locate(&self, position: &Coordinate) -> (f64, FenceDecision) {
        let distance = distance_km(position, &self.center);
        (distance, evaluate(distance, self))
    }
}

/// Whether a distance falls within the fence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FenceDecision {
    Inside,
    Outside,
}

impl FenceDecision {
    pub fn is_inside(&self) -> bool {
        matches!(self, Self::Inside)
    }
}

/// Compare a distance against the fence radius.
///
/// The boundary is inclusive: a point exactly on the radius is `Inside`.
pub fn evaluate(distance_km: f64, config: &GeofenceConfig) -> FenceDecision {
    if distance_km <= config.radius_km {
        FenceDecision::Inside
    } else {
        FenceDecision::Outside
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geogate_types::TypesError;

    fn fence(radius_km: f64) -> GeofenceConfig {
        GeofenceConfig::new(Coordinate::new(6.673175, -1.565423).unwrap(), radius_km).unwrap()
    }

    #[test]
    fn boundary_is_inside() {
        let config = fence(1.0);
        assert_eq!(evaluate(1.0, &config), FenceDecision::Inside);
        assert_eq!(evaluate(1.001, &config), FenceDecision::Outside);
    }

    #[test]
    fn zero_distance_is_inside() {
        assert!(evaluate(0.0, &fence(0.5)).is_inside());
    }

    #[test]
    fn rejects_non_positive_radius() {
        let center = Coordinate::new(0.0, 0.0).unwrap();
        assert_eq!(
            GeofenceConfig::new(center, 0.0),
            Err(GeofenceError::InvalidRadius(0.0))
        );
        assert_eq!(
            GeofenceConfig::new(center, -2.0),
            Err(GeofenceError::InvalidRadius(-2.0))
        );
        assert!(GeofenceConfig::new(center, f64::NAN).is_err());
        assert!(GeofenceConfig::new(center, f64::INFINITY).is_err());
    }

    #[test]
    fn rejects_invalid_center() {
        let center = Coordinate {
            latitude: 120.0,
            longitude: 0.0,
        };
        assert_eq!(
            GeofenceConfig::new(center, 1.0),
            Err(GeofenceError::InvalidCenter(TypesError::LatitudeOutOfRange(120.0)))
        );
    }

    #[test]
    fn locate_reports_distance_and_decision() {
        let config = fence(1.0);
        let (distance, decision) = config.locate(config.center());
        assert_eq!(distance, 0.0);
        assert_eq!(decision, FenceDecision::Inside);

        let far = Coordinate::new(7.673175, -1.565423).unwrap();
        let (distance, decision) = config.locate(&far);
        assert!(distance > 100.0);
        assert_eq!(decision, FenceDecision::Outside);
    }
}

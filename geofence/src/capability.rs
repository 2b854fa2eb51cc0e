//! Location capability contract.
//!
//! Concrete bindings (GPS, platform location services) live outside this
//! workspace. The gate only ever talks to this trait.

use async_trait::async_trait;
use geogate_types::Coordinate;
use serde::{Deserialize, Serialize};

use crate::LocationError;

/// Result of a foreground location permission request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionStatus {
    Granted,
    Denied,
}

/// Platform access to the device position.
#[async_trait]
pub trait LocationCapability: Send + Sync {
    /// Ask for foreground location permission.
    async fn request_permission(&self) -> PermissionStatus;

    /// Read the current position.
    async fn fetch_current_position(&self) -> Result<Coordinate, LocationError>;
}

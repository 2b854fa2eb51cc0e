//! Nullable location: scripted permission and positions.

use async_trait::async_trait;
use geogate_geofence::{LocationCapability, LocationError, PermissionStatus};
use geogate_types::Coordinate;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

/// A location capability that replays scripted positions.
///
/// Same replay rule as [`NullNetwork`](crate::NullNetwork): in order, last
/// entry repeats, empty script means the position is unavailable.
pub struct NullLocation {
    permission: Mutex<PermissionStatus>,
    positions: Mutex<VecDeque<Result<Coordinate, LocationError>>>,
    delay: Mutex<Duration>,
    permission_requests: Mutex<u32>,
    fetches: Mutex<u32>,
}

impl NullLocation {
    pub fn new() -> Self {
        Self {
            permission: Mutex::new(PermissionStatus::Granted),
            positions: Mutex::new(VecDeque::new()),
            delay: Mutex::new(Duration::ZERO),
            permission_requests: Mutex::new(0),
            fetches: Mutex::new(0),
        }
    }

    /// Permission granted, always at `position`.
    pub fn at(position: Coordinate) -> Self {
        let location = Self::new();
        location.push(Ok(position));
        location
    }

    pub fn set_permission(&self, status: PermissionStatus) {
        *self.permission.lock().unwrap() = status;
    }

    pub fn push(&self, result: Result<Coordinate, LocationError>) {
        self.positions.lock().unwrap().push_back(result);
    }

    /// Replace the script with a single repeating result.
    pub fn set(&self, result: Result<Coordinate, LocationError>) {
        let mut positions = self.positions.lock().unwrap();
        positions.clear();
        positions.push_back(result);
    }

    /// Make every position fetch take `delay` (tokio time).
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    pub fn permission_requests(&self) -> u32 {
        *self.permission_requests.lock().unwrap()
    }

    pub fn fetch_count(&self) -> u32 {
        *self.fetches.lock().unwrap()
    }

    fn next(&self) -> Result<Coordinate, LocationError> {
        let mut positions = self.positions.lock().unwrap();
        if positions.len() > 1 {
            positions.pop_front().unwrap()
        } else {
            positions.front().cloned().unwrap_or_else(|| {
                Err(LocationError::PositionUnavailable("no scripted position".into()))
            })
        }
    }
}

impl Default for NullLocation {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LocationCapability for NullLocation {
    async fn request_permission(&self) -> PermissionStatus {
        *self.permission_requests.lock().unwrap() += 1;
        *self.permission.lock().unwrap()
    }

    async fn fetch_current_position(&self) -> Result<Coordinate, LocationError> {
        *self.fetches.lock().unwrap() += 1;
        if *self.permission.lock().unwrap() == PermissionStatus::Denied {
            return Err(LocationError::PermissionDenied);
        }
        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.next()
    }
}

//! Per-session gate state.

use geogate_types::{Coordinate, NetworkClassification, SessionToken};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::event::Advisory;

/// Where a session currently stands in the gate sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatePhase {
    /// Waiting for a connectivity snapshot. Initial phase.
    AwaitingNetwork,
    /// Network check failed; waits for an explicit re-check.
    NetworkBlocked,
    /// Polling the device position against the geofence.
    AwaitingLocation,
    /// Outside the fence under the blocking policy; resumes on the next tick.
    LocationBlocked,
    /// All preconditions met. Terminal for the session.
    Ready,
}

impl GatePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AwaitingNetwork => "awaiting_network",
            Self::NetworkBlocked => "network_blocked",
            Self::AwaitingLocation => "awaiting_location",
            Self::LocationBlocked => "location_blocked",
            Self::Ready => "ready",
        }
    }

    /// Forward-only transition table. Blocked phases only ever return to
    /// the awaiting phase they came from.
    pub fn can_transition_to(&self, next: GatePhase) -> bool {
        use GatePhase::*;
        matches!(
            (self, next),
            (AwaitingNetwork, NetworkBlocked)
                | (AwaitingNetwork, AwaitingLocation)
                | (NetworkBlocked, AwaitingNetwork)
                | (AwaitingLocation, LocationBlocked)
                | (AwaitingLocation, Ready)
                | (LocationBlocked, AwaitingLocation)
        )
    }
}

impl fmt::Display for GatePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The mutable state of one gate session.
///
/// Owned exclusively by the controller; observers get clones or events.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GateState {
    pub session: SessionToken,
    pub phase: GatePhase,
    pub last_classification: Option<NetworkClassification>,
    pub last_distance_km: Option<f64>,
    pub last_position: Option<Coordinate>,
    /// Capability polls processed so far, network and location combined.
    pub poll_attempt: u32,
    /// Operator-facing message while network-blocked.
    pub block_message: Option<String>,
    /// Persistent, non-fatal advisory (e.g. location permission denied).
    pub advisory: Option<Advisory>,
}

impl GateState {
    pub fn new(session: SessionToken) -> Self {
        Self {
            session,
            phase: GatePhase::AwaitingNetwork,
            last_classification: None,
            last_distance_km: None,
            last_position: None,
            poll_attempt: 0,
            block_message: None,
            advisory: None,
        }
    }
}

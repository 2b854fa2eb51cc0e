//! Events published to observers (typically the presentation layer).

use geogate_types::{Coordinate, NetworkClassification, SessionToken};
use serde::{Deserialize, Serialize};

use crate::GatePhase;

/// Which capability an advisory refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapabilityKind {
    Network,
    Location,
}

/// A non-fatal condition surfaced to the operator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Advisory {
    /// Location permission is denied; polling continues.
    PermissionDenied,
    /// A capability call failed or timed out for one poll cycle.
    CapabilityUnavailable {
        capability: CapabilityKind,
        reason: String,
    },
}

/// Everything the controller tells the outside world. Each event carries
/// the session it belongs to so observers can drop stale ones.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GateEvent {
    PhaseChanged {
        session: SessionToken,
        phase: GatePhase,
    },
    NetworkClassified {
        session: SessionToken,
        classification: NetworkClassification,
    },
    NetworkBlocked {
        session: SessionToken,
        classification: NetworkClassification,
        message: String,
    },
    /// Published on every successful position fix, inside or outside.
    PositionUpdated {
        session: SessionToken,
        position: Coordinate,
        distance_km: f64,
    },
    LocationOutOfRange {
        session: SessionToken,
        distance_km: f64,
    },
    Advisory {
        session: SessionToken,
        advisory: Advisory,
    },
    Ready {
        session: SessionToken,
    },
    /// The session task died unexpectedly; the session was torn down.
    SessionAborted {
        session: SessionToken,
        reason: String,
    },
}

impl GateEvent {
    pub fn session(&self) -> SessionToken {
        match self {
            Self::PhaseChanged { session, .. }
            | Self::NetworkClassified { session, .. }
            | Self::NetworkBlocked { session, .. }
            | Self::PositionUpdated { session, .. }
            | Self::LocationOutOfRange { session, .. }
            | Self::Advisory { session, .. }
            | Self::Ready { session }
            | Self::SessionAborted { session, .. } => *session,
        }
    }

    /// JSON rendering for presentation layers.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

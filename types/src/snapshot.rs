//! Raw connectivity snapshot as reported by the platform.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::TypesError;

/// The active network transport.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    Wifi,
    Cellular,
    Vpn,
    Other,
    None,
}

impl Transport {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Wifi => "wifi",
            Self::Cellular => "cellular",
            Self::Vpn => "vpn",
            Self::Other => "other",
            Self::None => "none",
        }
    }

    /// Wifi and cellular are the only transports a VPN can ride on top of
    /// while still being reported as the physical link.
    pub fn is_physical(&self) -> bool {
        matches!(self, Self::Wifi | Self::Cellular)
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Transport {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "wifi" => Ok(Self::Wifi),
            "cellular" => Ok(Self::Cellular),
            "vpn" => Ok(Self::Vpn),
            "other" => Ok(Self::Other),
            "none" => Ok(Self::None),
            other => Err(TypesError::UnknownTransport(other.to_string())),
        }
    }
}

/// One reading of the device's connectivity.
///
/// Produced once per poll by a network capability and never mutated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectivitySnapshot {
    /// `None` when the platform has not finished probing reachability.
    pub is_internet_reachable: Option<bool>,
    pub transport: Transport,
    /// Best-effort; platforms that cannot tell report `false`.
    pub vpn_active: bool,
}

impl ConnectivitySnapshot {
    pub fn new(is_internet_reachable: Option<bool>, transport: Transport, vpn_active: bool) -> Self {
        Self {
            is_internet_reachable,
            transport,
            vpn_active,
        }
    }

    /// A reachable, VPN-free wifi connection.
    pub fn online(transport: Transport) -> Self {
        Self::new(Some(true), transport, false)
    }

    /// Internet explicitly unreachable.
    pub fn offline() -> Self {
        Self::new(Some(false), Transport::None, false)
    }
}

//! Categorised network state.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Message shown when the internet is unreachable.
pub const NO_INTERNET_MESSAGE: &str = "Check your internet connection";

/// Message shown when a VPN is in use, with or without a physical link.
pub const VPN_MESSAGE: &str = "Please turn off your VPN";

/// The outcome of classifying a [`ConnectivitySnapshot`](crate::ConnectivitySnapshot).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkClassification {
    /// Reachable, no VPN detected.
    Internet,
    /// Traffic goes through a VPN.
    Vpn,
    /// A physical link with a VPN layered on top.
    Both,
    /// Internet unreachable.
    None,
}

impl NetworkClassification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Internet => "internet",
            Self::Vpn => "vpn",
            Self::Both => "both",
            Self::None => "none",
        }
    }

    /// Whether the gate may advance past the network check.
    pub fn permits_advance(&self) -> bool {
        matches!(self, Self::Internet)
    }

    /// The operator-facing message for a blocking classification.
    ///
    /// `Both` shares the generic VPN message.
    pub fn block_message(&self) -> Option<&'static str> {
        match self {
            Self::Internet => None,
            Self::None => Some(NO_INTERNET_MESSAGE),
            Self::Vpn | Self::Both => Some(VPN_MESSAGE),
        }
    }

    /// Status line describing the connection.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Internet => "Connected to the internet",
            Self::Both => "Connected to the internet with VPN",
            Self::Vpn => "Connected to VPN",
            Self::None => "No internet connection",
        }
    }
}

impl fmt::Display for NetworkClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

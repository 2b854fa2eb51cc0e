//! Connectivity snapshot classification.
//!
//! First matching rule wins:
//!
//! | reachable | transport / vpn                         | result   |
//! |-----------|-----------------------------------------|----------|
//! | `false`   | any                                     | None     |
//! | otherwise | transport is `vpn`                      | Vpn      |
//! | otherwise | wifi/cellular with `vpn_active`         | Both     |
//! | otherwise | any other transport with `vpn_active`   | Vpn      |
//! | otherwise | no VPN                                  | Internet |
//!
//! An unknown reachability (`None`) is not treated as unreachable; only an
//! explicit `false` blocks.

use geogate_types::{ConnectivitySnapshot, NetworkClassification, Transport};

/// Classify a snapshot. Pure and total.
pub fn classify(snapshot: &ConnectivitySnapshot) -> NetworkClassification {
    if snapshot.is_internet_reachable == Some(false) {
        return NetworkClassification::None;
    }
    if snapshot.transport == Transport::Vpn {
        return NetworkClassification::Vpn;
    }
    match (snapshot.vpn_active, snapshot.transport.is_physical()) {
        (true, true) => NetworkClassification::Both,
        (true, false) => NetworkClassification::Vpn,
        (false, _) => NetworkClassification::Internet,
    }
}

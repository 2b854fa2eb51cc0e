use async_trait::async_trait;
use geogate_types::ConnectivitySnapshot;

use crate::NetworkError;

/// Platform access to the current connectivity state.
///
/// VPN detection is the platform's responsibility; bindings that cannot
/// detect a VPN report `vpn_active: false`.
#[async_trait]
pub trait NetworkCapability: Send + Sync {
    async fn fetch_snapshot(&self) -> Result<ConnectivitySnapshot, NetworkError>;
}

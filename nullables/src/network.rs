//! Nullable network: scripted connectivity snapshots.

use async_trait::async_trait;
use geogate_network::{NetworkCapability, NetworkError};
use geogate_types::ConnectivitySnapshot;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

/// A network capability that replays scripted results.
///
/// Results are returned in order; the last one repeats once the script is
/// down to a single entry. An empty script reports the subsystem unavailable.
pub struct NullNetwork {
    script: Mutex<VecDeque<Result<ConnectivitySnapshot, NetworkError>>>,
    delay: Mutex<Duration>,
    fetches: Mutex<u32>,
}

impl NullNetwork {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            delay: Mutex::new(Duration::ZERO),
            fetches: Mutex::new(0),
        }
    }

    /// Always report the same snapshot.
    pub fn with_snapshot(snapshot: ConnectivitySnapshot) -> Self {
        let network = Self::new();
        network.push(Ok(snapshot));
        network
    }

    /// Always fail.
    pub fn failing(error: NetworkError) -> Self {
        let network = Self::new();
        network.push(Err(error));
        network
    }

    /// Append a result to the script.
    pub fn push(&self, result: Result<ConnectivitySnapshot, NetworkError>) {
        self.script.lock().unwrap().push_back(result);
    }

    /// Drop the script and replace it with a single repeating result.
    pub fn set(&self, result: Result<ConnectivitySnapshot, NetworkError>) {
        let mut script = self.script.lock().unwrap();
        script.clear();
        script.push_back(result);
    }

    /// Make every fetch take `delay` (tokio time) before answering.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    /// Number of fetches so far (for assertions).
    pub fn fetch_count(&self) -> u32 {
        *self.fetches.lock().unwrap()
    }

    fn next(&self) -> Result<ConnectivitySnapshot, NetworkError> {
        let mut script = self.script.lock().unwrap();
        if script.len() > 1 {
            script.pop_front().unwrap()
        } else {
            script
                .front()
                .cloned()
                .unwrap_or_else(|| Err(NetworkError::Unavailable("no scripted snapshot".into())))
        }
    }
}

impl Default for NullNetwork {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NetworkCapability for NullNetwork {
    async fn fetch_snapshot(&self) -> Result<ConnectivitySnapshot, NetworkError> {
        *self.fetches.lock().unwrap() += 1;
        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.next()
    }
}

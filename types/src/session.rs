//! Session identity used to discard stale capability callbacks.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies one run of the gate sequence.
///
/// Tokens are issued in increasing order by the controller. Any callback
/// carrying a token other than the active session's is ignored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SessionToken(u64);

impl SessionToken {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// The token issued after this one.
    pub fn next(&self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session#{}", self.0)
    }
}

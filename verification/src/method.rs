//! Biometric verification methods.
//!
//! The gate specifies *that* verification happens, not *how*. The method is
//! passed through to the platform untouched.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::DispatchError;

/// The two biometric methods offered once the gate is open.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VerificationMethod {
    #[serde(rename = "fingerprint")]
    Fingerprint,
    #[serde(rename = "face-id")]
    FaceId,
}

impl VerificationMethod {
    /// Every method, in presentation order.
    pub const ALL: [VerificationMethod; 2] = [Self::Fingerprint, Self::FaceId];

    /// Opaque tag handed to the platform verifier.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Fingerprint => "fingerprint",
            Self::FaceId => "face-id",
        }
    }

    /// Button label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Fingerprint => "Fingerprint",
            Self::FaceId => "Face ID",
        }
    }
}

impl fmt::Display for VerificationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for VerificationMethod {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.tag().eq_ignore_ascii_case(s))
            .ok_or_else(|| DispatchError::UnknownMethod(s.to_string()))
    }
}

/// What the platform verifier reported.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationOutcome {
    Success,
    Failure,
    Cancelled,
}

/// The platform biometric prompt.
#[async_trait]
pub trait VerificationCapability: Send + Sync {
    async fn invoke(&self, method: VerificationMethod) -> VerificationOutcome;
}

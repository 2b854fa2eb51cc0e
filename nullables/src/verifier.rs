//! Nullable verifier: records the methods it was asked to run.

use async_trait::async_trait;
use geogate_verification::{VerificationCapability, VerificationMethod, VerificationOutcome};
use std::sync::Mutex;

/// A verifier that always answers with a configured outcome.
pub struct NullVerifier {
    outcome: VerificationOutcome,
    invoked: Mutex<Vec<VerificationMethod>>,
}

impl NullVerifier {
    pub fn new(outcome: VerificationOutcome) -> Self {
        Self {
            outcome,
            invoked: Mutex::new(Vec::new()),
        }
    }

    /// Every method invoked so far, oldest first.
    pub fn invoked(&self) -> Vec<VerificationMethod> {
        self.invoked.lock().unwrap().clone()
    }
}

impl Default for NullVerifier {
    fn default() -> Self {
        Self::new(VerificationOutcome::Success)
    }
}

#[async_trait]
impl VerificationCapability for NullVerifier {
    async fn invoke(&self, method: VerificationMethod) -> VerificationOutcome {
        self.invoked.lock().unwrap().push(method);
        self.outcome
    }
}

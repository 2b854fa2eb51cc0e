//! Method selection after the gate opens.

use std::sync::Arc;

use geogate_types::SessionToken;

use crate::{DispatchError, VerificationCapability, VerificationMethod, VerificationOutcome};

/// Presents the biometric options for one completed gate session and
/// forwards a single selection.
///
/// There is no retry: after one selection further calls fail with
/// [`DispatchError::AlreadyDispatched`]. [`back`](Self::back) abandons the
/// session.
pub struct VerificationDispatcher {
    session: SessionToken,
    capability: Arc<dyn VerificationCapability>,
    selected: Option<VerificationMethod>,
}

impl VerificationDispatcher {
    pub fn new(session: SessionToken, capability: Arc<dyn VerificationCapability>) -> Self {
        Self {
            session,
            capability,
            selected: None,
        }
    }

    pub fn session(&self) -> SessionToken {
        self.session
    }

    pub fn options(&self) -> [VerificationMethod; 2] {
        VerificationMethod::ALL
    }

    /// The method already forwarded, if any.
    pub fn selected(&self) -> Option<VerificationMethod> {
        self.selected
    }

    /// Forward the operator's choice to the platform verifier.
    pub async fn select(
        &mut self,
        method: VerificationMethod,
    ) -> Result<VerificationOutcome, DispatchError> {
        if let Some(previous) = self.selected {
            return Err(DispatchError::AlreadyDispatched(previous));
        }
        self.selected = Some(method);
        tracing::info!(session = %self.session, method = method.tag(), "dispatching verification");
        let outcome = self.capability.invoke(method).await;
        tracing::info!(session = %self.session, method = method.tag(), ?outcome, "verification returned");
        Ok(outcome)
    }

    /// Abandon the session. Returns the token so the caller can tear down
    /// anything still tied to it.
    pub fn back(self) -> SessionToken {
        tracing::info!(session = %self.session, "verification abandoned");
        self.session
    }
}

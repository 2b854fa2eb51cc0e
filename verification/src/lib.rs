//! Terminal edge of the gate sequence.
//!
//! Once the gate reaches `Ready` the operator picks one of two biometric
//! methods and the choice is forwarded, as an opaque tag, to the platform's
//! verification capability. The gate does not consume the result.

pub mod dispatcher;
pub mod error;
pub mod method;

pub use dispatcher::VerificationDispatcher;
pub use error::DispatchError;
pub use method::{VerificationCapability, VerificationMethod, VerificationOutcome};

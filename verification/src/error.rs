use thiserror::Error;

use crate::VerificationMethod;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("a verification method ({0}) was already selected for this session")]
    AlreadyDispatched(VerificationMethod),

    #[error("unknown verification method {0:?}, expected \"fingerprint\" or \"face-id\"")]
    UnknownMethod(String),
}

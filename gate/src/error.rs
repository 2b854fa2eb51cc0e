use geogate_types::SessionToken;
use thiserror::Error;

use crate::GatePhase;

#[derive(Debug, Error, PartialEq)]
pub enum GateError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("no active gate session")]
    NoActiveSession,

    #[error("{0} is not the active gate session")]
    StaleSession(SessionToken),

    #[error("cannot {operation} while in phase {phase}")]
    InvalidPhase {
        phase: GatePhase,
        operation: &'static str,
    },
}

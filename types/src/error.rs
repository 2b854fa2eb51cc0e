//! Errors from building coordinates and parsing transports.

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum TypesError {
    #[error("latitude {0} is outside [-90, 90]")]
    LatitudeOutOfRange(f64),

    #[error("longitude {0} is outside [-180, 180]")]
    LongitudeOutOfRange(f64),

    #[error("coordinate component is not finite")]
    NotFinite,

    #[error("unknown transport: {0}")]
    UnknownTransport(String),
}

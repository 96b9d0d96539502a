//! Errors returned by `GameWorld` vehicle operations.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum VehicleError {
    #[error("no entity with runtime id {0}")]
    NotFound(u64),

    #[error("entity {0} is not a trailer")]
    NotATrailer(u64),

    #[error("entity {puller} cannot tow trailer {trailer}")]
    CannotTow { trailer: u64, puller: u64 },

    #[error("unknown vehicle type: {0}")]
    UnknownVehicleType(String),
}

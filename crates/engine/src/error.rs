//! The module contains the errors the engine can throw.
//!
//! The first six variants are client input errors detected while validating
//! a request; they are surfaced verbatim to the caller. [`Corrupt`] and
//! [`Database`] are infrastructure failures: fatal for the current operation
//! and never retried.
//!
//! [`Corrupt`]: EngineError::Corrupt
//! [`Database`]: EngineError::Database
use sea_orm::DbErr;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("invalid status: {0}")]
    InvalidStatusValue(String),
    #[error("invalid timestamp: {0}")]
    InvalidTimestampFormat(String),
    #[error("dispenser \"{0}\" not found")]
    DispenserNotFound(String),
    #[error("illegal transition: {0}")]
    IllegalTransition(String),
    #[error("invalid closing timestamp: {0}")]
    InvalidClosingTimestamp(String),
    #[error("invalid flow volume: {0}")]
    InvalidFlowVolume(String),
    #[error("corrupt state: {0}")]
    Corrupt(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::InvalidStatusValue(a), Self::InvalidStatusValue(b)) => a == b,
            (Self::InvalidTimestampFormat(a), Self::InvalidTimestampFormat(b)) => a == b,
            (Self::DispenserNotFound(a), Self::DispenserNotFound(b)) => a == b,
            (Self::IllegalTransition(a), Self::IllegalTransition(b)) => a == b,
            (Self::InvalidClosingTimestamp(a), Self::InvalidClosingTimestamp(b)) => a == b,
            (Self::InvalidFlowVolume(a), Self::InvalidFlowVolume(b)) => a == b,
            (Self::Corrupt(a), Self::Corrupt(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}

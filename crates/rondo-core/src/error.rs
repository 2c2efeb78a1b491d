//! Error types for the RONDO substrate

use thiserror::Error;

use crate::{CoreId, ProtocolId};

/// Core RONDO errors
#[derive(Error, Debug)]
pub enum RondoError {
    // Lifecycle errors
    #[error("{component} already running")]
    AlreadyRunning { component: &'static str },

    #[error("{component} not running")]
    NotRunning { component: &'static str },

    #[error("{kind} {id} already open")]
    AlreadyOpen { kind: &'static str, id: String },

    // Registry errors
    #[error("{kind} {id} already registered")]
    DuplicateId { kind: &'static str, id: String },

    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },

    // Bounded resource errors
    #[error("{kind} {id} buffer full")]
    Overflow { kind: &'static str, id: String },

    #[error("{kind} {id} is closed")]
    Closed { kind: &'static str, id: String },

    #[error("{kind} {id} closed during receive")]
    ClosedDuringReceive { kind: &'static str, id: String },

    // Collaborator failures
    #[error("core {0} has no processor")]
    NoProcessor(CoreId),

    #[error("processor failed: {0}")]
    Processor(String),

    #[error("validation failed for protocol {id}: {reason}")]
    Validation { id: ProtocolId, reason: String },
}

/// Result type for RONDO operations
pub type RondoResult<T> = Result<T, RondoError>;

//! Error taxonomy for the seaport simulation.
//!
//! Every failure is local to the record, dock or job that caused it. The
//! scheduler logs and skips; only I/O and configuration errors are fatal to
//! the command-line front end.

use thiserror::Error;

use crate::world::EntityId;

#[derive(Debug, Error)]
pub enum SeaportError {
    #[error("Config error: {0}")]
    Config(String),

    /// A record line could not be parsed or referenced an unknown parent.
    #[error("Malformed record on line {line}: {reason}")]
    MalformedRecord { line: usize, reason: String },

    /// A lock guarding world structure was poisoned by a panicking holder.
    #[error("Structural race: {0}")]
    StructuralRace(String),

    #[error("Precondition violated: {0}")]
    Precondition(#[from] PreconditionViolation),

    /// A search or sort request that does not apply, e.g. docks by weight.
    #[error("Invalid query: {0}")]
    Query(String),

    #[error("Job not found: {0}")]
    JobNotFound(EntityId),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Caller bugs: operations invoked in a state that does not allow them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreconditionViolation {
    #[error("dock {dock} already holds ship {occupant}")]
    DockOccupied { dock: EntityId, occupant: EntityId },

    #[error("port {port} has no dock {dock}")]
    UnknownDock { port: EntityId, dock: EntityId },

    #[error("queue of port {port} is empty")]
    EmptyQueue { port: EntityId },

    #[error("simulation is {actual}, expected {expected}")]
    Lifecycle {
        expected: &'static str,
        actual: &'static str,
    },
}

impl SeaportError {
    pub fn malformed(line: usize, reason: impl Into<String>) -> Self {
        Self::MalformedRecord {
            line,
            reason: reason.into(),
        }
    }

    pub fn race(what: impl std::fmt::Display) -> Self {
        Self::StructuralRace(format!("{what} lock poisoned"))
    }
}

pub type Result<T, E = SeaportError> = std::result::Result<T, E>;

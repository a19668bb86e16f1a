//! Error types for zone-edit.

use std::time::Duration;

use thiserror::Error;

use crate::gateway::GatewayError;

/// Errors that can occur while reading or mutating a zone.
#[derive(Debug, Error)]
pub enum ZoneError {
    /// Record type tag is not one of the ten supported types.
    #[error("Unknown record type: {0}")]
    UnknownRecordType(String),

    /// Value string has the wrong number of positional arguments.
    #[error("{rtype} record expects {expected} argument(s), got {got}")]
    ArityMismatch {
        /// Canonical record type tag.
        rtype: &'static str,
        /// Number of arguments the constructor takes.
        expected: usize,
        /// Number of arguments supplied.
        got: usize,
    },

    /// A numeric field could not be parsed.
    #[error("Invalid value for {field}: {value:?}")]
    InvalidFieldValue {
        /// Field name (e.g. "preference").
        field: &'static str,
        /// Offending token.
        value: String,
    },

    /// Fetch, store or resync through the privileged helper failed.
    #[error("Privileged operation failed: {0}")]
    PrivilegedOperation(#[from] GatewayError),

    /// Zone text could not be parsed.
    #[error("Zone parse error at line {line}: {message}")]
    Parse {
        /// 1-based line number.
        line: usize,
        /// What went wrong.
        message: String,
    },

    /// The named lock could not be acquired in time.
    #[error("Timed out after {waited:?} waiting for lock {name:?}")]
    LockTimeout {
        /// Lock name.
        name: String,
        /// How long we waited.
        waited: Duration,
    },

    /// The transaction task was cancelled before it finished.
    #[error("Zone transaction aborted")]
    Aborted,

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl ZoneError {
    /// Build a parse error for the given line.
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            line,
            message: message.into(),
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T, E = ZoneError> = std::result::Result<T, E>;

//! Error types for the warden relayer

use crate::chain::ChainRole;
use thiserror::Error;

/// Main error type for the relayer
#[derive(Error, Debug)]
pub enum RelayerError {
    #[error("invalid relay direction {0:?} (expected \"source\" or \"destination\")")]
    Direction(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("connection error for {role} chain: {message}")]
    Connection { role: ChainRole, message: String },

    #[error("event query error on {role} chain: {message}")]
    Query { role: ChainRole, message: String },

    #[error("relay action error on {role} chain: {message}")]
    Action { role: ChainRole, message: String },

    #[error("timeout waiting for {operation}")]
    Timeout { operation: String },
}

impl RelayerError {
    /// Whether this error aborts the whole relay pass.
    ///
    /// Query errors degrade to an empty event set; action and timeout
    /// errors are isolated to a single event.
    pub fn is_pass_fatal(&self) -> bool {
        matches!(
            self,
            RelayerError::Direction(_)
                | RelayerError::Config(_)
                | RelayerError::Connection { .. }
        )
    }
}

/// Result type for relayer operations
pub type RelayerResult<T> = Result<T, RelayerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatality_classification() {
        assert!(RelayerError::Config("bad".into()).is_pass_fatal());
        assert!(RelayerError::Direction("north".into()).is_pass_fatal());
        assert!(RelayerError::Connection {
            role: ChainRole::Source,
            message: "unreachable".into()
        }
        .is_pass_fatal());

        assert!(!RelayerError::Query {
            role: ChainRole::Source,
            message: "filter".into()
        }
        .is_pass_fatal());
        assert!(!RelayerError::Action {
            role: ChainRole::Destination,
            message: "rejected".into()
        }
        .is_pass_fatal());
        assert!(!RelayerError::Timeout {
            operation: "send transaction".into()
        }
        .is_pass_fatal());
    }
}

//! Chain module - ledger roles, sessions and the submission seam
//!
//! This module provides:
//! - The fixed source/destination role pair and its direction parsing
//! - Per-pass chain sessions with PoA-compatible JSON-RPC plumbing
//! - The `TargetChain` trait the dispatcher submits through

pub mod connector;

pub use connector::{connect, ChainSession};

use crate::error::{RelayerError, RelayerResult};

use async_trait::async_trait;
use ethers::types::{Address, Bytes, Filter, Log, H256, U256};
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// Logical role of a chain in the bridge. Fixed for the process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainRole {
    Source,
    Destination,
}

impl ChainRole {
    /// The counterpart role. Relayed actions always cross to the other side.
    pub fn other(self) -> Self {
        match self {
            ChainRole::Source => ChainRole::Destination,
            ChainRole::Destination => ChainRole::Source,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ChainRole::Source => "source",
            ChainRole::Destination => "destination",
        }
    }
}

impl fmt::Display for ChainRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChainRole {
    type Err = RelayerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "source" => Ok(ChainRole::Source),
            "destination" => Ok(ChainRole::Destination),
            other => Err(RelayerError::Direction(other.to_string())),
        }
    }
}

/// Log-query surface the scanner reads events through.
///
/// `ChainSession` implements this against a live endpoint; tests mock it to
/// drive the scanner's fail-soft degradation paths.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Role of the chain this source reads from.
    fn role(&self) -> ChainRole;

    /// Fetch logs matching a filter.
    async fn get_logs(&self, filter: &Filter) -> RelayerResult<Vec<Log>>;
}

/// Target-chain operations the dispatcher needs to submit one action.
///
/// `ChainSession` implements this against a live endpoint; tests mock it to
/// inject nonce and submission failures.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TargetChain: Send + Sync {
    /// Chain id the outbound transaction must be stamped with.
    fn chain_id(&self) -> u64;

    /// Current transaction count (nonce) for an address.
    async fn transaction_count(&self, address: Address) -> RelayerResult<U256>;

    /// Submit a signed raw transaction, returning its hash.
    async fn submit_signed_transaction(&self, raw: Bytes) -> RelayerResult<H256>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_directions() {
        assert_eq!("source".parse::<ChainRole>().unwrap(), ChainRole::Source);
        assert_eq!(
            "destination".parse::<ChainRole>().unwrap(),
            ChainRole::Destination
        );
    }

    #[test]
    fn rejects_unknown_direction() {
        let err = "north".parse::<ChainRole>().unwrap_err();
        assert!(matches!(err, RelayerError::Direction(d) if d == "north"));
    }

    #[test]
    fn roles_are_opposites() {
        assert_eq!(ChainRole::Source.other(), ChainRole::Destination);
        assert_eq!(ChainRole::Destination.other(), ChainRole::Source);
    }
}

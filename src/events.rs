//! Bridge event types and schema-validating decoding
//!
//! Each chain role is bound to exactly one event kind: `Deposit` on the
//! source chain, `Unwrap` on the destination chain. Logs are decoded through
//! the contract ABI into a strongly-typed `DomainEvent`; a log that does not
//! match the schema yields a typed query error, never a defaulted field.

use crate::chain::ChainRole;
use crate::contracts::ContractBinding;
use crate::error::{RelayerError, RelayerResult};

use ethers::abi::{Event, RawLog};
use ethers::types::{Address, Log, H256, U256};

/// The event kind scanned on each side of the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Deposit,
    Unwrap,
}

impl EventKind {
    /// Fixed direction-to-event binding: deposits are scanned on the source
    /// chain, unwraps on the destination chain.
    pub fn for_role(role: ChainRole) -> Self {
        match role {
            ChainRole::Source => EventKind::Deposit,
            ChainRole::Destination => EventKind::Unwrap,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            EventKind::Deposit => "Deposit",
            EventKind::Unwrap => "Unwrap",
        }
    }
}

/// One observed asset-transfer event.
///
/// The amount is carried as a 256-bit integer end to end; it is never
/// rounded, truncated or floated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainEvent {
    pub token: Address,
    pub recipient: Address,
    pub amount: U256,
    pub origin_tx: H256,
    pub block_number: u64,
}

/// Decodes raw logs into `DomainEvent`s through the contract ABI.
#[derive(Debug)]
pub struct EventDecoder {
    role: ChainRole,
    event: Event,
}

impl EventDecoder {
    pub fn new(binding: &ContractBinding, kind: EventKind) -> RelayerResult<Self> {
        let event = binding.abi.event(kind.name()).map_err(|e| RelayerError::Query {
            role: binding.role,
            message: format!("{} event missing from contract ABI: {}", kind.name(), e),
        })?;
        Ok(Self {
            role: binding.role,
            event: event.clone(),
        })
    }

    /// Topic hash identifying this event kind in log filters.
    pub fn topic0(&self) -> H256 {
        self.event.signature()
    }

    pub fn decode(&self, log: &Log) -> RelayerResult<DomainEvent> {
        let raw = RawLog {
            topics: log.topics.clone(),
            data: log.data.to_vec(),
        };
        let parsed = self.event.parse_log(raw).map_err(|e| self.schema_error(format!(
            "failed to decode {} log: {}",
            self.event.name, e
        )))?;

        let mut token = None;
        let mut recipient = None;
        let mut amount = None;
        for param in parsed.params {
            match param.name.as_str() {
                "token" => token = param.value.into_address(),
                "recipient" => recipient = param.value.into_address(),
                "amount" => amount = param.value.into_uint(),
                _ => {}
            }
        }

        let token = token.ok_or_else(|| self.schema_error("missing token argument".into()))?;
        let recipient =
            recipient.ok_or_else(|| self.schema_error("missing recipient argument".into()))?;
        let amount = amount.ok_or_else(|| self.schema_error("missing amount argument".into()))?;
        let origin_tx = log
            .transaction_hash
            .ok_or_else(|| self.schema_error("log carries no transaction hash".into()))?;
        let block_number = log
            .block_number
            .ok_or_else(|| self.schema_error("log carries no block number".into()))?
            .as_u64();

        Ok(DomainEvent {
            token,
            recipient,
            amount,
            origin_tx,
            block_number,
        })
    }

    fn schema_error(&self, message: String) -> RelayerError {
        RelayerError::Query {
            role: self.role,
            message,
        }
    }
}

//! Chain connector: per-pass sessions over PoA-compatible JSON-RPC transport

use crate::chain::{ChainRole, EventSource, TargetChain};
use crate::error::{RelayerError, RelayerResult};
use crate::metrics;

use async_trait::async_trait;
use ethers::providers::{Http, HttpClientError, JsonRpcClient, Middleware, Provider};
use ethers::types::{Address, Bytes, Filter, Log, H256, U256};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::fmt::Debug;
use std::time::Duration;
use tokio::time::timeout;
use tracing::info;

/// Maximum header `extraData` accepted by strict decoding: "0x" + 32 bytes.
const MAX_EXTRA_DATA_HEX: usize = 2 + 64;

/// JSON-RPC transport adapting proof-of-authority block headers.
///
/// Clique-style chains pack the signer vanity and seal into `extraData`,
/// exceeding the 32 bytes standard header decoding allows. This wrapper sits
/// at the lowest layer of the request pipeline and trims block responses back
/// to the vanity prefix before typed deserialization.
#[derive(Debug)]
pub struct PoaCompatClient {
    inner: Http,
}

impl PoaCompatClient {
    pub fn new(inner: Http) -> Self {
        Self { inner }
    }
}

fn is_block_method(method: &str) -> bool {
    matches!(method, "eth_getBlockByNumber" | "eth_getBlockByHash")
}

fn normalize_poa_block(mut value: Value) -> Value {
    if let Some(obj) = value.as_object_mut() {
        if let Some(Value::String(extra)) = obj.get_mut("extraData") {
            if extra.len() > MAX_EXTRA_DATA_HEX {
                extra.truncate(MAX_EXTRA_DATA_HEX);
            }
        }
    }
    value
}

#[async_trait]
impl JsonRpcClient for PoaCompatClient {
    type Error = HttpClientError;

    async fn request<T, R>(&self, method: &str, params: T) -> Result<R, Self::Error>
    where
        T: Debug + Serialize + Send + Sync,
        R: DeserializeOwned + Send,
    {
        let raw: Value = self.inner.request(method, params).await?;
        let raw = if is_block_method(method) {
            normalize_poa_block(raw)
        } else {
            raw
        };
        let text = raw.to_string();
        serde_json::from_value(raw).map_err(|err| HttpClientError::SerdeJson { err, text })
    }
}

/// One live connection to a ledger endpoint.
///
/// Created per relay pass and discarded at the end of it; chain id and
/// latest height are cached during the connect handshake.
#[derive(Debug)]
pub struct ChainSession {
    role: ChainRole,
    endpoint: String,
    provider: Provider<PoaCompatClient>,
    connected: bool,
    chain_id: u64,
    latest_block: u64,
    rpc_timeout: Duration,
}

/// Open a session to one chain endpoint.
///
/// Fails with a connection error if the endpoint is unreachable, returns a
/// malformed response, or the handshake exceeds the RPC timeout.
pub async fn connect(
    role: ChainRole,
    endpoint: &str,
    rpc_timeout: Duration,
) -> RelayerResult<ChainSession> {
    let http: Http = endpoint.parse().map_err(|e| RelayerError::Connection {
        role,
        message: format!("invalid endpoint {}: {}", endpoint, e),
    })?;

    let provider =
        Provider::new(PoaCompatClient::new(http)).interval(Duration::from_millis(100));

    let chain_id = match timeout(rpc_timeout, provider.get_chainid()).await {
        Ok(Ok(id)) => id.as_u64(),
        Ok(Err(e)) => {
            return Err(RelayerError::Connection {
                role,
                message: format!("chain id query failed: {}", e),
            })
        }
        Err(_) => {
            return Err(RelayerError::Connection {
                role,
                message: "chain id query timed out".to_string(),
            })
        }
    };

    let latest_block = match timeout(rpc_timeout, provider.get_block_number()).await {
        Ok(Ok(n)) => n.as_u64(),
        Ok(Err(e)) => {
            return Err(RelayerError::Connection {
                role,
                message: format!("block height query failed: {}", e),
            })
        }
        Err(_) => {
            return Err(RelayerError::Connection {
                role,
                message: "block height query timed out".to_string(),
            })
        }
    };

    metrics::record_chain_height(role, latest_block);
    info!(
        "Connected to {} chain at {} (chain id {}, height {})",
        role, endpoint, chain_id, latest_block
    );

    Ok(ChainSession {
        role,
        endpoint: endpoint.to_string(),
        provider,
        connected: true,
        chain_id,
        latest_block,
        rpc_timeout,
    })
}

impl ChainSession {
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Latest block height cached at connect time.
    pub fn current_height(&self) -> u64 {
        self.latest_block
    }
}

#[async_trait]
impl EventSource for ChainSession {
    fn role(&self) -> ChainRole {
        self.role
    }

    /// Fetch logs matching a filter, bounded by the RPC timeout.
    async fn get_logs(&self, filter: &Filter) -> RelayerResult<Vec<Log>> {
        match timeout(self.rpc_timeout, self.provider.get_logs(filter)).await {
            Ok(Ok(logs)) => Ok(logs),
            Ok(Err(e)) => Err(RelayerError::Query {
                role: self.role,
                message: format!("log query failed: {}", e),
            }),
            Err(_) => Err(RelayerError::Timeout {
                operation: format!("log query on {} chain", self.role),
            }),
        }
    }
}

#[async_trait]
impl TargetChain for ChainSession {
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    async fn transaction_count(&self, address: Address) -> RelayerResult<U256> {
        match timeout(
            self.rpc_timeout,
            self.provider.get_transaction_count(address, None),
        )
        .await
        {
            Ok(Ok(nonce)) => Ok(nonce),
            Ok(Err(e)) => Err(RelayerError::Action {
                role: self.role,
                message: format!("nonce fetch failed: {}", e),
            }),
            Err(_) => Err(RelayerError::Timeout {
                operation: format!("nonce fetch on {} chain", self.role),
            }),
        }
    }

    async fn submit_signed_transaction(&self, raw: Bytes) -> RelayerResult<H256> {
        match timeout(self.rpc_timeout, self.provider.send_raw_transaction(raw)).await {
            Ok(Ok(pending)) => Ok(pending.tx_hash()),
            Ok(Err(e)) => Err(RelayerError::Action {
                role: self.role,
                message: format!("transaction rejected: {}", e),
            }),
            Err(_) => Err(RelayerError::Timeout {
                operation: format!("transaction submission on {} chain", self.role),
            }),
        }
    }
}

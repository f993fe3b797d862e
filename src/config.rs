//! Configuration management for the warden relayer
//!
//! Loads settings from a TOML file with environment variable substitution,
//! falling back to the reference deployment defaults when no file is present.

use crate::chain::ChainRole;

use anyhow::{Context, Result};
use ethers::types::U256;
use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_SOURCE_RPC: &str = "https://api.avax-test.network/ext/bc/C/rpc";
const DEFAULT_DESTINATION_RPC: &str = "https://data-seed-prebsc-1-s1.binance.org:8545/";

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub relayer: RelayerConfig,
    #[serde(default)]
    pub gas: GasPolicy,
    #[serde(default)]
    pub chains: ChainEndpoints,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RelayerConfig {
    /// Path to the role-keyed contract registry file.
    pub contract_info: PathBuf,
    /// Bound applied to every chain RPC call.
    pub rpc_timeout_secs: u64,
}

impl Default for RelayerConfig {
    fn default() -> Self {
        Self {
            contract_info: PathBuf::from("contract_info.json"),
            rpc_timeout_secs: 30,
        }
    }
}

/// Fixed transaction budget for relayed wrap/withdraw calls.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GasPolicy {
    pub gas_limit: u64,
    pub max_fee_gwei: u64,
    pub priority_fee_gwei: u64,
}

impl Default for GasPolicy {
    fn default() -> Self {
        Self {
            gas_limit: 250_000,
            max_fee_gwei: 2,
            priority_fee_gwei: 1,
        }
    }
}

impl GasPolicy {
    pub fn max_fee_wei(&self) -> U256 {
        U256::from(self.max_fee_gwei) * U256::from(1_000_000_000u64)
    }

    pub fn priority_fee_wei(&self) -> U256 {
        U256::from(self.priority_fee_gwei) * U256::from(1_000_000_000u64)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChainEndpoints {
    pub source: EndpointConfig,
    pub destination: EndpointConfig,
}

impl Default for ChainEndpoints {
    fn default() -> Self {
        Self {
            source: EndpointConfig {
                rpc_url: DEFAULT_SOURCE_RPC.to_string(),
            },
            destination: EndpointConfig {
                rpc_url: DEFAULT_DESTINATION_RPC.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EndpointConfig {
    pub rpc_url: String,
}

impl Settings {
    /// Load settings from the configuration file.
    ///
    /// `RELAYER_CONFIG` overrides the default `config/default.toml` path; a
    /// missing default file yields the built-in settings.
    pub fn load() -> Result<Self> {
        match env::var("RELAYER_CONFIG") {
            Ok(path) => Self::from_file(PathBuf::from(path)),
            Err(_) => {
                let default_path = PathBuf::from("config/default.toml");
                if default_path.exists() {
                    Self::from_file(default_path)
                } else {
                    Ok(Settings::default())
                }
            }
        }
    }

    fn from_file(path: PathBuf) -> Result<Self> {
        let config_str = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        // Substitute environment variables
        let config_str = substitute_env_vars(&config_str);

        let settings: Settings =
            toml::from_str(&config_str).with_context(|| "Failed to parse configuration")?;

        Ok(settings)
    }

    /// RPC endpoint for a chain role.
    pub fn endpoint(&self, role: ChainRole) -> &str {
        match role {
            ChainRole::Source => &self.chains.source.rpc_url,
            ChainRole::Destination => &self.chains.destination.rpc_url,
        }
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.relayer.rpc_timeout_secs)
    }
}

/// Substitute environment variables in the format ${VAR_NAME}
fn substitute_env_vars(input: &str) -> String {
    let mut result = input.to_string();
    let re = regex::Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").unwrap();

    for cap in re.captures_iter(input) {
        let var_name = &cap[1];
        let var_value = env::var(var_name).unwrap_or_default();
        result = result.replace(&cap[0], &var_value);
    }

    result
}

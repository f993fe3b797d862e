//! Contract registry: per-role contract bindings and the warden credential
//!
//! The registry file is role-keyed JSON ("source"/"destination"), each entry
//! carrying the deployed contract address, its ABI, and optionally the warden
//! key pair. Exactly one entry across both roles must carry the credential.

use crate::chain::ChainRole;
use crate::error::{RelayerError, RelayerResult};

use ethers::abi::Abi;
use ethers::signers::LocalWallet;
use ethers::types::Address;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct RegistryEntry {
    address: String,
    abi: Value,
    warden_private_key: Option<String>,
    warden_address: Option<String>,
}

/// Deserialized contract registry file.
#[derive(Debug)]
pub struct ContractRegistry {
    entries: HashMap<String, RegistryEntry>,
}

impl ContractRegistry {
    pub fn from_file(path: &Path) -> RelayerResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            RelayerError::Config(format!("failed to read contract registry {:?}: {}", path, e))
        })?;
        let entries = serde_json::from_str(&raw).map_err(|e| {
            RelayerError::Config(format!("malformed contract registry {:?}: {}", path, e))
        })?;
        Ok(Self { entries })
    }

    /// Resolve the deployed contract binding for a role.
    pub fn binding(&self, role: ChainRole) -> RelayerResult<ContractBinding> {
        let entry = self.entries.get(role.as_str()).ok_or_else(|| {
            RelayerError::Config(format!("contract registry has no entry for role {}", role))
        })?;

        let address: Address = entry.address.parse().map_err(|e| {
            RelayerError::Config(format!("invalid {} contract address: {}", role, e))
        })?;
        let abi: Abi = serde_json::from_value(entry.abi.clone())
            .map_err(|e| RelayerError::Config(format!("invalid {} contract ABI: {}", role, e)))?;

        let credential = match (&entry.warden_private_key, &entry.warden_address) {
            (Some(key), Some(addr)) => Some(WardenCredential {
                private_key: key.clone(),
                address: addr.parse().map_err(|e| {
                    RelayerError::Config(format!("invalid warden address for {}: {}", role, e))
                })?,
            }),
            _ => None,
        };

        Ok(ContractBinding {
            role,
            address,
            abi,
            credential,
        })
    }
}

#[derive(Debug, Clone)]
pub(crate) struct WardenCredential {
    private_key: String,
    address: Address,
}

/// Deployed contract resolved for one chain role. Immutable for the pass.
#[derive(Debug, Clone)]
pub struct ContractBinding {
    pub role: ChainRole,
    pub address: Address,
    pub abi: Abi,
    pub(crate) credential: Option<WardenCredential>,
}

impl ContractBinding {
    pub fn has_credential(&self) -> bool {
        self.credential.is_some()
    }
}

/// The single credential authorized to submit wrap/withdraw transactions.
#[derive(Debug, Clone)]
pub struct Warden {
    pub address: Address,
    pub wallet: LocalWallet,
}

impl Warden {
    /// Pick the warden credential out of the two bindings.
    ///
    /// Source side is checked first, then destination. Chain-state validity
    /// of the credential is deferred to submission time.
    pub fn resolve(source: &ContractBinding, destination: &ContractBinding) -> RelayerResult<Self> {
        let credential = source
            .credential
            .as_ref()
            .or(destination.credential.as_ref())
            .ok_or_else(|| {
                RelayerError::Config(
                    "warden key/address not found in contract registry".to_string(),
                )
            })?;

        let wallet: LocalWallet = credential
            .private_key
            .parse()
            .map_err(|e| RelayerError::Config(format!("invalid warden private key: {}", e)))?;

        Ok(Warden {
            address: credential.address,
            wallet,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const TEST_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const TEST_ADDR: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";
    const CONTRACT_ADDR: &str = "0x5FbDB2315678afecb367f032d93F642f64180aa3";

    fn minimal_abi() -> &'static str {
        r#"[{"type":"event","name":"Deposit","anonymous":false,"inputs":[
            {"name":"token","type":"address","indexed":true},
            {"name":"recipient","type":"address","indexed":true},
            {"name":"amount","type":"uint256","indexed":false}]}]"#
    }

    fn write_registry(json: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();
        file
    }

    fn registry_with_warden_on(side: &str) -> String {
        let base = format!(r#""address":"{}","abi":{}"#, CONTRACT_ADDR, minimal_abi());
        let credential = format!(
            r#","warden_private_key":"{}","warden_address":"{}""#,
            TEST_KEY, TEST_ADDR
        );
        let (source, destination) = match side {
            "source" => (format!("{}{}", base, credential), base.clone()),
            "destination" => (base.clone(), format!("{}{}", base, credential)),
            _ => (base.clone(), base),
        };
        format!(
            r#"{{"source":{{{}}},"destination":{{{}}}}}"#,
            source, destination
        )
    }

    #[test]
    fn loads_bindings_for_both_roles() {
        let file = write_registry(&registry_with_warden_on("source"));
        let registry = ContractRegistry::from_file(file.path()).unwrap();

        let source = registry.binding(ChainRole::Source).unwrap();
        let destination = registry.binding(ChainRole::Destination).unwrap();

        assert_eq!(source.address, CONTRACT_ADDR.parse().unwrap());
        assert!(source.abi.event("Deposit").is_ok());
        assert!(source.has_credential());
        assert!(!destination.has_credential());
    }

    #[test]
    fn missing_role_key_is_config_error() {
        let file = write_registry(r#"{"source":{"address":"0x0000000000000000000000000000000000000001","abi":[]}}"#);
        let registry = ContractRegistry::from_file(file.path()).unwrap();
        let err = registry.binding(ChainRole::Destination).unwrap_err();
        assert!(matches!(err, RelayerError::Config(_)));
    }

    #[test]
    fn malformed_json_is_config_error() {
        let file = write_registry("{not json");
        let err = ContractRegistry::from_file(file.path()).unwrap_err();
        assert!(matches!(err, RelayerError::Config(_)));
    }

    #[test]
    fn unreadable_file_is_config_error() {
        let err = ContractRegistry::from_file(Path::new("/nonexistent/contract_info.json"))
            .unwrap_err();
        assert!(matches!(err, RelayerError::Config(_)));
    }

    #[test]
    fn warden_resolves_from_either_side() {
        for side in ["source", "destination"] {
            let file = write_registry(&registry_with_warden_on(side));
            let registry = ContractRegistry::from_file(file.path()).unwrap();
            let source = registry.binding(ChainRole::Source).unwrap();
            let destination = registry.binding(ChainRole::Destination).unwrap();

            let warden = Warden::resolve(&source, &destination).unwrap();
            assert_eq!(warden.address, TEST_ADDR.parse().unwrap());
        }
    }

    #[test]
    fn missing_warden_is_config_error() {
        let file = write_registry(&registry_with_warden_on("neither"));
        let registry = ContractRegistry::from_file(file.path()).unwrap();
        let source = registry.binding(ChainRole::Source).unwrap();
        let destination = registry.binding(ChainRole::Destination).unwrap();

        let err = Warden::resolve(&source, &destination).unwrap_err();
        assert!(matches!(err, RelayerError::Config(_)));
    }
}

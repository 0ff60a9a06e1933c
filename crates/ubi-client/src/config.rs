//! Client configuration.
//!
//! Identifies the deployed registry and the relayer that serves public
//! decryptions. Loaded from the environment, or built explicitly for tests.

use ubi_core::ContractAddress;
use url::Url;

/// Default chain: Sepolia.
pub const DEFAULT_CHAIN_ID: u64 = 11_155_111;
/// Default relayer endpoint.
pub const DEFAULT_RELAYER_URL: &str = "https://relayer.testnet.zama.cloud";

/// Configuration for a client session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Address of the deployed registry contract.
    pub contract_address: ContractAddress,
    /// Chain the registry lives on.
    pub chain_id: u64,
    /// Base URL of the decryption relayer.
    pub relayer_url: Url,
    /// Relayer request timeout in seconds.
    pub timeout_secs: u64,
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `UBI_CONTRACT_ADDRESS` (required)
    /// - `UBI_CHAIN_ID` (default: 11155111)
    /// - `UBI_RELAYER_URL` (default: `https://relayer.testnet.zama.cloud`)
    /// - `UBI_TIMEOUT_SECS` (default: 30)
    pub fn from_env() -> Result<Self, ConfigError> {
        let raw = std::env::var("UBI_CONTRACT_ADDRESS")
            .map_err(|_| ConfigError::MissingContractAddress)?;
        let contract_address = ContractAddress::from_hex(&raw)
            .map_err(|e| ConfigError::InvalidContractAddress(e.to_string()))?;

        Ok(Self {
            contract_address,
            chain_id: env_number("UBI_CHAIN_ID", DEFAULT_CHAIN_ID)?,
            relayer_url: env_url("UBI_RELAYER_URL", DEFAULT_RELAYER_URL)?,
            timeout_secs: env_number("UBI_TIMEOUT_SECS", 30)?,
        })
    }

    /// Configuration for an in-process deployment (tests, local runs).
    pub fn local(contract_address: ContractAddress) -> Result<Self, ConfigError> {
        let relayer_url = Url::parse("http://127.0.0.1:8545")
            .map_err(|e| ConfigError::InvalidUrl("localhost".to_string(), e.to_string()))?;
        Ok(Self {
            contract_address,
            chain_id: 31_337,
            relayer_url,
            timeout_secs: 5,
        })
    }
}

fn env_url(var: &str, default: &str) -> Result<Url, ConfigError> {
    let raw = std::env::var(var).unwrap_or_else(|_| default.to_string());
    Url::parse(&raw).map_err(|e| ConfigError::InvalidUrl(var.to_string(), e.to_string()))
}

fn env_number(var: &str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidNumber(var.to_string(), raw)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("UBI_CONTRACT_ADDRESS environment variable is required")]
    MissingContractAddress,
    #[error("invalid contract address: {0}")]
    InvalidContractAddress(String),
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
    #[error("invalid number for {0}: {1:?}")]
    InvalidNumber(String, String),
}

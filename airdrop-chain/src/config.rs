//! Chain configuration
//!
//! Supports loading from environment variables with the AIRDROP_ prefix.

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Transfer service configuration
///
/// The RPC URL and signer key are optional here so the service can start
/// without them; transfers then fail with a configuration error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    /// JSON-RPC endpoint URL
    pub rpc_url: Option<String>,
    /// Hex-encoded private key of the funding wallet
    #[serde(skip_serializing)]
    pub signer_key: Option<String>,
    /// EIP-155 chain id; queried from the node when unset
    pub chain_id: Option<u64>,
    /// ERC-20 contract address; native coin when unset
    pub token_contract: Option<String>,
    /// Decimals of the reward asset
    #[serde(default = "default_decimals")]
    pub token_decimals: u32,
    /// Gas limit; estimated by the node when unset
    pub gas_limit: Option<u64>,
    /// Maximum wait for confirmation in seconds
    #[serde(default = "default_confirm_timeout")]
    pub confirm_timeout_secs: u64,
    /// Receipt polling interval in milliseconds
    #[serde(default = "default_poll_ms")]
    pub confirm_poll_ms: u64,
    /// Blocks required on top of the inclusion block, counting it
    #[serde(default = "default_confirmations")]
    pub confirmations: u64,
}

fn default_decimals() -> u32 {
    18
}

fn default_confirm_timeout() -> u64 {
    120
}

fn default_poll_ms() -> u64 {
    1500
}

fn default_confirmations() -> u64 {
    1
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            rpc_url: None,
            signer_key: None,
            chain_id: None,
            token_contract: None,
            token_decimals: default_decimals(),
            gas_limit: None,
            confirm_timeout_secs: default_confirm_timeout(),
            confirm_poll_ms: default_poll_ms(),
            confirmations: default_confirmations(),
        }
    }
}

impl ChainConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - AIRDROP_RPC_URL: JSON-RPC endpoint
    /// - AIRDROP_SIGNER_KEY: funding wallet private key (hex)
    /// - AIRDROP_CHAIN_ID: EIP-155 chain id
    /// - AIRDROP_TOKEN_CONTRACT: ERC-20 contract address (optional)
    /// - AIRDROP_TOKEN_DECIMALS: reward asset decimals (default 18)
    /// - AIRDROP_GAS_LIMIT: gas limit (optional)
    /// - AIRDROP_CONFIRM_TIMEOUT_SECS: confirmation timeout (default 120)
    /// - AIRDROP_CONFIRM_POLL_MS: receipt polling interval (default 1500)
    /// - AIRDROP_CONFIRMATIONS: required confirmations (default 1)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            rpc_url: non_empty_var("AIRDROP_RPC_URL"),
            signer_key: non_empty_var("AIRDROP_SIGNER_KEY"),
            chain_id: parsed_var("AIRDROP_CHAIN_ID"),
            token_contract: non_empty_var("AIRDROP_TOKEN_CONTRACT"),
            token_decimals: parsed_var("AIRDROP_TOKEN_DECIMALS").unwrap_or(defaults.token_decimals),
            gas_limit: parsed_var("AIRDROP_GAS_LIMIT"),
            confirm_timeout_secs: parsed_var("AIRDROP_CONFIRM_TIMEOUT_SECS")
                .unwrap_or(defaults.confirm_timeout_secs),
            confirm_poll_ms: parsed_var("AIRDROP_CONFIRM_POLL_MS")
                .unwrap_or(defaults.confirm_poll_ms),
            confirmations: parsed_var("AIRDROP_CONFIRMATIONS").unwrap_or(defaults.confirmations),
        }
    }

    /// Configuration for a local development node
    pub fn development(signer_key: &str) -> Self {
        Self {
            rpc_url: Some("http://127.0.0.1:8545".to_string()),
            signer_key: Some(signer_key.to_string()),
            chain_id: Some(31337),
            confirm_poll_ms: 200,
            confirm_timeout_secs: 30,
            ..Default::default()
        }
    }

    pub fn confirm_timeout(&self) -> Duration {
        Duration::from_secs(self.confirm_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.confirm_poll_ms.max(1))
    }

    /// Whether both the endpoint and the key are present
    pub fn is_configured(&self) -> bool {
        self.rpc_url.is_some() && self.signer_key.is_some()
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parsed_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

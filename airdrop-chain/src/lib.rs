//! Airdrop Chain
//!
//! Reward transfers over an EVM JSON-RPC endpoint.
//!
//! The service signs locally with a configured key, submits a raw
//! transaction and waits for the receipt before reporting success. The
//! reward is either the chain's native coin or an ERC-20 token, depending on
//! whether a token contract is configured.

pub mod amount;
pub mod client;
pub mod config;
pub mod error;

pub use amount::to_base_units;
pub use client::EvmTransferService;
pub use config::ChainConfig;
pub use error::{ChainError, ChainResult};

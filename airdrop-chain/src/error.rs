//! Chain error types

use std::time::Duration;

use airdrop_core::TransferError;
use thiserror::Error;

/// Errors raised while sending a reward on chain
#[derive(Error, Debug)]
pub enum ChainError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid recipient address: {0}")]
    InvalidAddress(String),

    #[error("RPC error: {0}")]
    Rpc(#[from] web3::Error),

    #[error("Signing error: {0}")]
    Signing(String),

    #[error("Transaction {0} reverted")]
    Reverted(String),

    #[error("Transaction {tx_hash} not confirmed after {waited:?}")]
    ConfirmationTimeout { tx_hash: String, waited: Duration },
}

/// Result type alias for chain operations
pub type ChainResult<T> = Result<T, ChainError>;

impl From<ChainError> for TransferError {
    fn from(e: ChainError) -> Self {
        match e {
            ChainError::Configuration(msg) => TransferError::Configuration(msg),
            ChainError::ConfirmationTimeout { waited, .. } => TransferError::Timeout(waited),
            other => TransferError::Rejected(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_maps_to_transfer_error() {
        let e: TransferError = ChainError::Configuration("missing key".into()).into();
        assert!(matches!(e, TransferError::Configuration(_)));

        let e: TransferError = ChainError::ConfirmationTimeout {
            tx_hash: "0xabc".into(),
            waited: Duration::from_secs(5),
        }
        .into();
        assert!(matches!(e, TransferError::Timeout(d) if d == Duration::from_secs(5)));

        let e: TransferError = ChainError::Reverted("0xabc".into()).into();
        assert!(matches!(e, TransferError::Rejected(msg) if msg.contains("0xabc")));
    }
}

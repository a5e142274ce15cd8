//! On-chain transfer interface

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::error::TransferError;

/// Sends the reward and waits for on-chain confirmation
#[async_trait]
pub trait TransferService: Send + Sync {
    /// Transfer `amount` (in whole token units) to `to`
    ///
    /// Returns the transaction hash once the transfer is confirmed.
    async fn transfer(&self, to: &str, amount: Decimal) -> Result<String, TransferError>;
}

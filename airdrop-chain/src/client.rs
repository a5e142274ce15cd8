//! EVM transfer client
//!
//! Sends the reward as a locally signed raw transaction and waits for the
//! receipt. Nonces are assigned under a lock so concurrent rewards from the
//! same funding wallet never reuse one.

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use web3::ethabi::{self, Token};
use web3::signing::{Key, SecretKey, SecretKeyRef};
use web3::transports::Http;
use web3::types::{
    Address, BlockNumber, Bytes, CallRequest, TransactionParameters, H256, U256, U64,
};
use web3::Web3;

use airdrop_core::{TransferError, TransferService};

use crate::amount::{to_base_units, MAX_TOKEN_DECIMALS};
use crate::config::ChainConfig;
use crate::error::{ChainError, ChainResult};

/// `transfer(address,uint256)`
const ERC20_TRANSFER_SELECTOR: [u8; 4] = [0xa9, 0x05, 0x9c, 0xbb];

/// Funding wallet key and its derived address
struct Signer {
    key: SecretKey,
    address: Address,
}

/// Reward transfers over JSON-RPC
pub struct EvmTransferService {
    config: ChainConfig,
    web3: Option<Web3<Http>>,
    signer: Option<Signer>,
    token: Option<Address>,
    /// Next nonce this process will use, once known
    next_nonce: Mutex<Option<U256>>,
}

impl EvmTransferService {
    /// Build the service
    ///
    /// Missing endpoint or key is accepted here and reported on each transfer;
    /// values that are present but malformed are refused now.
    pub fn new(config: ChainConfig) -> ChainResult<Self> {
        if config.token_decimals > MAX_TOKEN_DECIMALS {
            return Err(ChainError::Configuration(format!(
                "AIRDROP_TOKEN_DECIMALS must be at most {}, got {}",
                MAX_TOKEN_DECIMALS, config.token_decimals
            )));
        }

        let web3 = match &config.rpc_url {
            Some(url) => {
                let transport = Http::new(url).map_err(|e| {
                    ChainError::Configuration(format!("Invalid RPC URL {}: {}", url, e))
                })?;
                Some(Web3::new(transport))
            }
            None => None,
        };

        let signer = config.signer_key.as_deref().map(parse_signer).transpose()?;

        let token = config
            .token_contract
            .as_deref()
            .map(|addr| {
                parse_address(addr).map_err(|_| {
                    ChainError::Configuration(format!("Invalid token contract {}", addr))
                })
            })
            .transpose()?;

        if let Some(signer) = &signer {
            info!(
                sender = %format!("{:#x}", signer.address),
                token = ?config.token_contract,
                "Transfer service configured"
            );
        } else {
            warn!("Transfer service has no signer key; rewards will fail until configured");
        }

        Ok(Self {
            config,
            web3,
            signer,
            token,
            next_nonce: Mutex::new(None),
        })
    }

    /// Funding wallet address, when a key is configured
    pub fn sender(&self) -> Option<Address> {
        self.signer.as_ref().map(|s| s.address)
    }

    fn ready(&self) -> ChainResult<(&Web3<Http>, &Signer)> {
        let web3 = self.web3.as_ref().ok_or_else(|| {
            ChainError::Configuration("AIRDROP_RPC_URL is not set".to_string())
        })?;
        let signer = self
            .signer
            .as_ref()
            .ok_or_else(|| ChainError::Configuration("AIRDROP_SIGNER_KEY is not set".to_string()))?;
        Ok((web3, signer))
    }

    /// Send `amount` to `to` and wait for confirmation; returns the tx hash
    pub async fn send(&self, to: &str, amount: Decimal) -> ChainResult<String> {
        let (web3, signer) = self.ready()?;
        let recipient = parse_address(to)?;
        let units = to_base_units(amount, self.config.token_decimals)?;

        let (target, value, data) = match self.token {
            Some(token) => (token, U256::zero(), erc20_transfer_data(recipient, units)),
            None => (recipient, units, Vec::new()),
        };

        let hash = self.submit(web3, signer, target, value, data).await?;
        let tx_hash = format!("{:#x}", hash);
        info!(tx_hash = %tx_hash, to, amount = %amount, "Transaction submitted");

        self.wait_for_confirmation(web3, hash).await?;
        info!(tx_hash = %tx_hash, "Transaction confirmed");
        Ok(tx_hash)
    }

    async fn submit(
        &self,
        web3: &Web3<Http>,
        signer: &Signer,
        target: Address,
        value: U256,
        data: Vec<u8>,
    ) -> ChainResult<H256> {
        let mut next_nonce = self.next_nonce.lock().await;

        let pending = web3
            .eth()
            .transaction_count(signer.address, Some(BlockNumber::Pending))
            .await?;
        let nonce = match *next_nonce {
            Some(cached) if cached > pending => cached,
            _ => pending,
        };

        let gas = match self.config.gas_limit {
            Some(limit) => U256::from(limit),
            None => {
                let request = CallRequest {
                    from: Some(signer.address),
                    to: Some(target),
                    value: Some(value),
                    data: Some(Bytes(data.clone())),
                    ..Default::default()
                };
                web3.eth().estimate_gas(request, None).await?
            }
        };

        let params = TransactionParameters {
            nonce: Some(nonce),
            to: Some(target),
            gas,
            value,
            data: Bytes(data),
            chain_id: self.config.chain_id,
            ..Default::default()
        };

        let signed = web3
            .accounts()
            .sign_transaction(params, &signer.key)
            .await
            .map_err(|e| ChainError::Signing(e.to_string()))?;
        let hash = web3
            .eth()
            .send_raw_transaction(signed.raw_transaction)
            .await?;

        *next_nonce = Some(nonce + 1);
        debug!(nonce = %nonce, gas = %gas, "Raw transaction sent");
        Ok(hash)
    }

    async fn wait_for_confirmation(&self, web3: &Web3<Http>, hash: H256) -> ChainResult<()> {
        let start = Instant::now();
        let timeout = self.config.confirm_timeout();
        let poll = self.config.poll_interval();

        loop {
            if start.elapsed() > timeout {
                return Err(ChainError::ConfirmationTimeout {
                    tx_hash: format!("{:#x}", hash),
                    waited: timeout,
                });
            }

            match web3.eth().transaction_receipt(hash).await {
                Ok(Some(receipt)) => {
                    if receipt.status == Some(U64::zero()) {
                        return Err(ChainError::Reverted(format!("{:#x}", hash)));
                    }
                    if let Some(included) = receipt.block_number {
                        if self.confirmed(web3, included).await? {
                            return Ok(());
                        }
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    // Keep polling through transient RPC errors
                    warn!(tx_hash = %format!("{:#x}", hash), error = %e, "Receipt query failed");
                }
            }

            tokio::time::sleep(poll).await;
        }
    }

    async fn confirmed(&self, web3: &Web3<Http>, included: U64) -> ChainResult<bool> {
        if self.config.confirmations <= 1 {
            return Ok(true);
        }
        let head = web3.eth().block_number().await?;
        let depth = head.as_u64().saturating_sub(included.as_u64()) + 1;
        Ok(depth >= self.config.confirmations)
    }
}

#[async_trait]
impl TransferService for EvmTransferService {
    async fn transfer(&self, to: &str, amount: Decimal) -> Result<String, TransferError> {
        self.send(to, amount).await.map_err(TransferError::from)
    }
}

fn strip_hex_prefix(s: &str) -> &str {
    let s = s.trim();
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s)
}

/// Parse a 0x-prefixed 20-byte address, any casing
pub(crate) fn parse_address(s: &str) -> ChainResult<Address> {
    let bytes =
        hex::decode(strip_hex_prefix(s)).map_err(|_| ChainError::InvalidAddress(s.to_string()))?;
    if bytes.len() != 20 {
        return Err(ChainError::InvalidAddress(s.to_string()));
    }
    Ok(Address::from_slice(&bytes))
}

fn parse_signer(s: &str) -> ChainResult<Signer> {
    let bytes = hex::decode(strip_hex_prefix(s))
        .map_err(|_| ChainError::Configuration("Signer key is not valid hex".to_string()))?;
    let key = SecretKey::from_slice(&bytes)
        .map_err(|e| ChainError::Configuration(format!("Invalid signer key: {}", e)))?;
    let address = SecretKeyRef::new(&key).address();
    Ok(Signer { key, address })
}

/// Calldata for an ERC-20 `transfer(to, amount)`
pub(crate) fn erc20_transfer_data(to: Address, amount: U256) -> Vec<u8> {
    let mut data = ERC20_TRANSFER_SELECTOR.to_vec();
    data.extend(ethabi::encode(&[Token::Address(to), Token::Uint(amount)]));
    data
}

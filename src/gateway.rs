//! Collaborator interfaces
//!
//! The engine talks to blockchains, the Kanban bridge, the wallet's
//! transaction builder and key derivation only through these traits, so
//! every protocol can be driven by in-memory fakes in tests.

use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use async_trait::async_trait;
use bigdecimal::BigDecimal;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{BridgeError, Result};
use crate::history::HistoryEntry;
use crate::session::Session;
use crate::types::{
    Balance, BroadcastResult, Chain, CoinKey, GasOptions, RedepositEntry, SourceTransaction,
    Utxo, WalletAddresses,
};

// ============================================================================
// Chain Gateway
// ============================================================================

/// Read and broadcast access to one blockchain
#[async_trait]
pub trait ChainGateway: Send + Sync {
    async fn get_balance(&self, address: &str) -> Result<Balance>;

    async fn get_utxos(&self, address: &str) -> Result<Vec<Utxo>>;

    async fn broadcast_raw(&self, tx_hex: &str) -> Result<BroadcastResult>;

    async fn get_transaction_count(&self, address: &str) -> Result<u64>;

    async fn call_contract(&self, address: &str, abi_hex: &str, sender: &str) -> Result<String>;
}

/// Chain gateways keyed by coin, falling back to the coin's host chain
#[derive(Default, Clone)]
pub struct ChainGateways {
    by_coin: HashMap<CoinKey, Arc<dyn ChainGateway>>,
    by_chain: HashMap<Chain, Arc<dyn ChainGateway>>,
}

impl ChainGateways {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_chain(mut self, chain: Chain, gateway: Arc<dyn ChainGateway>) -> Self {
        self.by_chain.insert(chain, gateway);
        self
    }

    pub fn with_coin(mut self, coin: CoinKey, gateway: Arc<dyn ChainGateway>) -> Self {
        self.by_coin.insert(coin, gateway);
        self
    }

    pub fn for_chain(&self, chain: Chain) -> Result<Arc<dyn ChainGateway>> {
        self.by_chain
            .get(&chain)
            .cloned()
            .ok_or_else(|| BridgeError::Gateway(format!("no gateway configured for {}", chain)))
    }

    pub fn for_coin(&self, coin: &CoinKey) -> Result<Arc<dyn ChainGateway>> {
        if let Some(gateway) = self.by_coin.get(coin) {
            return Ok(gateway.clone());
        }
        let chain = coin
            .host_chain()
            .ok_or_else(|| BridgeError::UnknownCoin(coin.to_string()))?;
        self.for_chain(chain)
    }

    /// Gateway that reports balances of `coin` itself
    ///
    /// A host chain gateway only knows native balances, so tokens need a
    /// gateway registered for the coin.
    pub fn balance_source(&self, coin: &CoinKey) -> Result<Arc<dyn ChainGateway>> {
        if coin.token_type.is_none() {
            return self.for_coin(coin);
        }
        self.by_coin.get(coin).cloned().ok_or_else(|| {
            BridgeError::Gateway(format!("no balance gateway configured for {}", coin))
        })
    }
}

// ============================================================================
// Bridge Gateway
// ============================================================================

/// One coin row of the bridge balance query
#[derive(Debug, Clone, PartialEq)]
pub struct WalletBalanceRow {
    /// Bridge symbol (`USDTX` for USDT on TRON)
    pub coin: String,
    pub balance: BigDecimal,
    pub lock_balance: BigDecimal,
    /// Outstanding unsettled claims; `None` when the bridge reports none
    pub deposit_err: Option<Vec<RedepositEntry>>,
    pub usd_value: Option<BigDecimal>,
}

/// The Kanban bridge service
#[async_trait]
pub trait BridgeGateway: Send + Sync {
    async fn wallet_balances(&self, addresses: &WalletAddresses) -> Result<Vec<WalletBalanceRow>>;

    /// Submit a source transaction and its claim together; returns the bridge transaction id
    async fn submit_deposit(&self, source_tx_hex: &str, bridge_tx_hex: &str) -> Result<String>;

    async fn submit_redeposit(&self, bridge_tx_hex: &str) -> Result<()>;

    async fn get_coin_pool_address(&self) -> Result<Address>;

    /// FAB address receiving gas top-ups
    async fn get_scar_address(&self) -> Result<String>;

    /// Bridge-side history for the wallet, newest first
    async fn transaction_history_events(
        &self,
        addresses: &WalletAddresses,
    ) -> Result<Vec<HistoryEntry>>;
}

// ============================================================================
// Transaction Builder and Keys
// ============================================================================

/// A native-chain transfer to build
#[derive(Debug, Clone, PartialEq)]
pub struct TransferRequest {
    pub coin: CoinKey,
    pub from: String,
    pub to: String,
    pub amount: BigDecimal,
    pub options: GasOptions,
    /// Broadcast after building; deposits build without broadcasting
    pub do_submit: bool,
}

/// Builds (and optionally broadcasts) native-chain transactions
#[async_trait]
pub trait TransactionBuilder: Send + Sync {
    async fn build(
        &self,
        request: &TransferRequest,
        key: &PrivateKeySigner,
    ) -> Result<SourceTransaction>;
}

/// Derives signing keys for an unlocked session
pub trait KeyProvider: Send + Sync {
    fn signing_key(&self, session: &Session, coin: &CoinKey, index: u32)
        -> Result<PrivateKeySigner>;

    /// Key of the wallet's Kanban ledger account
    fn bridge_key(&self, session: &Session) -> Result<PrivateKeySigner> {
        self.signing_key(session, &CoinKey::native(Chain::Kanban.as_str()), 0)
    }
}

//! Shared fakes for the protocol integration tests
//!
//! Every collaborator is an in-memory fake with just enough state to script
//! a scenario and inspect what the engine sent.

#![allow(dead_code)]

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use alloy::primitives::{Address, U256};
use alloy::signers::local::PrivateKeySigner;
use async_trait::async_trait;
use bigdecimal::BigDecimal;

use kanban_bridge::config::BridgeConfig;
use kanban_bridge::hash::{keccak256, sha256_hex};
use kanban_bridge::registry;
use kanban_bridge::verification::to_bridge_units;
use kanban_bridge::{
    Balance, BridgeContext, BridgeError, BridgeGateway, BroadcastResult, Chain, ChainGateway,
    ChainGateways, Coin, CoinKey, HistoryEntry, KeyProvider, MemoryTransactionLog,
    MemoryWalletStore, Result, Session, SourceTransaction, Status, TransactionBuilder,
    TransactionLog, TransactionRecord, TransferRequest, Utxo, Wallet, WalletAddresses,
    WalletBalanceRow,
};

pub const PIN: &str = "2468";
pub const WALLET_ID: &str = "wallet-1";
pub const COIN_KEY: &str = "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";
pub const KANBAN_KEY: &str = "0x8da4ef21b864d2cc526dbdb2a120bd2874c36c9d0a1fb7f8c63d7f7a8b41de8f";
pub const FAB_OFFICIAL: &str = "fab-official-address";
pub const ETH_OFFICIAL: &str = "0x9999999999999999999999999999999999999999";
pub const TRX_OFFICIAL: &str = "TOfficialTronAddress";

pub fn dec(s: &str) -> BigDecimal {
    BigDecimal::from_str(s).unwrap()
}

pub fn kanban_key() -> PrivateKeySigner {
    KANBAN_KEY.parse().unwrap()
}

pub fn coin_with_balance(name: &str, token_type: Option<Chain>, address: &str, balance: &str) -> Coin {
    let key = CoinKey::new(name, token_type);
    let decimals = registry::lookup(&key).map(|e| e.decimals).unwrap_or(18);
    let mut coin = Coin::new(name, token_type, decimals, address);
    coin.balance = dec(balance);
    coin
}

// ============================================================================
// Bridge
// ============================================================================

#[derive(Default)]
pub struct FakeBridge {
    pub rows: Mutex<Option<Vec<WalletBalanceRow>>>,
    pub deposit_response: Mutex<Option<std::result::Result<String, String>>>,
    pub redeposit_error: Mutex<Option<String>>,
    pub deposits: Mutex<Vec<(String, String)>>,
    pub redeposits: Mutex<Vec<String>>,
    pub balance_queries: Mutex<Vec<WalletAddresses>>,
    pub history: Mutex<Vec<HistoryEntry>>,
    pub coin_pool: Address,
}

impl FakeBridge {
    pub fn new() -> Self {
        Self {
            coin_pool: Address::repeat_byte(0xc0),
            ..Default::default()
        }
    }

    pub fn set_rows(&self, rows: Vec<WalletBalanceRow>) {
        *self.rows.lock().unwrap() = Some(rows);
    }

    pub fn accept_deposits(&self, id: &str) {
        *self.deposit_response.lock().unwrap() = Some(Ok(id.to_string()));
    }

    pub fn reject_deposits(&self, message: &str) {
        *self.deposit_response.lock().unwrap() = Some(Err(message.to_string()));
    }
}

#[async_trait]
impl BridgeGateway for FakeBridge {
    async fn wallet_balances(&self, addresses: &WalletAddresses) -> Result<Vec<WalletBalanceRow>> {
        self.balance_queries.lock().unwrap().push(addresses.clone());
        self.rows
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| BridgeError::Gateway("walletBalances unavailable".to_string()))
    }

    async fn submit_deposit(&self, source_tx_hex: &str, bridge_tx_hex: &str) -> Result<String> {
        self.deposits
            .lock()
            .unwrap()
            .push((source_tx_hex.to_string(), bridge_tx_hex.to_string()));
        match self.deposit_response.lock().unwrap().clone() {
            Some(Ok(id)) => Ok(id),
            Some(Err(message)) => Err(BridgeError::Gateway(message)),
            None => Ok("kanban-deposit-1".to_string()),
        }
    }

    async fn submit_redeposit(&self, bridge_tx_hex: &str) -> Result<()> {
        self.redeposits
            .lock()
            .unwrap()
            .push(bridge_tx_hex.to_string());
        match self.redeposit_error.lock().unwrap().clone() {
            Some(message) => Err(BridgeError::Gateway(message)),
            None => Ok(()),
        }
    }

    async fn get_coin_pool_address(&self) -> Result<Address> {
        Ok(self.coin_pool)
    }

    async fn get_scar_address(&self) -> Result<String> {
        Ok("fab-scar-address".to_string())
    }

    async fn transaction_history_events(
        &self,
        _addresses: &WalletAddresses,
    ) -> Result<Vec<HistoryEntry>> {
        Ok(self.history.lock().unwrap().clone())
    }
}

// ============================================================================
// Chains
// ============================================================================

#[derive(Default)]
pub struct FakeChain {
    pub balances: Mutex<HashMap<String, Balance>>,
    pub transaction_count: AtomicU64,
    pub fail_balances: bool,
}

impl FakeChain {
    pub fn with_balance(address: &str, balance: &str) -> Self {
        let chain = Self::default();
        chain.balances.lock().unwrap().insert(
            address.to_string(),
            Balance {
                balance: dec(balance),
                locked_balance: BigDecimal::from(0),
            },
        );
        chain
    }

    pub fn failing() -> Self {
        Self {
            fail_balances: true,
            ..Default::default()
        }
    }
}

#[async_trait]
impl ChainGateway for FakeChain {
    async fn get_balance(&self, address: &str) -> Result<Balance> {
        if self.fail_balances {
            return Err(BridgeError::Gateway("chain unavailable".to_string()));
        }
        self.balances
            .lock()
            .unwrap()
            .get(address)
            .cloned()
            .ok_or_else(|| BridgeError::Gateway(format!("unknown address {}", address)))
    }

    async fn get_utxos(&self, _address: &str) -> Result<Vec<Utxo>> {
        Ok(vec![])
    }

    async fn broadcast_raw(&self, tx_hex: &str) -> Result<BroadcastResult> {
        Ok(BroadcastResult {
            tx_hash: format!("0x{}", hex::encode(keccak256(tx_hex.as_bytes()))),
            err_msg: String::new(),
        })
    }

    async fn get_transaction_count(&self, _address: &str) -> Result<u64> {
        Ok(self.transaction_count.load(Ordering::SeqCst))
    }

    async fn call_contract(&self, _a: &str, _b: &str, _c: &str) -> Result<String> {
        Ok("0x".to_string())
    }
}

// ============================================================================
// Transaction builder and keys
// ============================================================================

#[derive(Default)]
pub struct FakeBuilder {
    pub requests: Mutex<Vec<TransferRequest>>,
    /// Replaces the amount the built transaction carries, in native units
    pub amount_override: Mutex<Option<U256>>,
    counter: AtomicU64,
}

#[async_trait]
impl TransactionBuilder for FakeBuilder {
    async fn build(
        &self,
        request: &TransferRequest,
        _key: &PrivateKeySigner,
    ) -> Result<SourceTransaction> {
        self.requests.lock().unwrap().push(request.clone());

        let decimals = registry::lookup(&request.coin)
            .map(|e| e.decimals)
            .unwrap_or(18);
        let native = match *self.amount_override.lock().unwrap() {
            Some(amount) => amount,
            None => {
                to_bridge_units(&request.amount)?
                    / U256::from(10u64).pow(U256::from(18 - decimals))
            }
        };

        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        let tx_hex = format!("02{:08x}{}", n, hex::encode(request.to.as_bytes()));
        Ok(SourceTransaction {
            tx_hash: format!("0x{}", hex::encode(keccak256(tx_hex.as_bytes()))),
            tx_hex,
            amount_in_tx: native,
            amount_decimals: decimals,
            txids: vec![format!("utxo-{}", n)],
            err_msg: None,
        })
    }
}

/// Transaction log whose writes always fail
pub struct FailingLog;

#[async_trait]
impl TransactionLog for FailingLog {
    async fn append(&self, _record: TransactionRecord) -> Result<()> {
        Err(BridgeError::Store("disk full".to_string()))
    }

    async fn list(&self, _wallet_id: &str) -> Result<Vec<TransactionRecord>> {
        Ok(vec![])
    }

    async fn update_status(
        &self,
        _wallet_id: &str,
        _source_tx_id: &str,
        _status: Status,
    ) -> Result<TransactionRecord> {
        Err(BridgeError::Store("disk full".to_string()))
    }
}

pub struct FixedKeys;

impl KeyProvider for FixedKeys {
    fn signing_key(&self, _session: &Session, coin: &CoinKey, _index: u32) -> Result<PrivateKeySigner> {
        let hex = if coin.name == Chain::Kanban.as_str() {
            KANBAN_KEY
        } else {
            COIN_KEY
        };
        hex.parse()
            .map_err(|e: alloy::signers::local::LocalSignerError| BridgeError::Signing(e.to_string()))
    }
}

// ============================================================================
// Harness
// ============================================================================

pub struct Harness {
    pub ctx: BridgeContext,
    pub bridge: Arc<FakeBridge>,
    pub ledger: Arc<FakeChain>,
    pub builder: Arc<FakeBuilder>,
    pub wallets: Arc<MemoryWalletStore>,
    pub log: Arc<MemoryTransactionLog>,
    pub session: Session,
}

pub fn config() -> BridgeConfig {
    BridgeConfig::from_vars(
        [
            ("KANBAN_ENDPOINT", "https://kanban.example/"),
            ("KANBAN_CHAIN_ID", "212"),
            ("OFFICIAL_ADDRESS_FAB", FAB_OFFICIAL),
            ("OFFICIAL_ADDRESS_ETH", ETH_OFFICIAL),
            ("OFFICIAL_ADDRESS_USDTX", TRX_OFFICIAL),
            ("DEPOSIT_DISABLED", "DOGE"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string())),
    )
    .unwrap()
}

pub fn wallet(coins: Vec<Coin>) -> Wallet {
    Wallet {
        id: WALLET_ID.to_string(),
        pwd_hash: sha256_hex(PIN),
        bridge_address: kanban_key().address(),
        coins,
    }
}

pub async fn harness(coins: Vec<Coin>, chains: ChainGateways) -> Harness {
    let bridge = Arc::new(FakeBridge::new());
    let ledger = Arc::new(FakeChain::default());
    let builder = Arc::new(FakeBuilder::default());
    let wallets = Arc::new(MemoryWalletStore::new());
    let log = Arc::new(MemoryTransactionLog::new());

    let wallet = wallet(coins);
    let session = Session::unlock(&wallet, PIN).unwrap();
    wallets.insert(wallet).await;

    let ctx = BridgeContext::new(
        config(),
        bridge.clone(),
        ledger.clone(),
        chains,
        builder.clone(),
        Arc::new(FixedKeys),
        wallets.clone(),
        log.clone(),
    );

    Harness {
        ctx,
        bridge,
        ledger,
        builder,
        wallets,
        log,
        session,
    }
}

/// Install a tracing subscriber honoring `RUST_LOG`, once per test binary
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

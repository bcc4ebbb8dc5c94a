//! Wallet and transaction-log persistence
//!
//! Persistence mechanics belong to the host application; the engine only
//! needs to read a wallet, replace its coin list, and append to a
//! wallet-scoped transaction log. In-memory implementations are provided.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{BridgeError, Result};
use crate::types::{Coin, Status, TransactionRecord, Wallet};

#[async_trait]
pub trait WalletStore: Send + Sync {
    async fn load(&self, wallet_id: &str) -> Result<Wallet>;

    async fn replace_coins(&self, wallet_id: &str, coins: Vec<Coin>) -> Result<()>;
}

/// Append-only, wallet-scoped record log
#[async_trait]
pub trait TransactionLog: Send + Sync {
    async fn append(&self, record: TransactionRecord) -> Result<()>;

    /// Records of one wallet in append order
    async fn list(&self, wallet_id: &str) -> Result<Vec<TransactionRecord>>;

    /// Move the record for `source_tx_id` out of `Pending`
    async fn update_status(
        &self,
        wallet_id: &str,
        source_tx_id: &str,
        status: Status,
    ) -> Result<TransactionRecord>;
}

// ============================================================================
// In-memory implementations
// ============================================================================

#[derive(Default)]
pub struct MemoryWalletStore {
    wallets: RwLock<HashMap<String, Wallet>>,
}

impl MemoryWalletStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, wallet: Wallet) {
        self.wallets.write().await.insert(wallet.id.clone(), wallet);
    }
}

#[async_trait]
impl WalletStore for MemoryWalletStore {
    async fn load(&self, wallet_id: &str) -> Result<Wallet> {
        self.wallets
            .read()
            .await
            .get(wallet_id)
            .cloned()
            .ok_or_else(|| BridgeError::Store(format!("wallet {} not found", wallet_id)))
    }

    async fn replace_coins(&self, wallet_id: &str, coins: Vec<Coin>) -> Result<()> {
        let mut wallets = self.wallets.write().await;
        let wallet = wallets
            .get_mut(wallet_id)
            .ok_or_else(|| BridgeError::Store(format!("wallet {} not found", wallet_id)))?;
        debug!(wallet_id, coins = coins.len(), "Persisting coin list");
        wallet.coins = coins;
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryTransactionLog {
    records: RwLock<Vec<TransactionRecord>>,
}

impl MemoryTransactionLog {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TransactionLog for MemoryTransactionLog {
    async fn append(&self, record: TransactionRecord) -> Result<()> {
        self.records.write().await.push(record);
        Ok(())
    }

    async fn list(&self, wallet_id: &str) -> Result<Vec<TransactionRecord>> {
        Ok(self
            .records
            .read()
            .await
            .iter()
            .filter(|r| r.wallet_id == wallet_id)
            .cloned()
            .collect())
    }

    async fn update_status(
        &self,
        wallet_id: &str,
        source_tx_id: &str,
        status: Status,
    ) -> Result<TransactionRecord> {
        let mut records = self.records.write().await;
        let record = records
            .iter_mut()
            .rev()
            .find(|r| r.wallet_id == wallet_id && r.source_tx_id == source_tx_id)
            .ok_or_else(|| {
                BridgeError::Store(format!("no record for transaction {}", source_tx_id))
            })?;
        record.transition(status)?;
        Ok(record.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CoinKey, TransactionKind};
    use alloy::primitives::Address;
    use bigdecimal::BigDecimal;

    fn record(wallet_id: &str, tx: &str) -> TransactionRecord {
        TransactionRecord::pending(
            wallet_id,
            TransactionKind::Send,
            &CoinKey::native("BTC"),
            BigDecimal::from(1),
            tx,
            None,
            "1dest",
            "",
        )
    }

    #[tokio::test]
    async fn test_log_is_wallet_scoped() {
        let log = MemoryTransactionLog::new();
        log.append(record("a", "tx1")).await.unwrap();
        log.append(record("b", "tx2")).await.unwrap();
        log.append(record("a", "tx3")).await.unwrap();

        let a = log.list("a").await.unwrap();
        assert_eq!(a.len(), 2);
        assert_eq!(a[0].source_tx_id, "tx1");
        assert_eq!(a[1].source_tx_id, "tx3");
    }

    #[tokio::test]
    async fn test_update_status_is_monotonic() {
        let log = MemoryTransactionLog::new();
        log.append(record("a", "tx1")).await.unwrap();

        let updated = log.update_status("a", "tx1", Status::Failed).await.unwrap();
        assert_eq!(updated.status(), Status::Failed);

        let err = log
            .update_status("a", "tx1", Status::Confirmed)
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::InvalidStatusTransition { .. }));
        assert!(log.update_status("a", "missing", Status::Failed).await.is_err());
    }

    #[tokio::test]
    async fn test_wallet_store_replace_coins() {
        let store = MemoryWalletStore::new();
        store
            .insert(Wallet {
                id: "w".into(),
                pwd_hash: String::new(),
                bridge_address: Address::ZERO,
                coins: vec![],
            })
            .await;

        store
            .replace_coins("w", vec![Coin::new("BTC", None, 8, "1abc")])
            .await
            .unwrap();
        assert_eq!(store.load("w").await.unwrap().coins.len(), 1);
        assert!(store.load("x").await.is_err());
    }

    #[test]
    fn test_missing_wallet_blocking() {
        let store = MemoryWalletStore::new();
        let err = tokio_test::block_on(store.load("nobody")).unwrap_err();
        assert!(matches!(err, BridgeError::Store(_)));
    }
}

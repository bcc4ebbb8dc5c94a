//! Transaction history merger
//!
//! The wallet shows one time-descending list built from two sources: the
//! local transaction log and history events derived by the bridge. Both are
//! already sorted newest first, so they are merged in a single pass.

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;
use crate::gateway::BridgeGateway;
use crate::registry;
use crate::store::TransactionLog;
use crate::types::{Chain, TransactionRecord, WalletAddresses};

/// One per-chain leg of a history entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainTransaction {
    pub chain: String,
    pub status: String,
    #[serde(default)]
    pub timestamp: Option<i64>,
    pub transaction_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub action: String,
    pub coin: String,
    #[serde(default)]
    pub token_type: Option<Chain>,
    pub quantity: BigDecimal,
    #[serde(default)]
    pub to: String,
    /// Unix seconds
    pub timestamp: i64,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub transactions: Vec<ChainTransaction>,
}

impl HistoryEntry {
    pub fn display_coin(&self) -> String {
        registry::display_name(&self.coin, self.token_type)
    }
}

impl From<&TransactionRecord> for HistoryEntry {
    fn from(record: &TransactionRecord) -> Self {
        let chain = record
            .token_type
            .map(|c| c.as_str().to_string())
            .unwrap_or_else(|| record.coin.clone());
        Self {
            action: record.kind.to_string(),
            coin: record.coin.clone(),
            token_type: record.token_type,
            quantity: record.amount.clone(),
            to: record.destination.clone(),
            timestamp: record.timestamp.timestamp(),
            comment: record.comment.clone(),
            transactions: vec![ChainTransaction {
                chain,
                status: record.status().to_string(),
                timestamp: None,
                transaction_id: record.source_tx_id.clone(),
            }],
        }
    }
}

/// Newest-first history entries for one wallet from its append-ordered log
pub fn records_to_history(records: &[TransactionRecord], wallet_id: &str) -> Vec<HistoryEntry> {
    records
        .iter()
        .rev()
        .filter(|r| r.wallet_id == wallet_id)
        .map(HistoryEntry::from)
        .collect()
}

/// Merge two time-descending lists into one
///
/// The larger timestamp goes first; on a tie the fresh entry goes first.
pub fn merge_history(persisted: Vec<HistoryEntry>, fresh: Vec<HistoryEntry>) -> Vec<HistoryEntry> {
    let mut merged = Vec::with_capacity(persisted.len() + fresh.len());
    let mut persisted = persisted.into_iter().peekable();
    let mut fresh = fresh.into_iter().peekable();

    loop {
        let take_persisted = match (persisted.peek(), fresh.peek()) {
            (Some(p), Some(f)) => p.timestamp > f.timestamp,
            (Some(_), None) => true,
            (None, Some(_)) => false,
            (None, None) => break,
        };
        let next = if take_persisted {
            persisted.next()
        } else {
            fresh.next()
        };
        merged.extend(next);
    }
    merged
}

/// Build the wallet's combined history
///
/// A failing bridge query leaves the local log as the whole history.
pub async fn load_history(
    bridge: &dyn BridgeGateway,
    log: &dyn TransactionLog,
    wallet_id: &str,
    addresses: &WalletAddresses,
) -> Result<Vec<HistoryEntry>> {
    let persisted = records_to_history(&log.list(wallet_id).await?, wallet_id);
    let fresh = match bridge.transaction_history_events(addresses).await {
        Ok(events) => events,
        Err(e) => {
            warn!(wallet_id, error = %e, "Bridge history unavailable, using local log");
            Vec::new()
        }
    };
    debug!(
        wallet_id,
        persisted = persisted.len(),
        fresh = fresh.len(),
        "Merging transaction history"
    );
    Ok(merge_history(persisted, fresh))
}

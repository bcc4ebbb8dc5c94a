//! Kanban Bridge: wallet-side engine for moving value onto the Kanban ledger
//!
//! This crate covers the bridging and balance-reconciliation core of a
//! multi-chain wallet:
//!
//! - **Registry** - Coin type ids, alias listings and host-chain prefixes
//! - **Balances** - Bridge-first balance refresh with per-chain fallback
//! - **Claims** - Claim message layout, per-chain message signing, coin pool ABI
//! - **Deposits** - Amount-verified, nonce-serialized deposit submission
//! - **Redeposits** - Replay of captured claims the bridge failed to register
//! - **History** - Merge of the local transaction log with bridge events
//!
//! External systems (chain APIs, the bridge service, the wallet's transaction
//! builder, key derivation and persistence) are reached through the traits in
//! [`gateway`] and [`store`]. [`kanban::KanbanClient`] implements the bridge
//! side over HTTP.

pub mod balance;
pub mod config;
pub mod context;
pub mod contracts;
pub mod deposit;
pub mod error;
pub mod gateway;
pub mod hash;
pub mod history;
pub mod kanban;
pub mod message;
pub mod nonce;
pub mod redact;
pub mod redeposit;
pub mod registry;
pub mod session;
pub mod signer;
pub mod store;
pub mod transfer;
pub mod types;
pub mod verification;

pub use balance::{refresh_balances, BalanceRefresh};
pub use config::BridgeConfig;
pub use context::BridgeContext;
pub use deposit::{deposit, DepositReceipt, DepositRequest, DepositState};
pub use error::{BridgeError, Result};
pub use gateway::{
    BridgeGateway, ChainGateway, ChainGateways, KeyProvider, TransactionBuilder, TransferRequest,
    WalletBalanceRow,
};
pub use history::{load_history, merge_history, HistoryEntry};
pub use kanban::KanbanClient;
pub use message::BridgeMessage;
pub use nonce::{NonceManager, SubmissionLocks};
pub use redeposit::{redeposit, RedepositPlan, RedepositReceipt, RedepositRequest};
pub use registry::CoinTypePrefix;
pub use session::Session;
pub use store::{MemoryTransactionLog, MemoryWalletStore, TransactionLog, WalletStore};
pub use transfer::{add_gas, send, SendRequest};
pub use types::{
    Balance, BroadcastResult, Chain, Coin, CoinKey, GasOptions, RedepositEntry, Signature,
    SourceTransaction, Status, TransactionKind, TransactionRecord, Utxo, Wallet, WalletAddresses,
};

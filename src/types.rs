//! Common types for wallet-side bridge operations
//!
//! Chains, coins, redeposit claims and transaction records shared by the
//! balance aggregator and the deposit/redeposit protocols.

use alloy::primitives::{Address, B256, U256};
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{BridgeError, Result};

// ============================================================================
// Chains
// ============================================================================

/// A blockchain the wallet holds value on, plus the Kanban ledger itself
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Chain {
    Btc,
    Fab,
    Eth,
    Bch,
    Ltc,
    Doge,
    Trx,
    Kanban,
}

impl Chain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Chain::Btc => "BTC",
            Chain::Fab => "FAB",
            Chain::Eth => "ETH",
            Chain::Bch => "BCH",
            Chain::Ltc => "LTC",
            Chain::Doge => "DOGE",
            Chain::Trx => "TRX",
            Chain::Kanban => "KANBAN",
        }
    }

    /// Chains whose primary receive address keys the bridge balance query
    pub fn external() -> [Chain; 7] {
        [
            Chain::Btc,
            Chain::Fab,
            Chain::Eth,
            Chain::Bch,
            Chain::Ltc,
            Chain::Doge,
            Chain::Trx,
        ]
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Chain {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "BTC" => Ok(Chain::Btc),
            "FAB" => Ok(Chain::Fab),
            "ETH" => Ok(Chain::Eth),
            "BCH" => Ok(Chain::Bch),
            "LTC" => Ok(Chain::Ltc),
            "DOGE" => Ok(Chain::Doge),
            "TRX" => Ok(Chain::Trx),
            "KANBAN" => Ok(Chain::Kanban),
            other => Err(BridgeError::UnknownCoin(format!("unknown chain {}", other))),
        }
    }
}

// ============================================================================
// Coin identity
// ============================================================================

/// The `(name, token_type)` pair identifying a coin inside a wallet
///
/// `token_type` is the host chain for tokens and `None` for native coins.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CoinKey {
    pub name: String,
    pub token_type: Option<Chain>,
}

impl CoinKey {
    /// Create a key, folding `(FAB, FAB)` into native FAB
    pub fn new(name: &str, token_type: Option<Chain>) -> Self {
        let token_type = match token_type {
            Some(Chain::Fab) if name == "FAB" => None,
            other => other,
        };
        Self {
            name: name.to_string(),
            token_type,
        }
    }

    pub fn native(name: &str) -> Self {
        Self::new(name, None)
    }

    pub fn token(name: &str, host: Chain) -> Self {
        Self::new(name, Some(host))
    }

    /// The chain a transaction for this coin is built on
    pub fn host_chain(&self) -> Option<Chain> {
        match self.token_type {
            Some(chain) => Some(chain),
            None => self.name.parse().ok(),
        }
    }
}

impl fmt::Display for CoinKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.token_type {
            Some(chain) => write!(f, "{}({})", self.name, chain),
            None => write!(f, "{}", self.name),
        }
    }
}

// ============================================================================
// Signatures and redeposit claims
// ============================================================================

/// Recoverable secp256k1 signature in the layout the bridge contract expects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub r: B256,
    pub s: B256,
    pub v: u8,
}

impl Signature {
    /// Build from the 65-byte `r || s || v` form
    pub fn from_rsv(bytes: &[u8; 65]) -> Self {
        Self {
            r: B256::from_slice(&bytes[..32]),
            s: B256::from_slice(&bytes[32..64]),
            v: bytes[64],
        }
    }

    /// Parse hex-encoded components as reported by the bridge (`0x` optional)
    pub fn from_hex_parts(r: &str, s: &str, v: &str) -> Result<Self> {
        let r = parse_b256(r)?;
        let s = parse_b256(s)?;
        let v_hex = v.strip_prefix("0x").unwrap_or(v);
        let v = if v.starts_with("0x") {
            u8::from_str_radix(v_hex, 16)
        } else {
            v_hex.parse::<u8>()
        }
        .map_err(|e| BridgeError::InvalidInput(format!("invalid signature v {}: {}", v, e)))?;
        Ok(Self { r, s, v })
    }
}

/// A captured bridge claim that the bridge saw but never registered
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedepositEntry {
    pub coin_type_id: u32,
    /// Claim amount in 18-decimal bridge base units
    pub amount: U256,
    pub source_transaction_id: String,
    pub signature: Signature,
}

// ============================================================================
// Coins and wallets
// ============================================================================

/// A held asset instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coin {
    pub name: String,
    pub token_type: Option<Chain>,
    pub decimals: u8,
    pub balance: BigDecimal,
    pub locked_balance: BigDecimal,
    /// Ordered; index 0 is the primary receive address
    pub receive_addresses: Vec<String>,
    #[serde(default)]
    pub pending_redeposits: Vec<RedepositEntry>,
    pub usd_price: Option<BigDecimal>,
    /// Added by the user and not yet recognized by the bridge
    #[serde(default)]
    pub new: bool,
}

impl Coin {
    pub fn new(name: &str, token_type: Option<Chain>, decimals: u8, address: &str) -> Self {
        let key = CoinKey::new(name, token_type);
        Self {
            name: key.name,
            token_type: key.token_type,
            decimals,
            balance: BigDecimal::from(0),
            locked_balance: BigDecimal::from(0),
            receive_addresses: vec![address.to_string()],
            pending_redeposits: Vec::new(),
            usd_price: None,
            new: false,
        }
    }

    pub fn key(&self) -> CoinKey {
        CoinKey::new(&self.name, self.token_type)
    }

    pub fn primary_address(&self) -> Option<&str> {
        self.receive_addresses.first().map(String::as_str)
    }
}

/// The wallet aggregate: owns its coin set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wallet {
    pub id: String,
    /// Hex SHA-256 of the spending PIN
    pub pwd_hash: String,
    /// The wallet's identity on the Kanban ledger
    pub bridge_address: Address,
    pub coins: Vec<Coin>,
}

impl Wallet {
    pub fn coin(&self, key: &CoinKey) -> Option<&Coin> {
        self.coins.iter().find(|c| &c.key() == key)
    }

    pub fn coin_mut(&mut self, key: &CoinKey) -> Option<&mut Coin> {
        self.coins.iter_mut().find(|c| &c.key() == key)
    }

    /// Primary receive addresses of the native coins, one per chain
    pub fn addresses(&self) -> WalletAddresses {
        let mut addresses = WalletAddresses::default();
        for chain in Chain::external() {
            let primary = self
                .coins
                .iter()
                .filter(|c| c.token_type.is_none() && c.name == chain.as_str())
                .find_map(|c| c.primary_address());
            if let Some(address) = primary {
                addresses.set(chain, address);
            }
        }
        addresses
    }
}

/// Primary receive addresses keyed the way the bridge balance query expects
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletAddresses {
    pub btc_address: String,
    pub eth_address: String,
    pub fab_address: String,
    pub bch_address: String,
    pub doge_address: String,
    pub ltc_address: String,
    pub trx_address: String,
    pub timestamp: i64,
}

impl WalletAddresses {
    pub fn set(&mut self, chain: Chain, address: &str) {
        let slot = match chain {
            Chain::Btc => &mut self.btc_address,
            Chain::Eth => &mut self.eth_address,
            Chain::Fab => &mut self.fab_address,
            Chain::Bch => &mut self.bch_address,
            Chain::Doge => &mut self.doge_address,
            Chain::Ltc => &mut self.ltc_address,
            Chain::Trx => &mut self.trx_address,
            Chain::Kanban => return,
        };
        *slot = address.to_string();
    }
}

// ============================================================================
// Gateway data shapes
// ============================================================================

/// Spendable and locked balance of one address
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Balance {
    pub balance: BigDecimal,
    pub locked_balance: BigDecimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utxo {
    pub txid: String,
    pub idx: u32,
    pub value: u64,
}

/// Result of broadcasting a raw transaction
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastResult {
    pub tx_hash: String,
    pub err_msg: String,
}

/// Fee parameters for building a transaction
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GasOptions {
    pub gas_price: Option<u128>,
    pub gas_limit: Option<u64>,
    pub satoshis_per_byte: Option<u64>,
}

/// A native-chain transaction produced by the wallet's transaction builder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceTransaction {
    pub tx_hex: String,
    pub tx_hash: String,
    /// Amount actually carried by the transaction, in `amount_decimals` units
    pub amount_in_tx: U256,
    pub amount_decimals: u8,
    /// Spent outputs, for UTXO chains
    #[serde(default)]
    pub txids: Vec<String>,
    #[serde(default)]
    pub err_msg: Option<String>,
}

// ============================================================================
// Transaction records
// ============================================================================

/// Lifecycle of a bridge-facing attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Pending,
    Confirmed,
    Failed,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pending => "pending",
            Status::Confirmed => "confirmed",
            Status::Failed => "failed",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionKind {
    Deposit,
    Redeposit,
    Send,
    AddGas,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Deposit => "Deposit",
            TransactionKind::Redeposit => "Redeposit",
            TransactionKind::Send => "Send",
            TransactionKind::AddGas => "Add Gas",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One bridge-facing attempt, appended to the wallet's transaction log
///
/// Only `status` changes after creation, and only away from `Pending`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub wallet_id: String,
    pub kind: TransactionKind,
    pub coin: String,
    pub token_type: Option<Chain>,
    pub amount: BigDecimal,
    pub source_tx_id: String,
    /// Claim id returned by the bridge, when there is one
    pub bridge_tx_id: Option<String>,
    pub destination: String,
    pub timestamp: DateTime<Utc>,
    status: Status,
    pub comment: String,
}

impl TransactionRecord {
    #[allow(clippy::too_many_arguments)]
    pub fn pending(
        wallet_id: &str,
        kind: TransactionKind,
        coin: &CoinKey,
        amount: BigDecimal,
        source_tx_id: &str,
        bridge_tx_id: Option<String>,
        destination: &str,
        comment: &str,
    ) -> Self {
        Self {
            wallet_id: wallet_id.to_string(),
            kind,
            coin: coin.name.clone(),
            token_type: coin.token_type,
            amount,
            source_tx_id: source_tx_id.to_string(),
            bridge_tx_id,
            destination: destination.to_string(),
            timestamp: Utc::now(),
            status: Status::Pending,
            comment: comment.to_string(),
        }
    }

    pub fn status(&self) -> Status {
        self.status
    }

    /// Move out of `Pending`; every other transition is rejected
    pub fn transition(&mut self, to: Status) -> Result<()> {
        match (self.status, to) {
            (Status::Pending, Status::Confirmed) | (Status::Pending, Status::Failed) => {
                self.status = to;
                Ok(())
            }
            (from, to) => Err(BridgeError::InvalidStatusTransition { from, to }),
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Remove a leading `0x`, if any
pub fn strip_hex_prefix(value: &str) -> &str {
    value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value)
}

/// Parse a 32-byte hex value (`0x` optional)
pub fn parse_b256(value: &str) -> Result<B256> {
    let raw = strip_hex_prefix(value);
    let bytes = hex::decode(raw)
        .map_err(|e| BridgeError::InvalidInput(format!("invalid hex {}: {}", value, e)))?;
    if bytes.len() != 32 {
        return Err(BridgeError::InvalidInput(format!(
            "expected 32 bytes, got {} in {}",
            bytes.len(),
            value
        )));
    }
    Ok(B256::from_slice(&bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coin_key_folds_fab_on_fab() {
        let key = CoinKey::new("FAB", Some(Chain::Fab));
        assert_eq!(key, CoinKey::native("FAB"));
        assert_eq!(key.host_chain(), Some(Chain::Fab));
    }

    #[test]
    fn test_coin_key_host_chain() {
        assert_eq!(CoinKey::token("USDT", Chain::Trx).host_chain(), Some(Chain::Trx));
        assert_eq!(CoinKey::native("BTC").host_chain(), Some(Chain::Btc));
        assert_eq!(CoinKey::native("NOPE").host_chain(), None);
    }

    #[test]
    fn test_coin_key_display() {
        assert_eq!(CoinKey::token("FAB", Chain::Eth).to_string(), "FAB(ETH)");
        assert_eq!(CoinKey::native("BTC").to_string(), "BTC");
    }

    #[test]
    fn test_chain_from_str() {
        assert_eq!("doge".parse::<Chain>().unwrap(), Chain::Doge);
        assert!("XRP".parse::<Chain>().is_err());
    }

    #[test]
    fn test_wallet_addresses_use_native_coins_only() {
        let wallet = Wallet {
            id: "w1".into(),
            pwd_hash: String::new(),
            bridge_address: Address::ZERO,
            coins: vec![
                Coin::new("EXG", Some(Chain::Fab), 18, "fab-token-address"),
                Coin::new("FAB", None, 8, "fab-address"),
                Coin::new("USDT", Some(Chain::Trx), 6, "trx-token-address"),
                Coin::new("TRX", None, 6, "trx-address"),
            ],
        };

        let addresses = wallet.addresses();
        assert_eq!(addresses.fab_address, "fab-address");
        assert_eq!(addresses.trx_address, "trx-address");
        assert_eq!(addresses.btc_address, "");
    }

    #[test]
    fn test_wallet_addresses_serialize_camel_case() {
        let mut addresses = WalletAddresses::default();
        addresses.set(Chain::Btc, "1abc");
        let json = serde_json::to_value(&addresses).unwrap();
        assert_eq!(json["btcAddress"], "1abc");
        assert_eq!(json["timestamp"], 0);
    }

    #[test]
    fn test_record_status_transitions() {
        let mut record = TransactionRecord::pending(
            "w1",
            TransactionKind::Deposit,
            &CoinKey::native("FAB"),
            BigDecimal::from(5),
            "0xabc",
            None,
            "official",
            "",
        );
        assert_eq!(record.status(), Status::Pending);
        record.transition(Status::Confirmed).unwrap();
        assert_eq!(record.status(), Status::Confirmed);

        let err = record.transition(Status::Failed).unwrap_err();
        assert!(matches!(
            err,
            BridgeError::InvalidStatusTransition {
                from: Status::Confirmed,
                to: Status::Failed
            }
        ));
    }

    #[test]
    fn test_signature_from_hex_parts() {
        let r = format!("0x{}", "11".repeat(32));
        let s = "22".repeat(32);
        let sig = Signature::from_hex_parts(&r, &s, "0x1c").unwrap();
        assert_eq!(sig.v, 28);
        assert_eq!(sig.r, B256::repeat_byte(0x11));
        assert_eq!(sig.s, B256::repeat_byte(0x22));

        let sig = Signature::from_hex_parts(&r, &s, "27").unwrap();
        assert_eq!(sig.v, 27);
    }

    #[test]
    fn test_parse_b256_rejects_short_values() {
        assert!(parse_b256("0xdead").is_err());
        assert!(parse_b256(&"ab".repeat(32)).is_ok());
    }
}

//! Coin identity registry
//!
//! The bridge numbers every supported coin with a `coin_type_id`. Tokens that
//! exist on more than one host chain get a separate alias listing (`USDTX`
//! is USDT on TRON, `FABE` is FAB on Ethereum, ...). This module maps ids,
//! bridge symbols and wallet `(name, token_type)` pairs onto each other.
//!
//! The table is closed: anything not listed is an [`BridgeError::UnknownCoin`].

use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, Result};
use crate::types::{Chain, CoinKey};

/// One listing in the bridge coin table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoinEntry {
    pub id: u32,
    /// Symbol the bridge reports for this listing
    pub symbol: &'static str,
    /// Wallet-side coin name
    pub name: &'static str,
    pub token_type: Option<Chain>,
    /// Native decimals on the host chain
    pub decimals: u8,
}

impl CoinEntry {
    pub fn key(&self) -> CoinKey {
        CoinKey::new(self.name, self.token_type)
    }

    /// True for alias listings such as `USDTX`
    pub fn is_alias(&self) -> bool {
        self.symbol != self.name
    }
}

const fn entry(
    id: u32,
    symbol: &'static str,
    name: &'static str,
    token_type: Option<Chain>,
    decimals: u8,
) -> CoinEntry {
    CoinEntry {
        id,
        symbol,
        name,
        token_type,
        decimals,
    }
}

/// Every coin the bridge accepts
pub static COINS: &[CoinEntry] = &[
    entry(1, "BTC", "BTC", None, 8),
    entry(2, "FAB", "FAB", None, 8),
    entry(3, "ETH", "ETH", None, 18),
    entry(4, "EXG", "EXG", Some(Chain::Fab), 18),
    entry(5, "USDT", "USDT", Some(Chain::Eth), 6),
    entry(6, "DUSD", "DUSD", Some(Chain::Fab), 18),
    entry(7, "BCH", "BCH", None, 8),
    entry(8, "LTC", "LTC", None, 8),
    entry(9, "DOGE", "DOGE", None, 8),
    entry(10, "TRX", "TRX", None, 6),
    entry(11, "DSC", "DSC", Some(Chain::Fab), 18),
    entry(12, "BST", "BST", Some(Chain::Fab), 18),
    entry(13, "USDTX", "USDT", Some(Chain::Trx), 6),
    entry(14, "FABE", "FAB", Some(Chain::Eth), 8),
    entry(15, "EXGE", "EXG", Some(Chain::Eth), 18),
    entry(16, "DSCE", "DSC", Some(Chain::Eth), 18),
    entry(17, "BSTE", "BST", Some(Chain::Eth), 18),
];

// ============================================================================
// Lookups
// ============================================================================

fn by_id(coin_type_id: u32) -> Result<&'static CoinEntry> {
    COINS
        .iter()
        .find(|e| e.id == coin_type_id)
        .ok_or_else(|| BridgeError::UnknownCoin(format!("coin type id {}", coin_type_id)))
}

/// Find the table entry for a wallet coin
pub fn lookup(coin: &CoinKey) -> Result<&'static CoinEntry> {
    COINS
        .iter()
        .find(|e| e.name == coin.name && e.token_type == coin.token_type)
        .ok_or_else(|| BridgeError::UnknownCoin(coin.to_string()))
}

/// Resolve a bridge id (alias or primary) to the wallet pair
pub fn resolve_alias(coin_type_id: u32) -> Result<CoinKey> {
    by_id(coin_type_id).map(CoinEntry::key)
}

/// The bridge id of a wallet coin; aliased tokens get their alias id
pub fn to_coin_type_id(coin: &CoinKey) -> Result<u32> {
    lookup(coin).map(|e| e.id)
}

/// Resolve a symbol from a bridge balance row to the wallet pair
pub fn resolve_symbol(symbol: &str) -> Option<CoinKey> {
    COINS.iter().find(|e| e.symbol == symbol).map(CoinEntry::key)
}

/// The symbol the bridge uses for a wallet coin
pub fn bridge_symbol(coin: &CoinKey) -> Result<&'static str> {
    lookup(coin).map(|e| e.symbol)
}

/// Map an alias id to the id of the coin's primary listing
pub fn canonical_id(coin_type_id: u32) -> Result<u32> {
    let entry = by_id(coin_type_id)?;
    if !entry.is_alias() {
        return Ok(entry.id);
    }
    COINS
        .iter()
        .find(|e| e.symbol == entry.name)
        .map(|e| e.id)
        .ok_or_else(|| BridgeError::UnknownCoin(format!("primary listing for {}", entry.symbol)))
}

// ============================================================================
// Coin type prefix
// ============================================================================

/// Host-chain discriminant carried in the high bits of the deposit coin type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CoinTypePrefix {
    Native,
    Eth,
    Fab,
    Trx,
}

impl CoinTypePrefix {
    pub fn value(&self) -> u32 {
        match self {
            CoinTypePrefix::Native => 0,
            CoinTypePrefix::Eth => 1,
            CoinTypePrefix::Fab => 2,
            CoinTypePrefix::Trx => 3,
        }
    }
}

pub fn prefix_for(coin: &CoinKey) -> Result<CoinTypePrefix> {
    let entry = lookup(coin)?;
    match entry.token_type {
        None => Ok(CoinTypePrefix::Native),
        Some(Chain::Eth) => Ok(CoinTypePrefix::Eth),
        Some(Chain::Fab) => Ok(CoinTypePrefix::Fab),
        Some(Chain::Trx) => Ok(CoinTypePrefix::Trx),
        Some(other) => Err(BridgeError::UnknownCoin(format!(
            "{} cannot host tokens",
            other
        ))),
    }
}

/// The `coinType` argument of the deposit call
///
/// `prefix << 16 | canonical id`, so USDT on TRON and USDT on Ethereum share
/// the canonical id but never the wire value.
pub fn wire_coin_type(coin: &CoinKey) -> Result<u32> {
    let prefix = prefix_for(coin)?;
    let canonical = canonical_id(to_coin_type_id(coin)?)?;
    Ok((prefix.value() << 16) | canonical)
}

// ============================================================================
// Display
// ============================================================================

/// User-facing label for a coin
pub fn display_name(name: &str, token_type: Option<Chain>) -> String {
    match (name, token_type) {
        ("USDT", Some(Chain::Trx)) => "USDT(TRC20)".to_string(),
        (name, Some(Chain::Eth)) if name != "ETH" => format!("{}(ERC20)", name),
        (name, _) => name.to_string(),
    }
}

//! Bridge engine configuration
//!
//! Loaded from the environment, optionally through a `.env` file:
//!
//! | Variable | Meaning |
//! |---|---|
//! | `KANBAN_ENDPOINT` | Kanban API base URL |
//! | `KANBAN_CHAIN_ID` | EIP-155 chain id of the ledger |
//! | `KANBAN_GAS_PRICE` / `KANBAN_GAS_LIMIT` | Default fees for bridge transactions |
//! | `OFFICIAL_ADDRESS_<SYMBOL>` | Deposit address per bridge symbol or host chain |
//! | `DEPOSIT_DISABLED` | Comma-separated bridge symbols not accepting deposits |
//! | `DEPOSIT_MIN_CONFIRMATIONS_<SYMBOL>` | Confirmations before a deposit is credited |

use eyre::{eyre, Result, WrapErr};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::env;
use std::path::Path;

use crate::registry;
use crate::types::CoinKey;

const OFFICIAL_ADDRESS_PREFIX: &str = "OFFICIAL_ADDRESS_";
const MIN_CONFIRMATIONS_PREFIX: &str = "DEPOSIT_MIN_CONFIRMATIONS_";

/// Kanban ledger connection and fee defaults
#[derive(Debug, Clone, Deserialize)]
pub struct KanbanConfig {
    pub endpoint: String,
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,
    #[serde(default = "default_gas_price")]
    pub gas_price: u128,
    #[serde(default = "default_gas_limit")]
    pub gas_limit: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BridgeConfig {
    pub kanban: KanbanConfig,
    /// Keyed by bridge symbol (`USDTX`) or host chain (`ETH`)
    #[serde(default)]
    pub official_addresses: HashMap<String, String>,
    #[serde(default)]
    pub deposit_disabled: HashSet<String>,
    #[serde(default)]
    pub min_confirmations: HashMap<String, u64>,
}

fn default_chain_id() -> u64 {
    211
}

fn default_gas_price() -> u128 {
    50_000_000
}

fn default_gas_limit() -> u64 {
    20_000_000
}

/// Confirmations the bridge waits for before crediting a deposit
fn default_min_confirmations(symbol: &str) -> u64 {
    match symbol {
        "BTC" | "BCH" | "FAB" => 2,
        "LTC" => 6,
        "ETH" | "USDT" | "FABE" | "EXGE" | "DSCE" | "BSTE" => 12,
        "DOGE" | "TRX" | "USDTX" => 20,
        _ => 2,
    }
}

impl BridgeConfig {
    /// Load from `.env` if present, then the process environment
    pub fn load() -> Result<Self> {
        Self::load_from_file(".env")
    }

    pub fn load_from_file(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            dotenvy::from_filename(path)
                .wrap_err_with(|| format!("Failed to load .env file from {}", path))?;
        }
        Self::from_vars(env::vars())
    }

    /// Build from an explicit set of variables
    pub fn from_vars<I>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let vars: HashMap<String, String> = vars.into_iter().collect();

        let kanban = KanbanConfig {
            endpoint: vars
                .get("KANBAN_ENDPOINT")
                .cloned()
                .ok_or_else(|| eyre!("KANBAN_ENDPOINT not set"))?,
            chain_id: parse_or(&vars, "KANBAN_CHAIN_ID", default_chain_id)?,
            gas_price: parse_or(&vars, "KANBAN_GAS_PRICE", default_gas_price)?,
            gas_limit: parse_or(&vars, "KANBAN_GAS_LIMIT", default_gas_limit)?,
        };

        let mut official_addresses: HashMap<String, String> = HashMap::new();
        let mut min_confirmations: HashMap<String, u64> = HashMap::new();
        for (key, value) in &vars {
            if let Some(symbol) = key.strip_prefix(OFFICIAL_ADDRESS_PREFIX) {
                official_addresses.insert(symbol.to_uppercase(), value.trim().to_string());
            } else if let Some(symbol) = key.strip_prefix(MIN_CONFIRMATIONS_PREFIX) {
                let n: u64 = value
                    .trim()
                    .parse()
                    .wrap_err_with(|| format!("Invalid {}", key))?;
                min_confirmations.insert(symbol.to_uppercase(), n);
            }
        }

        let deposit_disabled: HashSet<String> = vars
            .get("DEPOSIT_DISABLED")
            .map(|v| {
                v.split(',')
                    .map(|s| s.trim().to_uppercase())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let config = Self {
            kanban,
            official_addresses,
            deposit_disabled,
            min_confirmations,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        url::Url::parse(&self.kanban.endpoint)
            .wrap_err_with(|| format!("Invalid KANBAN_ENDPOINT {}", self.kanban.endpoint))?;
        if self.kanban.chain_id == 0 {
            return Err(eyre!("KANBAN_CHAIN_ID must be non-zero"));
        }
        if self.kanban.gas_limit == 0 {
            return Err(eyre!("KANBAN_GAS_LIMIT must be non-zero"));
        }
        Ok(())
    }

    /// Deposit address for a coin: its bridge symbol first, then its host chain
    pub fn official_address(&self, coin: &CoinKey) -> Option<&str> {
        let symbol = registry::bridge_symbol(coin).ok()?;
        self.official_addresses
            .get(symbol)
            .or_else(|| {
                let chain = coin.host_chain()?;
                self.official_addresses.get(chain.as_str())
            })
            .map(String::as_str)
            .filter(|a| !a.is_empty())
    }

    /// Listed in the registry and not disabled
    pub fn is_depositable(&self, coin: &CoinKey) -> bool {
        match registry::bridge_symbol(coin) {
            Ok(symbol) => !self.deposit_disabled.contains(symbol),
            Err(_) => false,
        }
    }

    pub fn min_confirmations(&self, coin: &CoinKey) -> u64 {
        let symbol = registry::bridge_symbol(coin).unwrap_or(coin.name.as_str());
        self.min_confirmations
            .get(symbol)
            .copied()
            .unwrap_or_else(|| default_min_confirmations(symbol))
    }
}

fn parse_or<T>(vars: &HashMap<String, String>, key: &str, default: fn() -> T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match vars.get(key) {
        Some(value) => value
            .trim()
            .parse()
            .wrap_err_with(|| format!("Invalid {}", key)),
        None => Ok(default()),
    }
}

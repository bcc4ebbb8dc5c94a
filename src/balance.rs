//! Balance aggregator
//!
//! Refreshes every coin of a wallet from the bridge's `walletBalances`
//! query, keyed by the primary address of each native chain. Rows are
//! matched to coins through the registry, so `USDTX` lands on USDT held on
//! TRON. A field is written only when it changed, and the coin list is
//! persisted only when something did.
//!
//! Coins the bridge does not know yet (`new`), and every coin when the
//! bridge query fails, are refreshed directly from their chain gateway. A
//! failing direct query keeps the last known balance.

use chrono::Utc;
use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::context::BridgeContext;
use crate::error::Result;
use crate::gateway::WalletBalanceRow;
use crate::registry;
use crate::types::{Balance, Coin, CoinKey};

/// Outcome of a refresh
#[derive(Debug, Clone)]
pub struct BalanceRefresh {
    pub coins: Vec<Coin>,
    pub updated: bool,
    /// False when the bridge query failed and every coin went direct
    pub from_bridge: bool,
}

/// True when a bridge row describes `coin`
pub fn row_matches(coin: &CoinKey, symbol: &str) -> bool {
    match registry::resolve_symbol(symbol) {
        Some(key) => &key == coin,
        None => coin.name == symbol,
    }
}

/// Apply a bridge row; returns whether any field changed
pub fn apply_row(coin: &mut Coin, row: &WalletBalanceRow) -> bool {
    let mut updated = false;

    let redeposits = row.deposit_err.clone().unwrap_or_default();
    if coin.pending_redeposits != redeposits {
        coin.pending_redeposits = redeposits;
        updated = true;
    }
    if coin.balance != row.balance {
        coin.balance = row.balance.clone();
        updated = true;
    }
    if coin.locked_balance != row.lock_balance {
        coin.locked_balance = row.lock_balance.clone();
        updated = true;
    }
    if let Some(usd) = &row.usd_value {
        if coin.usd_price.as_ref() != Some(usd) {
            coin.usd_price = Some(usd.clone());
            updated = true;
        }
    }
    updated
}

/// Apply a direct chain balance; returns whether it changed
pub fn apply_direct(coin: &mut Coin, balance: Balance) -> bool {
    if coin.balance == balance.balance && coin.locked_balance == balance.locked_balance {
        return false;
    }
    coin.balance = balance.balance;
    coin.locked_balance = balance.locked_balance;
    true
}

async fn fetch_direct(ctx: &BridgeContext, coin: &Coin) -> Option<Balance> {
    let key = coin.key();
    let address = coin.primary_address()?;
    let gateway = match ctx.chains.balance_source(&key) {
        Ok(gateway) => gateway,
        Err(e) => {
            warn!(coin = %key, error = %e, "No chain gateway for direct balance");
            return None;
        }
    };
    match gateway.get_balance(address).await {
        Ok(balance) => Some(balance),
        Err(e) => {
            warn!(coin = %key, error = %e, "Direct balance query failed, keeping last value");
            None
        }
    }
}

/// Refresh and, when anything changed, persist the wallet's coins
pub async fn refresh_balances(ctx: &BridgeContext, wallet_id: &str) -> Result<BalanceRefresh> {
    let wallet = ctx.wallets.load(wallet_id).await?;
    let mut coins = wallet.coins.clone();
    let mut addresses = wallet.addresses();
    addresses.timestamp = Utc::now().timestamp();

    let mut updated = false;
    let mut direct: Vec<usize> = Vec::new();

    let from_bridge = match ctx.bridge.wallet_balances(&addresses).await {
        Ok(rows) => {
            debug!(wallet_id, rows = rows.len(), "Bridge balances received");
            for (i, coin) in coins.iter_mut().enumerate() {
                if coin.new {
                    direct.push(i);
                    continue;
                }
                let key = coin.key();
                for row in rows.iter().filter(|r| row_matches(&key, &r.coin)) {
                    updated |= apply_row(coin, row);
                }
            }
            true
        }
        Err(e) => {
            warn!(wallet_id, error = %e, "Bridge balance query failed, falling back to chains");
            direct.extend(0..coins.len());
            false
        }
    };

    let fetched = join_all(direct.iter().map(|&i| fetch_direct(ctx, &coins[i]))).await;
    for (i, balance) in direct.into_iter().zip(fetched) {
        if let Some(balance) = balance {
            updated |= apply_direct(&mut coins[i], balance);
        }
    }

    if updated {
        ctx.wallets.replace_coins(wallet_id, coins.clone()).await?;
        info!(wallet_id, from_bridge, "Wallet balances updated");
    }

    Ok(BalanceRefresh {
        coins,
        updated,
        from_bridge,
    })
}

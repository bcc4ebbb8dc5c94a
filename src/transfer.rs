//! Spendable-balance checks, native sends and gas top-ups
//!
//! Every outgoing transfer first checks the amount against the coin's
//! balance and the fee against the balance of the asset paying it. Tokens
//! pay fees in their host chain's native coin.

use bigdecimal::BigDecimal;
use tracing::{info, warn};

use crate::context::BridgeContext;
use crate::error::{BridgeError, Result};
use crate::gateway::TransferRequest;
use crate::session::Session;
use crate::types::{
    Chain, CoinKey, GasOptions, SourceTransaction, TransactionKind, TransactionRecord, Wallet,
};

/// The asset a coin's network fee is paid in
pub fn fee_coin_for(coin: &CoinKey) -> CoinKey {
    match coin.token_type {
        Some(host) => CoinKey::native(host.as_str()),
        None => coin.clone(),
    }
}

/// Check `amount` plus `fee` against the wallet's balances
///
/// Fails with `InsufficientFunds` naming the asset that is short.
pub fn check_spendable(
    wallet: &Wallet,
    coin: &CoinKey,
    amount: &BigDecimal,
    fee: &BigDecimal,
) -> Result<()> {
    let zero = BigDecimal::from(0);
    if amount <= &zero {
        return Err(BridgeError::InvalidInput(format!(
            "amount must be positive, got {}",
            amount
        )));
    }
    if fee < &zero {
        return Err(BridgeError::InvalidInput(format!("negative fee {}", fee)));
    }

    let held = wallet
        .coin(coin)
        .ok_or_else(|| BridgeError::UnknownCoin(coin.to_string()))?;
    let short = |c: &CoinKey| BridgeError::InsufficientFunds {
        coin: c.to_string(),
    };

    if &held.balance < amount {
        return Err(short(coin));
    }

    let fee_coin = fee_coin_for(coin);
    if &fee_coin == coin {
        if held.balance < amount + fee {
            return Err(short(coin));
        }
        return Ok(());
    }

    let fee_balance = wallet
        .coin(&fee_coin)
        .map(|c| c.balance.clone())
        .unwrap_or_else(|| zero.clone());
    if &fee_balance < fee {
        return Err(short(&fee_coin));
    }
    Ok(())
}

/// A native-chain send
#[derive(Debug, Clone)]
pub struct SendRequest {
    pub coin: CoinKey,
    pub to: String,
    pub amount: BigDecimal,
    /// Estimated network fee in the fee asset
    pub fee: BigDecimal,
    pub options: GasOptions,
    pub comment: String,
}

/// Build, broadcast and record a send
pub async fn send(
    ctx: &BridgeContext,
    session: &Session,
    wallet_id: &str,
    request: &SendRequest,
) -> Result<SourceTransaction> {
    send_as(ctx, session, wallet_id, request, TransactionKind::Send).await
}

/// Send FAB to the bridge's scar address to fund Kanban gas
pub async fn add_gas(
    ctx: &BridgeContext,
    session: &Session,
    wallet_id: &str,
    amount: BigDecimal,
    fee: BigDecimal,
    options: GasOptions,
) -> Result<SourceTransaction> {
    let scar = ctx.bridge.get_scar_address().await?;
    let request = SendRequest {
        coin: CoinKey::native(Chain::Fab.as_str()),
        to: scar,
        amount,
        fee,
        options,
        comment: String::new(),
    };
    send_as(ctx, session, wallet_id, &request, TransactionKind::AddGas).await
}

async fn send_as(
    ctx: &BridgeContext,
    session: &Session,
    wallet_id: &str,
    request: &SendRequest,
    kind: TransactionKind,
) -> Result<SourceTransaction> {
    let wallet = ctx.wallets.load(wallet_id).await?;
    session.check_wallet(&wallet)?;
    check_spendable(&wallet, &request.coin, &request.amount, &request.fee)?;

    let from = wallet
        .coin(&request.coin)
        .and_then(|c| c.primary_address())
        .ok_or_else(|| BridgeError::UnknownCoin(request.coin.to_string()))?
        .to_string();
    let key = ctx.keys.signing_key(session, &request.coin, 0)?;

    let _guard = ctx.locks.acquire(wallet.bridge_address).await;

    let tx = ctx
        .builder
        .build(
            &TransferRequest {
                coin: request.coin.clone(),
                from,
                to: request.to.clone(),
                amount: request.amount.clone(),
                options: request.options.clone(),
                do_submit: true,
            },
            &key,
        )
        .await?;

    if let Some(err) = tx.err_msg.as_deref().filter(|e| !e.is_empty()) {
        warn!(coin = %request.coin, kind = %kind, error = err, "Broadcast failed");
        return Err(BridgeError::Gateway(err.to_string()));
    }

    ctx.log
        .append(TransactionRecord::pending(
            wallet_id,
            kind,
            &request.coin,
            request.amount.clone(),
            &tx.tx_hash,
            None,
            &request.to,
            &request.comment,
        ))
        .await?;

    info!(
        coin = %request.coin,
        kind = %kind,
        amount = %request.amount,
        tx_hash = %tx.tx_hash,
        "Transfer broadcast"
    );
    Ok(tx)
}

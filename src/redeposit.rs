//! Redeposit recovery protocol
//!
//! When the bridge sees a source transaction but fails to register its
//! claim, the balance query reports the claim back (`depositErr`) with the
//! signature captured at deposit time. A redeposit replays that claim to the
//! coin pool with fresh Kanban gas parameters and a fresh nonce. The claim
//! itself is never re-signed.
//!
//! [`prepare`] is pure: preparing the same entry twice yields the same plan,
//! so a redeposit can be retried after any failure.

use alloy::primitives::{B256, U256};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::context::BridgeContext;
use crate::contracts::encode_deposit;
use crate::deposit::check_bridge_key;
use crate::error::{BridgeError, Result};
use crate::registry;
use crate::session::Session;
use crate::signer::{sign_kanban_transaction, KanbanTxParams};
use crate::types::{
    parse_b256, CoinKey, GasOptions, Signature, TransactionKind, TransactionRecord, Wallet,
};
use crate::verification::from_bridge_units;

#[derive(Debug, Clone)]
pub struct RedepositRequest {
    pub coin: CoinKey,
    pub source_transaction_id: String,
    /// Kanban gas price and limit; both required
    pub kanban_gas: GasOptions,
}

/// Everything needed to rebuild the coin pool call for a captured claim
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RedepositPlan {
    pub coin: CoinKey,
    /// Id of the coin's primary listing
    pub canonical_id: u32,
    pub wire_coin_type: u32,
    pub source_tx_id: B256,
    pub amount: U256,
    pub signature: Signature,
    pub gas_price: u128,
    pub gas_limit: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RedepositReceipt {
    pub source_transaction_id: String,
    pub nonce: u64,
    /// False when the transaction log rejected the record
    pub recorded: bool,
}

/// Locate the captured claim and derive its resubmission plan
pub fn prepare(
    wallet: &Wallet,
    coin: &CoinKey,
    source_transaction_id: &str,
    gas: &GasOptions,
) -> Result<RedepositPlan> {
    let held = wallet
        .coin(coin)
        .ok_or_else(|| BridgeError::UnknownCoin(coin.to_string()))?;
    let entry = held
        .pending_redeposits
        .iter()
        .find(|e| e.source_transaction_id == source_transaction_id)
        .ok_or_else(|| BridgeError::NoPendingRedeposit {
            tx_id: source_transaction_id.to_string(),
        })?;

    if registry::resolve_alias(entry.coin_type_id)? != *coin {
        return Err(BridgeError::InvalidInput(format!(
            "claim {} is for coin type {}, not {}",
            source_transaction_id, entry.coin_type_id, coin
        )));
    }

    let canonical_id = registry::canonical_id(entry.coin_type_id)?;

    let gas_price = gas
        .gas_price
        .filter(|p| *p > 0)
        .ok_or_else(|| BridgeError::InvalidInput("Kanban gas price is required".to_string()))?;
    let gas_limit = gas
        .gas_limit
        .filter(|l| *l > 0)
        .ok_or_else(|| BridgeError::InvalidInput("Kanban gas limit is required".to_string()))?;

    Ok(RedepositPlan {
        coin: coin.clone(),
        canonical_id,
        wire_coin_type: registry::wire_coin_type(coin)?,
        source_tx_id: parse_b256(&entry.source_transaction_id)?,
        amount: entry.amount,
        signature: entry.signature,
        gas_price,
        gas_limit,
    })
}

pub async fn redeposit(
    ctx: &BridgeContext,
    session: &Session,
    wallet_id: &str,
    request: &RedepositRequest,
) -> Result<RedepositReceipt> {
    let wallet = ctx.wallets.load(wallet_id).await?;
    session.check_wallet(&wallet)?;

    let plan = prepare(
        &wallet,
        &request.coin,
        &request.source_transaction_id,
        &request.kanban_gas,
    )?;

    let bridge_key = ctx.keys.bridge_key(session)?;
    check_bridge_key(bridge_key.address(), wallet.bridge_address)?;

    let _guard = ctx.locks.acquire(wallet.bridge_address).await;

    let coin_pool = ctx.bridge.get_coin_pool_address().await?;
    let nonce = ctx.nonces.current_nonce(wallet.bridge_address).await?;
    let call = encode_deposit(
        plan.wire_coin_type,
        plan.source_tx_id,
        plan.amount,
        wallet.bridge_address,
        &plan.signature,
    );
    let kanban_tx = sign_kanban_transaction(
        &bridge_key,
        coin_pool,
        call,
        KanbanTxParams {
            chain_id: ctx.config.kanban.chain_id,
            nonce,
            gas_price: plan.gas_price,
            gas_limit: plan.gas_limit,
        },
    )?;

    if let Err(e) = ctx.bridge.submit_redeposit(&kanban_tx).await {
        warn!(
            coin = %plan.coin,
            nonce,
            source_tx = %request.source_transaction_id,
            error = %e,
            "Redeposit rejected"
        );
        return Err(e);
    }

    ctx.nonces.advance(wallet.bridge_address, nonce).await;
    let recorded = match ctx
        .log
        .append(TransactionRecord::pending(
            wallet_id,
            TransactionKind::Redeposit,
            &plan.coin,
            from_bridge_units(plan.amount),
            &request.source_transaction_id,
            None,
            &coin_pool.to_string(),
            "",
        ))
        .await
    {
        Ok(()) => true,
        Err(e) => {
            error!(
                coin = %plan.coin,
                source_tx = %request.source_transaction_id,
                error = %e,
                "Redeposit accepted but not recorded"
            );
            false
        }
    };

    info!(
        coin = %plan.coin,
        nonce,
        source_tx = %request.source_transaction_id,
        "Redeposit submitted"
    );

    Ok(RedepositReceipt {
        source_transaction_id: request.source_transaction_id.clone(),
        nonce,
        recorded,
    })
}

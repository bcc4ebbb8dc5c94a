//! Deposit protocol
//!
//! Moves value from a native chain onto the Kanban ledger:
//!
//! 1. Check the amount and fee against the wallet's balances
//! 2. Build (without broadcasting) a transfer to the coin's official address
//! 3. Verify the transfer carries exactly the requested amount
//! 4. Sign the claim message with the coin's key
//! 5. Under the ledger address lock, read the nonce and sign the coin pool
//!    `deposit` call with the Kanban key
//! 6. Submit both transactions together; on acceptance advance the nonce
//!    and record the deposit as pending
//!
//! A rejected submission leaves the nonce untouched. The source transaction
//! is never rolled back; a claim the bridge saw but did not register comes
//! back as a redeposit entry on the next balance refresh.

use alloy::primitives::Address;
use bigdecimal::BigDecimal;
use serde::Serialize;
use std::fmt;
use tracing::{debug, error, info, warn};

use crate::context::BridgeContext;
use crate::contracts::encode_deposit;
use crate::error::{BridgeError, Result};
use crate::gateway::TransferRequest;
use crate::message::BridgeMessage;
use crate::registry;
use crate::session::Session;
use crate::signer::{sign_kanban_transaction, sign_message};
use crate::transfer::check_spendable;
use crate::types::{CoinKey, GasOptions, TransactionKind, TransactionRecord};
use crate::verification::verify_amount;

// ============================================================================
// State machine
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DepositState {
    Idle,
    AmountChecked,
    SourceTxBuilt,
    SourceTxVerified,
    MessageSigned,
    BridgeTxBuilt,
    Submitted,
    Confirmed,
    Rejected,
}

impl DepositState {
    /// Whether `self -> to` is a step of the protocol
    pub fn can_advance_to(self, to: DepositState) -> bool {
        use DepositState::*;
        matches!(
            (self, to),
            (Idle, AmountChecked)
                | (AmountChecked, SourceTxBuilt)
                | (SourceTxBuilt, SourceTxVerified)
                | (SourceTxVerified, MessageSigned)
                | (MessageSigned, BridgeTxBuilt)
                | (BridgeTxBuilt, Submitted)
                | (Submitted, Confirmed)
                | (Submitted, Rejected)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, DepositState::Confirmed | DepositState::Rejected)
    }
}

impl fmt::Display for DepositState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// The states one attempt has passed through
#[derive(Debug, Clone)]
pub struct DepositAttempt {
    coin: CoinKey,
    states: Vec<DepositState>,
}

impl DepositAttempt {
    pub fn new(coin: CoinKey) -> Self {
        Self {
            coin,
            states: vec![DepositState::Idle],
        }
    }

    pub fn state(&self) -> DepositState {
        self.states
            .last()
            .copied()
            .unwrap_or(DepositState::Idle)
    }

    pub fn advance(&mut self, to: DepositState) -> Result<()> {
        let from = self.state();
        if !from.can_advance_to(to) {
            return Err(BridgeError::InvalidInput(format!(
                "deposit cannot move from {} to {}",
                from, to
            )));
        }
        debug!(coin = %self.coin, from = %from, to = %to, "Deposit state");
        self.states.push(to);
        Ok(())
    }

    pub fn states(&self) -> &[DepositState] {
        &self.states
    }
}

// ============================================================================
// Protocol
// ============================================================================

#[derive(Debug, Clone)]
pub struct DepositRequest {
    pub coin: CoinKey,
    /// Whole coins
    pub amount: BigDecimal,
    /// Estimated source-chain fee in the fee asset
    pub fee: BigDecimal,
    /// Source-chain fee parameters
    pub options: GasOptions,
    /// Kanban fee parameters; configured defaults when unset
    pub kanban_gas: GasOptions,
}

#[derive(Debug, Clone, Serialize)]
pub struct DepositReceipt {
    /// Bridge transaction id
    pub transaction_id: String,
    pub source_tx_hash: String,
    pub nonce: u64,
    /// Confirmations the source transaction needs before it is credited
    pub min_confirmations: u64,
    /// Outputs spent by the source transaction, for UTXO chains
    pub txids: Vec<String>,
    pub states: Vec<DepositState>,
    /// False when the transaction log rejected the pending record
    pub recorded: bool,
}

pub async fn deposit(
    ctx: &BridgeContext,
    session: &Session,
    wallet_id: &str,
    request: &DepositRequest,
) -> Result<DepositReceipt> {
    let coin = CoinKey::new(&request.coin.name, request.coin.token_type);
    let mut attempt = DepositAttempt::new(coin.clone());

    let wallet = ctx.wallets.load(wallet_id).await?;
    session.check_wallet(&wallet)?;

    // Idle -> AmountChecked
    check_spendable(&wallet, &coin, &request.amount, &request.fee)?;
    attempt.advance(DepositState::AmountChecked)?;

    // AmountChecked -> SourceTxBuilt
    let official = ctx
        .config
        .official_address(&coin)
        .ok_or_else(|| BridgeError::NoOfficialAddress {
            coin: coin.to_string(),
        })?
        .to_string();
    if !ctx.config.is_depositable(&coin) {
        return Err(BridgeError::NotDepositable {
            coin: coin.to_string(),
        });
    }
    let from = wallet
        .coin(&coin)
        .and_then(|c| c.primary_address())
        .ok_or_else(|| BridgeError::UnknownCoin(coin.to_string()))?
        .to_string();
    let coin_key = ctx.keys.signing_key(session, &coin, 0)?;

    let source_tx = ctx
        .builder
        .build(
            &TransferRequest {
                coin: coin.clone(),
                from,
                to: official.clone(),
                amount: request.amount.clone(),
                options: request.options.clone(),
                do_submit: false,
            },
            &coin_key,
        )
        .await?;
    if let Some(err) = source_tx.err_msg.as_deref().filter(|e| !e.is_empty()) {
        return Err(BridgeError::Gateway(err.to_string()));
    }
    if source_tx.tx_hex.is_empty() || source_tx.tx_hash.is_empty() {
        return Err(BridgeError::Gateway(
            "Internal error: empty source transaction".to_string(),
        ));
    }
    attempt.advance(DepositState::SourceTxBuilt)?;

    // SourceTxBuilt -> SourceTxVerified
    verify_amount(&request.amount, &source_tx)?;
    attempt.advance(DepositState::SourceTxVerified)?;

    // SourceTxVerified -> MessageSigned
    let message = BridgeMessage::build(
        &coin,
        &source_tx.tx_hash,
        &request.amount,
        wallet.bridge_address,
    )?;
    let signature = sign_message(&coin, &message.to_bytes(), &coin_key)?;
    attempt.advance(DepositState::MessageSigned)?;

    // MessageSigned -> BridgeTxBuilt, serialized per ledger address
    let bridge_key = ctx.keys.bridge_key(session)?;
    check_bridge_key(bridge_key.address(), wallet.bridge_address)?;

    let _guard = ctx.locks.acquire(wallet.bridge_address).await;

    let coin_pool = ctx.bridge.get_coin_pool_address().await?;
    let nonce = ctx.nonces.current_nonce(wallet.bridge_address).await?;
    let call = encode_deposit(
        registry::wire_coin_type(&coin)?,
        message.source_tx_id,
        message.amount,
        wallet.bridge_address,
        &signature,
    );
    let kanban_tx = sign_kanban_transaction(
        &bridge_key,
        coin_pool,
        call,
        ctx.kanban_params(nonce, &request.kanban_gas),
    )?;
    attempt.advance(DepositState::BridgeTxBuilt)?;

    // BridgeTxBuilt -> Submitted -> Confirmed | Rejected
    let submitted = ctx
        .bridge
        .submit_deposit(&source_tx.tx_hex, &kanban_tx)
        .await;
    attempt.advance(DepositState::Submitted)?;

    let transaction_id = match submitted {
        Ok(id) if !id.is_empty() => id,
        Ok(_) => {
            attempt.advance(DepositState::Rejected)?;
            warn!(coin = %coin, nonce, "Deposit returned no transaction id");
            return Err(BridgeError::Gateway(
                "Deposit returned no transaction id".to_string(),
            ));
        }
        Err(e) => {
            attempt.advance(DepositState::Rejected)?;
            warn!(
                coin = %coin,
                nonce,
                source_tx = %source_tx.tx_hash,
                error = %e,
                "Deposit rejected"
            );
            return Err(e);
        }
    };

    ctx.nonces.advance(wallet.bridge_address, nonce).await;
    attempt.advance(DepositState::Confirmed)?;

    // Accepted: a log failure is reported in the receipt, not as an error
    let recorded = match ctx
        .log
        .append(TransactionRecord::pending(
            wallet_id,
            TransactionKind::Deposit,
            &coin,
            request.amount.clone(),
            &source_tx.tx_hash,
            Some(transaction_id.clone()),
            &official,
            "",
        ))
        .await
    {
        Ok(()) => true,
        Err(e) => {
            error!(
                coin = %coin,
                transaction_id = %transaction_id,
                source_tx = %source_tx.tx_hash,
                error = %e,
                "Deposit accepted but not recorded"
            );
            false
        }
    };

    let min_confirmations = ctx.config.min_confirmations(&coin);
    info!(
        coin = %coin,
        amount = %request.amount,
        nonce,
        source_tx = %source_tx.tx_hash,
        transaction_id = %transaction_id,
        min_confirmations,
        "Deposit submitted"
    );

    Ok(DepositReceipt {
        transaction_id,
        source_tx_hash: source_tx.tx_hash,
        nonce,
        min_confirmations,
        txids: source_tx.txids,
        states: attempt.states().to_vec(),
        recorded,
    })
}

/// The Kanban key must control the wallet's ledger address
pub(crate) fn check_bridge_key(key_address: Address, bridge_address: Address) -> Result<()> {
    if key_address != bridge_address {
        return Err(BridgeError::Signing(format!(
            "Kanban key {} does not control {}",
            key_address, bridge_address
        )));
    }
    Ok(())
}

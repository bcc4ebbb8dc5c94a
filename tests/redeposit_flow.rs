//! Redeposit recovery integration tests
//!
//! A claim the bridge failed to register comes back through the balance
//! query; these tests replay it through [`kanban_bridge::redeposit`].

mod common;

use std::sync::Arc;

use alloy::consensus::TxEnvelope;
use alloy::eips::eip2718::Decodable2718;
use alloy::primitives::{TxKind, B256, U256};

use common::*;
use kanban_bridge::{
    redeposit, refresh_balances, BridgeError, ChainGateways, CoinKey, GasOptions,
    RedepositEntry, RedepositRequest, Signature, TransactionKind, TransactionLog,
    WalletBalanceRow, WalletStore,
};

fn source_tx_id() -> String {
    format!("0x{}", "ab".repeat(32))
}

fn captured_claim() -> RedepositEntry {
    RedepositEntry {
        coin_type_id: 2,
        amount: U256::from(3_000_000_000_000_000_000u64),
        source_transaction_id: source_tx_id(),
        signature: Signature {
            r: B256::repeat_byte(0x11),
            s: B256::repeat_byte(0x22),
            v: 31,
        },
    }
}

fn kanban_gas() -> GasOptions {
    GasOptions {
        gas_price: Some(60_000_000),
        gas_limit: Some(21_000_000),
        satoshis_per_byte: None,
    }
}

fn request() -> RedepositRequest {
    RedepositRequest {
        coin: CoinKey::native("FAB"),
        source_transaction_id: source_tx_id(),
        kanban_gas: kanban_gas(),
    }
}

async fn harness_with_claim() -> Harness {
    init_tracing();
    let mut fab = coin_with_balance("FAB", None, "fab-user-address", "10");
    fab.pending_redeposits = vec![captured_claim()];
    harness(vec![fab], ChainGateways::new()).await
}

#[tokio::test]
async fn test_redeposit_replays_captured_claim() {
    let h = harness_with_claim().await;

    let receipt = redeposit(&h.ctx, &h.session, WALLET_ID, &request())
        .await
        .unwrap();
    assert_eq!(receipt.nonce, 0);
    assert_eq!(receipt.source_transaction_id, source_tx_id());
    assert!(receipt.recorded);

    let submitted = h.bridge.redeposits.lock().unwrap().clone();
    assert_eq!(submitted.len(), 1);
    let bytes = hex::decode(submitted[0].trim_start_matches("0x")).unwrap();
    let signed = match TxEnvelope::decode_2718(&mut bytes.as_slice()).unwrap() {
        TxEnvelope::Legacy(signed) => signed,
        other => panic!("expected legacy transaction, got {other:?}"),
    };
    let tx = signed.tx();
    assert_eq!(tx.to, TxKind::Call(h.bridge.coin_pool));
    assert_eq!(tx.gas_price, 60_000_000);
    assert_eq!(tx.gas_limit, 21_000_000);

    // The captured signature is replayed, never re-signed
    let input = tx.input.as_ref();
    let word = |i: usize| &input[4 + 32 * i..4 + 32 * (i + 1)];
    // Native FAB: prefix 0, id 2
    assert_eq!(u32::from_be_bytes(word(0)[28..].try_into().unwrap()), 2);
    assert_eq!(word(1), &[0xab; 32]);
    assert_eq!(word(4)[31], 31);
    assert_eq!(word(5), B256::repeat_byte(0x11).as_slice());
    assert_eq!(word(6), B256::repeat_byte(0x22).as_slice());

    let records = h.log.list(WALLET_ID).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].kind, TransactionKind::Redeposit);
    assert_eq!(records[0].amount, dec("3"));
    assert_eq!(
        h.ctx.nonces.last_accepted(kanban_key().address()).await,
        Some(0)
    );
}

#[tokio::test]
async fn test_failed_redeposit_can_be_retried() {
    let h = harness_with_claim().await;
    *h.bridge.redeposit_error.lock().unwrap() = Some("nonce too low".to_string());

    let err = redeposit(&h.ctx, &h.session, WALLET_ID, &request())
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "nonce too low");
    assert_eq!(h.ctx.nonces.last_accepted(kanban_key().address()).await, None);
    assert!(h.log.list(WALLET_ID).await.unwrap().is_empty());

    *h.bridge.redeposit_error.lock().unwrap() = None;
    redeposit(&h.ctx, &h.session, WALLET_ID, &request())
        .await
        .unwrap();

    // Both attempts carried the same call data
    let submitted = h.bridge.redeposits.lock().unwrap().clone();
    assert_eq!(submitted.len(), 2);
    let input = |raw: &str| {
        let bytes = hex::decode(raw.trim_start_matches("0x")).unwrap();
        match TxEnvelope::decode_2718(&mut bytes.as_slice()).unwrap() {
            TxEnvelope::Legacy(signed) => signed.tx().input.clone(),
            other => panic!("expected legacy transaction, got {other:?}"),
        }
    };
    assert_eq!(input(&submitted[0]), input(&submitted[1]));
}

#[tokio::test]
async fn test_unknown_claim_is_rejected_before_submission() {
    let h = harness_with_claim().await;
    let request = RedepositRequest {
        source_transaction_id: format!("0x{}", "cd".repeat(32)),
        ..request()
    };

    let err = redeposit(&h.ctx, &h.session, WALLET_ID, &request)
        .await
        .unwrap_err();
    assert!(matches!(err, BridgeError::NoPendingRedeposit { .. }));
    assert!(h.bridge.redeposits.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_claim_reported_by_balance_refresh_is_redepositable() {
    init_tracing();
    let h = harness(
        vec![coin_with_balance("FAB", None, "fab-user-address", "10")],
        ChainGateways::new(),
    )
    .await;
    h.bridge.set_rows(vec![WalletBalanceRow {
        coin: "FAB".to_string(),
        balance: dec("10"),
        lock_balance: dec("0"),
        deposit_err: Some(vec![captured_claim()]),
        usd_value: None,
    }]);

    let refresh = refresh_balances(&h.ctx, WALLET_ID).await.unwrap();
    assert!(refresh.updated);

    let wallet = h.wallets.load(WALLET_ID).await.unwrap();
    let fab = wallet.coin(&CoinKey::native("FAB")).unwrap();
    assert_eq!(fab.pending_redeposits, vec![captured_claim()]);

    redeposit(&h.ctx, &h.session, WALLET_ID, &request())
        .await
        .unwrap();
    assert_eq!(h.bridge.redeposits.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_accepted_redeposit_survives_log_failure() {
    let mut h = harness_with_claim().await;
    h.ctx.log = Arc::new(FailingLog);

    let receipt = redeposit(&h.ctx, &h.session, WALLET_ID, &request())
        .await
        .unwrap();

    assert!(!receipt.recorded);
    assert_eq!(h.bridge.redeposits.lock().unwrap().len(), 1);
    assert_eq!(
        h.ctx.nonces.last_accepted(kanban_key().address()).await,
        Some(0)
    );
}

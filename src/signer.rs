//! Signature service
//!
//! Signs bridge claims with a coin's key using that coin's host-chain
//! message scheme, and signs the legacy Kanban transaction that carries the
//! claim to the coin pool. Every coin key is a secp256k1 `PrivateKeySigner`.
//!
//! Signing failures are reported once as [`BridgeError::Signing`] and never
//! retried.

use alloy::{
    consensus::{SignableTransaction, TxEnvelope, TxLegacy},
    eips::eip2718::Encodable2718,
    network::TxSignerSync,
    primitives::{Address, Bytes, TxKind, B256, U256},
    signers::{local::PrivateKeySigner, SignerSync},
};
use tracing::debug;

use crate::error::{BridgeError, Result};
use crate::hash::{
    bitcoin_message_hash, eip191_hash, tron_message_hash, BITCOIN_MAGIC, DOGECOIN_MAGIC,
    LITECOIN_MAGIC,
};
use crate::types::{Chain, CoinKey, Signature};

/// Message envelope used by a host chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SigningScheme {
    /// EIP-191 personal message
    Ethereum,
    /// TRON personal message
    Tron,
    /// Bitcoin signed message with the chain's magic
    Bitcoin(&'static [u8]),
}

impl SigningScheme {
    pub fn for_chain(chain: Chain) -> Self {
        match chain {
            Chain::Eth | Chain::Kanban => SigningScheme::Ethereum,
            Chain::Trx => SigningScheme::Tron,
            Chain::Ltc => SigningScheme::Bitcoin(LITECOIN_MAGIC),
            Chain::Doge => SigningScheme::Bitcoin(DOGECOIN_MAGIC),
            Chain::Btc | Chain::Bch | Chain::Fab => SigningScheme::Bitcoin(BITCOIN_MAGIC),
        }
    }

    pub fn for_coin(coin: &CoinKey) -> Result<Self> {
        coin.host_chain()
            .map(Self::for_chain)
            .ok_or_else(|| BridgeError::UnknownCoin(coin.to_string()))
    }

    pub fn message_hash(&self, message: &[u8]) -> B256 {
        let hash = match self {
            SigningScheme::Ethereum => eip191_hash(message),
            SigningScheme::Tron => tron_message_hash(message),
            SigningScheme::Bitcoin(magic) => bitcoin_message_hash(magic, message),
        };
        B256::from(hash)
    }

    /// Header byte for recovery id `recid`
    fn v(&self, recid: u8) -> u8 {
        match self {
            SigningScheme::Ethereum | SigningScheme::Tron => 27 + recid,
            // compressed public key
            SigningScheme::Bitcoin(_) => 31 + recid,
        }
    }
}

/// Sign `message` for `coin` with the coin's key
pub fn sign_message(coin: &CoinKey, message: &[u8], key: &PrivateKeySigner) -> Result<Signature> {
    let scheme = SigningScheme::for_coin(coin)?;
    sign_with_scheme(scheme, message, key)
}

pub fn sign_with_scheme(
    scheme: SigningScheme,
    message: &[u8],
    key: &PrivateKeySigner,
) -> Result<Signature> {
    let hash = scheme.message_hash(message);
    let sig = key
        .sign_hash_sync(&hash)
        .map_err(|e| BridgeError::Signing(e.to_string()))?;

    let rsv: [u8; 65] = sig.as_bytes();
    let recid = match rsv[64] {
        v @ 27..=28 => v - 27,
        v @ 0..=1 => v,
        v => {
            return Err(BridgeError::Signing(format!(
                "unexpected recovery byte {}",
                v
            )))
        }
    };

    let mut out = Signature::from_rsv(&rsv);
    out.v = scheme.v(recid);
    debug!(scheme = ?scheme, v = out.v, "Signed bridge message");
    Ok(out)
}

// ============================================================================
// Kanban transactions
// ============================================================================

/// Fee and ordering parameters of a Kanban transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KanbanTxParams {
    pub chain_id: u64,
    pub nonce: u64,
    pub gas_price: u128,
    pub gas_limit: u64,
}

/// Sign a legacy (EIP-155) contract call and return its raw hex, `0x`-prefixed
pub fn sign_kanban_transaction(
    key: &PrivateKeySigner,
    to: Address,
    input: Bytes,
    params: KanbanTxParams,
) -> Result<String> {
    let mut tx = TxLegacy {
        chain_id: Some(params.chain_id),
        nonce: params.nonce,
        gas_price: params.gas_price,
        gas_limit: params.gas_limit,
        to: TxKind::Call(to),
        value: U256::ZERO,
        input,
    };

    let sig = key
        .sign_transaction_sync(&mut tx)
        .map_err(|e| BridgeError::Signing(e.to_string()))?;
    let signed = tx.into_signed(sig);
    let tx_hash = *signed.hash();
    let envelope = TxEnvelope::from(signed);

    debug!(
        from = %key.address(),
        to = %to,
        nonce = params.nonce,
        tx_hash = %tx_hash,
        "Signed Kanban transaction"
    );

    Ok(format!("0x{}", hex::encode(envelope.encoded_2718())))
}

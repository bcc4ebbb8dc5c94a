//! Bridge claim message
//!
//! The payload a coin key signs to prove a source-chain deposit. Rendered as
//! hex it is 8 digits of coin type, 64 digits of source transaction id,
//! 64 digits of amount and 40 digits of Kanban address. The signed bytes are
//! the hex-decoded concatenation.

use alloy::primitives::{Address, B256, U256};
use bigdecimal::BigDecimal;

use crate::error::Result;
use crate::registry;
use crate::types::{parse_b256, CoinKey};
use crate::verification::to_bridge_units;

/// Byte length of an encoded message
pub const MESSAGE_LEN: usize = 4 + 32 + 32 + 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BridgeMessage {
    /// The coin's own registry id; alias id for aliased tokens
    pub coin_type_id: u32,
    pub source_tx_id: B256,
    /// Claim amount in 18-decimal bridge units
    pub amount: U256,
    pub bridge_address: Address,
}

impl BridgeMessage {
    /// Build the claim for `amount` (in whole coins) of `coin`
    pub fn build(
        coin: &CoinKey,
        source_tx_id: &str,
        amount: &BigDecimal,
        bridge_address: Address,
    ) -> Result<Self> {
        Ok(Self {
            coin_type_id: registry::to_coin_type_id(coin)?,
            source_tx_id: parse_b256(source_tx_id)?,
            amount: to_bridge_units(amount)?,
            bridge_address,
        })
    }

    /// Build from values already in bridge form, as captured in a redeposit
    pub fn from_parts(
        coin_type_id: u32,
        source_tx_id: &str,
        amount: U256,
        bridge_address: Address,
    ) -> Result<Self> {
        Ok(Self {
            coin_type_id,
            source_tx_id: parse_b256(source_tx_id)?,
            amount,
            bridge_address,
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(MESSAGE_LEN);
        out.extend_from_slice(&self.coin_type_id.to_be_bytes());
        out.extend_from_slice(self.source_tx_id.as_slice());
        out.extend_from_slice(&self.amount.to_be_bytes::<32>());
        out.extend_from_slice(self.bridge_address.as_slice());
        out
    }

    /// Lowercase hex without `0x`
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }
}

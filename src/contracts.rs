//! Kanban coin pool contract ABI
//!
//! Uses alloy's sol! macro to encode the deposit call submitted for both
//! fresh deposits and redeposits.

#![allow(clippy::too_many_arguments)]

use alloy::primitives::{Address, Bytes, B256, U256};
use alloy::sol;
use alloy::sol_types::SolCall;

use crate::types::Signature;

sol! {
    /// Coin pool contract on the Kanban ledger
    interface CoinPool {
        /// Register a signed claim for a source-chain deposit
        function deposit(
            uint32 coinType,
            bytes32 transactionID,
            uint256 amount,
            address addressInKanban,
            uint8 v,
            bytes32 r,
            bytes32 s
        ) external;
    }
}

/// ABI-encode `deposit(...)` for the coin pool
pub fn encode_deposit(
    wire_coin_type: u32,
    source_tx_id: B256,
    amount: U256,
    bridge_address: Address,
    signature: &Signature,
) -> Bytes {
    CoinPool::depositCall {
        coinType: wire_coin_type,
        transactionID: source_tx_id,
        amount,
        addressInKanban: bridge_address,
        v: signature.v,
        r: signature.r,
        s: signature.s,
    }
    .abi_encode()
    .into()
}

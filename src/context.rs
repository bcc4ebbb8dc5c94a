//! Shared engine context
//!
//! Bundles configuration, collaborators, the nonce manager and submission
//! locks. Every protocol entry point takes a `&BridgeContext`.

use std::sync::Arc;

use crate::config::BridgeConfig;
use crate::gateway::{BridgeGateway, ChainGateway, ChainGateways, KeyProvider, TransactionBuilder};
use crate::nonce::{NonceManager, SubmissionLocks};
use crate::signer::KanbanTxParams;
use crate::store::{TransactionLog, WalletStore};
use crate::types::{Chain, GasOptions};

pub struct BridgeContext {
    pub config: BridgeConfig,
    pub bridge: Arc<dyn BridgeGateway>,
    pub chains: ChainGateways,
    pub builder: Arc<dyn TransactionBuilder>,
    pub keys: Arc<dyn KeyProvider>,
    pub wallets: Arc<dyn WalletStore>,
    pub log: Arc<dyn TransactionLog>,
    pub nonces: NonceManager,
    pub locks: SubmissionLocks,
}

impl BridgeContext {
    /// `ledger` reads Kanban nonces and is registered as the Kanban chain gateway
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: BridgeConfig,
        bridge: Arc<dyn BridgeGateway>,
        ledger: Arc<dyn ChainGateway>,
        chains: ChainGateways,
        builder: Arc<dyn TransactionBuilder>,
        keys: Arc<dyn KeyProvider>,
        wallets: Arc<dyn WalletStore>,
        log: Arc<dyn TransactionLog>,
    ) -> Self {
        Self {
            config,
            bridge,
            chains: chains.with_chain(Chain::Kanban, ledger.clone()),
            builder,
            keys,
            wallets,
            log,
            nonces: NonceManager::new(ledger),
            locks: SubmissionLocks::new(),
        }
    }

    /// Kanban transaction parameters, falling back to configured fees
    pub fn kanban_params(&self, nonce: u64, gas: &GasOptions) -> KanbanTxParams {
        KanbanTxParams {
            chain_id: self.config.kanban.chain_id,
            nonce,
            gas_price: gas.gas_price.unwrap_or(self.config.kanban.gas_price),
            gas_limit: gas.gas_limit.unwrap_or(self.config.kanban.gas_limit),
        }
    }
}

//! Error types for bridge operations
//!
//! Every protocol step fails with a [`BridgeError`]. Gateway failures keep
//! the remote message verbatim so it can be shown to the user as-is.

use thiserror::Error;

use crate::types::Status;

#[derive(Error, Debug)]
pub enum BridgeError {
    // ========================================================================
    // Deposit Preconditions
    // ========================================================================
    #[error("Insufficient {coin} balance")]
    InsufficientFunds { coin: String },

    #[error("Official address for {coin} is unavailable")]
    NoOfficialAddress { coin: String },

    #[error("Deposit for {coin} is unavailable")]
    NotDepositable { coin: String },

    #[error("Inequal amount for deposit: requested {requested}, transaction carries {in_tx}")]
    AmountMismatch { requested: String, in_tx: String },

    // ========================================================================
    // Identity and Credentials
    // ========================================================================
    #[error("Unknown coin: {0}")]
    UnknownCoin(String),

    #[error("Signing failed: {0}")]
    Signing(String),

    #[error("Authentication failed: wrong PIN")]
    Authentication,

    // ========================================================================
    // Remote and Storage
    // ========================================================================
    #[error("{0}")]
    Gateway(String),

    #[error("No pending redeposit for transaction {tx_id}")]
    NoPendingRedeposit { tx_id: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidStatusTransition { from: Status, to: Status },

    #[error("Store error: {0}")]
    Store(String),
}

impl BridgeError {
    /// Wrap an `eyre` report from HTTP or config plumbing
    pub fn gateway(err: eyre::Report) -> Self {
        BridgeError::Gateway(format!("{:#}", err))
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_message_is_verbatim() {
        let err = BridgeError::Gateway("nonce too low".to_string());
        assert_eq!(err.to_string(), "nonce too low");
    }

    #[test]
    fn test_gateway_from_report_keeps_context() {
        let report = eyre::eyre!("connection refused").wrap_err("submitDeposit failed");
        let err = BridgeError::gateway(report);
        let msg = err.to_string();
        assert!(msg.contains("submitDeposit failed"));
        assert!(msg.contains("connection refused"));
    }

    #[test]
    fn test_status_transition_message() {
        let err = BridgeError::InvalidStatusTransition {
            from: Status::Confirmed,
            to: Status::Pending,
        };
        assert_eq!(err.to_string(), "Invalid status transition: confirmed -> pending");
    }
}

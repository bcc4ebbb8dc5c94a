//! Unlocked wallet session
//!
//! A [`Session`] exists only after the wallet's PIN has been checked against
//! its stored hash. Key derivation and every submission take one explicitly.

use tracing::{info, warn};

use crate::error::{BridgeError, Result};
use crate::hash::sha256_hex;
use crate::redact::Redacted;
use crate::types::Wallet;

#[derive(Debug, Clone)]
pub struct Session {
    wallet_id: String,
    pin: Redacted<String>,
}

impl Session {
    /// Verify `pin` against the wallet's PIN hash
    pub fn unlock(wallet: &Wallet, pin: &str) -> Result<Self> {
        if !pin_matches(&wallet.pwd_hash, pin) {
            warn!(wallet_id = %wallet.id, "PIN verification failed");
            return Err(BridgeError::Authentication);
        }
        info!(wallet_id = %wallet.id, "Session unlocked");
        Ok(Self {
            wallet_id: wallet.id.clone(),
            pin: Redacted(pin.to_string()),
        })
    }

    pub fn wallet_id(&self) -> &str {
        &self.wallet_id
    }

    /// The PIN, for key providers that decrypt a seed with it
    pub fn pin(&self) -> &Redacted<String> {
        &self.pin
    }

    /// Ensure the session belongs to `wallet`
    pub fn check_wallet(&self, wallet: &Wallet) -> Result<()> {
        if self.wallet_id != wallet.id {
            return Err(BridgeError::Authentication);
        }
        Ok(())
    }
}

/// Compare a PIN with a stored hex SHA-256 hash
pub fn pin_matches(pwd_hash: &str, pin: &str) -> bool {
    !pwd_hash.is_empty() && sha256_hex(pin).eq_ignore_ascii_case(pwd_hash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::Address;

    fn wallet(pin: &str) -> Wallet {
        Wallet {
            id: "w1".into(),
            pwd_hash: sha256_hex(pin),
            bridge_address: Address::ZERO,
            coins: vec![],
        }
    }

    #[test]
    fn test_unlock_with_correct_pin() {
        let session = Session::unlock(&wallet("1234"), "1234").unwrap();
        assert_eq!(session.wallet_id(), "w1");
        assert_eq!(session.pin().expose(), "1234");
    }

    #[test]
    fn test_unlock_with_wrong_pin() {
        assert!(matches!(
            Session::unlock(&wallet("1234"), "4321"),
            Err(BridgeError::Authentication)
        ));
    }

    #[test]
    fn test_empty_hash_never_matches() {
        assert!(!pin_matches("", ""));
    }

    #[test]
    fn test_debug_hides_pin() {
        let session = Session::unlock(&wallet("9999"), "9999").unwrap();
        assert!(!format!("{:?}", session).contains("9999"));
    }

    #[test]
    fn test_check_wallet() {
        let session = Session::unlock(&wallet("1"), "1").unwrap();
        let mut other = wallet("1");
        other.id = "w2".into();
        assert!(session.check_wallet(&wallet("1")).is_ok());
        assert!(session.check_wallet(&other).is_err());
    }
}

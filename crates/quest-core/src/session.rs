//! Wallet session preconditions
//!
//! The layer never reads ambient wallet state. The session only answers
//! whether the explicitly passed identity may act right now.

use quest_types::Address;

/// Returned when no wallet is connected
pub const WALLET_NOT_CONNECTED: &str = "Wallet not connected";
/// Returned when the connected wallet cannot sign
pub const WALLET_CANNOT_SIGN: &str = "Wallet cannot sign";
/// Returned when the identity differs from the connected address
pub const IDENTITY_MISMATCH: &str = "Identity does not match connected wallet";

/// External wallet-connection component
#[cfg_attr(test, mockall::automock)]
pub trait WalletSession: Send + Sync {
    /// Currently connected address, if any
    fn connected_address(&self) -> Option<Address>;

    /// Whether the wallet can sign and submit a transaction
    fn can_sign(&self) -> bool;
}

/// Check that `identity` may submit a write
///
/// # Errors
/// Returns one of the fixed precondition messages
pub fn check(session: &dyn WalletSession, identity: &Address) -> Result<(), &'static str> {
    match session.connected_address() {
        None => Err(WALLET_NOT_CONNECTED),
        Some(connected) if connected != *identity => Err(IDENTITY_MISMATCH),
        Some(_) if !session.can_sign() => Err(WALLET_CANNOT_SIGN),
        Some(_) => Ok(()),
    }
}

/// Session with a fixed connected address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticSession {
    address: Option<Address>,
    can_sign: bool,
}

impl StaticSession {
    /// Connected, signing session for `address`
    #[inline]
    #[must_use]
    pub fn connected(address: Address) -> Self {
        Self {
            address: Some(address),
            can_sign: true,
        }
    }

    /// Session with no wallet
    #[inline]
    #[must_use]
    pub fn disconnected() -> Self {
        Self {
            address: None,
            can_sign: false,
        }
    }

    /// Read-only session for `address`
    #[inline]
    #[must_use]
    pub fn read_only(address: Address) -> Self {
        Self {
            address: Some(address),
            can_sign: false,
        }
    }
}

impl WalletSession for StaticSession {
    fn connected_address(&self) -> Option<Address> {
        self.address
    }

    fn can_sign(&self) -> bool {
        self.can_sign
    }
}

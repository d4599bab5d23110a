//! RPC seam between the ledger client and a concrete chain connection

use crate::call::{ContractCall, Receipt};
use crate::error::TransportError;
use async_trait::async_trait;
use quest_types::{Address, TxHash, UserStats};

/// Connection to the rewards and mission-progress contracts
///
/// Implementations own signing, broadcasting and any timeout policy.
/// The client above this trait adds none of its own.
#[async_trait]
pub trait LedgerTransport: Send + Sync {
    /// Request a signature from `from` and broadcast `call`
    async fn submit(&self, from: &Address, call: &ContractCall) -> Result<TxHash, TransportError>;

    /// Wait until `tx_hash` is included and return its receipt
    async fn wait_for_receipt(&self, tx_hash: &TxHash) -> Result<Receipt, TransportError>;

    /// `getUserStats(address)`
    async fn read_user_stats(&self, address: &Address) -> Result<UserStats, TransportError>;

    /// `balanceOf(address)`
    async fn balance_of(&self, address: &Address) -> Result<u128, TransportError>;

    /// Mission progress from the progress-tracking contract
    async fn mission_progress(&self, address: &Address, mission_id: u64) -> Result<u64, TransportError>;
}

//! Collaborator seams
//!
//! The provider core invokes, never reimplements, these capabilities:
//! - `Signer`: key derivation and signing
//! - `ChainSource`: UTXO/balance/doginal lookups and broadcast
//! - `ApprovalUi`: presentation of approval prompts to the user

use async_trait::async_trait;

use crate::approval::{PendingApproval, UserDecision};
use crate::error::ProviderError;
use crate::types::{Doginal, UnsignedTx, Utxo};

/// Signing capability held outside the provider core.
#[async_trait]
pub trait Signer: Send + Sync {
    /// Sign the transaction with the key behind `address`. The input list is
    /// always complete: the signer sees exactly the spends it authorizes.
    async fn sign_transaction(
        &self,
        tx: &UnsignedTx,
        address: &str,
    ) -> Result<Vec<u8>, ProviderError>;

    /// Produce a Dogecoin signed-message signature (65-byte recoverable,
    /// base64-encoded).
    async fn sign_message(&self, text: &str, address: &str) -> Result<String, ProviderError>;
}

/// Network/indexer capability.
#[async_trait]
pub trait ChainSource: Send + Sync {
    async fn fetch_utxos(&self, address: &str) -> Result<Vec<Utxo>, ProviderError>;

    async fn fetch_balance(&self, address: &str) -> Result<u64, ProviderError>;

    async fn fetch_doginals(&self, address: &str) -> Result<Vec<Doginal>, ProviderError>;

    /// Submit raw signed transaction bytes, returning the txid.
    async fn broadcast(&self, tx_bytes: &[u8]) -> Result<String, ProviderError>;

    /// Current fee rate in koinu per byte, if the backend exposes one.
    async fn fee_rate(&self) -> Result<u64, ProviderError>;
}

/// Approval-UI capability (popup or native sheet).
#[async_trait]
pub trait ApprovalUi: Send + Sync {
    /// Present the pending request and resolve with the user's decision.
    /// The workflow owns timeout and cancellation; implementations may block
    /// indefinitely.
    async fn present_approval(&self, approval: &PendingApproval) -> UserDecision;
}

//! Transaction assembly and submission
//!
//! Turns an approved selection into an unsigned transaction, hands the full
//! input list to the signing capability, broadcasts the result, and only then
//! marks the consumed UTXOs spent. A failure at any stage leaves the account
//! snapshot untouched: the operation never partially completes.

use std::sync::Arc;

use crate::account::AccountState;
use crate::capability::{ChainSource, Signer};
use crate::error::ProviderError;
use crate::selection::Selection;
use crate::types::{OutPoint, UnsignedTx};

pub struct TransactionBuilder {
    signer: Arc<dyn Signer>,
    chain: Arc<dyn ChainSource>,
}

impl TransactionBuilder {
    pub fn new(signer: Arc<dyn Signer>, chain: Arc<dyn ChainSource>) -> Self {
        Self { signer, chain }
    }

    /// Sign and broadcast a selection, returning the txid.
    ///
    /// The signer always receives the complete input list it is authorizing.
    /// The optimistic spent-marking happens strictly after broadcast
    /// acceptance so a rejected or failed attempt has no side effects.
    pub async fn execute(
        &self,
        selection: &Selection,
        account: &AccountState,
    ) -> Result<String, ProviderError> {
        let tx = UnsignedTx {
            inputs: selection.inputs.clone(),
            outputs: selection.outputs.clone(),
        };
        let address = account.current_address();

        let signed = self
            .signer
            .sign_transaction(&tx, &address)
            .await
            .map_err(|e| match e {
                ProviderError::SigningFailed(_) => e,
                other => ProviderError::SigningFailed(other.to_string()),
            })?;

        let txid = self.chain.broadcast(&signed).await.map_err(|e| match e {
            ProviderError::BroadcastFailed(_) => e,
            other => ProviderError::BroadcastFailed(other.to_string()),
        })?;

        log::info!(
            "Broadcast accepted: txid={}, {} input(s), {} output(s), fee {} koinu",
            txid,
            tx.inputs.len(),
            tx.outputs.len(),
            selection.fee_koinu
        );

        let spent: Vec<OutPoint> = tx.inputs.iter().map(|u| u.outpoint.clone()).collect();
        account.mark_spent(&spent);

        Ok(txid)
    }
}

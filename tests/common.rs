//! Shared mock collaborators for integration tests
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use doge_provider::approval::{ApprovalKind, PendingApproval, UserDecision};
use doge_provider::capability::{ApprovalUi, ChainSource, Signer};
use doge_provider::error::ProviderError;
use doge_provider::types::{Doginal, OutPoint, UnsignedTx, Utxo};
use doge_provider::{Provider, ProviderConfig};

pub const ORIGIN: &str = "https://dapp.example";
pub const ADDRESS: &str = "DTestActiveAddress1111111111111111";

pub fn init_logging() {
    env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .is_test(true)
        .try_init()
        .ok();
}

pub fn utxo(txid: &str, value_koinu: u64) -> Utxo {
    Utxo {
        outpoint: OutPoint::new(txid, 0),
        value_koinu,
        confirmations: 6,
        inscribed: false,
    }
}

pub fn doginal(id: &str, backing: &Utxo) -> Doginal {
    Doginal {
        inscription_id: id.to_string(),
        outpoint: backing.outpoint.clone(),
        content_type: "image/png".to_string(),
        content_url: None,
        value_koinu: backing.value_koinu,
    }
}

// ============================================================================
// Mock chain source
// ============================================================================

#[derive(Default)]
pub struct MockChain {
    pub utxos: Mutex<Vec<Utxo>>,
    pub doginals: Mutex<Vec<Doginal>>,
    pub broadcasts: Mutex<Vec<Vec<u8>>>,
}

impl MockChain {
    pub fn with_utxos(utxos: Vec<Utxo>) -> Arc<Self> {
        Arc::new(Self { utxos: Mutex::new(utxos), ..Self::default() })
    }

    pub fn broadcast_count(&self) -> usize {
        self.broadcasts.lock().unwrap().len()
    }
}

#[async_trait]
impl ChainSource for MockChain {
    async fn fetch_utxos(&self, _address: &str) -> Result<Vec<Utxo>, ProviderError> {
        Ok(self.utxos.lock().unwrap().clone())
    }

    async fn fetch_balance(&self, _address: &str) -> Result<u64, ProviderError> {
        Ok(self.utxos.lock().unwrap().iter().map(|u| u.value_koinu).sum())
    }

    async fn fetch_doginals(&self, _address: &str) -> Result<Vec<Doginal>, ProviderError> {
        Ok(self.doginals.lock().unwrap().clone())
    }

    async fn broadcast(&self, tx_bytes: &[u8]) -> Result<String, ProviderError> {
        let mut broadcasts = self.broadcasts.lock().unwrap();
        broadcasts.push(tx_bytes.to_vec());
        Ok(format!("txid-{}", broadcasts.len()))
    }

    async fn fee_rate(&self) -> Result<u64, ProviderError> {
        Ok(500)
    }
}

// ============================================================================
// Mock signer
// ============================================================================

#[derive(Default)]
pub struct MockSigner {
    pub signed_input_counts: Mutex<Vec<usize>>,
}

#[async_trait]
impl Signer for MockSigner {
    async fn sign_transaction(
        &self,
        tx: &UnsignedTx,
        _address: &str,
    ) -> Result<Vec<u8>, ProviderError> {
        self.signed_input_counts.lock().unwrap().push(tx.inputs.len());
        serde_json::to_vec(tx).map_err(|e| ProviderError::SigningFailed(e.to_string()))
    }

    async fn sign_message(&self, _text: &str, _address: &str) -> Result<String, ProviderError> {
        // Shape of a real signed-message signature: 65 bytes, base64.
        Ok("H".repeat(88))
    }
}

// ============================================================================
// Approval UIs
// ============================================================================

pub struct ApproveAll;

#[async_trait]
impl ApprovalUi for ApproveAll {
    async fn present_approval(&self, _approval: &PendingApproval) -> UserDecision {
        UserDecision::Approved
    }
}

/// Approves connects, rejects everything fund-moving or signing.
pub struct ApproveConnectOnly;

#[async_trait]
impl ApprovalUi for ApproveConnectOnly {
    async fn present_approval(&self, approval: &PendingApproval) -> UserDecision {
        match approval.kind {
            ApprovalKind::Connect => UserDecision::Approved,
            _ => UserDecision::Rejected,
        }
    }
}

/// Never resolves; the workflow's timeout/cancellation paths take over.
pub struct HangForever {
    pub presented: AtomicUsize,
}

impl HangForever {
    pub fn new() -> Arc<Self> {
        Arc::new(Self { presented: AtomicUsize::new(0) })
    }
}

#[async_trait]
impl ApprovalUi for HangForever {
    async fn present_approval(&self, _approval: &PendingApproval) -> UserDecision {
        self.presented.fetch_add(1, Ordering::SeqCst);
        futures::future::pending().await
    }
}

// ============================================================================
// Provider wiring
// ============================================================================

pub fn provider_with(
    chain: Arc<MockChain>,
    ui: Arc<dyn ApprovalUi>,
    config: ProviderConfig,
) -> Arc<Provider> {
    Arc::new(Provider::new(
        config,
        vec![ADDRESS.to_string(), "DTestSecondAddress222222222222222".to_string()],
        Arc::new(MockSigner::default()),
        chain,
        ui,
    ))
}

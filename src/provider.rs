//! Provider facade - orchestration layer
//!
//! Wires the permission store, account cache, approval workflow, fee engine,
//! and collaborator capabilities together, and exposes the operations the
//! request router dispatches to. Privileged mutations run while holding the
//! approval queue guard, so exactly one is in flight at a time.

use std::sync::Arc;

use serde_json::json;

use crate::account::AccountState;
use crate::approval::{ApprovalKind, ApprovalWorkflow};
use crate::builder::TransactionBuilder;
use crate::capability::{ApprovalUi, ChainSource, Signer};
use crate::config::{ProviderConfig, CHAIN_ID};
use crate::error::ProviderError;
use crate::events::{Event, EventBus};
use crate::permissions::PermissionStore;
use crate::selection::FeeEngine;
use crate::types::{
    ConnectResponse, Doginal, SendDoginalRequest, SendDoginalResponse, SendTransactionRequest,
    SendTransactionResponse, SignMessageRequest, SignMessageResponse, Utxo,
};

pub struct Provider {
    config: ProviderConfig,
    permissions: PermissionStore,
    account: AccountState,
    events: EventBus,
    workflow: ApprovalWorkflow,
    fee_engine: FeeEngine,
    builder: TransactionBuilder,
    signer: Arc<dyn Signer>,
    chain: Arc<dyn ChainSource>,
}

impl Provider {
    /// `addresses` is the wallet's ordered derived address list; index 0 is
    /// the initially active account.
    pub fn new(
        config: ProviderConfig,
        addresses: Vec<String>,
        signer: Arc<dyn Signer>,
        chain: Arc<dyn ChainSource>,
        ui: Arc<dyn ApprovalUi>,
    ) -> Self {
        let workflow = ApprovalWorkflow::new(ui, config.approval_timeout);
        let fee_engine = FeeEngine::new(&config);
        let builder = TransactionBuilder::new(signer.clone(), chain.clone());
        Self {
            permissions: PermissionStore::new(),
            account: AccountState::new(addresses),
            events: EventBus::new(),
            workflow,
            fee_engine,
            builder,
            signer,
            chain,
            config,
        }
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn account(&self) -> &AccountState {
        &self.account
    }

    pub fn workflow(&self) -> &ApprovalWorkflow {
        &self.workflow
    }

    // ========================================================================
    // Read-only surface (never blocks on a pending approval)
    // ========================================================================

    pub fn chain_id(&self) -> &'static str {
        CHAIN_ID
    }

    pub fn is_connected(&self, origin: &str) -> bool {
        self.permissions.is_connected(origin)
    }

    pub fn get_address(&self, origin: &str) -> Result<String, ProviderError> {
        self.ensure_connected(origin)?;
        Ok(self.account.current_address())
    }

    pub fn get_balance(&self, origin: &str) -> Result<u64, ProviderError> {
        self.ensure_connected(origin)?;
        Ok(self.account.balance())
    }

    pub fn get_utxos(&self, origin: &str) -> Result<Vec<Utxo>, ProviderError> {
        self.ensure_connected(origin)?;
        Ok(self.account.utxo_set())
    }

    pub fn get_doginals(&self, origin: &str) -> Result<Vec<Doginal>, ProviderError> {
        self.ensure_connected(origin)?;
        Ok(self.account.doginals())
    }

    // ========================================================================
    // Privileged surface
    // ========================================================================

    /// Connect an origin to the wallet. Already-connected origins resolve
    /// immediately; otherwise the request goes through user approval.
    pub async fn connect(&self, origin: &str) -> Result<ConnectResponse, ProviderError> {
        self.ensure_unlocked()?;

        if self.permissions.is_connected(origin) {
            return Ok(ConnectResponse { address: self.account.current_address(), chain: CHAIN_ID });
        }

        self.workflow
            .approve_connect(origin, json!({ "origin": origin }))
            .await?;

        let address = self.account.current_address();
        self.permissions.grant(origin, vec![address.clone()]);

        // Best-effort warm-up of the snapshot; failures retry on next access.
        if let Err(e) = self.account.refresh(&self.chain).await {
            log::warn!("Post-connect refresh failed: {}", e);
        }

        self.events.emit(
            Event::Connect,
            &json!({ "address": address, "chain": CHAIN_ID }),
        );
        Ok(ConnectResponse { address, chain: CHAIN_ID })
    }

    /// Revoke an origin's grant. Immediate and total; no approval needed to
    /// give privileges up.
    pub fn disconnect(&self, origin: &str) {
        // Nothing to announce for an origin that never connected.
        if !self.permissions.revoke(origin) {
            return;
        }
        self.events.emit(Event::Disconnect, &json!({ "origin": origin }));
        if self.permissions.connected_origins().is_empty() {
            self.events.emit(Event::AccountsChanged, &json!([]));
        }
    }

    pub async fn send_transaction(
        &self,
        origin: &str,
        request: SendTransactionRequest,
    ) -> Result<SendTransactionResponse, ProviderError> {
        self.ensure_unlocked()?;
        self.ensure_connected(origin)?;
        if request.amount_koinu == 0 {
            return Err(ProviderError::InvalidParams("Amount must be positive".into()));
        }

        let params = json!({
            "to": request.to_address,
            "amount_koinu": request.amount_koinu,
            "dev_fee_koinu": self.config.dev_fee_koinu,
        });
        let (_id, _guard) = self
            .workflow
            .approve_spend(origin, ApprovalKind::SendTransaction, params)
            .await?;

        // Holding the queue guard: sole writer from here to broadcast.
        self.refresh_for_spend().await?;

        let address = self.account.current_address();
        let fee_rate = self.fee_rate().await;
        let selection = self.fee_engine.select_send(
            &self.account.utxo_set(),
            &request.to_address,
            request.amount_koinu,
            &address,
            fee_rate,
        )?;

        let txid = self.builder.execute(&selection, &self.account).await?;

        Ok(SendTransactionResponse {
            txid,
            amount_koinu: request.amount_koinu,
            fee_koinu: selection.fee_koinu,
            dev_fee_koinu: selection.dev_fee_koinu,
        })
    }

    pub async fn send_doginal(
        &self,
        origin: &str,
        request: SendDoginalRequest,
    ) -> Result<SendDoginalResponse, ProviderError> {
        self.ensure_unlocked()?;
        self.ensure_connected(origin)?;
        if request.inscription_ids.is_empty() {
            return Err(ProviderError::InvalidParams("No inscriptions named".into()));
        }

        let params = json!({
            "to": request.to_address,
            "inscription_ids": request.inscription_ids,
            "dev_fee_koinu": self.config.dev_fee_koinu,
        });
        let (_id, _guard) = self
            .workflow
            .approve_spend(origin, ApprovalKind::SendDoginal, params)
            .await?;

        self.refresh_for_spend().await?;

        let inventory = self.account.doginals();
        let mut doginals = Vec::with_capacity(request.inscription_ids.len());
        for id in &request.inscription_ids {
            let doginal = inventory
                .iter()
                .find(|d| &d.inscription_id == id)
                .cloned()
                .ok_or_else(|| ProviderError::InscriptionNotFound(id.clone()))?;
            doginals.push(doginal);
        }

        let address = self.account.current_address();
        let selection = self.fee_engine.select_doginal_transfer(
            &self.account.utxo_set(),
            &doginals,
            &request.to_address,
            &address,
        )?;

        let txid = self.builder.execute(&selection, &self.account).await?;

        Ok(SendDoginalResponse {
            txid,
            fee_koinu: selection.fee_koinu,
            dev_fee_koinu: selection.dev_fee_koinu,
        })
    }

    pub async fn sign_message(
        &self,
        origin: &str,
        request: SignMessageRequest,
    ) -> Result<SignMessageResponse, ProviderError> {
        self.ensure_unlocked()?;
        self.ensure_connected(origin)?;

        let params = json!({ "message": request.message });
        let (_id, _guard) = self
            .workflow
            .approve_spend(origin, ApprovalKind::SignMessage, params)
            .await?;

        let address = self.account.current_address();
        let signature = self
            .signer
            .sign_message(&request.message, &address)
            .await
            .map_err(|e| match e {
                ProviderError::SigningFailed(_) => e,
                other => ProviderError::SigningFailed(other.to_string()),
            })?;
        Ok(SignMessageResponse { signature })
    }

    // ========================================================================
    // Wallet-side operations (not reachable from pages)
    // ========================================================================

    /// Pull a fresh snapshot from the network collaborator.
    pub async fn refresh(&self) -> Result<(), ProviderError> {
        self.account.refresh(&self.chain).await
    }

    /// Switch the active account. Connected origins see the new address and
    /// are notified through `accountsChanged`.
    pub async fn switch_account(&self, index: usize) -> Result<String, ProviderError> {
        let address = self.account.switch_active(index)?;
        for origin in self.permissions.connected_origins() {
            self.permissions.grant(&origin, vec![address.clone()]);
        }
        if let Err(e) = self.account.refresh(&self.chain).await {
            log::warn!("Post-switch refresh failed: {}", e);
        }
        self.events.emit(Event::AccountsChanged, &json!([address]));
        Ok(address)
    }

    /// Lock the wallet: clears every origin grant and announces the empty
    /// account list. Privileged operations fail `WalletLocked` until
    /// `unlock`.
    pub fn lock(&self) {
        self.account.set_locked(true);
        self.permissions.clear_all();
        self.events.emit(Event::AccountsChanged, &json!([]));
        log::info!("Wallet locked");
    }

    pub fn unlock(&self) {
        self.account.set_locked(false);
        log::info!("Wallet unlocked");
    }

    /// A page context went away: discard its pending approvals and event
    /// subscriptions. The context identifier is the same key used when
    /// subscribing (the origin, for single-tab embeddings).
    pub fn context_destroyed(&self, context: &str) {
        self.workflow.cancel_origin(context);
        self.events.drop_context(context);
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn ensure_connected(&self, origin: &str) -> Result<(), ProviderError> {
        if self.permissions.is_connected(origin) {
            Ok(())
        } else {
            Err(ProviderError::NotConnected)
        }
    }

    fn ensure_unlocked(&self) -> Result<(), ProviderError> {
        if self.account.is_locked() {
            Err(ProviderError::WalletLocked)
        } else {
            Ok(())
        }
    }

    async fn fee_rate(&self) -> u64 {
        match self.chain.fee_rate().await {
            Ok(rate) if rate > 0 => rate,
            Ok(_) | Err(_) => self.config.fee_rate_koinu_per_byte,
        }
    }

    /// Make sure a spend has a snapshot to select from. The cached set is
    /// authoritative here: re-fetching would resurrect optimistically-spent
    /// outputs that a lagging indexer still reports. Only an empty cache is
    /// filled, and a fetch failure that leaves it empty blocks the operation.
    async fn refresh_for_spend(&self) -> Result<(), ProviderError> {
        if !self.account.utxo_set().is_empty() {
            return Ok(());
        }
        if let Err(e) = self.account.refresh(&self.chain).await {
            return Err(ProviderError::BroadcastFailed(format!("Cannot reach network: {}", e)));
        }
        Ok(())
    }
}

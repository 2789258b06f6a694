//! User-approval state machine
//!
//! Every privileged request passes through here before anything else happens.
//! Lifecycle: `Created -> AwaitingUserDecision -> {Approved, Rejected,
//! TimedOut, Cancelled}`.
//!
//! Connect requests are keyed per origin: a second connect from the same
//! origin while one is pending replaces it (same intent). Fund-moving and
//! signing requests are serialized FIFO through a fair queue so the user is
//! never shown two fund-moving prompts at once; the queue position doubles as
//! the crate's single-writer gate.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use uuid::Uuid;

use crate::capability::ApprovalUi;
use crate::error::{ProviderError, RejectionKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalKind {
    Connect,
    SendTransaction,
    SendDoginal,
    SignMessage,
}

impl ApprovalKind {
    pub fn rejection(&self) -> RejectionKind {
        match self {
            ApprovalKind::Connect => RejectionKind::Connect,
            ApprovalKind::SendTransaction => RejectionKind::Transaction,
            ApprovalKind::SendDoginal => RejectionKind::DoginalTransfer,
            ApprovalKind::SignMessage => RejectionKind::Signing,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalState {
    Created,
    AwaitingUserDecision,
    Approved,
    Rejected,
    TimedOut,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserDecision {
    Approved,
    Rejected,
}

/// A queued privileged request, as shown to the approval UI.
#[derive(Debug, Clone)]
pub struct PendingApproval {
    pub id: Uuid,
    pub origin: String,
    pub kind: ApprovalKind,
    pub params: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub state: ApprovalState,
}

impl PendingApproval {
    fn new(origin: &str, kind: ApprovalKind, params: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            origin: origin.to_string(),
            kind,
            params,
            created_at: Utc::now(),
            state: ApprovalState::Created,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CancelSignal {
    Pending,
    /// Superseded by a newer connect request from the same origin.
    Replaced,
    /// The requesting page context was torn down.
    ContextGone,
}

struct PendingHandle {
    id: Uuid,
    origin: String,
    kind: ApprovalKind,
    cancel: watch::Sender<CancelSignal>,
}

/// Guard held while an approved fund-moving operation executes. Dropping it
/// releases the next queued request.
pub type SpendGuard = tokio::sync::OwnedMutexGuard<()>;

pub struct ApprovalWorkflow {
    ui: Arc<dyn ApprovalUi>,
    timeout: Duration,
    queue: Arc<tokio::sync::Mutex<()>>,
    pending: Mutex<Vec<PendingHandle>>,
}

impl ApprovalWorkflow {
    pub fn new(ui: Arc<dyn ApprovalUi>, timeout: Duration) -> Self {
        Self {
            ui,
            timeout,
            queue: Arc::new(tokio::sync::Mutex::new(())),
            pending: Mutex::new(Vec::new()),
        }
    }

    /// Run a connect request through the state machine. Replaces any pending
    /// connect from the same origin instead of queuing a duplicate.
    pub async fn approve_connect(
        &self,
        origin: &str,
        params: serde_json::Value,
    ) -> Result<Uuid, ProviderError> {
        let approval = PendingApproval::new(origin, ApprovalKind::Connect, params);
        let cancel_rx = self.register(&approval, true);
        self.await_decision(approval, cancel_rx).await
    }

    /// Run a fund-moving or signing request through the state machine,
    /// waiting for its FIFO turn first. On approval the caller receives the
    /// queue guard and must hold it for the duration of the operation.
    pub async fn approve_spend(
        &self,
        origin: &str,
        kind: ApprovalKind,
        params: serde_json::Value,
    ) -> Result<(Uuid, SpendGuard), ProviderError> {
        let approval = PendingApproval::new(origin, kind, params);
        let id = approval.id;
        let mut cancel_rx = self.register(&approval, false);

        // A request can be torn down while still waiting for its queue turn.
        let guard = tokio::select! {
            guard = self.queue.clone().lock_owned() => guard,
            _ = cancel_rx.changed() => {
                self.pending.lock().unwrap().retain(|h| h.id != id);
                return Err(ProviderError::UserRejected(kind.rejection()));
            }
        };
        let id = self.await_decision(approval, cancel_rx).await?;
        Ok((id, guard))
    }

    /// Discard every pending approval originating from a torn-down page
    /// context. No side effects beyond resolving the waiters.
    pub fn cancel_origin(&self, origin: &str) {
        let pending = self.pending.lock().unwrap();
        for handle in pending.iter().filter(|h| h.origin == origin) {
            log::debug!("Cancelling pending {:?} approval for {}", handle.kind, origin);
            handle.cancel.send(CancelSignal::ContextGone).ok();
        }
    }

    fn register(
        &self,
        approval: &PendingApproval,
        replace_same_origin: bool,
    ) -> watch::Receiver<CancelSignal> {
        let (cancel_tx, cancel_rx) = watch::channel(CancelSignal::Pending);
        let mut pending = self.pending.lock().unwrap();
        if replace_same_origin {
            for stale in pending
                .iter()
                .filter(|h| h.origin == approval.origin && h.kind == ApprovalKind::Connect)
            {
                log::info!("Replacing pending connect approval for {}", approval.origin);
                stale.cancel.send(CancelSignal::Replaced).ok();
            }
        }
        pending.push(PendingHandle {
            id: approval.id,
            origin: approval.origin.clone(),
            kind: approval.kind,
            cancel: cancel_tx,
        });
        cancel_rx
    }

    async fn await_decision(
        &self,
        mut approval: PendingApproval,
        mut cancel_rx: watch::Receiver<CancelSignal>,
    ) -> Result<Uuid, ProviderError> {
        approval.state = ApprovalState::AwaitingUserDecision;
        let id = approval.id;
        let kind = approval.kind;
        log::info!(
            "Approval {} ({:?}) awaiting user decision for origin {}",
            id,
            kind,
            approval.origin
        );

        let signal_probe = cancel_rx.clone();
        let (state, outcome) = tokio::select! {
            decision = self.ui.present_approval(&approval) => match decision {
                UserDecision::Approved => (ApprovalState::Approved, Ok(id)),
                UserDecision::Rejected => (
                    ApprovalState::Rejected,
                    Err(ProviderError::UserRejected(kind.rejection())),
                ),
            },
            _ = tokio::time::sleep(self.timeout) => {
                log::warn!("Approval {} timed out", id);
                (ApprovalState::TimedOut, Err(ProviderError::Timeout))
            }
            _ = cancel_rx.changed() => {
                let signal = *signal_probe.borrow();
                log::debug!("Approval {} cancelled: {:?}", id, signal);
                (ApprovalState::Cancelled, Err(ProviderError::UserRejected(kind.rejection())))
            }
        };

        self.pending.lock().unwrap().retain(|h| h.id != id);
        log::info!("Approval {} resolved: {:?}", id, state);
        outcome
    }
}

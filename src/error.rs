use thiserror::Error;

/// Which privileged request kind the user turned down.
///
/// The message strings below are part of the page-facing contract and must
/// not change between releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionKind {
    Connect,
    Transaction,
    DoginalTransfer,
    Signing,
}

impl RejectionKind {
    pub fn message(&self) -> &'static str {
        match self {
            RejectionKind::Connect => "Connection rejected by user",
            RejectionKind::Transaction => "Transaction rejected by user",
            RejectionKind::DoginalTransfer => "Doginal transfer rejected by user",
            RejectionKind::Signing => "Signing rejected by user",
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("Site not connected")]
    NotConnected,

    #[error("{}", .0.message())]
    UserRejected(RejectionKind),

    #[error("Wallet is locked")]
    WalletLocked,

    #[error("Insufficient funds: {0}")]
    InsufficientFunds(String),

    #[error("Inscription not found: {0}")]
    InscriptionNotFound(String),

    #[error("Unsupported method: {0}")]
    UnsupportedMethod(String),

    #[error("Signing failed: {0}")]
    SigningFailed(String),

    #[error("Broadcast failed: {0}")]
    BroadcastFailed(String),

    #[error("Approval request timed out")]
    Timeout,

    #[error("Invalid params: {0}")]
    InvalidParams(String),

    #[error("Network error: {0}")]
    Network(String),
}

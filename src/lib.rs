//! In-page provider core for a non-custodial Dogecoin wallet
//!
//! Mediates between untrusted web pages and the wallet's keys, spendable
//! coin set, and doginal (inscription) holdings:
//!
//! - Per-origin permissioning
//! - Cached balance and asset inventory
//! - Coin selection that never spends an inscription carrier by accident
//! - Deterministic fee computation
//! - A user-approval state machine gating every privileged operation
//! - Event notification across page contexts
//!
//! Signing, the network/indexer, and the approval UI are external
//! collaborators behind the traits in [`capability`].

pub mod account;
pub mod approval;
pub mod builder;
pub mod capability;
pub mod config;
pub mod error;
pub mod events;
pub mod indexer;
pub mod permissions;
pub mod provider;
pub mod router;
pub mod selection;
pub mod types;

pub use account::AccountState;
pub use approval::{ApprovalKind, ApprovalState, ApprovalWorkflow, PendingApproval, UserDecision};
pub use capability::{ApprovalUi, ChainSource, Signer};
pub use config::{ProviderConfig, CHAIN_ID, KOINU_PER_DOGE};
pub use error::{ProviderError, RejectionKind};
pub use events::{Event, EventBus};
pub use indexer::HttpChainSource;
pub use permissions::PermissionStore;
pub use provider::Provider;
pub use router::RequestRouter;
pub use selection::{FeeEngine, Selection};
pub use types::{Account, Doginal, OutPoint, TxOutput, UnsignedTx, Utxo};

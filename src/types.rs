use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reference to a prior transaction output.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutPoint {
    pub txid: String,
    pub vout: u32,
}

impl OutPoint {
    pub fn new(txid: impl Into<String>, vout: u32) -> Self {
        Self { txid: txid.into(), vout }
    }
}

impl std::fmt::Display for OutPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.txid, self.vout)
    }
}

/// An unspent output owned by the active account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utxo {
    pub outpoint: OutPoint,
    pub value_koinu: u64,
    pub confirmations: u32,
    /// Set when the indexer reports an inscription on this output.
    pub inscribed: bool,
}

impl Utxo {
    /// Whether this output must be kept out of plain-value spends.
    ///
    /// Anything carrying an inscription, or small enough that it plausibly
    /// does (below the 0.1 DOGE carrier threshold), is protected.
    pub fn is_protected(&self, protected_threshold_koinu: u64) -> bool {
        self.inscribed || self.value_koinu < protected_threshold_koinu
    }
}

/// An inscription bound to a single backing UTXO.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Doginal {
    pub inscription_id: String,
    pub outpoint: OutPoint,
    pub content_type: String,
    pub content_url: Option<String>,
    pub value_koinu: u64,
}

/// Cached view of one derived account.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Account {
    pub address: String,
    pub balance_koinu: u64,
    pub utxos: Vec<Utxo>,
    pub doginals: Vec<Doginal>,
}

/// A single output of an unsigned transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOutput {
    pub address: String,
    pub value_koinu: u64,
}

/// Transaction structure handed to the signing capability.
///
/// The signer always sees the full input list it is authorizing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnsignedTx {
    pub inputs: Vec<Utxo>,
    pub outputs: Vec<TxOutput>,
}

/// Permission record for one origin.
#[derive(Debug, Clone, Serialize)]
pub struct OriginGrant {
    pub addresses: Vec<String>,
    pub granted_at: DateTime<Utc>,
}

// ============================================================================
// Request / response types
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct SendTransactionRequest {
    pub to_address: String,
    pub amount_koinu: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SendTransactionResponse {
    pub txid: String,
    pub amount_koinu: u64,
    pub fee_koinu: u64,
    pub dev_fee_koinu: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SendDoginalRequest {
    pub to_address: String,
    pub inscription_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SendDoginalResponse {
    pub txid: String,
    pub fee_koinu: u64,
    pub dev_fee_koinu: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SignMessageRequest {
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SignMessageResponse {
    /// Base64 of the 65-byte recoverable signature.
    pub signature: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConnectResponse {
    pub address: String,
    pub chain: &'static str,
}

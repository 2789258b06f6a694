//! Doginals indexer client
//!
//! Default `ChainSource` implementation against an esplora-style doginals
//! indexer. Endpoints:
//! - `GET  {base}/address/{addr}/balance`
//! - `GET  {base}/address/{addr}/utxo`
//! - `GET  {base}/address/{addr}/doginals`
//! - `GET  {base}/fee-estimates`
//! - `POST {base}/tx` (raw transaction hex in the body)

use async_trait::async_trait;
use serde::Deserialize;

use crate::capability::ChainSource;
use crate::error::ProviderError;
use crate::types::{Doginal, OutPoint, Utxo};

pub struct HttpChainSource {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct BalanceEntry {
    confirmed_koinu: u64,
}

#[derive(Debug, Deserialize)]
struct UtxoEntry {
    txid: String,
    vout: u32,
    value_koinu: u64,
    confirmations: u32,
    #[serde(default)]
    inscribed: bool,
}

#[derive(Debug, Deserialize)]
struct DoginalEntry {
    inscription_id: String,
    txid: String,
    vout: u32,
    content_type: String,
    content_url: Option<String>,
    value_koinu: u64,
}

#[derive(Debug, Deserialize)]
struct FeeEstimate {
    koinu_per_byte: u64,
}

impl HttpChainSource {
    pub fn new(base_url: String) -> Self {
        Self { base_url, client: reqwest::Client::new() }
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
    ) -> Result<T, ProviderError> {
        let url = format!("{}/{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ProviderError::Network(format!(
                "Indexer returned {} for {}",
                response.status(),
                url
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))
    }
}

#[async_trait]
impl ChainSource for HttpChainSource {
    async fn fetch_utxos(&self, address: &str) -> Result<Vec<Utxo>, ProviderError> {
        let entries: Vec<UtxoEntry> = self.get_json(&format!("address/{}/utxo", address)).await?;
        Ok(entries
            .into_iter()
            .map(|e| Utxo {
                outpoint: OutPoint::new(e.txid, e.vout),
                value_koinu: e.value_koinu,
                confirmations: e.confirmations,
                inscribed: e.inscribed,
            })
            .collect())
    }

    async fn fetch_balance(&self, address: &str) -> Result<u64, ProviderError> {
        let entry: BalanceEntry = self.get_json(&format!("address/{}/balance", address)).await?;
        Ok(entry.confirmed_koinu)
    }

    async fn fetch_doginals(&self, address: &str) -> Result<Vec<Doginal>, ProviderError> {
        let entries: Vec<DoginalEntry> =
            self.get_json(&format!("address/{}/doginals", address)).await?;
        Ok(entries
            .into_iter()
            .map(|e| Doginal {
                inscription_id: e.inscription_id,
                outpoint: OutPoint::new(e.txid, e.vout),
                content_type: e.content_type,
                content_url: e.content_url,
                value_koinu: e.value_koinu,
            })
            .collect())
    }

    async fn broadcast(&self, tx_bytes: &[u8]) -> Result<String, ProviderError> {
        let tx_hex = hex::encode(tx_bytes);
        log::debug!("Broadcasting transaction to: {}/tx", self.base_url);

        let response = self
            .client
            .post(format!("{}/tx", self.base_url))
            .body(tx_hex)
            .send()
            .await
            .map_err(|e| ProviderError::BroadcastFailed(e.to_string()))?;

        if !response.status().is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ProviderError::BroadcastFailed(error_text));
        }

        response
            .text()
            .await
            .map_err(|e| ProviderError::BroadcastFailed(e.to_string()))
    }

    async fn fee_rate(&self) -> Result<u64, ProviderError> {
        let estimate: FeeEstimate = self.get_json("fee-estimates").await?;
        Ok(estimate.koinu_per_byte)
    }
}

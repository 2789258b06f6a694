//! Request dispatch
//!
//! Both the direct method surface and the generic `request({method, params})`
//! indirection land here and map onto the same provider operations. Unknown
//! methods fail loudly with an unsupported-method error.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::ProviderError;
use crate::provider::Provider;
use crate::types::{SendDoginalRequest, SendTransactionRequest, SignMessageRequest};

pub struct RequestRouter {
    provider: Arc<Provider>,
}

impl RequestRouter {
    pub fn new(provider: Arc<Provider>) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &Arc<Provider> {
        &self.provider
    }

    /// Dispatch a page request by method name.
    pub async fn request(
        &self,
        origin: &str,
        method: &str,
        params: Value,
    ) -> Result<Value, ProviderError> {
        log::debug!("Request from {}: {}", origin, method);
        match method {
            "connect" => to_value(self.provider.connect(origin).await?),
            "disconnect" => {
                self.provider.disconnect(origin);
                Ok(Value::Null)
            }
            "isConnected" => to_value(self.provider.is_connected(origin)),
            "getChain" => to_value(self.provider.chain_id()),
            "getAddress" => to_value(self.provider.get_address(origin)?),
            "getBalance" => to_value(self.provider.get_balance(origin)?),
            "getUtxos" => to_value(self.provider.get_utxos(origin)?),
            "getDoginals" => to_value(self.provider.get_doginals(origin)?),
            "sendTransaction" => {
                let request: SendTransactionRequest = parse_params(params)?;
                to_value(self.provider.send_transaction(origin, request).await?)
            }
            "sendDoginal" => {
                let request: SendDoginalRequest = parse_params(params)?;
                to_value(self.provider.send_doginal(origin, request).await?)
            }
            "signMessage" => {
                let request: SignMessageRequest = parse_params(params)?;
                to_value(self.provider.sign_message(origin, request).await?)
            }
            other => Err(ProviderError::UnsupportedMethod(other.to_string())),
        }
    }
}

fn parse_params<T: DeserializeOwned>(params: Value) -> Result<T, ProviderError> {
    serde_json::from_value(params).map_err(|e| ProviderError::InvalidParams(e.to_string()))
}

fn to_value<T: Serialize>(value: T) -> Result<Value, ProviderError> {
    serde_json::to_value(value).map_err(|e| ProviderError::InvalidParams(e.to_string()))
}

//! EIP-1193 provider backed by an HTTP JSON-RPC endpoint.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::provider::{Eip1193Provider, ProviderError};

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

/// Forwards provider requests to a node. Nodes answer `eth_requestAccounts` through
/// `eth_accounts`, since only injected wallets implement the former.
pub struct JsonRpcProvider {
    http: Client,
    url: Url,
    next_id: AtomicU64,
}

impl JsonRpcProvider {
    pub fn new(url: Url) -> Self {
        Self {
            http: Client::new(),
            url,
            next_id: AtomicU64::new(1),
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl Eip1193Provider for JsonRpcProvider {
    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError> {
        let method = match method {
            "eth_requestAccounts" => "eth_accounts",
            other => other,
        };
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        debug!(id, method, url = %self.url, "rpc: sending request");

        let response = self
            .http
            .post(self.url.clone())
            .json(&RpcRequest {
                jsonrpc: "2.0",
                id,
                method,
                params,
            })
            .send()
            .await
            .map_err(ProviderError::transport)?
            .error_for_status()
            .map_err(ProviderError::transport)?;
        let body: RpcResponse = response
            .json()
            .await
            .map_err(|err| ProviderError::malformed(method, err))?;

        if let Some(error) = body.error {
            debug!(id, method, code = error.code, "rpc: request failed");
            return Err(ProviderError {
                code: error.code,
                message: error.message,
                data: error.data,
            });
        }
        Ok(body.result.unwrap_or(Value::Null))
    }
}

#[cfg(test)]
#[path = "tests/rpc_tests.rs"]
mod tests;

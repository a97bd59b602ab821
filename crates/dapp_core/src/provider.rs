//! EIP-1193 provider abstraction and the typed handle the rest of the core talks to.

use std::{fmt, sync::Arc};

use alloy_primitives::{hex, Address, Bytes, B256, U256, U64};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use shared::domain::WalletKind;
use thiserror::Error;

/// Error object returned by an injected provider's `request`.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("provider error {code}: {message}")]
pub struct ProviderError {
    pub code: i64,
    pub message: String,
    pub data: Option<Value>,
}

impl ProviderError {
    pub const EXECUTION_REVERTED: i64 = 3;
    pub const USER_REJECTED: i64 = 4001;
    pub const UNAUTHORIZED: i64 = 4100;
    pub const INTERNAL: i64 = -32603;

    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn user_rejected() -> Self {
        Self::new(Self::USER_REJECTED, "User rejected the request.")
    }

    pub fn transport(err: impl fmt::Display) -> Self {
        Self::new(Self::INTERNAL, format!("transport failure: {err}"))
    }

    pub fn malformed(method: &str, err: impl fmt::Display) -> Self {
        Self::new(
            Self::INTERNAL,
            format!("malformed {method} response: {err}"),
        )
    }

    pub fn is_user_rejection(&self) -> bool {
        self.code == Self::USER_REJECTED
    }

    pub fn is_revert(&self) -> bool {
        self.code == Self::EXECUTION_REVERTED
            || self.message.to_ascii_lowercase().contains("revert")
    }

    /// Decodes a standard `Error(string)` payload carried in `data`, if any.
    pub fn revert_reason(&self) -> Option<String> {
        let raw = match self.data.as_ref()? {
            Value::String(raw) => raw.as_str(),
            Value::Object(map) => map.get("data")?.as_str()?,
            _ => return None,
        };
        let bytes = raw.parse::<Bytes>().ok()?;
        alloy_sol_types::decode_revert_reason(&bytes)
    }
}

/// Minimal surface every injected wallet exposes.
#[async_trait]
pub trait Eip1193Provider: Send + Sync {
    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequest {
    pub from: Address,
    pub to: Address,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<U256>,
    pub data: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    pub transaction_hash: B256,
    #[serde(default)]
    pub block_number: Option<U64>,
    #[serde(default)]
    pub status: Option<U64>,
}

impl TransactionReceipt {
    /// Receipts without a status field predate EIP-658 and only exist for included,
    /// non-reverting transactions.
    pub fn succeeded(&self) -> bool {
        self.status.map_or(true, |status| status == U64::from(1))
    }
}

/// A request-capable provider for one detected wallet.
#[derive(Clone)]
pub struct ProviderHandle {
    kind: WalletKind,
    inner: Arc<dyn Eip1193Provider>,
}

impl fmt::Debug for ProviderHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderHandle")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl ProviderHandle {
    pub fn new(kind: WalletKind, inner: Arc<dyn Eip1193Provider>) -> Self {
        Self { kind, inner }
    }

    pub fn kind(&self) -> WalletKind {
        self.kind
    }

    pub async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError> {
        self.inner.request(method, params).await
    }

    /// Prompts the user for account access.
    pub async fn request_accounts(&self) -> Result<Vec<Address>, ProviderError> {
        let value = self.request("eth_requestAccounts", json!([])).await?;
        parse_accounts("eth_requestAccounts", value)
    }

    pub async fn accounts(&self) -> Result<Vec<Address>, ProviderError> {
        let value = self.request("eth_accounts", json!([])).await?;
        parse_accounts("eth_accounts", value)
    }

    /// Binds a signer to the first authorized account.
    pub async fn get_signer(&self) -> Result<Signer, ProviderError> {
        let address = self
            .accounts()
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| {
                ProviderError::new(ProviderError::UNAUTHORIZED, "no authorized account")
            })?;
        Ok(Signer {
            address,
            provider: self.clone(),
        })
    }

    pub async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, ProviderError> {
        let value = self
            .request(
                "eth_call",
                json!([{ "to": to, "data": data }, "latest"]),
            )
            .await?;
        serde_json::from_value(value).map_err(|err| ProviderError::malformed("eth_call", err))
    }

    pub async fn send_transaction(
        &self,
        request: &TransactionRequest,
    ) -> Result<B256, ProviderError> {
        let value = self
            .request("eth_sendTransaction", json!([request]))
            .await?;
        serde_json::from_value(value)
            .map_err(|err| ProviderError::malformed("eth_sendTransaction", err))
    }

    pub async fn transaction_receipt(
        &self,
        hash: B256,
    ) -> Result<Option<TransactionReceipt>, ProviderError> {
        let value = self
            .request("eth_getTransactionReceipt", json!([hash]))
            .await?;
        if value.is_null() {
            return Ok(None);
        }
        serde_json::from_value(value)
            .map(Some)
            .map_err(|err| ProviderError::malformed("eth_getTransactionReceipt", err))
    }
}

/// Opaque capability to authorize transactions for one account through one provider.
#[derive(Debug, Clone)]
pub struct Signer {
    address: Address,
    provider: ProviderHandle,
}

impl Signer {
    pub fn address(&self) -> Address {
        self.address
    }

    pub fn provider(&self) -> &ProviderHandle {
        &self.provider
    }

    pub async fn send_transaction(
        &self,
        to: Address,
        data: Bytes,
        value: Option<U256>,
    ) -> Result<B256, ProviderError> {
        let request = TransactionRequest {
            from: self.address,
            to,
            value,
            data,
        };
        self.provider.send_transaction(&request).await
    }
}

/// Lowercase `0x`-prefixed rendering used for every account shown to the user.
pub fn lowercase_address(address: Address) -> String {
    hex::encode_prefixed(address)
}

fn parse_accounts(method: &str, value: Value) -> Result<Vec<Address>, ProviderError> {
    let raw: Vec<String> =
        serde_json::from_value(value).map_err(|err| ProviderError::malformed(method, err))?;
    raw.iter()
        .map(|account| {
            account
                .parse::<Address>()
                .map_err(|err| ProviderError::malformed(method, err))
        })
        .collect()
}

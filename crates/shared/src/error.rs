use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{TransactionKind, WalletKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    ProviderUnavailable,
    UnsupportedWallet,
    ConnectFailed,
    NoActiveSession,
    InvalidAmount,
    InvalidAddress,
    InvalidReferralCode,
    NotOwner,
    AlreadyPending,
    TransactionRejected,
    TransactionReverted,
    Provider,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

pub const CONNECT_FAILED_REASON: &str = "Failed to connect wallet";
pub const CONNECT_SUPERSEDED_REASON: &str = "connection attempt superseded";

/// Every failure the wallet/transaction lifecycle can surface to its caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DappError {
    /// The requested wallet did not inject itself into the environment.
    #[error("{0}")]
    ProviderUnavailable(String),
    /// The wallet kind is known but has no integration, or is not known at all.
    #[error("{0}")]
    UnsupportedWallet(String),
    /// The user rejected account access or the provider failed mid-handshake.
    #[error("{0}")]
    ConnectFailed(String),
    #[error("no active wallet session")]
    NoActiveSession,
    #[error("invalid amount '{input}': {reason}")]
    InvalidAmount { input: String, reason: String },
    #[error("invalid address '{0}'")]
    InvalidAddress(String),
    #[error("referral code must not be empty")]
    InvalidReferralCode,
    #[error("connected account is not the contract owner")]
    NotOwner,
    #[error("a {0} transaction is already pending")]
    AlreadyPending(TransactionKind),
    #[error("transaction rejected: {0}")]
    TransactionRejected(String),
    #[error("transaction reverted: {reason}")]
    TransactionReverted {
        tx_hash: Option<String>,
        reason: String,
    },
    #[error("provider error: {0}")]
    Provider(String),
}

impl DappError {
    pub fn provider_unavailable(kind: WalletKind) -> Self {
        Self::ProviderUnavailable(format!("{} not detected", kind.display_name()))
    }

    pub fn unimplemented_wallet(kind: WalletKind) -> Self {
        Self::UnsupportedWallet(format!("{} integration not implemented", kind.display_name()))
    }

    pub fn connect_failed() -> Self {
        Self::ConnectFailed(CONNECT_FAILED_REASON.to_string())
    }

    /// A connect attempt overtaken by a newer connect or a disconnect.
    pub fn connect_superseded() -> Self {
        Self::ConnectFailed(CONNECT_SUPERSEDED_REASON.to_string())
    }

    pub fn is_superseded(&self) -> bool {
        matches!(self, DappError::ConnectFailed(reason) if reason == CONNECT_SUPERSEDED_REASON)
    }

    pub fn invalid_amount(input: &str, reason: impl Into<String>) -> Self {
        Self::InvalidAmount {
            input: input.to_string(),
            reason: reason.into(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            DappError::ProviderUnavailable(_) => ErrorCode::ProviderUnavailable,
            DappError::UnsupportedWallet(_) => ErrorCode::UnsupportedWallet,
            DappError::ConnectFailed(_) => ErrorCode::ConnectFailed,
            DappError::NoActiveSession => ErrorCode::NoActiveSession,
            DappError::InvalidAmount { .. } => ErrorCode::InvalidAmount,
            DappError::InvalidAddress(_) => ErrorCode::InvalidAddress,
            DappError::InvalidReferralCode => ErrorCode::InvalidReferralCode,
            DappError::NotOwner => ErrorCode::NotOwner,
            DappError::AlreadyPending(_) => ErrorCode::AlreadyPending,
            DappError::TransactionRejected(_) => ErrorCode::TransactionRejected,
            DappError::TransactionReverted { .. } => ErrorCode::TransactionReverted,
            DappError::Provider(_) => ErrorCode::Provider,
        }
    }

    /// Failures caught before any provider interaction took place.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            DappError::NoActiveSession
                | DappError::InvalidAmount { .. }
                | DappError::InvalidAddress(_)
                | DappError::InvalidReferralCode
                | DappError::NotOwner
                | DappError::AlreadyPending(_)
        )
    }
}

impl From<&DappError> for ApiError {
    fn from(value: &DappError) -> Self {
        ApiError::new(value.code(), value.to_string())
    }
}

impl From<DappError> for ApiError {
    fn from(value: DappError) -> Self {
        ApiError::from(&value)
    }
}

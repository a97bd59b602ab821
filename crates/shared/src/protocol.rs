use serde::{Deserialize, Serialize};

use crate::{
    domain::{TransactionKind, WalletKind},
    error::{ApiError, DappError},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
    ConnectFailed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TransactionOutcome {
    Success { tx_hash: String },
    Failure { error: ApiError },
}

/// Terminal outcome of one write intent, handed straight to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionResult {
    pub kind: TransactionKind,
    pub outcome: TransactionOutcome,
}

impl TransactionResult {
    pub fn success(kind: TransactionKind, tx_hash: impl Into<String>) -> Self {
        Self {
            kind,
            outcome: TransactionOutcome::Success {
                tx_hash: tx_hash.into(),
            },
        }
    }

    pub fn failure(kind: TransactionKind, error: &DappError) -> Self {
        Self {
            kind,
            outcome: TransactionOutcome::Failure {
                error: error.into(),
            },
        }
    }

    pub fn from_result(kind: TransactionKind, result: &Result<String, DappError>) -> Self {
        match result {
            Ok(tx_hash) => Self::success(kind, tx_hash.clone()),
            Err(error) => Self::failure(kind, error),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, TransactionOutcome::Success { .. })
    }

    pub fn tx_hash(&self) -> Option<&str> {
        match &self.outcome {
            TransactionOutcome::Success { tx_hash } => Some(tx_hash),
            TransactionOutcome::Failure { .. } => None,
        }
    }

    /// Human-readable notification line, e.g. "Payment sent successfully!".
    pub fn notification(&self) -> String {
        match (&self.outcome, self.kind) {
            (TransactionOutcome::Success { .. }, TransactionKind::Payment) => {
                "Payment sent successfully!".to_string()
            }
            (TransactionOutcome::Success { .. }, TransactionKind::Referral) => {
                "Referral code applied successfully!".to_string()
            }
            (TransactionOutcome::Success { .. }, TransactionKind::Withdraw) => {
                "Fees withdrawn successfully!".to_string()
            }
            (TransactionOutcome::Failure { error }, TransactionKind::Payment) => {
                format!("Error sending payment: {}", error.message)
            }
            (TransactionOutcome::Failure { error }, TransactionKind::Referral) => {
                format!("Error applying referral code: {}", error.message)
            }
            (TransactionOutcome::Failure { error }, TransactionKind::Withdraw) => {
                format!("Error withdrawing fees: {}", error.message)
            }
        }
    }
}

/// Read-only view of the controller state consumed by the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub status: ConnectionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wallet: Option<WalletKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee_percentage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rewards: Option<String>,
    pub is_owner: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_error: Option<String>,
    #[serde(default)]
    pub pending: Vec<TransactionKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transaction: Option<TransactionResult>,
}

impl StateSnapshot {
    /// `0x1234...abcd` form used in headers.
    pub fn short_account(&self) -> Option<String> {
        let account = self.account.as_deref()?;
        if account.len() <= 10 {
            return Some(account.to_string());
        }
        Some(format!("{}...{}", &account[..6], &account[account.len() - 4..]))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum DappEvent {
    SessionChanged {
        #[serde(default)]
        wallet: Option<WalletKind>,
        #[serde(default)]
        account: Option<String>,
    },
    ContractStateRefreshed {
        #[serde(default)]
        fee_percentage: Option<String>,
        #[serde(default)]
        rewards: Option<String>,
        is_owner: bool,
    },
    TransactionSubmitted {
        kind: TransactionKind,
    },
    TransactionFinished(TransactionResult),
    Error(ApiError),
}

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::DappError;

/// Monotonic identifier handed to every successfully established wallet session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Wallet providers the client knows how to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WalletKind {
    MetaMask,
    TrustWallet,
    Valora,
    CeloWallet,
}

impl WalletKind {
    pub const ALL: [WalletKind; 4] = [
        WalletKind::MetaMask,
        WalletKind::TrustWallet,
        WalletKind::Valora,
        WalletKind::CeloWallet,
    ];

    /// Stable identifier used by the presentation layer and the CLI.
    pub fn id(self) -> &'static str {
        match self {
            WalletKind::MetaMask => "metamask",
            WalletKind::TrustWallet => "trustwallet",
            WalletKind::Valora => "valora",
            WalletKind::CeloWallet => "celowallet",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            WalletKind::MetaMask => "MetaMask",
            WalletKind::TrustWallet => "Trust Wallet",
            WalletKind::Valora => "Valora",
            WalletKind::CeloWallet => "Celo Wallet Extension",
        }
    }

    /// Name of the ambient global the wallet injects itself under.
    pub fn injection_key(self) -> &'static str {
        match self {
            WalletKind::MetaMask => "ethereum",
            WalletKind::TrustWallet => "trustwallet",
            WalletKind::Valora => "valora",
            WalletKind::CeloWallet => "celo",
        }
    }
}

impl fmt::Display for WalletKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for WalletKind {
    type Err = DappError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        WalletKind::ALL
            .into_iter()
            .find(|kind| kind.id().eq_ignore_ascii_case(needle))
            .ok_or_else(|| DappError::UnsupportedWallet(format!("Unknown wallet type: {needle}")))
    }
}

/// The three value-bearing contract entry points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Payment,
    Referral,
    Withdraw,
}

impl TransactionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TransactionKind::Payment => "payment",
            TransactionKind::Referral => "referral",
            TransactionKind::Withdraw => "withdraw",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

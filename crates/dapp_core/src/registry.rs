//! Wallet detection and provider construction.

use std::{collections::HashMap, fmt, sync::Arc};

use shared::{domain::WalletKind, error::DappError};

use crate::provider::{Eip1193Provider, ProviderHandle};

/// Source of the ambient, globally-scoped provider objects wallets inject.
pub trait InjectedEnvironment: Send + Sync {
    fn lookup(&self, key: &str) -> Option<Arc<dyn Eip1193Provider>>;
}

/// Explicit table of injected globals keyed by injection key (`ethereum`, `celo`, ...).
#[derive(Clone, Default)]
pub struct InjectedGlobals {
    globals: HashMap<String, Arc<dyn Eip1193Provider>>,
}

impl fmt::Debug for InjectedGlobals {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&str> = self.globals.keys().map(String::as_str).collect();
        keys.sort_unstable();
        f.debug_struct("InjectedGlobals").field("keys", &keys).finish()
    }
}

impl InjectedGlobals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, provider: Arc<dyn Eip1193Provider>) -> Self {
        self.inject(key, provider);
        self
    }

    pub fn inject(&mut self, key: impl Into<String>, provider: Arc<dyn Eip1193Provider>) {
        self.globals.insert(key.into(), provider);
    }

    pub fn is_empty(&self) -> bool {
        self.globals.is_empty()
    }
}

impl InjectedEnvironment for InjectedGlobals {
    fn lookup(&self, key: &str) -> Option<Arc<dyn Eip1193Provider>> {
        self.globals.get(key).cloned()
    }
}

#[derive(Clone)]
pub struct ProviderRegistry {
    environment: Arc<dyn InjectedEnvironment>,
}

impl ProviderRegistry {
    pub fn new(environment: Arc<dyn InjectedEnvironment>) -> Self {
        Self { environment }
    }

    pub fn detect(&self, kind: WalletKind) -> bool {
        self.environment.lookup(kind.injection_key()).is_some()
    }

    pub fn construct(&self, kind: WalletKind) -> Result<ProviderHandle, DappError> {
        match kind {
            WalletKind::Valora => Err(DappError::unimplemented_wallet(kind)),
            WalletKind::MetaMask | WalletKind::TrustWallet | WalletKind::CeloWallet => self
                .environment
                .lookup(kind.injection_key())
                .map(|provider| ProviderHandle::new(kind, provider))
                .ok_or_else(|| DappError::provider_unavailable(kind)),
        }
    }

    /// Same as [`construct`](Self::construct) for a raw wallet identifier.
    pub fn resolve(&self, wallet_id: &str) -> Result<ProviderHandle, DappError> {
        self.construct(wallet_id.parse()?)
    }

    /// Kinds that are both detected and implemented.
    pub fn available(&self) -> Vec<WalletKind> {
        WalletKind::ALL
            .into_iter()
            .filter(|kind| *kind != WalletKind::Valora && self.detect(*kind))
            .collect()
    }
}

#[cfg(test)]
#[path = "tests/registry_tests.rs"]
mod tests;

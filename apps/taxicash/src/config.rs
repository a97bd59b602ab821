use std::{collections::HashMap, fs, path::Path, sync::Arc, time::Duration};

use alloy_primitives::Address;
use anyhow::Context;
use dapp_core::{DappConfig, InjectedGlobals, JsonRpcProvider, TAXICASH_CONTRACT};
use serde::Deserialize;
use shared::domain::WalletKind;
use tracing::{debug, warn};
use url::Url;

pub const DEFAULT_CONFIG_PATH: &str = "taxicash.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    pub contract_address: String,
    pub confirmation_poll_ms: u64,
    pub metamask_rpc_url: Option<String>,
    pub trustwallet_rpc_url: Option<String>,
    pub celo_rpc_url: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            contract_address: TAXICASH_CONTRACT.to_string(),
            confirmation_poll_ms: 2_000,
            metamask_rpc_url: None,
            trustwallet_rpc_url: None,
            celo_rpc_url: None,
        }
    }
}

impl Settings {
    pub fn dapp_config(&self) -> anyhow::Result<DappConfig> {
        let contract_address = self
            .contract_address
            .trim()
            .parse::<Address>()
            .with_context(|| format!("invalid contract address '{}'", self.contract_address))?;
        Ok(DappConfig {
            contract_address,
            confirmation_poll_interval: Duration::from_millis(self.confirmation_poll_ms.max(1)),
        })
    }

    /// Endpoint standing in for the wallet's injected provider, if configured.
    pub fn rpc_url(&self, kind: WalletKind) -> Option<&str> {
        match kind {
            WalletKind::MetaMask => self.metamask_rpc_url.as_deref(),
            WalletKind::TrustWallet => self.trustwallet_rpc_url.as_deref(),
            WalletKind::CeloWallet => self.celo_rpc_url.as_deref(),
            WalletKind::Valora => None,
        }
    }

    /// Injects one JSON-RPC provider per configured wallet endpoint.
    pub fn injected_globals(&self) -> anyhow::Result<InjectedGlobals> {
        let mut globals = InjectedGlobals::new();
        for kind in WalletKind::ALL {
            let Some(raw) = self.rpc_url(kind) else {
                continue;
            };
            let url = Url::parse(raw.trim())
                .with_context(|| format!("invalid {} rpc url '{raw}'", kind.id()))?;
            let provider = JsonRpcProvider::new(url);
            debug!(wallet = kind.id(), url = %provider.url(), "config: wallet endpoint configured");
            globals.inject(kind.injection_key(), Arc::new(provider));
        }
        Ok(globals)
    }
}

pub fn load_settings(path: &Path) -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        apply_file(&mut settings, &raw);
    }
    apply_env(&mut settings, |key| std::env::var(key).ok());

    settings
}

fn apply_file(settings: &mut Settings, raw: &str) {
    let file_cfg = match toml::from_str::<HashMap<String, toml::Value>>(raw) {
        Ok(table) => table
            .into_iter()
            .filter_map(|(key, value)| scalar_string(value).map(|value| (key, value)))
            .collect::<HashMap<String, String>>(),
        Err(err) => {
            warn!(error = %err, "config: ignoring unreadable settings file");
            return;
        }
    };
    if let Some(v) = file_cfg.get("contract_address") {
        settings.contract_address = v.clone();
    }
    if let Some(v) = file_cfg.get("confirmation_poll_ms") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.confirmation_poll_ms = parsed;
        }
    }
    if let Some(v) = file_cfg.get("metamask_rpc_url") {
        settings.metamask_rpc_url = Some(v.clone());
    }
    if let Some(v) = file_cfg.get("trustwallet_rpc_url") {
        settings.trustwallet_rpc_url = Some(v.clone());
    }
    if let Some(v) = file_cfg.get("celo_rpc_url") {
        settings.celo_rpc_url = Some(v.clone());
    }
}

fn scalar_string(value: toml::Value) -> Option<String> {
    match value {
        toml::Value::String(v) => Some(v),
        toml::Value::Integer(v) => Some(v.to_string()),
        toml::Value::Float(v) => Some(v.to_string()),
        toml::Value::Boolean(v) => Some(v.to_string()),
        _ => None,
    }
}

/// `TAXICASH_<KEY>` first, then the `APP__<KEY>` alias, which wins when both are set.
fn apply_env(settings: &mut Settings, var: impl Fn(&str) -> Option<String>) {
    let lookup = |key: &str| {
        var(&format!("APP__{key}")).or_else(|| var(&format!("TAXICASH_{key}")))
    };

    if let Some(v) = lookup("CONTRACT_ADDRESS") {
        settings.contract_address = v;
    }
    if let Some(v) = lookup("CONFIRMATION_POLL_MS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.confirmation_poll_ms = parsed;
        }
    }
    if let Some(v) = lookup("METAMASK_RPC_URL") {
        settings.metamask_rpc_url = Some(v);
    }
    if let Some(v) = lookup("TRUSTWALLET_RPC_URL") {
        settings.trustwallet_rpc_url = Some(v);
    }
    if let Some(v) = lookup("CELO_RPC_URL") {
        settings.celo_rpc_url = Some(v);
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;

//! Wallet-connection and transaction-submission lifecycle for the TaxiCash client.
//!
//! ```text
//! presentation ──intent──▶ DappController ──▶ SessionManager ──▶ ProviderRegistry
//!       ▲                        │                                  (connect only)
//!       │                        └──────────▶ ContractFacade ──▶ Session signer
//!       └──── StateSnapshot / DappEvent ◀────────┘
//! ```

use std::time::Duration;

use alloy_primitives::{address, Address};

pub mod contract;
pub mod controller;
pub mod provider;
pub mod registry;
pub mod rpc;
pub mod session;
pub mod units;

#[cfg(test)]
mod testing;

pub use contract::ContractFacade;
pub use controller::{ContractState, DappController};
pub use provider::{Eip1193Provider, ProviderError, ProviderHandle, Signer};
pub use registry::{InjectedEnvironment, InjectedGlobals, ProviderRegistry};
pub use rpc::JsonRpcProvider;
pub use session::{ConnectionState, Session, SessionManager};
pub use units::{format_major_units, parse_major_units};

/// Deployed TaxiCash contract.
pub const TAXICASH_CONTRACT: Address = address!("0D5570E53d609d51b1B4f2cAFe7fA6C4b2345bCC");

const DEFAULT_CONFIRMATION_POLL_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DappConfig {
    pub contract_address: Address,
    pub confirmation_poll_interval: Duration,
}

impl Default for DappConfig {
    fn default() -> Self {
        Self {
            contract_address: TAXICASH_CONTRACT,
            confirmation_poll_interval: DEFAULT_CONFIRMATION_POLL_INTERVAL,
        }
    }
}

//! Connection state machine and the authenticated [`Session`] it produces.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use alloy_primitives::Address;
use shared::{
    domain::{SessionId, WalletKind},
    error::DappError,
    protocol::ConnectionStatus,
};
use tracing::{info, warn};

use crate::{
    provider::{lowercase_address, ProviderError, ProviderHandle, Signer},
    registry::ProviderRegistry,
};

/// Authenticated account plus the signer bound to the provider that authorized it.
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    kind: WalletKind,
    signer: Signer,
}

impl Session {
    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn kind(&self) -> WalletKind {
        self.kind
    }

    pub fn account(&self) -> Address {
        self.signer.address()
    }

    /// Lowercase `0x` hex form of [`account`](Self::account).
    pub fn account_hex(&self) -> String {
        lowercase_address(self.signer.address())
    }

    pub fn signer(&self) -> &Signer {
        &self.signer
    }

    pub fn provider(&self) -> &ProviderHandle {
        self.signer.provider()
    }
}

#[derive(Debug, Clone)]
pub enum ConnectionState {
    Disconnected,
    Connecting {
        kind: WalletKind,
        attempt: u64,
        previous: Option<Arc<Session>>,
    },
    Connected(Arc<Session>),
    ConnectFailed {
        kind: WalletKind,
        reason: String,
    },
}

impl ConnectionState {
    pub fn status(&self) -> ConnectionStatus {
        match self {
            ConnectionState::Disconnected => ConnectionStatus::Disconnected,
            ConnectionState::Connecting { .. } => ConnectionStatus::Connecting,
            ConnectionState::Connected(_) => ConnectionStatus::Connected,
            ConnectionState::ConnectFailed { .. } => ConnectionStatus::ConnectFailed,
        }
    }

    /// The active session; only `Connected` carries one.
    pub fn session(&self) -> Option<&Arc<Session>> {
        match self {
            ConnectionState::Connected(session) => Some(session),
            _ => None,
        }
    }

    pub fn failure_reason(&self) -> Option<&str> {
        match self {
            ConnectionState::ConnectFailed { reason, .. } => Some(reason),
            _ => None,
        }
    }
}

struct SessionInner {
    state: ConnectionState,
    next_attempt: u64,
    next_session: u64,
}

/// Sole writer of the current [`Session`].
pub struct SessionManager {
    registry: ProviderRegistry,
    inner: Mutex<SessionInner>,
}

impl SessionManager {
    pub fn new(registry: ProviderRegistry) -> Self {
        Self {
            registry,
            inner: Mutex::new(SessionInner {
                state: ConnectionState::Disconnected,
                next_attempt: 0,
                next_session: 0,
            }),
        }
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    pub fn state(&self) -> ConnectionState {
        self.lock().state.clone()
    }

    pub fn status(&self) -> ConnectionStatus {
        self.lock().state.status()
    }

    pub fn current(&self) -> Option<Arc<Session>> {
        self.lock().state.session().cloned()
    }

    pub fn is_current(&self, id: SessionId) -> bool {
        self.lock()
            .state
            .session()
            .is_some_and(|session| session.id() == id)
    }

    pub async fn connect_by_id(&self, wallet_id: &str) -> Result<Arc<Session>, DappError> {
        match wallet_id.parse::<WalletKind>() {
            Ok(kind) => self.connect(kind).await,
            Err(err) => {
                warn!(wallet = wallet_id, error = %err, "wallet: unknown wallet type");
                Err(err)
            }
        }
    }

    pub async fn connect(&self, kind: WalletKind) -> Result<Arc<Session>, DappError> {
        let provider = match self.registry.construct(kind) {
            Ok(provider) => provider,
            Err(err) => {
                warn!(wallet = %kind, error = %err, "wallet: provider resolution failed");
                self.record_resolution_failure(kind, &err);
                return Err(err);
            }
        };

        let attempt = {
            let mut inner = self.lock();
            inner.next_attempt += 1;
            let attempt = inner.next_attempt;
            let previous = match &inner.state {
                ConnectionState::Connected(session) => Some(Arc::clone(session)),
                ConnectionState::Connecting { previous, .. } => previous.clone(),
                _ => None,
            };
            inner.state = ConnectionState::Connecting {
                kind,
                attempt,
                previous,
            };
            attempt
        };
        info!(wallet = %kind, attempt, "wallet: requesting account access");

        let outcome = establish(&provider).await;

        let mut inner = self.lock();
        let previous = match &inner.state {
            ConnectionState::Connecting {
                attempt: current,
                previous,
                ..
            } if *current == attempt => previous.clone(),
            _ => {
                info!(wallet = %kind, attempt, "wallet: discarding superseded connection attempt");
                return Err(DappError::connect_superseded());
            }
        };

        match outcome {
            Ok(signer) => {
                inner.next_session += 1;
                let session = Arc::new(Session {
                    id: SessionId(inner.next_session),
                    kind,
                    signer,
                });
                inner.state = ConnectionState::Connected(Arc::clone(&session));
                info!(
                    wallet = %kind,
                    session_id = %session.id(),
                    account = %session.account_hex(),
                    "wallet: connected"
                );
                Ok(session)
            }
            Err(err) => {
                warn!(wallet = %kind, error = %err, "wallet: account access failed");
                let failure = DappError::connect_failed();
                inner.state = match previous {
                    Some(session) => {
                        info!(
                            session_id = %session.id(),
                            "wallet: keeping previous session after failed reconnect"
                        );
                        ConnectionState::Connected(session)
                    }
                    None => ConnectionState::ConnectFailed {
                        kind,
                        reason: failure.to_string(),
                    },
                };
                Err(failure)
            }
        }
    }

    pub fn disconnect(&self) {
        let mut inner = self.lock();
        if let Some(session) = inner.state.session() {
            info!(session_id = %session.id(), wallet = %session.kind(), "wallet: disconnected");
        }
        inner.state = ConnectionState::Disconnected;
    }

    fn record_resolution_failure(&self, kind: WalletKind, err: &DappError) {
        let mut inner = self.lock();
        if matches!(
            inner.state,
            ConnectionState::Connected(_) | ConnectionState::Connecting { .. }
        ) {
            return;
        }
        inner.state = ConnectionState::ConnectFailed {
            kind,
            reason: err.to_string(),
        };
    }

    fn lock(&self) -> MutexGuard<'_, SessionInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

async fn establish(provider: &ProviderHandle) -> Result<Signer, ProviderError> {
    let accounts = provider.request_accounts().await?;
    if accounts.is_empty() {
        return Err(ProviderError::new(
            ProviderError::UNAUTHORIZED,
            "wallet returned no accounts",
        ));
    }
    provider.get_signer().await
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;

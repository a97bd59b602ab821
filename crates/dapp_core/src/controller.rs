//! Intent handlers that tie the session, the contract and the presentation state together.

use std::{
    collections::BTreeSet,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use alloy_primitives::{hex, B256, U256};
use shared::{
    domain::{SessionId, TransactionKind, WalletKind},
    error::{ApiError, DappError},
    protocol::{DappEvent, StateSnapshot, TransactionResult},
};
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::{
    contract::ContractFacade,
    registry::ProviderRegistry,
    session::{Session, SessionManager},
    DappConfig,
};

/// Derived on-chain state, always computed for exactly one session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContractState {
    pub session_id: Option<SessionId>,
    pub fee_percentage: Option<U256>,
    pub rewards: Option<U256>,
    pub is_owner: bool,
}

impl ContractState {
    fn unloaded(session_id: SessionId) -> Self {
        Self {
            session_id: Some(session_id),
            ..Self::default()
        }
    }

    fn scoped_to(&self, session_id: Option<SessionId>) -> Self {
        if session_id.is_some() && self.session_id == session_id {
            self.clone()
        } else {
            Self {
                session_id,
                ..Self::default()
            }
        }
    }
}

#[derive(Default)]
struct ControllerState {
    contract: ContractState,
    network_error: Option<String>,
    pending: BTreeSet<TransactionKind>,
    last_transaction: Option<TransactionResult>,
}

pub struct DappController {
    sessions: SessionManager,
    contract: ContractFacade,
    state: Mutex<ControllerState>,
    events: broadcast::Sender<DappEvent>,
}

/// Marks a write kind as in flight until dropped.
struct PendingWrite<'a> {
    controller: &'a DappController,
    kind: TransactionKind,
}

impl Drop for PendingWrite<'_> {
    fn drop(&mut self) {
        self.controller.lock().pending.remove(&self.kind);
    }
}

impl DappController {
    pub fn new(registry: ProviderRegistry, config: DappConfig) -> Arc<Self> {
        let (events, _) = broadcast::channel(256);
        Arc::new(Self {
            sessions: SessionManager::new(registry),
            contract: ContractFacade::new(&config),
            state: Mutex::new(ControllerState::default()),
            events,
        })
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    pub fn contract(&self) -> &ContractFacade {
        &self.contract
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<DappEvent> {
        self.events.subscribe()
    }

    /// Contract state for the current session; defaults when none is active.
    pub fn contract_state(&self) -> ContractState {
        let session_id = self.sessions.current().map(|session| session.id());
        self.lock().contract.scoped_to(session_id)
    }

    pub fn snapshot(&self) -> StateSnapshot {
        let connection = self.sessions.state();
        let session = connection.session();
        let state = self.lock();
        let contract = state.contract.scoped_to(session.map(|session| session.id()));
        StateSnapshot {
            status: connection.status(),
            wallet: session.map(|session| session.kind()),
            account: session.map(|session| session.account_hex()),
            fee_percentage: contract.fee_percentage.map(|fee| fee.to_string()),
            rewards: contract.rewards.map(|rewards| rewards.to_string()),
            is_owner: contract.is_owner,
            network_error: state.network_error.clone(),
            pending: state.pending.iter().copied().collect(),
            last_transaction: state.last_transaction.clone(),
        }
    }

    pub async fn request_connect(&self, kind: WalletKind) -> Result<(), DappError> {
        let outcome = self.sessions.connect(kind).await;
        self.after_connect(outcome).await
    }

    pub async fn request_connect_by_id(&self, wallet_id: &str) -> Result<(), DappError> {
        let outcome = self.sessions.connect_by_id(wallet_id).await;
        self.after_connect(outcome).await
    }

    pub fn request_disconnect(&self) {
        self.sessions.disconnect();
        {
            let mut state = self.lock();
            state.contract = ContractState::default();
            state.network_error = None;
        }
        self.emit(DappEvent::SessionChanged {
            wallet: None,
            account: None,
        });
    }

    pub async fn request_payment(&self, recipient: &str, amount: &str) -> TransactionResult {
        let kind = TransactionKind::Payment;
        let (session, pending) = match self.begin_write(kind, |_, _| Ok(())) {
            Ok(begun) => begun,
            Err(err) => return self.finish_write(kind, Err(err)),
        };
        let outcome = self
            .contract
            .submit_payment(Some(&session), recipient, amount)
            .await;
        self.complete_write(kind, &session, pending, outcome).await
    }

    pub async fn request_referral(&self, code: &str) -> TransactionResult {
        let kind = TransactionKind::Referral;
        let (session, pending) = match self.begin_write(kind, |_, _| {
            if code.trim().is_empty() {
                Err(DappError::InvalidReferralCode)
            } else {
                Ok(())
            }
        }) {
            Ok(begun) => begun,
            Err(err) => return self.finish_write(kind, Err(err)),
        };
        let outcome = self.contract.submit_referral(Some(&session), code).await;
        self.complete_write(kind, &session, pending, outcome).await
    }

    pub async fn request_withdraw(&self) -> TransactionResult {
        let kind = TransactionKind::Withdraw;
        let (session, pending) = match self.begin_write(kind, |session, contract| {
            if contract.scoped_to(Some(session.id())).is_owner {
                Ok(())
            } else {
                Err(DappError::NotOwner)
            }
        }) {
            Ok(begun) => begun,
            Err(err) => return self.finish_write(kind, Err(err)),
        };
        let outcome = self.contract.submit_withdraw_fees(Some(&session)).await;
        self.complete_write(kind, &session, pending, outcome).await
    }

    /// Recomputes fee, rewards and ownership for the current session.
    pub async fn refresh(&self) -> Result<(), DappError> {
        let session = self.sessions.current().ok_or(DappError::NoActiveSession)?;
        self.refresh_for(&session).await;
        Ok(())
    }

    async fn after_connect(
        &self,
        outcome: Result<Arc<Session>, DappError>,
    ) -> Result<(), DappError> {
        match outcome {
            Ok(session) => {
                {
                    let mut state = self.lock();
                    if !self.sessions.is_current(session.id()) {
                        info!(
                            session_id = %session.id(),
                            "intent: connect result replaced by a newer session"
                        );
                        return Ok(());
                    }
                    state.network_error = None;
                    state.contract = ContractState::unloaded(session.id());
                }
                self.emit(DappEvent::SessionChanged {
                    wallet: Some(session.kind()),
                    account: Some(session.account_hex()),
                });
                self.refresh_for(&session).await;
                Ok(())
            }
            Err(err) if err.is_superseded() => {
                info!(error = %err, "intent: connect attempt superseded");
                Err(err)
            }
            Err(err) => {
                self.lock().network_error = Some(err.to_string());
                self.emit(DappEvent::Error(ApiError::from(&err)));
                Err(err)
            }
        }
    }

    async fn refresh_for(&self, session: &Session) {
        let fee = self.contract.read_fee(Some(session)).await;
        let rewards = self
            .contract
            .read_rewards(Some(session), session.account())
            .await;
        let owner = self.contract.read_owner(Some(session)).await;

        for (field, err) in [
            ("fee_percentage", fee.as_ref().err()),
            ("rewards", rewards.as_ref().err()),
            ("owner", owner.as_ref().err()),
        ] {
            if let Some(err) = err {
                warn!(session_id = %session.id(), field, error = %err, "refresh: read failed");
            }
        }

        let next = ContractState {
            session_id: Some(session.id()),
            fee_percentage: fee.ok(),
            rewards: rewards.ok(),
            is_owner: owner.is_ok_and(|owner| owner == session.account()),
        };

        if !self.sessions.is_current(session.id()) {
            info!(session_id = %session.id(), "refresh: discarding result for stale session");
            return;
        }
        self.lock().contract = next.clone();
        info!(
            session_id = %session.id(),
            fee_percentage = ?next.fee_percentage,
            rewards = ?next.rewards,
            is_owner = next.is_owner,
            "refresh: contract state updated"
        );
        self.emit(DappEvent::ContractStateRefreshed {
            fee_percentage: next.fee_percentage.map(|fee| fee.to_string()),
            rewards: next.rewards.map(|rewards| rewards.to_string()),
            is_owner: next.is_owner,
        });
    }

    fn begin_write<F>(
        &self,
        kind: TransactionKind,
        validate: F,
    ) -> Result<(Arc<Session>, PendingWrite<'_>), DappError>
    where
        F: FnOnce(&Session, &ContractState) -> Result<(), DappError>,
    {
        let session = self.sessions.current().ok_or(DappError::NoActiveSession)?;
        {
            let mut state = self.lock();
            validate(&session, &state.contract)?;
            if !state.pending.insert(kind) {
                return Err(DappError::AlreadyPending(kind));
            }
        }
        self.emit(DappEvent::TransactionSubmitted { kind });
        Ok((
            session,
            PendingWrite {
                controller: self,
                kind,
            },
        ))
    }

    async fn complete_write(
        &self,
        kind: TransactionKind,
        session: &Session,
        pending: PendingWrite<'_>,
        outcome: Result<B256, DappError>,
    ) -> TransactionResult {
        if outcome.is_ok() {
            self.refresh_for(session).await;
        }
        drop(pending);
        self.finish_write(kind, outcome.map(hex::encode_prefixed))
    }

    fn finish_write(
        &self,
        kind: TransactionKind,
        outcome: Result<String, DappError>,
    ) -> TransactionResult {
        let result = TransactionResult::from_result(kind, &outcome);
        match &outcome {
            Ok(tx_hash) => info!(kind = %kind, %tx_hash, "intent: transaction succeeded"),
            Err(err) if err.is_validation() => {
                info!(kind = %kind, error = %err, "intent: rejected before submission")
            }
            Err(err) => warn!(kind = %kind, error = %err, "intent: transaction failed"),
        }
        self.lock().last_transaction = Some(result.clone());
        self.emit(DappEvent::TransactionFinished(result.clone()));
        result
    }

    fn emit(&self, event: DappEvent) {
        let _ = self.events.send(event);
    }

    fn lock(&self) -> MutexGuard<'_, ControllerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;

//! Typed facade over the TaxiCash contract.

use std::time::Duration;

use alloy_primitives::{hex, Address, Bytes, B256, U256};
use alloy_sol_types::{sol, SolCall};
use shared::{domain::TransactionKind, error::DappError};
use tracing::{debug, info, warn};

use crate::{
    provider::{ProviderError, ProviderHandle, TransactionReceipt},
    session::Session,
    units::parse_major_units,
    DappConfig,
};

sol! {
    interface ITaxiCash {
        function FEE_PERCENTAGE() external view returns (uint256);
        function getUserRewards(address user) external view returns (uint256);
        function owner() external view returns (address);
        function sendPayment(address recipient) external payable;
        function referUser(string referralCode) external;
        function withdrawFees() external;
    }
}

pub struct ContractFacade {
    address: Address,
    poll_interval: Duration,
}

impl ContractFacade {
    pub fn new(config: &DappConfig) -> Self {
        Self {
            address: config.contract_address,
            poll_interval: config.confirmation_poll_interval,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub async fn read_fee(&self, session: Option<&Session>) -> Result<U256, DappError> {
        let session = require_session(session)?;
        self.read(session, ITaxiCash::FEE_PERCENTAGECall {}).await
    }

    pub async fn read_rewards(
        &self,
        session: Option<&Session>,
        account: Address,
    ) -> Result<U256, DappError> {
        let session = require_session(session)?;
        self.read(session, ITaxiCash::getUserRewardsCall { user: account })
            .await
    }

    pub async fn read_owner(&self, session: Option<&Session>) -> Result<Address, DappError> {
        let session = require_session(session)?;
        self.read(session, ITaxiCash::ownerCall {}).await
    }

    /// Sends `amount` (major units) to `recipient` through the contract and waits for
    /// the transaction to be confirmed.
    pub async fn submit_payment(
        &self,
        session: Option<&Session>,
        recipient: &str,
        amount: &str,
    ) -> Result<B256, DappError> {
        let session = require_session(session)?;
        let recipient = parse_address(recipient)?;
        let value = parse_major_units(amount)?;
        let data = ITaxiCash::sendPaymentCall { recipient }.abi_encode();
        self.submit(session, TransactionKind::Payment, data, Some(value))
            .await
    }

    pub async fn submit_referral(
        &self,
        session: Option<&Session>,
        code: &str,
    ) -> Result<B256, DappError> {
        let session = require_session(session)?;
        let data = ITaxiCash::referUserCall {
            referralCode: code.to_string(),
        }
        .abi_encode();
        self.submit(session, TransactionKind::Referral, data, None)
            .await
    }

    /// Owner-only on-chain; authorization failures come back as reverts.
    pub async fn submit_withdraw_fees(
        &self,
        session: Option<&Session>,
    ) -> Result<B256, DappError> {
        let session = require_session(session)?;
        let data = ITaxiCash::withdrawFeesCall {}.abi_encode();
        self.submit(session, TransactionKind::Withdraw, data, None)
            .await
    }

    async fn read<C: SolCall>(&self, session: &Session, call: C) -> Result<C::Return, DappError> {
        let output = session
            .provider()
            .call(self.address, Bytes::from(call.abi_encode()))
            .await
            .map_err(|err| {
                DappError::Provider(format!("{} call failed: {}", C::SIGNATURE, err.message))
            })?;
        C::abi_decode_returns(&output).map_err(|err| {
            DappError::Provider(format!("failed to decode {} result: {err}", C::SIGNATURE))
        })
    }

    async fn submit(
        &self,
        session: &Session,
        kind: TransactionKind,
        data: Vec<u8>,
        value: Option<U256>,
    ) -> Result<B256, DappError> {
        info!(
            kind = %kind,
            account = %session.account_hex(),
            contract = %self.address,
            "contract: submitting transaction"
        );
        let hash = session
            .signer()
            .send_transaction(self.address, Bytes::from(data), value)
            .await
            .map_err(|err| classify_submit_error(kind, err))?;
        info!(kind = %kind, tx_hash = %hash, "contract: awaiting confirmation");

        let receipt = self.wait_for_confirmation(session.provider(), hash).await?;
        if !receipt.succeeded() {
            warn!(kind = %kind, tx_hash = %hash, "contract: transaction reverted");
            return Err(DappError::TransactionReverted {
                tx_hash: Some(hex::encode_prefixed(hash)),
                reason: format!("{kind} transaction reverted on-chain"),
            });
        }
        info!(kind = %kind, tx_hash = %hash, "contract: transaction confirmed");
        Ok(hash)
    }

    async fn wait_for_confirmation(
        &self,
        provider: &ProviderHandle,
        hash: B256,
    ) -> Result<TransactionReceipt, DappError> {
        loop {
            match provider.transaction_receipt(hash).await {
                Ok(Some(receipt)) => return Ok(receipt),
                Ok(None) => {
                    debug!(tx_hash = %hash, "contract: receipt not yet available");
                    tokio::time::sleep(self.poll_interval).await;
                }
                Err(err) => {
                    let tx_hash = hex::encode_prefixed(hash);
                    warn!(%tx_hash, error = %err, "contract: receipt lookup failed");
                    return Err(DappError::Provider(format!(
                        "transaction {tx_hash} was sent but its confirmation could not be read: {}",
                        err.message
                    )));
                }
            }
        }
    }
}

fn require_session(session: Option<&Session>) -> Result<&Session, DappError> {
    session.ok_or(DappError::NoActiveSession)
}

fn parse_address(raw: &str) -> Result<Address, DappError> {
    raw.trim()
        .parse::<Address>()
        .map_err(|_| DappError::InvalidAddress(raw.to_string()))
}

fn classify_submit_error(kind: TransactionKind, err: ProviderError) -> DappError {
    if err.is_user_rejection() {
        return DappError::TransactionRejected(err.message);
    }
    if err.is_revert() {
        let reason = err.revert_reason().unwrap_or_else(|| err.message.clone());
        warn!(kind = %kind, %reason, "contract: execution reverted");
        return DappError::TransactionReverted {
            tx_hash: None,
            reason,
        };
    }
    DappError::Provider(format!("{kind} submission failed: {}", err.message))
}

#[cfg(test)]
#[path = "tests/contract_tests.rs"]
mod tests;

//! Scriptable in-memory wallet shared by the unit tests.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex,
    },
};

use alloy_primitives::{address, hex, keccak256, Address, Bytes, B256, U256};
use alloy_sol_types::SolValue;
use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::{Notify, Semaphore};

use crate::{
    provider::{Eip1193Provider, ProviderError},
    registry::{InjectedGlobals, ProviderRegistry},
    DappConfig,
};

pub(crate) const ALICE: Address = address!("ABCDEF0000000000000000000000000000001234");
pub(crate) const BOB: Address = address!("B0B0000000000000000000000000000000000B0B");
pub(crate) const RECIPIENT: Address = address!("1111000000000000000000000000000000002222");

pub(crate) const FEE_PERCENTAGE: &str = "FEE_PERCENTAGE()";
pub(crate) const GET_USER_REWARDS: &str = "getUserRewards(address)";
pub(crate) const OWNER: &str = "owner()";
pub(crate) const SEND_PAYMENT: &str = "sendPayment(address)";

fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

pub(crate) struct FakeWallet {
    accounts: Vec<Address>,
    owner: Address,
    fee: U256,
    rewards: Mutex<U256>,
    reward_per_payment: U256,
    reject_accounts: bool,
    send_error: Option<ProviderError>,
    receipt_error: Option<ProviderError>,
    receipt_status: u64,
    receipt_delay_polls: usize,
    receipt_polls: Mutex<HashMap<B256, usize>>,
    account_gate: Option<Arc<Notify>>,
    send_gate: Option<Arc<Notify>>,
    read_gate: Option<Arc<Semaphore>>,
    calls: Mutex<Vec<String>>,
    sent: Mutex<Vec<Value>>,
    tx_counter: AtomicU64,
}

impl FakeWallet {
    pub(crate) fn new(account: Address) -> Self {
        Self {
            accounts: vec![account],
            owner: BOB,
            fee: U256::from(2),
            rewards: Mutex::new(U256::from(500)),
            reward_per_payment: U256::from(10),
            reject_accounts: false,
            send_error: None,
            receipt_error: None,
            receipt_status: 1,
            receipt_delay_polls: 0,
            receipt_polls: Mutex::new(HashMap::new()),
            account_gate: None,
            send_gate: None,
            read_gate: None,
            calls: Mutex::new(Vec::new()),
            sent: Mutex::new(Vec::new()),
            tx_counter: AtomicU64::new(0),
        }
    }

    pub(crate) fn owned_by(mut self, owner: Address) -> Self {
        self.owner = owner;
        self
    }

    pub(crate) fn rejecting_accounts(mut self) -> Self {
        self.reject_accounts = true;
        self
    }

    pub(crate) fn failing_send(mut self, err: ProviderError) -> Self {
        self.send_error = Some(err);
        self
    }

    pub(crate) fn failing_receipts(mut self, err: ProviderError) -> Self {
        self.receipt_error = Some(err);
        self
    }

    pub(crate) fn with_receipt_status(mut self, status: u64) -> Self {
        self.receipt_status = status;
        self
    }

    pub(crate) fn with_receipt_delay(mut self, polls: usize) -> Self {
        self.receipt_delay_polls = polls;
        self
    }

    pub(crate) fn gated_accounts(mut self, gate: Arc<Notify>) -> Self {
        self.account_gate = Some(gate);
        self
    }

    pub(crate) fn gated_send(mut self, gate: Arc<Notify>) -> Self {
        self.send_gate = Some(gate);
        self
    }

    /// Each `eth_call` consumes one permit from `gate` before answering.
    pub(crate) fn gated_reads(mut self, gate: Arc<Semaphore>) -> Self {
        self.read_gate = Some(gate);
        self
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn count(&self, label: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| call.as_str() == label)
            .count()
    }

    pub(crate) fn sent_transactions(&self) -> Vec<Value> {
        self.sent.lock().unwrap().clone()
    }

    fn record(&self, label: impl Into<String>) {
        self.calls.lock().unwrap().push(label.into());
    }

    fn accounts_json(&self) -> Value {
        let accounts: Vec<String> = self
            .accounts
            .iter()
            .map(|account| format!("0x{}", hex::encode_upper(account)))
            .collect();
        json!(accounts)
    }

    fn handle_call(&self, params: &Value) -> Result<Value, ProviderError> {
        let data: Bytes = serde_json::from_value(params[0]["data"].clone())
            .map_err(|err| ProviderError::new(-32602, err.to_string()))?;
        let function = [FEE_PERCENTAGE, GET_USER_REWARDS, OWNER]
            .into_iter()
            .find(|signature| data.len() >= 4 && data[..4] == selector(signature))
            .ok_or_else(|| ProviderError::new(-32000, "execution reverted: unknown selector"))?;
        self.record(format!("eth_call:{function}"));

        let output = match function {
            FEE_PERCENTAGE => self.fee.abi_encode(),
            GET_USER_REWARDS => self.rewards.lock().unwrap().abi_encode(),
            _ => self.owner.abi_encode(),
        };
        Ok(json!(Bytes::from(output)))
    }

    async fn handle_send(&self, params: &Value) -> Result<Value, ProviderError> {
        self.record("eth_sendTransaction");
        if let Some(gate) = &self.send_gate {
            gate.notified().await;
        }
        if let Some(err) = &self.send_error {
            return Err(err.clone());
        }
        let tx = params[0].clone();
        let data: Bytes = serde_json::from_value(tx["data"].clone()).unwrap_or_default();
        if data.len() >= 4 && data[..4] == selector(SEND_PAYMENT) {
            let mut rewards = self.rewards.lock().unwrap();
            *rewards += self.reward_per_payment;
        }
        self.sent.lock().unwrap().push(tx);
        let n = self.tx_counter.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(json!(keccak256(n.to_be_bytes())))
    }

    fn handle_receipt(&self, params: &Value) -> Result<Value, ProviderError> {
        self.record("eth_getTransactionReceipt");
        if let Some(err) = &self.receipt_error {
            return Err(err.clone());
        }
        let hash: B256 = serde_json::from_value(params[0].clone())
            .map_err(|err| ProviderError::new(-32602, err.to_string()))?;
        let mut polls = self.receipt_polls.lock().unwrap();
        let seen = polls.entry(hash).or_insert(0);
        *seen += 1;
        if *seen <= self.receipt_delay_polls {
            return Ok(Value::Null);
        }
        Ok(json!({
            "transactionHash": hash,
            "blockNumber": "0x1",
            "status": format!("{:#x}", self.receipt_status),
        }))
    }
}

#[async_trait]
impl Eip1193Provider for FakeWallet {
    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError> {
        match method {
            "eth_requestAccounts" => {
                self.record(method);
                if let Some(gate) = &self.account_gate {
                    gate.notified().await;
                }
                if self.reject_accounts {
                    return Err(ProviderError::user_rejected());
                }
                Ok(self.accounts_json())
            }
            "eth_accounts" => {
                self.record(method);
                Ok(self.accounts_json())
            }
            "eth_call" => {
                if let Some(gate) = &self.read_gate {
                    gate.acquire().await.expect("read gate closed").forget();
                }
                self.handle_call(&params)
            }
            "eth_sendTransaction" => self.handle_send(&params).await,
            "eth_getTransactionReceipt" => self.handle_receipt(&params),
            other => Err(ProviderError::new(-32601, format!("method {other} not found"))),
        }
    }
}

pub(crate) fn fast_config() -> DappConfig {
    DappConfig {
        confirmation_poll_interval: std::time::Duration::from_millis(1),
        ..DappConfig::default()
    }
}

pub(crate) fn registry_with(globals: InjectedGlobals) -> ProviderRegistry {
    ProviderRegistry::new(Arc::new(globals))
}

pub(crate) fn metamask(wallet: &Arc<FakeWallet>) -> ProviderRegistry {
    registry_with(InjectedGlobals::new().with("ethereum", wallet.clone()))
}

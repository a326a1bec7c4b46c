//! Scripted gateway used by unit tests in place of a live RPC endpoint.

use async_trait::async_trait;
use ethers::{
    signers::LocalWallet,
    types::{Address, TransactionReceipt, H256, U256},
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::{
    error::{AppError, Result},
    models::HistoryEntry,
    services::chain_gateway::{ChainGateway, GatewayConnector, SubmittedTx, TxSubmission},
};

pub const MOCK_TX_HASH: &str = "0x00000000000000000000000000000000000000000000000000000000000000aa";

#[derive(Debug)]
struct Script {
    price: std::result::Result<f64, String>,
    quote: std::result::Result<Vec<U256>, String>,
    submit_results: VecDeque<std::result::Result<SubmittedTx, String>>,
    native_balance: U256,
    token_balance: U256,
    history: std::result::Result<Vec<HistoryEntry>, String>,
    submitted: Vec<TxSubmission>,
}

#[derive(Debug)]
pub struct MockGateway {
    script: Mutex<Script>,
    oracle_calls: AtomicUsize,
    submit_calls: AtomicUsize,
}

impl MockGateway {
    pub fn new(price: f64) -> Self {
        Self {
            script: Mutex::new(Script {
                price: Ok(price),
                quote: Ok(vec![U256::exp10(18), U256::from(35_000_000u64)]),
                submit_results: VecDeque::new(),
                native_balance: U256::zero(),
                token_balance: U256::zero(),
                history: Ok(Vec::new()),
                submitted: Vec::new(),
            }),
            oracle_calls: AtomicUsize::new(0),
            submit_calls: AtomicUsize::new(0),
        }
    }

    pub fn set_price(&self, price: f64) {
        self.script.lock().unwrap().price = Ok(price);
    }

    pub fn fail_oracle(&self, message: &str) {
        self.script.lock().unwrap().price = Err(message.to_string());
    }

    pub fn set_quote(&self, amounts: Vec<U256>) {
        self.script.lock().unwrap().quote = Ok(amounts);
    }

    pub fn fail_quote(&self, message: &str) {
        self.script.lock().unwrap().quote = Err(message.to_string());
    }

    /// Queues the outcome of the next submission. Unscripted submissions succeed.
    pub fn push_submit_result(&self, result: std::result::Result<SubmittedTx, String>) {
        self.script.lock().unwrap().submit_results.push_back(result);
    }

    pub fn set_balances(&self, native: U256, token: U256) {
        let mut script = self.script.lock().unwrap();
        script.native_balance = native;
        script.token_balance = token;
    }

    pub fn set_history(&self, history: Vec<HistoryEntry>) {
        self.script.lock().unwrap().history = Ok(history);
    }

    pub fn fail_history(&self, message: &str) {
        self.script.lock().unwrap().history = Err(message.to_string());
    }

    pub fn oracle_calls(&self) -> usize {
        self.oracle_calls.load(Ordering::SeqCst)
    }

    pub fn submit_calls(&self) -> usize {
        self.submit_calls.load(Ordering::SeqCst)
    }

    pub fn submitted(&self) -> Vec<TxSubmission> {
        self.script.lock().unwrap().submitted.clone()
    }
}

#[async_trait]
impl ChainGateway for MockGateway {
    async fn native_balance(&self, _address: Address) -> Result<U256> {
        Ok(self.script.lock().unwrap().native_balance)
    }

    async fn token_balance(&self, _token: Address, _address: Address) -> Result<U256> {
        Ok(self.script.lock().unwrap().token_balance)
    }

    async fn oracle_price(&self, _feed: Address) -> Result<f64> {
        self.oracle_calls.fetch_add(1, Ordering::SeqCst);
        self.script.lock().unwrap().price.clone().map_err(AppError::Oracle)
    }

    async fn amounts_out(&self, _amount_in: U256, _path: Vec<Address>) -> Result<Vec<U256>> {
        self.script.lock().unwrap().quote.clone().map_err(AppError::Connectivity)
    }

    async fn submit_and_confirm(&self, tx: TxSubmission) -> Result<SubmittedTx> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        let mut script = self.script.lock().unwrap();
        script.submitted.push(tx);
        script
            .submit_results
            .pop_front()
            .unwrap_or_else(|| {
                Ok(SubmittedTx {
                    hash: MOCK_TX_HASH.to_string(),
                    confirmed: true,
                })
            })
            .map_err(AppError::Submission)
    }

    async fn transaction_history(&self, _address: Address, limit: usize) -> Result<Vec<HistoryEntry>> {
        let history = self.script.lock().unwrap().history.clone();
        history
            .map(|mut entries| {
                entries.truncate(limit);
                entries
            })
            .map_err(AppError::HistoryFetch)
    }

    async fn transaction_receipt(&self, _hash: H256) -> Result<Option<TransactionReceipt>> {
        Ok(None)
    }
}

/// Hands out the same scripted gateway to every session.
pub struct MockConnector {
    pub gateway: Arc<MockGateway>,
}

impl MockConnector {
    pub fn new(gateway: Arc<MockGateway>) -> Self {
        Self { gateway }
    }
}

impl GatewayConnector for MockConnector {
    fn connect(&self, _wallet: LocalWallet) -> Result<Arc<dyn ChainGateway>> {
        Ok(self.gateway.clone())
    }
}

pub fn test_private_key() -> String {
    format!("0x{}", "11".repeat(32))
}

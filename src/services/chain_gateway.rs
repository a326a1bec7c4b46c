use async_trait::async_trait;
use ethers::{
    middleware::SignerMiddleware,
    providers::{Http, Middleware, Provider},
    signers::{LocalWallet, Signer},
    types::{Address, Bytes, TransactionReceipt, TransactionRequest, H256, U256, U64},
};
use std::sync::Arc;

use crate::{
    config::{Config, ContractAddresses},
    constants::{HISTORY_LIMIT, ORACLE_DECIMALS},
    error::{AppError, Result},
    models::HistoryEntry,
    services::transaction_history::ExplorerClient,
};

ethers::contract::abigen!(
    PriceFeed,
    r#"[
        function latestRoundData() view returns (uint80, int256, uint256, uint256, uint80)
    ]"#
);

ethers::contract::abigen!(
    JoeRouter,
    r#"[
        function getAmountsOut(uint256 amountIn, address[] path) view returns (uint256[])
    ]"#
);

ethers::contract::abigen!(
    Erc20,
    r#"[
        function balanceOf(address) view returns (uint256)
    ]"#
);

type SignerClient = SignerMiddleware<Provider<Http>, LocalWallet>;

/// A transaction ready to be signed and sent by the session wallet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxSubmission {
    pub to: Address,
    pub value: U256,
    pub data: Option<Bytes>,
    pub gas_limit: U256,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedTx {
    pub hash: String,
    /// `false` when the receipt reports a reverted execution.
    pub confirmed: bool,
}

/// Narrow interface over the RPC endpoint, the oracle, the router quote and the
/// explorer history API. One instance is bound to one wallet session.
#[async_trait]
pub trait ChainGateway: Send + Sync {
    async fn native_balance(&self, address: Address) -> Result<U256>;

    async fn token_balance(&self, token: Address, address: Address) -> Result<U256>;

    /// Latest oracle answer scaled from 8-decimal fixed point.
    async fn oracle_price(&self, feed: Address) -> Result<f64>;

    /// Router `getAmountsOut` quote for `amount_in` along `path`.
    async fn amounts_out(&self, amount_in: U256, path: Vec<Address>) -> Result<Vec<U256>>;

    /// Signs, submits and waits for one confirmation. Never retries.
    async fn submit_and_confirm(&self, tx: TxSubmission) -> Result<SubmittedTx>;

    async fn transaction_history(&self, address: Address, limit: usize) -> Result<Vec<HistoryEntry>>;

    async fn transaction_receipt(&self, hash: H256) -> Result<Option<TransactionReceipt>>;
}

/// Builds the gateway for a freshly validated wallet.
pub trait GatewayConnector: Send + Sync {
    fn connect(&self, wallet: LocalWallet) -> Result<Arc<dyn ChainGateway>>;
}

pub struct EvmConnector {
    config: Config,
    contracts: ContractAddresses,
    explorer: ExplorerClient,
}

impl EvmConnector {
    pub fn new(config: Config, contracts: ContractAddresses) -> Self {
        let explorer = ExplorerClient::new(config.explorer_api_url.clone());
        Self {
            config,
            contracts,
            explorer,
        }
    }
}

impl GatewayConnector for EvmConnector {
    fn connect(&self, wallet: LocalWallet) -> Result<Arc<dyn ChainGateway>> {
        let provider = Provider::<Http>::try_from(self.config.avalanche_rpc_url.as_str())
            .map_err(|e| AppError::Connectivity(format!("Invalid RPC URL: {}", e)))?;
        let wallet = wallet.with_chain_id(self.config.chain_id);
        let client = Arc::new(SignerMiddleware::new(provider, wallet));
        Ok(Arc::new(EvmGateway {
            client,
            contracts: self.contracts,
            explorer: self.explorer.clone(),
        }))
    }
}

pub struct EvmGateway {
    client: Arc<SignerClient>,
    contracts: ContractAddresses,
    explorer: ExplorerClient,
}

fn oracle_answer_to_price(answer: ethers::types::I256) -> Result<f64> {
    if !answer.is_positive() {
        return Err(AppError::Oracle(format!("non-positive answer {}", answer)));
    }
    let raw = answer.into_raw();
    if raw > U256::from(u128::MAX) {
        return Err(AppError::Oracle("answer out of range".to_string()));
    }
    Ok(raw.as_u128() as f64 / 10_f64.powi(ORACLE_DECIMALS as i32))
}

#[async_trait]
impl ChainGateway for EvmGateway {
    async fn native_balance(&self, address: Address) -> Result<U256> {
        self.client
            .get_balance(address, None)
            .await
            .map_err(|e| AppError::Connectivity(e.to_string()))
    }

    async fn token_balance(&self, token: Address, address: Address) -> Result<U256> {
        let erc20 = Erc20::new(token, self.client.clone());
        erc20
            .balance_of(address)
            .call()
            .await
            .map_err(|e| AppError::Connectivity(e.to_string()))
    }

    async fn oracle_price(&self, feed: Address) -> Result<f64> {
        let price_feed = PriceFeed::new(feed, self.client.clone());
        let (_round_id, answer, _started_at, _updated_at, _answered_in_round) = price_feed
            .latest_round_data()
            .call()
            .await
            .map_err(|e| AppError::Oracle(e.to_string()))?;
        oracle_answer_to_price(answer)
    }

    async fn amounts_out(&self, amount_in: U256, path: Vec<Address>) -> Result<Vec<U256>> {
        let router = JoeRouter::new(self.contracts.router, self.client.clone());
        router
            .get_amounts_out(amount_in, path)
            .call()
            .await
            .map_err(|e| AppError::Connectivity(e.to_string()))
    }

    async fn submit_and_confirm(&self, tx: TxSubmission) -> Result<SubmittedTx> {
        let mut request = TransactionRequest::new()
            .to(tx.to)
            .value(tx.value)
            .gas(tx.gas_limit);
        if let Some(data) = tx.data {
            request = request.data(data);
        }

        let pending = self
            .client
            .send_transaction(request, None)
            .await
            .map_err(|e| AppError::Submission(e.to_string()))?;
        let hash = format!("{:#x}", pending.tx_hash());
        tracing::info!("Submitted transaction {}", hash);

        let receipt = pending
            .confirmations(1)
            .await
            .map_err(|e| AppError::ConfirmationTimeout(format!("{}: {}", hash, e)))?
            .ok_or_else(|| {
                AppError::ConfirmationTimeout(format!("{}: dropped from mempool", hash))
            })?;

        Ok(SubmittedTx {
            hash: format!("{:#x}", receipt.transaction_hash),
            confirmed: receipt.status == Some(U64::from(1)),
        })
    }

    async fn transaction_history(&self, address: Address, limit: usize) -> Result<Vec<HistoryEntry>> {
        self.explorer
            .fetch_history(address, self.contracts.usdc, self.contracts.router, limit)
            .await
    }

    async fn transaction_receipt(&self, hash: H256) -> Result<Option<TransactionReceipt>> {
        self.client
            .get_transaction_receipt(hash)
            .await
            .map_err(|e| AppError::Connectivity(e.to_string()))
    }
}

/// Convenience used by the executor: history with the default page size.
pub async fn recent_history(gateway: &dyn ChainGateway, address: Address) -> Result<Vec<HistoryEntry>> {
    gateway.transaction_history(address, HISTORY_LIMIT).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::types::I256;

    #[test]
    fn oracle_answer_uses_eight_decimals() {
        let price = oracle_answer_to_price(I256::from(4_123_456_789_i64)).unwrap();
        assert!((price - 41.23456789).abs() < 1e-9);
    }

    #[test]
    fn non_positive_oracle_answer_is_an_oracle_error() {
        assert!(matches!(
            oracle_answer_to_price(I256::zero()),
            Err(AppError::Oracle(_))
        ));
        assert!(matches!(
            oracle_answer_to_price(I256::from(-5)),
            Err(AppError::Oracle(_))
        ));
    }

    #[test]
    fn connector_rejects_garbage_rpc_url() {
        let mut config = crate::config::test_config();
        config.avalanche_rpc_url = "::not-a-url::".to_string();
        let contracts = crate::config::test_config().contracts().unwrap();
        let connector = EvmConnector::new(config, contracts);
        let wallet = LocalWallet::from_bytes(&[0x11; 32]).unwrap();
        assert!(matches!(
            connector.connect(wallet),
            Err(AppError::Connectivity(_))
        ));
    }
}

use ethers::{
    abi::{self, Token},
    types::{Address, Bytes, U256},
    utils::id,
};

use crate::{
    config::{Config, ContractAddresses},
    constants::{SLIPPAGE_DENOMINATOR, SLIPPAGE_KEEP_NUMERATOR},
    services::chain_gateway::{ChainGateway, TxSubmission},
};

const SWAP_EXACT_AVAX_FOR_TOKENS: &str =
    "swapExactAVAXForTokens(uint256,address[],address,uint256)";

/// Fixed router route used for AVAX -> USDC swaps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapRoute {
    pub router: Address,
    pub path: Vec<Address>,
    pub gas_limit: U256,
    pub deadline_secs: u64,
}

impl SwapRoute {
    pub fn avax_to_usdc(config: &Config, contracts: &ContractAddresses) -> Self {
        Self {
            router: contracts.router,
            path: vec![contracts.wavax, contracts.usdc],
            gas_limit: U256::from(config.swap_gas_limit),
            deadline_secs: config.swap_deadline_secs,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapParams {
    pub amount_out_min: U256,
    pub path: Vec<Address>,
    pub recipient: Address,
    /// Unix seconds.
    pub deadline: U256,
}

/// `quoted * 99 / 100`, truncating. Split so the product never overflows.
pub fn apply_slippage_haircut(quoted: U256) -> U256 {
    let keep = U256::from(SLIPPAGE_KEEP_NUMERATOR);
    let denominator = U256::from(SLIPPAGE_DENOMINATOR);
    quoted / denominator * keep + quoted % denominator * keep / denominator
}

/// Minimum acceptable output for `amount_in` along `path`.
///
/// A failed or empty quote yields zero, which accepts any output amount.
pub async fn quote_amount_out_min(
    gateway: &dyn ChainGateway,
    amount_in: U256,
    path: Vec<Address>,
) -> U256 {
    match gateway.amounts_out(amount_in, path).await {
        Ok(amounts) => match amounts.last() {
            Some(quoted) => apply_slippage_haircut(*quoted),
            None => {
                tracing::warn!("Router returned an empty quote; amountOutMin falls back to 0");
                U256::zero()
            }
        },
        Err(e) => {
            tracing::warn!("Swap quote failed ({}); amountOutMin falls back to 0", e);
            U256::zero()
        }
    }
}

/// ABI-encodes `swapExactAVAXForTokens(amountOutMin, path, to, deadline)`.
pub fn build_swap_calldata(params: &SwapParams) -> Bytes {
    let selector = id(SWAP_EXACT_AVAX_FOR_TOKENS);
    let encoded = abi::encode(&[
        Token::Uint(params.amount_out_min),
        Token::Array(params.path.iter().copied().map(Token::Address).collect()),
        Token::Address(params.recipient),
        Token::Uint(params.deadline),
    ]);

    let mut data = Vec::with_capacity(selector.len() + encoded.len());
    data.extend_from_slice(&selector);
    data.extend_from_slice(&encoded);
    Bytes::from(data)
}

/// Quotes, encodes and packages a payable router call for `amount_in` wei.
pub async fn prepare_swap(
    gateway: &dyn ChainGateway,
    route: &SwapRoute,
    amount_in: U256,
    recipient: Address,
    now_secs: u64,
) -> TxSubmission {
    let amount_out_min = quote_amount_out_min(gateway, amount_in, route.path.clone()).await;
    tracing::debug!("Swap amountOutMin for {} wei: {}", amount_in, amount_out_min);

    let params = SwapParams {
        amount_out_min,
        path: route.path.clone(),
        recipient,
        deadline: U256::from(now_secs.saturating_add(route.deadline_secs)),
    };

    TxSubmission {
        to: route.router,
        value: amount_in,
        data: Some(build_swap_calldata(&params)),
        gas_limit: route.gas_limit,
    }
}

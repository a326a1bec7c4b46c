use ethers::types::Address;
use serde::Deserialize;
use std::env;
use std::str::FromStr;

use crate::constants::{
    CHAINLINK_AVAX_USD, DEFAULT_BLOCK_EXPLORER_URL, DEFAULT_BRIAN_API_URL, DEFAULT_CHAIN_ID,
    DEFAULT_EXPLORER_API_URL, PROMPT_RATE_LIMIT, PROMPT_RATE_WINDOW_SECS, SWAP_DEADLINE_SECS,
    SWAP_GAS_LIMIT, TRADERJOE_ROUTER, TRANSFER_GAS_LIMIT, USDC_ADDRESS, WATCH_INTERVAL_SECS,
    WAVAX_ADDRESS,
};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // Server
    pub host: String,
    pub port: u16,
    pub environment: String,

    // Blockchain
    pub avalanche_rpc_url: String,
    pub chain_id: u64,
    pub explorer_api_url: String,
    pub block_explorer_url: String,

    // Contract Addresses
    pub router_address: String,
    pub usdc_address: String,
    pub wavax_address: String,
    pub price_feed_address: String,

    // Monitor / transactions
    pub watch_interval_secs: u64,
    pub swap_deadline_secs: u64,
    pub transfer_gas_limit: u64,
    pub swap_gas_limit: u64,

    // External APIs
    pub brian_api_key: Option<String>,
    pub brian_api_url: String,

    // Rate Limiting
    pub prompt_rate_limit: u32,
    pub prompt_rate_window_secs: u64,

    // CORS
    pub cors_allowed_origins: String,
}

/// Contract addresses parsed once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContractAddresses {
    pub router: Address,
    pub usdc: Address,
    pub wavax: Address,
    pub price_feed: Address,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();

        Ok(Config {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()?,
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),

            avalanche_rpc_url: env::var("AVALANCHE_RPC_URL")?,
            chain_id: env::var("AVALANCHE_CHAIN_ID")
                .unwrap_or_else(|_| DEFAULT_CHAIN_ID.to_string())
                .parse()?,
            explorer_api_url: env::var("EXPLORER_API_URL")
                .unwrap_or_else(|_| DEFAULT_EXPLORER_API_URL.to_string()),
            block_explorer_url: env::var("BLOCK_EXPLORER_URL")
                .unwrap_or_else(|_| DEFAULT_BLOCK_EXPLORER_URL.to_string()),

            router_address: env::var("ROUTER_ADDRESS")
                .unwrap_or_else(|_| TRADERJOE_ROUTER.to_string()),
            usdc_address: env::var("USDC_ADDRESS").unwrap_or_else(|_| USDC_ADDRESS.to_string()),
            wavax_address: env::var("WAVAX_ADDRESS")
                .unwrap_or_else(|_| WAVAX_ADDRESS.to_string()),
            price_feed_address: env::var("PRICE_FEED_ADDRESS")
                .unwrap_or_else(|_| CHAINLINK_AVAX_USD.to_string()),

            watch_interval_secs: env::var("WATCH_INTERVAL_SECS")
                .unwrap_or_else(|_| WATCH_INTERVAL_SECS.to_string())
                .parse()?,
            swap_deadline_secs: env::var("SWAP_DEADLINE_SECS")
                .unwrap_or_else(|_| SWAP_DEADLINE_SECS.to_string())
                .parse()?,
            transfer_gas_limit: env::var("TRANSFER_GAS_LIMIT")
                .unwrap_or_else(|_| TRANSFER_GAS_LIMIT.to_string())
                .parse()?,
            swap_gas_limit: env::var("SWAP_GAS_LIMIT")
                .unwrap_or_else(|_| SWAP_GAS_LIMIT.to_string())
                .parse()?,

            brian_api_key: env::var("BRIAN_API_KEY")
                .ok()
                .filter(|key| !key.trim().is_empty()),
            brian_api_url: env::var("BRIAN_API_URL")
                .unwrap_or_else(|_| DEFAULT_BRIAN_API_URL.to_string()),

            prompt_rate_limit: env::var("PROMPT_RATE_LIMIT")
                .unwrap_or_else(|_| PROMPT_RATE_LIMIT.to_string())
                .parse()?,
            prompt_rate_window_secs: env::var("PROMPT_RATE_WINDOW_SECS")
                .unwrap_or_else(|_| PROMPT_RATE_WINDOW_SECS.to_string())
                .parse()?,

            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .unwrap_or_else(|_| "*".to_string()),
        })
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.avalanche_rpc_url.trim().is_empty() {
            anyhow::bail!("AVALANCHE_RPC_URL is empty");
        }
        url::Url::parse(&self.avalanche_rpc_url)
            .map_err(|e| anyhow::anyhow!("AVALANCHE_RPC_URL is not a valid URL: {}", e))?;
        url::Url::parse(&self.explorer_api_url)
            .map_err(|e| anyhow::anyhow!("EXPLORER_API_URL is not a valid URL: {}", e))?;
        if self.watch_interval_secs == 0 {
            anyhow::bail!("WATCH_INTERVAL_SECS must be > 0");
        }
        if self.transfer_gas_limit == 0 || self.swap_gas_limit == 0 {
            anyhow::bail!("Gas limits must be > 0");
        }

        self.contracts()?;

        if self.brian_api_key.is_none() {
            tracing::warn!("BRIAN_API_KEY not set; /api/v1/prompt/assist is disabled");
        }
        if self.prompt_rate_limit == 0 || self.prompt_rate_window_secs == 0 {
            tracing::warn!("Rate limit values should be > 0");
        }
        if self.cors_allowed_origins.trim().is_empty() {
            tracing::warn!("CORS_ALLOWED_ORIGINS is empty; requests may be blocked");
        }

        Ok(())
    }

    pub fn contracts(&self) -> anyhow::Result<ContractAddresses> {
        Ok(ContractAddresses {
            router: parse_contract("ROUTER_ADDRESS", &self.router_address)?,
            usdc: parse_contract("USDC_ADDRESS", &self.usdc_address)?,
            wavax: parse_contract("WAVAX_ADDRESS", &self.wavax_address)?,
            price_feed: parse_contract("PRICE_FEED_ADDRESS", &self.price_feed_address)?,
        })
    }

    pub fn is_testnet(&self) -> bool {
        self.environment == "development" || self.chain_id == DEFAULT_CHAIN_ID
    }
}

fn parse_contract(name: &str, value: &str) -> anyhow::Result<Address> {
    Address::from_str(value.trim())
        .map_err(|e| anyhow::anyhow!("{} is not a valid address ({}): {}", name, value, e))
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 3000,
        environment: "development".to_string(),
        avalanche_rpc_url: "http://127.0.0.1:9650/ext/bc/C/rpc".to_string(),
        chain_id: DEFAULT_CHAIN_ID,
        explorer_api_url: DEFAULT_EXPLORER_API_URL.to_string(),
        block_explorer_url: DEFAULT_BLOCK_EXPLORER_URL.to_string(),
        router_address: TRADERJOE_ROUTER.to_string(),
        usdc_address: USDC_ADDRESS.to_string(),
        wavax_address: WAVAX_ADDRESS.to_string(),
        price_feed_address: CHAINLINK_AVAX_USD.to_string(),
        watch_interval_secs: WATCH_INTERVAL_SECS,
        swap_deadline_secs: SWAP_DEADLINE_SECS,
        transfer_gas_limit: TRANSFER_GAS_LIMIT,
        swap_gas_limit: SWAP_GAS_LIMIT,
        brian_api_key: None,
        brian_api_url: DEFAULT_BRIAN_API_URL.to_string(),
        prompt_rate_limit: PROMPT_RATE_LIMIT,
        prompt_rate_window_secs: PROMPT_RATE_WINDOW_SECS,
        cors_allowed_origins: "*".to_string(),
    }
}

/// Application constants

// Contract addresses (Avalanche Fuji)
pub const TRADERJOE_ROUTER: &str = "0xd7f655E3376cE2D7A2b08fF01Eb3B1023191A901";
pub const USDC_ADDRESS: &str = "0x5425890298aed601595a70AB815c96711a31Bc65";
pub const WAVAX_ADDRESS: &str = "0xd00ae08403B9bbb9124bB305C09058E32C39A48c";
pub const CHAINLINK_AVAX_USD: &str = "0x5498BB86BC934c8D34FDA08E81D444153d0D06aD";

// Network
pub const DEFAULT_CHAIN_ID: u64 = 43113;
pub const DEFAULT_EXPLORER_API_URL: &str =
    "https://api.routescan.io/v2/network/testnet/evm/43113/etherscan/api";
pub const DEFAULT_BLOCK_EXPLORER_URL: &str = "https://testnet.snowtrace.io";
pub const BRIAN_NETWORK: &str = "avalanche-fuji";
pub const DEFAULT_BRIAN_API_URL: &str = "https://api.brianknows.org/api/v0";

// Decimals
pub const AVAX_DECIMALS: u32 = 18;
pub const USDC_DECIMALS: u32 = 6;
pub const ORACLE_DECIMALS: u32 = 8;

// Gas limits
pub const TRANSFER_GAS_LIMIT: u64 = 21_000;
pub const SWAP_GAS_LIMIT: u64 = 300_000;

// Swap configuration
pub const SLIPPAGE_KEEP_NUMERATOR: u64 = 99; // 1% haircut
pub const SLIPPAGE_DENOMINATOR: u64 = 100;
pub const SWAP_DEADLINE_SECS: u64 = 60 * 20;
pub const BRIAN_SLIPPAGE: &str = "0.5";

// History
pub const HISTORY_LIMIT: usize = 10;
pub const HISTORY_END_BLOCK: &str = "99999999";

// Background service intervals
pub const WATCH_INTERVAL_SECS: u64 = 30;

// Rate limits (proxied endpoints)
pub const PROMPT_RATE_LIMIT: u32 = 10;
pub const PROMPT_RATE_WINDOW_SECS: u64 = 60;

// API version
pub const API_VERSION: &str = "v1";

pub const EXAMPLE_PROMPTS: [&str; 3] = [
    "Transfer 0.1 AVAX to 0x...",
    "Swap 1 AVAX for USDC using Trader Joe",
    "Swap 1 AVAX to USDC when AVAX is above 40",
];

// All service modules
pub mod activity_log;
pub mod chain_gateway;
pub mod conditional_swap;
pub mod intent_resolver;
pub mod prompt_executor;
pub mod rate_limiter;
pub mod session;
pub mod swap_builder;
pub mod transaction_history;

#[cfg(test)]
pub mod testing;

// Re-export for convenience
pub use activity_log::ActivityLog;
pub use chain_gateway::{ChainGateway, EvmConnector, GatewayConnector};
pub use conditional_swap::ConditionalSwapMonitor;
pub use prompt_executor::PromptExecutor;
pub use rate_limiter::RateLimiter;
pub use session::SessionManager;

use ethers::{
    signers::{LocalWallet, Signer},
    types::{Address, U256},
    utils::{format_units, to_checksum},
};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::{
    config::{Config, ContractAddresses},
    constants::{AVAX_DECIMALS, USDC_DECIMALS},
    error::{AppError, Result},
    services::{
        activity_log::ActivityLog,
        chain_gateway::{ChainGateway, GatewayConnector},
        conditional_swap::ConditionalSwapMonitor,
        swap_builder::SwapRoute,
    },
    utils::{format_address, normalize_private_key},
};

/// Shared flag revoked when the wallet session ends. Timers check it before acting.
#[derive(Debug, Clone)]
pub struct Liveness(Arc<AtomicBool>);

impl Liveness {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    pub fn is_live(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn revoke(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl Default for Liveness {
    fn default() -> Self {
        Self::new()
    }
}

/// Cheap handle to the live session handed to actions and watch timers.
#[derive(Clone)]
pub struct SessionHandle {
    pub address: Address,
    pub gateway: Arc<dyn ChainGateway>,
    pub liveness: Liveness,
}

#[derive(Debug, Clone, Serialize)]
pub struct Balances {
    pub avax: String,
    pub usdc: String,
}

impl Balances {
    pub fn render(&self) -> String {
        format!("Current Balances:\nAVAX: {}\nUSDC: {}", self.avax, self.usdc)
    }
}

impl SessionHandle {
    pub async fn balances(&self, usdc: Address) -> Result<Balances> {
        let (native, token) = futures_util::future::try_join(
            self.gateway.native_balance(self.address),
            self.gateway.token_balance(usdc, self.address),
        )
        .await?;
        Ok(Balances {
            avax: format_units(native, AVAX_DECIMALS)
                .map_err(|e| AppError::Internal(e.to_string()))?,
            usdc: format_units(token, USDC_DECIMALS)
                .map_err(|e| AppError::Internal(e.to_string()))?,
        })
    }
}

/// Signing key plus the gateway bound to it. Dropped on disconnect.
struct WalletSession {
    wallet: LocalWallet,
    handle: SessionHandle,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConnectedWallet {
    pub address: String,
    pub chain_id: u64,
}

/// The operator's session: wallet, conditional-swap monitor and activity log.
pub struct SessionManager {
    config: Config,
    contracts: ContractAddresses,
    connector: Arc<dyn GatewayConnector>,
    active: RwLock<Option<WalletSession>>,
    monitor: ConditionalSwapMonitor,
    activity: ActivityLog,
}

impl SessionManager {
    pub fn new(config: Config, contracts: ContractAddresses, connector: Arc<dyn GatewayConnector>) -> Self {
        let activity = ActivityLog::new();
        let monitor = ConditionalSwapMonitor::new(
            activity.clone(),
            SwapRoute::avax_to_usdc(&config, &contracts),
            contracts.price_feed,
            Duration::from_secs(config.watch_interval_secs),
        );
        Self {
            config,
            contracts,
            connector,
            active: RwLock::new(None),
            monitor,
            activity,
        }
    }

    /// Validates the key and opens a new session, replacing any existing one.
    pub async fn connect(&self, private_key: &str) -> Result<ConnectedWallet> {
        let normalized = normalize_private_key(private_key.trim())?;
        let key_bytes = hex::decode(normalized.trim_start_matches("0x"))
            .map_err(|_| AppError::InvalidInput("Invalid private key".to_string()))?;
        // zero or out-of-range scalars are rejected here
        let wallet = LocalWallet::from_bytes(&key_bytes)
            .map_err(|_| AppError::InvalidInput("Invalid private key".to_string()))?;
        let wallet = wallet.with_chain_id(self.config.chain_id);
        let gateway = self.connector.connect(wallet.clone())?;

        self.disconnect().await;

        let address = wallet.address();
        let handle = SessionHandle {
            address,
            gateway,
            liveness: Liveness::new(),
        };
        *self.active.write().await = Some(WalletSession { wallet, handle });

        let address = to_checksum(&address, None);
        tracing::info!("Wallet connected: {}", format_address(&address));
        Ok(ConnectedWallet {
            address,
            chain_id: self.config.chain_id,
        })
    }

    /// Revokes liveness, cancels every watch timer, then discards the key.
    pub async fn disconnect(&self) -> bool {
        let mut active = self.active.write().await;
        let Some(session) = active.take() else {
            return false;
        };
        session.handle.liveness.revoke();
        self.monitor.cancel_all().await;
        let address = to_checksum(&session.wallet.address(), None);
        tracing::info!("Wallet disconnected: {}", format_address(&address));
        drop(session);
        true
    }

    /// Fails fast with `NoSession` when no wallet is connected.
    pub async fn require(&self) -> Result<SessionHandle> {
        self.active
            .read()
            .await
            .as_ref()
            .map(|session| session.handle.clone())
            .ok_or(AppError::NoSession)
    }

    pub async fn connected_address(&self) -> Option<Address> {
        self.active.read().await.as_ref().map(|s| s.handle.address)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn contracts(&self) -> &ContractAddresses {
        &self.contracts
    }

    pub fn monitor(&self) -> &ConditionalSwapMonitor {
        &self.monitor
    }

    pub fn activity(&self) -> &ActivityLog {
        &self.activity
    }

    pub fn swap_route(&self) -> SwapRoute {
        SwapRoute::avax_to_usdc(&self.config, &self.contracts)
    }

    pub fn native_amount(&self, amount: &str) -> Result<U256> {
        ethers::utils::parse_ether(amount)
            .map_err(|e| AppError::InvalidInput(format!("Invalid amount {}: {}", amount, e)))
    }
}

#[cfg(test)]
pub(crate) fn test_manager(gateway: Arc<crate::services::testing::MockGateway>) -> SessionManager {
    let config = crate::config::test_config();
    let contracts = config.contracts().unwrap();
    SessionManager::new(
        config,
        contracts,
        Arc::new(crate::services::testing::MockConnector::new(gateway)),
    )
}

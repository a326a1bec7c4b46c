use chrono::{DateTime, Utc};
use ethers::types::{Address, U256};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex, RwLock};
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::{
    error::{AppError, Result},
    models::{ActivityKind, ActivityRecord},
    services::{
        activity_log::ActivityLog,
        intent_resolver::Comparator,
        session::SessionHandle,
        swap_builder::{prepare_swap, SwapRoute},
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WatchState {
    Armed,
    Triggered,
    Failed,
}

/// One outstanding conditional swap.
#[derive(Debug, Clone, Serialize)]
pub struct PendingWatch {
    pub id: u64,
    pub amount_in: String,
    #[serde(skip)]
    pub amount_in_wei: U256,
    pub target_price: f64,
    pub comparator: Comparator,
    pub state: WatchState,
    pub created_at: DateTime<Utc>,
    pub last_checked: Option<DateTime<Utc>>,
    pub last_observed_price: Option<f64>,
    pub last_error: Option<String>,
    pub attempts: u32,
}

/// What a single tick did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Session was revoked; nothing was read or written.
    SessionClosed,
    /// Watch no longer exists.
    Retired,
    Waiting,
    Submitted(String),
    Failed(String),
}

impl TickOutcome {
    fn stops_timer(&self) -> bool {
        matches!(
            self,
            TickOutcome::SessionClosed | TickOutcome::Retired | TickOutcome::Submitted(_)
        )
    }
}

struct MonitorInner {
    watches: RwLock<HashMap<u64, PendingWatch>>,
    timers: Mutex<HashMap<u64, watch::Sender<bool>>>,
    next_id: AtomicU64,
    activity: ActivityLog,
    route: SwapRoute,
    price_feed: Address,
    period: Duration,
}

/// Owns pending watches and one recurring timer task per watch.
#[derive(Clone)]
pub struct ConditionalSwapMonitor {
    inner: Arc<MonitorInner>,
}

fn swap_description(amount_in: &str, price: f64) -> String {
    format!("Conditional Swap: {} AVAX for USDC (Price: ${})", amount_in, price)
}

fn unix_now() -> u64 {
    u64::try_from(Utc::now().timestamp()).unwrap_or(0)
}

impl ConditionalSwapMonitor {
    pub fn new(activity: ActivityLog, route: SwapRoute, price_feed: Address, period: Duration) -> Self {
        Self {
            inner: Arc::new(MonitorInner {
                watches: RwLock::new(HashMap::new()),
                timers: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
                activity,
                route,
                price_feed,
                period,
            }),
        }
    }

    /// Creates a watch and starts its timer, unless the live price already
    /// satisfies the condition.
    pub async fn arm(
        &self,
        session: &SessionHandle,
        amount_in: &str,
        target_price: f64,
        comparator: Comparator,
    ) -> Result<PendingWatch> {
        let amount_in_wei = ethers::utils::parse_ether(amount_in)
            .map_err(|e| AppError::InvalidInput(format!("Invalid amount {}: {}", amount_in, e)))?;
        if amount_in_wei.is_zero() {
            return Err(AppError::InvalidInput("Amount must be greater than zero".to_string()));
        }
        if !(target_price.is_finite() && target_price > 0.0) {
            return Err(AppError::InvalidInput("Target price must be positive".to_string()));
        }
        if !session.liveness.is_live() {
            return Err(AppError::NoSession);
        }

        let price = session.gateway.oracle_price(self.inner.price_feed).await?;
        if comparator.holds(price, target_price) {
            return Err(AppError::InvalidInput(format!(
                "Cannot set conditional swap: current AVAX price (${}) is already {} ${}",
                price,
                comparator.as_str(),
                target_price
            )));
        }

        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        let now = Utc::now();
        let watch = PendingWatch {
            id,
            amount_in: amount_in.to_string(),
            amount_in_wei,
            target_price,
            comparator,
            state: WatchState::Armed,
            created_at: now,
            last_checked: Some(now),
            last_observed_price: Some(price),
            last_error: None,
            attempts: 0,
        };

        let stop_rx = {
            let mut watches = self.inner.watches.write().await;
            // a disconnect may have landed during the oracle read
            if !session.liveness.is_live() {
                return Err(AppError::NoSession);
            }
            watches.insert(id, watch.clone());
            let (stop_tx, stop_rx) = watch::channel(false);
            self.inner.timers.lock().await.insert(id, stop_tx);
            stop_rx
        };
        self.spawn_timer(id, session.clone(), stop_rx);

        tracing::info!(
            "Armed watch {}: swap {} AVAX when AVAX is {} ${} (now ${})",
            id,
            amount_in,
            comparator.as_str(),
            target_price,
            price
        );
        Ok(watch)
    }

    fn spawn_timer(&self, id: u64, session: SessionHandle, mut stop_rx: watch::Receiver<bool>) {
        let monitor = self.clone();
        let period = self.inner.period;
        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    changed = stop_rx.changed() => {
                        if changed.is_err() || *stop_rx.borrow() {
                            break;
                        }
                        continue;
                    }
                }

                // Runs outside the select so an in-flight submission is never dropped.
                let outcome = monitor.tick(id, &session).await;
                if outcome.stops_timer() {
                    break;
                }
            }
            monitor.forget(id).await;
            tracing::debug!("Timer for watch {} stopped", id);
        });
    }

    // Drops whatever is left of a watch once its timer has exited.
    async fn forget(&self, id: u64) {
        self.inner.timers.lock().await.remove(&id);
        if self.inner.watches.write().await.remove(&id).is_some() {
            tracing::debug!("Dropped watch {} with its closed session", id);
        }
    }

    async fn stop_timer(&self, id: u64) {
        if let Some(stop_tx) = self.inner.timers.lock().await.remove(&id) {
            let _ = stop_tx.send(true);
        }
    }

    /// Re-evaluates one watch. Never holds a lock across a network call.
    pub async fn tick(&self, id: u64, session: &SessionHandle) -> TickOutcome {
        if !session.liveness.is_live() {
            return TickOutcome::SessionClosed;
        }

        let (amount_in, amount_in_wei, target_price, comparator) = {
            let watches = self.inner.watches.read().await;
            match watches.get(&id) {
                Some(w) => (w.amount_in.clone(), w.amount_in_wei, w.target_price, w.comparator),
                None => return TickOutcome::Retired,
            }
        };

        let observed = session.gateway.oracle_price(self.inner.price_feed).await;
        if !session.liveness.is_live() {
            return TickOutcome::SessionClosed;
        }

        let price = {
            let mut watches = self.inner.watches.write().await;
            let Some(watch) = watches.get_mut(&id) else {
                return TickOutcome::Retired;
            };
            watch.last_checked = Some(Utc::now());
            match observed {
                Ok(price) => {
                    watch.last_observed_price = Some(price);
                    if !comparator.holds(price, target_price) {
                        watch.state = WatchState::Armed;
                        return TickOutcome::Waiting;
                    }
                    watch.state = WatchState::Triggered;
                    watch.attempts += 1;
                    price
                }
                Err(e) => {
                    tracing::warn!("Watch {}: price check failed: {}", id, e);
                    watch.last_error = Some(e.to_string());
                    return TickOutcome::Waiting;
                }
            }
        };

        tracing::info!(
            "Watch {} triggered: AVAX ${} is {} ${}",
            id,
            price,
            comparator.as_str(),
            target_price
        );

        let tx = prepare_swap(
            session.gateway.as_ref(),
            &self.inner.route,
            amount_in_wei,
            session.address,
            unix_now(),
        )
        .await;
        if !session.liveness.is_live() {
            return TickOutcome::SessionClosed;
        }

        let description = swap_description(&amount_in, price);
        let submission = session.gateway.submit_and_confirm(tx).await;
        match submission {
            Ok(submitted) if submitted.confirmed => {
                tracing::info!("Watch {} submitted: {}", id, submitted.hash);
                self.inner
                    .activity
                    .append(ActivityRecord::success(ActivityKind::Swap, description, &submitted.hash))
                    .await;
                self.stop_timer(id).await;
                self.inner.watches.write().await.remove(&id);
                TickOutcome::Submitted(submitted.hash)
            }
            Ok(submitted) => {
                let error = format!("Transaction {} reverted", submitted.hash);
                self.record_failure(id, description, error, Some(submitted.hash)).await
            }
            Err(e) => self.record_failure(id, description, e.to_string(), None).await,
        }
    }

    async fn record_failure(
        &self,
        id: u64,
        description: String,
        error: String,
        hash: Option<String>,
    ) -> TickOutcome {
        tracing::warn!("Watch {} swap failed, retrying next tick: {}", id, error);

        let mut record = ActivityRecord::failure(ActivityKind::Swap, description, error.clone());
        if let Some(hash) = hash {
            record = record.with_hash(hash);
        }
        self.inner.activity.append(record).await;

        let mut watches = self.inner.watches.write().await;
        match watches.get_mut(&id) {
            Some(watch) => {
                watch.state = WatchState::Failed;
                watch.last_error = Some(error.clone());
                TickOutcome::Failed(error)
            }
            None => TickOutcome::Retired,
        }
    }

    /// Stops the watch's timer, then removes it. No activity record.
    pub async fn cancel(&self, id: u64) -> bool {
        self.stop_timer(id).await;
        let removed = self.inner.watches.write().await.remove(&id).is_some();
        if removed {
            tracing::info!("Cancelled watch {}", id);
        }
        removed
    }

    /// Session teardown: every timer is stopped before any watch is dropped.
    pub async fn cancel_all(&self) -> usize {
        {
            let mut timers = self.inner.timers.lock().await;
            for (_, stop_tx) in timers.drain() {
                let _ = stop_tx.send(true);
            }
        }
        let mut watches = self.inner.watches.write().await;
        let count = watches.len();
        watches.clear();
        if count > 0 {
            tracing::info!("Cancelled {} pending watch(es)", count);
        }
        count
    }

    pub async fn pending(&self) -> Vec<PendingWatch> {
        let mut watches: Vec<_> = self.inner.watches.read().await.values().cloned().collect();
        watches.sort_by_key(|w| w.id);
        watches
    }

    #[cfg(test)]
    pub async fn get(&self, id: u64) -> Option<PendingWatch> {
        self.inner.watches.read().await.get(&id).cloned()
    }

    #[cfg(test)]
    pub async fn active_timers(&self) -> usize {
        self.inner.timers.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ActivityStatus;
    use crate::services::chain_gateway::SubmittedTx;
    use crate::services::session::{Liveness, SessionHandle};
    use crate::services::testing::{MockGateway, MOCK_TX_HASH};

    struct Harness {
        monitor: ConditionalSwapMonitor,
        activity: ActivityLog,
        gateway: Arc<MockGateway>,
        session: SessionHandle,
    }

    fn harness(price: f64) -> Harness {
        let config = crate::config::test_config();
        let contracts = config.contracts().unwrap();
        let activity = ActivityLog::new();
        let monitor = ConditionalSwapMonitor::new(
            activity.clone(),
            SwapRoute::avax_to_usdc(&config, &contracts),
            contracts.price_feed,
            // long enough that only explicit ticks run in tests
            Duration::from_secs(3_600),
        );
        let gateway = Arc::new(MockGateway::new(price));
        let session = SessionHandle {
            address: Address::repeat_byte(0x42),
            gateway: gateway.clone(),
            liveness: Liveness::new(),
        };
        Harness {
            monitor,
            activity,
            gateway,
            session,
        }
    }

    #[tokio::test]
    async fn arm_is_refused_when_condition_already_holds() {
        let h = harness(45.0);
        let err = h
            .monitor
            .arm(&h.session, "1", 40.0, Comparator::Above)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(ref msg) if msg.contains("already above")));
        assert!(h.monitor.pending().await.is_empty());
        assert_eq!(h.monitor.active_timers().await, 0);
    }

    #[tokio::test]
    async fn equal_price_does_not_count_as_satisfied() {
        let h = harness(40.0);
        assert!(h.monitor.arm(&h.session, "1", 40.0, Comparator::Above).await.is_ok());
    }

    #[tokio::test]
    async fn trigger_submits_once_and_retires_watch() {
        let h = harness(35.0);
        let watch = h.monitor.arm(&h.session, "1", 40.0, Comparator::Above).await.unwrap();
        assert_eq!(watch.state, WatchState::Armed);
        assert_eq!(watch.last_observed_price, Some(35.0));

        assert_eq!(h.monitor.tick(watch.id, &h.session).await, TickOutcome::Waiting);
        assert_eq!(h.gateway.submit_calls(), 0);

        h.gateway.set_price(41.0);
        let outcome = h.monitor.tick(watch.id, &h.session).await;
        assert_eq!(outcome, TickOutcome::Submitted(MOCK_TX_HASH.to_string()));
        assert_eq!(h.gateway.submit_calls(), 1);
        assert!(h.monitor.pending().await.is_empty());
        assert_eq!(h.monitor.active_timers().await, 0);

        let records = h.activity.all().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, Some(ActivityStatus::Success));
        assert_eq!(records[0].description, "Conditional Swap: 1 AVAX for USDC (Price: $41)");

        let submitted = h.gateway.submitted();
        assert_eq!(submitted[0].value, U256::exp10(18));

        // a late tick finds nothing to do
        assert_eq!(h.monitor.tick(watch.id, &h.session).await, TickOutcome::Retired);
        assert_eq!(h.gateway.submit_calls(), 1);
    }

    #[tokio::test]
    async fn failed_submission_keeps_watch_for_retry() {
        let h = harness(35.0);
        let watch = h.monitor.arm(&h.session, "0.5", 30.0, Comparator::Below).await.unwrap();

        h.gateway.set_price(29.5);
        h.gateway.push_submit_result(Err("insufficient funds".to_string()));
        let outcome = h.monitor.tick(watch.id, &h.session).await;
        assert!(matches!(outcome, TickOutcome::Failed(ref e) if e.contains("insufficient funds")));

        let pending = h.monitor.get(watch.id).await.unwrap();
        assert_eq!(pending.state, WatchState::Failed);
        assert!(pending.last_error.as_deref().unwrap().contains("insufficient funds"));
        assert_eq!(h.monitor.active_timers().await, 1);
        assert_eq!(h.activity.all().await[0].status, Some(ActivityStatus::Failure));

        let outcome = h.monitor.tick(watch.id, &h.session).await;
        assert!(matches!(outcome, TickOutcome::Submitted(_)));
        assert_eq!(h.gateway.submit_calls(), 2);
        assert!(h.monitor.pending().await.is_empty());
    }

    #[tokio::test]
    async fn failed_watch_rearms_when_price_moves_back() {
        let h = harness(35.0);
        let watch = h.monitor.arm(&h.session, "1", 40.0, Comparator::Above).await.unwrap();

        h.gateway.set_price(41.0);
        h.gateway.push_submit_result(Err("underpriced".to_string()));
        assert!(matches!(
            h.monitor.tick(watch.id, &h.session).await,
            TickOutcome::Failed(_)
        ));
        assert_eq!(h.monitor.get(watch.id).await.unwrap().state, WatchState::Failed);

        h.gateway.set_price(38.0);
        assert_eq!(h.monitor.tick(watch.id, &h.session).await, TickOutcome::Waiting);
        let pending = h.monitor.get(watch.id).await.unwrap();
        assert_eq!(pending.state, WatchState::Armed);
        assert_eq!(pending.attempts, 1);
    }

    #[tokio::test]
    async fn reverted_receipt_counts_as_failure() {
        let h = harness(35.0);
        let watch = h.monitor.arm(&h.session, "1", 40.0, Comparator::Above).await.unwrap();
        h.gateway.set_price(50.0);
        h.gateway.push_submit_result(Ok(SubmittedTx {
            hash: "0xbad".to_string(),
            confirmed: false,
        }));

        assert!(matches!(
            h.monitor.tick(watch.id, &h.session).await,
            TickOutcome::Failed(_)
        ));
        let record = &h.activity.all().await[0];
        assert_eq!(record.hash.as_deref(), Some("0xbad"));
        assert!(h.monitor.get(watch.id).await.is_some());
    }

    #[tokio::test]
    async fn oracle_failure_updates_watch_without_record() {
        let h = harness(35.0);
        let watch = h.monitor.arm(&h.session, "1", 40.0, Comparator::Above).await.unwrap();
        h.gateway.fail_oracle("stale round");

        assert_eq!(h.monitor.tick(watch.id, &h.session).await, TickOutcome::Waiting);
        let pending = h.monitor.get(watch.id).await.unwrap();
        assert!(pending.last_error.unwrap().contains("stale round"));
        assert_eq!(pending.state, WatchState::Armed);
        assert!(h.activity.all().await.is_empty());
    }

    #[tokio::test]
    async fn tick_after_revocation_is_a_noop() {
        let h = harness(35.0);
        let watch = h.monitor.arm(&h.session, "1", 40.0, Comparator::Above).await.unwrap();
        let oracle_calls = h.gateway.oracle_calls();

        h.session.liveness.revoke();
        h.gateway.set_price(41.0);
        assert_eq!(h.monitor.tick(watch.id, &h.session).await, TickOutcome::SessionClosed);
        assert_eq!(h.gateway.oracle_calls(), oracle_calls);
        assert_eq!(h.gateway.submit_calls(), 0);
        assert!(h.activity.all().await.is_empty());
    }

    #[tokio::test]
    async fn arm_on_revoked_session_fails_fast() {
        let h = harness(35.0);
        h.session.liveness.revoke();

        let err = h
            .monitor
            .arm(&h.session, "1", 40.0, Comparator::Above)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NoSession));
        assert_eq!(h.gateway.oracle_calls(), 0);
        assert!(h.monitor.pending().await.is_empty());
        assert_eq!(h.monitor.active_timers().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn timer_drops_watch_of_closed_session() {
        let config = crate::config::test_config();
        let contracts = config.contracts().unwrap();
        let monitor = ConditionalSwapMonitor::new(
            ActivityLog::new(),
            SwapRoute::avax_to_usdc(&config, &contracts),
            contracts.price_feed,
            Duration::from_secs(30),
        );
        let gateway = Arc::new(MockGateway::new(35.0));
        let session = SessionHandle {
            address: Address::repeat_byte(0x42),
            gateway: gateway.clone(),
            liveness: Liveness::new(),
        };
        monitor.arm(&session, "1", 40.0, Comparator::Above).await.unwrap();

        // revoked without cancel_all, as when disconnect races an arm
        session.liveness.revoke();
        gateway.set_price(41.0);
        for _ in 0..10 {
            if monitor.active_timers().await > 0 {
                tokio::time::sleep(Duration::from_secs(10)).await;
            }
        }

        assert!(monitor.pending().await.is_empty());
        assert_eq!(monitor.active_timers().await, 0);
        assert_eq!(gateway.submit_calls(), 0);
    }

    #[tokio::test]
    async fn cancel_stops_timer_and_removes_watch() {
        let h = harness(35.0);
        let first = h.monitor.arm(&h.session, "1", 40.0, Comparator::Above).await.unwrap();
        let second = h.monitor.arm(&h.session, "2", 30.0, Comparator::Below).await.unwrap();
        assert_ne!(first.id, second.id);
        assert_eq!(h.monitor.active_timers().await, 2);

        assert!(h.monitor.cancel(first.id).await);
        assert!(!h.monitor.cancel(first.id).await);
        assert_eq!(h.monitor.pending().await.len(), 1);
        assert_eq!(h.monitor.active_timers().await, 1);

        assert_eq!(h.monitor.cancel_all().await, 1);
        assert_eq!(h.monitor.active_timers().await, 0);
        assert!(h.activity.all().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn timer_fires_on_interval() {
        let config = crate::config::test_config();
        let contracts = config.contracts().unwrap();
        let activity = ActivityLog::new();
        let monitor = ConditionalSwapMonitor::new(
            activity.clone(),
            SwapRoute::avax_to_usdc(&config, &contracts),
            contracts.price_feed,
            Duration::from_secs(30),
        );
        let gateway = Arc::new(MockGateway::new(35.0));
        let session = SessionHandle {
            address: Address::repeat_byte(0x42),
            gateway: gateway.clone(),
            liveness: Liveness::new(),
        };
        monitor.arm(&session, "1", 40.0, Comparator::Above).await.unwrap();
        gateway.set_price(41.0);

        for _ in 0..10 {
            if !monitor.pending().await.is_empty() {
                tokio::time::sleep(Duration::from_secs(10)).await;
            }
        }

        assert!(monitor.pending().await.is_empty());
        assert_eq!(gateway.submit_calls(), 1);
        assert_eq!(activity.all().await.len(), 1);
    }
}

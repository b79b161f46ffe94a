//src/tracker/wallet_tracker.rs
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::mpsc::unbounded_channel;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use super::coalescer::{Decision, UpdateCoalescer};
use super::enrichment::EnrichmentReader;
use super::supervisor::{ConnectionSupervisor, SubscribeSummary, SubscriptionSet};
use crate::models::AccountChange;
use crate::notifications::{DeliverySummary, Notifier};
use crate::traits::chain_feed::{AccountUpdates, ChainFeed};
use crate::utils::helper::short_address;

/// Knobs for the per-wallet pipeline
#[derive(Debug, Clone, Copy)]
pub struct TrackerSettings {
    pub cooldown: Duration,
    /// Run once more when the window reopens if a change was suppressed
    pub trailing_edge: bool,
    pub subscribe_timeout: Duration,
}

/// Enrichment followed by delivery, always against the supervisor's
/// current handle
pub struct UpdatePipeline {
    supervisor: Arc<ConnectionSupervisor>,
    reader: EnrichmentReader,
    notifier: Notifier,
}

impl UpdatePipeline {
    pub fn new(
        supervisor: Arc<ConnectionSupervisor>,
        reader: EnrichmentReader,
        notifier: Notifier,
    ) -> Self {
        Self {
            supervisor,
            reader,
            notifier,
        }
    }

    /// Build and deliver the report for one triggered change
    pub async fn process(&self, address: &str, change: &AccountChange) -> DeliverySummary {
        let feed = self.supervisor.current().await;
        let report = self.reader.build_report(feed.as_ref(), address, change).await;
        let text = report.render();

        info!("{}", text);
        let summary = self.notifier.broadcast(&text).await;
        info!(
            "Report for {} delivered to {}/{} destinations",
            short_address(address),
            summary.delivered,
            summary.delivered + summary.failed
        );
        summary
    }
}

/// Top-level orchestrator: one subscription and one worker per wallet
pub struct WalletTracker {
    addresses: Vec<String>,
    supervisor: Arc<ConnectionSupervisor>,
    pipeline: Arc<UpdatePipeline>,
    coalescers: HashMap<String, Arc<Mutex<UpdateCoalescer>>>,
    workers: DashMap<String, JoinHandle<()>>,
    /// Workers replaced by a resubscribe that were still mid-run. Their
    /// stream is closed; each exits once its run is delivered.
    retired: std::sync::Mutex<Vec<JoinHandle<()>>>,
    settings: TrackerSettings,
}

impl WalletTracker {
    pub fn new(
        addresses: Vec<String>,
        supervisor: Arc<ConnectionSupervisor>,
        pipeline: Arc<UpdatePipeline>,
        settings: TrackerSettings,
    ) -> Self {
        let coalescers = addresses
            .iter()
            .map(|address| {
                (
                    address.clone(),
                    Arc::new(Mutex::new(UpdateCoalescer::new(settings.cooldown))),
                )
            })
            .collect();

        Self {
            addresses,
            supervisor,
            pipeline,
            coalescers,
            workers: DashMap::new(),
            retired: std::sync::Mutex::new(Vec::new()),
            settings,
        }
    }

    /// Coalescing state of a tracked wallet
    pub fn coalescer(&self, address: &str) -> Option<Arc<Mutex<UpdateCoalescer>>> {
        self.coalescers.get(address).cloned()
    }

    /// Wallets whose worker is still consuming updates
    pub fn active_workers(&self) -> usize {
        self.workers
            .iter()
            .filter(|entry| !entry.value().is_finished())
            .count()
    }

    /// Subscribe everything on the current handle and start probing it
    pub async fn start(self: &Arc<Self>, probe_period: Duration) -> JoinHandle<()> {
        info!("[Tracker] Attempting to subscribe to wallet updates...");
        let feed = self.supervisor.current().await;
        let summary = self.subscribe_all(feed).await;
        info!(
            "[Tracker] Wallet tracking initialized: {} subscribed, {} failed",
            summary.subscribed, summary.failed
        );

        let subscriptions: Arc<dyn SubscriptionSet> = self.clone();
        tokio::spawn(self.supervisor.clone().run(probe_period, subscriptions))
    }

    /// Replaced workers that have not finished their last run yet
    pub fn draining_workers(&self) -> usize {
        let mut retired = self.retired_handles();
        retired.retain(|handle| !handle.is_finished());
        retired.len()
    }

    /// Stop every worker and close the live handle
    pub async fn shutdown(&self) {
        for entry in self.workers.iter() {
            entry.value().abort();
        }
        self.workers.clear();

        let retired = std::mem::take(&mut *self.retired_handles());
        let in_flight = retired.iter().filter(|h| !h.is_finished()).count();
        if in_flight > 0 {
            warn!("[Tracker] Abandoning {} in-flight reports on shutdown", in_flight);
        }
        for handle in retired {
            handle.abort();
        }

        self.supervisor.current().await.shutdown().await;
        info!("[Tracker] All subscriptions closed");
    }

    fn spawn_worker(&self, address: &str, updates: AccountUpdates) {
        let Some(coalescer) = self.coalescers.get(address).cloned() else {
            return;
        };

        let worker = tokio::spawn(run_worker(
            address.to_string(),
            updates,
            coalescer,
            self.pipeline.clone(),
            self.settings.trailing_edge,
        ));

        // The previous worker's stream ended with its handle; a run it has
        // in flight still gets delivered
        if let Some(previous) = self.workers.insert(address.to_string(), worker) {
            if !previous.is_finished() {
                debug!(
                    "[Tracker] Previous worker for {} is still draining",
                    short_address(address)
                );
                let mut retired = self.retired_handles();
                retired.retain(|handle| !handle.is_finished());
                retired.push(previous);
            }
        }
    }

    fn retired_handles(&self) -> std::sync::MutexGuard<'_, Vec<JoinHandle<()>>> {
        match self.retired.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[async_trait]
impl SubscriptionSet for WalletTracker {
    async fn subscribe_all(&self, feed: Arc<dyn ChainFeed>) -> SubscribeSummary {
        let mut summary = SubscribeSummary::default();

        for address in &self.addresses {
            info!("[Tracker] Subscribing to updates for wallet: {}", address);
            let result =
                tokio::time::timeout(self.settings.subscribe_timeout, feed.subscribe(address))
                    .await;

            match result {
                Ok(Ok(updates)) => {
                    self.spawn_worker(address, updates);
                    summary.subscribed += 1;
                }
                Ok(Err(e)) => {
                    error!("[Tracker] Error during subscription for {}: {:#}", address, e);
                    summary.failed += 1;
                }
                Err(_) => {
                    error!("[Tracker] Subscription for {} timed out", address);
                    summary.failed += 1;
                }
            }
        }

        summary
    }
}

/// Drain one wallet's updates through its coalescer. Every change is
/// stamped the moment it comes off the subscription, so one that queued up
/// behind a slow run is still judged by when it arrived. The wallet's lock
/// is held for the whole enrichment+notify run, so runs never overlap.
async fn run_worker(
    address: String,
    mut updates: AccountUpdates,
    coalescer: Arc<Mutex<UpdateCoalescer>>,
    pipeline: Arc<UpdatePipeline>,
    trailing_edge: bool,
) {
    let (stamped_tx, mut stamped) = unbounded_channel::<(Instant, AccountChange)>();

    let intake = async move {
        while let Some(change) = updates.recv().await {
            if stamped_tx.send((Instant::now(), change)).is_err() {
                break;
            }
        }
    };

    let process = async {
        loop {
            let deadline = if trailing_edge {
                coalescer.lock().await.trailing_deadline()
            } else {
                None
            };

            tokio::select! {
                next = stamped.recv() => {
                    let Some((observed_at, change)) = next else { break };

                    let mut state = coalescer.lock().await;
                    match state.on_change(observed_at, change) {
                        Decision::Proceed => {
                            pipeline.process(&address, &change).await;
                        }
                        Decision::Suppress { remaining } => {
                            debug!(
                                "Change on {} suppressed, cooldown ends in {:?}",
                                short_address(&address),
                                remaining
                            );
                        }
                    }
                }
                _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    let mut state = coalescer.lock().await;
                    if let Some(change) = state.take_trailing(Instant::now()) {
                        debug!("Trailing update for {}", short_address(&address));
                        pipeline.process(&address, &change).await;
                    }
                }
            }
        }
    };

    tokio::join!(intake, process);
    debug!("Update stream for {} closed", address);
}

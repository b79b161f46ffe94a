use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::traits::chain_feed::{ChainFeed, FeedConnector};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    Healthy,
    Reconnecting,
}

/// Result of subscribing every tracked account on a handle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubscribeSummary {
    pub subscribed: usize,
    pub failed: usize,
}

/// Anything that can (re)issue the full set of subscriptions on a handle
#[async_trait]
pub trait SubscriptionSet: Send + Sync {
    async fn subscribe_all(&self, feed: Arc<dyn ChainFeed>) -> SubscribeSummary;
}

/// Outcome of a single supervision round
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Healthy { version: String },
    Reconnected(SubscribeSummary),
    /// The probe failed and no replacement handle could be built
    ReconnectFailed,
}

/// Owns the one live feed handle. Periodically probes it and, when it stops
/// answering, swaps in a new handle and re-runs every subscription on it.
pub struct ConnectionSupervisor {
    connector: Arc<dyn FeedConnector>,
    feed: RwLock<Arc<dyn ChainFeed>>,
    state: std::sync::RwLock<SupervisorState>,
    probe_timeout: Duration,
}

impl ConnectionSupervisor {
    /// Open the initial handle
    pub async fn connect(
        connector: Arc<dyn FeedConnector>,
        probe_timeout: Duration,
    ) -> anyhow::Result<Self> {
        info!("[Connection Monitor] Connecting to {}", connector.endpoint());
        let feed = connector.connect().await?;
        Ok(Self::with_feed(connector, feed, probe_timeout))
    }

    pub fn with_feed(
        connector: Arc<dyn FeedConnector>,
        feed: Arc<dyn ChainFeed>,
        probe_timeout: Duration,
    ) -> Self {
        Self {
            connector,
            feed: RwLock::new(feed),
            state: std::sync::RwLock::new(SupervisorState::Healthy),
            probe_timeout,
        }
    }

    /// The latest live handle
    pub async fn current(&self) -> Arc<dyn ChainFeed> {
        self.feed.read().await.clone()
    }

    pub fn state(&self) -> SupervisorState {
        match self.state.read() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    fn set_state(&self, state: SupervisorState) {
        match self.state.write() {
            Ok(mut guard) => *guard = state,
            Err(poisoned) => *poisoned.into_inner() = state,
        }
    }

    /// Probe once; on failure rebuild the handle and resubscribe everything
    pub async fn check(&self, subscriptions: &dyn SubscriptionSet) -> ProbeOutcome {
        debug!("[Connection Monitor] Checking connection...");
        let feed = self.current().await;

        let failure = match tokio::time::timeout(self.probe_timeout, feed.probe_liveness()).await {
            Ok(Ok(version)) => {
                debug!("[Connection Monitor] Connected. Solana version: {}", version);
                self.set_state(SupervisorState::Healthy);
                return ProbeOutcome::Healthy { version };
            }
            Ok(Err(e)) => format!("{:#}", e),
            Err(_) => format!("probe timed out after {:?}", self.probe_timeout),
        };

        error!(
            "[Connection Monitor] Connection lost ({}). Attempting to reconnect...",
            failure
        );
        self.reconnect(subscriptions).await
    }

    async fn reconnect(&self, subscriptions: &dyn SubscriptionSet) -> ProbeOutcome {
        self.set_state(SupervisorState::Reconnecting);

        let fresh = match self.connector.connect().await {
            Ok(feed) => feed,
            Err(e) => {
                error!(
                    "[Connection Monitor] Failed to reconnect to {}: {:#}",
                    self.connector.endpoint(),
                    e
                );
                return ProbeOutcome::ReconnectFailed;
            }
        };

        let stale = {
            let mut guard = self.feed.write().await;
            std::mem::replace(&mut *guard, fresh.clone())
        };
        stale.shutdown().await;

        let summary = subscriptions.subscribe_all(fresh).await;
        if summary.failed > 0 {
            warn!(
                "[Connection Monitor] Resubscribed {} wallets, {} failed",
                summary.subscribed, summary.failed
            );
        } else {
            info!(
                "[Connection Monitor] Reconnected and resubscribed {} wallets",
                summary.subscribed
            );
        }

        self.set_state(SupervisorState::Healthy);
        ProbeOutcome::Reconnected(summary)
    }

    /// Probe every `period`, forever. The first probe fires immediately.
    pub async fn run(self: Arc<Self>, period: Duration, subscriptions: Arc<dyn SubscriptionSet>) {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            self.check(subscriptions.as_ref()).await;
        }
    }
}

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::models::{AccountChange, ChainTransaction, TokenAccountEntry};

/// Stream of account changes for one subscription. It ends when the
/// subscription is torn down.
pub type AccountUpdates = UnboundedReceiver<AccountChange>;

/// A live session against the chain: subscriptions plus on-demand reads
#[async_trait]
pub trait ChainFeed: Send + Sync {
    /// Subscribe to state changes of an account
    async fn subscribe(&self, address: &str) -> anyhow::Result<AccountUpdates>;

    /// Most recent signature involving the address, if any
    async fn latest_signature(&self, address: &str) -> anyhow::Result<Option<String>>;

    /// Parsed transaction for a signature; `None` when the node does not have it
    async fn transaction(&self, signature: &str) -> anyhow::Result<Option<ChainTransaction>>;

    /// Token-program accounts owned by the address
    async fn token_accounts(&self, address: &str) -> anyhow::Result<Vec<TokenAccountEntry>>;

    /// Cheap round-trip confirming the session still answers; returns the node version
    async fn probe_liveness(&self) -> anyhow::Result<String>;

    /// Tear down every subscription opened through this session
    async fn shutdown(&self) {}
}

/// Builds fresh sessions against the configured endpoints
#[async_trait]
pub trait FeedConnector: Send + Sync {
    async fn connect(&self) -> anyhow::Result<Arc<dyn ChainFeed>>;

    /// Endpoint description for log lines
    fn endpoint(&self) -> String;
}

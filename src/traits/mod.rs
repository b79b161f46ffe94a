//! Core traits for the wallet watcher

pub mod chain_feed;
pub mod transport;

// Re-export for convenience
pub use chain_feed::{AccountUpdates, ChainFeed, FeedConnector};
pub use transport::NotificationTransport;

//! Solana Wallet Watch Library
//!
//! Watches a fixed set of Solana wallets over websocket subscriptions and
//! posts a coalesced, enriched report to Telegram whenever one changes.

// Public modules - these are the API surface
pub mod config;
pub mod models;
pub mod traits;
pub mod providers;
pub mod notifications;
pub mod tracker;
pub mod utils;
pub mod telegram_notifier;

// Re-export commonly used items for easier access
pub use config::TrackerConfig;
pub use models::{
    AccountChange, ChainTransaction, NotificationReport, TokenAccountEntry, TokenHolding,
};
pub use notifications::{DeliverySummary, Notifier};
pub use providers::{SolanaFeed, SolanaFeedConnector};
pub use telegram_notifier::TelegramTransport;
pub use traits::{AccountUpdates, ChainFeed, FeedConnector, NotificationTransport};
pub use tracker::{
    ConnectionSupervisor, EnrichmentReader, SwapProgramSet, TrackerSettings, UpdateCoalescer,
    UpdatePipeline, WalletTracker,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Result type alias for library functions
pub type Result<T> = std::result::Result<T, anyhow::Error>;

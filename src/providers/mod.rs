//! Chain data providers

pub mod solana_feed;

// Re-export for convenience
pub use solana_feed::{SolanaFeed, SolanaFeedConnector};

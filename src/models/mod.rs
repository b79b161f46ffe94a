//! Data models for the wallet watcher

pub mod token;
pub mod transaction;
pub mod report;

// Re-export for convenience
pub use token::{TokenAccountEntry, TokenHolding};
pub use transaction::{AccountChange, ChainTransaction};
pub use report::{
    BalanceSnapshots, NotificationReport, TokenSection, TransactionSection, TransactionSummary,
};

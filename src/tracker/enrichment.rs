use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use super::swap_detection::SwapProgramSet;
use crate::models::{
    AccountChange, BalanceSnapshots, ChainTransaction, NotificationReport, TokenAccountEntry,
    TokenSection, TransactionSection, TransactionSummary,
};
use crate::traits::chain_feed::ChainFeed;

/// Turns a raw account change into a full report. Every read is guarded on
/// its own; a failing read only degrades its own section.
pub struct EnrichmentReader {
    swap_programs: SwapProgramSet,
    include_balance_snapshots: bool,
    request_timeout: Duration,
}

impl EnrichmentReader {
    pub fn new(
        swap_programs: SwapProgramSet,
        include_balance_snapshots: bool,
        request_timeout: Duration,
    ) -> Self {
        Self {
            swap_programs,
            include_balance_snapshots,
            request_timeout,
        }
    }

    /// Build the report for `address`. The native balance comes straight from
    /// the triggering change.
    pub async fn build_report(
        &self,
        feed: &dyn ChainFeed,
        address: &str,
        change: &AccountChange,
    ) -> NotificationReport {
        let (tokens, transaction) = tokio::join!(
            self.token_section(feed, address),
            self.transaction_section(feed, address)
        );

        NotificationReport {
            wallet: address.to_string(),
            lamports: change.lamports,
            tokens,
            transaction,
        }
    }

    async fn token_section(&self, feed: &dyn ChainFeed, address: &str) -> TokenSection {
        let entries = match self.guarded(feed.token_accounts(address)).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Failed to fetch token balances for {}: {:#}", address, e);
                return TokenSection::Failed;
            }
        };

        let mut holdings = Vec::with_capacity(entries.len());
        for entry in entries {
            match entry {
                TokenAccountEntry::Parsed(holding) => holdings.push(holding),
                TokenAccountEntry::Unparsable { account, reason } => {
                    warn!(
                        "Skipping token account {} of {}: {}",
                        account, address, reason
                    );
                }
            }
        }

        debug!("Found {} token holdings for {}", holdings.len(), address);
        TokenSection::Holdings(holdings)
    }

    async fn transaction_section(&self, feed: &dyn ChainFeed, address: &str) -> TransactionSection {
        let signature = match self.guarded(feed.latest_signature(address)).await {
            Ok(Some(signature)) => signature,
            Ok(None) => return TransactionSection::NoTransactions,
            Err(e) => {
                warn!("Failed to fetch signatures for {}: {:#}", address, e);
                return TransactionSection::Failed;
            }
        };

        match self.guarded(feed.transaction(&signature)).await {
            Ok(Some(tx)) => TransactionSection::Summary(self.summarize(tx)),
            Ok(None) => {
                debug!("Transaction {} not returned by node", signature);
                TransactionSection::NotFound
            }
            Err(e) => {
                warn!(
                    "Failed to fetch transaction {} for {}: {:#}",
                    signature, address, e
                );
                TransactionSection::Failed
            }
        }
    }

    /// Reduce a fetched transaction to its summary
    pub fn summarize(&self, tx: ChainTransaction) -> TransactionSummary {
        let swap_detected = self.swap_programs.detect(tx.program_ids.as_slice());

        let balances = if self.include_balance_snapshots {
            Some(BalanceSnapshots {
                pre: tx.pre_balances.unwrap_or_default(),
                post: tx.post_balances.unwrap_or_default(),
            })
        } else {
            None
        };

        TransactionSummary {
            slot: tx.slot,
            block_time: tx.block_time,
            fee_lamports: tx.fee_lamports,
            balances,
            swap_detected,
        }
    }

    async fn guarded<T, F>(&self, fut: F) -> anyhow::Result<T>
    where
        F: Future<Output = anyhow::Result<T>>,
    {
        match tokio::time::timeout(self.request_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(anyhow::anyhow!(
                "request timed out after {:?}",
                self.request_timeout
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(program_ids: &[&str]) -> ChainTransaction {
        ChainTransaction {
            slot: 7,
            block_time: None,
            fee_lamports: 5_000,
            program_ids: program_ids.iter().map(|s| s.to_string()).collect(),
            pre_balances: Some(vec![10]),
            post_balances: None,
        }
    }

    #[test]
    fn summarize_flags_swaps_and_keeps_snapshots() {
        let reader = EnrichmentReader::new(SwapProgramSet::default(), true, Duration::from_secs(1));
        let summary = reader.summarize(tx(&["JUP4Fb2cqiRUcaTHdrPC8h2gNsA2ETXiPDD33WcGuJB"]));

        assert!(summary.swap_detected);
        assert_eq!(
            summary.balances,
            Some(BalanceSnapshots { pre: vec![10], post: vec![] })
        );
    }

    #[test]
    fn summarize_without_snapshots() {
        let reader = EnrichmentReader::new(SwapProgramSet::default(), false, Duration::from_secs(1));
        let summary = reader.summarize(tx(&[]));

        assert!(!summary.swap_detected);
        assert_eq!(summary.balances, None);
        assert_eq!(summary.slot, 7);
    }
}

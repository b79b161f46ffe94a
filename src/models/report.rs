use chrono::DateTime;

use super::token::TokenHolding;
use crate::utils::helper::lamports_to_sol;

pub const NO_TOKEN_ACCOUNTS: &str = "No token accounts found.";
pub const TOKEN_FETCH_FAILED: &str = "Error fetching token balances.";
pub const NO_RECENT_TRANSACTIONS: &str = "No recent transactions found.";
pub const TRANSACTION_NOT_FOUND: &str = "Unable to fetch transaction details.";
pub const TRANSACTION_FETCH_FAILED: &str = "Error fetching transaction details.";
pub const TIMESTAMP_NOT_AVAILABLE: &str = "N/A";

/// Token lines listed before the rest are folded into a count. Keeps a
/// report well under Telegram's 4096 character message limit.
pub const MAX_TOKEN_LINES: usize = 30;

/// Lamport balances of every account touched by a transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceSnapshots {
    pub pre: Vec<u64>,
    pub post: Vec<u64>,
}

/// Summary of the most recent transaction of a wallet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionSummary {
    pub slot: u64,
    pub block_time: Option<i64>,
    pub fee_lamports: u64,
    pub balances: Option<BalanceSnapshots>,
    pub swap_detected: bool,
}

impl TransactionSummary {
    fn timestamp(&self) -> String {
        self.block_time
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .unwrap_or_else(|| TIMESTAMP_NOT_AVAILABLE.to_string())
    }

    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![
            format!("Slot: {}", self.slot),
            format!("Timestamp: {}", self.timestamp()),
            format!("Fee: {:.8} SOL", lamports_to_sol(self.fee_lamports)),
        ];

        if let Some(balances) = &self.balances {
            lines.push(format!(
                "Pre-Transaction Balances: {}",
                format_sol_list(&balances.pre)
            ));
            lines.push(format!(
                "Post-Transaction Balances: {}",
                format_sol_list(&balances.post)
            ));
        }

        let swap_status = if self.swap_detected { "YES" } else { "NO" };
        lines.push(format!("Swap Detected: {}", swap_status));
        lines
    }
}

fn format_sol_list(lamports: &[u64]) -> String {
    lamports
        .iter()
        .map(|l| format!("{:.8}", lamports_to_sol(*l)))
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenSection {
    Holdings(Vec<TokenHolding>),
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionSection {
    Summary(TransactionSummary),
    /// The address has no signatures at all
    NoTransactions,
    /// A signature exists but the node returned no transaction for it
    NotFound,
    Failed,
}

/// Everything sent out for one triggered wallet update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationReport {
    pub wallet: String,
    pub lamports: u64,
    pub tokens: TokenSection,
    pub transaction: TransactionSection,
}

impl NotificationReport {
    /// Report as ordered text lines
    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![
            "🔔 <b>Dynamic Update</b> 🔔".to_string(),
            format!("Wallet: <code>{}</code>", self.wallet),
            format!("SOL Balance: {:.8} SOL", lamports_to_sol(self.lamports)),
            String::new(),
            "Token Balances:".to_string(),
        ];

        match &self.tokens {
            TokenSection::Holdings(holdings) if holdings.is_empty() => {
                lines.push(NO_TOKEN_ACCOUNTS.to_string())
            }
            TokenSection::Holdings(holdings) => {
                lines.extend(
                    holdings
                        .iter()
                        .take(MAX_TOKEN_LINES)
                        .map(TokenHolding::report_line),
                );
                if holdings.len() > MAX_TOKEN_LINES {
                    lines.push(format!(
                        "...and {} more token accounts",
                        holdings.len() - MAX_TOKEN_LINES
                    ));
                }
            }
            TokenSection::Failed => lines.push(TOKEN_FETCH_FAILED.to_string()),
        }

        lines.push(String::new());
        lines.push("Recent Transaction Details:".to_string());

        match &self.transaction {
            TransactionSection::Summary(summary) => lines.extend(summary.lines()),
            TransactionSection::NoTransactions => lines.push(NO_RECENT_TRANSACTIONS.to_string()),
            TransactionSection::NotFound => lines.push(TRANSACTION_NOT_FOUND.to_string()),
            TransactionSection::Failed => lines.push(TRANSACTION_FETCH_FAILED.to_string()),
        }

        lines
    }

    /// Report as a single message body
    pub fn render(&self) -> String {
        self.lines().join("\n")
    }
}

/// A single SPL token holding as reported by the chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenHolding {
    pub mint: String,
    /// Human-readable amount exactly as the RPC node rendered it
    pub ui_amount_string: String,
}

impl TokenHolding {
    /// Create a new token holding
    pub fn new(mint: impl Into<String>, ui_amount_string: impl Into<String>) -> Self {
        Self {
            mint: mint.into(),
            ui_amount_string: ui_amount_string.into(),
        }
    }

    /// Report line for this holding
    pub fn report_line(&self) -> String {
        format!("Token: {}, Balance: {}", self.mint, self.ui_amount_string)
    }
}

/// One token account from an owner listing. Accounts whose data could not be
/// decoded are kept so the reader can log and skip them individually.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenAccountEntry {
    Parsed(TokenHolding),
    Unparsable { account: String, reason: String },
}

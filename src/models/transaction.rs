/// Account state pushed by an `accountSubscribe` notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountChange {
    pub lamports: u64,
    pub slot: u64,
}

impl AccountChange {
    pub fn new(lamports: u64, slot: u64) -> Self {
        Self { lamports, slot }
    }
}

/// The parts of a confirmed transaction the report cares about
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChainTransaction {
    pub slot: u64,
    /// Unix seconds; absent when the node has no block time for the slot
    pub block_time: Option<i64>,
    pub fee_lamports: u64,
    /// Program id of every top-level instruction, in order
    pub program_ids: Vec<String>,
    pub pre_balances: Option<Vec<u64>>,
    pub post_balances: Option<Vec<u64>>,
}

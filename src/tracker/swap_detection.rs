use std::collections::HashSet;

/// Swap/DEX programs flagged by default
pub const DEFAULT_SWAP_PROGRAM_IDS: [&str; 4] = [
    "RVKd61ztZW9VYGrgzeXkqUyXTN4C2xz7RtXnYmAB3Jo",
    "9xQeWvG816bUx9EPv6gSuE7iEEh7ouE9Z2w2n7aM6bZX",
    "JUP4Fb2cqiRUcaTHdrPC8h2gNsA2ETXiPDD33WcGuJB",
    "9W5kdiR2b1aGZTVysb3tYZkzDU5QbBhAsCRc5Qugosxh",
];

/// Allow-list of program ids whose presence marks a transaction as a swap.
/// Matching is exact string equality.
#[derive(Debug, Clone)]
pub struct SwapProgramSet {
    programs: HashSet<String>,
}

impl SwapProgramSet {
    pub fn new<I, S>(programs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            programs: programs.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, program_id: &str) -> bool {
        self.programs.contains(program_id)
    }

    /// True as soon as one instruction targets a listed program
    pub fn detect<S: AsRef<str>>(&self, program_ids: &[S]) -> bool {
        program_ids.iter().any(|id| self.contains(id.as_ref()))
    }

    pub fn len(&self) -> usize {
        self.programs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }
}

impl Default for SwapProgramSet {
    fn default() -> Self {
        Self::new(DEFAULT_SWAP_PROGRAM_IDS)
    }
}

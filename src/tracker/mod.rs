//! Update coalescing, enrichment, connection supervision and orchestration

pub mod coalescer;
pub mod enrichment;
pub mod supervisor;
pub mod swap_detection;
pub mod wallet_tracker;

pub use coalescer::{Decision, UpdateCoalescer, DEFAULT_COOLDOWN};
pub use enrichment::EnrichmentReader;
pub use supervisor::{
    ConnectionSupervisor, ProbeOutcome, SubscribeSummary, SubscriptionSet, SupervisorState,
};
pub use swap_detection::{SwapProgramSet, DEFAULT_SWAP_PROGRAM_IDS};
pub use wallet_tracker::{TrackerSettings, UpdatePipeline, WalletTracker};

use std::time::Duration;

use tokio::time::Instant;

use crate::models::AccountChange;

/// Default minimum gap between two reports for the same wallet
pub const DEFAULT_COOLDOWN: Duration = Duration::from_millis(15_000);

/// What to do with one observed change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Run enrichment and notify now
    Proceed,
    /// Inside the cooldown; the window reopens after `remaining`
    Suppress { remaining: Duration },
}

/// Per-wallet rate limiter. A burst of changes collapses into at most one
/// report per cooldown window.
#[derive(Debug, Clone)]
pub struct UpdateCoalescer {
    cooldown: Duration,
    last_fetch: Option<Instant>,
    /// Latest change seen while suppressed
    pending: Option<AccountChange>,
}

impl UpdateCoalescer {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_fetch: None,
            pending: None,
        }
    }

    pub fn last_fetch(&self) -> Option<Instant> {
        self.last_fetch
    }

    pub fn pending_change(&self) -> bool {
        self.pending.is_some()
    }

    /// Decide on a change that arrived at `observed_at`, however long it
    /// waited behind an earlier run. `Proceed` records `observed_at` as the
    /// new fetch time and clears the pending flag.
    pub fn on_change(&mut self, observed_at: Instant, change: AccountChange) -> Decision {
        if let Some(last) = self.last_fetch {
            let elapsed = observed_at.saturating_duration_since(last);
            if elapsed < self.cooldown {
                self.pending = Some(change);
                return Decision::Suppress {
                    remaining: self.cooldown - elapsed,
                };
            }
        }

        self.last_fetch = Some(observed_at);
        self.pending = None;
        Decision::Proceed
    }

    /// When a suppressed change is waiting, the instant its window reopens
    pub fn trailing_deadline(&self) -> Option<Instant> {
        match (self.pending, self.last_fetch) {
            (Some(_), Some(last)) => Some(last + self.cooldown),
            _ => None,
        }
    }

    /// Claim the pending change once the window has reopened, treating it as
    /// a fetch at `now`
    pub fn take_trailing(&mut self, now: Instant) -> Option<AccountChange> {
        let deadline = self.trailing_deadline()?;
        if now < deadline {
            return None;
        }
        self.last_fetch = Some(now);
        self.pending.take()
    }
}

impl Default for UpdateCoalescer {
    fn default() -> Self {
        Self::new(DEFAULT_COOLDOWN)
    }
}

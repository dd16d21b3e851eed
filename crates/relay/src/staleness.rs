/// Events older than this many seconds are not relayed.
pub const DEFAULT_STALE_AFTER_SECS: i64 = 2 * 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    Fresh,
    Stale,
}

/// True iff `now - threshold <= event_timestamp`. Saturates instead of
/// overflowing.
#[must_use]
pub fn is_fresh(event_timestamp: i64, now: i64, threshold_secs: i64) -> bool {
    now.saturating_sub(threshold_secs) <= event_timestamp
}

/// Drops replayed events after a reconnect.
#[derive(Debug, Clone, Copy)]
pub struct StalenessGuard {
    threshold_secs: i64,
}

impl Default for StalenessGuard {
    fn default() -> Self {
        Self::new(DEFAULT_STALE_AFTER_SECS)
    }
}

impl StalenessGuard {
    #[must_use]
    pub fn new(threshold_secs: i64) -> Self {
        Self { threshold_secs }
    }

    #[must_use]
    pub fn threshold_secs(&self) -> i64 {
        self.threshold_secs
    }

    #[must_use]
    pub fn check(&self, event_timestamp: i64, now: i64) -> Freshness {
        if is_fresh(event_timestamp, now, self.threshold_secs) {
            Freshness::Fresh
        } else {
            Freshness::Stale
        }
    }
}

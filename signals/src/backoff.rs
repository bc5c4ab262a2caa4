use std::{
    thread,
    time::{Duration, Instant},
};

use crossbeam_utils::Backoff;

/// Polling discipline for watchers of lock-free channels: a short exponential
/// spin, then one `yield_now` per poll.
///
/// The clock only starts once spinning is over, so the hot path never reads
/// it.
pub(crate) struct SpinWait {
    backoff: Backoff,
    interval: Duration,
    since: Option<Instant>,
}

impl SpinWait {
    pub fn new(interval: Duration) -> Self {
        Self {
            backoff: Backoff::new(),
            interval,
            since: None,
        }
    }

    /// Pauses once. Returns `true` each time another full `interval` has
    /// passed without the caller making progress.
    pub fn pause(&mut self) -> bool {
        if !self.backoff.is_completed() {
            self.backoff.snooze();
            return false;
        }

        thread::yield_now();

        let now = Instant::now();
        let since = *self.since.get_or_insert(now);
        if now.duration_since(since) >= self.interval {
            self.since = Some(now);
            return true;
        }
        false
    }
}

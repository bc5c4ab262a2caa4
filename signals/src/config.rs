use std::{fmt, str::FromStr, time::Duration};

/// Upper bound of a single blocking interval inside `Watcher::wait`.
///
/// Elapsing it is not an error: the watcher logs a warning and keeps waiting.
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(5);

/// How producers append to a channel and how watchers wait for it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// A mutex per channel serialises appends, watchers sleep on a condition
    /// variable.
    #[default]
    Locked,
    /// Appends race on the tail with compare-and-swap, watchers spin and then
    /// yield.
    LockFree,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Locked => f.write_str("locked"),
            Strategy::LockFree => f.write_str("lock-free"),
        }
    }
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "locked" => Ok(Strategy::Locked),
            "lock-free" | "lockfree" => Ok(Strategy::LockFree),
            other => Err(format!(
                "unknown strategy \"{other}\", expected \"locked\" or \"lock-free\""
            )),
        }
    }
}

/// Per-source settings, shared by every channel of the source.
///
/// Built through [`Config::default`] and the `with_*` setters, so the wait
/// timeout is never below one millisecond.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    strategy: Strategy,
    wait_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            strategy: Strategy::default(),
            wait_timeout: DEFAULT_WAIT_TIMEOUT,
        }
    }
}

impl Config {
    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn wait_timeout(&self) -> Duration {
        self.wait_timeout
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Zero is clamped to one millisecond so waits never degrade into a busy
    /// loop of timeouts.
    pub fn with_wait_timeout(mut self, timeout: Duration) -> Self {
        self.wait_timeout = timeout.max(Duration::from_millis(1));
        self
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use super::{Config, Strategy, DEFAULT_WAIT_TIMEOUT};

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.strategy(), Strategy::Locked);
        assert_eq!(config.wait_timeout(), DEFAULT_WAIT_TIMEOUT);
    }

    #[test]
    fn strategy_names() {
        for strategy in [Strategy::Locked, Strategy::LockFree] {
            assert_eq!(strategy.to_string().parse(), Ok(strategy));
        }
        assert_eq!("lockfree".parse(), Ok(Strategy::LockFree));
        assert!("spin".parse::<Strategy>().is_err());
    }

    #[test]
    fn zero_timeout_is_clamped() {
        let config = Config::default().with_wait_timeout(Duration::ZERO);
        assert_eq!(config.wait_timeout(), Duration::from_millis(1));

        let config = config.with_wait_timeout(Duration::from_micros(10));
        assert_eq!(config.wait_timeout(), Duration::from_millis(1));
        assert_eq!(
            config.with_strategy(Strategy::LockFree).wait_timeout(),
            Duration::from_millis(1)
        );
    }
}

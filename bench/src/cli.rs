use std::{num::NonZeroUsize, path::PathBuf};

use clap::Parser;
use log::LevelFilter;
use signals::Strategy;

/// Signal broadcast load driver
///
/// Every source gets all channels and one watcher per channel. Producers emit
/// `emits` rounds over every channel of their source while the watchers check
/// that each round arrives once and in order.
#[derive(Debug, Clone, Parser)]
pub struct Args {
    /// Number of channels per source
    #[arg(short, long, default_value = "10")]
    pub signals: NonZeroUsize,

    /// Number of sources
    #[arg(short = 't', long, default_value = "10")]
    pub sources: NonZeroUsize,

    /// Producer threads per source, all emitting on the same channels
    #[arg(short, long, default_value = "1")]
    pub producers: NonZeroUsize,

    /// Emit rounds per producer
    #[arg(short, long, default_value = "1000")]
    pub emits: NonZeroUsize,

    /// Number of measured runs
    #[arg(short, long, default_value = "10")]
    pub runs: NonZeroUsize,

    /// Append strategy: locked or lock-free
    #[arg(long, default_value_t = Strategy::Locked)]
    pub strategy: Strategy,

    /// Milliseconds a watcher waits before logging that it is still waiting
    #[arg(long, default_value_t = 5000)]
    pub wait_timeout_ms: u64,

    /// Shuffle the channel order of every round, starting from this seed
    #[arg(long)]
    pub seed: Option<u64>,

    /// Append the summary of all runs to this CSV file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, default_value_t = LevelFilter::Info)]
    pub log_level: LevelFilter,

    /// Colored log output
    #[arg(long)]
    pub color: bool,
}

#[cfg(test)]
mod test {
    use clap::Parser;
    use signals::Strategy;

    use super::Args;

    #[test]
    fn defaults_match_the_reference_load() {
        let args = Args::try_parse_from(["bench"]).unwrap();
        assert_eq!(args.signals.get(), 10);
        assert_eq!(args.sources.get(), 10);
        assert_eq!(args.producers.get(), 1);
        assert_eq!(args.emits.get(), 1000);
        assert_eq!(args.runs.get(), 10);
        assert_eq!(args.strategy, Strategy::Locked);
        assert!(args.output.is_none());
    }

    #[test]
    fn parses_strategy_and_counts() {
        let args =
            Args::try_parse_from(["bench", "-s", "3", "-t", "2", "--strategy", "lock-free"])
                .unwrap();
        assert_eq!(args.signals.get(), 3);
        assert_eq!(args.sources.get(), 2);
        assert_eq!(args.strategy, Strategy::LockFree);
    }

    #[test]
    fn rejects_non_positive_counts() {
        assert!(Args::try_parse_from(["bench", "-e", "0"]).is_err());
        assert!(Args::try_parse_from(["bench", "-s", "-1"]).is_err());
        assert!(Args::try_parse_from(["bench", "--strategy", "spin"]).is_err());
    }
}

use std::time::Duration;

/// Durations of the measured runs.
pub struct Trials {
    trials: Vec<Duration>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub runs: usize,
    pub min: Duration,
    pub median: Duration,
    pub max: Duration,
    pub mean: Duration,
}

impl Trials {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            trials: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, value: Duration) {
        self.trials.push(value);
    }

    pub fn len(&self) -> usize {
        self.trials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trials.is_empty()
    }

    /// Value at quantile `p` of the sorted trials, `None` while empty.
    pub fn quantile(&self, p: f64) -> Option<Duration> {
        assert!((0.0..=1.0).contains(&p));
        let mut sorted = self.trials.clone();
        sorted.sort_unstable();
        let idx = ((sorted.len().checked_sub(1)?) as f64 * p).round() as usize;
        sorted.get(idx).copied()
    }

    pub fn summary(&self) -> Option<Summary> {
        let total: Duration = self.trials.iter().sum();
        Some(Summary {
            runs: self.len(),
            min: self.quantile(0.0)?,
            median: self.quantile(0.5)?,
            max: self.quantile(1.0)?,
            mean: total / u32::try_from(self.len()).ok()?,
        })
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use super::Trials;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn summary_of_unsorted_runs() {
        let mut trials = Trials::with_capacity(5);
        for v in [50, 10, 90, 30, 70] {
            trials.push(ms(v));
        }

        let summary = trials.summary().unwrap();
        assert_eq!(summary.runs, 5);
        assert_eq!(summary.min, ms(10));
        assert_eq!(summary.median, ms(50));
        assert_eq!(summary.max, ms(90));
        assert_eq!(summary.mean, ms(50));
    }

    #[test]
    fn empty_has_no_summary() {
        let trials = Trials::with_capacity(0);
        assert!(trials.is_empty());
        assert!(trials.quantile(0.5).is_none());
        assert!(trials.summary().is_none());
    }

    #[test]
    #[should_panic]
    fn quantile_panics_on_p_above_one() {
        let mut trials = Trials::with_capacity(1);
        trials.push(ms(1));
        let _ = trials.quantile(1.1);
    }
}

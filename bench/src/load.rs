use std::{
    process, thread,
    time::{Duration, Instant},
};

use anyhow::bail;
use crossbeam_channel::unbounded;
use log::{debug, error};
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use signals::{Config, Source, Watcher};

use crate::cli::Args;

/// Payload of every emit: who sent it and in which round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Emit {
    pub producer: usize,
    pub round: usize,
}

#[derive(Debug, Clone)]
pub struct Plan {
    pub signals: Vec<String>,
    pub sources: usize,
    pub producers: usize,
    pub emits: usize,
    pub config: Config,
    pub seed: Option<u64>,
}

impl Plan {
    pub fn new(args: &Args) -> Self {
        Self {
            signals: signal_names(args.signals.get()),
            sources: args.sources.get(),
            producers: args.producers.get(),
            emits: args.emits.get(),
            config: Config::default()
                .with_strategy(args.strategy)
                .with_wait_timeout(Duration::from_millis(args.wait_timeout_ms)),
            seed: args.seed,
        }
    }

    fn watchers(&self) -> usize {
        self.sources * self.signals.len()
    }
}

/// `signal_1` up to `signal_{count}`.
pub fn signal_names(count: usize) -> Vec<String> {
    (1..=count).map(|i| format!("signal_{i}")).collect()
}

#[derive(Debug, Clone, Copy)]
pub struct RunReport {
    pub elapsed: Duration,
    pub first_watcher: Duration,
    pub last_watcher: Duration,
}

struct Delivery {
    channel: String,
    finished: Duration,
    misordered: Option<(Emit, usize)>,
}

/// Runs one measured pass: fresh sources, every watcher subscribed up front,
/// then all producer and watcher threads at once.
pub fn run(plan: &Plan) -> anyhow::Result<RunReport> {
    let sources = (0..plan.sources)
        .map(|_| Source::with_config(&plan.signals, plan.config))
        .collect::<signals::Result<Vec<Source<Emit>>>>()?;

    let mut watchers = Vec::with_capacity(plan.watchers());
    for source in &sources {
        for signal in &plan.signals {
            watchers.push(source.subscribe(signal)?);
        }
    }

    let (done_tx, done_rx) = unbounded();
    let start = Instant::now();

    let deliveries: Vec<Delivery> = thread::scope(|s| {
        for watcher in watchers {
            let done = done_tx.clone();
            s.spawn(move || {
                let _ = done.send(watch(watcher, plan.producers * plan.emits, start));
            });
        }
        drop(done_tx);

        for (index, source) in sources.iter().enumerate() {
            for producer in 0..plan.producers {
                let stream = (index * plan.producers + producer) as u64;
                let rng = plan
                    .seed
                    .map(|seed| StdRng::seed_from_u64(seed.wrapping_add(stream)));
                s.spawn(move || produce(source, &plan.signals, producer, plan.emits, rng));
            }
        }

        done_rx.iter().collect()
    });
    let elapsed = start.elapsed();

    if deliveries.len() != plan.watchers() {
        bail!(
            "only {} of {} watchers reported",
            deliveries.len(),
            plan.watchers()
        );
    }
    for delivery in &deliveries {
        if let Some((emit, expected)) = delivery.misordered {
            bail!(
                "watcher on \"{}\" received round {} of producer {} while expecting round {expected}",
                delivery.channel,
                emit.round,
                emit.producer,
            );
        }
    }

    let finished = deliveries.iter().map(|d| d.finished);
    let report = RunReport {
        elapsed,
        first_watcher: finished.clone().min().unwrap_or_default(),
        last_watcher: finished.max().unwrap_or_default(),
    };
    debug!("Run finished: {report:?}");
    Ok(report)
}

fn produce(
    source: &Source<Emit>,
    signals: &[String],
    producer: usize,
    emits: usize,
    mut rng: Option<StdRng>,
) {
    let mut order: Vec<&str> = signals.iter().map(String::as_str).collect();
    for round in 0..emits {
        if let Some(rng) = rng.as_mut() {
            order.shuffle(rng);
        }
        for signal in &order {
            if let Err(e) = source.emit(signal, Emit { producer, round }) {
                // Watchers cannot be cancelled and would wait for this round
                // forever.
                error!("Unable to emit on \"{signal}\": {e}");
                process::exit(1);
            }
        }
    }
}

// Rounds of one producer must arrive in order; producers interleave freely.
fn watch(mut watcher: Watcher<'_, Emit>, expected: usize, start: Instant) -> Delivery {
    let mut next_round = Vec::new();
    let mut misordered = None;

    for _ in 0..expected {
        let emit = *watcher.wait();
        if next_round.len() <= emit.producer {
            next_round.resize(emit.producer + 1, 0);
        }

        let want = next_round[emit.producer];
        if emit.round != want && misordered.is_none() {
            misordered = Some((emit, want));
        }
        next_round[emit.producer] = emit.round + 1;
    }

    Delivery {
        channel: watcher.channel().to_owned(),
        finished: start.elapsed(),
        misordered,
    }
}

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::bail;
use clap::Parser;
use log::{info, warn};

pub mod cli;
pub mod load;
pub mod logger;
pub mod report;
pub mod stats;

use cli::Args;
use load::Plan;
use report::Record;
use stats::Trials;

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logger::initialize(args.log_level, args.color)?;

    let exit_signal = Arc::new(AtomicBool::new(false));

    let e = exit_signal.clone();
    ctrlc::set_handler(move || {
        if e.swap(true, Ordering::Relaxed) {
            warn!("Killing");
            std::process::exit(1);
        } else {
            warn!("CTRL-C received, stopping after the current run (press again to kill)");
        }
    })?;

    let plan = Plan::new(&args);
    info!(
        "{} sources with {} signals each, {} producers per source, {} emits of each signal per producer, {} strategy",
        plan.sources,
        plan.signals.len(),
        plan.producers,
        plan.emits,
        plan.config.strategy(),
    );
    if let Some(seed) = plan.seed {
        info!("Seed: {seed}");
    }

    let mut trials = Trials::with_capacity(args.runs.get());
    for run in 0..args.runs.get() {
        if exit_signal.load(Ordering::Relaxed) {
            break;
        }

        let report = load::run(&plan)?;
        println!(
            "Run {run} took {:.3} ms (watchers done between {:.3} and {:.3} ms)",
            report.elapsed.as_secs_f64() * 1000.0,
            report.first_watcher.as_secs_f64() * 1000.0,
            report.last_watcher.as_secs_f64() * 1000.0,
        );
        trials.push(report.elapsed);
    }

    let Some(summary) = trials.summary() else {
        bail!("No run completed");
    };

    println!();
    println!("--- Summary ---");
    println!("runs:   {}", summary.runs);
    println!("mean:   {:?}", summary.mean);
    println!("median: {:?}", summary.median);
    println!("min:    {:?}", summary.min);
    println!("max:    {:?}", summary.max);

    if let Some(path) = &args.output {
        report::append(path, &Record::new(&args, &summary))?;
        info!("Summary appended to {}", path.display());
    }

    Ok(())
}

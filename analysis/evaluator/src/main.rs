//! Compares bench summaries stored under `analysis/benchmarks/`.
//!
//! Each file is written by `bench --output`, e.g.
//! `bench --strategy lock-free -p 8 --output analysis/benchmarks/LockFreeContended.csv`.
//! The last row of a file is the one evaluated.

use std::error::Error;

#[derive(serde::Deserialize)]
struct Record {
    producers: usize,
    emits: usize,
    mean: f64,
}

impl Record {
    /// Mean run time per payload a producer emitted on one channel.
    fn per_emit(&self) -> f64 {
        self.mean / (self.producers * self.emits) as f64
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let locked = load_csv("Locked")?;
    let lock_free = load_csv("LockFree")?;
    let locked_contended = load_csv("LockedContended")?;
    let lock_free_contended = load_csv("LockFreeContended")?;

    println!("--- Summary ---");
    println!();

    let single = speedup(lock_free.mean, locked.mean);
    println!(
        "lock-free {} locked with one producer per source: {:.02}x",
        text(single),
        single,
    );

    let contended = speedup(lock_free_contended.mean, locked_contended.mean);
    println!(
        "lock-free {} locked with {} producers per source: {:.02}x",
        text(contended),
        lock_free_contended.producers,
        contended,
    );

    println!();

    let locked_penalty = speedup(locked_contended.per_emit(), locked.per_emit());
    println!(
        "locked under contention {} uncontended, per emit: {:.02}x",
        text(locked_penalty),
        locked_penalty,
    );

    let lock_free_penalty = speedup(lock_free_contended.per_emit(), lock_free.per_emit());
    println!(
        "lock-free under contention {} uncontended, per emit: {:.02}x",
        text(lock_free_penalty),
        lock_free_penalty,
    );

    Ok(())
}

/// How many times faster `candidate` is than `baseline`.
fn speedup(candidate: f64, baseline: f64) -> f64 {
    1.0 / (candidate / baseline)
}

fn text(f: f64) -> &'static str {
    if f > 1. {
        "is faster than"
    } else if f < 1. {
        "is slower than"
    } else {
        "is equal to"
    }
}

fn load_csv(name: &str) -> Result<Record, Box<dyn Error>> {
    let path = format!("analysis/benchmarks/{name}.csv");
    let mut reader = csv::Reader::from_path(&path)?;
    let list: Vec<Record> = reader.deserialize().collect::<Result<_, _>>()?;
    list.into_iter()
        .last()
        .ok_or_else(|| format!("{path} holds no records").into())
}

#[cfg(test)]
mod test {
    use super::{speedup, text, Record};

    #[test]
    fn speedup_wording() {
        assert_eq!(speedup(50.0, 100.0), 2.0);
        assert_eq!(text(speedup(50.0, 100.0)), "is faster than");
        assert_eq!(text(speedup(200.0, 100.0)), "is slower than");
        assert_eq!(text(1.0), "is equal to");
    }

    #[test]
    fn per_emit_normalises_workload() {
        let one = Record {
            producers: 1,
            emits: 1000,
            mean: 10.0,
        };
        let eight = Record {
            producers: 8,
            emits: 1000,
            mean: 80.0,
        };
        assert_eq!(one.per_emit(), eight.per_emit());
    }
}

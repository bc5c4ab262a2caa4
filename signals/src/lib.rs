//! # Signals
//!
//! Named-channel broadcast queues for threads of one process.
//!
//! A [`Source`] owns a fixed set of channels. Any number of producer threads
//! [`emit`](Source::emit) payloads on a channel; every [`Watcher`] subscribed
//! to that channel receives each payload emitted after its subscription,
//! exactly once and in emission order. Watchers do not compete for payloads:
//! delivery is fan-out, not work sharing.
//!
//! Payloads travel as `Arc<T>`. The queue never copies or inspects them, and
//! a watcher gets back the very reference that was emitted.
//!
//! ## Log and reclamation
//!
//! Each channel is an append-only linked log anchored at a payload-less root
//! node. A watcher is a cursor on the last node it received. Nodes are
//! reference counted: a node stays alive while a cursor still has to pass
//! it and is freed as soon as the slowest watcher has moved on, so a channel
//! without lagging watchers holds on to a single node.
//!
//! ## Strategies
//!
//! [`Strategy::Locked`] (the default) serialises appends with a per-channel
//! mutex and lets waiting watchers sleep on a condition variable.
//! [`Strategy::LockFree`] appends with a compare-and-swap on the channel tail
//! and makes watchers spin briefly, then yield, while they wait. Both deliver
//! the same sequences.
//!
//! Waiting never fails. A wait that outlasts [`Config::wait_timeout`] is
//! logged as a warning through the `log` facade and simply continues.

use libc::c_int;

mod backoff;
pub mod broadcast;
pub mod config;
pub mod error;
mod node;
pub mod source;
pub mod sync;
pub mod watcher;

pub use broadcast::BroadcastQueue;
pub use config::{Config, Strategy, DEFAULT_WAIT_TIMEOUT};
pub use error::{Result, SignalError};
pub use source::{ChannelRegistry, Source};
pub use watcher::Watcher;

pub trait CheckOk<R> {
    fn r(self, op: &'static str) -> Result<R>;
}

impl CheckOk<()> for c_int {
    fn r(self, op: &'static str) -> Result<()> {
        if self != 0 {
            return Err(SignalError::Sync { op, code: self });
        }
        Ok(())
    }
}

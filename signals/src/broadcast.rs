use std::{
    fmt, mem,
    sync::{
        atomic::{AtomicPtr, AtomicU64, AtomicUsize, Ordering},
        Arc,
    },
};

use crossbeam_utils::{Backoff, CachePadded};
use log::trace;

use crate::{
    config::{Config, Strategy},
    error::Result,
    node::Node,
    sync::{Condvar, Mutex},
    watcher::Watcher,
};

/// Append-only log of one channel, read independently by any number of
/// watchers.
///
/// The log starts at a payload-less root node. `tail` plays the part of
/// `root.prev`: it always points at the newest node (the root itself while the
/// channel is empty) and owns one strong reference to it. Following `next`
/// from any node yields the emission order, the same for every observer.
///
/// Producers only contend on `tail`. Under [`Strategy::Locked`] they take the
/// channel mutex and broadcast `event` after linking. Under
/// [`Strategy::LockFree`] they race on `tail` with compare-and-swap and link
/// the previous tail afterwards; readers that get there first spin until the
/// link lands. A lock-free producer only touches a mutex when it retires a
/// tail that a concurrent subscriber may still be cloning.
pub struct BroadcastQueue<T> {
    name: String,
    config: Config,
    tail: CachePadded<AtomicPtr<Node<T>>>,
    emitted: AtomicU64,
    pub(crate) lock: Mutex<()>,
    pub(crate) event: Condvar,
    // Lock-free subscribers between loading `tail` and owning a reference.
    pins: AtomicUsize,
    // Replaced tails that could not be released while a pin was held.
    retired: Mutex<Vec<Arc<Node<T>>>>,
}

impl<T> BroadcastQueue<T> {
    pub fn new(name: impl Into<String>, config: Config) -> Result<Self> {
        let lock = Mutex::new(())?;
        let event = Condvar::new()?;
        let retired = Mutex::new(Vec::new())?;
        let root = Arc::into_raw(Node::root()).cast_mut();

        Ok(Self {
            name: name.into(),
            config,
            tail: CachePadded::new(AtomicPtr::new(root)),
            emitted: AtomicU64::new(0),
            lock,
            event,
            pins: AtomicUsize::new(0),
            retired,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Number of payloads appended so far.
    pub fn emitted(&self) -> u64 {
        self.emitted.load(Ordering::Relaxed)
    }

    /// Appends `payload` and wakes every watcher blocked on this channel.
    ///
    /// Never blocks on the absence of readers; with [`Strategy::LockFree`] the
    /// only retry is the tail exchange losing to a concurrent producer.
    ///
    /// [`Strategy::LockFree`] pushes are lock-free except for one short
    /// section: when a subscriber is reading the tail at the moment it is
    /// replaced, the push takes the mutex of the retired list to park the old
    /// tail there. The mutex is never held across a wait.
    pub fn push(&self, payload: Arc<T>) {
        let node = Node::new(payload);
        match self.config.strategy() {
            Strategy::Locked => self.push_locked(node),
            Strategy::LockFree => self.push_lock_free(node),
        }

        let seq = self.emitted.fetch_add(1, Ordering::Relaxed);
        trace!("Emitted #{seq} on \"{}\"", self.name);
    }

    /// Creates a watcher that receives every payload pushed after this call.
    pub fn watch(&self) -> Watcher<'_, T> {
        Watcher::new(self)
    }

    fn push_locked(&self, node: Arc<Node<T>>) {
        let guard = self.lock.lock();

        let new = Arc::into_raw(node.clone()).cast_mut();
        // Safety: the swapped out pointer carries the reference `tail` owned.
        let old = unsafe { Arc::from_raw(self.tail.swap(new, Ordering::SeqCst)) };
        old.link(node);

        self.event.broadcast();
        drop(guard);
    }

    fn push_lock_free(&self, node: Arc<Node<T>>) {
        let new = Arc::into_raw(node.clone()).cast_mut();
        let backoff = Backoff::new();

        // `current` is only compared, never dereferenced, until the exchange
        // hands over the reference `tail` owned.
        let mut current = self.tail.load(Ordering::Acquire);
        let old = loop {
            match self
                .tail
                .compare_exchange_weak(current, new, Ordering::SeqCst, Ordering::Acquire)
            {
                Ok(old) => break old,
                Err(actual) => {
                    current = actual;
                    backoff.spin();
                }
            }
        };

        // Safety: as above, the exchange moved the tail reference to us.
        let old = unsafe { Arc::from_raw(old) };
        // Between the exchange and this link, readers at `old` see no
        // successor although `node` is already the tail.
        old.link(node);
        self.retire(old);
    }

    /// Returns a reference to the newest node, the starting point of a new
    /// cursor.
    pub(crate) fn head(&self) -> Arc<Node<T>> {
        match self.config.strategy() {
            Strategy::Locked => {
                let _guard = self.lock.lock();
                // Safety: tail references are only released under the lock.
                unsafe { self.clone_tail() }
            }
            Strategy::LockFree => {
                self.pins.fetch_add(1, Ordering::SeqCst);
                // Safety: while pinned, a replaced tail is retired, not dropped.
                let head = unsafe { self.clone_tail() };
                if self.pins.fetch_sub(1, Ordering::SeqCst) == 1 {
                    self.reclaim();
                }
                head
            }
        }
    }

    /// # Safety
    /// The caller must keep producers from releasing the reference held by
    /// the current tail until this returns.
    unsafe fn clone_tail(&self) -> Arc<Node<T>> {
        let ptr = self.tail.load(Ordering::SeqCst);
        Arc::increment_strong_count(ptr);
        Arc::from_raw(ptr)
    }

    // A subscriber that pinned before our exchange may still be about to
    // clone `old`. One that pins afterwards can only load a newer tail.
    fn retire(&self, old: Arc<Node<T>>) {
        if self.pins.load(Ordering::SeqCst) == 0 {
            return;
        }
        self.retired.lock().push(old);
        self.reclaim();
    }

    fn reclaim(&self) {
        let mut retired = self.retired.lock();
        if self.pins.load(Ordering::SeqCst) != 0 {
            return;
        }
        let released = mem::take(&mut *retired);
        drop(retired);
        drop(released);
    }
}

impl<T> Drop for BroadcastQueue<T> {
    fn drop(&mut self) {
        let tail = *self.tail.get_mut();
        // Safety: `tail` always owns one strong reference.
        drop(unsafe { Arc::from_raw(tail) });
    }
}

impl<T> fmt::Debug for BroadcastQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BroadcastQueue")
            .field("name", &self.name)
            .field("strategy", &self.config.strategy())
            .field("emitted", &self.emitted())
            .finish_non_exhaustive()
    }
}

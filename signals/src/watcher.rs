use std::{fmt, sync::Arc};

use log::warn;

use crate::{
    backoff::SpinWait,
    broadcast::BroadcastQueue,
    config::Strategy,
    node::Node,
    sync::WaitStatus,
};

/// Position of one watcher: the last node delivered to it.
///
/// A fresh cursor sits on whatever was the newest node when it was created,
/// so nothing emitted before that point is delivered. Holding the node keeps
/// the rest of the log reachable; moving on lets the passed nodes go.
struct Cursor<T> {
    last: Arc<Node<T>>,
}

impl<T> Cursor<T> {
    /// Moves onto the successor of the last delivered node and returns its
    /// payload, or stays put if there is none yet.
    ///
    /// Only the root lacks a payload and the root is never a successor, so a
    /// node without one is never stepped onto.
    fn step(&mut self) -> Option<Arc<T>> {
        let next = self.last.next()?;
        let payload = next.payload()?.clone();
        self.last = next;
        Some(payload)
    }
}

/// Receives every payload emitted on one channel after it was created, in
/// emission order.
///
/// Watchers never consume on behalf of each other. Cloning a watcher yields
/// a second, independent one at the same position.
pub struct Watcher<'q, T> {
    queue: &'q BroadcastQueue<T>,
    cursor: Cursor<T>,
}

impl<'q, T> Watcher<'q, T> {
    pub(crate) fn new(queue: &'q BroadcastQueue<T>) -> Self {
        Self {
            cursor: Cursor { last: queue.head() },
            queue,
        }
    }

    pub fn channel(&self) -> &str {
        self.queue.name()
    }

    /// Returns the next payload if one was already emitted.
    pub fn try_wait(&mut self) -> Option<Arc<T>> {
        self.cursor.step()
    }

    /// Blocks until the next payload is emitted and returns it.
    ///
    /// There is no timeout: every elapsed wait interval is logged and the
    /// wait starts over.
    pub fn wait(&mut self) -> Arc<T> {
        if let Some(payload) = self.cursor.step() {
            return payload;
        }
        match self.queue.config().strategy() {
            Strategy::Locked => self.block(),
            Strategy::LockFree => self.spin(),
        }
    }

    fn block(&mut self) -> Arc<T> {
        let queue = self.queue;
        let timeout = queue.config().wait_timeout();
        let mut guard = queue.lock.lock();
        loop {
            if let Some(payload) = self.cursor.step() {
                return payload;
            }

            let (relocked, status) = queue.event.wait_timeout(guard, timeout);
            guard = relocked;
            if status == WaitStatus::TimedOut {
                warn!(
                    "Waiting for the next signal on \"{}\" is out of time ({timeout:?}), still waiting",
                    self.channel()
                );
            }
        }
    }

    // A producer that won the tail exchange but has not linked yet shows up
    // here as a missing successor, so this loop also covers that window.
    fn spin(&mut self) -> Arc<T> {
        let timeout = self.queue.config().wait_timeout();
        let mut wait = SpinWait::new(timeout);
        loop {
            if let Some(payload) = self.cursor.step() {
                return payload;
            }

            if wait.pause() {
                warn!(
                    "Waiting for the next signal on \"{}\" is out of time ({timeout:?}), still waiting",
                    self.channel()
                );
            }
        }
    }
}

impl<T> Clone for Watcher<'_, T> {
    fn clone(&self) -> Self {
        Self {
            queue: self.queue,
            cursor: Cursor {
                last: self.cursor.last.clone(),
            },
        }
    }
}

impl<T> fmt::Debug for Watcher<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Watcher")
            .field("channel", &self.channel())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod test {
    use std::{
        sync::{
            atomic::{AtomicBool, Ordering},
            Arc,
        },
        thread,
        time::{Duration, Instant},
    };

    use super::Cursor;
    use crate::{node::Node, BroadcastQueue, Config, Strategy};

    const STRATEGIES: [Strategy; 2] = [Strategy::Locked, Strategy::LockFree];

    fn queue<T>(strategy: Strategy) -> BroadcastQueue<T> {
        let config = Config::default()
            .with_strategy(strategy)
            .with_wait_timeout(Duration::from_millis(10));
        BroadcastQueue::new("w", config).unwrap()
    }

    #[test]
    fn delivers_in_order() {
        for strategy in STRATEGIES {
            let q = queue(strategy);
            let mut w = q.watch();
            for i in 0..5 {
                q.push(Arc::new(i));
            }
            for i in 0..5 {
                assert_eq!(*w.wait(), i);
            }
            assert!(w.try_wait().is_none());
        }
    }

    #[test]
    fn returns_the_emitted_reference() {
        let q = queue(Strategy::Locked);
        let mut w = q.watch();
        let payload = Arc::new(String::from("same"));
        q.push(payload.clone());
        assert!(Arc::ptr_eq(&w.wait(), &payload));
    }

    #[test]
    fn clone_forks_an_independent_cursor() {
        let q = queue(Strategy::Locked);
        let mut a = q.watch();
        q.push(Arc::new(1));

        let mut b = a.clone();
        assert_eq!(*a.wait(), 1);

        let mut c = a.clone();
        q.push(Arc::new(2));

        assert_eq!(*b.wait(), 1);
        assert_eq!(*b.wait(), 2);
        assert_eq!(*c.wait(), 2);
        assert_eq!(*a.wait(), 2);
    }

    #[test]
    fn blocks_until_a_push_then_wakes() {
        for strategy in STRATEGIES {
            let q = queue(strategy);
            let mut w = q.watch();
            let returned = AtomicBool::new(false);

            thread::scope(|s| {
                let waiter = s.spawn(|| {
                    let value = *w.wait();
                    returned.store(true, Ordering::SeqCst);
                    value
                });

                // Several wait intervals pass without a payload.
                thread::sleep(Duration::from_millis(60));
                assert!(!returned.load(Ordering::SeqCst));

                let pushed = Instant::now();
                q.push(Arc::new(42));
                assert_eq!(waiter.join().unwrap(), 42);
                assert!(pushed.elapsed() < Duration::from_secs(1));
            });
        }
    }

    #[test]
    fn passed_nodes_are_released() {
        for strategy in STRATEGIES {
            let q = queue(strategy);
            let mut fast = q.watch();
            let mut slow = q.watch();

            let first = Arc::new(1);
            q.push(first.clone());
            q.push(Arc::new(2));

            drop(fast.wait());
            drop(fast.wait());
            assert_eq!(Arc::strong_count(&first), 2);

            drop(slow.wait());
            assert_eq!(Arc::strong_count(&first), 2);

            drop(slow.wait());
            assert_eq!(Arc::strong_count(&first), 1);
        }
    }

    #[test]
    fn dropped_watcher_releases_its_backlog() {
        let q = queue(Strategy::Locked);
        let w = q.watch();
        let payload = Arc::new(0);
        for _ in 0..100 {
            q.push(payload.clone());
        }
        assert_eq!(Arc::strong_count(&payload), 101);

        drop(w);
        assert_eq!(Arc::strong_count(&payload), 2);
    }

    #[test]
    fn payload_less_successor_is_not_stepped_onto() {
        let last = Node::<u32>::root();
        last.link(Node::root());

        let mut cursor = Cursor { last: last.clone() };
        assert!(cursor.step().is_none());
        assert!(Arc::ptr_eq(&cursor.last, &last));
    }

    #[test]
    fn zero_wait_timeout_still_waits() {
        for strategy in STRATEGIES {
            let config = Config::default()
                .with_strategy(strategy)
                .with_wait_timeout(Duration::ZERO);
            assert_eq!(config.wait_timeout(), Duration::from_millis(1));

            let q = BroadcastQueue::new("zero", config).unwrap();
            let mut w = q.watch();
            thread::scope(|s| {
                s.spawn(|| {
                    thread::sleep(Duration::from_millis(20));
                    q.push(Arc::new(3u32));
                });
                assert_eq!(*w.wait(), 3);
            });
        }
    }
}

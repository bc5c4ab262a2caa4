use std::{
    mem,
    ptr::null_mut,
    sync::{
        atomic::{AtomicPtr, Ordering},
        Arc,
    },
};

/// One record of a channel log.
///
/// A node owns one strong reference to its successor, so a chain stays alive
/// from the oldest node still held by someone (a cursor or the queue tail) up
/// to the newest one. Everything older is freed as soon as the last cursor
/// moves past it.
///
/// A null `next` stands for the link back to the root: there is no successor
/// yet, or the producer that appended it has not finished linking.
pub(crate) struct Node<T> {
    payload: Option<Arc<T>>,
    next: AtomicPtr<Node<T>>,
}

impl<T> Node<T> {
    /// The payload-less anchor every channel starts from.
    pub fn root() -> Arc<Self> {
        Arc::new(Self {
            payload: None,
            next: AtomicPtr::new(null_mut()),
        })
    }

    pub fn new(payload: Arc<T>) -> Arc<Self> {
        Arc::new(Self {
            payload: Some(payload),
            next: AtomicPtr::new(null_mut()),
        })
    }

    pub fn payload(&self) -> Option<&Arc<T>> {
        self.payload.as_ref()
    }

    /// Publishes `next` as the successor of this node.
    ///
    /// Release pairs with the Acquire in [`Node::next`]: whoever sees the link
    /// also sees the fully built successor. Called exactly once per node, by
    /// the producer that replaced this node as the tail.
    pub fn link(&self, next: Arc<Self>) {
        let prev = self.next.swap(Arc::into_raw(next).cast_mut(), Ordering::Release);
        debug_assert!(prev.is_null(), "node linked twice");
    }

    pub fn next(&self) -> Option<Arc<Self>> {
        let ptr = self.next.load(Ordering::Acquire);
        if ptr.is_null() {
            return None;
        }
        // Safety: `self` is alive and holds a strong reference to `ptr` that is
        // only given up when `self` is dropped.
        unsafe {
            Arc::increment_strong_count(ptr);
            Some(Arc::from_raw(ptr))
        }
    }

    fn take_next(&mut self) -> Option<Arc<Self>> {
        let ptr = mem::replace(self.next.get_mut(), null_mut());
        // Safety: a non-null link always carries a strong reference.
        (!ptr.is_null()).then(|| unsafe { Arc::from_raw(ptr) })
    }
}

impl<T> Drop for Node<T> {
    // Unlinks the chain one node at a time; the default recursive drop would
    // overflow the stack on a long backlog.
    fn drop(&mut self) {
        let mut next = self.take_next();
        while let Some(node) = next {
            next = match Arc::into_inner(node) {
                Some(mut node) => node.take_next(),
                None => None,
            };
        }
    }
}

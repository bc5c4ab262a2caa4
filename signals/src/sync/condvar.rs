use std::{cell::UnsafeCell, mem::MaybeUninit, time::Duration};

use libc::{
    clock_gettime, pthread_cond_broadcast, pthread_cond_destroy, pthread_cond_init, pthread_cond_t,
    pthread_cond_timedwait, pthread_condattr_destroy, pthread_condattr_init,
    pthread_condattr_setclock, pthread_condattr_t, time_t, timespec, CLOCK_MONOTONIC, ETIMEDOUT,
};

use crate::{error::Result, CheckOk};

use super::MutexGuard;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitStatus {
    Notified,
    TimedOut,
}

/// Process-private pthread condition variable measuring timeouts on
/// `CLOCK_MONOTONIC`, so wall-clock jumps neither shorten nor stretch a wait.
#[derive(Debug)]
pub struct Condvar {
    inner: Box<UnsafeCell<MaybeUninit<pthread_cond_t>>>,
}

impl Condvar {
    pub fn new() -> Result<Self> {
        let inner = Box::new(UnsafeCell::new(MaybeUninit::uninit()));
        let mut attr = MaybeUninit::<pthread_condattr_t>::uninit();
        unsafe {
            pthread_condattr_init(attr.as_mut_ptr()).r("condattr_init")?;

            let init = pthread_condattr_setclock(attr.as_mut_ptr(), CLOCK_MONOTONIC)
                .r("condattr_setclock")
                .and_then(|()| {
                    pthread_cond_init((*inner.get()).as_mut_ptr(), attr.as_ptr()).r("cond_init")
                });

            pthread_condattr_destroy(attr.as_mut_ptr());
            init?;
        }

        Ok(Self { inner })
    }

    fn raw(&self) -> *mut pthread_cond_t {
        unsafe { (*self.inner.get()).as_mut_ptr() }
    }

    pub fn broadcast(&self) {
        unsafe {
            if pthread_cond_broadcast(self.raw()) != 0 {
                panic!("failed to broadcast condvar");
            }
        }
    }

    /// Releases the guard's mutex while sleeping and holds it again on return,
    /// whatever the outcome. Spurious wakeups report `Notified`.
    pub fn wait_timeout<'m, T>(
        &self,
        guard: MutexGuard<'m, T>,
        timeout: Duration,
    ) -> (MutexGuard<'m, T>, WaitStatus) {
        let deadline = monotonic_deadline(timeout);
        let result = unsafe { pthread_cond_timedwait(self.raw(), guard.raw_lock(), &deadline) };
        match result {
            0 => (guard, WaitStatus::Notified),
            ETIMEDOUT => (guard, WaitStatus::TimedOut),
            e => panic!("failed to wait for condvar: {e}"),
        }
    }
}

unsafe impl Send for Condvar {}
unsafe impl Sync for Condvar {}

impl Drop for Condvar {
    fn drop(&mut self) {
        let code = unsafe { pthread_cond_destroy(self.raw()) };
        debug_assert_eq!(code, 0, "failed to destroy condvar");
    }
}

fn monotonic_deadline(timeout: Duration) -> timespec {
    let mut now = timespec {
        tv_sec: 0,
        tv_nsec: 0,
    };
    unsafe { clock_gettime(CLOCK_MONOTONIC, &mut now) };

    let nanos = now.tv_nsec as u64 + u64::from(timeout.subsec_nanos());
    let secs: time_t = timeout.as_secs().try_into().unwrap_or(time_t::MAX);
    timespec {
        tv_sec: now
            .tv_sec
            .saturating_add(secs)
            .saturating_add((nanos / 1_000_000_000) as time_t),
        tv_nsec: (nanos % 1_000_000_000) as _,
    }
}

#[cfg(test)]
mod test {
    use std::{
        thread,
        time::{Duration, Instant},
    };

    use super::{Condvar, WaitStatus};
    use crate::sync::Mutex;

    #[test]
    fn times_out_without_broadcast() {
        let mutex = Mutex::new(()).unwrap();
        let event = Condvar::new().unwrap();

        let start = Instant::now();
        let (_guard, status) = event.wait_timeout(mutex.lock(), Duration::from_millis(20));

        assert_eq!(status, WaitStatus::TimedOut);
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn broadcast_wakes_every_waiter() {
        let ready = Mutex::new(false).unwrap();
        let event = Condvar::new().unwrap();

        thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    let mut guard = ready.lock();
                    while !*guard {
                        guard = event.wait_timeout(guard, Duration::from_secs(5)).0;
                    }
                });
            }

            thread::sleep(Duration::from_millis(10));
            *ready.lock() = true;
            event.broadcast();
        });

        assert!(*ready.lock());
    }
}

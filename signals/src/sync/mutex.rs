use std::{
    cell::UnsafeCell,
    marker::PhantomData,
    mem::MaybeUninit,
    ops::{Deref, DerefMut},
    ptr,
};

use libc::{
    pthread_mutex_destroy, pthread_mutex_init, pthread_mutex_lock, pthread_mutex_t,
    pthread_mutex_unlock,
};

use crate::{error::Result, CheckOk};

/// Process-private pthread mutex.
///
/// The raw mutex lives in its own heap cell: pthread objects must not move
/// once initialised, while `Mutex` itself is moved freely.
#[derive(Debug)]
pub struct Mutex<T> {
    lock: Box<UnsafeCell<MaybeUninit<pthread_mutex_t>>>,
    data: UnsafeCell<T>,
}

impl<T> Mutex<T> {
    pub fn new(value: T) -> Result<Self> {
        let lock = Box::new(UnsafeCell::new(MaybeUninit::uninit()));
        unsafe { pthread_mutex_init((*lock.get()).as_mut_ptr(), ptr::null()) }.r("mutex_init")?;
        Ok(Self {
            lock,
            data: UnsafeCell::new(value),
        })
    }

    fn raw(&self) -> *mut pthread_mutex_t {
        unsafe { (*self.lock.get()).as_mut_ptr() }
    }

    pub fn lock(&self) -> MutexGuard<'_, T> {
        unsafe {
            if pthread_mutex_lock(self.raw()) != 0 {
                panic!("failed to lock mutex");
            }
            MutexGuard {
                lock: self,
                data: &mut *self.data.get(),
                _not_send: PhantomData,
            }
        }
    }
}

/// Held lock on a [`Mutex`], released on drop.
///
/// A pthread mutex must be unlocked by the thread that locked it, so the
/// guard cannot be sent to another thread:
///
/// ```compile_fail
/// use signals::sync::Mutex;
///
/// fn assert_send<S: Send>(_: S) {}
///
/// let mutex = Mutex::new(0u32)?;
/// assert_send(mutex.lock());
/// # Ok::<(), signals::SignalError>(())
/// ```
pub struct MutexGuard<'a, T: 'a> {
    lock: &'a Mutex<T>,
    data: &'a mut T,
    _not_send: PhantomData<*const ()>,
}

impl<'a, T: 'a> MutexGuard<'a, T> {
    pub(crate) fn raw_lock(&self) -> *mut pthread_mutex_t {
        self.lock.raw()
    }
}

impl<T> Deref for MutexGuard<'_, T> {
    type Target = T;
    fn deref(&self) -> &T {
        self.data
    }
}

impl<T> DerefMut for MutexGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.data
    }
}

impl<T> Drop for MutexGuard<'_, T> {
    fn drop(&mut self) {
        unsafe {
            if pthread_mutex_unlock(self.lock.raw()) != 0 {
                panic!("failed to unlock mutex");
            }
        }
    }
}

unsafe impl<T: Send> Send for Mutex<T> {}
unsafe impl<T: Send> Sync for Mutex<T> {}
unsafe impl<T: Sync> Sync for MutexGuard<'_, T> {}

impl<T> Drop for Mutex<T> {
    fn drop(&mut self) {
        // No guard can outlive the borrow of `self`, so the mutex is unlocked.
        let code = unsafe { pthread_mutex_destroy(self.raw()) };
        debug_assert_eq!(code, 0, "failed to destroy mutex");
    }
}

#[cfg(test)]
mod test {
    use std::thread;

    use super::Mutex;

    #[test]
    fn counts_under_contention() {
        let counter = Mutex::new(0u64).unwrap();

        thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    for _ in 0..1000 {
                        *counter.lock() += 1;
                    }
                });
            }
        });

        assert_eq!(*counter.lock(), 8000);
    }

    #[test]
    fn guard_is_shared_but_stays_on_its_thread() {
        fn assert_sync<S: Sync>(_: &S) {}

        let mutex = Mutex::new(1u32).unwrap();
        let guard = mutex.lock();
        assert_sync(&guard);

        thread::scope(|s| {
            let guard = &guard;
            s.spawn(move || assert_eq!(**guard, 1));
        });
        drop(guard);

        *mutex.lock() += 1;
        assert_eq!(*mutex.lock(), 2);
    }

    #[test]
    fn survives_a_move() {
        let mutex = Mutex::new(vec![1]).unwrap();
        let moved = Box::new(mutex);
        moved.lock().push(2);
        assert_eq!(*moved.lock(), vec![1, 2]);
    }
}

use super::WaitMechanism;
use std::cell::UnsafeCell;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// Exclusive lock over a value, acquired by flipping a flag with compare-exchange.
///
/// Never blocks in the kernel unless the chosen [`WaitMechanism`] parks or
/// sleeps. The audio thread should use [`SpinLock::try_lock`].
pub struct SpinLock<T> {
    locked: AtomicBool,
    /// Waiters that may be parked on `locked`.
    parked: AtomicU32,
    value: UnsafeCell<T>,
}

// SAFETY: access to `value` is serialized by `locked`.
unsafe impl<T: Send> Send for SpinLock<T> {}
unsafe impl<T: Send> Sync for SpinLock<T> {}

impl<T> SpinLock<T> {
    pub const fn new(value: T) -> Self {
        Self {
            locked: AtomicBool::new(false),
            parked: AtomicU32::new(0),
            value: UnsafeCell::new(value),
        }
    }

    #[inline]
    fn key(&self) -> usize {
        &self.locked as *const AtomicBool as usize
    }

    /// Acquire without waiting.
    #[inline]
    pub fn try_lock(&self) -> Option<SpinGuard<'_, T>> {
        self.locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| SpinGuard { lock: self })
    }

    /// Acquire, waiting with `mechanism` while another holder has it.
    pub fn lock(&self, mechanism: WaitMechanism) -> SpinGuard<'_, T> {
        loop {
            if let Some(guard) = self.try_lock() {
                return guard;
            }
            if mechanism.parks() {
                self.parked.fetch_add(1, Ordering::SeqCst);
                mechanism.wait_while(self.key(), || self.locked.load(Ordering::SeqCst));
                self.parked.fetch_sub(1, Ordering::SeqCst);
            } else {
                mechanism.wait_while(self.key(), || self.locked.load(Ordering::Relaxed));
            }
        }
    }

    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Relaxed)
    }

    pub fn get_mut(&mut self) -> &mut T {
        self.value.get_mut()
    }

    pub fn into_inner(self) -> T {
        self.value.into_inner()
    }

    // Waiters register before parking, so a release with none registered
    // never touches the parking lot.
    fn unlock(&self) {
        let was_locked = self.locked.swap(false, Ordering::SeqCst);
        assert!(was_locked, "released a SpinLock that was not held");
        if self.parked.load(Ordering::SeqCst) > 0 {
            super::notify_all(self.key());
        }
    }
}

impl<T: Default> Default for SpinLock<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for SpinLock<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.try_lock() {
            Some(guard) => f.debug_struct("SpinLock").field("value", &*guard).finish(),
            None => f.debug_struct("SpinLock").field("value", &"<locked>").finish(),
        }
    }
}

/// Holds a [`SpinLock`]; releases it on drop.
pub struct SpinGuard<'a, T> {
    lock: &'a SpinLock<T>,
}

impl<T> Deref for SpinGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: the guard proves exclusive ownership of the flag.
        unsafe { &*self.lock.value.get() }
    }
}

impl<T> DerefMut for SpinGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: the guard proves exclusive ownership of the flag.
        unsafe { &mut *self.lock.value.get() }
    }
}

impl<T> Drop for SpinGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.unlock();
    }
}

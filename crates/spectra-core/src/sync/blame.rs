use super::WaitMechanism;
use std::sync::atomic::{AtomicI32, AtomicU64, Ordering};

const FREE: i32 = 0;
const EXCLUSIVE: i32 = -1;
const NO_OWNER: u64 = 0;

/// Nonzero token of the calling thread.
fn thread_token() -> u64 {
    static NEXT: AtomicU64 = AtomicU64::new(1);
    thread_local! {
        static TOKEN: u64 = NEXT.fetch_add(1, Ordering::Relaxed);
    }
    TOKEN.with(|token| *token)
}

/// Counting reader/writer lock.
///
/// The counter is `0` when free, `-1` while held exclusively and `n > 0` while
/// held by `n` shared holders. Releasing with the wrong exclusivity panics,
/// and so does acquiring again on the thread that holds it exclusively.
#[derive(Debug, Default)]
pub struct LockBlame {
    count: AtomicI32,
    /// Thread holding the lock exclusively, or `NO_OWNER`.
    owner: AtomicU64,
}

impl LockBlame {
    pub const fn new() -> Self {
        Self {
            count: AtomicI32::new(FREE),
            owner: AtomicU64::new(NO_OWNER),
        }
    }

    #[inline]
    fn key(&self) -> usize {
        &self.count as *const AtomicI32 as usize
    }

    /// Current counter value.
    #[inline]
    pub fn count(&self) -> i32 {
        self.count.load(Ordering::Acquire)
    }

    #[inline]
    pub fn is_free(&self) -> bool {
        self.count() == FREE
    }

    #[inline]
    pub fn is_exclusive(&self) -> bool {
        self.count() == EXCLUSIVE
    }

    /// Acquire without waiting.
    pub fn try_lock(&self, exclusive: bool) -> bool {
        if exclusive {
            let acquired = self
                .count
                .compare_exchange(FREE, EXCLUSIVE, Ordering::Acquire, Ordering::Relaxed)
                .is_ok();
            if acquired {
                self.owner.store(thread_token(), Ordering::Relaxed);
            }
            return acquired;
        }

        let mut current = self.count.load(Ordering::Relaxed);
        while current >= FREE {
            match self.count.compare_exchange_weak(
                current,
                current + 1,
                Ordering::Acquire,
                Ordering::Relaxed,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
        false
    }

    /// Acquire, waiting with `mechanism` until the lock is compatible.
    ///
    /// # Panics
    ///
    /// If the calling thread already holds the lock exclusively; waiting
    /// would never end.
    pub fn lock(&self, exclusive: bool, mechanism: WaitMechanism) {
        while !self.try_lock(exclusive) {
            assert!(
                !self.held_exclusively_here(),
                "re-entrant acquisition of a lock held exclusively by this thread"
            );
            mechanism.wait_while(self.key(), || {
                let count = self.count.load(Ordering::Relaxed);
                if exclusive {
                    count != FREE
                } else {
                    count < FREE
                }
            });
        }
    }

    fn held_exclusively_here(&self) -> bool {
        self.count.load(Ordering::Acquire) == EXCLUSIVE
            && self.owner.load(Ordering::Relaxed) == thread_token()
    }

    /// Release a hold taken with the same `exclusive` flag.
    pub fn unlock(&self, exclusive: bool, mechanism: WaitMechanism) {
        if exclusive {
            self.owner.store(NO_OWNER, Ordering::Relaxed);
            let previous = self.count.fetch_add(1, Ordering::Release);
            assert_eq!(
                previous, EXCLUSIVE,
                "exclusive release of a lock not held exclusively (count {previous})"
            );
        } else {
            let previous = self.count.fetch_sub(1, Ordering::Release);
            assert!(
                previous > FREE,
                "shared release of a lock without shared holders (count {previous})"
            );
        }
        mechanism.release_mechanism().notify(self.key());
    }

    /// Turn an exclusive hold into a single shared hold.
    pub fn downgrade(&self, mechanism: WaitMechanism) {
        self.owner.store(NO_OWNER, Ordering::Relaxed);
        let swapped = self
            .count
            .compare_exchange(EXCLUSIVE, 1, Ordering::Release, Ordering::Relaxed);
        assert!(
            swapped.is_ok(),
            "downgrade of a lock not held exclusively (count {})",
            self.count()
        );
        mechanism.release_mechanism().notify(self.key());
    }
}

/// RAII hold on a [`LockBlame`].
///
/// Remembers whether the hold is exclusive so the release matches the acquire.
#[derive(Debug)]
pub struct ScopedLock<'a> {
    lock: &'a LockBlame,
    exclusive: bool,
    mechanism: WaitMechanism,
}

impl<'a> ScopedLock<'a> {
    pub fn new(lock: &'a LockBlame, exclusive: bool, mechanism: WaitMechanism) -> Self {
        lock.lock(exclusive, mechanism);
        Self {
            lock,
            exclusive,
            mechanism,
        }
    }

    pub fn try_new(lock: &'a LockBlame, exclusive: bool, mechanism: WaitMechanism) -> Option<Self> {
        lock.try_lock(exclusive).then_some(Self {
            lock,
            exclusive,
            mechanism,
        })
    }

    #[inline]
    pub fn is_exclusive(&self) -> bool {
        self.exclusive
    }

    /// Keep holding, but let other shared holders in.
    pub fn downgrade(&mut self) {
        if self.exclusive {
            self.lock.downgrade(self.mechanism);
            self.exclusive = false;
        }
    }
}

impl Drop for ScopedLock<'_> {
    fn drop(&mut self) {
        self.lock.unlock(self.exclusive, self.mechanism);
    }
}

use serde::{Deserialize, Serialize};
use std::time::Duration;

const SLEEP_STEP: Duration = Duration::from_millis(1);

/// How a blocked thread waits and whether a release wakes parked waiters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WaitMechanism {
    /// Busy-wait with a CPU spin hint.
    #[default]
    Spin,
    /// Busy-wait; releases also wake parked waiters.
    SpinNotify,
    /// Park on the lock address until woken by a notifying release.
    Wait,
    /// Park; releases also wake parked waiters.
    WaitNotify,
    /// Sleep in ~1 ms steps.
    Sleep,
    /// Sleep; releases also wake parked waiters.
    SleepNotify,
}

impl WaitMechanism {
    /// Whether a release performed with this mechanism wakes parked waiters.
    #[inline]
    pub const fn notifies(self) -> bool {
        matches!(self, Self::SpinNotify | Self::WaitNotify | Self::SleepNotify)
    }

    /// Whether waiting parks the thread until notified.
    #[inline]
    pub const fn parks(self) -> bool {
        matches!(self, Self::Wait | Self::WaitNotify)
    }

    /// Mechanism to release with so that waiters using `self` are always woken.
    ///
    /// Plain `Wait` parks until notified, so its matching release must notify.
    #[inline]
    pub const fn release_mechanism(self) -> Self {
        match self {
            Self::Wait => Self::WaitNotify,
            other => other,
        }
    }

    /// Block the calling thread while `blocked` returns true.
    ///
    /// `key` identifies the waited-on atomic; notifying releases wake every
    /// thread parked on the same key.
    pub fn wait_while(self, key: usize, mut blocked: impl FnMut() -> bool) {
        while blocked() {
            match self {
                Self::Spin | Self::SpinNotify => std::hint::spin_loop(),
                Self::Wait | Self::WaitNotify => {
                    // SAFETY: the validate closure only reads atomics and never
                    // parks or panics; no callbacks touch the parking lot.
                    unsafe {
                        parking_lot_core::park(
                            key,
                            || blocked(),
                            || {},
                            |_, _| {},
                            parking_lot_core::DEFAULT_PARK_TOKEN,
                            None,
                        );
                    }
                }
                Self::Sleep | Self::SleepNotify => std::thread::sleep(SLEEP_STEP),
            }
        }
    }

    /// Wake waiters parked on `key` if this mechanism notifies.
    #[inline]
    pub fn notify(self, key: usize) {
        if self.notifies() {
            notify_all(key);
        }
    }
}

/// Wake every thread parked on `key`.
#[inline]
pub(crate) fn notify_all(key: usize) {
    // SAFETY: waking parked threads has no preconditions beyond a stable key.
    unsafe {
        parking_lot_core::unpark_all(key, parking_lot_core::DEFAULT_UNPARK_TOKEN);
    }
}

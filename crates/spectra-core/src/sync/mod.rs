//! Locks that are safe to take on the audio thread.
//!
//! None of these allocate. Waiting follows a [`WaitMechanism`]: spinning on the
//! atomic, parking on its address until a notifying release, or sleeping in
//! ~1 ms steps.

mod blame;
mod spin;
mod wait;

pub use blame::{LockBlame, ScopedLock};
pub use spin::{SpinGuard, SpinLock};
pub use wait::WaitMechanism;

pub(crate) use wait::notify_all;

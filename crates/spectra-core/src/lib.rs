//! Real-time primitives for spectral processing.
//!
//! - [`CircularBuffer`]: multi-channel ring buffer with sample-wise operations
//! - [`SimdBuffer`] / [`SimdBufferView`]: lock-guarded spectral storage packed
//!   into SIMD words
//! - [`sync`]: spin, wait and sleep locks usable from the audio thread
//! - [`FourierTransform`] / [`Window`]: real-input FFT and analysis windows
//! - [`AtomicFloat`] / [`AtomicFlag`]: lock-free parameter cells

pub mod circular;
pub mod error;
pub mod fourier;
pub mod lockfree;
pub mod parameter;
pub mod simd;
pub mod sync;
pub mod window;

pub use circular::{BufferOperation, CircularBuffer};
pub use error::{Error, Result};
pub use fourier::{Complex32, FourierTransform};
pub use lockfree::{AtomicFlag, AtomicFloat};
pub use parameter::{ParameterRange, ParameterScale};
pub use simd::{BufferAccess, ComplexWord, SimdBuffer, SimdBufferView, COMPLEX_PER_WORD};
pub use sync::{LockBlame, ScopedLock, SpinGuard, SpinLock, WaitMechanism};
pub use window::{Window, WindowType};

/// Smallest supported FFT order (32 samples).
pub const MIN_FFT_ORDER: u32 = 5;

/// Largest supported FFT order (32768 samples).
pub const MAX_FFT_ORDER: u32 = 15;

/// Number of bins produced by a real FFT of `2^order` samples.
#[inline]
pub const fn bin_count(order: u32) -> usize {
    (1usize << order) / 2 + 1
}

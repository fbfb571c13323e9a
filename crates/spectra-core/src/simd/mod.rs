//! Spectral storage packed into SIMD words.
//!
//! One [`ComplexWord`] holds one bin of a stereo channel group:
//! `[left.re, left.im, right.re, right.im]`. In polar form the pairs hold
//! `(magnitude, phase)` instead.

mod buffer;
mod ops;

pub use buffer::{BufferAccess, SimdBuffer, SimdBufferView};
pub use ops::{
    apply_words, apply_words_masked, bin_mask, block_power, from_polar, to_polar,
};

use crate::Complex32;
use wide::f32x4;

/// Packed pair of complex values.
pub type ComplexWord = f32x4;

/// Complex values per [`ComplexWord`] (channels per group).
pub const COMPLEX_PER_WORD: usize = 2;

/// Pack two complex values into a word.
#[inline]
pub fn pack(left: Complex32, right: Complex32) -> ComplexWord {
    f32x4::from([left.re, left.im, right.re, right.im])
}

/// Split a word into its two complex values.
#[inline]
pub fn unpack(word: ComplexWord) -> (Complex32, Complex32) {
    let [a, b, c, d] = word.to_array();
    (Complex32::new(a, b), Complex32::new(c, d))
}

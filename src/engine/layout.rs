//! Block size, window and overlap of the STFT.

use serde::{Deserialize, Serialize};
use spectra_core::{bin_count, WindowType};

/// Largest overlap ratio; the hop never drops below 1/16 of a block.
pub const MAX_OVERLAP: f32 = 0.9375;

/// Shape of the analysis/synthesis blocks. Changes take effect between
/// blocks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockLayout {
    /// Block size is `2^fft_order` samples.
    pub fft_order: u32,
    pub window: WindowType,
    /// Fraction of a block shared with the next one, in `[0, MAX_OVERLAP]`.
    pub overlap: f32,
}

impl Default for BlockLayout {
    fn default() -> Self {
        Self {
            fft_order: 11,
            window: WindowType::Hann,
            overlap: 0.5,
        }
    }
}

impl BlockLayout {
    pub fn new(fft_order: u32, window: WindowType, overlap: f32) -> Self {
        Self {
            fft_order,
            window,
            overlap,
        }
    }

    #[inline]
    pub fn size(&self) -> usize {
        1 << self.fft_order
    }

    /// Samples between consecutive block starts.
    #[inline]
    pub fn hop(&self) -> usize {
        let hop = (self.size() as f32 * (1.0 - self.overlap)).round() as usize;
        hop.clamp(1, self.size())
    }

    /// Gain applied to every synthesized block before overlap-add.
    pub fn overlap_scale(&self) -> f32 {
        self.window.overlap_scale(self.size(), self.hop(), self.overlap)
    }

    #[inline]
    pub fn bin_count(&self) -> usize {
        bin_count(self.fft_order)
    }
}

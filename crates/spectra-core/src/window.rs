//! Periodic analysis windows and overlap-add compensation.

use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;

/// Window shape. All shapes are periodic and symmetric around the centre.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowType {
    Rectangular,
    #[default]
    Hann,
    Hamming,
    Blackman,
    Triangle,
}

impl WindowType {
    pub const ALL: [WindowType; 5] = [
        Self::Rectangular,
        Self::Hann,
        Self::Hamming,
        Self::Blackman,
        Self::Triangle,
    ];

    /// Coefficient at normalized position `x` in `[0, 1)`.
    pub fn coefficient(self, x: f32) -> f32 {
        match self {
            Self::Rectangular => 1.0,
            Self::Hann => 0.5 - 0.5 * (TAU * x).cos(),
            Self::Hamming => 0.54 - 0.46 * (TAU * x).cos(),
            Self::Blackman => (0.42 - 0.5 * (TAU * x).cos() + 0.08 * (2.0 * TAU * x).cos()).max(0.0),
            Self::Triangle => 1.0 - (2.0 * x - 1.0).abs(),
        }
    }

    /// Mean coefficient over one period.
    pub const fn mean(self) -> f32 {
        match self {
            Self::Rectangular => 1.0,
            Self::Hann | Self::Triangle => 0.5,
            Self::Hamming => 0.54,
            Self::Blackman => 0.42,
        }
    }

    /// Smallest overlap at which blocks of this window sum to a constant.
    pub const fn min_overlap(self) -> f32 {
        match self {
            Self::Rectangular => 0.0,
            Self::Hann | Self::Hamming | Self::Triangle => 0.5,
            Self::Blackman => 0.666_666_7,
        }
    }

    /// Gain that undoes the sum of overlapping blocks: `hop / (size * mean)`
    /// from [`Self::min_overlap`] on, `1` below it.
    pub fn overlap_scale(self, size: usize, hop: usize, overlap: f32) -> f32 {
        if overlap + 1e-6 < self.min_overlap() {
            return 1.0;
        }
        (hop as f32 / (size as f32 * self.mean())).min(1.0)
    }

    pub fn index(self) -> u8 {
        self as u8
    }

    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }
}

/// Window table for the current shape and order.
///
/// Stores the first half plus the centre and mirrors it on lookup.
#[derive(Debug, Clone)]
pub struct Window {
    window_type: WindowType,
    size: usize,
    half: Vec<f32>,
}

impl Window {
    /// Table with room for orders up to `max_order`.
    pub fn new(window_type: WindowType, order: u32, max_order: u32) -> Self {
        let mut window = Self {
            window_type,
            size: 0,
            half: Vec::with_capacity((1usize << max_order) / 2 + 1),
        };
        window.set_layout(window_type, order);
        window
    }

    #[inline]
    pub fn window_type(&self) -> WindowType {
        self.window_type
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Rebuild the table. Does not allocate within the reserved order range.
    pub fn set_layout(&mut self, window_type: WindowType, order: u32) {
        let size = 1usize << order;
        if window_type == self.window_type && size == self.size {
            return;
        }
        self.window_type = window_type;
        self.size = size;
        self.half.clear();
        self.half
            .extend((0..=size / 2).map(|i| window_type.coefficient(i as f32 / size as f32)));
    }

    /// Coefficient `i` of the full window.
    #[inline]
    pub fn get(&self, i: usize) -> f32 {
        self.half[i.min(self.size - i)]
    }

    /// Multiply `samples[..size]` by the window.
    pub fn apply(&self, samples: &mut [f32]) {
        let (head, tail) = samples[..self.size].split_at_mut(self.size / 2);
        for (sample, w) in head.iter_mut().zip(&self.half) {
            *sample *= *w;
        }
        // tail[k] is coefficient size/2 + k, mirrored onto half[size/2 - k]
        for (k, sample) in tail.iter_mut().enumerate() {
            *sample *= self.half[self.size / 2 - k];
        }
    }
}

//! Engine configuration.

use crate::engine::{BlockLayout, MAX_OVERLAP};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use spectra_core::{WaitMechanism, MAX_FFT_ORDER, MIN_FFT_ORDER};
use spectra_effects::EffectsConfig;

/// Most input or output channels.
pub const MAX_CHANNELS: usize = 32;

/// Fixed shape of a [`SoundEngine`](crate::SoundEngine) plus its initial
/// parameter values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub sample_rate: f64,
    /// Smallest FFT order the layout may switch to.
    pub min_fft_order: u32,
    /// Largest FFT order the layout may switch to; sizes every buffer.
    pub max_fft_order: u32,
    /// Callbacks are processed in chunks of at most this many samples.
    pub max_block_size: usize,
    /// Main input pair plus sidechain pairs.
    pub input_channels: usize,
    /// Main output pair plus auxiliary pairs.
    pub output_channels: usize,
    /// Threads running lanes next to the audio thread.
    pub worker_threads: usize,
    /// How lane waits and lock contention wait.
    pub wait_mechanism: WaitMechanism,
    pub layout: BlockLayout,
    pub mix: f32,
    pub gain: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100.0,
            min_fft_order: MIN_FFT_ORDER,
            max_fft_order: 13,
            max_block_size: 512,
            input_channels: 2,
            output_channels: 2,
            worker_threads: 0,
            wait_mechanism: WaitMechanism::Spin,
            layout: BlockLayout::default(),
            mix: 1.0,
            gain: 1.0,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if !(8000.0..=384000.0).contains(&self.sample_rate) {
            return Err(Error::InvalidConfig(format!(
                "sample_rate {} out of range (8000-384000 Hz)",
                self.sample_rate
            )));
        }
        if self.min_fft_order < MIN_FFT_ORDER
            || self.max_fft_order > MAX_FFT_ORDER
            || self.min_fft_order > self.max_fft_order
        {
            return Err(Error::InvalidConfig(format!(
                "FFT orders {}..={} out of range ({MIN_FFT_ORDER}..={MAX_FFT_ORDER})",
                self.min_fft_order, self.max_fft_order
            )));
        }
        if self.max_block_size == 0 {
            return Err(Error::InvalidConfig("max_block_size must be at least 1".into()));
        }
        for (name, channels) in [
            ("input_channels", self.input_channels),
            ("output_channels", self.output_channels),
        ] {
            if channels < 2 || channels > MAX_CHANNELS || channels % 2 != 0 {
                return Err(Error::InvalidConfig(format!(
                    "{name} {channels} must be even and between 2 and {MAX_CHANNELS}"
                )));
            }
        }
        if !(self.min_fft_order..=self.max_fft_order).contains(&self.layout.fft_order) {
            return Err(Error::InvalidConfig(format!(
                "FFT order {} outside {}..={}",
                self.layout.fft_order, self.min_fft_order, self.max_fft_order
            )));
        }
        if !(0.0..=MAX_OVERLAP).contains(&self.layout.overlap) {
            return Err(Error::InvalidConfig(format!(
                "overlap {} out of range (0-{MAX_OVERLAP})",
                self.layout.overlap
            )));
        }
        if !(0.0..=1.0).contains(&self.mix) {
            return Err(Error::InvalidConfig(format!("mix {} out of range (0-1)", self.mix)));
        }
        if !(0.0..=4.0).contains(&self.gain) {
            return Err(Error::InvalidConfig(format!("gain {} out of range (0-4)", self.gain)));
        }
        Ok(())
    }

    /// Shape of the lane scheduler for this engine.
    pub fn effects_config(&self) -> EffectsConfig {
        EffectsConfig {
            input_channels: self.input_channels,
            output_channels: self.output_channels,
            max_fft_order: self.max_fft_order,
            worker_threads: self.worker_threads,
            wait_mechanism: self.wait_mechanism,
        }
    }
}

//! The effect trait and the per-module parameter store.

use crate::{EffectsError, Result};
use serde::{Deserialize, Serialize};
use spectra_core::{AtomicFlag, AtomicFloat, ComplexWord, ParameterRange};

/// Representation of complex bins an effect reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ComplexFormat {
    /// `(re, im)` pairs.
    #[default]
    Cartesian,
    /// `(magnitude, phase)` pairs, phase in radians.
    Polar,
}

/// Block information handed to every effect run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunContext {
    pub bin_count: usize,
    pub sample_rate: f32,
    /// Absolute sample position of the block start.
    pub block_position: i64,
    /// Block start within the FFT period, in `[0, 1)`.
    pub block_phase: f32,
}

impl RunContext {
    /// Centre frequency of `bin` in Hz.
    #[inline]
    pub fn bin_frequency(&self, bin: usize) -> f32 {
        let fft_size = 2 * self.bin_count.saturating_sub(1).max(1);
        bin as f32 * self.sample_rate / fft_size as f32
    }

    /// Nearest bin to `frequency`, clamped to the spectrum.
    #[inline]
    pub fn frequency_bin(&self, frequency: f32) -> usize {
        let fft_size = 2 * self.bin_count.saturating_sub(1).max(1);
        let bin = (frequency * fft_size as f32 / self.sample_rate).round();
        (bin.max(0.0) as usize).min(self.bin_count.saturating_sub(1))
    }
}

/// Declared parameter of an effect.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamSpec {
    pub id: &'static str,
    pub range: ParameterRange,
}

impl ParamSpec {
    pub const fn new(id: &'static str, range: ParameterRange) -> Self {
        Self { id, range }
    }
}

/// A spectral effect: reads one block of bins, writes one block of bins.
///
/// `run` is called on the audio thread or a lane worker. It must not block
/// or allocate.
pub trait SpectralEffect: Send {
    /// Registry identifier.
    fn name(&self) -> &'static str;

    fn format(&self) -> ComplexFormat;

    fn parameters(&self) -> Vec<ParamSpec> {
        Vec::new()
    }

    /// Process `source` into `destination`; both hold `context.bin_count` words.
    fn run(
        &mut self,
        source: &[ComplexWord],
        destination: &mut [ComplexWord],
        parameters: &EffectParameters,
        context: &RunContext,
    );

    /// Forget state carried between blocks.
    fn reset(&mut self) {}
}

/// Live parameter values of one module, settable from any thread.
#[derive(Debug)]
pub struct EffectParameters {
    effect: &'static str,
    specs: Vec<ParamSpec>,
    values: Vec<AtomicFloat>,
    mix: AtomicFloat,
    enabled: AtomicFlag,
}

impl EffectParameters {
    pub fn new(effect: &'static str, specs: Vec<ParamSpec>) -> Self {
        let values = specs.iter().map(|spec| AtomicFloat::new(spec.range.default)).collect();
        Self {
            effect,
            specs,
            values,
            mix: AtomicFloat::new(1.0),
            enabled: AtomicFlag::new(true),
        }
    }

    /// Name of the effect these parameters belong to.
    pub fn effect_name(&self) -> &'static str {
        self.effect
    }

    pub fn specs(&self) -> &[ParamSpec] {
        &self.specs
    }

    fn index_of(&self, id: &str) -> Result<usize> {
        self.specs
            .iter()
            .position(|spec| spec.id == id)
            .ok_or_else(|| EffectsError::UnknownParameter {
                effect: self.effect.to_string(),
                parameter: id.to_string(),
            })
    }

    /// Value of the parameter declared at `index`.
    #[inline]
    pub fn value(&self, index: usize) -> f32 {
        self.values[index].get()
    }

    pub fn get(&self, id: &str) -> Result<f32> {
        Ok(self.value(self.index_of(id)?))
    }

    /// Set a parameter; out-of-range values are rejected.
    pub fn set(&self, id: &str, value: f32) -> Result<()> {
        let index = self.index_of(id)?;
        let range = &self.specs[index].range;
        if !range.contains(value) {
            return Err(EffectsError::InvalidParameter {
                parameter: id.to_string(),
                value,
            });
        }
        self.values[index].set(range.constrain(value));
        Ok(())
    }

    /// Dry/wet amount in `[0, 1]`.
    #[inline]
    pub fn mix(&self) -> f32 {
        self.mix.get()
    }

    pub fn set_mix(&self, mix: f32) -> Result<()> {
        if !(0.0..=1.0).contains(&mix) {
            return Err(EffectsError::InvalidParameter {
                parameter: "mix".to_string(),
                value: mix,
            });
        }
        self.mix.set(mix);
        Ok(())
    }

    #[inline]
    pub fn enabled(&self) -> bool {
        self.enabled.get()
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.set(enabled);
    }
}

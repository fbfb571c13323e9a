//! Builder for configuring and constructing a `SoundEngine`.

use crate::engine::BlockLayout;
use crate::{EngineConfig, Result, SoundEngine};
use spectra_core::{WaitMechanism, WindowType};
use spectra_effects::EffectRegistry;

/// Every setter overrides one field of [`EngineConfig`]; values are checked
/// together in [`build`](Self::build).
///
/// # Example
///
/// ```ignore
/// use spectra::prelude::*;
///
/// let engine = SoundEngine::builder()
///     .sample_rate(48000.0)
///     .fft_order(11)
///     .window(WindowType::Blackman)
///     .overlap(0.75)
///     .worker_threads(2)
///     .build()?;
///
/// assert_eq!(engine.processing_delay(), 2048);
/// ```
#[derive(Default)]
pub struct SoundEngineBuilder {
    config: EngineConfig,
    registry: Option<EffectRegistry>,
}

impl SoundEngineBuilder {
    /// Start from a complete configuration.
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn sample_rate(mut self, rate: f64) -> Self {
        self.config.sample_rate = rate;
        self
    }

    /// Initial block size as `2^order` samples.
    pub fn fft_order(mut self, order: u32) -> Self {
        self.config.layout.fft_order = order;
        self
    }

    /// Orders the layout may switch between at run time.
    pub fn fft_order_range(mut self, min: u32, max: u32) -> Self {
        self.config.min_fft_order = min;
        self.config.max_fft_order = max;
        self
    }

    pub fn window(mut self, window: WindowType) -> Self {
        self.config.layout.window = window;
        self
    }

    pub fn overlap(mut self, overlap: f32) -> Self {
        self.config.layout.overlap = overlap;
        self
    }

    pub fn layout(mut self, layout: BlockLayout) -> Self {
        self.config.layout = layout;
        self
    }

    pub fn mix(mut self, mix: f32) -> Self {
        self.config.mix = mix;
        self
    }

    pub fn gain(mut self, gain: f32) -> Self {
        self.config.gain = gain;
        self
    }

    /// Largest chunk processed at once (default: 512).
    pub fn max_block_size(mut self, samples: usize) -> Self {
        self.config.max_block_size = samples;
        self
    }

    /// Number of input channels (default: 2). Pairs after the first are sidechains.
    pub fn inputs(mut self, count: usize) -> Self {
        self.config.input_channels = count;
        self
    }

    /// Number of output channels (default: 2).
    pub fn outputs(mut self, count: usize) -> Self {
        self.config.output_channels = count;
        self
    }

    /// Lane worker threads besides the audio thread (default: 0).
    pub fn worker_threads(mut self, count: usize) -> Self {
        self.config.worker_threads = count;
        self
    }

    pub fn wait_mechanism(mut self, mechanism: WaitMechanism) -> Self {
        self.config.wait_mechanism = mechanism;
        self
    }

    /// Create effects from `registry` instead of the built-in set.
    pub fn registry(mut self, registry: EffectRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn build(self) -> Result<SoundEngine> {
        let registry = self.registry.unwrap_or_default();
        SoundEngine::with_registry(self.config, registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn test_builder_sets_config() {
        let engine = SoundEngine::builder()
            .sample_rate(48000.0)
            .fft_order_range(6, 10)
            .fft_order(9)
            .window(WindowType::Triangle)
            .overlap(0.75)
            .inputs(4)
            .outputs(4)
            .max_block_size(128)
            .build()
            .unwrap();

        let config = engine.config();
        assert_eq!(config.sample_rate, 48000.0);
        assert_eq!(config.layout, BlockLayout::new(9, WindowType::Triangle, 0.75));
        assert_eq!(engine.processing_delay(), 512);
        assert_eq!(engine.effects().config().input_groups(), 2);
        assert_eq!(engine.sample_rate(), 48000.0);
    }

    #[test]
    fn test_builder_rejects_invalid_config() {
        let result = SoundEngine::builder().fft_order_range(5, 8).build();
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_custom_registry() {
        let registry = EffectRegistry::new();
        let mut engine = SoundEngine::builder().registry(registry).build().unwrap();
        let lane = engine.effects_mut().add_lane().unwrap();
        assert!(engine
            .effects_mut()
            .insert_module(lane, 0, "gain", &Default::default())
            .is_err());
    }
}

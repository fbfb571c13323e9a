//! The streaming STFT engine.
//!
//! Every callback appends the input to a ring, then for each complete block:
//! window, forward FFT, one pass through the effect lanes, inverse FFT,
//! overlap scaling and overlap-add into the output ring. Output is the
//! dry input and the synthesized signal, both delayed by one block, mixed
//! and scaled by the gain.

mod input;
mod layout;
mod output;

pub use layout::{BlockLayout, MAX_OVERLAP};

use crate::config::MAX_CHANNELS;
use crate::{EngineConfig, EngineParameters, Result, SoundEngineBuilder};
use input::InputBuffer;
use output::OutputBuffer;
use spectra_core::simd::{pack, unpack};
use spectra_core::{CircularBuffer, Complex32, FourierTransform, Window};
use spectra_effects::{EffectRegistry, EffectsState, RunContext};
use std::sync::Arc;

/// When [`SoundEngine::update_parameters`] is called relative to processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdatePhase {
    /// Inside the callback: mix and gain.
    Realtime,
    /// Before the callback: also stages layout changes for the next block.
    BeforeProcess,
    /// After the callback: refreshes lane routing when children changed.
    AfterProcess,
}

/// Real-time spectral effects engine.
///
/// # Example
///
/// ```ignore
/// use spectra::prelude::*;
///
/// let mut engine = SoundEngine::builder()
///     .sample_rate(48000.0)
///     .fft_order(10)
///     .build()?;
///
/// let lane = engine.effects_mut().add_lane()?;
/// engine
///     .effects_mut()
///     .insert_module(lane, 0, "filter", &effect_params! { "high_hz" => 2000.0 })?;
///
/// engine.update_parameters(UpdatePhase::BeforeProcess, 48000.0, false);
/// engine.process(&mut channels, frames, 2, 2);
/// ```
pub struct SoundEngine {
    config: EngineConfig,
    parameters: Arc<EngineParameters>,
    effects: EffectsState,
    fourier: FourierTransform,
    window: Window,
    layout: BlockLayout,
    staged: Option<BlockLayout>,
    /// Next block crossfades with the previous layout's pending tail.
    transition: bool,
    /// Overlap-add gain of the current layout.
    scale: f32,
    input: InputBuffer,
    output: OutputBuffer,
    analysis: Vec<f32>,
    left: Vec<Complex32>,
    right: Vec<Complex32>,
    mixed: CircularBuffer,
    sample_rate: f32,
    mix: f32,
    gain: f32,
}

impl SoundEngine {
    pub fn builder() -> SoundEngineBuilder {
        SoundEngineBuilder::default()
    }

    pub fn new(config: EngineConfig) -> Result<Self> {
        Self::with_registry(config, EffectRegistry::default())
    }

    /// Engine whose lanes create effects from `registry`.
    pub fn with_registry(config: EngineConfig, registry: EffectRegistry) -> Result<Self> {
        config.validate()?;
        let effects = EffectsState::with_registry(config.effects_config(), registry)?;
        let fourier = FourierTransform::new(config.min_fft_order, config.max_fft_order)?;

        let layout = config.layout;
        let max_size = 1usize << config.max_fft_order;
        let max_bins = spectra_core::bin_count(config.max_fft_order);
        let capacity = (config.max_block_size + 2 * max_size).next_power_of_two();

        let window = Window::new(layout.window, layout.fft_order, config.max_fft_order);

        tracing::info!(
            "Sound engine: {} Hz, {} in / {} out, FFT order {} ({:?}, overlap {}), {} workers",
            config.sample_rate,
            config.input_channels,
            config.output_channels,
            layout.fft_order,
            layout.window,
            layout.overlap,
            effects.worker_count()
        );

        Ok(Self {
            parameters: Arc::new(EngineParameters::new(&config)),
            input: InputBuffer::new(config.input_channels, capacity, &layout),
            output: OutputBuffer::new(config.output_channels, capacity, max_size, &layout),
            analysis: vec![0.0; max_size],
            left: vec![Complex32::default(); max_bins],
            right: vec![Complex32::default(); max_bins],
            mixed: CircularBuffer::new(config.output_channels, config.max_block_size),
            sample_rate: config.sample_rate as f32,
            mix: config.mix,
            gain: config.gain,
            staged: None,
            transition: false,
            scale: layout.overlap_scale(),
            window,
            layout,
            fourier,
            effects,
            config,
        })
    }

    #[inline]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Shared parameter handle; set values from any thread.
    pub fn parameters(&self) -> &Arc<EngineParameters> {
        &self.parameters
    }

    /// Lanes, effect modules and routing.
    pub fn effects(&self) -> &EffectsState {
        &self.effects
    }

    pub fn effects_mut(&mut self) -> &mut EffectsState {
        &mut self.effects
    }

    /// Layout of the blocks being processed.
    #[inline]
    pub fn layout(&self) -> BlockLayout {
        self.layout
    }

    #[inline]
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Samples between an input sample and the output it produces.
    #[inline]
    pub fn processing_delay(&self) -> usize {
        self.layout.size()
    }

    /// Pull parameter values for `phase`.
    pub fn update_parameters(&mut self, phase: UpdatePhase, sample_rate: f32, update_children: bool) {
        if sample_rate > 0.0 && sample_rate != self.sample_rate {
            self.sample_rate = sample_rate;
        }
        match phase {
            UpdatePhase::Realtime => self.pull_realtime(),
            UpdatePhase::BeforeProcess => {
                self.pull_realtime();
                if let Some(layout) = self.parameters.try_layout() {
                    let target = self.staged.unwrap_or(self.layout);
                    if layout != target {
                        tracing::debug!(
                            "Staged layout: FFT order {} -> {}, {:?}, overlap {}",
                            self.layout.fft_order,
                            layout.fft_order,
                            layout.window,
                            layout.overlap
                        );
                        self.staged = (layout != self.layout).then_some(layout);
                    }
                }
            }
            UpdatePhase::AfterProcess => {
                if update_children {
                    self.effects.refresh_routing();
                }
            }
        }
    }

    fn pull_realtime(&mut self) {
        self.mix = self.parameters.mix();
        self.gain = self.parameters.gain();
    }

    /// Process `samples` frames in place.
    ///
    /// Channels `0..num_inputs` of `buffer` are read as input, then channels
    /// `0..num_outputs` are overwritten with output. Mix and gain are read
    /// from [`Self::parameters`] on every call.
    pub fn process(&mut self, buffer: &mut [&mut [f32]], samples: usize, num_inputs: usize, num_outputs: usize) {
        assert!(
            num_inputs <= self.config.input_channels && num_outputs <= self.config.output_channels,
            "{num_inputs} in / {num_outputs} out exceed the configured {} / {}",
            self.config.input_channels,
            self.config.output_channels
        );
        assert!(
            buffer.len() >= num_inputs.max(num_outputs)
                && buffer.iter().all(|channel| channel.len() >= samples),
            "buffer holds fewer channels or samples than requested"
        );
        self.pull_realtime();

        let mut offset = 0;
        while offset < samples {
            let chunk = (samples - offset).min(self.config.max_block_size);
            self.process_chunk(buffer, offset, chunk, num_inputs, num_outputs);
            offset += chunk;
        }
    }

    fn process_chunk(
        &mut self,
        buffer: &mut [&mut [f32]],
        offset: usize,
        samples: usize,
        num_inputs: usize,
        num_outputs: usize,
    ) {
        {
            let mut channels: [&[f32]; MAX_CHANNELS] = [&[][..]; MAX_CHANNELS];
            for (slot, channel) in channels.iter_mut().zip(buffer.iter()).take(num_inputs) {
                *slot = &channel[offset..offset + samples];
            }
            self.input.push(&channels[..num_inputs], samples);
        }

        if let Some(layout) = self.staged.take() {
            self.apply_layout(layout);
        }
        while self.input.block_ready(self.layout.size()) {
            self.process_block();
        }
        self.emit(buffer, offset, samples, num_outputs);
    }

    fn apply_layout(&mut self, layout: BlockLayout) {
        let (size, old_size) = (layout.size(), self.layout.size());
        if size < old_size {
            self.analysis[size..old_size].fill(0.0);
            self.output.clear_block(size, old_size);
        }
        self.window.set_layout(layout.window, layout.fft_order);
        self.scale = layout.overlap_scale();
        self.transition = self.output.has_pending(self.input.block_begin());
        self.layout = layout;
    }

    fn process_block(&mut self) {
        let BlockLayout { fft_order, .. } = self.layout;
        let (size, hop, bins) = (self.layout.size(), self.layout.hop(), self.layout.bin_count());
        let start = self.input.block_begin();
        let mechanism = self.config.wait_mechanism;

        let used_inputs = self.effects.used_input_groups();
        {
            let mut spectra = self.effects.input().lock(true, mechanism);
            for group in (0..spectra.groups()).filter(|&g| used_inputs & (1 << g) != 0) {
                for (channel, spectrum) in [(2 * group, &mut self.left), (2 * group + 1, &mut self.right)] {
                    let block = &mut self.analysis[..size];
                    self.input.read_block(channel, block);
                    self.window.apply(block);
                    self.fourier.forward(fft_order, block, &mut spectrum[..bins]);
                }
                for (word, (left, right)) in spectra.group_mut(group)[..bins]
                    .iter_mut()
                    .zip(self.left.iter().zip(&self.right))
                {
                    *word = pack(*left, *right);
                }
            }
        }

        self.effects.process_lanes(RunContext {
            bin_count: bins,
            sample_rate: self.sample_rate,
            block_position: start,
            block_phase: start.rem_euclid(size as i64) as f32 / size as f32,
        });

        let used_outputs = self.effects.used_output_groups();
        {
            let spectra = self.effects.output().lock(false, mechanism);
            for group in 0..spectra.groups() {
                let channels = [2 * group, 2 * group + 1];
                if used_outputs & (1 << group) == 0 {
                    for channel in channels {
                        self.output.block_mut(channel, size).fill(0.0);
                    }
                    continue;
                }
                for ((left, right), word) in self
                    .left
                    .iter_mut()
                    .zip(self.right.iter_mut())
                    .zip(&spectra.group(group)[..bins])
                {
                    (*left, *right) = unpack(*word);
                }
                for (channel, spectrum) in [(channels[0], &mut self.left), (channels[1], &mut self.right)] {
                    let block = self.output.block_mut(channel, size);
                    self.fourier.inverse(fft_order, &mut spectrum[..bins], block);
                    if self.scale != 1.0 {
                        block.iter_mut().for_each(|sample| *sample *= self.scale);
                    }
                }
            }
        }

        self.output.overlap_add(start, size, hop, self.transition);
        self.transition = false;
        self.input.advance(hop);
    }

    /// Write `samples` output frames at `offset`: dry and wet delayed by one
    /// block, mixed, scaled by the gain.
    fn emit(&mut self, buffer: &mut [&mut [f32]], offset: usize, samples: usize, num_outputs: usize) {
        let end = self.input.written() - self.processing_delay() as i64;
        let start = end - samples as i64;
        let wet_ready = self.output.is_ready(end);
        let silent = (-start).clamp(0, samples as i64) as usize;
        let (mix, gain) = (self.mix, self.gain);

        for channel in 0..num_outputs {
            let mixed = &mut self.mixed.channel_mut(channel)[..samples];
            // A wet path that is not final yet mutes the whole span, dry included.
            if mix < 1.0 && channel < self.input.channels() && (mix == 0.0 || wet_ready) {
                self.input.read(channel, start, mixed);
            } else {
                mixed.fill(0.0);
            }
            if mix > 0.0 && wet_ready {
                self.output.mix_into(&mut self.mixed, channel, start, samples, mix);
            }
            if gain != 1.0 {
                self.mixed.apply_gain(channel, 0, samples, gain);
            }

            let out = &mut buffer[channel][offset..offset + samples];
            out.copy_from_slice(&self.mixed.channel(channel)[..samples]);
            out[..silent].fill(0.0);
        }
    }

    /// Clear every buffer, cursor and lane state. Call outside processing.
    pub fn reset(&mut self) {
        if let Some(layout) = self.staged.take() {
            self.apply_layout(layout);
        }
        self.input.reset(&self.layout);
        self.output.reset(&self.layout);
        self.analysis.fill(0.0);
        self.transition = false;
        self.effects.reset();
        tracing::debug!("Sound engine reset");
    }
}

impl std::fmt::Debug for SoundEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoundEngine")
            .field("config", &self.config)
            .field("layout", &self.layout)
            .field("staged", &self.staged)
            .field("effects", &self.effects)
            .finish()
    }
}

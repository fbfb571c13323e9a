//! Lanes of effect modules, run once per block by the audio thread and the
//! lane workers.
//!
//! Per block the audio thread arms every lane, wakes the workers and claims
//! lanes itself until none are left. A lane reading another lane's output
//! helps run it if it is still unclaimed, otherwise waits for it. When every
//! lane has finished, the lane outputs are summed into the output buffer.

use crate::routing::validate_lanes;
use crate::worker::WorkerPool;
use crate::{
    EffectParameters, EffectParams, EffectRegistry, EffectsError, EffectsLane, LaneInput,
    LaneOutput, LaneSettings, LaneStatus, Result, RunContext,
};
use serde::{Deserialize, Serialize};
use spectra_core::{
    bin_count, AtomicFloat, BufferAccess, ScopedLock, SimdBuffer, WaitMechanism, LockBlame,
    COMPLEX_PER_WORD, MAX_FFT_ORDER, MIN_FFT_ORDER,
};
use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use wide::f32x4;

/// Most channel groups per side; group bitmaps are `u64`.
const MAX_GROUPS: usize = 16;

/// Shape and threading of an [`EffectsState`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EffectsConfig {
    /// Main plus sidechain input channels; even.
    pub input_channels: usize,
    /// Main plus auxiliary output channels; even.
    pub output_channels: usize,
    /// Largest FFT order blocks will use.
    pub max_fft_order: u32,
    /// Threads helping the audio thread; 0 runs every lane on the caller.
    pub worker_threads: usize,
    pub wait_mechanism: WaitMechanism,
}

impl Default for EffectsConfig {
    fn default() -> Self {
        Self {
            input_channels: 2,
            output_channels: 2,
            max_fft_order: 13,
            worker_threads: 0,
            wait_mechanism: WaitMechanism::Spin,
        }
    }
}

impl EffectsConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, channels) in [
            ("input", self.input_channels),
            ("output", self.output_channels),
        ] {
            if channels < COMPLEX_PER_WORD
                || channels % COMPLEX_PER_WORD != 0
                || channels / COMPLEX_PER_WORD > MAX_GROUPS
            {
                return Err(EffectsError::InvalidConfig(format!(
                    "{name} channels must be an even number between 2 and {}, got {channels}",
                    MAX_GROUPS * COMPLEX_PER_WORD
                )));
            }
        }
        if !(MIN_FFT_ORDER..=MAX_FFT_ORDER).contains(&self.max_fft_order) {
            return Err(EffectsError::InvalidConfig(format!(
                "max FFT order must be between {MIN_FFT_ORDER} and {MAX_FFT_ORDER}, got {}",
                self.max_fft_order
            )));
        }
        Ok(())
    }

    #[inline]
    pub fn input_groups(&self) -> usize {
        self.input_channels / COMPLEX_PER_WORD
    }

    #[inline]
    pub fn output_groups(&self) -> usize {
        self.output_channels / COMPLEX_PER_WORD
    }

    #[inline]
    pub fn max_bins(&self) -> usize {
        bin_count(self.max_fft_order)
    }
}

/// Block information published to whichever thread claims a lane.
#[derive(Debug, Default)]
struct BlockContext {
    bin_count: AtomicUsize,
    sample_rate: AtomicFloat,
    position: AtomicI64,
    phase: AtomicFloat,
    block: AtomicU64,
}

impl BlockContext {
    /// Store the next block's context and return its number.
    fn begin(&self, context: &RunContext) -> u64 {
        self.bin_count.store(context.bin_count, Ordering::Relaxed);
        self.sample_rate.set(context.sample_rate);
        self.position.store(context.block_position, Ordering::Relaxed);
        self.phase.set(context.block_phase);
        self.block.fetch_add(1, Ordering::AcqRel) + 1
    }

    fn current(&self) -> (RunContext, u64) {
        let block = self.block.load(Ordering::Acquire);
        let context = RunContext {
            bin_count: self.bin_count.load(Ordering::Relaxed),
            sample_rate: self.sample_rate.get(),
            block_position: self.position.load(Ordering::Relaxed),
            block_phase: self.phase.get(),
        };
        (context, block)
    }
}

/// State shared by the audio thread and the lane workers.
pub(crate) struct LaneShared {
    lanes: UnsafeCell<Vec<EffectsLane>>,
    /// Shared while lanes are scanned or run, exclusive while edited.
    pub(crate) topology: LockBlame,
    context: BlockContext,
    input: SimdBuffer,
    pub(crate) wake: AtomicU64,
    pub(crate) shutdown: AtomicBool,
    pub(crate) mechanism: WaitMechanism,
}

// SAFETY: `lanes` is only reached through `lanes()` / `lanes_mut()`, whose
// callers hold `topology` shared / exclusively.
unsafe impl Sync for LaneShared {}

impl LaneShared {
    #[inline]
    pub(crate) fn wake_key(&self) -> usize {
        &self.wake as *const AtomicU64 as usize
    }

    /// # Safety
    /// The caller must hold `topology`.
    #[inline]
    pub(crate) unsafe fn lanes(&self) -> &[EffectsLane] {
        &*self.lanes.get()
    }

    /// # Safety
    /// The caller must hold `topology` exclusively.
    #[allow(clippy::mut_from_ref)]
    unsafe fn lanes_mut(&self) -> &mut Vec<EffectsLane> {
        &mut *self.lanes.get()
    }

    /// Claim and run every lane that is still `Ready`.
    pub(crate) fn distribute_work(&self, lanes: &[EffectsLane]) {
        for index in 0..lanes.len() {
            if lanes[index].try_claim() {
                // Read after the claim: arming happens after the context is stored.
                let (context, block) = self.context.current();
                self.run_lane(lanes, index, &context, block);
            }
        }
    }

    /// Run a claimed lane and mark it finished.
    fn run_lane(&self, lanes: &[EffectsLane], index: usize, context: &RunContext, block: u64) {
        let lane = &lanes[index];
        let input = match lane.settings().input {
            LaneInput::Main => self.input.view_group(0),
            LaneInput::Sidechain(sidechain) => self.input.view_group(sidechain + 1),
            LaneInput::Lane(producer) => {
                self.wait_for_lane(lanes, index, producer, block);
                // SAFETY: the producer completed this block.
                let published = unsafe { lanes[producer].published() };
                debug_assert!(published.is_some(), "lane {producer} finished without output");
                published
                    .cloned()
                    .unwrap_or_else(|| self.input.view_group(0))
            }
        };
        // SAFETY: claimed by this thread.
        unsafe {
            lane.process(input, context, self.mechanism);
        }
        lane.finish(block, self.mechanism);
    }

    /// Block lane `consumer` until `producer` has finished `block`, running
    /// the producer here if no other thread has claimed it yet.
    fn wait_for_lane(&self, lanes: &[EffectsLane], consumer: usize, producer: usize, block: u64) {
        debug_assert!(
            !feeds_back(lanes, consumer, producer),
            "lane {consumer} reads from a cycle through lane {producer}"
        );
        let upstream = &lanes[producer];
        loop {
            if upstream.is_complete(block) {
                return;
            }
            if upstream.try_claim() {
                let (context, block) = self.context.current();
                self.run_lane(lanes, producer, &context, block);
                continue;
            }
            lanes[consumer].set_waiting(true);
            self.mechanism.wait_while(upstream.status_key(), || {
                !upstream.is_complete(block) && upstream.status() != LaneStatus::Ready
            });
            lanes[consumer].set_waiting(false);
        }
    }
}

/// Whether following inputs upstream from `producer` reaches `consumer`.
fn feeds_back(lanes: &[EffectsLane], consumer: usize, producer: usize) -> bool {
    let mut current = producer;
    for _ in 0..lanes.len() {
        if current == consumer {
            return true;
        }
        match lanes[current].settings().input {
            LaneInput::Lane(next) if next < lanes.len() => current = next,
            _ => return false,
        }
    }
    true
}

/// Effect lanes plus the buffers they read from and sum into.
///
/// Fill [`EffectsState::input`], call [`EffectsState::process_lanes`], then
/// read [`EffectsState::output`]. Group 0 is the main pair of channels,
/// group `i + 1` sidechain `i`.
pub struct EffectsState {
    config: EffectsConfig,
    shared: Arc<LaneShared>,
    workers: WorkerPool,
    output: SimdBuffer,
    registry: EffectRegistry,
    /// Per output group, `1 / lanes summed into it`.
    output_scales: Vec<f32>,
    used_inputs: u64,
    used_outputs: u64,
    held: Vec<BufferAccess>,
}

impl EffectsState {
    pub fn new(config: EffectsConfig) -> Result<Self> {
        Self::with_registry(config, EffectRegistry::default())
    }

    pub fn with_registry(config: EffectsConfig, registry: EffectRegistry) -> Result<Self> {
        config.validate()?;
        let max_bins = config.max_bins();
        let shared = Arc::new(LaneShared {
            lanes: UnsafeCell::new(Vec::new()),
            topology: LockBlame::new(),
            context: BlockContext::default(),
            input: SimdBuffer::new(config.input_groups(), max_bins),
            wake: AtomicU64::new(0),
            shutdown: AtomicBool::new(false),
            mechanism: config.wait_mechanism,
        });
        let workers = WorkerPool::spawn(Arc::clone(&shared), config.worker_threads)?;

        tracing::debug!(
            "Effects state: {} input groups, {} output groups, {} bins, {} workers",
            config.input_groups(),
            config.output_groups(),
            max_bins,
            workers.len()
        );

        Ok(Self {
            output: SimdBuffer::new(config.output_groups(), max_bins),
            output_scales: vec![1.0; config.output_groups()],
            used_inputs: 0,
            used_outputs: 0,
            held: Vec::new(),
            config,
            shared,
            workers,
            registry,
        })
    }

    #[inline]
    pub fn config(&self) -> &EffectsConfig {
        &self.config
    }

    pub fn registry(&self) -> &EffectRegistry {
        &self.registry
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Spectral input, one group per input channel pair.
    pub fn input(&self) -> &SimdBuffer {
        &self.shared.input
    }

    /// Summed lane outputs, one group per output channel pair.
    pub fn output(&self) -> &SimdBuffer {
        &self.output
    }

    /// Bit `g` set when input group `g` feeds a lane.
    #[inline]
    pub fn used_input_groups(&self) -> u64 {
        self.used_inputs
    }

    /// Bit `g` set when an enabled lane sums into output group `g`.
    #[inline]
    pub fn used_output_groups(&self) -> u64 {
        self.used_outputs
    }

    /// Run every lane on the current input and sum their outputs.
    ///
    /// Called on the audio thread. Does not allocate; waits only on lanes
    /// and buffer locks held by other lanes of the same block.
    pub fn process_lanes(&mut self, context: RunContext) {
        assert!(
            context.bin_count <= self.config.max_bins(),
            "{} bins exceed the configured maximum {}",
            context.bin_count,
            self.config.max_bins()
        );
        let shared = Arc::clone(&self.shared);
        let mechanism = shared.mechanism;
        let _topology = ScopedLock::new(&shared.topology, false, mechanism);
        // SAFETY: shared topology hold.
        let lanes = unsafe { shared.lanes() };

        let block = shared.context.begin(&context);
        for lane in lanes {
            lane.arm();
            mechanism.release_mechanism().notify(lane.status_key());
        }
        if self.workers.len() > 0 {
            shared.wake.fetch_add(1, Ordering::AcqRel);
            WaitMechanism::WaitNotify.notify(shared.wake_key());
        }

        shared.distribute_work(lanes);
        for lane in lanes {
            mechanism.wait_while(lane.status_key(), || !lane.is_complete(block));
        }

        self.sum_lanes(lanes, context.bin_count);
    }

    fn sum_lanes(&mut self, lanes: &[EffectsLane], bins: usize) {
        let mechanism = self.config.wait_mechanism;
        let mut output = self.output.lock(true, mechanism);
        for group in 0..output.groups() {
            output.group_mut(group)[..bins].fill(f32x4::ZERO);
        }

        for lane in lanes {
            let settings = lane.settings();
            let Some(group) = settings.output.group() else {
                continue;
            };
            if !settings.enabled {
                continue;
            }
            // SAFETY: every lane completed this block.
            let Some(view) = (unsafe { lane.published() }) else {
                continue;
            };
            let access = view.lock(false, mechanism);
            let scale = f32x4::splat(lane.volume_scale() * self.output_scales[group]);
            for (d, s) in output.group_mut(group)[..bins]
                .iter_mut()
                .zip(&access.group(0)[..bins])
            {
                *d = *d + *s * scale;
            }
            self.held.push(access);
        }
        self.held.clear();
    }

    // ===== Edits =====

    /// Apply `edit` with the topology held exclusively, then refresh routing.
    fn edit<R>(&mut self, edit: impl FnOnce(&mut Vec<EffectsLane>) -> Result<R>) -> Result<R> {
        let result = self.locked(edit);
        match &result {
            Ok(_) => self.refresh_routing(),
            Err(error) => tracing::warn!("Rejected lane edit: {}", error),
        }
        result
    }

    /// Run `f` with the topology held exclusively.
    fn locked<R>(&mut self, f: impl FnOnce(&mut Vec<EffectsLane>) -> R) -> R {
        let _topology = ScopedLock::new(&self.shared.topology, true, self.config.wait_mechanism);
        // SAFETY: exclusive topology hold.
        f(unsafe { self.shared.lanes_mut() })
    }

    /// Read lanes with the topology held shared.
    fn inspect<R>(&self, inspect: impl FnOnce(&[EffectsLane]) -> R) -> R {
        let _topology = ScopedLock::new(&self.shared.topology, false, self.config.wait_mechanism);
        // SAFETY: shared topology hold.
        inspect(unsafe { self.shared.lanes() })
    }

    pub fn lane_count(&self) -> usize {
        self.inspect(|lanes| lanes.len())
    }

    pub fn lane_settings(&self, lane: usize) -> Result<LaneSettings> {
        self.inspect(|lanes| {
            lanes
                .get(lane)
                .map(|l| *l.settings())
                .ok_or(EffectsError::LaneIndex {
                    index: lane,
                    count: lanes.len(),
                })
        })
    }

    pub fn lane_status(&self, lane: usize) -> Option<LaneStatus> {
        self.inspect(|lanes| lanes.get(lane).map(EffectsLane::status))
    }

    /// Append a lane reading the main input and summing into the main output.
    pub fn add_lane(&mut self) -> Result<usize> {
        let index = self.lane_count();
        self.insert_lane(index)
    }

    /// Insert a lane at `index`; lane references at or above it move up.
    pub fn insert_lane(&mut self, index: usize) -> Result<usize> {
        let lane = EffectsLane::new(
            LaneSettings::default(),
            self.config.max_bins(),
            self.config.wait_mechanism,
        );
        self.held.reserve(1);
        self.edit(move |lanes| {
            if index > lanes.len() {
                return Err(EffectsError::LaneIndex {
                    index,
                    count: lanes.len(),
                });
            }
            for other in lanes.iter_mut() {
                if let LaneInput::Lane(input) = &mut other.settings_mut().input {
                    if *input >= index {
                        *input += 1;
                    }
                }
            }
            lanes.insert(index, lane);
            tracing::debug!("Inserted lane {}", index);
            Ok(index)
        })
    }

    /// Remove a lane; lanes that read it fall back to the main input.
    pub fn delete_lane(&mut self, index: usize) -> Result<()> {
        self.edit(|lanes| {
            check_lane(lanes, index)?;
            lanes.remove(index);
            for other in lanes.iter_mut() {
                let settings = other.settings_mut();
                if let LaneInput::Lane(input) = settings.input {
                    if input == index {
                        settings.input = LaneInput::Main;
                    } else if input > index {
                        settings.input = LaneInput::Lane(input - 1);
                    }
                }
            }
            tracing::debug!("Deleted lane {}", index);
            Ok(())
        })
    }

    /// Create an effect from the registry and insert it at `position`.
    ///
    /// Returns the module's parameter handle.
    pub fn insert_module(
        &mut self,
        lane: usize,
        position: usize,
        effect: &str,
        params: &EffectParams,
    ) -> Result<Arc<EffectParameters>> {
        let module = self.registry.create_module(
            effect,
            params,
            self.config.max_bins(),
            self.config.wait_mechanism,
        )?;
        let parameters = Arc::clone(module.parameters());
        let name = module.name();
        self.edit(move |lanes| {
            check_lane(lanes, lane)?;
            let modules = lanes[lane].modules_mut();
            if position > modules.len() {
                return Err(EffectsError::ModuleIndex {
                    lane,
                    index: position,
                    count: modules.len(),
                });
            }
            modules.insert(position, module);
            tracing::debug!("Inserted '{}' into lane {} at {}", name, lane, position);
            Ok(())
        })?;
        Ok(parameters)
    }

    pub fn delete_module(&mut self, lane: usize, position: usize) -> Result<()> {
        self.edit(|lanes| {
            check_module(lanes, lane, position)?;
            let module = lanes[lane].modules_mut().remove(position);
            tracing::debug!("Deleted '{}' from lane {} at {}", module.name(), lane, position);
            Ok(())
        })
    }

    /// Move a module within its lane.
    pub fn move_module(&mut self, lane: usize, from: usize, to: usize) -> Result<()> {
        self.edit(|lanes| {
            check_module(lanes, lane, from)?;
            check_module(lanes, lane, to)?;
            let modules = lanes[lane].modules_mut();
            let module = modules.remove(from);
            modules.insert(to, module);
            Ok(())
        })
    }

    pub fn module_count(&mut self, lane: usize) -> Result<usize> {
        self.locked(|lanes| {
            check_lane(lanes, lane)?;
            Ok(lanes[lane].modules_mut().len())
        })
    }

    /// Parameter handle of a module, usable from any thread.
    pub fn module_parameters(&mut self, lane: usize, position: usize) -> Result<Arc<EffectParameters>> {
        self.locked(|lanes| {
            check_module(lanes, lane, position)?;
            Ok(Arc::clone(lanes[lane].modules_mut()[position].parameters()))
        })
    }

    pub fn set_parameter(&mut self, lane: usize, position: usize, id: &str, value: f32) -> Result<()> {
        self.module_parameters(lane, position)?.set(id, value)
    }

    pub fn set_module_mix(&mut self, lane: usize, position: usize, mix: f32) -> Result<()> {
        self.module_parameters(lane, position)?.set_mix(mix)
    }

    pub fn set_module_enabled(&mut self, lane: usize, position: usize, enabled: bool) -> Result<()> {
        self.module_parameters(lane, position)?.set_enabled(enabled);
        Ok(())
    }

    /// Route a lane's input; rejected if it would create a cycle.
    pub fn set_lane_input(&mut self, lane: usize, input: LaneInput) -> Result<()> {
        self.update_settings(lane, |settings| settings.input = input)
    }

    pub fn set_lane_output(&mut self, lane: usize, output: LaneOutput) -> Result<()> {
        self.update_settings(lane, |settings| settings.output = output)
    }

    pub fn set_lane_enabled(&mut self, lane: usize, enabled: bool) -> Result<()> {
        self.update_settings(lane, |settings| settings.enabled = enabled)
    }

    pub fn set_gain_matching(&mut self, lane: usize, gain_matching: bool) -> Result<()> {
        self.update_settings(lane, |settings| settings.gain_matching = gain_matching)
    }

    fn update_settings(&mut self, lane: usize, update: impl FnOnce(&mut LaneSettings)) -> Result<()> {
        let (input_groups, output_groups) = (self.config.input_groups(), self.config.output_groups());
        self.edit(|lanes| {
            check_lane(lanes, lane)?;
            let previous = *lanes[lane].settings();
            update(lanes[lane].settings_mut());
            let settings: Vec<LaneSettings> = lanes.iter().map(|l| *l.settings()).collect();
            if let Err(error) = validate_lanes(&settings, input_groups, output_groups) {
                *lanes[lane].settings_mut() = previous;
                return Err(error.into());
            }
            Ok(())
        })
    }

    /// Recompute used channel groups and per-output summing scales.
    pub fn refresh_routing(&mut self) {
        let output_groups = self.config.output_groups();
        let (used_inputs, used_outputs, counts) = self.inspect(|lanes| {
            let mut used_inputs = 0u64;
            let mut used_outputs = 0u64;
            let mut counts = [0usize; MAX_GROUPS];
            for lane in lanes {
                let settings = lane.settings();
                if let Some(group) = settings.input.group() {
                    used_inputs |= 1 << group;
                }
                if let (true, Some(group)) = (settings.enabled, settings.output.group()) {
                    used_outputs |= 1 << group;
                    counts[group] += 1;
                }
            }
            (used_inputs, used_outputs, counts)
        });
        self.used_inputs = used_inputs;
        self.used_outputs = used_outputs;
        for (scale, count) in self.output_scales.iter_mut().zip(&counts[..output_groups]) {
            *scale = 1.0 / (*count).max(1) as f32;
        }
    }

    /// Forget module state and lane outputs.
    pub fn reset(&mut self) {
        self.locked(|lanes| {
            for lane in lanes.iter_mut() {
                lane.reset();
            }
        });
        let mut output = self.output.lock(true, self.config.wait_mechanism);
        output.words_mut().fill(f32x4::ZERO);
    }
}

impl std::fmt::Debug for EffectsState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectsState")
            .field("config", &self.config)
            .field("lanes", &self.lane_count())
            .field("used_inputs", &self.used_inputs)
            .field("used_outputs", &self.used_outputs)
            .finish()
    }
}

fn check_lane(lanes: &[EffectsLane], lane: usize) -> Result<()> {
    if lane < lanes.len() {
        Ok(())
    } else {
        Err(EffectsError::LaneIndex {
            index: lane,
            count: lanes.len(),
        })
    }
}

fn check_module(lanes: &mut [EffectsLane], lane: usize, position: usize) -> Result<()> {
    check_lane(lanes, lane)?;
    let count = lanes[lane].modules_mut().len();
    if position < count {
        Ok(())
    } else {
        Err(EffectsError::ModuleIndex {
            lane,
            index: position,
            count,
        })
    }
}

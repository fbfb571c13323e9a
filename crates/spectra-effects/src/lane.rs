//! A chain of effect modules with one input and one output.

use crate::{ComplexDataSource, ComplexFormat, EffectModule, LaneInput, LaneOutput, RunContext};
use serde::{Deserialize, Serialize};
use spectra_core::simd::block_power;
use spectra_core::{AtomicFloat, SimdBufferView, WaitMechanism};
use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicU64, AtomicU8, AtomicUsize, Ordering};

/// Volume-scale ratios are clamped to this range before the square root.
const MIN_POWER_RATIO: f32 = 1e-30;
const MAX_POWER_RATIO: f32 = 1e30;

/// Scheduling state of a lane within a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LaneStatus {
    /// Done with the current block (or idle).
    Finished = 0,
    /// Armed for the current block, not yet claimed.
    Ready = 1,
    /// Claimed by a thread and processing.
    Running = 2,
    /// Claimed, waiting for the lane it reads from.
    Stopped = 3,
}

impl LaneStatus {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Ready,
            2 => Self::Running,
            3 => Self::Stopped,
            _ => Self::Finished,
        }
    }
}

/// Routing and switches of a lane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaneSettings {
    pub input: LaneInput,
    pub output: LaneOutput,
    pub enabled: bool,
    /// Scale the lane output back to the loudness of its input.
    pub gain_matching: bool,
}

impl Default for LaneSettings {
    fn default() -> Self {
        Self {
            input: LaneInput::Main,
            output: LaneOutput::Main,
            enabled: true,
            gain_matching: false,
        }
    }
}

/// Modules and scratch used only by the thread running the lane.
#[derive(Debug)]
struct LaneWork {
    modules: Vec<EffectModule>,
    source: ComplexDataSource,
}

/// One lane: settings, modules and the per-block scheduling state.
///
/// `work` belongs to whichever thread moved the status from `Ready` to
/// `Running`; `published` is written before `Finished` is stored and read
/// only after it is observed.
pub struct EffectsLane {
    settings: LaneSettings,
    status: AtomicU8,
    completed_block: AtomicU64,
    progress: AtomicUsize,
    volume_scale: AtomicFloat,
    work: UnsafeCell<LaneWork>,
    published: UnsafeCell<Option<SimdBufferView>>,
}

// SAFETY: `work` and `published` are handed between threads only through the
// status protocol above; edits go through `&mut self`.
unsafe impl Sync for EffectsLane {}

impl EffectsLane {
    pub fn new(settings: LaneSettings, max_bins: usize, mechanism: WaitMechanism) -> Self {
        Self {
            settings,
            status: AtomicU8::new(LaneStatus::Finished as u8),
            completed_block: AtomicU64::new(0),
            progress: AtomicUsize::new(0),
            volume_scale: AtomicFloat::new(1.0),
            work: UnsafeCell::new(LaneWork {
                modules: Vec::new(),
                source: ComplexDataSource::new(max_bins, mechanism),
            }),
            published: UnsafeCell::new(None),
        }
    }

    #[inline]
    pub fn settings(&self) -> &LaneSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut LaneSettings {
        &mut self.settings
    }

    pub fn modules(&mut self) -> &[EffectModule] {
        &self.work.get_mut().modules
    }

    pub fn modules_mut(&mut self) -> &mut Vec<EffectModule> {
        &mut self.work.get_mut().modules
    }

    #[inline]
    pub fn status(&self) -> LaneStatus {
        LaneStatus::from_u8(self.status.load(Ordering::Acquire))
    }

    #[inline]
    pub(crate) fn status_key(&self) -> usize {
        &self.status as *const AtomicU8 as usize
    }

    /// Modules completed in the current block.
    #[inline]
    pub fn progress(&self) -> usize {
        self.progress.load(Ordering::Acquire)
    }

    /// Gain applied when summing this lane's output.
    #[inline]
    pub fn volume_scale(&self) -> f32 {
        self.volume_scale.get()
    }

    /// Whether the lane finished block `block`.
    #[inline]
    pub fn is_complete(&self, block: u64) -> bool {
        self.completed_block.load(Ordering::Acquire) == block
            && self.status() == LaneStatus::Finished
    }

    pub(crate) fn arm(&self) {
        self.status.store(LaneStatus::Ready as u8, Ordering::Release);
    }

    /// Move `Ready -> Running`. Only the winning thread may call [`Self::process`].
    #[inline]
    pub(crate) fn try_claim(&self) -> bool {
        self.status
            .compare_exchange(
                LaneStatus::Ready as u8,
                LaneStatus::Running as u8,
                Ordering::AcqRel,
                Ordering::Relaxed,
            )
            .is_ok()
    }

    pub(crate) fn set_waiting(&self, waiting: bool) {
        let status = if waiting {
            LaneStatus::Stopped
        } else {
            LaneStatus::Running
        };
        self.status.store(status as u8, Ordering::Release);
    }

    pub(crate) fn finish(&self, block: u64, mechanism: WaitMechanism) {
        self.completed_block.store(block, Ordering::Release);
        self.status
            .store(LaneStatus::Finished as u8, Ordering::Release);
        mechanism.release_mechanism().notify(self.status_key());
    }

    /// Output of the last completed block.
    ///
    /// # Safety
    /// The caller must have observed this lane complete the current block,
    /// or hold the topology lock exclusively.
    #[inline]
    pub(crate) unsafe fn published(&self) -> Option<&SimdBufferView> {
        (*self.published.get()).as_ref()
    }

    /// Run every module on `input` and publish the lane output.
    ///
    /// # Safety
    /// The caller must have claimed the lane with [`Self::try_claim`].
    pub(crate) unsafe fn process(
        &self,
        input: SimdBufferView,
        context: &RunContext,
        mechanism: WaitMechanism,
    ) {
        let work = &mut *self.work.get();
        let published = &mut *self.published.get();
        self.progress.store(0, Ordering::Release);

        if !self.settings.enabled {
            self.volume_scale.set(1.0);
            *published = Some(input);
            return;
        }

        let bins = context.bin_count;
        let access = input.lock(false, mechanism);
        let input_power = if self.settings.gain_matching {
            block_power(&access.group(0)[..bins], false)
        } else {
            0.0
        };
        work.source.begin(access, ComplexFormat::Cartesian);

        for (index, module) in work.modules.iter_mut().enumerate() {
            module.run(&mut work.source, context);
            self.progress.store(index + 1, Ordering::Release);
        }
        work.source.convert_to(ComplexFormat::Cartesian, bins);

        let scale = if self.settings.gain_matching {
            let output_power = work.source.power(bins);
            let ratio = if output_power > 0.0 {
                input_power / output_power
            } else if input_power > 0.0 {
                MAX_POWER_RATIO
            } else {
                1.0
            };
            ratio.clamp(MIN_POWER_RATIO, MAX_POWER_RATIO).sqrt()
        } else {
            1.0
        };
        self.volume_scale.set(scale);
        *published = work.source.finish();
    }

    /// Forget module state and the last output.
    pub fn reset(&mut self) {
        for module in self.modules_mut() {
            module.reset();
        }
        *self.published.get_mut() = None;
        self.volume_scale.set(1.0);
    }
}

impl std::fmt::Debug for EffectsLane {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectsLane")
            .field("settings", &self.settings)
            .field("status", &self.status())
            .field("progress", &self.progress())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::{SpectralContrast, SpectralGain};
    use approx::assert_relative_eq;
    use spectra_core::SimdBuffer;
    use wide::f32x4;

    const M: WaitMechanism = WaitMechanism::Spin;

    fn context() -> RunContext {
        RunContext {
            bin_count: 3,
            sample_rate: 48000.0,
            block_position: 0,
            block_phase: 0.0,
        }
    }

    fn input() -> SimdBuffer {
        let buffer = SimdBuffer::new(1, 4);
        {
            let mut access = buffer.lock(true, M);
            for (i, word) in access.words_mut().iter_mut().enumerate() {
                *word = f32x4::splat(i as f32 + 1.0);
            }
        }
        buffer
    }

    fn run(lane: &EffectsLane, input: &SimdBuffer) -> Vec<[f32; 4]> {
        assert!(lane.try_claim());
        unsafe {
            lane.process(input.view(), &context(), M);
        }
        lane.finish(1, M);
        assert!(lane.is_complete(1));
        let view = unsafe { lane.published() }.unwrap().clone();
        let access = view.lock(false, M);
        access.group(0)[..3].iter().map(|w| w.to_array()).collect()
    }

    #[test]
    fn test_status_transitions() {
        let lane = EffectsLane::new(LaneSettings::default(), 4, M);
        assert_eq!(lane.status(), LaneStatus::Finished);
        assert!(!lane.try_claim());
        lane.arm();
        assert_eq!(lane.status(), LaneStatus::Ready);
        assert!(lane.try_claim());
        assert!(!lane.try_claim());
        lane.set_waiting(true);
        assert_eq!(lane.status(), LaneStatus::Stopped);
        lane.set_waiting(false);
        lane.finish(7, M);
        assert!(lane.is_complete(7));
        assert!(!lane.is_complete(8));
    }

    #[test]
    fn test_modules_run_in_order() {
        let input = input();
        let mut lane = EffectsLane::new(LaneSettings::default(), 4, M);
        for gain in [2.0, 0.25] {
            let module = EffectModule::new(Box::new(SpectralGain), 4, M);
            module.parameters().set("gain", gain).unwrap();
            lane.modules_mut().push(module);
        }
        lane.arm();
        let out = run(&lane, &input);
        assert_eq!(out[2], [1.5; 4]);
        assert_eq!(lane.progress(), 2);
        assert_eq!(input.lock_count(), 0);
    }

    #[test]
    fn test_disabled_lane_forwards_input() {
        let input = input();
        let mut lane = EffectsLane::new(LaneSettings::default(), 4, M);
        lane.settings_mut().enabled = false;
        lane.modules_mut()
            .push(EffectModule::new(Box::new(SpectralGain), 4, M));
        lane.modules_mut()[0].parameters().set("gain", 0.0).unwrap();
        lane.arm();
        assert_eq!(run(&lane, &input)[0], [1.0; 4]);
    }

    #[test]
    fn test_gain_matching_restores_power() {
        let input = input();
        let mut lane = EffectsLane::new(LaneSettings::default(), 4, M);
        lane.settings_mut().gain_matching = true;
        let module = EffectModule::new(Box::new(SpectralGain), 4, M);
        module.parameters().set("gain", 0.5).unwrap();
        lane.modules_mut().push(module);
        lane.modules_mut()
            .push(EffectModule::new(Box::new(SpectralContrast), 4, M));

        lane.arm();
        run(&lane, &input);
        assert_relative_eq!(lane.volume_scale(), 2.0, max_relative = 1e-4);
    }

    #[test]
    fn test_gain_matching_of_silence_is_unity() {
        let input = SimdBuffer::new(1, 4);
        let mut lane = EffectsLane::new(LaneSettings::default(), 4, M);
        lane.settings_mut().gain_matching = true;
        lane.arm();
        run(&lane, &input);
        assert_eq!(lane.volume_scale(), 1.0);
    }
}

//! Engine parameters shared between the control and audio threads.

use crate::engine::{BlockLayout, MAX_OVERLAP};
use crate::{EngineConfig, Error, Result};
use spectra_core::{AtomicFloat, ParameterRange, SpinLock, WaitMechanism, WindowType};

/// Layout, mix and gain of a running engine.
///
/// Setters validate and may be called from any thread. The audio thread
/// reads mix and gain every callback and picks up layout changes at
/// [`UpdatePhase::BeforeProcess`](crate::UpdatePhase::BeforeProcess).
#[derive(Debug)]
pub struct EngineParameters {
    layout: SpinLock<BlockLayout>,
    min_fft_order: u32,
    max_fft_order: u32,
    mix: AtomicFloat,
    gain: AtomicFloat,
}

impl EngineParameters {
    pub fn overlap_range() -> ParameterRange {
        ParameterRange::linear(0.0, MAX_OVERLAP, 0.5)
    }

    pub fn mix_range() -> ParameterRange {
        ParameterRange::linear(0.0, 1.0, 1.0)
    }

    pub fn gain_range() -> ParameterRange {
        ParameterRange::linear(0.0, 4.0, 1.0)
    }

    pub fn new(config: &EngineConfig) -> Self {
        Self {
            layout: SpinLock::new(config.layout),
            min_fft_order: config.min_fft_order,
            max_fft_order: config.max_fft_order,
            mix: AtomicFloat::new(config.mix),
            gain: AtomicFloat::new(config.gain),
        }
    }

    pub fn layout(&self) -> BlockLayout {
        *self.layout.lock(WaitMechanism::Wait)
    }

    /// Current layout, or `None` while a setter holds it.
    pub(crate) fn try_layout(&self) -> Option<BlockLayout> {
        self.layout.try_lock().map(|layout| *layout)
    }

    pub fn set_layout(&self, layout: BlockLayout) -> Result<()> {
        self.check_order(layout.fft_order)?;
        check("overlap", Self::overlap_range(), layout.overlap)?;
        *self.layout.lock(WaitMechanism::Wait) = layout;
        Ok(())
    }

    pub fn set_fft_order(&self, fft_order: u32) -> Result<()> {
        self.check_order(fft_order)?;
        self.layout.lock(WaitMechanism::Wait).fft_order = fft_order;
        Ok(())
    }

    pub fn set_window(&self, window: WindowType) {
        self.layout.lock(WaitMechanism::Wait).window = window;
    }

    pub fn set_overlap(&self, overlap: f32) -> Result<()> {
        check("overlap", Self::overlap_range(), overlap)?;
        self.layout.lock(WaitMechanism::Wait).overlap = overlap;
        Ok(())
    }

    /// Wet share of the output, 0 (dry only) to 1 (wet only).
    #[inline]
    pub fn mix(&self) -> f32 {
        self.mix.get()
    }

    pub fn set_mix(&self, mix: f32) -> Result<()> {
        check("mix", Self::mix_range(), mix)?;
        self.mix.set(mix);
        Ok(())
    }

    /// Linear output gain.
    #[inline]
    pub fn gain(&self) -> f32 {
        self.gain.get()
    }

    pub fn set_gain(&self, gain: f32) -> Result<()> {
        check("gain", Self::gain_range(), gain)?;
        self.gain.set(gain);
        Ok(())
    }

    fn check_order(&self, fft_order: u32) -> Result<()> {
        if (self.min_fft_order..=self.max_fft_order).contains(&fft_order) {
            Ok(())
        } else {
            Err(Error::InvalidParameter {
                name: "fft_order",
                value: fft_order as f32,
            })
        }
    }
}

fn check(name: &'static str, range: ParameterRange, value: f32) -> Result<()> {
    if range.contains(value) {
        Ok(())
    } else {
        Err(Error::InvalidParameter { name, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parameters() -> EngineParameters {
        EngineParameters::new(&EngineConfig::default())
    }

    #[test]
    fn test_initial_values_follow_config() {
        let config = EngineConfig {
            mix: 0.25,
            ..Default::default()
        };
        let parameters = EngineParameters::new(&config);
        assert_eq!(parameters.mix(), 0.25);
        assert_eq!(parameters.gain(), 1.0);
        assert_eq!(parameters.layout(), config.layout);
    }

    #[test]
    fn test_layout_setters() {
        let parameters = parameters();
        parameters.set_fft_order(9).unwrap();
        parameters.set_window(WindowType::Blackman);
        parameters.set_overlap(0.75).unwrap();
        assert_eq!(
            parameters.try_layout(),
            Some(BlockLayout::new(9, WindowType::Blackman, 0.75))
        );
    }

    #[test]
    fn test_rejects_out_of_range() {
        let parameters = parameters();
        assert!(matches!(
            parameters.set_fft_order(14),
            Err(Error::InvalidParameter { name: "fft_order", .. })
        ));
        assert!(parameters.set_fft_order(4).is_err());
        assert!(parameters.set_overlap(0.95).is_err());
        assert!(parameters.set_mix(-0.1).is_err());
        assert!(parameters.set_gain(f32::INFINITY).is_err());
        assert!(parameters
            .set_layout(BlockLayout::new(10, WindowType::Hann, -0.5))
            .is_err());
        assert_eq!(parameters.layout(), BlockLayout::default());
    }

    #[test]
    fn test_held_layout_is_skipped() {
        let parameters = parameters();
        let _held = parameters.layout.lock(WaitMechanism::Spin);
        assert_eq!(parameters.try_layout(), None);
    }
}

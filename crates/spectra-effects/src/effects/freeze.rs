use crate::{ComplexFormat, EffectParameters, ParamSpec, RunContext, SpectralEffect};
use spectra_core::{bin_count, ComplexWord, ParameterRange, MAX_FFT_ORDER};
use wide::f32x4;

const FROZEN: usize = 0;

/// Holds the magnitudes captured when `frozen` switches on; phases keep
/// following the input.
#[derive(Debug)]
pub struct SpectralFreeze {
    captured: Vec<ComplexWord>,
    captured_bins: Option<usize>,
}

impl SpectralFreeze {
    pub const NAME: &'static str = "freeze";

    pub fn new() -> Self {
        Self {
            captured: vec![f32x4::ZERO; bin_count(MAX_FFT_ORDER)],
            captured_bins: None,
        }
    }
}

impl Default for SpectralFreeze {
    fn default() -> Self {
        Self::new()
    }
}

impl SpectralEffect for SpectralFreeze {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn format(&self) -> ComplexFormat {
        ComplexFormat::Polar
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        vec![ParamSpec::new("frozen", ParameterRange::toggle(false))]
    }

    fn run(
        &mut self,
        source: &[ComplexWord],
        destination: &mut [ComplexWord],
        parameters: &EffectParameters,
        context: &RunContext,
    ) {
        let bins = source.len().min(self.captured.len());
        if parameters.value(FROZEN) < 0.5 {
            self.captured_bins = None;
            destination.copy_from_slice(source);
            return;
        }

        // Recapture after a layout change as well.
        if self.captured_bins != Some(context.bin_count) {
            self.captured[..bins].copy_from_slice(&source[..bins]);
            self.captured_bins = Some(context.bin_count);
        }

        for ((d, s), c) in destination.iter_mut().zip(source).zip(&self.captured) {
            let [_, p0, _, p1] = s.to_array();
            let [m0, _, m1, _] = c.to_array();
            *d = f32x4::from([m0, p0, m1, p1]);
        }
    }

    fn reset(&mut self) {
        self.captured_bins = None;
    }
}

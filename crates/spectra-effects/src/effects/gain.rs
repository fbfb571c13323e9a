use crate::{ComplexFormat, EffectParameters, ParamSpec, RunContext, SpectralEffect};
use spectra_core::{ComplexWord, ParameterRange};
use wide::f32x4;

const GAIN: usize = 0;

/// Scales every bin by a linear gain.
#[derive(Debug, Default)]
pub struct SpectralGain;

impl SpectralGain {
    pub const NAME: &'static str = "gain";
}

impl SpectralEffect for SpectralGain {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn format(&self) -> ComplexFormat {
        ComplexFormat::Cartesian
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        vec![ParamSpec::new("gain", ParameterRange::linear(0.0, 4.0, 1.0))]
    }

    fn run(
        &mut self,
        source: &[ComplexWord],
        destination: &mut [ComplexWord],
        parameters: &EffectParameters,
        _context: &RunContext,
    ) {
        let gain = f32x4::splat(parameters.value(GAIN));
        for (d, s) in destination.iter_mut().zip(source) {
            *d = *s * gain;
        }
    }
}

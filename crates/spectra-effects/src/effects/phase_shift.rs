use crate::{ComplexFormat, EffectParameters, ParamSpec, RunContext, SpectralEffect};
use spectra_core::{ComplexWord, ParameterRange};
use std::f32::consts::{PI, TAU};
use wide::f32x4;

const SHIFT: usize = 0;
const DISPERSION: usize = 1;

/// Rotates every bin's phase by `shift` radians, plus `dispersion` radians
/// per bin across the spectrum.
#[derive(Debug, Default)]
pub struct PhaseShift;

impl PhaseShift {
    pub const NAME: &'static str = "phase_shift";
}

#[inline]
fn wrap_phase(phase: f32) -> f32 {
    phase - TAU * ((phase + PI) / TAU).floor()
}

impl SpectralEffect for PhaseShift {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn format(&self) -> ComplexFormat {
        ComplexFormat::Polar
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        vec![
            ParamSpec::new("shift", ParameterRange::linear(-PI, PI, 0.0)),
            ParamSpec::new("dispersion", ParameterRange::linear(-PI, PI, 0.0)),
        ]
    }

    fn run(
        &mut self,
        source: &[ComplexWord],
        destination: &mut [ComplexWord],
        parameters: &EffectParameters,
        _context: &RunContext,
    ) {
        let shift = parameters.value(SHIFT);
        let dispersion = parameters.value(DISPERSION);
        for (bin, (d, s)) in destination.iter_mut().zip(source).enumerate() {
            let [m0, p0, m1, p1] = s.to_array();
            let delta = shift + dispersion * bin as f32;
            *d = f32x4::from([m0, wrap_phase(p0 + delta), m1, wrap_phase(p1 + delta)]);
        }
    }
}

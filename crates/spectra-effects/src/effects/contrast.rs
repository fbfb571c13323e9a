use crate::{ComplexFormat, EffectParameters, ParamSpec, RunContext, SpectralEffect};
use spectra_core::{ComplexWord, ParameterRange};
use wide::f32x4;

const AMOUNT: usize = 0;

/// Raises magnitudes to a power, then restores each channel's energy.
///
/// `amount > 1` sharpens peaks, `amount < 1` flattens the spectrum.
#[derive(Debug, Default)]
pub struct SpectralContrast;

impl SpectralContrast {
    pub const NAME: &'static str = "contrast";
}

impl SpectralEffect for SpectralContrast {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn format(&self) -> ComplexFormat {
        ComplexFormat::Polar
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        vec![ParamSpec::new("amount", ParameterRange::linear(0.25, 4.0, 1.0))]
    }

    fn run(
        &mut self,
        source: &[ComplexWord],
        destination: &mut [ComplexWord],
        parameters: &EffectParameters,
        _context: &RunContext,
    ) {
        let amount = parameters.value(AMOUNT);
        let mut energy_in = [0.0f32; 2];
        let mut energy_out = [0.0f32; 2];

        for (d, s) in destination.iter_mut().zip(source) {
            let [m0, p0, m1, p1] = s.to_array();
            let (c0, c1) = (m0.powf(amount), m1.powf(amount));
            energy_in[0] += m0 * m0;
            energy_in[1] += m1 * m1;
            energy_out[0] += c0 * c0;
            energy_out[1] += c1 * c1;
            *d = f32x4::from([c0, p0, c1, p1]);
        }

        let norm = |i: usize| {
            if energy_out[i] > 0.0 {
                (energy_in[i] / energy_out[i]).sqrt()
            } else {
                0.0
            }
        };
        let scale = f32x4::from([norm(0), 1.0, norm(1), 1.0]);
        for d in destination.iter_mut() {
            *d = *d * scale;
        }
    }
}

use crate::{ComplexFormat, EffectParameters, ParamSpec, RunContext, SpectralEffect};
use spectra_core::simd::{apply_words_masked, bin_mask};
use spectra_core::{BufferOperation, ComplexWord, ParameterRange};
use wide::f32x4;

const LOW: usize = 0;
const HIGH: usize = 1;
const REJECT: usize = 2;

/// Brick-wall band filter: keeps the bins inside `low_hz..=high_hz`, or
/// everything outside when `reject` is on.
#[derive(Debug, Default)]
pub struct SpectralFilter;

impl SpectralFilter {
    pub const NAME: &'static str = "filter";
}

impl SpectralEffect for SpectralFilter {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn format(&self) -> ComplexFormat {
        ComplexFormat::Cartesian
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        vec![
            ParamSpec::new("low_hz", ParameterRange::logarithmic(10.0, 24000.0, 10.0)),
            ParamSpec::new("high_hz", ParameterRange::logarithmic(10.0, 24000.0, 24000.0)),
            ParamSpec::new("reject", ParameterRange::toggle(false)),
        ]
    }

    fn run(
        &mut self,
        source: &[ComplexWord],
        destination: &mut [ComplexWord],
        parameters: &EffectParameters,
        context: &RunContext,
    ) {
        let low = parameters.value(LOW);
        let high = parameters.value(HIGH).max(low);
        let start = context.frequency_bin(low);
        let end = context.frequency_bin(high) + 1;
        let reject = parameters.value(REJECT) >= 0.5;

        destination.fill(f32x4::ZERO);
        apply_words_masked(destination, source, BufferOperation::Assign, |bin| {
            let band = bin_mask(bin, start, end);
            if reject {
                !band
            } else {
                band
            }
        });
    }
}

//! One effect plus its output buffer and live parameters.

use crate::{ComplexDataSource, ComplexFormat, EffectParameters, RunContext, SpectralEffect};
use spectra_core::simd::apply_words;
use spectra_core::{BufferOperation, SimdBuffer, WaitMechanism};
use std::sync::Arc;

/// A [`SpectralEffect`] placed in a lane.
///
/// Owns the buffer it writes into; after a run that buffer becomes the
/// lane's source for the next module.
pub struct EffectModule {
    effect: Box<dyn SpectralEffect>,
    parameters: Arc<EffectParameters>,
    buffer: SimdBuffer,
    mechanism: WaitMechanism,
}

impl EffectModule {
    pub fn new(effect: Box<dyn SpectralEffect>, max_bins: usize, mechanism: WaitMechanism) -> Self {
        let parameters = Arc::new(EffectParameters::new(effect.name(), effect.parameters()));
        Self {
            effect,
            parameters,
            buffer: SimdBuffer::new(1, max_bins),
            mechanism,
        }
    }

    pub fn name(&self) -> &'static str {
        self.effect.name()
    }

    pub fn format(&self) -> ComplexFormat {
        self.effect.format()
    }

    /// Handle for changing parameters from any thread.
    pub fn parameters(&self) -> &Arc<EffectParameters> {
        &self.parameters
    }

    pub fn reset(&mut self) {
        self.effect.reset();
    }

    /// Run on the source's current block and publish the result as the new
    /// source. Disabled modules leave the source untouched.
    pub fn run(&mut self, source: &mut ComplexDataSource, context: &RunContext) {
        if !self.parameters.enabled() {
            return;
        }
        let bins = context.bin_count;
        let format = self.effect.format();
        source.convert_to(format, bins);

        let mut output = self.buffer.lock(true, self.mechanism);
        {
            let input = &source.words()[..bins];
            let destination = &mut output.group_mut(0)[..bins];
            self.effect.run(input, destination, &self.parameters, context);

            let mix = self.parameters.mix();
            if mix < 1.0 {
                apply_words(destination, input, BufferOperation::Interpolate(1.0 - mix));
            }
        }
        output.downgrade();
        source.publish(output, format);
    }
}

impl std::fmt::Debug for EffectModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectModule")
            .field("effect", &self.effect.name())
            .field("parameters", &self.parameters)
            .finish()
    }
}

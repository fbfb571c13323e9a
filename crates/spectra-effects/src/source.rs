//! The block of bins a lane is currently reading from.

use crate::ComplexFormat;
use spectra_core::simd::{block_power, from_polar, to_polar};
use spectra_core::{BufferAccess, ComplexWord, SimdBuffer, SimdBufferView, WaitMechanism};

/// Current input of the next module in a lane, held under a shared lock.
///
/// Publishing a new source releases the previous one. Format changes go
/// through a scratch buffer owned by the source.
#[derive(Debug)]
pub struct ComplexDataSource {
    current: Option<BufferAccess>,
    format: ComplexFormat,
    conversion: SimdBuffer,
    mechanism: WaitMechanism,
}

impl ComplexDataSource {
    pub fn new(max_bins: usize, mechanism: WaitMechanism) -> Self {
        Self {
            current: None,
            format: ComplexFormat::Cartesian,
            conversion: SimdBuffer::new(1, max_bins),
            mechanism,
        }
    }

    #[inline]
    pub fn format(&self) -> ComplexFormat {
        self.format
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.current.is_some()
    }

    /// Start a block from a shared hold on the lane input.
    pub fn begin(&mut self, access: BufferAccess, format: ComplexFormat) {
        assert!(self.current.is_none(), "source already active");
        debug_assert!(!access.is_exclusive());
        self.current = Some(access);
        self.format = format;
    }

    /// Words of the current source.
    ///
    /// Panics if no block is active.
    #[inline]
    pub fn words(&self) -> &[ComplexWord] {
        match &self.current {
            Some(access) => access.group(0),
            None => panic!("read from an inactive source"),
        }
    }

    /// Replace the current source, releasing the previous hold.
    pub fn publish(&mut self, access: BufferAccess, format: ComplexFormat) {
        debug_assert!(!access.is_exclusive());
        self.current = Some(access);
        self.format = format;
    }

    /// Convert the first `bins` bins into `format` if they are not already.
    pub fn convert_to(&mut self, format: ComplexFormat, bins: usize) {
        if self.format == format {
            return;
        }
        let Some(current) = self.current.take() else {
            panic!("convert of an inactive source");
        };
        assert!(
            !current.view().same_storage(&self.conversion.view()),
            "source is already the conversion buffer"
        );

        let mut scratch = self.conversion.lock(true, self.mechanism);
        {
            let source = &current.group(0)[..bins];
            let destination = &mut scratch.group_mut(0)[..bins];
            let convert = match format {
                ComplexFormat::Polar => to_polar,
                ComplexFormat::Cartesian => from_polar,
            };
            for (d, s) in destination.iter_mut().zip(source) {
                *d = convert(*s);
            }
        }
        drop(current);
        scratch.downgrade();
        self.publish(scratch, format);
    }

    /// Summed squared magnitude of the first `bins` bins.
    pub fn power(&self, bins: usize) -> f32 {
        block_power(&self.words()[..bins], self.format == ComplexFormat::Polar)
    }

    /// End the block: release the hold and return what was last published.
    pub fn finish(&mut self) -> Option<SimdBufferView> {
        self.current.take().map(|access| access.view().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use wide::f32x4;

    const M: WaitMechanism = WaitMechanism::Spin;

    #[test]
    fn test_conversion_roundtrip_releases_input() {
        let input = SimdBuffer::new(1, 2);
        input.lock(true, M).words_mut()[0] = f32x4::from([3.0, 4.0, 0.0, -2.0]);

        let mut source = ComplexDataSource::new(2, M);
        source.begin(input.lock(false, M), ComplexFormat::Cartesian);
        assert_eq!(input.lock_count(), 1);

        source.convert_to(ComplexFormat::Polar, 2);
        assert_eq!(input.lock_count(), 0);
        assert_eq!(source.format(), ComplexFormat::Polar);
        assert_relative_eq!(source.words()[0].to_array()[0], 5.0);
        assert_relative_eq!(source.power(2), 29.0, max_relative = 1e-6);

        let target = SimdBuffer::new(1, 2);
        let mut hold = target.lock(true, M);
        hold.group_mut(0)[..2].copy_from_slice(&source.words()[..2]);
        hold.downgrade();
        source.publish(hold, ComplexFormat::Polar);

        source.convert_to(ComplexFormat::Cartesian, 2);
        let back = source.words()[0].to_array();
        assert_relative_eq!(back[0], 3.0, epsilon = 1e-5);
        assert_relative_eq!(back[1], 4.0, epsilon = 1e-5);
        assert_eq!(target.lock_count(), 0);

        let view = source.finish().unwrap();
        assert!(!source.is_active());
        assert_eq!(view.groups(), 1);
    }

    #[test]
    fn test_same_format_is_noop() {
        let input = SimdBuffer::new(1, 1);
        let mut source = ComplexDataSource::new(1, M);
        source.begin(input.lock(false, M), ComplexFormat::Cartesian);
        source.convert_to(ComplexFormat::Cartesian, 1);
        assert!(source.finish().unwrap().same_storage(&input.view()));
        assert_eq!(input.lock_count(), 0);
    }
}

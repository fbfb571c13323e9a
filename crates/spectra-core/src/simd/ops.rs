use super::ComplexWord;
use crate::BufferOperation;
use wide::f32x4;

/// Combine `source` into `destination` word by word.
///
/// Lane-wise arithmetic; fades ramp across the slice.
pub fn apply_words(destination: &mut [ComplexWord], source: &[ComplexWord], operation: BufferOperation) {
    let len = destination.len().min(source.len());
    let step = if len > 0 { 1.0 / len as f32 } else { 0.0 };
    for (i, (d, s)) in destination.iter_mut().zip(source).enumerate() {
        *d = combine(*d, *s, operation, i as f32 * step);
    }
}

/// Like [`apply_words`], but only bins whose mask word is all-ones change.
///
/// Unselected bins keep their value bit for bit.
pub fn apply_words_masked(
    destination: &mut [ComplexWord],
    source: &[ComplexWord],
    operation: BufferOperation,
    mask: impl Fn(usize) -> ComplexWord,
) {
    let len = destination.len().min(source.len());
    let step = if len > 0 { 1.0 / len as f32 } else { 0.0 };
    for (i, (d, s)) in destination.iter_mut().zip(source).enumerate() {
        let changed = combine(*d, *s, operation, i as f32 * step);
        *d = mask(i).blend(changed, *d);
    }
}

#[inline(always)]
fn combine(d: ComplexWord, s: ComplexWord, operation: BufferOperation, t: f32) -> ComplexWord {
    match operation {
        BufferOperation::Assign => s,
        BufferOperation::Add => d + s,
        BufferOperation::Multiply => d * s,
        BufferOperation::FadeInAdd => d + s * f32x4::splat(t),
        BufferOperation::FadeOutAdd => d + s * f32x4::splat(1.0 - t),
        BufferOperation::Interpolate(amount) => d + (s - d) * f32x4::splat(amount),
    }
}

/// Selection word for bin `bin`: all-ones inside `start..end`, zero outside.
#[inline]
pub fn bin_mask(bin: usize, start: usize, end: usize) -> ComplexWord {
    let bits = if bin >= start && bin < end { u32::MAX } else { 0 };
    f32x4::from([f32::from_bits(bits); 4])
}

/// Cartesian word to `(magnitude, phase)` pairs.
#[inline]
pub fn to_polar(word: ComplexWord) -> ComplexWord {
    let [re0, im0, re1, im1] = word.to_array();
    f32x4::from([re0.hypot(im0), im0.atan2(re0), re1.hypot(im1), im1.atan2(re1)])
}

/// `(magnitude, phase)` pairs back to a Cartesian word.
#[inline]
pub fn from_polar(word: ComplexWord) -> ComplexWord {
    let [m0, p0, m1, p1] = word.to_array();
    let (s0, c0) = p0.sin_cos();
    let (s1, c1) = p1.sin_cos();
    f32x4::from([m0 * c0, m0 * s0, m1 * c1, m1 * s1])
}

/// Sum of squared magnitudes over a block.
pub fn block_power(words: &[ComplexWord], polar: bool) -> f32 {
    let mut total = 0.0f32;
    for word in words {
        let [a, b, c, d] = word.to_array();
        total += if polar { a * a + c * c } else { a * a + b * b + c * c + d * d };
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn words(values: &[[f32; 4]]) -> Vec<ComplexWord> {
        values.iter().map(|&v| f32x4::from(v)).collect()
    }

    #[test]
    fn test_apply_add_and_interpolate() {
        let mut destination = words(&[[1.0, 2.0, 3.0, 4.0]]);
        let source = words(&[[1.0, 1.0, 1.0, 1.0]]);
        apply_words(&mut destination, &source, BufferOperation::Add);
        assert_eq!(destination[0].to_array(), [2.0, 3.0, 4.0, 5.0]);

        apply_words(&mut destination, &source, BufferOperation::Interpolate(0.5));
        assert_eq!(destination[0].to_array(), [1.5, 2.0, 2.5, 3.0]);
    }

    #[test]
    fn test_masked_apply_leaves_unselected_bins() {
        let mut destination = words(&[[1.0; 4], [2.0; 4], [3.0; 4], [4.0; 4]]);
        let source = words(&[[0.0; 4]; 4]);
        apply_words_masked(&mut destination, &source, BufferOperation::Assign, |bin| {
            bin_mask(bin, 1, 3)
        });
        let lanes: Vec<f32> = destination.iter().map(|w| w.to_array()[0]).collect();
        assert_eq!(lanes, vec![1.0, 0.0, 0.0, 4.0]);
    }

    #[test]
    fn test_polar_roundtrip() {
        let word = f32x4::from([3.0, 4.0, -1.0, 0.5]);
        let polar = to_polar(word);
        assert_relative_eq!(polar.to_array()[0], 5.0);
        let back = from_polar(polar).to_array();
        for (a, b) in back.iter().zip(word.to_array()) {
            assert_relative_eq!(*a, b, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_block_power_matches_formats() {
        let cartesian = words(&[[3.0, 4.0, 0.0, 1.0], [1.0, 0.0, 0.0, 0.0]]);
        let polar: Vec<_> = cartesian.iter().map(|w| to_polar(*w)).collect();
        assert_relative_eq!(block_power(&cartesian, false), 27.0);
        assert_relative_eq!(block_power(&polar, true), 27.0, max_relative = 1e-5);
    }
}

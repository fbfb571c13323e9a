//! Overlap-add of synthesized blocks.

use super::BlockLayout;
use spectra_core::{BufferOperation, CircularBuffer};

/// Output ring plus the scratch block being synthesized.
///
/// Samples before `ready_end` are final. Samples in `[ready_end,
/// overlap_end)` still wait for the overlapping part of later blocks.
#[derive(Debug)]
pub(crate) struct OutputBuffer {
    ring: CircularBuffer,
    block: CircularBuffer,
    transition: CircularBuffer,
    ready_end: i64,
    overlap_end: i64,
}

impl OutputBuffer {
    pub(crate) fn new(channels: usize, capacity: usize, max_size: usize, layout: &BlockLayout) -> Self {
        let mut output = Self {
            ring: CircularBuffer::new(channels, capacity),
            block: CircularBuffer::new(channels, max_size),
            transition: CircularBuffer::new(channels, max_size),
            ready_end: 0,
            overlap_end: 0,
        };
        output.reset(layout);
        output
    }

    /// Scratch for the next block of `channel`.
    #[inline]
    pub(crate) fn block_mut(&mut self, channel: usize, size: usize) -> &mut [f32] {
        &mut self.block.channel_mut(channel)[..size]
    }

    /// Zero the scratch block over `[from, to)` on every channel.
    pub(crate) fn clear_block(&mut self, from: usize, to: usize) {
        for channel in 0..self.block.channels() {
            self.block.channel_mut(channel)[from..to].fill(0.0);
        }
    }

    /// Whether every sample before `end` is final.
    #[inline]
    pub(crate) fn is_ready(&self, end: i64) -> bool {
        end <= self.ready_end
    }

    /// Whether samples from `start` on are still waiting for overlap.
    #[inline]
    pub(crate) fn has_pending(&self, start: i64) -> bool {
        self.overlap_end > start
    }

    /// Add the scratch block at absolute `start`.
    ///
    /// The part overlapping earlier blocks is summed, the rest overwrites
    /// stale samples. With `transition` set, the pending tail of the previous
    /// layout fades out while the new block fades in over their shared span.
    pub(crate) fn overlap_add(&mut self, start: i64, size: usize, hop: usize, transition: bool) {
        let destination = self.ring.wrap_signed(start);
        let pending = (self.overlap_end - start).max(0) as usize;
        let shared = pending.min(size);

        if transition && shared > 0 {
            self.transition
                .apply_to_buffer(&self.ring, BufferOperation::Assign, 0, destination, shared, None);
            for channel in 0..self.ring.channels() {
                self.ring.fill(channel, destination, pending, 0.0);
            }
            self.ring.apply_to_buffer(
                &self.transition,
                BufferOperation::FadeOutAdd,
                destination,
                0,
                shared,
                None,
            );
            self.ring
                .apply_to_buffer(&self.block, BufferOperation::FadeInAdd, destination, 0, shared, None);
        } else {
            self.ring
                .apply_to_buffer(&self.block, BufferOperation::Add, destination, 0, shared, None);
        }
        self.ring.apply_to_buffer(
            &self.block,
            BufferOperation::Assign,
            self.ring.wrap_signed(start + shared as i64),
            shared,
            size - shared,
            None,
        );

        self.ready_end = start + hop as i64;
        self.overlap_end = start + size as i64;
    }

    /// Mix `samples` final samples of `channel` from absolute `start` into
    /// `destination`: `d += (wet - d) * mix`.
    pub(crate) fn mix_into(
        &self,
        destination: &mut CircularBuffer,
        channel: usize,
        start: i64,
        samples: usize,
        mix: f32,
    ) {
        debug_assert!(self.is_ready(start + samples as i64));
        destination.apply_to_buffer(
            &self.ring,
            BufferOperation::Interpolate(mix),
            0,
            self.ring.wrap_signed(start),
            samples,
            Some(1 << channel),
        );
    }

    pub(crate) fn reset(&mut self, layout: &BlockLayout) {
        self.ring.clear();
        self.block.clear();
        self.transition.clear();
        self.ready_end = -((layout.size() - layout.hop()) as i64);
        self.overlap_end = self.ready_end;
    }

    #[cfg(test)]
    pub(crate) fn block(&self) -> &CircularBuffer {
        &self.block
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spectra_core::WindowType;

    fn read(output: &OutputBuffer, start: i64, samples: usize) -> Vec<f32> {
        let mut out = vec![0.0; samples];
        output
            .ring
            .read_buffer(&mut out, 0, output.ring.wrap_signed(start));
        out
    }

    fn write_block(output: &mut OutputBuffer, size: usize, value: f32) {
        for channel in 0..2 {
            output.block_mut(channel, size).fill(value);
        }
    }

    #[test]
    fn test_overlapping_blocks_sum() {
        let layout = BlockLayout::new(3, WindowType::Rectangular, 0.5);
        let mut output = OutputBuffer::new(2, 32, 8, &layout);
        assert!(output.is_ready(-4));
        assert!(!output.is_ready(0));

        write_block(&mut output, 8, 1.0);
        output.overlap_add(-4, 8, 4, false);
        assert!(output.is_ready(0));
        assert!(output.has_pending(0));

        write_block(&mut output, 8, 2.0);
        output.overlap_add(0, 8, 4, false);
        assert_eq!(read(&output, 0, 8), [3.0, 3.0, 3.0, 3.0, 2.0, 2.0, 2.0, 2.0]);
        assert!(output.is_ready(4));
    }

    #[test]
    fn test_non_overlapping_part_overwrites() {
        let layout = BlockLayout::new(2, WindowType::Rectangular, 0.0);
        let mut output = OutputBuffer::new(2, 16, 4, &layout);
        output.ring.fill(0, 0, 16, 7.0);
        write_block(&mut output, 4, 1.0);
        output.overlap_add(0, 4, 4, false);
        assert_eq!(read(&output, 0, 4), [1.0; 4]);
    }

    #[test]
    fn test_transition_crossfades_pending_tail() {
        let layout = BlockLayout::new(3, WindowType::Rectangular, 0.5);
        let mut output = OutputBuffer::new(2, 32, 8, &layout);
        write_block(&mut output, 8, 4.0);
        output.overlap_add(-4, 8, 4, false);

        // Pending tail [0, 4) of value 4 fades out, the new block fades in.
        write_block(&mut output, 4, 2.0);
        output.overlap_add(0, 4, 2, true);
        let out = read(&output, 0, 4);
        for (i, sample) in out.iter().enumerate() {
            let t = i as f32 / 4.0;
            assert!((sample - (4.0 * (1.0 - t) + 2.0 * t)).abs() < 1e-6);
        }
        assert!(output.is_ready(2));
        assert!(!output.has_pending(4));
    }

    #[test]
    fn test_transition_drops_tail_beyond_new_block() {
        let layout = BlockLayout::new(3, WindowType::Rectangular, 0.0);
        let mut output = OutputBuffer::new(2, 32, 8, &layout);
        write_block(&mut output, 8, 1.0);
        output.overlap_add(-6, 8, 2, false);

        write_block(&mut output, 2, 0.0);
        output.overlap_add(-4, 2, 2, true);
        assert_eq!(read(&output, -2, 4), [0.0; 4]);
    }
}

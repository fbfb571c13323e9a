//! Time-domain input history.

use super::BlockLayout;
use spectra_core::CircularBuffer;

/// Input ring plus the position of the next analysis block.
///
/// Positions are absolute sample counts since the last reset; the first
/// block starts before 0 so that sample 0 is covered by a full set of
/// overlapping blocks.
#[derive(Debug)]
pub(crate) struct InputBuffer {
    ring: CircularBuffer,
    written: i64,
    block_begin: i64,
}

impl InputBuffer {
    pub(crate) fn new(channels: usize, capacity: usize, layout: &BlockLayout) -> Self {
        Self {
            ring: CircularBuffer::new(channels, capacity),
            written: 0,
            block_begin: first_block(layout),
        }
    }

    #[inline]
    pub(crate) fn channels(&self) -> usize {
        self.ring.channels()
    }

    /// Samples appended since the last reset.
    #[inline]
    pub(crate) fn written(&self) -> i64 {
        self.written
    }

    /// Start of the next analysis block.
    #[inline]
    pub(crate) fn block_begin(&self) -> i64 {
        self.block_begin
    }

    /// Append `samples` per channel; missing channels read as silence.
    pub(crate) fn push(&mut self, input: &[&[f32]], samples: usize) {
        self.ring.write_to_buffer_end(input, samples);
        self.written += samples as i64;
    }

    /// Whether a full block of `size` samples from `block_begin` is buffered.
    #[inline]
    pub(crate) fn block_ready(&self, size: usize) -> bool {
        self.written >= self.block_begin + size as i64
    }

    /// Copy the next block of `channel` into `block`.
    pub(crate) fn read_block(&self, channel: usize, block: &mut [f32]) {
        self.read(channel, self.block_begin, block);
    }

    pub(crate) fn advance(&mut self, hop: usize) {
        self.block_begin += hop as i64;
    }

    /// Copy samples from absolute `start`; positions before 0 are silent.
    pub(crate) fn read(&self, channel: usize, start: i64, output: &mut [f32]) {
        debug_assert!(
            start + output.len() as i64 <= self.written,
            "read past the written input"
        );
        self.ring
            .read_buffer(output, channel, self.ring.wrap_signed(start));
        let silent = (-start).clamp(0, output.len() as i64) as usize;
        output[..silent].fill(0.0);
    }

    pub(crate) fn reset(&mut self, layout: &BlockLayout) {
        self.ring.clear();
        self.written = 0;
        self.block_begin = first_block(layout);
    }
}

fn first_block(layout: &BlockLayout) -> i64 {
    -((layout.size() - layout.hop()) as i64)
}

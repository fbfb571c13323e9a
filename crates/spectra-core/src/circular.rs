//! Multi-channel ring buffer with sample-wise operations.
//!
//! Positions passed to the buffer are wrapped by its size, so callers can work
//! with monotonically increasing positions. Power-of-two sizes wrap with a mask.

/// Per-sample combination of a source into a destination.
///
/// Fades ramp `t` linearly from 0 towards 1 across the processed span.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BufferOperation {
    /// `d = s`
    Assign,
    /// `d += s`
    Add,
    /// `d *= s`
    Multiply,
    /// `d += s * t`
    FadeInAdd,
    /// `d += s * (1 - t)`
    FadeOutAdd,
    /// `d += (s - d) * amount`
    Interpolate(f32),
}

impl BufferOperation {
    #[inline]
    fn apply(self, destination: &mut [f32], source: &[f32], ramp_start: f32, ramp_step: f32) {
        match self {
            Self::Assign => destination.copy_from_slice(source),
            Self::Add => {
                for (d, s) in destination.iter_mut().zip(source) {
                    *d += *s;
                }
            }
            Self::Multiply => {
                for (d, s) in destination.iter_mut().zip(source) {
                    *d *= *s;
                }
            }
            Self::FadeInAdd => {
                for (i, (d, s)) in destination.iter_mut().zip(source).enumerate() {
                    *d += *s * (ramp_start + i as f32 * ramp_step);
                }
            }
            Self::FadeOutAdd => {
                for (i, (d, s)) in destination.iter_mut().zip(source).enumerate() {
                    *d += *s * (1.0 - (ramp_start + i as f32 * ramp_step));
                }
            }
            Self::Interpolate(amount) => {
                for (d, s) in destination.iter_mut().zip(source) {
                    *d += (*s - *d) * amount;
                }
            }
        }
    }
}

/// Planar ring buffer: `channels` rings of `size` samples each.
#[derive(Debug, Clone, Default)]
pub struct CircularBuffer {
    data: Vec<f32>,
    channels: usize,
    size: usize,
    mask: Option<usize>,
    end: usize,
}

impl CircularBuffer {
    pub fn new(channels: usize, size: usize) -> Self {
        let mut buffer = Self::default();
        buffer.reserve(channels, size, true);
        buffer
    }

    #[inline]
    pub fn channels(&self) -> usize {
        self.channels
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Write cursor used by [`Self::write_to_buffer_end`].
    #[inline]
    pub fn end(&self) -> usize {
        self.end
    }

    /// Wrap an absolute position into `0..size`.
    #[inline]
    pub fn wrap(&self, position: usize) -> usize {
        match self.mask {
            Some(mask) => position & mask,
            None if self.size == 0 => 0,
            None => position % self.size,
        }
    }

    /// Wrap a signed absolute position into `0..size`.
    #[inline]
    pub fn wrap_signed(&self, position: i64) -> usize {
        if self.size == 0 {
            return 0;
        }
        position.rem_euclid(self.size as i64) as usize
    }

    /// Resize to at least `channels` x `size`, or exactly that when
    /// `fit_to_size` is set.
    ///
    /// Existing samples keep their index within each surviving channel; new
    /// space is zeroed. Any change of shape resets the write cursor to 0.
    pub fn reserve(&mut self, channels: usize, size: usize, fit_to_size: bool) {
        let (channels, size) = if fit_to_size {
            (channels, size)
        } else {
            (channels.max(self.channels), size.max(self.size))
        };
        if channels == self.channels && size == self.size {
            return;
        }

        let mut data = vec![0.0; channels * size];
        let keep = size.min(self.size);
        for channel in 0..channels.min(self.channels) {
            data[channel * size..channel * size + keep]
                .copy_from_slice(&self.data[channel * self.size..channel * self.size + keep]);
        }

        self.data = data;
        self.channels = channels;
        self.size = size;
        self.mask = size.is_power_of_two().then(|| size - 1);
        self.end = 0;
    }

    /// Zero every sample and reset the write cursor.
    pub fn clear(&mut self) {
        self.data.fill(0.0);
        self.end = 0;
    }

    #[inline]
    pub fn channel(&self, channel: usize) -> &[f32] {
        &self.data[channel * self.size..(channel + 1) * self.size]
    }

    #[inline]
    pub fn channel_mut(&mut self, channel: usize) -> &mut [f32] {
        &mut self.data[channel * self.size..(channel + 1) * self.size]
    }

    /// Sample at an absolute position.
    #[inline]
    pub fn sample(&self, channel: usize, position: usize) -> f32 {
        self.channel(channel)[self.wrap(position)]
    }

    /// Visit the contiguous pieces of a wrapped span.
    ///
    /// `visit(offset_in_span, index_in_ring, len)`
    fn for_each_piece(&self, start: usize, samples: usize, mut visit: impl FnMut(usize, usize, usize)) {
        assert!(
            samples <= self.size,
            "span of {samples} samples exceeds ring size {}",
            self.size
        );
        let mut done = 0;
        let mut index = self.wrap(start);
        while done < samples {
            let len = (samples - done).min(self.size - index);
            visit(done, index, len);
            done += len;
            index = 0;
        }
    }

    /// Copy `output.len()` samples of `channel` starting at absolute `start`.
    pub fn read_buffer(&self, output: &mut [f32], channel: usize, start: usize) {
        let ring = self.channel(channel);
        self.for_each_piece(start, output.len(), |offset, index, len| {
            output[offset..offset + len].copy_from_slice(&ring[index..index + len]);
        });
    }

    /// Overwrite samples of `channel` starting at absolute `start`.
    pub fn write_buffer(&mut self, input: &[f32], channel: usize, start: usize) {
        let size = self.size;
        let mut pieces = [(0usize, 0usize, 0usize); 2];
        let mut count = 0;
        self.for_each_piece(start, input.len(), |offset, index, len| {
            pieces[count] = (offset, index, len);
            count += 1;
        });
        let ring = &mut self.data[channel * size..(channel + 1) * size];
        for &(offset, index, len) in &pieces[..count] {
            ring[index..index + len].copy_from_slice(&input[offset..offset + len]);
        }
    }

    /// Append `samples` samples per channel at the write cursor and advance it.
    ///
    /// `input[c]` feeds channel `c`; channels without input are zero-filled.
    pub fn write_to_buffer_end(&mut self, input: &[&[f32]], samples: usize) {
        let start = self.end;
        for channel in 0..self.channels {
            match input.get(channel) {
                Some(data) => self.write_buffer(&data[..samples], channel, start),
                None => self.fill(channel, start, samples, 0.0),
            }
        }
        self.end = self.wrap(start + samples);
    }

    /// Set `samples` samples of `channel` from absolute `start` to `value`.
    pub fn fill(&mut self, channel: usize, start: usize, samples: usize, value: f32) {
        let size = self.size;
        let mut pieces = [(0usize, 0usize); 2];
        let mut count = 0;
        self.for_each_piece(start, samples, |_, index, len| {
            pieces[count] = (index, len);
            count += 1;
        });
        let ring = &mut self.data[channel * size..(channel + 1) * size];
        for &(index, len) in &pieces[..count] {
            ring[index..index + len].fill(value);
        }
    }

    /// Multiply `samples` samples of `channel` from absolute `start` by `gain`.
    pub fn apply_gain(&mut self, channel: usize, start: usize, samples: usize, gain: f32) {
        let size = self.size;
        let mut pieces = [(0usize, 0usize); 2];
        let mut count = 0;
        self.for_each_piece(start, samples, |_, index, len| {
            pieces[count] = (index, len);
            count += 1;
        });
        let ring = &mut self.data[channel * size..(channel + 1) * size];
        for &(index, len) in &pieces[..count] {
            for sample in &mut ring[index..index + len] {
                *sample *= gain;
            }
        }
    }

    /// Combine `samples` samples of `source` (from `source_start`) into this
    /// buffer (from `destination_start`).
    ///
    /// Both positions wrap by their own buffer's size. Only channels present
    /// in both buffers and selected by `channel_mask` (bit per channel, `None`
    /// for all) are touched.
    pub fn apply_to_buffer(
        &mut self,
        source: &CircularBuffer,
        operation: BufferOperation,
        destination_start: usize,
        source_start: usize,
        samples: usize,
        channel_mask: Option<u64>,
    ) {
        assert!(
            samples <= source.size,
            "span of {samples} samples exceeds source size {}",
            source.size
        );

        // Split the span where either ring wraps: at most three pieces.
        let mut pieces = [(0usize, 0usize, 0usize, 0usize); 3];
        let mut count = 0;
        self.for_each_piece(destination_start, samples, |offset, index, len| {
            let mut done = 0;
            while done < len {
                let source_index = source.wrap(source_start + offset + done);
                let piece = (len - done).min(source.size - source_index);
                pieces[count] = (offset + done, index + done, source_index, piece);
                count += 1;
                done += piece;
            }
        });

        let ramp_step = if samples > 0 { 1.0 / samples as f32 } else { 0.0 };
        let size = self.size;
        for channel in 0..self.channels.min(source.channels) {
            if channel_mask.is_some_and(|mask| channel >= 64 || mask & (1 << channel) == 0) {
                continue;
            }
            let ring = &mut self.data[channel * size..(channel + 1) * size];
            let source_ring = source.channel(channel);
            for &(offset, index, source_index, len) in &pieces[..count] {
                operation.apply(
                    &mut ring[index..index + len],
                    &source_ring[source_index..source_index + len],
                    offset as f32 * ramp_step,
                    ramp_step,
                );
            }
        }
    }
}

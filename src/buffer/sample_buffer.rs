/// Owned, channel-major block of samples.
///
/// Used as the destination of [`RingBuffer::read`](super::RingBuffer::read)
/// and as an input for [`RingWriter::write_buffer`](super::RingWriter::write_buffer).
/// Resizing keeps the existing allocations where possible so a consumer can
/// reuse one buffer across many reads.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleBuffer {
    channels: Vec<Vec<f32>>,
    num_samples: usize,
}

impl SampleBuffer {
    pub fn new(num_channels: usize, num_samples: usize) -> Self {
        Self {
            channels: vec![vec![0.0; num_samples]; num_channels],
            num_samples,
        }
    }

    /// Build a buffer from per-channel vectors; shorter channels are padded
    /// with silence to the longest one.
    pub fn from_channels(mut channels: Vec<Vec<f32>>) -> Self {
        let num_samples = channels.iter().map(Vec::len).max().unwrap_or(0);
        for channel in &mut channels {
            channel.resize(num_samples, 0.0);
        }
        Self {
            channels,
            num_samples,
        }
    }

    #[inline]
    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    #[inline]
    pub fn num_samples(&self) -> usize {
        self.num_samples
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty() || self.num_samples == 0
    }

    /// Change the shape. Existing content is not preserved in any defined way;
    /// call [`clear`](Self::clear) afterwards if the content matters.
    pub fn set_size(&mut self, num_channels: usize, num_samples: usize) {
        self.channels.resize_with(num_channels, Vec::new);
        for channel in &mut self.channels {
            channel.resize(num_samples, 0.0);
        }
        self.num_samples = num_samples;
    }

    pub fn clear(&mut self) {
        for channel in &mut self.channels {
            channel.fill(0.0);
        }
    }

    pub fn channel(&self, index: usize) -> &[f32] {
        &self.channels[index]
    }

    pub fn channel_mut(&mut self, index: usize) -> &mut [f32] {
        &mut self.channels[index]
    }

    pub fn channels(&self) -> impl Iterator<Item = &[f32]> {
        self.channels.iter().map(Vec::as_slice)
    }

    pub fn channels_mut(&mut self) -> impl Iterator<Item = &mut [f32]> {
        self.channels.iter_mut().map(Vec::as_mut_slice)
    }

    /// Largest absolute sample over all channels.
    pub fn magnitude(&self) -> f32 {
        self.channels()
            .flat_map(|c| c.iter())
            .fold(0.0f32, |peak, s| peak.max(s.abs()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_size_reshapes_every_channel() {
        let mut buffer = SampleBuffer::new(1, 4);
        buffer.set_size(2, 8);

        assert_eq!(buffer.num_channels(), 2);
        assert_eq!(buffer.num_samples(), 8);
        assert!(buffer.channels().all(|c| c.len() == 8));

        buffer.set_size(1, 3);
        assert_eq!(buffer.num_channels(), 1);
        assert_eq!(buffer.channel(0).len(), 3);
    }

    #[test]
    fn from_channels_pads_short_channels() {
        let buffer = SampleBuffer::from_channels(vec![vec![1.0, 2.0, 3.0], vec![4.0]]);

        assert_eq!(buffer.num_samples(), 3);
        assert_eq!(buffer.channel(1), &[4.0, 0.0, 0.0]);
    }

    #[test]
    fn clear_keeps_shape() {
        let mut buffer = SampleBuffer::from_channels(vec![vec![0.5; 16]]);
        buffer.clear();

        assert_eq!(buffer.num_samples(), 16);
        assert_eq!(buffer.magnitude(), 0.0);
    }
}

use std::sync::Arc;

use super::{RingBuffer, SampleBuffer};

/// The one handle allowed to write into a [`RingBuffer`].
///
/// Creating it registers the writer and dropping it releases the slot, so a
/// second live `RingWriter` on the same buffer panics at construction. All
/// methods are wait-free and allocation-free; they are no-ops while the buffer
/// is inactive or being resized.
pub struct RingWriter {
    buffer: Arc<RingBuffer>,
}

impl RingWriter {
    /// # Panics
    ///
    /// If the buffer already has a registered writer.
    pub fn new(buffer: Arc<RingBuffer>) -> Self {
        buffer.set_used_by_writer(true);
        Self { buffer }
    }

    pub fn buffer(&self) -> &Arc<RingBuffer> {
        &self.buffer
    }

    /// Write `num_samples` from each channel slice. Channels beyond the
    /// buffer's count are ignored; the count is capped at the shortest slice.
    pub fn write_channels<C: AsRef<[f32]>>(&mut self, data: &[C], num_samples: usize) {
        let num_samples = data
            .iter()
            .map(|c| c.as_ref().len())
            .min()
            .unwrap_or(0)
            .min(num_samples);
        self.buffer
            .write_with(data.len(), num_samples, |ch, i| data[ch].as_ref()[i]);
    }

    /// Write `value` into every channel `num_samples` times.
    pub fn write_value(&mut self, value: f64, num_samples: usize) {
        let value = value as f32;
        self.buffer.write_with(usize::MAX, num_samples, |_, _| value);
    }

    /// Write `num_samples` starting at `start_sample` of `source`, clipped to
    /// the samples it actually has.
    pub fn write_buffer(&mut self, source: &SampleBuffer, start_sample: usize, num_samples: usize) {
        let end = start_sample.saturating_add(num_samples).min(source.num_samples());
        let num_samples = end.saturating_sub(start_sample);
        self.buffer.write_with(source.num_channels(), num_samples, |ch, i| {
            source.channel(ch)[start_sample + i]
        });
    }

    /// Write one frame holding a sample per channel.
    pub fn write_frame(&mut self, frame: &[f32]) {
        self.buffer.write_with(frame.len(), 1, |ch, _| frame[ch]);
    }
}

impl Drop for RingWriter {
    fn drop(&mut self) {
        self.buffer.set_used_by_writer(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writer_slot_is_released_on_drop() {
        let buffer = RingBuffer::new();

        let writer = buffer.writer();
        assert!(buffer.has_writer());
        drop(writer);

        assert!(!buffer.has_writer());
        let _again = buffer.writer();
    }

    #[test]
    #[should_panic(expected = "multiple writers")]
    fn second_writer_panics() {
        let buffer = RingBuffer::new();
        let _first = buffer.writer();
        let _second = buffer.writer();
    }

    #[test]
    fn fewer_input_channels_write_a_subset() {
        let buffer = RingBuffer::new();
        buffer.set_ring_buffer_size(2, 512);
        let mut writer = buffer.writer();

        writer.write_value(0.5, 4);
        writer.write_channels(&[[1.0f32; 4]], 4);

        let mut dest = SampleBuffer::default();
        assert_eq!(buffer.read(&mut dest), 8);
        assert_eq!(&dest.channel(0)[..8], &[0.5, 0.5, 0.5, 0.5, 1.0, 1.0, 1.0, 1.0]);
        // Channel 1 was not part of the second block and keeps its old samples.
        assert_eq!(&dest.channel(1)[..4], &[0.5; 4]);
        assert_eq!(&dest.channel(1)[4..8], &[0.0; 4]);
    }

    #[test]
    fn write_buffer_copies_the_requested_range() {
        let buffer = RingBuffer::new();
        buffer.set_ring_buffer_size(2, 512);
        let mut writer = buffer.writer();
        let source = SampleBuffer::from_channels(vec![
            (0..10).map(|i| i as f32).collect(),
            (0..10).map(|i| -(i as f32)).collect(),
        ]);

        writer.write_buffer(&source, 6, 100);

        let mut dest = SampleBuffer::default();
        assert_eq!(buffer.read(&mut dest), 4);
        assert_eq!(&dest.channel(0)[..4], &[6.0, 7.0, 8.0, 9.0]);
        assert_eq!(&dest.channel(1)[..4], &[-6.0, -7.0, -8.0, -9.0]);
    }

    #[test]
    fn frames_extra_channels_are_ignored() {
        let buffer = RingBuffer::new();
        let mut writer = buffer.writer();

        writer.write_frame(&[0.1, 0.2, 0.3]);
        writer.write_frame(&[0.4, 0.5, 0.6]);

        let mut dest = SampleBuffer::default();
        assert_eq!(buffer.read(&mut dest), 2);
        assert_eq!(dest.num_channels(), 1);
        assert_eq!(&dest.channel(0)[..2], &[0.1, 0.4]);
    }
}

use std::{f32::consts::PI, sync::Arc};

use parking_lot::Mutex;
use rustfft::{num_complex::Complex, Fft, FftPlanner};

use crate::buffer::SampleBuffer;

/// Replaces a time-domain snapshot with its magnitude spectrum.
///
/// Each channel of `size` samples becomes `size / 2` bin magnitudes, Hann
/// windowed and scaled so a full-scale sine centred on a bin reads close to 1.
pub struct SpectrumTransform {
    size: usize,
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    gain: f32,
    scratch: Mutex<Vec<Complex<f32>>>,
}

impl SpectrumTransform {
    pub fn new(size: usize) -> Self {
        let size = size.max(2);
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(size);

        let window: Vec<f32> = (0..size)
            .map(|i| {
                let denom = (size - 1) as f32;
                0.5 * (1.0 - (2.0 * PI * i as f32 / denom).cos())
            })
            .collect();
        let gain = 2.0 / window.iter().sum::<f32>();

        Self {
            size,
            fft,
            window,
            gain,
            scratch: Mutex::new(vec![Complex::new(0.0, 0.0); size]),
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn num_bins(&self) -> usize {
        self.size / 2
    }

    pub fn apply(&self, buffer: &mut SampleBuffer) {
        if buffer.num_samples() != self.size {
            log::trace!(
                "skipping spectrum of {} samples, planned for {}",
                buffer.num_samples(),
                self.size
            );
            return;
        }

        let half = self.num_bins();
        let mut scratch = self.scratch.lock();

        for channel in buffer.channels_mut() {
            for ((bin, &sample), &w) in scratch.iter_mut().zip(channel.iter()).zip(&self.window) {
                bin.re = sample * w;
                bin.im = 0.0;
            }
            self.fft.process(&mut scratch);

            for (out, bin) in channel[..half].iter_mut().zip(scratch.iter()) {
                *out = bin.norm() * self.gain;
            }
        }

        let num_channels = buffer.num_channels();
        buffer.set_size(num_channels, half);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(size: usize, bin: usize) -> Vec<f32> {
        (0..size)
            .map(|i| (2.0 * PI * bin as f32 * i as f32 / size as f32).sin())
            .collect()
    }

    #[test]
    fn sine_peaks_at_its_bin() {
        let transform = SpectrumTransform::new(1024);
        let mut buffer = SampleBuffer::from_channels(vec![sine(1024, 16), sine(1024, 64)]);

        transform.apply(&mut buffer);

        assert_eq!(buffer.num_samples(), 512);
        for (channel, expected_bin) in buffer.channels().zip([16usize, 64]) {
            let (peak_bin, peak) = channel
                .iter()
                .copied()
                .enumerate()
                .fold((0, 0.0f32), |best, (i, m)| if m > best.1 { (i, m) } else { best });

            assert_eq!(peak_bin, expected_bin);
            assert!((peak - 1.0).abs() < 0.05, "expected unit magnitude, got {peak}");
        }
    }

    #[test]
    fn mismatched_length_is_left_alone() {
        let transform = SpectrumTransform::new(1024);
        let mut buffer = SampleBuffer::from_channels(vec![sine(512, 4)]);
        let before = buffer.clone();

        transform.apply(&mut buffer);

        assert_eq!(buffer, before);
    }
}

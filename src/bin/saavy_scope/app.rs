//! Scope - probe builder and runner

use color_eyre::eyre::{eyre, Result as EyreResult, WrapErr};
use std::{
    f64::consts::TAU,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::{Duration, Instant},
};

use super::meter;

use saavy_scope::{BufferEvent, PropertyId, PropertyValue, RingBuffer, SampleBuffer};

const BLOCK_SIZE: usize = 256;
const REFRESH_INTERVAL: Duration = Duration::from_millis(100);
const METER_WIDTH: usize = 40;

/// Test tone per channel, in Hz.
const TONES: [f64; 2] = [220.0, 330.0];

/// Probe builder
pub struct Scope {
    sample_rate: f64,
    buffer_length: usize,
    channels: usize,
    seconds: f64,
}

impl Scope {
    pub fn new() -> Self {
        Self {
            sample_rate: 48_000.0,
            buffer_length: 4096,
            channels: 2,
            seconds: 3.0,
        }
    }

    pub fn sample_rate(mut self, sample_rate: f64) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn buffer_length(mut self, buffer_length: usize) -> Self {
        self.buffer_length = buffer_length;
        self
    }

    pub fn channels(mut self, channels: usize) -> Self {
        self.channels = channels;
        self
    }

    pub fn seconds(mut self, seconds: f64) -> Self {
        self.seconds = seconds;
        self
    }

    /// Run the probe until the duration elapses
    pub fn run(self) -> EyreResult<()> {
        if self.sample_rate <= 0.0 {
            return Err(eyre!("sample rate must be positive, got {}", self.sample_rate));
        }

        let buffer = RingBuffer::new();
        buffer.set_samplerate(self.sample_rate);
        buffer
            .set_property(PropertyId::BufferLength, self.buffer_length.into())
            .wrap_err("failed to set buffer length")?;
        buffer
            .set_property(PropertyId::NumChannels, self.channels.into())
            .wrap_err("failed to set channel count")?;

        println!("=== saavy-scope ===");
        println!("Sample rate: {} Hz", self.sample_rate);
        println!(
            "Ring buffer: {} channel(s) x {} samples",
            buffer.num_channels(),
            buffer.num_samples()
        );
        println!();

        let mut listener = buffer.add_listener();
        let running = Arc::new(AtomicBool::new(true));
        let producer = spawn_tone_writer(Arc::clone(&buffer), Arc::clone(&running));

        let started = Instant::now();
        let duration = Duration::from_secs_f64(self.seconds.max(0.0));
        let mut resized = false;
        let mut snapshot = SampleBuffer::default();

        while started.elapsed() < duration {
            thread::sleep(REFRESH_INTERVAL);

            if !resized && started.elapsed() >= duration / 2 {
                let doubled = buffer.num_samples() * 2;
                buffer
                    .set_property(PropertyId::BufferLength, PropertyValue::from(doubled))
                    .wrap_err("failed to resize ring buffer")?;
                resized = true;
            }

            match listener.poll() {
                Some(BufferEvent::ContentRedirect) => {
                    log::info!(
                        "buffer redirected to {} x {}",
                        buffer.num_channels(),
                        buffer.num_samples()
                    );
                }
                Some(BufferEvent::ContentChange) | None => {}
            }

            let valid = buffer.read(&mut snapshot);
            let line: Vec<String> = meter::levels(&snapshot, valid)
                .into_iter()
                .map(|level| meter::bar(level, METER_WIDTH))
                .collect();
            println!("{:>6} {}", valid, line.join(" "));
        }

        running.store(false, Ordering::Release);
        producer
            .join()
            .map_err(|_| eyre!("tone writer thread panicked"))?;

        println!();
        println!("Done.");
        Ok(())
    }
}

/// Simulated audio callback: one block per block duration.
fn spawn_tone_writer(buffer: Arc<RingBuffer>, running: Arc<AtomicBool>) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let sample_rate = buffer.samplerate();
        let block_duration = Duration::from_secs_f64(BLOCK_SIZE as f64 / sample_rate);
        let mut writer = buffer.writer();
        let mut block = [[0.0f32; BLOCK_SIZE]; 2];
        let mut phase = [0.0f64; 2];

        while running.load(Ordering::Acquire) {
            for ((channel, phase), freq) in block.iter_mut().zip(&mut phase).zip(TONES) {
                let step = TAU * freq / sample_rate;
                for sample in channel.iter_mut() {
                    *sample = (0.8 * phase.sin()) as f32;
                    *phase = (*phase + step) % TAU;
                }
            }
            writer.write_channels(&block, BLOCK_SIZE);
            thread::sleep(block_duration);
        }
    })
}

//! Realtime-to-UI sample transport.
//!
//! One [`RingWriter`] on the audio thread pushes blocks into a [`RingBuffer`];
//! views call [`RingBuffer::read`] to copy the most recent samples, oldest
//! first, into a [`SampleBuffer`] they own.

/// The shared circular buffer.
pub mod ring;
/// Owned channel-major sample blocks.
pub mod sample_buffer;
/// Single-writer token.
pub mod writer;

pub use ring::{Reconfigure, ResizeOutcome, RingBuffer};
pub use sample_buffer::SampleBuffer;
pub use writer::RingWriter;

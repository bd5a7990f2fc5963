pub mod buffer; // Ring buffer, writer token and snapshot buffers
pub mod events; // Listener registry and change notifications
pub mod property; // Validation strategies and named properties

pub use buffer::{RingBuffer, RingWriter, SampleBuffer};
pub use events::{BufferEvent, EventListener};
pub use property::{PropertyId, PropertyObject, PropertyValue};

/// Default capacity applied when a property object is attached.
pub const RING_BUFFER_SIZE: usize = 65536;
/// Samples written between two content-change notifications.
pub const CONTENT_CHANGE_INTERVAL: usize = 1024;

//! Change notifications from data objects to the views observing them.
//!
//! Listeners are addressed by [`ListenerId`] values held in an arena, never by
//! pointer, and each one drains its own bounded queue on its own schedule.
//! Dropping a listener before its source is fine.

/// Filter coefficient rebuild notifications.
pub mod coefficients;
/// Listener arena and event queues.
pub mod registry;

pub use coefficients::FilterCoefficientData;
pub use registry::{BufferEvent, EventListener, ListenerId, Updater, LISTENER_QUEUE_LEN};

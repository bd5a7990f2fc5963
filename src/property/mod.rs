//! Validation strategies and the named-property surface of a ring buffer.
//!
//! A [`PropertyObject`] decides which buffer lengths and channel counts are
//! acceptable, seeds defaults when it is attached, and may post-process read
//! snapshots (for example into a magnitude spectrum).

/// Property names, values and errors.
pub mod id;
/// The attachable strategy object.
pub mod object;
/// FFT magnitude transform for spectral views.
pub mod spectrum;
/// Integer sanitizers.
pub mod validate;

pub use id::{PropertyError, PropertyId, PropertyValue};
pub use object::{PropertyObject, ReadTransform};
pub use spectrum::SpectrumTransform;
pub use validate::{to_fix_size, within_range, LengthRule, Validator};

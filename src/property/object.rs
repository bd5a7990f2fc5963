use std::{
    collections::BTreeMap,
    sync::{Arc, Weak},
};

use parking_lot::Mutex;

use super::{
    spectrum::SpectrumTransform,
    validate::{Validator, MAX_BUFFER_LENGTH, MIN_BUFFER_LENGTH},
    PropertyError, PropertyId, PropertyValue,
};
use crate::{
    buffer::{ResizeOutcome, RingBuffer, SampleBuffer},
    RING_BUFFER_SIZE,
};

/// Post-processing applied to every snapshot handed out by `read`.
pub enum ReadTransform {
    Identity,
    Spectrum(SpectrumTransform),
}

/// Validation and configuration strategy attached to a [`RingBuffer`].
///
/// Owns the named property values and a weak link back to the buffer it was
/// initialised against; length and channel changes are pushed through to
/// that buffer.
pub struct PropertyObject {
    validator: Validator,
    transform: ReadTransform,
    properties: Mutex<BTreeMap<PropertyId, PropertyValue>>,
    buffer: Mutex<Weak<RingBuffer>>,
}

impl Default for PropertyObject {
    fn default() -> Self {
        Self::new()
    }
}

impl PropertyObject {
    /// Length clamped to `[512, 65536]`, one or two channels, raw samples.
    pub fn new() -> Self {
        Self::with_parts(Validator::default(), ReadTransform::Identity)
    }

    /// Raw samples, length pinned to `size`.
    pub fn fixed_size(size: usize) -> Self {
        Self::with_parts(Validator::fixed_length(size), ReadTransform::Identity)
    }

    /// FFT magnitudes of a power-of-two window. `fft_size` is rounded up to a
    /// power of two within the default length bounds.
    pub fn spectrum(fft_size: usize) -> Self {
        let size = fft_size
            .next_power_of_two()
            .clamp(MIN_BUFFER_LENGTH, MAX_BUFFER_LENGTH);
        Self::with_parts(
            Validator::fixed_length(size),
            ReadTransform::Spectrum(SpectrumTransform::new(size)),
        )
    }

    pub fn with_parts(validator: Validator, transform: ReadTransform) -> Self {
        Self {
            validator,
            transform,
            properties: Mutex::new(BTreeMap::new()),
            buffer: Mutex::new(Weak::new()),
        }
    }

    pub fn validator(&self) -> &Validator {
        &self.validator
    }

    pub fn transform(&self) -> &ReadTransform {
        &self.transform
    }

    /// Sanitize an integer property in place. Returns true if it was changed.
    pub fn validate_int(&self, id: PropertyId, v: &mut usize) -> bool {
        self.validator.validate(id, v)
    }

    /// A spectrum strategy only yields to another spectrum strategy; the
    /// others can always be swapped out.
    pub fn can_be_replaced(&self, other: &PropertyObject) -> bool {
        match self.transform {
            ReadTransform::Spectrum(_) => matches!(other.transform, ReadTransform::Spectrum(_)),
            ReadTransform::Identity => true,
        }
    }

    /// Link to `buffer` and apply the defaults, which sizes it.
    pub fn initialise_ring_buffer(&self, buffer: &Arc<RingBuffer>) {
        {
            let mut current = self.buffer.lock();
            if let Some(previous) = current.upgrade() {
                if !Arc::ptr_eq(&previous, buffer) {
                    log::warn!("property object moved to a different ring buffer");
                }
            }
            *current = Arc::downgrade(buffer);
        }

        self.store_and_apply(PropertyId::BufferLength, RING_BUFFER_SIZE.into());
        self.store_and_apply(PropertyId::NumChannels, PropertyValue::Int(1));
        self.store_and_apply(PropertyId::Active, PropertyValue::Bool(true));
    }

    pub(crate) fn detach(&self) {
        *self.buffer.lock() = Weak::new();
    }

    /// The live shape for length / channels when attached, otherwise the
    /// stored value. `None` for properties that were never set.
    pub fn get_property(&self, id: PropertyId) -> Option<PropertyValue> {
        let stored = self.properties.lock().get(&id).copied()?;

        let Some(buffer) = self.buffer.lock().upgrade() else {
            return Some(stored);
        };
        match id {
            PropertyId::BufferLength => Some(buffer.num_samples().into()),
            PropertyId::NumChannels => Some(buffer.num_channels().into()),
            PropertyId::Active => Some(stored),
        }
    }

    /// Store `value` and push it to the attached buffer.
    ///
    /// Lengths and channel counts are stored as validated. The returned
    /// outcome tells the caller whether the buffer adjusted or reallocated;
    /// it is `None` when nothing was resized (detached object, non-positive
    /// value, or `Active`).
    pub fn set_property(
        &self,
        id: PropertyId,
        value: PropertyValue,
    ) -> Result<Option<ResizeOutcome>, PropertyError> {
        let valid = match id {
            PropertyId::BufferLength | PropertyId::NumChannels => value.as_int().is_some(),
            PropertyId::Active => value.as_bool().is_some(),
        };
        if !valid {
            return Err(PropertyError::InvalidValue { id, value });
        }

        Ok(self.store_and_apply(id, value))
    }

    /// Names of all properties set so far.
    pub fn get_property_list(&self) -> Vec<PropertyId> {
        self.properties.lock().keys().copied().collect()
    }

    /// Stored values, for persisting by an external collaborator.
    pub fn properties(&self) -> BTreeMap<PropertyId, PropertyValue> {
        self.properties.lock().clone()
    }

    pub fn transform_read_buffer(&self, buffer: &mut SampleBuffer) {
        match &self.transform {
            ReadTransform::Identity => {}
            ReadTransform::Spectrum(spectrum) => spectrum.apply(buffer),
        }
    }

    fn store_and_apply(&self, id: PropertyId, value: PropertyValue) -> Option<ResizeOutcome> {
        let value = self.sanitize(id, value);
        self.properties.lock().insert(id, value);

        let buffer = self.buffer.lock().upgrade()?;

        match id {
            PropertyId::BufferLength => positive(value)
                .map(|length| buffer.set_ring_buffer_size(buffer.num_channels(), length)),
            PropertyId::NumChannels => positive(value)
                .map(|channels| buffer.set_ring_buffer_size(channels, buffer.num_samples())),
            PropertyId::Active => {
                if let Some(active) = value.as_bool() {
                    buffer.set_active(active);
                }
                None
            }
        }
    }

    fn sanitize(&self, id: PropertyId, value: PropertyValue) -> PropertyValue {
        match (id, positive(value)) {
            (PropertyId::BufferLength | PropertyId::NumChannels, Some(mut v)) => {
                self.validator.validate(id, &mut v);
                v.into()
            }
            _ => value,
        }
    }
}

fn positive(value: PropertyValue) -> Option<usize> {
    value
        .as_int()
        .filter(|&v| v > 0)
        .map(|v| usize::try_from(v).unwrap_or(usize::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detached_object_keeps_stored_values() {
        let object = PropertyObject::new();
        assert_eq!(object.get_property(PropertyId::BufferLength), None);

        object
            .set_property(PropertyId::BufferLength, PropertyValue::Int(2048))
            .unwrap();
        assert_eq!(
            object.get_property(PropertyId::BufferLength),
            Some(PropertyValue::Int(2048))
        );
        assert_eq!(object.get_property_list(), vec![PropertyId::BufferLength]);
    }

    #[test]
    fn rejects_bool_for_length() {
        let object = PropertyObject::new();
        let err = object
            .set_property(PropertyId::NumChannels, PropertyValue::Bool(true))
            .unwrap_err();

        assert_eq!(
            err,
            PropertyError::InvalidValue {
                id: PropertyId::NumChannels,
                value: PropertyValue::Bool(true),
            }
        );
        assert!(object.get_property_list().is_empty());
    }

    #[test]
    fn stored_length_matches_the_snapped_buffer() {
        let object = Arc::new(PropertyObject::fixed_size(1024));
        let buffer = RingBuffer::with_property_object(Arc::clone(&object));

        assert_eq!(buffer.num_samples(), 1024);
        assert_eq!(
            object.properties().get(&PropertyId::BufferLength),
            Some(&PropertyValue::Int(1024))
        );
        assert_eq!(
            object.get_property(PropertyId::BufferLength),
            Some(PropertyValue::Int(1024))
        );
    }

    #[test]
    fn set_property_reports_clamping() {
        let object = Arc::new(PropertyObject::new());
        let buffer = RingBuffer::with_property_object(Arc::clone(&object));

        let outcome = object
            .set_property(PropertyId::BufferLength, PropertyValue::Int(100))
            .unwrap()
            .unwrap();
        assert!(outcome.adjusted);
        assert!(outcome.reallocated);
        assert_eq!(outcome.num_samples, 512);
        assert_eq!(buffer.num_samples(), 512);
        assert_eq!(
            object.properties().get(&PropertyId::BufferLength),
            Some(&PropertyValue::Int(512))
        );

        let toggled = object
            .set_property(PropertyId::Active, PropertyValue::Bool(false))
            .unwrap();
        assert_eq!(toggled, None);
    }

    #[test]
    fn spectrum_rounds_to_power_of_two() {
        let object = PropertyObject::spectrum(3000);
        let mut length = 100;

        assert!(object.validate_int(PropertyId::BufferLength, &mut length));
        assert_eq!(length, 4096);
    }

    #[test]
    fn spectrum_only_yields_to_spectrum() {
        let spectrum = PropertyObject::spectrum(1024);
        let raw = PropertyObject::new();

        assert!(!spectrum.can_be_replaced(&raw));
        assert!(spectrum.can_be_replaced(&PropertyObject::spectrum(2048)));
        assert!(raw.can_be_replaced(&spectrum));
        assert!(PropertyObject::fixed_size(1000).can_be_replaced(&raw));
    }
}

use std::sync::{
    atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicUsize, Ordering},
    Arc,
};

use parking_lot::{
    Mutex, MutexGuard, RwLock, RwLockUpgradableReadGuard, RwLockWriteGuard,
};

use super::{RingWriter, SampleBuffer};
use crate::{
    events::{EventListener, Updater},
    property::{PropertyError, PropertyId, PropertyObject, PropertyValue},
    CONTENT_CHANGE_INTERVAL,
};

/// f32 stored as its bit pattern so the writer and readers can share storage
/// under the shared lock.
#[derive(Default)]
struct AtomicSample(AtomicU32);

impl AtomicSample {
    #[inline]
    fn load(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    #[inline]
    fn store(&self, value: f32) {
        self.0.store(value.to_bits(), Ordering::Relaxed)
    }
}

struct Storage {
    channels: Vec<Box<[AtomicSample]>>,
    num_samples: usize,
}

impl Storage {
    fn new(num_channels: usize, num_samples: usize) -> Self {
        let channels = (0..num_channels)
            .map(|_| (0..num_samples).map(|_| AtomicSample::default()).collect())
            .collect();
        Self {
            channels,
            num_samples,
        }
    }

    fn num_channels(&self) -> usize {
        self.channels.len()
    }

    fn clear(&self) {
        for sample in self.channels.iter().flat_map(|c| c.iter()) {
            sample.store(0.0);
        }
    }
}

/// What a call to [`RingBuffer::set_ring_buffer_size`] ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeOutcome {
    pub num_channels: usize,
    pub num_samples: usize,
    /// The validator changed the requested shape.
    pub adjusted: bool,
    /// Storage was reallocated and a redirect was sent.
    pub reallocated: bool,
}

/// Fixed-capacity multi-channel circular buffer between one realtime writer
/// and any number of snapshot readers.
///
/// # Locking
///
/// Storage sits behind a `parking_lot::RwLock`:
/// - the writer only ever `try_read`s it and drops the block if a resize holds
///   or waits for the exclusive lock, so it never blocks;
/// - readers take the shared lock for one bounded copy;
/// - resizing and clearing take the exclusive lock and are the only paths that
///   reallocate.
///
/// Writer and readers hold the shared lock at the same time. Each sample is
/// read atomically, but a read racing a write may pick up samples from the
/// block being written at the oldest end of the snapshot.
pub struct RingBuffer {
    storage: RwLock<Storage>,
    read_buffer: Mutex<SampleBuffer>,
    property_object: RwLock<Arc<PropertyObject>>,
    updater: Updater,

    write_index: AtomicUsize,
    num_available: AtomicUsize,
    update_counter: AtomicUsize,
    is_being_written: AtomicBool,
    active: AtomicBool,
    num_writers: AtomicUsize,
    sample_rate: AtomicU64,
}

impl RingBuffer {
    /// A buffer with the default property object, sized to its defaults
    /// (one channel of [`RING_BUFFER_SIZE`](crate::RING_BUFFER_SIZE) samples).
    pub fn new() -> Arc<Self> {
        Self::with_property_object(Arc::new(PropertyObject::new()))
    }

    /// A buffer driven by `properties`, which sizes it on construction.
    pub fn with_property_object(properties: Arc<PropertyObject>) -> Arc<Self> {
        let buffer = Arc::new(Self {
            storage: RwLock::new(Storage::new(0, 0)),
            read_buffer: Mutex::new(SampleBuffer::default()),
            property_object: RwLock::new(Arc::clone(&properties)),
            updater: Updater::new(),
            write_index: AtomicUsize::new(0),
            num_available: AtomicUsize::new(0),
            update_counter: AtomicUsize::new(0),
            is_being_written: AtomicBool::new(false),
            active: AtomicBool::new(true),
            num_writers: AtomicUsize::new(0),
            sample_rate: AtomicU64::new((-1.0f64).to_bits()),
        });
        properties.initialise_ring_buffer(&buffer);
        buffer
    }

    /// Claim the single writer slot. Panics if a writer already exists.
    pub fn writer(self: &Arc<Self>) -> RingWriter {
        RingWriter::new(Arc::clone(self))
    }

    /// Register or release a writer.
    ///
    /// # Panics
    ///
    /// Registering while another writer is registered, or releasing when none
    /// is. The write path relies on there being exactly one writer.
    pub fn set_used_by_writer(&self, should_be_used: bool) {
        if should_be_used {
            if self
                .num_writers
                .compare_exchange(0, 1, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
            {
                panic!("multiple writers registered on one ring buffer");
            }
        } else if self
            .num_writers
            .compare_exchange(1, 0, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            panic!("ring buffer writer released without being registered");
        }
    }

    /// Whether a [`RingWriter`] is currently registered.
    pub fn has_writer(&self) -> bool {
        self.num_writers.load(Ordering::Acquire) != 0
    }

    /// Writes are ignored while inactive.
    pub fn set_active(&self, should_be_active: bool) {
        self.active.store(should_be_active, Ordering::Release);
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Record the writer's sample rate for readers.
    pub fn set_samplerate(&self, sample_rate: f64) {
        self.sample_rate.store(sample_rate.to_bits(), Ordering::Release);
    }

    /// `-1.0` until set.
    pub fn samplerate(&self) -> f64 {
        f64::from_bits(self.sample_rate.load(Ordering::Acquire))
    }

    /// Channel count of the storage.
    pub fn num_channels(&self) -> usize {
        self.storage.read().num_channels()
    }

    /// Capacity in samples per channel.
    pub fn num_samples(&self) -> usize {
        self.storage.read().num_samples
    }

    /// Valid samples since the last resize or clear, at most the capacity.
    pub fn num_available(&self) -> usize {
        self.num_available.load(Ordering::Acquire)
    }

    pub fn updater(&self) -> &Updater {
        &self.updater
    }

    /// Register a listener for content change and redirect events.
    pub fn add_listener(&self) -> EventListener {
        self.updater.add_listener()
    }

    pub(crate) fn write_with(
        &self,
        num_input_channels: usize,
        num_samples: usize,
        sample: impl Fn(usize, usize) -> f32,
    ) {
        if num_samples == 0 || !self.is_active() {
            return;
        }
        let Some(storage) = self.storage.try_read() else {
            return;
        };
        let capacity = storage.num_samples;
        let channels = num_input_channels.min(storage.num_channels());
        if capacity == 0 || channels == 0 {
            return;
        }

        self.is_being_written.store(true, Ordering::Release);

        let start = self.write_index.load(Ordering::Relaxed);
        // Only the newest `capacity` samples survive the write.
        let skip = num_samples.saturating_sub(capacity);

        for (ch, dst) in storage.channels[..channels].iter().enumerate() {
            let mut index = (start + skip) % capacity;
            for i in skip..num_samples {
                dst[index].store(sample(ch, i));
                index += 1;
                if index == capacity {
                    index = 0;
                }
            }
        }

        self.write_index
            .store((start + num_samples % capacity) % capacity, Ordering::Release);
        let available = self
            .num_available
            .load(Ordering::Relaxed)
            .saturating_add(num_samples)
            .min(capacity);
        self.num_available.store(available, Ordering::Release);

        self.is_being_written.store(false, Ordering::Release);
        drop(storage);

        let pending = self
            .update_counter
            .load(Ordering::Relaxed)
            .saturating_add(num_samples);
        self.update_counter.store(pending, Ordering::Relaxed);
        if pending >= CONTENT_CHANGE_INTERVAL && self.updater.try_send_content_change() {
            self.update_counter.store(0, Ordering::Relaxed);
        }
    }

    /// Copy the valid samples, oldest first, into the front of each channel of
    /// `dest`, which is resized to the buffer's shape and zeroed. The property
    /// object's read transform is then applied to `dest`.
    ///
    /// Returns the number of valid samples copied, capped at what `dest` holds
    /// after the transform (the bin count under a spectrum transform).
    pub fn read(&self, dest: &mut SampleBuffer) -> usize {
        let available = {
            let storage = self.storage.read();
            let capacity = storage.num_samples;

            dest.set_size(storage.num_channels(), capacity);
            dest.clear();

            // Count first: a newer count always pairs with an index at least as new.
            let available = self.num_available.load(Ordering::Acquire).min(capacity);
            let write_index = self.write_index.load(Ordering::Acquire);

            if available > 0 {
                let start = (write_index + capacity - available) % capacity;
                for (src, out) in storage.channels.iter().zip(dest.channels_mut()) {
                    let (older, newer) = src.split_at(start);
                    for (o, s) in out.iter_mut().zip(newer.iter().chain(older)).take(available) {
                        *o = s.load();
                    }
                }
            }
            available
        };

        self.property_object().transform_read_buffer(dest);
        available.min(dest.num_samples())
    }

    /// Read into the buffer's own snapshot, see [`read_buffer`](Self::read_buffer).
    pub fn update_read_buffer(&self) -> usize {
        let mut snapshot = self.read_buffer.lock();
        self.read(&mut snapshot)
    }

    /// The snapshot filled by the last [`update_read_buffer`](Self::update_read_buffer).
    pub fn read_buffer(&self) -> MutexGuard<'_, SampleBuffer> {
        self.read_buffer.lock()
    }

    /// Validate and apply a new shape. Reallocates (and resets contents,
    /// indices and the update counter) only when the validated shape differs
    /// from the current one, then sends one content redirect.
    ///
    /// # Panics
    ///
    /// If a write burst is in progress once the exclusive lock is held.
    pub fn set_ring_buffer_size(&self, num_channels: usize, num_samples: usize) -> ResizeOutcome {
        let (num_channels, num_samples, adjusted) = self.validate_size(num_channels, num_samples);

        let storage = self.storage.upgradable_read();
        let mut outcome = ResizeOutcome {
            num_channels,
            num_samples,
            adjusted,
            reallocated: false,
        };
        if storage.num_channels() == num_channels && storage.num_samples == num_samples {
            return outcome;
        }

        let mut storage = RwLockUpgradableReadGuard::upgrade(storage);
        self.reallocate(&mut storage, num_channels, num_samples);
        drop(storage);

        outcome.reallocated = true;
        self.updater.send_content_redirect();
        outcome
    }

    /// Take the exclusive lock for a batch of changes.
    ///
    /// Resizes through the guard reuse the held lock. Redirects are sent once
    /// the guard is dropped. Calling property setters or any other locking
    /// method on this buffer while holding the guard deadlocks.
    pub fn reconfigure(&self) -> Reconfigure<'_> {
        Reconfigure {
            buffer: self,
            storage: self.storage.write(),
            redirect: false,
        }
    }

    /// Zero the contents and reset the indices without changing the shape.
    pub fn clear(&self) {
        {
            let storage = self.storage.write();
            assert!(
                !self.is_being_written.load(Ordering::Acquire),
                "ring buffer cleared during a write"
            );
            storage.clear();
            self.reset_indices();
        }
        self.updater.send_content_change();
    }

    pub fn property_object(&self) -> Arc<PropertyObject> {
        Arc::clone(&self.property_object.read())
    }

    /// Swap the strategy if the current one allows it, then initialise the new
    /// one against this buffer. Returns whether the swap happened.
    pub fn set_property_object(self: &Arc<Self>, new_object: Arc<PropertyObject>) -> bool {
        let previous = {
            let mut current = self.property_object.write();
            if Arc::ptr_eq(&current, &new_object) {
                return true;
            }
            if !current.can_be_replaced(&new_object) {
                log::warn!("current property object refused to be replaced");
                return false;
            }
            std::mem::replace(&mut *current, Arc::clone(&new_object))
        };

        previous.detach();
        log::debug!("ring buffer property object replaced");
        new_object.initialise_ring_buffer(self);
        true
    }

    pub fn get_property(&self, id: PropertyId) -> Option<PropertyValue> {
        self.property_object().get_property(id)
    }

    /// See [`PropertyObject::set_property`].
    pub fn set_property(
        &self,
        id: PropertyId,
        value: PropertyValue,
    ) -> Result<Option<ResizeOutcome>, PropertyError> {
        self.property_object().set_property(id, value)
    }

    pub fn get_identifiers(&self) -> Vec<PropertyId> {
        self.property_object().get_property_list()
    }

    fn validate_size(&self, num_channels: usize, num_samples: usize) -> (usize, usize, bool) {
        let properties = self.property_object();
        let (mut channels, mut samples) = (num_channels, num_samples);

        let length_changed = properties.validate_int(PropertyId::BufferLength, &mut samples);
        let channels_changed = properties.validate_int(PropertyId::NumChannels, &mut channels);
        let adjusted = length_changed || channels_changed;

        if adjusted {
            log::trace!(
                "ring buffer size {num_channels}x{num_samples} adjusted to {channels}x{samples}"
            );
        }
        (channels, samples, adjusted)
    }

    fn reallocate(&self, storage: &mut Storage, num_channels: usize, num_samples: usize) {
        assert!(
            !self.is_being_written.load(Ordering::Acquire),
            "ring buffer resized during a write"
        );
        *storage = Storage::new(num_channels, num_samples);
        self.reset_indices();
        log::debug!("ring buffer resized to {num_channels}x{num_samples}");
    }

    fn reset_indices(&self) {
        self.num_available.store(0, Ordering::Release);
        self.write_index.store(0, Ordering::Release);
        self.update_counter.store(0, Ordering::Relaxed);
    }
}

/// Exclusive access to a [`RingBuffer`] for batched reconfiguration.
pub struct Reconfigure<'a> {
    buffer: &'a RingBuffer,
    storage: RwLockWriteGuard<'a, Storage>,
    redirect: bool,
}

impl Reconfigure<'_> {
    pub fn num_channels(&self) -> usize {
        self.storage.num_channels()
    }

    pub fn num_samples(&self) -> usize {
        self.storage.num_samples
    }

    /// Same as [`RingBuffer::set_ring_buffer_size`] with the lock already held.
    pub fn set_ring_buffer_size(&mut self, num_channels: usize, num_samples: usize) -> ResizeOutcome {
        let (num_channels, num_samples, adjusted) =
            self.buffer.validate_size(num_channels, num_samples);

        let reallocated =
            self.storage.num_channels() != num_channels || self.storage.num_samples != num_samples;
        if reallocated {
            self.buffer
                .reallocate(&mut self.storage, num_channels, num_samples);
            self.redirect = true;
        }

        ResizeOutcome {
            num_channels,
            num_samples,
            adjusted,
            reallocated,
        }
    }

    /// Shape `buffer` like the ring buffer and zero it.
    pub fn setup_read_buffer(&self, buffer: &mut SampleBuffer) {
        buffer.set_size(self.storage.num_channels(), self.storage.num_samples);
        buffer.clear();
    }
}

impl Drop for Reconfigure<'_> {
    fn drop(&mut self) {
        if self.redirect {
            self.buffer.updater.send_content_redirect();
        }
    }
}

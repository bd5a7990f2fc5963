use std::sync::atomic::{AtomicU64, Ordering};

use super::{EventListener, Updater};

/// Notification hub between a filter node and the views plotting its
/// frequency response.
///
/// The filter owns the coefficient math; this object only carries the sample
/// rate the response should be evaluated at and tells listeners when the
/// coefficients were rebuilt.
pub struct FilterCoefficientData {
    sample_rate: AtomicU64,
    updater: Updater,
}

impl Default for FilterCoefficientData {
    fn default() -> Self {
        Self::new()
    }
}

impl FilterCoefficientData {
    pub fn new() -> Self {
        Self {
            sample_rate: AtomicU64::new((-1.0f64).to_bits()),
            updater: Updater::new(),
        }
    }

    pub fn set_sample_rate(&self, sample_rate: f64) {
        self.sample_rate.store(sample_rate.to_bits(), Ordering::Release);
    }

    /// `None` until a filter with a known sample rate has been attached.
    pub fn sample_rate(&self) -> Option<f64> {
        let sr = f64::from_bits(self.sample_rate.load(Ordering::Acquire));
        (sr > 0.0).then_some(sr)
    }

    /// Link a filter that has already been prepared. A non-positive sample
    /// rate means the filter is not prepared yet and leaves the stored rate
    /// alone.
    pub fn attach_filter(&self, filter_sample_rate: f64) {
        if filter_sample_rate > 0.0 {
            self.set_sample_rate(filter_sample_rate);
        }
    }

    /// Called by the filter after it rebuilt its coefficients.
    pub fn send_coefficient_update(&self) {
        self.updater.send_content_change();
    }

    pub fn add_listener(&self) -> EventListener {
        self.updater.add_listener()
    }

    pub fn updater(&self) -> &Updater {
        &self.updater
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::BufferEvent;

    #[test]
    fn coefficient_update_notifies_plots() {
        let data = FilterCoefficientData::new();
        let mut plot = data.add_listener();

        data.send_coefficient_update();

        assert_eq!(plot.pop(), Some(BufferEvent::ContentChange));
        assert_eq!(plot.pop(), None);
    }

    #[test]
    fn unprepared_filter_keeps_sample_rate_unset() {
        let data = FilterCoefficientData::new();
        assert_eq!(data.sample_rate(), None);

        data.attach_filter(-1.0);
        assert_eq!(data.sample_rate(), None);

        data.attach_filter(48_000.0);
        assert_eq!(data.sample_rate(), Some(48_000.0));
    }
}

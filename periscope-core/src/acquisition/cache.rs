//! Live sample cache
//!
//! Holds the newest raw sample and an exponentially smoothed value for each
//! active channel, refreshed once per conversion group:
//!
//! ```text
//! y[t] = y[t-1] + k * (u[t] - y[t-1]),  k = factor / 1000
//! ```
//!
//! The smoothed value is seeded with the first raw sample seen while
//! smoothing is eligible, and reseeded whenever eligibility is regained.

use heapless::Vec;
use periscope_protocol::MAX_CHANNELS;

/// Per-channel raw and smoothed values, in slot order
#[derive(Debug, Clone, Default)]
pub struct LiveCache {
    raw: Vec<u16, MAX_CHANNELS>,
    smoothed: Vec<f32, MAX_CHANNELS>,
    seeded: bool,
}

impl LiveCache {
    /// Create a zeroed cache for `channels` slots
    pub fn new(channels: usize) -> Self {
        let channels = channels.min(MAX_CHANNELS);
        let mut cache = Self::default();
        for _ in 0..channels {
            let _ = cache.raw.push(0);
            let _ = cache.smoothed.push(0.0);
        }
        cache
    }

    /// Store one conversion group
    ///
    /// `k` is the smoothing coefficient, or `None` while smoothing is not
    /// eligible, in which case only the raw values move.
    pub fn update(&mut self, group: &[u16], k: Option<f32>) {
        for (slot, &sample) in self.raw.iter_mut().zip(group) {
            *slot = sample;
        }

        let Some(k) = k else {
            self.seeded = false;
            return;
        };

        for (y, &u) in self.smoothed.iter_mut().zip(group) {
            let u = u as f32;
            if self.seeded {
                *y += k * (u - *y);
            } else {
                *y = u;
            }
        }
        self.seeded = true;
    }

    /// Newest raw sample of a slot
    pub fn raw_at(&self, slot: usize) -> Option<u16> {
        self.raw.get(slot).copied()
    }

    /// Newest raw samples in slot order
    pub fn raw(&self) -> &[u16] {
        &self.raw
    }

    /// Smoothed values in slot order
    pub fn smoothed(&self) -> &[f32] {
        &self.smoothed
    }

    /// Restart smoothing from the next raw sample
    pub fn reseed(&mut self) {
        self.seeded = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_group_seeds() {
        let mut cache = LiveCache::new(2);
        cache.update(&[100, 200], Some(0.5));
        assert_eq!(cache.raw(), &[100, 200]);
        assert_eq!(cache.smoothed(), &[100.0, 200.0]);
    }

    #[test]
    fn test_smoothing_step() {
        let mut cache = LiveCache::new(1);
        cache.update(&[0], Some(0.25));
        cache.update(&[1000], Some(0.25));
        assert_eq!(cache.smoothed(), &[250.0]);
        cache.update(&[1000], Some(0.25));
        assert_eq!(cache.smoothed(), &[437.5]);
    }

    #[test]
    fn test_ineligible_updates_raw_only() {
        let mut cache = LiveCache::new(1);
        cache.update(&[10], Some(0.5));
        cache.update(&[3000], None);
        assert_eq!(cache.raw(), &[3000]);
        assert_eq!(cache.smoothed(), &[10.0]);

        // Eligible again: reseeded rather than blended
        cache.update(&[2000], Some(0.5));
        assert_eq!(cache.smoothed(), &[2000.0]);
    }

    #[test]
    fn test_factor_one_tracks_input() {
        let mut cache = LiveCache::new(1);
        cache.update(&[5], Some(1.0));
        cache.update(&[4095], Some(1.0));
        assert_eq!(cache.smoothed(), &[4095.0]);
        assert_eq!(cache.raw_at(0), Some(4095));
        assert_eq!(cache.raw_at(1), None);
    }
}

//! Circular capture buffer geometry
//!
//! The DMA fills the buffer continuously, one conversion group of
//! `channels` samples at a time. The item count is the largest multiple of
//! `2 * channels` that fits the configured size, so both halves hold whole
//! groups and every boundary falls between groups.
//!
//! Positions are sample indices in `0..items`. The full boundary is the
//! wrap point and is written as position 0.

use core::ops::Range;

use heapless::Vec;

use crate::config::ConfigError;
use crate::traits::DmaStatus;

/// A half or full transfer boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Boundary {
    /// Middle of the buffer
    Half,
    /// End of the buffer (wrap point)
    Full,
}

impl Boundary {
    /// Index used for per-boundary bookkeeping
    pub fn index(self) -> usize {
        match self {
            Boundary::Half => 0,
            Boundary::Full => 1,
        }
    }
}

/// Sizing and position arithmetic of the capture buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BufferLayout {
    items: usize,
    channels: usize,
}

impl BufferLayout {
    /// Size the buffer for `channels` active channels
    pub fn new(requested: u32, channels: usize) -> Result<Self, ConfigError> {
        if channels == 0 {
            return Err(ConfigError::NoChannels);
        }
        let requested = requested as usize;
        let items = requested - requested % (2 * channels);
        if items < 2 * channels {
            return Err(ConfigError::BufferTooSmall);
        }
        Ok(Self { items, channels })
    }

    /// Total samples in the buffer
    pub fn items(&self) -> usize {
        self.items
    }

    /// Samples per half
    pub fn half(&self) -> usize {
        self.items / 2
    }

    /// Samples per conversion group
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Position of a boundary
    pub fn boundary_offset(&self, boundary: Boundary) -> usize {
        match boundary {
            Boundary::Half => self.half(),
            Boundary::Full => 0,
        }
    }

    /// Samples written going from `from` to `to`, wrapping
    pub fn distance(&self, from: usize, to: usize) -> usize {
        (to + self.items - from % self.items) % self.items
    }

    /// Round a position down to a group boundary
    pub fn align_down(&self, pos: usize) -> usize {
        pos - pos % self.channels
    }

    /// End (exclusive) of the newest complete group before `write_pos`
    ///
    /// A write position of 0 means the group ending at the wrap point was
    /// the last one written.
    pub fn last_group_end(&self, write_pos: usize) -> usize {
        match self.align_down(write_pos % self.items) {
            0 => self.items,
            end => end,
        }
    }

    /// Largest pre-trigger count in groups
    pub fn pretrigger_capacity(&self) -> u16 {
        (self.items / self.channels / 2).min(u16::MAX as usize) as u16
    }

    /// Split `count` samples starting at `start` into at most two
    /// contiguous ranges, the second one non-empty only when wrapping
    pub fn split(&self, start: usize, count: usize) -> [Range<usize>; 2] {
        let start = start % self.items;
        let count = count.min(self.items);
        let first = count.min(self.items - start);
        [start..start + first, 0..count - first]
    }

    /// Boundaries flagged in `status`, oldest first
    ///
    /// With both flags set the DMA has passed both boundaries since the last
    /// interrupt; the one further behind `write_pos` was crossed first.
    pub fn ordered(&self, status: DmaStatus, write_pos: usize) -> Vec<Boundary, 2> {
        let mut out = Vec::new();
        let order = if write_pos % self.items < self.half() {
            [Boundary::Half, Boundary::Full]
        } else {
            [Boundary::Full, Boundary::Half]
        };
        for boundary in order {
            let flagged = match boundary {
                Boundary::Half => status.half,
                Boundary::Full => status.full,
            };
            if flagged {
                // At most two entries
                let _ = out.push(boundary);
            }
        }
        out
    }
}

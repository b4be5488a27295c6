//! Trigger configuration and edge detection
//!
//! Detection runs once per conversion group while armed, comparing the
//! source channel's newest sample with the previous one:
//!
//! - rising fires when `prev < level <= new`
//! - falling fires when `prev > level >= new`
//!
//! Every fire, detected or forced, passes the hold-off gate: while the
//! hold-off countdown from the previous fire is still running the fire is
//! dropped without a trace.

use periscope_protocol::{TriggerEdge, TriggerSetup};

use super::buffer::BufferLayout;
use super::channels::ChannelTable;
use super::countdown::Countdown;
use crate::error::UnitError;

/// Largest converter reading
pub const MAX_LEVEL: u16 = 4095;

/// Validated trigger settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TriggerConfig {
    /// Source channel index
    pub source: u8,
    /// Slot of the source channel within a group
    pub slot: usize,
    /// Level in converter counts
    pub level: u16,
    /// Edge selector
    pub edge: TriggerEdge,
    /// Groups kept from before the trigger, triggering group included
    pub pretrigger: u16,
    /// Groups captured after the trigger
    pub posttrigger: u32,
    /// Minimum time between fires (ms)
    pub holdoff_ms: u16,
    /// Re-arm once a capture completes
    pub auto_rearm: bool,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            source: 0,
            slot: 0,
            level: 2048,
            edge: TriggerEdge::Rising,
            pretrigger: 0,
            posttrigger: 0,
            holdoff_ms: 0,
            auto_rearm: false,
        }
    }
}

impl TriggerConfig {
    /// Validate a host setup request against the active channel set
    pub fn from_setup(
        setup: &TriggerSetup,
        channels: &ChannelTable,
        layout: &BufferLayout,
    ) -> Result<Self, UnitError> {
        let slot = channels.slot_of(setup.source).ok_or(UnitError::BadValue)?;
        let edge = setup
            .edge()
            .filter(TriggerEdge::is_selector)
            .ok_or(UnitError::BadValue)?;

        if setup.level > MAX_LEVEL {
            return Err(UnitError::BadValue);
        }
        if setup.pretrigger > layout.pretrigger_capacity() {
            return Err(UnitError::BadValue);
        }

        Ok(Self {
            source: setup.source,
            slot,
            level: setup.level,
            edge,
            pretrigger: setup.pretrigger,
            posttrigger: setup.posttrigger,
            holdoff_ms: setup.holdoff_ms,
            auto_rearm: setup.auto_rearm,
        })
    }

    /// Wire form of the current settings
    pub fn to_setup(&self) -> TriggerSetup {
        TriggerSetup {
            source: self.source,
            level: self.level,
            edge: self.edge.to_byte(),
            pretrigger: self.pretrigger,
            posttrigger: self.posttrigger,
            holdoff_ms: self.holdoff_ms,
            auto_rearm: self.auto_rearm,
        }
    }

    /// Returns true once a capture length has been set, which arming needs
    pub fn is_configured(&self) -> bool {
        self.posttrigger > 0
    }
}

/// Edge detector state
#[derive(Debug, Clone, Copy, Default)]
pub struct TriggerDetector {
    baseline: u16,
    holdoff: Countdown,
}

impl TriggerDetector {
    /// Create a detector with no hold-off running
    pub const fn new() -> Self {
        Self {
            baseline: 0,
            holdoff: Countdown::new(),
        }
    }

    /// Take `sample` as the previous value for the next comparison
    pub fn rebase(&mut self, sample: u16) {
        self.baseline = sample;
    }

    /// Compare `sample` with the previous one and advance
    pub fn detect(&mut self, config: &TriggerConfig, sample: u16) -> Option<TriggerEdge> {
        let prev = core::mem::replace(&mut self.baseline, sample);
        let level = config.level;

        if config.edge.permits_rising() && prev < level && level <= sample {
            Some(TriggerEdge::Rising)
        } else if config.edge.permits_falling() && prev > level && level >= sample {
            Some(TriggerEdge::Falling)
        } else {
            None
        }
    }

    /// Pass a fire through the hold-off gate
    ///
    /// Returns false while the previous hold-off is still counting. An
    /// admitted fire restarts the countdown.
    pub fn admit(&mut self, holdoff_ms: u16) -> bool {
        if !self.holdoff.expired() {
            return false;
        }
        self.holdoff.start(holdoff_ms as u32);
        true
    }

    /// Advance the hold-off countdown
    pub fn tick(&mut self, elapsed_ms: u32) {
        self.holdoff.tick(elapsed_ms);
    }

    /// Milliseconds of hold-off left
    pub fn holdoff_remaining(&self) -> u32 {
        self.holdoff.remaining()
    }
}

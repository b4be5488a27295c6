//! Unit error taxonomy
//!
//! Every request either succeeds or fails with one of these kinds, each with
//! a stable wire code. Overruns are not request errors: they originate in an
//! interrupt with no request pending and surface only as an end-of-stream
//! notice after the emergency shutdown recovers.

use periscope_protocol::messages::ParseError;

use crate::config::ConfigError;
use crate::traits::ClaimError;

/// Failure of a unit operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UnitError {
    /// Invalid pin, channel or frequency at setup or init
    BadConfig,
    /// Request field out of range
    BadValue,
    /// Operation not legal in the current mode
    Busy,
    /// Capture buffer could not be allocated
    OutOfMemory,
    /// Bus-level timeout (sibling units only)
    HwTimeout,
    /// Sample rate too high for smoothing
    TooFast,
    /// Smoothing switched off in the configuration
    SmoothingDisabled,
    /// A pin or peripheral is owned by another unit
    ResourceBusy,
    /// Request code not understood
    UnknownCommand,
    /// Request payload has the wrong size
    Malformed,
}

impl UnitError {
    /// Wire code carried in error replies
    pub fn to_byte(self) -> u8 {
        match self {
            UnitError::BadConfig => 0x01,
            UnitError::BadValue => 0x02,
            UnitError::Busy => 0x03,
            UnitError::OutOfMemory => 0x04,
            UnitError::HwTimeout => 0x05,
            UnitError::TooFast => 0x06,
            UnitError::SmoothingDisabled => 0x07,
            UnitError::ResourceBusy => 0x08,
            UnitError::UnknownCommand => 0x09,
            UnitError::Malformed => 0x0A,
        }
    }
}

impl From<ParseError> for UnitError {
    fn from(e: ParseError) -> Self {
        match e {
            ParseError::UnknownCommand(_) => UnitError::UnknownCommand,
            ParseError::Truncated | ParseError::TrailingData => UnitError::Malformed,
        }
    }
}

impl From<ConfigError> for UnitError {
    fn from(_: ConfigError) -> Self {
        UnitError::BadConfig
    }
}

impl From<ClaimError> for UnitError {
    fn from(_: ClaimError) -> Self {
        UnitError::ResourceBusy
    }
}

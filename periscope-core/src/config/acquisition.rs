//! Acquisition unit configuration
//!
//! Set by the user, persisted by the configuration collaborator as a postcard
//! blob, and applied only when the unit initializes. Changing the channel set
//! requires a full re-initialization.

use serde::{Deserialize, Serialize};

use crate::acquisition::channels::VALID_CHANNEL_MASK;
use crate::acquisition::rate::max_sample_rate_hz;

/// Highest sample-time code of the converter
pub const MAX_SAMPLE_TIME: u8 = 7;

/// Averaging factor scale (permille)
pub const AVERAGING_SCALE: u16 = 1000;

/// Upper bound on the encoded size of [`AcquisitionConfig`]
pub const CONFIG_BLOB_SIZE: usize = 32;

/// Errors from validating or decoding a configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Channel mask selects nothing
    NoChannels,
    /// Channel mask selects a channel the converter does not have
    InvalidChannel,
    /// Sample-time code out of range
    InvalidSampleTime,
    /// Frequency is zero or beyond what the converter sustains
    InvalidFrequency,
    /// Averaging factor above 1000
    InvalidAveraging,
    /// Buffer cannot hold two full conversion groups
    BufferTooSmall,
    /// Persisted blob could not be encoded or decoded
    Encoding,
}

/// Acquisition unit configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AcquisitionConfig {
    /// Enabled converter channels, bit N = channel N
    pub channel_mask: u32,
    /// Converter sample-time code (0..=7)
    pub sample_time: u8,
    /// Target conversion group rate (Hz)
    pub frequency_hz: u32,
    /// Capture buffer size in samples (rounded down at init)
    pub buffer_size: u32,
    /// Smoothing factor in permille (0..=1000)
    pub averaging_factor: u16,
    /// Smoothing enabled
    pub averaging_enabled: bool,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            channel_mask: 0b1, // PA0
            sample_time: 2,    // 13.5 cycles
            frequency_hz: 1000,
            buffer_size: 256,
            averaging_factor: 500,
            averaging_enabled: true,
        }
    }
}

impl AcquisitionConfig {
    /// Number of enabled channels
    pub fn channel_count(&self) -> usize {
        self.channel_mask.count_ones() as usize
    }

    /// Check the configuration before any hardware is touched
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.channel_mask == 0 {
            return Err(ConfigError::NoChannels);
        }
        if self.channel_mask & !VALID_CHANNEL_MASK != 0 {
            return Err(ConfigError::InvalidChannel);
        }
        if self.sample_time > MAX_SAMPLE_TIME {
            return Err(ConfigError::InvalidSampleTime);
        }

        let max_hz = max_sample_rate_hz(self.sample_time, self.channel_count());
        if self.frequency_hz == 0 || self.frequency_hz > max_hz {
            return Err(ConfigError::InvalidFrequency);
        }
        if self.averaging_factor > AVERAGING_SCALE {
            return Err(ConfigError::InvalidAveraging);
        }
        if (self.buffer_size as usize) < 2 * self.channel_count() {
            return Err(ConfigError::BufferTooSmall);
        }

        Ok(())
    }

    /// Encode into `buf`, returning the used part
    pub fn to_bytes<'a>(&self, buf: &'a mut [u8]) -> Result<&'a mut [u8], ConfigError> {
        postcard::to_slice(self, buf).map_err(|_| ConfigError::Encoding)
    }

    /// Decode a persisted blob and validate it
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ConfigError> {
        let config: Self = postcard::from_bytes(bytes).map_err(|_| ConfigError::Encoding)?;
        config.validate()?;
        Ok(config)
    }
}

//! Board defaults
//!
//! Generated by the build script from `periscope.toml`.

use periscope_core::AcquisitionConfig;

include!(concat!(env!("OUT_DIR"), "/defaults.rs"));

/// Acquisition configuration applied at unit init
pub fn acquisition() -> AcquisitionConfig {
    AcquisitionConfig {
        channel_mask: CHANNEL_MASK,
        sample_time: SAMPLE_TIME,
        frequency_hz: FREQUENCY_HZ,
        buffer_size: BUFFER_SIZE,
        averaging_factor: AVERAGING_FACTOR,
        averaging_enabled: AVERAGING_ENABLED,
    }
}

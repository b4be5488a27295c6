//! Pin and peripheral ownership
//!
//! Units claim everything they drive at init, all-or-nothing, and release it
//! on teardown.

/// GPIO port
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Port {
    A,
    B,
    C,
    D,
    F,
}

/// A claimable hardware resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Resource {
    /// The analog converter
    Adc,
    /// DMA channel moving converter results
    AdcDma,
    /// Timer pacing the conversions
    SampleTimer,
    /// A GPIO pin
    Pin(Port, u8),
}

/// Errors from claiming resources
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClaimError {
    /// Resource already owned
    AlreadyClaimed(Resource),
    /// Resource does not exist on this chip
    Invalid(Resource),
}

/// Resource arbitration collaborator
pub trait ResourceClaim {
    /// Claim every resource in `resources`, or none of them
    fn claim_all(&mut self, resources: &[Resource]) -> Result<(), ClaimError>;

    /// Release resources previously claimed
    fn release_all(&mut self, resources: &[Resource]);
}

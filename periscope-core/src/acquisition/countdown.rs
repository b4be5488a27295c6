//! Millisecond countdown advanced by the periodic tick

/// A one-shot countdown
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Countdown {
    remaining_ms: u32,
}

impl Countdown {
    /// Create an expired countdown
    pub const fn new() -> Self {
        Self { remaining_ms: 0 }
    }

    /// (Re)start counting down from `duration_ms`
    pub fn start(&mut self, duration_ms: u32) {
        self.remaining_ms = duration_ms;
    }

    /// Advance by `elapsed_ms`
    ///
    /// Returns true only on the tick that makes the countdown expire.
    pub fn tick(&mut self, elapsed_ms: u32) -> bool {
        if self.remaining_ms == 0 {
            return false;
        }
        self.remaining_ms = self.remaining_ms.saturating_sub(elapsed_ms);
        self.remaining_ms == 0
    }

    /// Check if the countdown has run out (or was never started)
    pub fn expired(&self) -> bool {
        self.remaining_ms == 0
    }

    /// Milliseconds left
    pub fn remaining(&self) -> u32 {
        self.remaining_ms
    }

    /// Stop without signalling expiry
    pub fn cancel(&mut self) {
        self.remaining_ms = 0;
    }
}

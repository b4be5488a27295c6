//! Converter, sample timer and DMA abstraction
//!
//! The conversion pipeline is a timer triggering one conversion group per
//! period, with the converter's results moved by a circular DMA channel into
//! a buffer owned by the engine. Implementations program the registers; all
//! decisions stay in the engine.

/// Half/full transfer flags, sampled once per buffer interrupt
///
/// The backend reads and clears the hardware flags in one go and hands the
/// snapshot to the engine, which never looks at the live register again
/// while handling it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DmaStatus {
    /// First half of the buffer has just been written
    pub half: bool,
    /// Second half of the buffer has just been written
    pub full: bool,
}

impl DmaStatus {
    /// Decode a raw flag word (bit 0 = half, bit 1 = full)
    pub const fn from_bits(bits: u8) -> Self {
        Self {
            half: bits & 0b01 != 0,
            full: bits & 0b10 != 0,
        }
    }

    /// Returns true if no boundary is flagged
    pub fn is_empty(&self) -> bool {
        !self.half && !self.full
    }
}

/// Hardware backend of the acquisition unit
pub trait AdcHardware {
    /// Clock feeding the sample timer (Hz)
    fn timer_clock_hz(&self) -> u32;

    /// Select the channel sequence and sample time; the converter stays off
    fn configure(&mut self, channel_mask: u32, sample_time: u8);

    /// Program the sample timer with register values (already minus one)
    fn set_timer(&mut self, prescaler: u16, reload: u16);

    /// Enable the converter, point the DMA at `target` in circular mode and
    /// start the free-running timer
    ///
    /// `target` stays owned by the engine and is not reallocated until
    /// [`AdcHardware::stop`] has been called.
    fn start(&mut self, target: &mut [u16]);

    /// Stop the timer, converter and DMA, and disable all interrupts
    fn stop(&mut self);

    /// Index of the next sample the DMA will write (0..buffer length)
    fn write_position(&self) -> usize;

    /// Enable or disable the end-of-conversion-group interrupt
    fn set_group_irq(&mut self, enabled: bool);

    /// Enable or disable the half/full transfer interrupts
    fn set_buffer_irqs(&mut self, enabled: bool);

    /// Drop any latched half/full flags
    fn clear_buffer_flags(&mut self);

    /// Mask this peripheral's interrupts for the duration of a mode switch
    fn mask_irqs(&mut self);

    /// Undo [`AdcHardware::mask_irqs`]
    fn unmask_irqs(&mut self);
}

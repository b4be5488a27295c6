//! Host link UART for STM32F0

use embassy_stm32::usart::Error as UsartError;

/// Host link configuration
#[derive(Debug, Clone, Copy)]
pub struct UartConfig {
    /// Baud rate
    pub baudrate: u32,
}

impl Default for UartConfig {
    fn default() -> Self {
        Self {
            // Sustains a 1 kHz single-channel stream with room to spare
            baudrate: 921_600,
        }
    }
}

impl UartConfig {
    /// Convert into an embassy-stm32 usart configuration
    pub fn to_usart(self) -> embassy_stm32::usart::Config {
        let mut config = embassy_stm32::usart::Config::default();
        config.baudrate = self.baudrate;
        config
    }
}

/// Error from host link operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UartBusError {
    /// Framing error
    Framing,
    /// Noise error
    Noise,
    /// Overrun error
    Overrun,
    /// Parity error
    Parity,
    /// Frame does not fit the staging buffer
    BufferTooSmall,
    /// Other error
    Other,
}

impl UartBusError {
    /// Received bytes were lost or corrupted on the line
    pub fn lost_bytes(self) -> bool {
        matches!(self, Self::Framing | Self::Noise | Self::Overrun | Self::Parity)
    }
}

impl From<UsartError> for UartBusError {
    fn from(e: UsartError) -> Self {
        match e {
            UsartError::Framing => UartBusError::Framing,
            UsartError::Noise => UartBusError::Noise,
            UsartError::Overrun => UartBusError::Overrun,
            UsartError::Parity => UartBusError::Parity,
            UsartError::BufferTooLong => UartBusError::BufferTooSmall,
            _ => UartBusError::Other,
        }
    }
}

//! Converter channel set
//!
//! STM32F072 converter inputs:
//! - IN0..IN7: PA0..PA7
//! - IN8, IN9: PB0, PB1
//! - IN10..IN15: PC0..PC5
//! - IN16: internal temperature sensor
//! - IN17: internal voltage reference

use heapless::Vec;
use periscope_protocol::MAX_CHANNELS;

use crate::config::ConfigError;
use crate::traits::Port;

/// Internal temperature sensor channel
pub const CHANNEL_TEMPERATURE: u8 = 16;

/// Internal voltage reference channel
pub const CHANNEL_VREFINT: u8 = 17;

/// Mask of every channel the converter has
pub const VALID_CHANNEL_MASK: u32 = (1 << MAX_CHANNELS) - 1;

/// Get the GPIO pin of a converter channel, `None` for internal channels
pub fn channel_pin(channel: u8) -> Option<(Port, u8)> {
    match channel {
        0..=7 => Some((Port::A, channel)),
        8..=9 => Some((Port::B, channel - 8)),
        10..=15 => Some((Port::C, channel - 10)),
        _ => None,
    }
}

/// Active channels in conversion order
///
/// Position in the table is the slot of the channel within every
/// conversion group, and therefore its offset inside a group in the buffer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelTable {
    channels: Vec<u8, MAX_CHANNELS>,
}

impl ChannelTable {
    /// Build the table from a channel bitmask, lowest channel first
    pub fn from_mask(mask: u32) -> Result<Self, ConfigError> {
        if mask == 0 {
            return Err(ConfigError::NoChannels);
        }
        if mask & !VALID_CHANNEL_MASK != 0 {
            return Err(ConfigError::InvalidChannel);
        }

        let mut channels = Vec::new();
        for channel in 0..MAX_CHANNELS as u8 {
            if mask & (1 << channel) != 0 {
                // Cannot overflow, the mask was bounded to MAX_CHANNELS bits
                let _ = channels.push(channel);
            }
        }
        Ok(Self { channels })
    }

    /// Number of active channels
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// Returns true before the table has been built at init
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Channel indices in slot order
    pub fn as_slice(&self) -> &[u8] {
        &self.channels
    }

    /// Slot of `channel` within a conversion group
    pub fn slot_of(&self, channel: u8) -> Option<usize> {
        self.channels.iter().position(|&c| c == channel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_table_order() {
        let table = ChannelTable::from_mask((1 << 17) | (1 << 4) | 1).unwrap();
        assert_eq!(table.as_slice(), &[0, 4, 17]);
        assert_eq!(table.slot_of(4), Some(1));
        assert_eq!(table.slot_of(17), Some(2));
        assert_eq!(table.slot_of(5), None);
    }

    #[test]
    fn test_rejects_empty_and_invalid() {
        assert_eq!(ChannelTable::from_mask(0), Err(ConfigError::NoChannels));
        assert_eq!(
            ChannelTable::from_mask(1 << 18),
            Err(ConfigError::InvalidChannel)
        );
    }

    #[test]
    fn test_channel_pins() {
        assert_eq!(channel_pin(0), Some((Port::A, 0)));
        assert_eq!(channel_pin(9), Some((Port::B, 1)));
        assert_eq!(channel_pin(15), Some((Port::C, 5)));
        assert_eq!(channel_pin(CHANNEL_TEMPERATURE), None);
        assert_eq!(channel_pin(CHANNEL_VREFINT), None);
    }

    proptest! {
        #[test]
        fn prop_table_matches_mask(mask in 1u32..=VALID_CHANNEL_MASK) {
            let table = ChannelTable::from_mask(mask).unwrap();
            prop_assert_eq!(table.len(), mask.count_ones() as usize);
            prop_assert!(table.as_slice().windows(2).all(|w| w[0] < w[1]));
            for &channel in table.as_slice() {
                prop_assert!(mask & (1 << channel) != 0);
            }
        }
    }
}

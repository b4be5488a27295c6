//! Resource registry
//!
//! Reference implementation of [`ResourceClaim`] tracking ownership as
//! bitmasks: one bit per peripheral and one 16-bit word per GPIO port.

use crate::traits::{ClaimError, Port, Resource, ResourceClaim};

/// Pins per GPIO port
const PINS_PER_PORT: u8 = 16;

/// Ownership tracker for pins and peripherals
#[derive(Debug, Clone, Default)]
pub struct ResourceRegistry {
    /// Bitmask of claimed peripherals
    peripherals: u8,
    /// Bitmask of claimed pins, indexed by port
    pins: [u16; 5],
}

impl ResourceRegistry {
    /// Create a registry with nothing claimed
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if a resource is currently claimed
    pub fn is_claimed(&self, resource: Resource) -> bool {
        match Self::locate(resource) {
            Ok(Slot::Peripheral(bit)) => self.peripherals & bit != 0,
            Ok(Slot::Pin(port, bit)) => self.pins[port] & bit != 0,
            Err(_) => false,
        }
    }

    fn locate(resource: Resource) -> Result<Slot, ClaimError> {
        match resource {
            Resource::Adc => Ok(Slot::Peripheral(1 << 0)),
            Resource::AdcDma => Ok(Slot::Peripheral(1 << 1)),
            Resource::SampleTimer => Ok(Slot::Peripheral(1 << 2)),
            Resource::Pin(port, pin) => {
                if pin >= PINS_PER_PORT {
                    return Err(ClaimError::Invalid(resource));
                }
                let index = match port {
                    Port::A => 0,
                    Port::B => 1,
                    Port::C => 2,
                    Port::D => 3,
                    Port::F => 4,
                };
                Ok(Slot::Pin(index, 1 << pin))
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Slot {
    Peripheral(u8),
    Pin(usize, u16),
}

impl ResourceClaim for ResourceRegistry {
    fn claim_all(&mut self, resources: &[Resource]) -> Result<(), ClaimError> {
        // Check everything first so a failure leaves no partial claim
        for &resource in resources {
            Self::locate(resource)?;
            if self.is_claimed(resource) {
                return Err(ClaimError::AlreadyClaimed(resource));
            }
        }

        for &resource in resources {
            match Self::locate(resource)? {
                Slot::Peripheral(bit) => self.peripherals |= bit,
                Slot::Pin(port, bit) => self.pins[port] |= bit,
            }
        }
        Ok(())
    }

    fn release_all(&mut self, resources: &[Resource]) {
        for &resource in resources {
            match Self::locate(resource) {
                Ok(Slot::Peripheral(bit)) => self.peripherals &= !bit,
                Ok(Slot::Pin(port, bit)) => self.pins[port] &= !bit,
                Err(_) => {}
            }
        }
    }
}

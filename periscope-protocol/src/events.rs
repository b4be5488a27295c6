//! Trigger edge codes shared by requests and capture headers

/// Edge selector of a trigger, or the edge that fired it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TriggerEdge {
    /// Signal crossed the level going up
    Rising,
    /// Signal crossed the level going down
    Falling,
    /// Either direction (selector only, never reported as a fired edge)
    Both,
    /// Injected by a host request, no comparison involved
    Manual,
}

// Wire format values
const EDGE_RISING: u8 = 0x01;
const EDGE_FALLING: u8 = 0x02;
const EDGE_BOTH: u8 = 0x03;
const EDGE_MANUAL: u8 = 0x04;

impl TriggerEdge {
    /// Parse an edge from its wire format byte
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            EDGE_RISING => Some(TriggerEdge::Rising),
            EDGE_FALLING => Some(TriggerEdge::Falling),
            EDGE_BOTH => Some(TriggerEdge::Both),
            EDGE_MANUAL => Some(TriggerEdge::Manual),
            _ => None,
        }
    }

    /// Convert to wire format byte
    pub fn to_byte(self) -> u8 {
        match self {
            TriggerEdge::Rising => EDGE_RISING,
            TriggerEdge::Falling => EDGE_FALLING,
            TriggerEdge::Both => EDGE_BOTH,
            TriggerEdge::Manual => EDGE_MANUAL,
        }
    }

    /// Returns true if this selector lets a rising crossing fire
    pub fn permits_rising(&self) -> bool {
        matches!(self, TriggerEdge::Rising | TriggerEdge::Both)
    }

    /// Returns true if this selector lets a falling crossing fire
    pub fn permits_falling(&self) -> bool {
        matches!(self, TriggerEdge::Falling | TriggerEdge::Both)
    }

    /// Returns true if the host may configure this edge as a selector
    pub fn is_selector(&self) -> bool {
        !matches!(self, TriggerEdge::Manual)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_roundtrip() {
        let edges = [
            TriggerEdge::Rising,
            TriggerEdge::Falling,
            TriggerEdge::Both,
            TriggerEdge::Manual,
        ];

        for edge in edges {
            let byte = edge.to_byte();
            assert_eq!(TriggerEdge::from_byte(byte), Some(edge));
        }
    }

    #[test]
    fn test_edge_permissions() {
        assert!(TriggerEdge::Rising.permits_rising());
        assert!(!TriggerEdge::Rising.permits_falling());
        assert!(TriggerEdge::Falling.permits_falling());
        assert!(TriggerEdge::Both.permits_rising());
        assert!(TriggerEdge::Both.permits_falling());
        assert!(!TriggerEdge::Manual.permits_rising());
        assert!(!TriggerEdge::Manual.permits_falling());
    }

    #[test]
    fn test_manual_is_not_a_selector() {
        assert!(!TriggerEdge::Manual.is_selector());
        assert!(TriggerEdge::Both.is_selector());
    }

    #[test]
    fn test_unknown_edge() {
        assert!(TriggerEdge::from_byte(0x00).is_none());
        assert!(TriggerEdge::from_byte(0xFF).is_none());
    }
}

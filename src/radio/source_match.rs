//! Source address match table consulted when acknowledging data requests.
//!
//! The table itself belongs to the upper layer; the driver only performs
//! lookups, from callback context, so implementations must not block.

use crate::radio::engine::ExtAddress;

/// Lookup-only view of the upper layer's pending-data address table
pub trait SourceMatchTable: Send + Sync {
    /// A frame is pending for this short address
    fn find_short(&self, address: u16) -> bool;

    /// A frame is pending for this extended address
    fn find_extended(&self, address: &ExtAddress) -> bool;
}

/// Fixed address list built up front
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticSourceMatchTable {
    short: Vec<u16>,
    extended: Vec<ExtAddress>,
}

impl StaticSourceMatchTable {
    pub fn new(short: Vec<u16>, extended: Vec<ExtAddress>) -> Self {
        Self { short, extended }
    }
}

impl SourceMatchTable for StaticSourceMatchTable {
    fn find_short(&self, address: u16) -> bool {
        self.short.contains(&address)
    }

    fn find_extended(&self, address: &ExtAddress) -> bool {
        self.extended.iter().any(|entry| entry == address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        let table = StaticSourceMatchTable::new(vec![0x1234], vec![[1, 2, 3, 4, 5, 6, 7, 8]]);
        assert!(table.find_short(0x1234));
        assert!(!table.find_short(0x4321));
        assert!(table.find_extended(&[1, 2, 3, 4, 5, 6, 7, 8]));
        assert!(!table.find_extended(&[8, 7, 6, 5, 4, 3, 2, 1]));
        assert!(!StaticSourceMatchTable::default().find_short(0));
    }
}

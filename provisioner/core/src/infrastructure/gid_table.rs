// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use std::collections::BTreeSet;

use crate::domain::gid::{AllocatorError, GidTable};

/// In-memory GID table bounded by an inclusive range
#[derive(Debug, Clone)]
pub struct RangeGidTable {
    min: u32,
    max: u32,
    taken: BTreeSet<u32>,
}

impl RangeGidTable {
    pub fn new(min: u32, max: u32) -> Result<Self, AllocatorError> {
        if min > max {
            return Err(AllocatorError::InvalidRange { min, max });
        }
        Ok(Self {
            min,
            max,
            taken: BTreeSet::new(),
        })
    }

    pub fn range(&self) -> (u32, u32) {
        (self.min, self.max)
    }

    /// Allocated GIDs in ascending order
    pub fn allocated(&self) -> impl Iterator<Item = u32> + '_ {
        self.taken.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.taken.len()
    }

    pub fn is_empty(&self) -> bool {
        self.taken.is_empty()
    }

    fn check_range(&self, gid: u32) -> Result<(), AllocatorError> {
        if gid < self.min || gid > self.max {
            return Err(AllocatorError::OutOfRange {
                gid,
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }
}

impl GidTable for RangeGidTable {
    fn allocate(&mut self, gid: u32) -> Result<(), AllocatorError> {
        self.check_range(gid)?;
        if !self.taken.insert(gid) {
            return Err(AllocatorError::Conflict(gid));
        }
        Ok(())
    }

    fn release(&mut self, gid: u32) -> Result<(), AllocatorError> {
        self.check_range(gid)?;
        self.taken.remove(&gid);
        Ok(())
    }

    fn is_allocated(&self, gid: u32) -> bool {
        self.taken.contains(&gid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_marks_gid() {
        let mut table = RangeGidTable::new(2000, 2100).unwrap();
        table.allocate(2000).unwrap();
        assert!(table.is_allocated(2000));
        assert!(!table.is_allocated(2001));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_second_allocation_conflicts() {
        let mut table = RangeGidTable::new(2000, 2100).unwrap();
        table.allocate(2050).unwrap();
        assert_eq!(table.allocate(2050), Err(AllocatorError::Conflict(2050)));
    }

    #[test]
    fn test_out_of_range() {
        let mut table = RangeGidTable::new(2000, 2100).unwrap();
        assert!(matches!(table.allocate(1999), Err(AllocatorError::OutOfRange { .. })));
        assert!(matches!(table.allocate(2101), Err(AllocatorError::OutOfRange { .. })));
        table.allocate(2100).unwrap();
    }

    #[test]
    fn test_release_frees_gid() {
        let mut table = RangeGidTable::new(2000, 2100).unwrap();
        table.allocate(2010).unwrap();
        table.release(2010).unwrap();
        assert!(table.is_empty());
        table.allocate(2010).unwrap();
    }

    #[test]
    fn test_inverted_range_rejected() {
        assert_eq!(
            RangeGidTable::new(10, 5).unwrap_err(),
            AllocatorError::InvalidRange { min: 10, max: 5 }
        );
    }
}

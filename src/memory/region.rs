// Tue Jan 13 2026 - Alex

use crate::memory::{Address, Protection};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One contiguous, uniformly protected span of a target's address space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryRegion {
    base: Address,
    size: usize,
    protection: Protection,
}

impl MemoryRegion {
    pub fn new(base: Address, size: usize, protection: Protection) -> Self {
        Self { base, size, protection }
    }

    pub fn base_address(&self) -> Address {
        self.base
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn protection(&self) -> Protection {
        self.protection
    }

    pub fn end(&self) -> Address {
        Address::new(self.base.as_usize().saturating_add(self.size))
    }

    pub fn contains(&self, addr: Address) -> bool {
        addr.is_within_range(self.base, self.end())
    }

    /// True when `[addr, addr + len)` lies entirely inside this region.
    pub fn contains_span(&self, addr: Address, len: usize) -> bool {
        match addr.checked_add(len) {
            Some(end) => addr >= self.base && end <= self.end(),
            None => false,
        }
    }

    pub fn is_readable(&self) -> bool {
        self.protection.can_read()
    }

    pub fn is_writable(&self) -> bool {
        self.protection.can_write()
    }
}

impl fmt::Display for MemoryRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}) {} {:#x}", self.base, self.end(), self.protection, self.size)
    }
}

/// Decides which enumerated regions are worth scanning.
///
/// A region is admitted iff it is non-empty, readable and writable, not a
/// guard page, and no larger than `max_size` when a cap is set. Free and
/// reserved ranges never reach the filter; each platform drops them while
/// walking the address space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RegionFilter {
    pub max_size: Option<usize>,
}

impl RegionFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = Some(max_size);
        self
    }

    pub fn admits(&self, region: &MemoryRegion) -> bool {
        if region.size() == 0 {
            return false;
        }
        let protection = region.protection();
        if protection.is_guard() || !protection.contains(Protection::READ_WRITE) {
            return false;
        }
        match self.max_size {
            Some(cap) => region.size() <= cap,
            None => true,
        }
    }

    /// Keeps admitted regions in ascending address order.
    pub fn apply<I>(&self, regions: I) -> Vec<MemoryRegion>
    where
        I: IntoIterator<Item = MemoryRegion>,
    {
        let mut admitted: Vec<MemoryRegion> = regions.into_iter()
            .filter(|r| self.admits(r))
            .collect();
        admitted.sort_by_key(|r| r.base_address());
        admitted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(base: usize, size: usize, protection: Protection) -> MemoryRegion {
        MemoryRegion::new(Address::new(base), size, protection)
    }

    #[test]
    fn test_filter_requires_read_and_write() {
        let filter = RegionFilter::new();
        assert!(filter.admits(&region(0x1000, 0x10, Protection::READ_WRITE)));
        assert!(filter.admits(&region(0x1000, 0x10, Protection::READ_WRITE | Protection::EXECUTE)));
        assert!(!filter.admits(&region(0x1000, 0x10, Protection::READ)));
        assert!(!filter.admits(&region(0x1000, 0x10, Protection::READ | Protection::EXECUTE)));
        assert!(!filter.admits(&region(0x1000, 0x10, Protection::WRITE)));
    }

    #[test]
    fn test_filter_rejects_guard_and_empty() {
        let filter = RegionFilter::new();
        assert!(!filter.admits(&region(0x1000, 0x10, Protection::READ_WRITE | Protection::GUARD)));
        assert!(!filter.admits(&region(0x1000, 0, Protection::READ_WRITE)));
    }

    #[test]
    fn test_filter_size_cap() {
        let filter = RegionFilter::new().with_max_size(0x100);
        assert!(filter.admits(&region(0x1000, 0x100, Protection::READ_WRITE)));
        assert!(!filter.admits(&region(0x1000, 0x101, Protection::READ_WRITE)));
    }

    #[test]
    fn test_apply_sorts_by_address() {
        let regions = vec![
            region(0x3000, 0x10, Protection::READ_WRITE),
            region(0x1000, 0x10, Protection::READ_WRITE),
            region(0x2000, 0x10, Protection::READ),
        ];
        let admitted = RegionFilter::new().apply(regions);
        let bases: Vec<usize> = admitted.iter().map(|r| r.base_address().as_usize()).collect();
        assert_eq!(bases, vec![0x1000, 0x3000]);
    }

    #[test]
    fn test_contains_span() {
        let r = region(0x1000, 0x10, Protection::READ_WRITE);
        assert!(r.contains_span(Address::new(0x1000), 0x10));
        assert!(r.contains_span(Address::new(0x100c), 4));
        assert!(!r.contains_span(Address::new(0x100d), 4));
        assert!(!r.contains_span(Address::new(usize::MAX), 2));
    }
}

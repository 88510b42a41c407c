// Tue Jan 13 2026 - Alex

use crate::memory::{Address, MemoryError, MemoryReader, MemoryRegion, Protection, RegionFilter};

struct SnapshotRegion {
    region: MemoryRegion,
    data: Vec<u8>,
    readable: bool,
}

/// An address space held in local memory.
///
/// Useful for scanning captured regions offline with the same scanner that
/// runs against live processes.
pub struct SnapshotMemory {
    regions: Vec<SnapshotRegion>,
    filter: RegionFilter,
}

impl SnapshotMemory {
    pub fn new() -> Self {
        Self {
            regions: Vec::new(),
            filter: RegionFilter::default(),
        }
    }

    pub fn with_filter(mut self, filter: RegionFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Adds a read/write region backed by `data`.
    pub fn with_region(self, base: usize, data: Vec<u8>) -> Self {
        self.with_protected_region(base, data, Protection::READ_WRITE)
    }

    pub fn with_protected_region(mut self, base: usize, data: Vec<u8>, protection: Protection) -> Self {
        self.push(base, data, protection, true);
        self
    }

    /// Adds a region that is listed but refuses every read, like a page that
    /// was unmapped between enumeration and the copy.
    pub fn with_unreadable_region(mut self, base: usize, size: usize) -> Self {
        self.push(base, vec![0u8; size], Protection::READ_WRITE, false);
        self
    }

    fn push(&mut self, base: usize, data: Vec<u8>, protection: Protection, readable: bool) {
        let region = MemoryRegion::new(Address::new(base), data.len(), protection);
        self.regions.push(SnapshotRegion { region, data, readable });
        self.regions.sort_by_key(|r| r.region.base_address());
    }

    /// Copies every region `source` reports. Regions that fail to read are
    /// skipped.
    pub fn capture(source: &dyn MemoryReader) -> Self {
        let mut snapshot = Self::new();
        for region in source.regions() {
            match source.read_bytes(region.base_address(), region.size()) {
                Ok(data) => snapshot.push(region.base_address().as_usize(), data, region.protection(), true),
                Err(e) => log::debug!("Skipping {} while capturing: {}", region, e),
            }
        }
        snapshot
    }

    pub fn region_count(&self) -> usize {
        self.regions.len()
    }

    pub fn total_bytes(&self) -> usize {
        self.regions.iter().map(|r| r.data.len()).sum()
    }
}

impl Default for SnapshotMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryReader for SnapshotMemory {
    fn read_raw(&self, addr: Address, buf: &mut [u8]) -> Result<(), MemoryError> {
        let entry = self.regions.iter()
            .find(|r| r.region.contains_span(addr, buf.len()))
            .ok_or_else(|| MemoryError::read_failed(addr, buf.len()))?;

        if !entry.readable {
            return Err(MemoryError::read_failed(addr, buf.len()));
        }

        let offset = addr.as_usize() - entry.region.base_address().as_usize();
        buf.copy_from_slice(&entry.data[offset..offset + buf.len()]);
        Ok(())
    }

    fn regions(&self) -> Vec<MemoryRegion> {
        self.filter.apply(self.regions.iter().map(|r| r.region))
    }
}

// Tue Jan 13 2026 - Alex

use crate::config::ScanConfig;
use crate::memory::{Address, MemoryReader, MemoryRegion};
use crate::pattern::{Pattern, PatternError, PatternResult};
use crate::utils::format_bytes;
use crate::utils::logging::ScopedTimer;
use rayon::prelude::*;
use std::collections::TryReserveError;
use std::ops::ControlFlow;

pub const DEFAULT_CHUNK_SIZE: usize = 16 * 1024 * 1024;

/// Scans a reader's regions for signatures.
///
/// Regions are visited in the order the reader reports them (ascending
/// address) and offsets within a region in ascending order, so the first
/// match is always the lowest matching address.
///
/// A region is copied in windows of `chunk_size` bytes, each extended by the
/// longest pattern minus one so no match straddling a window edge is lost.
/// Memory use is bounded by one window whatever the region size. A region
/// whose window cannot be allocated or copied is skipped.
///
/// Which regions are offered at all (including `ScanConfig::max_region_size`)
/// is decided by the reader's `RegionFilter`, not here.
#[derive(Debug, Clone)]
pub struct PatternScanner {
    parallel_batch: bool,
    chunk_size: usize,
}

impl PatternScanner {
    pub fn new() -> Self {
        Self {
            parallel_batch: true,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Takes `parallel_batch` and `chunk_size`. The region cap belongs to the
    /// reader; apply `config.region_filter()` to the handle.
    pub fn from_config(config: &ScanConfig) -> Self {
        Self {
            parallel_batch: config.parallel_batch,
            chunk_size: config.chunk_size.max(1),
        }
    }

    pub fn use_parallel(mut self, parallel: bool) -> Self {
        self.parallel_batch = parallel;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Validates `signature`/`mask` and runs [`find_pattern`](Self::find_pattern).
    pub fn find_signature(
        &self,
        reader: &dyn MemoryReader,
        signature: &[u8],
        mask: &[u8],
    ) -> Result<Option<Address>, PatternError> {
        let pattern = Pattern::new(signature.to_vec(), mask.to_vec())?;
        Ok(self.find_pattern(reader, &pattern))
    }

    pub fn find_pattern(&self, reader: &dyn MemoryReader, pattern: &Pattern) -> Option<Address> {
        let _timer = ScopedTimer::new("find_pattern");
        let mut buffer = WindowBuffer::new(self.chunk_size);
        let overlap = pattern.len().saturating_sub(1);

        for region in reader.regions() {
            let mut found = None;
            buffer.for_each_window(reader, &region, overlap, |offset, data| match pattern.find_in(data) {
                Some(hit) => {
                    found = Some(region.base_address() + offset + hit);
                    ControlFlow::Break(())
                }
                None => ControlFlow::Continue(()),
            });

            if let Some(address) = found {
                log::debug!("Pattern {} matched at {}", pattern, address);
                return Some(address);
            }
        }

        log::debug!("Pattern {} not found", pattern);
        None
    }

    /// Finds many patterns with one copy of each region.
    ///
    /// Results are in discovery order. Patterns that never match are absent.
    pub fn find_patterns(&self, reader: &dyn MemoryReader, patterns: &[Pattern]) -> Vec<PatternResult> {
        let _timer = ScopedTimer::new("find_patterns");
        let mut results = Vec::new();
        if patterns.is_empty() {
            return results;
        }

        let overlap = patterns.iter().map(Pattern::len).max().unwrap_or(1).saturating_sub(1);
        let mut found = vec![false; patterns.len()];
        let mut buffer = WindowBuffer::new(self.chunk_size);

        for region in reader.regions() {
            buffer.for_each_window(reader, &region, overlap, |offset, data| {
                let pending: Vec<usize> = (0..patterns.len()).filter(|&i| !found[i]).collect();
                let hits: Vec<Option<usize>> = if self.parallel_batch && pending.len() > 1 {
                    pending.par_iter().map(|&i| patterns[i].find_in(data)).collect()
                } else {
                    pending.iter().map(|&i| patterns[i].find_in(data)).collect()
                };

                for (&i, hit) in pending.iter().zip(hits) {
                    if let Some(hit) = hit {
                        found[i] = true;
                        results.push(PatternResult::new(
                            patterns[i].index(),
                            region.base_address() + offset + hit,
                        ));
                    }
                }

                if results.len() == patterns.len() {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            });

            if results.len() == patterns.len() {
                log::debug!("All {} patterns found", patterns.len());
                break;
            }
        }

        results
    }
}

impl Default for PatternScanner {
    fn default() -> Self {
        Self::new()
    }
}

/// One heap buffer reused across regions, never larger than a window.
struct WindowBuffer {
    data: Vec<u8>,
    chunk_size: usize,
}

impl WindowBuffer {
    fn new(chunk_size: usize) -> Self {
        Self {
            data: Vec::new(),
            chunk_size,
        }
    }

    fn reserve(&mut self, len: usize) -> Result<(), TryReserveError> {
        if self.data.len() < len {
            self.data.try_reserve_exact(len - self.data.len())?;
            self.data.resize(len, 0);
        }
        Ok(())
    }

    /// Copies `region` window by window and hands each to `visit` with its
    /// offset from the region base. Window starts advance by `chunk_size`;
    /// each window also covers the next `overlap` bytes.
    fn for_each_window<F>(&mut self, reader: &dyn MemoryReader, region: &MemoryRegion, overlap: usize, mut visit: F)
    where
        F: FnMut(usize, &[u8]) -> ControlFlow<()>,
    {
        let size = region.size();
        let mut start = 0usize;

        while start < size {
            let len = self.chunk_size.saturating_add(overlap).min(size - start);

            if let Err(e) = self.reserve(len) {
                log::warn!("Skipping {}: cannot allocate {} ({})", region, format_bytes(len as u64), e);
                return;
            }

            let address = region.base_address() + start;
            let window = &mut self.data[..len];
            if let Err(e) = reader.read_into(address, window) {
                if e.is_access_denied() {
                    log::warn!("Skipping {}: {}", region, e);
                } else {
                    log::debug!("Skipping {} at {}: {}", region, address, e);
                }
                return;
            }
            log::trace!("Read {} bytes of {} at {}", len, region, address);

            if visit(start, &self.data[..len]).is_break() || start + len >= size {
                return;
            }
            start += self.chunk_size;
        }
    }
}

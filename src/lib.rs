// Tue Jan 15 2026 - Alex

//! Inspect live processes: enumerate them, read their memory, and scan
//! their writable regions for byte signatures with wildcards.

pub mod config;
pub mod memory;
pub mod orchestration;
pub mod pattern;
pub mod process;
pub mod utils;

pub use config::{ConfigError, ScanConfig};
pub use memory::{Address, MemoryError, MemoryReader, MemoryRegion, SnapshotMemory, TypedReader};
pub use orchestration::{PendingScan, ScanCoordinator, ScanError, ScanStart};
pub use pattern::{Pattern, PatternError, PatternResult, PatternScanner};
pub use process::{ProcessDirectory, ProcessHandle, ProcessId, ProcessInfo, TargetProcess};

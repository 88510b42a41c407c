// Tue Jan 13 2026 - Alex

pub mod coordinator;
pub mod pending;

pub use coordinator::{ScanCoordinator, ScanError, ScanStart, ScanState};
pub use pending::{PendingScan, ScanPoll};

// Tue Jan 13 2026 - Alex

use crate::memory::Address;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MemoryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Process handle is invalid or has been closed")]
    InvalidHandle,
    #[error("Process not found: {0}")]
    ProcessNotFound(u32),
    #[error("Access denied reading {address}. {hint}")]
    AccessDenied { address: Address, hint: &'static str },
    #[error("Read of {size:#x} bytes failed at address {address}")]
    ReadFailed { address: Address, size: usize },
    #[error("Partial read at address {address}: expected {expected:#x} bytes, got {actual:#x}")]
    PartialRead { address: Address, expected: usize, actual: usize },
    #[error("Zero-length read requested")]
    ZeroLengthRead,
}

impl MemoryError {
    pub fn read_failed(address: Address, size: usize) -> Self {
        Self::ReadFailed { address, size }
    }

    /// True for failures caused by missing privilege rather than by the target.
    pub fn is_access_denied(&self) -> bool {
        matches!(self, Self::AccessDenied { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_denied_is_distinguished() {
        let denied = MemoryError::AccessDenied { address: Address::new(0x1000), hint: "run as root" };
        assert!(denied.is_access_denied());
        assert!(!MemoryError::read_failed(Address::new(0x1000), 4).is_access_denied());
        assert!(!MemoryError::InvalidHandle.is_access_denied());
        assert!(denied.to_string().contains("run as root"));
    }
}

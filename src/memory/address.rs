// Tue Jan 13 2026 - Alex

use std::fmt;
use std::ops::{Add, Sub};

/// An address in the target's virtual address space.
///
/// Machine-width on purpose: a target's addresses are passed through
/// unchanged and never reinterpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address {
    value: usize,
}

impl Address {
    pub const fn new(value: usize) -> Self {
        Self { value }
    }

    pub const fn zero() -> Self {
        Self { value: 0 }
    }

    pub fn as_usize(&self) -> usize {
        self.value
    }

    pub fn as_u64(&self) -> u64 {
        self.value as u64
    }

    pub fn is_null(&self) -> bool {
        self.value == 0
    }

    pub fn checked_add(&self, rhs: usize) -> Option<Self> {
        self.value.checked_add(rhs).map(Self::new)
    }

    pub fn distance(&self, other: Self) -> isize {
        self.value.wrapping_sub(other.value) as isize
    }

    pub fn is_within_range(&self, start: Self, end: Self) -> bool {
        self.value >= start.value && self.value < end.value
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:0width$x}", self.value, width = std::mem::size_of::<usize>() * 2)
    }
}

impl fmt::LowerHex for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.value, f)
    }
}

impl fmt::UpperHex for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::UpperHex::fmt(&self.value, f)
    }
}

impl Add<usize> for Address {
    type Output = Self;
    fn add(self, rhs: usize) -> Self::Output {
        Self { value: self.value + rhs }
    }
}

impl Sub<usize> for Address {
    type Output = Self;
    fn sub(self, rhs: usize) -> Self::Output {
        Self { value: self.value - rhs }
    }
}

impl From<usize> for Address {
    fn from(value: usize) -> Self {
        Self::new(value)
    }
}

impl From<Address> for usize {
    fn from(addr: Address) -> Self {
        addr.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_arithmetic() {
        let base = Address::new(0x1000);
        assert_eq!((base + 0x10).as_usize(), 0x1010);
        assert_eq!((base + 0x10 - 0x8).as_usize(), 0x1008);
        assert_eq!(Address::new(0x1010).distance(base), 0x10);
        assert!(Address::new(0x1008).is_within_range(base, base + 0x10));
        assert!(!Address::new(0x1010).is_within_range(base, base + 0x10));
    }

    #[test]
    fn test_checked_add_overflow() {
        assert!(Address::new(usize::MAX).checked_add(1).is_none());
        assert_eq!(Address::new(1).checked_add(1), Some(Address::new(2)));
    }

    #[test]
    fn test_display_is_zero_padded_hex() {
        let text = Address::new(0xabc).to_string();
        assert!(text.starts_with("0x"));
        assert!(text.ends_with("abc"));
        assert_eq!(text.len(), 2 + std::mem::size_of::<usize>() * 2);
    }
}

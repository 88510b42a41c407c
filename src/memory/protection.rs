// Tue Jan 13 2026 - Alex

use bitflags::bitflags;
use std::fmt;

bitflags! {
    /// Page protection of a region, normalised across platforms.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Protection: u32 {
        const READ = 1;
        const WRITE = 2;
        const EXECUTE = 4;
        const GUARD = 8;
    }
}

impl Protection {
    pub const READ_WRITE: Self = Self::READ.union(Self::WRITE);

    /// Parses the permission column of `/proc/<pid>/maps` (`rw-p`, `r-xs`, ...).
    pub fn from_maps_perms(perms: &str) -> Self {
        let bytes = perms.as_bytes();
        let mut protection = Self::empty();
        if bytes.first() == Some(&b'r') {
            protection |= Self::READ;
        }
        if bytes.get(1) == Some(&b'w') {
            protection |= Self::WRITE;
        }
        if bytes.get(2) == Some(&b'x') {
            protection |= Self::EXECUTE;
        }
        protection
    }

    /// Maps a Mach `vm_prot_t` (VM_PROT_READ = 1, WRITE = 2, EXECUTE = 4).
    pub fn from_vm_prot(prot: i32) -> Self {
        Self::from_bits_truncate(prot as u32 & 7)
    }

    pub fn can_read(self) -> bool {
        self.contains(Self::READ)
    }

    pub fn can_write(self) -> bool {
        self.contains(Self::WRITE)
    }

    pub fn can_execute(self) -> bool {
        self.contains(Self::EXECUTE)
    }

    pub fn is_guard(self) -> bool {
        self.contains(Self::GUARD)
    }
}

impl fmt::Display for Protection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let r = if self.can_read() { 'r' } else { '-' };
        let w = if self.can_write() { 'w' } else { '-' };
        let x = if self.can_execute() { 'x' } else { '-' };
        let g = if self.is_guard() { "g" } else { "" };
        write!(f, "{}{}{}{}", r, w, x, g)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_maps_perms() {
        assert_eq!(Protection::from_maps_perms("rw-p"), Protection::READ_WRITE);
        assert_eq!(Protection::from_maps_perms("r-xp"), Protection::READ | Protection::EXECUTE);
        assert_eq!(Protection::from_maps_perms("---p"), Protection::empty());
        assert_eq!(Protection::from_maps_perms(""), Protection::empty());
    }

    #[test]
    fn test_from_vm_prot_ignores_high_bits() {
        assert_eq!(Protection::from_vm_prot(3), Protection::READ_WRITE);
        assert_eq!(Protection::from_vm_prot(0x10 | 1), Protection::READ);
    }

    #[test]
    fn test_display() {
        assert_eq!((Protection::READ_WRITE).to_string(), "rw-");
        assert_eq!((Protection::READ | Protection::GUARD).to_string(), "r--g");
    }
}

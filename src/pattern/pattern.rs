// Tue Jan 13 2026 - Alex

use crate::pattern::PatternError;
use std::fmt;
use std::str::FromStr;

/// A byte signature with a parallel mask.
///
/// A mask byte of zero means "don't care" at that offset; any other value
/// requires the data byte to equal the signature byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    index: usize,
    signature: Vec<u8>,
    mask: Vec<u8>,
    anchor: Option<usize>,
}

impl Pattern {
    pub fn new(signature: Vec<u8>, mask: Vec<u8>) -> Result<Self, PatternError> {
        if signature.is_empty() {
            return Err(PatternError::Empty);
        }
        if signature.len() != mask.len() {
            return Err(PatternError::MaskLengthMismatch {
                signature: signature.len(),
                mask: mask.len(),
            });
        }

        let anchor = mask.iter().position(|&m| m != 0);
        Ok(Self {
            index: 0,
            signature,
            mask,
            anchor,
        })
    }

    /// Every byte significant.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PatternError> {
        Self::new(bytes.to_vec(), vec![0xFF; bytes.len()])
    }

    /// Parses `"BB ?? DD"`. Both `?` and `??` are wildcards.
    pub fn from_hex(hex: &str) -> Result<Self, PatternError> {
        let mut signature = Vec::new();
        let mut mask = Vec::new();

        for part in hex.split_whitespace() {
            if part == "??" || part == "?" {
                signature.push(0);
                mask.push(0);
                continue;
            }

            let byte = u8::from_str_radix(part, 16)
                .map_err(|_| PatternError::InvalidToken(part.to_string()))?;
            signature.push(byte);
            mask.push(0xFF);
        }

        Self::new(signature, mask)
    }

    pub fn with_index(mut self, index: usize) -> Self {
        self.index = index;
        self
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    pub fn mask(&self) -> &[u8] {
        &self.mask
    }

    pub fn len(&self) -> usize {
        self.signature.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signature.is_empty()
    }

    /// True when `data` starts with bytes satisfying every constrained offset.
    pub fn matches(&self, data: &[u8]) -> bool {
        if data.len() < self.signature.len() {
            return false;
        }

        self.signature.iter()
            .zip(self.mask.iter())
            .zip(data.iter())
            .all(|((&expected, &m), &actual)| m == 0 || expected == actual)
    }

    /// Lowest offset in `data` where the pattern matches.
    pub fn find_in(&self, data: &[u8]) -> Option<usize> {
        let last = data.len().checked_sub(self.signature.len())?;

        let anchor = match self.anchor {
            Some(anchor) => anchor,
            None => return Some(0),
        };
        let anchor_byte = self.signature[anchor];

        (0..=last).find(|&i| data[i + anchor] == anchor_byte && self.matches(&data[i..]))
    }

    pub fn significant_byte_count(&self) -> usize {
        self.mask.iter().filter(|&&m| m != 0).count()
    }

    pub fn to_hex_string(&self) -> String {
        self.signature.iter()
            .zip(self.mask.iter())
            .map(|(b, &m)| {
                if m != 0 {
                    format!("{:02X}", b)
                } else {
                    "??".to_string()
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl FromStr for Pattern {
    type Err = PatternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}: {}", self.index, self.to_hex_string())
    }
}

pub struct PatternBuilder {
    signature: Vec<u8>,
    mask: Vec<u8>,
    index: usize,
}

impl PatternBuilder {
    pub fn new() -> Self {
        Self {
            signature: Vec::new(),
            mask: Vec::new(),
            index: 0,
        }
    }

    pub fn byte(mut self, b: u8) -> Self {
        self.signature.push(b);
        self.mask.push(0xFF);
        self
    }

    pub fn bytes(mut self, bs: &[u8]) -> Self {
        for &b in bs {
            self.signature.push(b);
            self.mask.push(0xFF);
        }
        self
    }

    pub fn wildcard(self) -> Self {
        self.wildcards(1)
    }

    pub fn wildcards(mut self, count: usize) -> Self {
        self.signature.extend(std::iter::repeat(0).take(count));
        self.mask.extend(std::iter::repeat(0).take(count));
        self
    }

    pub fn index(mut self, index: usize) -> Self {
        self.index = index;
        self
    }

    pub fn build(self) -> Result<Pattern, PatternError> {
        Pattern::new(self.signature, self.mask).map(|p| p.with_index(self.index))
    }
}

impl Default for PatternBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_hex_with_wildcards() {
        let pattern = Pattern::from_hex("BB ?? DD").unwrap();
        assert_eq!(pattern.signature(), &[0xBB, 0x00, 0xDD]);
        assert_eq!(pattern.mask(), &[0xFF, 0x00, 0xFF]);
        assert_eq!(pattern.to_hex_string(), "BB ?? DD");

        let single = Pattern::from_hex("bb ? dd").unwrap();
        assert_eq!(single.mask(), pattern.mask());
    }

    #[test]
    fn test_from_hex_rejects_garbage() {
        assert_eq!(Pattern::from_hex("BB ZZ"), Err(PatternError::InvalidToken("ZZ".to_string())));
        assert_eq!(Pattern::from_hex("   "), Err(PatternError::Empty));
    }

    #[test]
    fn test_new_rejects_mismatched_mask() {
        let err = Pattern::new(vec![1, 2, 3], vec![0xFF, 0xFF]).unwrap_err();
        assert_eq!(err, PatternError::MaskLengthMismatch { signature: 3, mask: 2 });
    }

    #[test]
    fn test_any_nonzero_mask_byte_is_significant() {
        let pattern = Pattern::new(vec![0xAA, 0xBB], vec![0x01, 0x80]).unwrap();
        assert!(pattern.matches(&[0xAA, 0xBB]));
        assert!(!pattern.matches(&[0xAA, 0xBC]));
    }

    #[test]
    fn test_find_in_returns_lowest_offset() {
        let pattern = Pattern::from_hex("BB ?? DD").unwrap();
        let data = [0xAA, 0xBB, 0xCC, 0xDD, 0xBB, 0x00, 0xDD];
        assert_eq!(pattern.find_in(&data), Some(1));
        assert_eq!(pattern.find_in(&data[2..]), Some(2));
    }

    #[test]
    fn test_find_in_respects_buffer_end() {
        let pattern = Pattern::from_hex("DD EE").unwrap();
        assert_eq!(pattern.find_in(&[0xAA, 0xDD]), None);
        assert_eq!(pattern.find_in(&[0xDD]), None);
    }

    #[test]
    fn test_all_wildcard_matches_at_zero() {
        let pattern = Pattern::new(vec![1, 2, 3], vec![0, 0, 0]).unwrap();
        assert_eq!(pattern.find_in(&[9, 9, 9, 9]), Some(0));
        assert_eq!(pattern.find_in(&[9, 9]), None);
    }

    #[test]
    fn test_builder() {
        let pattern = PatternBuilder::new()
            .byte(0x48)
            .wildcards(2)
            .bytes(&[0x89, 0x05])
            .index(7)
            .build()
            .unwrap();
        assert_eq!(pattern.index(), 7);
        assert_eq!(pattern.to_hex_string(), "48 ?? ?? 89 05");
        assert_eq!(pattern.significant_byte_count(), 3);
    }
}

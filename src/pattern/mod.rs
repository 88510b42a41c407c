// Tue Jan 13 2026 - Alex

pub mod error;
pub mod match_result;
pub mod pattern;
pub mod scanner;

pub use error::PatternError;
pub use match_result::PatternResult;
pub use pattern::{Pattern, PatternBuilder};
pub use scanner::PatternScanner;

use crate::memory::{Address, MemoryReader};

pub fn find_pattern(reader: &dyn MemoryReader, pattern: &Pattern) -> Option<Address> {
    PatternScanner::new().find_pattern(reader, pattern)
}

pub fn find_patterns(reader: &dyn MemoryReader, patterns: &[Pattern]) -> Vec<PatternResult> {
    PatternScanner::new().find_patterns(reader, patterns)
}

// Tue Jan 13 2026 - Alex

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PatternError {
    #[error("Pattern is empty")]
    Empty,
    #[error("Signature is {signature} bytes but mask is {mask} bytes")]
    MaskLengthMismatch { signature: usize, mask: usize },
    #[error("Invalid pattern token: {0}")]
    InvalidToken(String),
}

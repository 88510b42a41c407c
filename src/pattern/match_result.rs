// Tue Jan 13 2026 - Alex

use crate::memory::Address;
use serde::{Serialize, Serializer};

/// Where pattern `index` first matched during a batch scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PatternResult {
    pub index: usize,
    #[serde(serialize_with = "serialize_address")]
    pub address: Address,
}

impl PatternResult {
    pub fn new(index: usize, address: Address) -> Self {
        Self { index, address }
    }
}

fn serialize_address<S: Serializer>(address: &Address, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format!("{:#x}", address))
}

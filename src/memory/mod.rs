// Tue Jan 13 2026 - Alex

pub mod address;
pub mod error;
pub mod protection;
pub mod region;
pub mod snapshot;
pub mod traits;

pub use address::Address;
pub use error::MemoryError;
pub use protection::Protection;
pub use region::{MemoryRegion, RegionFilter};
pub use snapshot::SnapshotMemory;
pub use traits::{MemoryReader, Primitive, TypedReader};

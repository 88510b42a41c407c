// Wed Jan 15 2026 - Alex

use crate::memory::{Address, MemoryError, MemoryRegion};

/// Read access to some address space, normally another process.
///
/// Implementors supply the raw copy and the region snapshot; everything
/// else (buffer reads, typed reads, pattern scans) is built on those two.
pub trait MemoryReader: Send + Sync {
    /// Copies exactly `buf.len()` bytes starting at `addr`.
    ///
    /// A short copy must be reported as an error, never as success.
    fn read_raw(&self, addr: Address, buf: &mut [u8]) -> Result<(), MemoryError>;

    /// Readable and writable regions in ascending address order.
    fn regions(&self) -> Vec<MemoryRegion>;

    fn read_into(&self, addr: Address, buf: &mut [u8]) -> Result<(), MemoryError> {
        if buf.is_empty() {
            return Err(MemoryError::ZeroLengthRead);
        }
        self.read_raw(addr, buf)
    }

    fn read_bytes(&self, addr: Address, len: usize) -> Result<Vec<u8>, MemoryError> {
        if len == 0 {
            return Err(MemoryError::ZeroLengthRead);
        }
        let mut buffer = vec![0u8; len];
        self.read_raw(addr, &mut buffer)?;
        Ok(buffer)
    }
}

const MAX_PRIMITIVE_SIZE: usize = 8;

/// Fixed-width values that can be decoded from target memory.
///
/// Bytes are interpreted in the host's native order.
pub trait Primitive: Copy + Send + 'static {
    const SIZE: usize;

    fn from_ne_slice(bytes: &[u8]) -> Self;
}

macro_rules! impl_primitive {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Primitive for $ty {
                const SIZE: usize = std::mem::size_of::<$ty>();

                fn from_ne_slice(bytes: &[u8]) -> Self {
                    let mut raw = [0u8; std::mem::size_of::<$ty>()];
                    raw.copy_from_slice(&bytes[..Self::SIZE]);
                    <$ty>::from_ne_bytes(raw)
                }
            }
        )*
    };
}

impl_primitive!(i8, i16, i32, i64, u8, u16, u32, u64, f32, f64, usize);

macro_rules! typed_read {
    ($($name:ident => $ty:ty),* $(,)?) => {
        $(
            fn $name(&self, addr: Address) -> Result<$ty, MemoryError> {
                self.read::<$ty>(addr)
            }
        )*
    };
}

/// Typed reads on top of [`MemoryReader::read_into`].
pub trait TypedReader {
    fn read<T: Primitive>(&self, addr: Address) -> Result<T, MemoryError>;

    fn read_ptr(&self, addr: Address) -> Result<Address, MemoryError> {
        self.read::<usize>(addr).map(Address::new)
    }

    typed_read!(
        read_i8 => i8,
        read_i16 => i16,
        read_i32 => i32,
        read_i64 => i64,
        read_u8 => u8,
        read_u16 => u16,
        read_u32 => u32,
        read_u64 => u64,
        read_f32 => f32,
        read_f64 => f64,
    );
}

impl<R: MemoryReader + ?Sized> TypedReader for R {
    fn read<T: Primitive>(&self, addr: Address) -> Result<T, MemoryError> {
        let mut raw = [0u8; MAX_PRIMITIVE_SIZE];
        let bytes = &mut raw[..T::SIZE];
        self.read_into(addr, bytes)?;
        Ok(T::from_ne_slice(bytes))
    }
}

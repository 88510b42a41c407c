// Tue Jan 13 2026 - Alex

use goblin::mach::MultiArch;
use goblin::pe::header::{Header as PeHeader, COFF_MACHINE_ARM64, COFF_MACHINE_X86_64};
use goblin::pe::optional_header::MAGIC_64;
use goblin::Hint;
use serde::Serialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Only the start of an executable is read; headers of ELF, Mach-O (thin or
/// universal) and PE images all fit well within it.
const HEADER_PROBE_SIZE: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Bitness {
    Bit32,
    Bit64,
}

impl Bitness {
    fn from_is_64(is_64: bool) -> Self {
        if is_64 { Self::Bit64 } else { Self::Bit32 }
    }
}

pub fn classify_file(path: &Path) -> Option<Bitness> {
    let file = File::open(path).ok()?;
    let mut header = Vec::with_capacity(HEADER_PROBE_SIZE);
    file.take(HEADER_PROBE_SIZE as u64).read_to_end(&mut header).ok()?;
    classify_header(&header)
}

/// Classifies an executable from its leading bytes. For universal Mach-O
/// binaries the first architecture slice decides.
pub fn classify_header(bytes: &[u8]) -> Option<Bitness> {
    let ident: &[u8; 16] = bytes.get(..16)?.try_into().ok()?;

    match goblin::peek_bytes(ident).ok()? {
        Hint::Elf(hint) | Hint::Mach(hint) => hint.is_64.map(Bitness::from_is_64),
        Hint::MachFat(_) => {
            let multi = MultiArch::new(bytes).ok()?;
            let arch = multi.iter_arches().next()?.ok()?;
            Some(Bitness::from_is_64(arch.is_64()))
        }
        Hint::PE => {
            let header = PeHeader::parse(bytes).ok()?;
            let is_64 = match header.optional_header {
                Some(optional) => optional.standard_fields.magic == MAGIC_64,
                None => matches!(header.coff_header.machine, COFF_MACHINE_X86_64 | COFF_MACHINE_ARM64),
            };
            Some(Bitness::from_is_64(is_64))
        }
        _ => None,
    }
}

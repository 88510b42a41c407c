// Tue Jan 13 2026 - Alex

use procmem_scanner::memory::{Protection, RegionFilter};
use procmem_scanner::orchestration::ScanState;
use procmem_scanner::{
    Address, MemoryReader, Pattern, PatternScanner, ScanConfig, ScanCoordinator, ScanStart, SnapshotMemory,
    TypedReader,
};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

fn target() -> SnapshotMemory {
    let mut heap = vec![0u8; 0x200];
    heap[0x40..0x48].copy_from_slice(&[0x48, 0x8B, 0x05, 0x11, 0x22, 0x33, 0x44, 0x90]);
    heap[0x100..0x104].copy_from_slice(&1337u32.to_ne_bytes());

    SnapshotMemory::new()
        .with_protected_region(0x1000, vec![0x48, 0x8B, 0x05, 0x00, 0x00, 0x00, 0x00, 0x90], Protection::READ)
        .with_region(0x4000, heap)
        .with_unreadable_region(0x8000, 0x100)
        .with_region(0x9000, vec![0xDE, 0xAD, 0xBE, 0xEF])
}

#[test]
fn test_read_only_regions_are_not_scanned() {
    let memory = target();
    let pattern = Pattern::from_hex("48 8B 05 ?? ?? ?? ?? 90").unwrap();

    assert_eq!(
        PatternScanner::new().find_pattern(&memory, &pattern),
        Some(Address::new(0x4040))
    );
}

#[test]
fn test_batch_skips_unreadable_and_keeps_order() {
    let memory = target();
    let patterns = vec![
        Pattern::from_hex("DE AD BE EF").unwrap().with_index(0),
        Pattern::from_hex("01 02 03 04 05").unwrap().with_index(1),
        Pattern::from_hex("48 8B 05").unwrap().with_index(2),
    ];

    let results = PatternScanner::new().find_patterns(&memory, &patterns);
    let found: Vec<(usize, Address)> = results.iter().map(|r| (r.index, r.address)).collect();
    assert_eq!(found, vec![(2, Address::new(0x4040)), (0, Address::new(0x9000))]);

    let sequential = PatternScanner::new().use_parallel(false).find_patterns(&memory, &patterns);
    assert_eq!(sequential, results);
}

#[test]
fn test_typed_reads() {
    let memory = target();
    assert_eq!(memory.read_u32(Address::new(0x4100)).unwrap(), 1337);
    assert_eq!(memory.read_u8(Address::new(0x9001)).unwrap(), 0xAD);
    assert!(memory.read_u32(Address::new(0x8000)).is_err());
    assert!(memory.read_u64(Address::new(0x9000)).is_err());
}

#[test]
fn test_size_cap_from_config() {
    let config = ScanConfig::new().with_max_region_size(0x10);
    let memory = target().with_filter(config.region_filter());
    assert!(memory.regions().iter().all(|r| r.size() <= 0x10));

    let pattern = Pattern::from_hex("48 8B 05").unwrap();
    assert_eq!(PatternScanner::from_config(&config).find_pattern(&memory, &pattern), None);
    assert_eq!(RegionFilter::default().max_size, None);
}

#[test]
fn test_background_scan_uses_config_chunking() {
    let config = ScanConfig::new().with_chunk_size(3).with_max_region_size(0x200);
    let coordinator = ScanCoordinator::with_config(config.clone());
    let memory: Arc<dyn MemoryReader> = Arc::new(target().with_filter(config.region_filter()));

    let ScanStart::Started(pending) = coordinator
        .start_background_scan(memory, Pattern::from_hex("48 8B 05 ?? ?? ?? ?? 90").unwrap(), |_| {})
        .unwrap()
    else {
        panic!("scan should start");
    };
    assert_eq!(pending.wait().unwrap(), Some(Address::new(0x4040)));
}

#[test]
fn test_background_scan_chain() {
    let coordinator = ScanCoordinator::with_config(ScanConfig::new().with_worker_name("chain-test"));
    let memory: Arc<dyn MemoryReader> = Arc::new(target());
    let (tx, rx) = mpsc::channel();

    let next = coordinator.clone();
    let next_memory = Arc::clone(&memory);
    let start = coordinator
        .start_background_scan(Arc::clone(&memory), Pattern::from_hex("DE AD").unwrap(), move |first| {
            let tx_inner = tx.clone();
            let second = next.start_background_scan(
                next_memory,
                Pattern::from_hex("BE EF").unwrap(),
                move |second| {
                    let _ = tx_inner.send((first, second));
                },
            );
            assert!(matches!(second, Ok(ScanStart::Started(_))));
        })
        .unwrap();
    assert!(start.is_started());

    let (first, second) = rx.recv_timeout(Duration::from_secs(10)).unwrap();
    assert_eq!(first, Some(Address::new(0x9000)));
    assert_eq!(second, Some(Address::new(0x9002)));

    assert_eq!(coordinator.state(), ScanState::Idle);
}

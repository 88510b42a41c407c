// Tue Jan 13 2026 - Alex

use crate::config::ScanConfig;
use crate::memory::{Address, MemoryReader};
use crate::orchestration::PendingScan;
use crate::pattern::{Pattern, PatternScanner};
use log::{debug, error, info};
use parking_lot::Mutex;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Idle,
    Scanning,
}

#[derive(Debug)]
pub enum ScanStart {
    Started(PendingScan),
    /// A scan was already running; the request and its callback were dropped.
    AlreadyScanning,
}

impl ScanStart {
    pub fn is_started(&self) -> bool {
        matches!(self, Self::Started(_))
    }
}

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Failed to spawn scan worker: {0}")]
    WorkerSpawn(#[from] std::io::Error),
    #[error("Scan worker exited without reporting a result")]
    WorkerLost,
}

/// Runs at most one pattern scan at a time on a worker thread.
///
/// Cloning yields another handle to the same coordinator, so a completion
/// callback can capture a clone and start the next scan.
#[derive(Clone)]
pub struct ScanCoordinator {
    state: Arc<Mutex<ScanState>>,
    config: Arc<ScanConfig>,
}

impl ScanCoordinator {
    pub fn new() -> Self {
        Self::with_config(ScanConfig::default())
    }

    /// Workers scan with `PatternScanner::from_config(&config)`. The config's
    /// region cap is not applied here; build the reader with
    /// `config.region_filter()` for that.
    pub fn with_config(config: ScanConfig) -> Self {
        Self {
            state: Arc::new(Mutex::new(ScanState::Idle)),
            config: Arc::new(config),
        }
    }

    pub fn state(&self) -> ScanState {
        *self.state.lock()
    }

    pub fn is_scanning(&self) -> bool {
        self.state() == ScanState::Scanning
    }

    /// Starts `pattern` against `reader` in the background.
    ///
    /// The check-and-set of the scanning flag is atomic, so concurrent callers
    /// get exactly one `Started`. The state is back to `Idle` by the time
    /// `on_complete` runs, which makes resubmitting from inside it legal.
    pub fn start_background_scan<F>(
        &self,
        reader: Arc<dyn MemoryReader>,
        pattern: Pattern,
        on_complete: F,
    ) -> Result<ScanStart, ScanError>
    where
        F: FnOnce(Option<Address>) + Send + 'static,
    {
        {
            let mut state = self.state.lock();
            if *state == ScanState::Scanning {
                debug!("Scan for pattern #{} dropped, another scan is running", pattern.index());
                return Ok(ScanStart::AlreadyScanning);
            }
            *state = ScanState::Scanning;
        }

        let (sender, receiver) = mpsc::channel();
        let state = Arc::clone(&self.state);
        let scanner = PatternScanner::from_config(&self.config);

        let spawned = thread::Builder::new()
            .name(self.config.worker_name.clone())
            .spawn(move || {
                let result = {
                    let _idle = IdleOnDrop(state);
                    scanner.find_pattern(reader.as_ref(), &pattern)
                };

                match result {
                    Some(addr) => info!("Pattern #{} found at {}", pattern.index(), addr),
                    None => info!("Pattern #{} not found", pattern.index()),
                }

                on_complete(result);
                let _ = sender.send(result);
            });

        match spawned {
            Ok(_) => Ok(ScanStart::Started(PendingScan::new(receiver))),
            Err(e) => {
                error!("Failed to spawn scan worker '{}': {}", self.config.worker_name, e);
                *self.state.lock() = ScanState::Idle;
                Err(ScanError::WorkerSpawn(e))
            }
        }
    }
}

impl Default for ScanCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

/// Returns the coordinator to `Idle` when the scan ends, including by panic.
struct IdleOnDrop(Arc<Mutex<ScanState>>);

impl Drop for IdleOnDrop {
    fn drop(&mut self) {
        *self.0.lock() = ScanState::Idle;
    }
}

// Tue Jan 13 2026 - Alex

use crate::memory::Address;
use crate::orchestration::ScanError;
use std::sync::mpsc::{Receiver, RecvTimeoutError, TryRecvError};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanPoll {
    Pending,
    Done(Option<Address>),
}

/// The outcome of a background scan, delivered once the worker finishes.
///
/// The completion callback always runs before the result becomes visible here.
#[derive(Debug)]
pub struct PendingScan {
    receiver: Receiver<Option<Address>>,
}

impl PendingScan {
    pub(crate) fn new(receiver: Receiver<Option<Address>>) -> Self {
        Self { receiver }
    }

    pub fn wait(self) -> Result<Option<Address>, ScanError> {
        self.receiver.recv().map_err(|_| ScanError::WorkerLost)
    }

    pub fn wait_timeout(&self, timeout: Duration) -> Result<ScanPoll, ScanError> {
        match self.receiver.recv_timeout(timeout) {
            Ok(result) => Ok(ScanPoll::Done(result)),
            Err(RecvTimeoutError::Timeout) => Ok(ScanPoll::Pending),
            Err(RecvTimeoutError::Disconnected) => Err(ScanError::WorkerLost),
        }
    }

    pub fn try_result(&self) -> Result<ScanPoll, ScanError> {
        match self.receiver.try_recv() {
            Ok(result) => Ok(ScanPoll::Done(result)),
            Err(TryRecvError::Empty) => Ok(ScanPoll::Pending),
            Err(TryRecvError::Disconnected) => Err(ScanError::WorkerLost),
        }
    }
}

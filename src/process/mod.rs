// Tue Jan 13 2026 - Alex

//! Per-OS process access behind one capability set.
//!
//! Exactly one of `linux`, `macos` or `windows` is compiled in. Each
//! provides a `ProcessHandle` implementing [`TargetProcess`] and a
//! `Platform` implementing [`ProcessDirectory`]; everything above this
//! module is written against the traits only.

pub mod binary;

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "linux")]
pub use linux::{Platform, ProcessHandle, PRIVILEGE_HINT};

#[cfg(target_os = "macos")]
mod macos;
#[cfg(target_os = "macos")]
pub use macos::{Platform, ProcessHandle, PRIVILEGE_HINT};

#[cfg(target_os = "windows")]
mod windows;
#[cfg(target_os = "windows")]
pub use self::windows::{Platform, ProcessHandle, PRIVILEGE_HINT};

#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
compile_error!("procmem-scanner supports Linux, macOS and Windows only");

pub use binary::Bitness;

use crate::memory::MemoryReader;
use serde::Serialize;
use std::path::PathBuf;

pub type ProcessId = u32;

/// One entry of a process listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessInfo {
    pub pid: ProcessId,
    pub name: String,
    pub parent_pid: ProcessId,
    /// Windows base priority class, Linux scheduler priority, macOS nice.
    pub priority: i32,
}

/// An opened target process.
///
/// A handle can be invalid (the id did not exist or access was refused).
/// Invalid handles report no regions and fail every read with
/// `MemoryError::InvalidHandle`. The handle is owned by whoever opened it and
/// closes on drop.
pub trait TargetProcess: MemoryReader + Sized {
    fn open(pid: ProcessId) -> Self;

    fn pid(&self) -> ProcessId;

    fn is_valid(&self) -> bool;

    /// Re-checked on every call.
    fn is_alive(&self) -> bool;

    /// Empty on failure.
    fn path(&self) -> String;

    /// Empty on failure.
    fn command_line(&self) -> String;

    /// Empty on failure.
    fn working_directory(&self) -> String;

    fn close(self) {
        drop(self);
    }
}

/// System-wide process queries.
pub trait ProcessDirectory {
    fn list_processes() -> Vec<ProcessInfo>;

    fn executable_path(pid: ProcessId) -> Option<PathBuf>;

    fn foreground_process() -> Option<ProcessId>;

    /// Ids whose executable name contains any of `names` (case-sensitive).
    fn find_processes(names: &[&str]) -> Vec<ProcessId> {
        Self::list_processes()
            .into_iter()
            .filter(|p| names.iter().any(|n| p.name.contains(n)))
            .map(|p| p.pid)
            .collect()
    }

    fn is_64bit(pid: ProcessId) -> bool {
        Self::executable_path(pid)
            .and_then(|path| binary::classify_file(&path))
            .map_or(false, |bitness| bitness == Bitness::Bit64)
    }
}

pub fn open_process(pid: ProcessId) -> ProcessHandle {
    ProcessHandle::open(pid)
}

pub fn list_processes() -> Vec<ProcessInfo> {
    Platform::list_processes()
}

pub fn find_processes(names: &[&str]) -> Vec<ProcessId> {
    Platform::find_processes(names)
}

pub fn is_64bit(pid: ProcessId) -> bool {
    Platform::is_64bit(pid)
}

pub fn foreground_process() -> Option<ProcessId> {
    Platform::foreground_process()
}

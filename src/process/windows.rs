// Tue Jan 13 2026 - Alex

use crate::memory::{Address, MemoryError, MemoryReader, MemoryRegion, Protection, RegionFilter};
use crate::process::{ProcessDirectory, ProcessId, ProcessInfo, TargetProcess};
use log::{debug, warn};
use std::ffi::c_void;
use std::mem;
use std::path::PathBuf;
use windows::core::PWSTR;
use windows::Wdk::System::Threading::{NtQueryInformationProcess, ProcessBasicInformation};
use windows::Win32::Foundation::{CloseHandle, ERROR_ACCESS_DENIED, HANDLE, HWND};
use windows::Win32::System::Diagnostics::Debug::ReadProcessMemory;
use windows::Win32::System::Diagnostics::ToolHelp::{
    CreateToolhelp32Snapshot, Process32FirstW, Process32NextW, PROCESSENTRY32W, TH32CS_SNAPPROCESS,
};
use windows::Win32::System::Memory::{
    VirtualQueryEx, MEMORY_BASIC_INFORMATION, MEM_COMMIT, PAGE_EXECUTE, PAGE_EXECUTE_READ,
    PAGE_EXECUTE_READWRITE, PAGE_EXECUTE_WRITECOPY, PAGE_GUARD, PAGE_READONLY, PAGE_READWRITE,
    PAGE_WRITECOPY,
};
use windows::Win32::System::Threading::{
    GetExitCodeProcess, OpenProcess, QueryFullProcessImageNameW, PEB, PROCESS_BASIC_INFORMATION,
    PROCESS_NAME_WIN32, PROCESS_QUERY_INFORMATION, PROCESS_QUERY_LIMITED_INFORMATION,
    PROCESS_VM_READ, RTL_USER_PROCESS_PARAMETERS,
};
use windows::Win32::UI::WindowsAndMessaging::{GetForegroundWindow, GetWindowThreadProcessId};

pub const PRIVILEGE_HINT: &str = "Run from an elevated (Administrator) prompt";

const STILL_ACTIVE: u32 = 259;
const MAX_IMAGE_PATH: usize = 1024;

pub struct Platform;

/// Handle backed by `OpenProcess(PROCESS_QUERY_INFORMATION | PROCESS_VM_READ)`.
pub struct ProcessHandle {
    pid: ProcessId,
    handle: Option<HANDLE>,
    filter: RegionFilter,
}

// SAFETY: the kernel handle is only used for queries and reads, which the OS
// allows from any thread; it is closed exactly once in Drop.
unsafe impl Send for ProcessHandle {}
unsafe impl Sync for ProcessHandle {}

impl ProcessHandle {
    pub fn with_region_filter(mut self, filter: RegionFilter) -> Self {
        self.filter = filter;
        self
    }

    fn handle(&self) -> Result<HANDLE, MemoryError> {
        self.handle.ok_or(MemoryError::InvalidHandle)
    }

    fn read_struct<T: Copy + Default>(&self, addr: Address) -> Option<T> {
        let mut value = T::default();
        // SAFETY: T is a plain FFI struct; any byte pattern the target holds is
        // acceptable and the slice covers exactly its storage.
        let bytes = unsafe {
            std::slice::from_raw_parts_mut(&mut value as *mut T as *mut u8, mem::size_of::<T>())
        };
        self.read_into(addr, bytes).ok()?;
        Some(value)
    }

    /// Walks PEB -> RTL_USER_PROCESS_PARAMETERS -> CommandLine in the target.
    fn read_command_line(&self) -> Option<String> {
        let handle = self.handle.as_ref()?;

        let mut basic = PROCESS_BASIC_INFORMATION::default();
        let mut returned = 0u32;
        let status = unsafe {
            NtQueryInformationProcess(
                *handle,
                ProcessBasicInformation,
                &mut basic as *mut _ as *mut c_void,
                mem::size_of::<PROCESS_BASIC_INFORMATION>() as u32,
                &mut returned,
            )
        };
        if status.is_err() || basic.PebBaseAddress.is_null() {
            return None;
        }

        let peb: PEB = self.read_struct(Address::new(basic.PebBaseAddress as usize))?;
        let params: RTL_USER_PROCESS_PARAMETERS =
            self.read_struct(Address::new(peb.ProcessParameters as usize))?;

        let command_line = params.CommandLine;
        let len = command_line.Length as usize;
        if len == 0 || command_line.Buffer.is_null() {
            return None;
        }

        let raw = self.read_bytes(Address::new(command_line.Buffer.0 as usize), len).ok()?;
        let wide: Vec<u16> = raw
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        Some(String::from_utf16_lossy(&wide))
    }
}

impl Drop for ProcessHandle {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            unsafe {
                let _ = CloseHandle(handle);
            }
        }
    }
}

impl TargetProcess for ProcessHandle {
    fn open(pid: ProcessId) -> Self {
        let handle = match unsafe { OpenProcess(PROCESS_QUERY_INFORMATION | PROCESS_VM_READ, false, pid) } {
            Ok(handle) => Some(handle),
            Err(e) => {
                if e.code() == ERROR_ACCESS_DENIED.to_hresult() {
                    warn!("OpenProcess({}) was denied. {}", pid, PRIVILEGE_HINT);
                } else {
                    debug!("OpenProcess({}) failed: {}", pid, e);
                }
                None
            }
        };

        Self {
            pid,
            handle,
            filter: RegionFilter::default(),
        }
    }

    fn pid(&self) -> ProcessId {
        if self.handle.is_some() { self.pid } else { 0 }
    }

    fn is_valid(&self) -> bool {
        self.handle.is_some()
    }

    fn is_alive(&self) -> bool {
        let Some(handle) = self.handle else {
            return false;
        };
        let mut code = 0u32;
        unsafe { GetExitCodeProcess(handle, &mut code) }.is_ok() && code == STILL_ACTIVE
    }

    fn path(&self) -> String {
        self.handle
            .and_then(image_path)
            .map(|path| path.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    fn command_line(&self) -> String {
        self.read_command_line().unwrap_or_default()
    }

    /// Not reported on Windows.
    fn working_directory(&self) -> String {
        String::new()
    }
}

impl MemoryReader for ProcessHandle {
    fn read_raw(&self, addr: Address, buf: &mut [u8]) -> Result<(), MemoryError> {
        let handle = self.handle()?;
        let mut copied = 0usize;

        let result = unsafe {
            ReadProcessMemory(
                handle,
                addr.as_usize() as *const c_void,
                buf.as_mut_ptr() as *mut c_void,
                buf.len(),
                Some(&mut copied),
            )
        };

        if let Err(e) = result {
            if e.code() == ERROR_ACCESS_DENIED.to_hresult() {
                return Err(MemoryError::AccessDenied { address: addr, hint: PRIVILEGE_HINT });
            }
            if copied == 0 {
                debug!("ReadProcessMemory at {} failed: {}", addr, e);
                return Err(MemoryError::read_failed(addr, buf.len()));
            }
        }

        if copied != buf.len() {
            return Err(MemoryError::PartialRead {
                address: addr,
                expected: buf.len(),
                actual: copied,
            });
        }

        Ok(())
    }

    fn regions(&self) -> Vec<MemoryRegion> {
        let Ok(handle) = self.handle() else {
            return Vec::new();
        };

        let mut regions = Vec::new();
        let mut address = 0usize;

        loop {
            let mut info = MEMORY_BASIC_INFORMATION::default();
            let written = unsafe {
                VirtualQueryEx(
                    handle,
                    Some(address as *const c_void),
                    &mut info,
                    mem::size_of::<MEMORY_BASIC_INFORMATION>(),
                )
            };
            if written == 0 {
                break;
            }

            if info.State == MEM_COMMIT {
                regions.push(MemoryRegion::new(
                    Address::new(info.BaseAddress as usize),
                    info.RegionSize,
                    protection_from_page_flags(info.Protect.0),
                ));
            }

            match (info.BaseAddress as usize).checked_add(info.RegionSize) {
                Some(next) if next > address => address = next,
                _ => break,
            }
        }

        self.filter.apply(regions)
    }
}

impl ProcessDirectory for Platform {
    fn list_processes() -> Vec<ProcessInfo> {
        let snapshot = match unsafe { CreateToolhelp32Snapshot(TH32CS_SNAPPROCESS, 0) } {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("CreateToolhelp32Snapshot failed: {}", e);
                return Vec::new();
            }
        };

        let mut processes = Vec::new();
        let mut entry = PROCESSENTRY32W {
            dwSize: mem::size_of::<PROCESSENTRY32W>() as u32,
            ..Default::default()
        };

        let mut next = unsafe { Process32FirstW(snapshot, &mut entry) };
        while next.is_ok() {
            processes.push(ProcessInfo {
                pid: entry.th32ProcessID,
                name: wide_to_string(&entry.szExeFile),
                parent_pid: entry.th32ParentProcessID,
                priority: entry.pcPriClassBase,
            });
            next = unsafe { Process32NextW(snapshot, &mut entry) };
        }

        unsafe {
            let _ = CloseHandle(snapshot);
        }
        processes
    }

    fn executable_path(pid: ProcessId) -> Option<PathBuf> {
        let handle = unsafe { OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, false, pid) }.ok()?;
        let path = image_path(handle);
        unsafe {
            let _ = CloseHandle(handle);
        }
        path
    }

    fn foreground_process() -> Option<ProcessId> {
        let window: HWND = unsafe { GetForegroundWindow() };
        if window.0.is_null() {
            return None;
        }

        let mut pid = 0u32;
        unsafe { GetWindowThreadProcessId(window, Some(&mut pid)) };
        (pid != 0).then_some(pid)
    }
}

fn image_path(handle: HANDLE) -> Option<PathBuf> {
    let mut buffer = vec![0u16; MAX_IMAGE_PATH];
    let mut len = buffer.len() as u32;
    unsafe {
        QueryFullProcessImageNameW(handle, PROCESS_NAME_WIN32, PWSTR(buffer.as_mut_ptr()), &mut len)
    }
    .ok()?;
    buffer.truncate(len as usize);
    Some(PathBuf::from(String::from_utf16_lossy(&buffer)))
}

fn wide_to_string(wide: &[u16]) -> String {
    let len = wide.iter().position(|&c| c == 0).unwrap_or(wide.len());
    String::from_utf16_lossy(&wide[..len])
}

/// Copy-on-write pages count as writable.
fn protection_from_page_flags(flags: u32) -> Protection {
    let readable = PAGE_READONLY.0
        | PAGE_READWRITE.0
        | PAGE_WRITECOPY.0
        | PAGE_EXECUTE_READ.0
        | PAGE_EXECUTE_READWRITE.0
        | PAGE_EXECUTE_WRITECOPY.0;
    let writable = PAGE_READWRITE.0 | PAGE_WRITECOPY.0 | PAGE_EXECUTE_READWRITE.0 | PAGE_EXECUTE_WRITECOPY.0;
    let executable = PAGE_EXECUTE.0 | PAGE_EXECUTE_READ.0 | PAGE_EXECUTE_READWRITE.0 | PAGE_EXECUTE_WRITECOPY.0;

    let mut protection = Protection::empty();
    protection.set(Protection::READ, flags & readable != 0);
    protection.set(Protection::WRITE, flags & writable != 0);
    protection.set(Protection::EXECUTE, flags & executable != 0);
    protection.set(Protection::GUARD, flags & PAGE_GUARD.0 != 0);
    protection
}

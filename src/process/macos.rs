// Tue Jan 13 2026 - Alex

use crate::memory::{Address, MemoryError, MemoryReader, MemoryRegion, Protection, RegionFilter};
use crate::process::{ProcessDirectory, ProcessId, ProcessInfo, TargetProcess};
use crate::utils::c_buffer_to_string;
use libc::{c_char, c_int, c_uint, c_void, pid_t};
use log::{debug, warn};
use std::io;
use std::mem;
use std::path::PathBuf;
use std::ptr;

pub const PRIVILEGE_HINT: &str =
    "Run with sudo, or grant Developer Tools access to the terminal (System Settings > Privacy & Security)";

#[allow(non_camel_case_types)]
type mach_port_t = c_uint;
#[allow(non_camel_case_types)]
type kern_return_t = c_int;
#[allow(non_camel_case_types)]
type mach_vm_address_t = u64;
#[allow(non_camel_case_types)]
type mach_vm_size_t = u64;
#[allow(non_camel_case_types)]
type vm_prot_t = c_int;
#[allow(non_camel_case_types)]
type vm_region_flavor_t = c_int;
#[allow(non_camel_case_types)]
type mach_msg_type_number_t = c_uint;

const KERN_SUCCESS: kern_return_t = 0;
const VM_REGION_BASIC_INFO_64: vm_region_flavor_t = 9;
const VM_REGION_BASIC_INFO_COUNT_64: mach_msg_type_number_t =
    (mem::size_of::<vm_region_basic_info_64>() / mem::size_of::<c_int>()) as mach_msg_type_number_t;

const PROC_ALL_PIDS: u32 = 1;
const PROC_PIDTBSDINFO: c_int = 3;
const PROC_PIDVNODEPATHINFO: c_int = 9;
const PROC_PIDPATHINFO_MAXSIZE: usize = 4096;
const MAXCOMLEN: usize = 16;
const MAXPATHLEN: usize = 1024;

#[allow(non_camel_case_types, dead_code)]
#[repr(C, packed(4))]
#[derive(Debug, Clone, Copy, Default)]
struct vm_region_basic_info_64 {
    protection: vm_prot_t,
    max_protection: vm_prot_t,
    inheritance: c_uint,
    shared: c_uint,
    reserved: c_uint,
    offset: u64,
    behavior: c_int,
    user_wired_count: u16,
}

#[allow(non_camel_case_types, dead_code)]
#[repr(C)]
#[derive(Clone, Copy)]
struct proc_bsdinfo {
    pbi_flags: u32,
    pbi_status: u32,
    pbi_xstatus: u32,
    pbi_pid: u32,
    pbi_ppid: u32,
    pbi_uid: u32,
    pbi_gid: u32,
    pbi_ruid: u32,
    pbi_rgid: u32,
    pbi_svuid: u32,
    pbi_svgid: u32,
    rfu_1: u32,
    pbi_comm: [c_char; MAXCOMLEN],
    pbi_name: [c_char; 2 * MAXCOMLEN],
    pbi_nfiles: u32,
    pbi_pgid: u32,
    pbi_pjobc: u32,
    e_tdev: u32,
    e_tpgid: u32,
    pbi_nice: i32,
    pbi_start_tvsec: u64,
    pbi_start_tvusec: u64,
}

/// `struct vnode_info` is opaque here; only its size matters.
#[allow(non_camel_case_types, dead_code)]
#[repr(C)]
#[derive(Clone, Copy)]
struct vnode_info_path {
    vip_vi: [u64; 19],
    vip_path: [c_char; MAXPATHLEN],
}

#[allow(non_camel_case_types, dead_code)]
#[repr(C)]
#[derive(Clone, Copy)]
struct proc_vnodepathinfo {
    pvi_cdir: vnode_info_path,
    pvi_rdir: vnode_info_path,
}

extern "C" {
    fn mach_task_self() -> mach_port_t;
    fn task_for_pid(target_task: mach_port_t, pid: c_int, task: *mut mach_port_t) -> kern_return_t;
    fn mach_port_deallocate(task: mach_port_t, name: mach_port_t) -> kern_return_t;
    fn mach_vm_read_overwrite(
        target_task: mach_port_t,
        address: mach_vm_address_t,
        size: mach_vm_size_t,
        data: mach_vm_address_t,
        out_size: *mut mach_vm_size_t,
    ) -> kern_return_t;
    fn mach_vm_region(
        target_task: mach_port_t,
        address: *mut mach_vm_address_t,
        size: *mut mach_vm_size_t,
        flavor: vm_region_flavor_t,
        info: *mut c_int,
        info_count: *mut mach_msg_type_number_t,
        object_name: *mut mach_port_t,
    ) -> kern_return_t;
    fn proc_listpids(type_: u32, typeinfo: u32, buffer: *mut c_void, buffersize: c_int) -> c_int;
    fn proc_pidpath(pid: c_int, buffer: *mut c_void, buffersize: u32) -> c_int;
    fn proc_pidinfo(pid: c_int, flavor: c_int, arg: u64, buffer: *mut c_void, buffersize: c_int) -> c_int;
}

pub struct Platform;

/// Handle backed by a Mach task port.
///
/// Without a task port (no privilege) the handle stays valid for metadata
/// queries but reports no regions and fails reads with `AccessDenied`.
pub struct ProcessHandle {
    pid: Option<pid_t>,
    task: Option<mach_port_t>,
    filter: RegionFilter,
}

impl ProcessHandle {
    pub fn with_region_filter(mut self, filter: RegionFilter) -> Self {
        self.filter = filter;
        self
    }

    fn task(&self) -> Result<mach_port_t, MemoryError> {
        if self.pid.is_none() {
            return Err(MemoryError::InvalidHandle);
        }
        self.task.ok_or(MemoryError::AccessDenied {
            address: Address::zero(),
            hint: PRIVILEGE_HINT,
        })
    }
}

impl Drop for ProcessHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            unsafe {
                mach_port_deallocate(mach_task_self(), task);
            }
        }
    }
}

impl TargetProcess for ProcessHandle {
    fn open(pid: ProcessId) -> Self {
        let mut handle = Self {
            pid: None,
            task: None,
            filter: RegionFilter::default(),
        };

        let Some(pid) = pid_t::try_from(pid).ok().filter(|&p| p > 0 && pid_exists(p)) else {
            debug!("Process {} does not exist", pid);
            return handle;
        };
        handle.pid = Some(pid);

        let mut task: mach_port_t = 0;
        let result = unsafe { task_for_pid(mach_task_self(), pid, &mut task) };
        if result == KERN_SUCCESS {
            handle.task = Some(task);
        } else {
            warn!("task_for_pid({}) failed with {}. {}", pid, result, PRIVILEGE_HINT);
        }

        handle
    }

    fn pid(&self) -> ProcessId {
        self.pid.map_or(0, |p| p as ProcessId)
    }

    fn is_valid(&self) -> bool {
        self.pid.is_some()
    }

    fn is_alive(&self) -> bool {
        self.pid.map_or(false, pid_exists)
    }

    fn path(&self) -> String {
        self.pid
            .and_then(|pid| Platform::executable_path(pid as ProcessId))
            .map(|path| path.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    fn command_line(&self) -> String {
        self.pid.and_then(procargs).unwrap_or_default()
    }

    fn working_directory(&self) -> String {
        let Some(pid) = self.pid else {
            return String::new();
        };

        let mut info: proc_vnodepathinfo = unsafe { mem::zeroed() };
        let size = mem::size_of::<proc_vnodepathinfo>() as c_int;
        let written = unsafe {
            proc_pidinfo(pid, PROC_PIDVNODEPATHINFO, 0, &mut info as *mut _ as *mut c_void, size)
        };
        if written != size {
            return String::new();
        }

        let path: Vec<u8> = info.pvi_cdir.vip_path.iter().map(|&c| c as u8).collect();
        c_buffer_to_string(&path)
    }
}

impl MemoryReader for ProcessHandle {
    fn read_raw(&self, addr: Address, buf: &mut [u8]) -> Result<(), MemoryError> {
        let task = self.task().map_err(|e| match e {
            MemoryError::AccessDenied { hint, .. } => MemoryError::AccessDenied { address: addr, hint },
            other => other,
        })?;

        let mut out_size: mach_vm_size_t = 0;
        let result = unsafe {
            mach_vm_read_overwrite(
                task,
                addr.as_u64(),
                buf.len() as mach_vm_size_t,
                buf.as_mut_ptr() as mach_vm_address_t,
                &mut out_size,
            )
        };

        if result != KERN_SUCCESS {
            debug!("mach_vm_read_overwrite at {} failed with {}", addr, result);
            return Err(MemoryError::read_failed(addr, buf.len()));
        }

        if out_size as usize != buf.len() {
            return Err(MemoryError::PartialRead {
                address: addr,
                expected: buf.len(),
                actual: out_size as usize,
            });
        }

        Ok(())
    }

    fn regions(&self) -> Vec<MemoryRegion> {
        let Ok(task) = self.task() else {
            return Vec::new();
        };

        let mut regions = Vec::new();
        let mut address: mach_vm_address_t = 0;

        loop {
            let mut size: mach_vm_size_t = 0;
            let mut info = vm_region_basic_info_64::default();
            let mut count = VM_REGION_BASIC_INFO_COUNT_64;
            let mut object_name: mach_port_t = 0;

            let result = unsafe {
                mach_vm_region(
                    task,
                    &mut address,
                    &mut size,
                    VM_REGION_BASIC_INFO_64,
                    &mut info as *mut _ as *mut c_int,
                    &mut count,
                    &mut object_name,
                )
            };

            if result != KERN_SUCCESS {
                break;
            }

            let protection = info.protection;
            regions.push(MemoryRegion::new(
                Address::new(address as usize),
                size as usize,
                Protection::from_vm_prot(protection),
            ));

            match address.checked_add(size) {
                Some(next) => address = next,
                None => break,
            }
        }

        self.filter.apply(regions)
    }
}

impl ProcessDirectory for Platform {
    fn list_processes() -> Vec<ProcessInfo> {
        let needed = unsafe { proc_listpids(PROC_ALL_PIDS, 0, ptr::null_mut(), 0) };
        if needed <= 0 {
            warn!("proc_listpids failed: {}", io::Error::last_os_error());
            return Vec::new();
        }

        // Headroom for processes spawned between the two calls.
        let capacity = needed as usize / mem::size_of::<pid_t>() + 64;
        let mut pids: Vec<pid_t> = vec![0; capacity];
        let written = unsafe {
            proc_listpids(
                PROC_ALL_PIDS,
                0,
                pids.as_mut_ptr() as *mut c_void,
                (pids.len() * mem::size_of::<pid_t>()) as c_int,
            )
        };
        if written <= 0 {
            return Vec::new();
        }
        pids.truncate(written as usize / mem::size_of::<pid_t>());

        let mut processes: Vec<ProcessInfo> = pids
            .into_iter()
            .filter(|&pid| pid > 0)
            .filter_map(bsd_info)
            .collect();
        processes.sort_by_key(|p| p.pid);
        processes
    }

    fn executable_path(pid: ProcessId) -> Option<PathBuf> {
        let pid = c_int::try_from(pid).ok()?;
        let mut buffer = vec![0u8; PROC_PIDPATHINFO_MAXSIZE];
        let len = unsafe {
            proc_pidpath(pid, buffer.as_mut_ptr() as *mut c_void, buffer.len() as u32)
        };
        if len <= 0 {
            return None;
        }
        buffer.truncate(len as usize);
        Some(PathBuf::from(String::from_utf8_lossy(&buffer).into_owned()))
    }

    fn foreground_process() -> Option<ProcessId> {
        None
    }
}

fn pid_exists(pid: pid_t) -> bool {
    if unsafe { libc::kill(pid, 0) } == 0 {
        return true;
    }
    io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
}

fn bsd_info(pid: pid_t) -> Option<ProcessInfo> {
    let mut info: proc_bsdinfo = unsafe { mem::zeroed() };
    let size = mem::size_of::<proc_bsdinfo>() as c_int;
    let written = unsafe {
        proc_pidinfo(pid, PROC_PIDTBSDINFO, 0, &mut info as *mut _ as *mut c_void, size)
    };
    if written != size {
        return None;
    }

    let comm: Vec<u8> = info.pbi_comm.iter().map(|&c| c as u8).collect();
    Some(ProcessInfo {
        pid: pid as ProcessId,
        name: c_buffer_to_string(&comm),
        parent_pid: info.pbi_ppid,
        priority: info.pbi_nice,
    })
}

/// Reads the target's argument vector through `KERN_PROCARGS2`.
fn procargs(pid: pid_t) -> Option<String> {
    let mut mib = [libc::CTL_KERN, libc::KERN_ARGMAX, 0];
    let mut argmax: c_int = 0;
    let mut len = mem::size_of::<c_int>();
    let rc = unsafe {
        libc::sysctl(mib.as_mut_ptr(), 2, &mut argmax as *mut _ as *mut c_void, &mut len, ptr::null_mut(), 0)
    };
    if rc != 0 || argmax <= 0 {
        return None;
    }

    mib = [libc::CTL_KERN, libc::KERN_PROCARGS2, pid];
    let mut buffer = vec![0u8; argmax as usize];
    let mut len = buffer.len();
    let rc = unsafe {
        libc::sysctl(mib.as_mut_ptr(), 3, buffer.as_mut_ptr() as *mut c_void, &mut len, ptr::null_mut(), 0)
    };
    if rc != 0 {
        debug!("KERN_PROCARGS2 for {} failed: {}", pid, io::Error::last_os_error());
        return None;
    }
    buffer.truncate(len);

    parse_procargs(&buffer)
}

/// Layout: argc (i32), exec path, NUL padding, then argc NUL-terminated args.
fn parse_procargs(buffer: &[u8]) -> Option<String> {
    let argc = i32::from_ne_bytes(buffer.get(..4)?.try_into().ok()?);
    let rest = &buffer[4..];

    let exec_end = rest.iter().position(|&b| b == 0)?;
    let args_start = exec_end + rest[exec_end..].iter().position(|&b| b != 0)?;

    let args: Vec<String> = rest[args_start..]
        .split(|&b| b == 0)
        .take(argc.max(0) as usize)
        .map(|arg| String::from_utf8_lossy(arg).into_owned())
        .collect();

    Some(args.join(" "))
}

// Tue Jan 13 2026 - Alex

use crate::memory::{Address, MemoryError, MemoryReader, MemoryRegion, Protection, RegionFilter};
use crate::process::{ProcessDirectory, ProcessId, ProcessInfo, TargetProcess};
use libc::{c_void, iovec, pid_t};
use log::{debug, warn};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

pub const PRIVILEGE_HINT: &str =
    "Run with sudo, or grant ptrace access: sudo setcap cap_sys_ptrace=eip <binary>";

pub struct Platform;

/// Handle backed by `/proc/<pid>` and `process_vm_readv`.
pub struct ProcessHandle {
    pid: Option<pid_t>,
    filter: RegionFilter,
    warned: AtomicBool,
}

impl ProcessHandle {
    pub fn with_region_filter(mut self, filter: RegionFilter) -> Self {
        self.filter = filter;
        self
    }

    fn proc_entry(&self, entry: &str) -> Option<PathBuf> {
        self.pid.map(|pid| proc_dir(pid).join(entry))
    }

    fn warn_access_denied(&self, what: &str) {
        if !self.warned.swap(true, Ordering::Relaxed) {
            warn!("Access denied {} for pid {}. {}", what, self.pid(), PRIVILEGE_HINT);
        } else {
            debug!("Access denied {} for pid {}", what, self.pid());
        }
    }
}

impl TargetProcess for ProcessHandle {
    fn open(pid: ProcessId) -> Self {
        let valid = pid_t::try_from(pid)
            .ok()
            .filter(|&p| p > 0 && proc_dir(p).is_dir());

        if valid.is_none() {
            debug!("Process {} does not exist", pid);
        }

        Self {
            pid: valid,
            filter: RegionFilter::default(),
            warned: AtomicBool::new(false),
        }
    }

    fn pid(&self) -> ProcessId {
        self.pid.map_or(0, |p| p as ProcessId)
    }

    fn is_valid(&self) -> bool {
        self.pid.is_some()
    }

    fn is_alive(&self) -> bool {
        self.proc_entry("stat")
            .and_then(|path| fs::read_to_string(path).ok())
            .and_then(|stat| parse_stat(&stat))
            .map_or(false, |stat| stat.state != 'Z' && stat.state != 'X')
    }

    fn path(&self) -> String {
        self.proc_entry("exe")
            .and_then(|path| fs::read_link(path).ok())
            .map(|path| path.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    fn command_line(&self) -> String {
        self.proc_entry("cmdline")
            .and_then(|path| fs::read(path).ok())
            .map(|raw| join_cmdline(&raw))
            .unwrap_or_default()
    }

    fn working_directory(&self) -> String {
        self.proc_entry("cwd")
            .and_then(|path| fs::read_link(path).ok())
            .map(|path| path.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

impl MemoryReader for ProcessHandle {
    fn read_raw(&self, addr: Address, buf: &mut [u8]) -> Result<(), MemoryError> {
        let pid = self.pid.ok_or(MemoryError::InvalidHandle)?;

        let local = iovec {
            iov_base: buf.as_mut_ptr() as *mut c_void,
            iov_len: buf.len(),
        };
        let remote = iovec {
            iov_base: addr.as_usize() as *mut c_void,
            iov_len: buf.len(),
        };

        let copied = unsafe { libc::process_vm_readv(pid, &local, 1, &remote, 1, 0) };

        if copied < 0 {
            let err = io::Error::last_os_error();
            return match err.raw_os_error() {
                Some(libc::EPERM) => {
                    self.warn_access_denied("reading memory");
                    Err(MemoryError::AccessDenied { address: addr, hint: PRIVILEGE_HINT })
                }
                _ => {
                    debug!("process_vm_readv at {} failed: {}", addr, err);
                    Err(MemoryError::read_failed(addr, buf.len()))
                }
            };
        }

        let copied = copied as usize;
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
        let Some(path) = self.proc_entry("maps") else {
            return Vec::new();
        };

        match fs::read_to_string(&path) {
            Ok(maps) => self.filter.apply(parse_maps(&maps)),
            Err(e) => {
                if e.kind() == io::ErrorKind::PermissionDenied {
                    self.warn_access_denied("reading memory maps");
                } else {
                    debug!("Failed to read {}: {}", path.display(), e);
                }
                Vec::new()
            }
        }
    }
}

impl ProcessDirectory for Platform {
    fn list_processes() -> Vec<ProcessInfo> {
        let entries = match fs::read_dir("/proc") {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Failed to enumerate /proc: {}", e);
                return Vec::new();
            }
        };

        let mut processes: Vec<ProcessInfo> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().to_str()?.parse::<pid_t>().ok())
            .filter_map(|pid| {
                let dir = proc_dir(pid);
                let name = fs::read_to_string(dir.join("comm")).ok()?;
                let stat = fs::read_to_string(dir.join("stat")).ok().and_then(|s| parse_stat(&s));
                Some(ProcessInfo {
                    pid: pid as ProcessId,
                    name: name.trim_end_matches('\n').to_string(),
                    parent_pid: stat.as_ref().map_or(0, |s| s.ppid),
                    priority: stat.as_ref().map_or(0, |s| s.priority),
                })
            })
            .collect();

        processes.sort_by_key(|p| p.pid);
        processes
    }

    fn executable_path(pid: ProcessId) -> Option<PathBuf> {
        let pid = pid_t::try_from(pid).ok()?;
        fs::read_link(proc_dir(pid).join("exe")).ok()
    }

    fn foreground_process() -> Option<ProcessId> {
        None
    }
}

fn proc_dir(pid: pid_t) -> PathBuf {
    Path::new("/proc").join(pid.to_string())
}

/// Parses `/proc/<pid>/maps` lines of the form
/// `start-end perms offset dev inode [path]`.
pub(crate) fn parse_maps(contents: &str) -> Vec<MemoryRegion> {
    contents
        .lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let (start, end) = fields.next()?.split_once('-')?;
            let perms = fields.next()?;

            let start = usize::from_str_radix(start, 16).ok()?;
            let end = usize::from_str_radix(end, 16).ok()?;
            let size = end.checked_sub(start)?;

            Some(MemoryRegion::new(Address::new(start), size, Protection::from_maps_perms(perms)))
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct StatFields {
    pub state: char,
    pub ppid: ProcessId,
    pub priority: i32,
}

/// The command name in field 2 may contain spaces and parentheses, so fields
/// are counted from the last `)`.
pub(crate) fn parse_stat(contents: &str) -> Option<StatFields> {
    let rest = &contents[contents.rfind(')')? + 1..];
    let fields: Vec<&str> = rest.split_whitespace().collect();

    // fields[0] is field 3 (state); priority is field 18.
    Some(StatFields {
        state: fields.first()?.chars().next()?,
        ppid: fields.get(1)?.parse().ok()?,
        priority: fields.get(15)?.parse().ok()?,
    })
}

fn join_cmdline(raw: &[u8]) -> String {
    raw.split(|&b| b == 0)
        .filter(|arg| !arg.is_empty())
        .map(String::from_utf8_lossy)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::TypedReader;

    #[test]
    fn test_parse_maps() {
        let maps = "\
00400000-00452000 r-xp 00000000 08:02 173521      /usr/bin/dbus-daemon
00651000-00652000 rw-p 00051000 08:02 173521      /usr/bin/dbus-daemon
7ffd8e5a0000-7ffd8e5c1000 rw-p 00000000 00:00 0   [stack]
garbage line
";
        let regions = parse_maps(maps);
        assert_eq!(regions.len(), 3);
        assert_eq!(regions[1].base_address(), Address::new(0x651000));
        assert_eq!(regions[1].size(), 0x1000);
        assert!(regions[1].is_writable());
        assert!(!regions[0].is_writable());

        let filtered = RegionFilter::default().apply(regions);
        assert_eq!(filtered.len(), 2);
    }

    #[test]
    fn test_parse_stat_with_spaces_in_name() {
        let stat = "1234 (my (odd) proc) S 1 1234 1234 0 -1 4194560 100 0 0 0 1 2 0 0 20 0 1 0 100 1000 10";
        let fields = parse_stat(stat).unwrap();
        assert_eq!(fields.state, 'S');
        assert_eq!(fields.ppid, 1);
        assert_eq!(fields.priority, 20);
    }

    #[test]
    fn test_join_cmdline() {
        assert_eq!(join_cmdline(b"/bin/app\0--flag\0value\0"), "/bin/app --flag value");
        assert_eq!(join_cmdline(b""), "");
    }

    #[test]
    fn test_open_self() {
        let handle = ProcessHandle::open(std::process::id());
        assert!(handle.is_valid());
        assert!(handle.is_alive());
        assert_eq!(handle.pid(), std::process::id());
        assert!(!handle.path().is_empty());
        assert!(!handle.command_line().is_empty());
        assert!(!handle.working_directory().is_empty());
        assert!(!handle.regions().is_empty());
    }

    #[test]
    fn test_read_own_memory() {
        let value: u64 = 0xDEAD_BEEF_CAFE_F00D;
        let handle = ProcessHandle::open(std::process::id());
        let addr = Address::new(&value as *const u64 as usize);

        assert_eq!(handle.read_u64(addr).unwrap(), value);
        assert_eq!(handle.read_bytes(addr, 8).unwrap(), value.to_ne_bytes().to_vec());
    }

    #[test]
    fn test_read_across_unmapped_page_is_partial() {
        let page = unsafe { libc::sysconf(libc::_SC_PAGESIZE) } as usize;
        let base = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                page * 2,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
                -1,
                0,
            )
        };
        assert_ne!(base, libc::MAP_FAILED);
        let second = unsafe { (base as *mut u8).add(page) } as *mut c_void;
        assert_eq!(unsafe { libc::munmap(second, page) }, 0);

        let handle = ProcessHandle::open(std::process::id());
        let result = handle.read_bytes(Address::new(base as usize + page - 8), 16);
        unsafe { libc::munmap(base, page) };

        match result {
            Err(MemoryError::PartialRead { expected, actual, .. }) => {
                assert_eq!(expected, 16);
                assert_eq!(actual, 8);
            }
            other => panic!("expected a partial read, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_handle() {
        let handle = ProcessHandle::open(0);
        assert!(!handle.is_valid());
        assert!(!handle.is_alive());
        assert!(handle.regions().is_empty());
        assert_eq!(handle.path(), "");
        assert!(matches!(
            handle.read_bytes(Address::new(0x1000), 4),
            Err(MemoryError::InvalidHandle)
        ));
    }

    #[test]
    fn test_directory_lists_self() {
        let me = std::process::id();
        let processes = Platform::list_processes();
        let own = processes.iter().find(|p| p.pid == me).unwrap();
        assert!(!own.name.is_empty());

        let found = Platform::find_processes(&[own.name.as_str()]);
        assert!(found.contains(&me));
        assert!(Platform::find_processes(&["\u{1}no-such-process\u{1}"]).is_empty());
    }
}

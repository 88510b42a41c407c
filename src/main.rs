// Tue Jan 13 2026 - Alex

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use procmem_scanner::{
    config::ScanConfig,
    memory::{Address, MemoryReader, TypedReader},
    orchestration::{ScanCoordinator, ScanPoll, ScanStart},
    pattern::{Pattern, PatternScanner},
    process::{self, ProcessHandle, ProcessId, TargetProcess},
    utils::{self, format_bytes, format_duration, hex_string_spaced, parse_hex_usize},
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Parser, Debug)]
#[command(author = "Alex")]
#[command(version = "1.0.0")]
#[command(about = "Inspect process memory and scan it for byte signatures", long_about = None)]
struct Args {
    /// JSON scan configuration
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// -v info, -vv debug, -vvv trace
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List running processes
    List {
        #[arg(short, long)]
        filter: Option<String>,
    },
    /// Print ids of processes whose name contains any of NAMES
    Find {
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Show path, command line, working directory and bitness
    Info { pid: ProcessId },
    /// Show the process id owning the foreground window
    Foreground,
    /// List the scannable (readable and writable) regions
    Regions { pid: ProcessId },
    /// Read a value from target memory
    Read {
        pid: ProcessId,
        /// Hex address, e.g. 0x7ffd1000
        address: String,
        #[arg(short = 't', long = "type", value_enum, default_value = "bytes")]
        kind: ValueKind,
        /// Byte count for --type bytes
        #[arg(short, long, default_value_t = 16)]
        len: usize,
    },
    /// Find the first match of one signature, e.g. "48 8B ?? ?? 90"
    Scan {
        pid: ProcessId,
        pattern: String,
        /// Run on the background scan worker
        #[arg(long)]
        background: bool,
    },
    /// Find the first match of each signature in a single pass
    Batch {
        pid: ProcessId,
        #[arg(required = true)]
        patterns: Vec<String>,
        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ValueKind {
    Bytes,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    Ptr,
}

fn main() {
    let args = Args::parse();
    utils::logging::init(args.verbose);

    if let Err(e) = run(args) {
        eprintln!("{} {:#}", "[!]".red(), e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let config = match &args.config {
        Some(path) => ScanConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => ScanConfig::default(),
    };

    match args.command {
        Command::List { filter } => list(filter.as_deref()),
        Command::Find { names } => find(&names),
        Command::Info { pid } => info(pid),
        Command::Foreground => foreground(),
        Command::Regions { pid } => regions(&open(pid, &config)?),
        Command::Read { pid, address, kind, len } => read(&open(pid, &config)?, &address, kind, len),
        Command::Scan { pid, pattern, background } => {
            let pattern = Pattern::from_hex(&pattern).context("invalid pattern")?;
            let handle = open(pid, &config)?;
            if background {
                scan_background(handle, pattern, config)
            } else {
                scan(&handle, &pattern, &config)
            }
        }
        Command::Batch { pid, patterns, json } => {
            let patterns = patterns
                .iter()
                .enumerate()
                .map(|(i, hex)| {
                    Pattern::from_hex(hex)
                        .map(|p| p.with_index(i))
                        .with_context(|| format!("invalid pattern #{}", i))
                })
                .collect::<Result<Vec<_>>>()?;
            batch(&open(pid, &config)?, &patterns, &config, json)
        }
    }
}

fn open(pid: ProcessId, config: &ScanConfig) -> Result<ProcessHandle> {
    let handle = process::open_process(pid).with_region_filter(config.region_filter());
    if !handle.is_valid() {
        bail!("could not open process {}. {}", pid, process::PRIVILEGE_HINT);
    }
    Ok(handle)
}

fn list(filter: Option<&str>) -> Result<()> {
    let processes = process::list_processes();
    println!("{:>8} {:>8} {:>5}  {}", "PID".bold(), "PPID".bold(), "PRI".bold(), "NAME".bold());

    let mut shown = 0usize;
    for p in processes.iter().filter(|p| filter.map_or(true, |f| p.name.contains(f))) {
        println!("{:>8} {:>8} {:>5}  {}", p.pid, p.parent_pid, p.priority, p.name.cyan());
        shown += 1;
    }

    println!("{} {} processes", "[+]".green(), shown);
    Ok(())
}

fn find(names: &[String]) -> Result<()> {
    let names: Vec<&str> = names.iter().map(String::as_str).collect();
    let pids = process::find_processes(&names);
    if pids.is_empty() {
        println!("{} No matching processes", "[*]".blue());
    }
    for pid in pids {
        println!("{}", pid);
    }
    Ok(())
}

fn info(pid: ProcessId) -> Result<()> {
    let handle = process::open_process(pid);
    let bitness = if process::is_64bit(pid) { "64-bit" } else { "32-bit or unknown" };

    println!("{}", format!("Process {}", pid).cyan().bold());
    println!("{}", "-".repeat(40).cyan());
    println!("  Valid:             {}", handle.is_valid());
    println!("  Alive:             {}", handle.is_alive());
    println!("  Path:              {}", handle.path());
    println!("  Command line:      {}", handle.command_line());
    println!("  Working directory: {}", handle.working_directory());
    println!("  Bitness:           {}", bitness);
    Ok(())
}

fn foreground() -> Result<()> {
    match process::foreground_process() {
        Some(pid) => println!("{}", pid),
        None => println!("{} No foreground process reported on this platform", "[*]".blue()),
    }
    Ok(())
}

fn regions(handle: &ProcessHandle) -> Result<()> {
    let regions = handle.regions();
    let total: usize = regions.iter().map(|r| r.size()).sum();

    for region in &regions {
        println!("  {}", region);
    }
    println!(
        "{} {} regions, {} scannable",
        "[+]".green(),
        regions.len(),
        format_bytes(total as u64)
    );
    Ok(())
}

fn read(handle: &ProcessHandle, address: &str, kind: ValueKind, len: usize) -> Result<()> {
    let addr = parse_hex_usize(address)
        .map(Address::new)
        .with_context(|| format!("invalid address '{}'", address))?;

    let value = match kind {
        ValueKind::Bytes => hex_string_spaced(&handle.read_bytes(addr, len)?),
        ValueKind::I8 => handle.read_i8(addr)?.to_string(),
        ValueKind::I16 => handle.read_i16(addr)?.to_string(),
        ValueKind::I32 => handle.read_i32(addr)?.to_string(),
        ValueKind::I64 => handle.read_i64(addr)?.to_string(),
        ValueKind::U8 => handle.read_u8(addr)?.to_string(),
        ValueKind::U16 => handle.read_u16(addr)?.to_string(),
        ValueKind::U32 => handle.read_u32(addr)?.to_string(),
        ValueKind::U64 => handle.read_u64(addr)?.to_string(),
        ValueKind::F32 => handle.read_f32(addr)?.to_string(),
        ValueKind::F64 => handle.read_f64(addr)?.to_string(),
        ValueKind::Ptr => handle.read_ptr(addr)?.to_string(),
    };

    println!("{} {}", addr.to_string().cyan(), value);
    Ok(())
}

fn scan(handle: &ProcessHandle, pattern: &Pattern, config: &ScanConfig) -> Result<()> {
    let start = Instant::now();
    let spinner = spinner(&format!("Scanning for {}", pattern.to_hex_string()))?;

    let result = PatternScanner::from_config(config).find_pattern(handle, pattern);
    spinner.finish_and_clear();

    report(result, start);
    Ok(())
}

fn scan_background(handle: ProcessHandle, pattern: Pattern, config: ScanConfig) -> Result<()> {
    let start = Instant::now();
    let label = pattern.to_hex_string();
    let coordinator = ScanCoordinator::with_config(config);
    let reader: Arc<dyn MemoryReader> = Arc::new(handle);

    let started = coordinator.start_background_scan(reader, pattern, |result| {
        log::debug!("Background scan callback: {:?}", result);
    })?;

    let ScanStart::Started(pending) = started else {
        bail!("a scan is already running");
    };

    let spinner = spinner(&format!("Scanning for {} in the background", label))?;
    let result = loop {
        match pending.wait_timeout(Duration::from_millis(100))? {
            ScanPoll::Pending => spinner.tick(),
            ScanPoll::Done(result) => break result,
        }
    };
    spinner.finish_and_clear();

    report(result, start);
    Ok(())
}

fn batch(handle: &ProcessHandle, patterns: &[Pattern], config: &ScanConfig, json: bool) -> Result<()> {
    let start = Instant::now();
    let spinner = spinner(&format!("Scanning for {} patterns", patterns.len()))?;
    let results = PatternScanner::from_config(config).find_patterns(handle, patterns);
    spinner.finish_and_clear();

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    for result in &results {
        println!("  #{:<3} {}", result.index, result.address.to_string().green());
    }
    println!(
        "{} {}/{} patterns found in {}",
        "[+]".green(),
        results.len(),
        patterns.len(),
        format_duration(start.elapsed())
    );
    Ok(())
}

fn spinner(message: &str) -> Result<ProgressBar> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.cyan} [{elapsed}] {msg}")?);
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(100));
    Ok(spinner)
}

fn report(result: Option<Address>, start: Instant) {
    match result {
        Some(addr) => println!(
            "{} Found at {} in {}",
            "[+]".green(),
            addr.to_string().green().bold(),
            format_duration(start.elapsed())
        ),
        None => println!("{} Not found ({})", "[*]".blue(), format_duration(start.elapsed())),
    }
}

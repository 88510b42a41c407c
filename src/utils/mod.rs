// Tue Jan 13 2026 - Alex

pub mod logging;

pub use logging::LoggingUtils;

use std::time::Duration;

pub fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs_f64();

    if total_secs < 0.001 {
        format!("{}µs", duration.as_micros())
    } else if total_secs < 1.0 {
        format!("{}ms", duration.as_millis())
    } else {
        format!("{:.2}s", total_secs)
    }
}

pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

pub fn hex_string_spaced(data: &[u8]) -> String {
    data.iter().map(|b| format!("{:02x}", b)).collect::<Vec<_>>().join(" ")
}

/// Parses `0x1234` or `1234` as hexadecimal.
pub fn parse_hex_usize(s: &str) -> Option<usize> {
    let s = s.trim();
    let digits = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")).unwrap_or(s);
    usize::from_str_radix(digits, 16).ok()
}

/// Decodes a NUL-terminated byte buffer, stopping at the first NUL.
pub fn c_buffer_to_string(buf: &[u8]) -> String {
    let len = buf.iter().position(|&c| c == 0).unwrap_or(buf.len());
    String::from_utf8_lossy(&buf[..len]).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_usize() {
        assert_eq!(parse_hex_usize("0x1000"), Some(0x1000));
        assert_eq!(parse_hex_usize("ff"), Some(0xff));
        assert_eq!(parse_hex_usize("0xZZ"), None);
    }

    #[test]
    fn test_c_buffer_to_string() {
        assert_eq!(c_buffer_to_string(b"bash\0\0\0"), "bash");
        assert_eq!(c_buffer_to_string(b"no-nul"), "no-nul");
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 bytes");
        assert_eq!(format_bytes(2048), "2.00 KB");
    }
}

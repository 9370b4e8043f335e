//! # Wire Logging Utilities
//!
//! Logging helpers for relay traffic: truncated hex dumps of the mixed
//! text/binary stream and a small timer for poll round trips.
//!
//! ## Usage
//!
//! ```rust
//! use fastmeter_rs::util::logging::{log_frame_hex, perf::PerfTimer};
//!
//! let timer = PerfTimer::start("fast meter poll");
//! log_frame_hex("Rx", &[0xA5, 0xD1, 0x0D, 0x0A]);
//! timer.finish();
//! ```

use std::time::Instant;

/// Upper bound on the bytes rendered by a single hex dump.
const MAX_LOG_BYTES: usize = 64;

/// Log wire data in hex format for debugging
///
/// Output is limited to the first 64 bytes with the total size appended.
pub fn log_frame_hex(prefix: &str, data: &[u8]) {
    if !log::log_enabled!(log::Level::Debug) {
        return;
    }

    let display_data = &data[..data.len().min(MAX_LOG_BYTES)];
    let hex_str = crate::util::hex::format_hex_compact(display_data);
    let suffix = if data.len() > MAX_LOG_BYTES {
        format!(" ... ({} bytes total)", data.len())
    } else {
        String::new()
    };

    log::debug!(target: "fastmeter::wire", "{prefix}: {hex_str}{suffix}");
}

/// Log the printable part of a text response (prompts, ASCII blocks).
pub fn log_frame_text(prefix: &str, data: &[u8]) {
    log::trace!(
        target: "fastmeter::wire",
        "{prefix}: {:?}",
        String::from_utf8_lossy(data)
    );
}

/// Performance-aware logging utilities
pub mod perf {
    use super::*;

    /// A simple performance timer for logging operation durations
    #[derive(Debug)]
    pub struct PerfTimer {
        start: Instant,
        operation: String,
    }

    impl PerfTimer {
        /// Start timing an operation
        pub fn start(operation: &str) -> Self {
            Self {
                start: Instant::now(),
                operation: operation.to_string(),
            }
        }

        /// Finish timing and log the result
        pub fn finish(self) {
            log::debug!("Operation '{}' took {:?}", self.operation, self.start.elapsed());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_helpers_accept_any_size() {
        log_frame_hex("short", &[0xA5]);
        log_frame_hex("long", &[0u8; 200]);
        log_frame_text("text", b"\r\n=>");
    }

    #[test]
    fn test_perf_timer() {
        let timer = perf::PerfTimer::start("test_operation");
        timer.finish();
    }
}

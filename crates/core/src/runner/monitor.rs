//! Child-process memory monitoring.
//!
//! Samples the resident-set size of a child process at a fixed interval and
//! retains the maximum observed value. On Linux the sample comes from
//! `/proc/<pid>/statm`; on other platforms sampling is a no-op and the peak
//! stays at zero.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Default sampling interval.
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(100);

/// Spawn a task that samples the child's resident memory until aborted.
///
/// The peak observed value, in bytes, accumulates into `peak`. The caller
/// aborts the returned handle once the child has exited; a final sample is
/// not required because a process's peak is necessarily observed while it is
/// alive.
pub fn spawn_memory_monitor(pid: u32, interval: Duration, peak: Arc<AtomicU64>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            match resident_bytes(pid) {
                Some(bytes) => {
                    peak.fetch_max(bytes, Ordering::Relaxed);
                }
                // Process gone or unreadable; nothing more to sample.
                None => return,
            }
        }
    })
}

/// Current resident-set size of `pid` in bytes, if it can be read.
#[cfg(target_os = "linux")]
fn resident_bytes(pid: u32) -> Option<u64> {
    let statm = std::fs::read_to_string(format!("/proc/{pid}/statm")).ok()?;
    let resident_pages: u64 = statm.split_whitespace().nth(1)?.parse().ok()?;
    Some(resident_pages * page_size())
}

#[cfg(not(target_os = "linux"))]
fn resident_bytes(_pid: u32) -> Option<u64> {
    None
}

#[cfg(target_os = "linux")]
fn page_size() -> u64 {
    // 4 kiB pages everywhere fabflow runs; sysconf would need libc.
    4096
}

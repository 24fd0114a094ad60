//! Process runtime statistics
//!
//! The reporting loop reads one [`RuntimeSnapshot`] per tick through the
//! [`RuntimeStats`] trait. [`ProcessStats`] is the default collector:
//! - allocation counters from [`TrackingAllocator`] (zero unless installed)
//! - heap reserved/resident from `/proc/self/statm` (Linux)
//! - thread count from `/proc/self/task` (Linux)
//!
//! With the `jemalloc` feature the heap fields come from jemalloc's own stats.

pub mod alloc;

pub use alloc::{allocation_counters, TrackingAllocator};

use serde::{Deserialize, Serialize};

/// Names of the seven runtime gauges, in emission order
pub const RUNTIME_GAUGES: [&str; 7] = [
    "mem_alloc",
    "mem_total_alloc",
    "mem_heap_alloc",
    "mem_heap_sys",
    "mem_heap_released",
    "mem_heap_idle",
    "num_goroutines",
];

/// Memory and concurrency counters for the current process
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeSnapshot {
    /// Bytes allocated and still live
    pub alloc_bytes: u64,
    /// Bytes allocated over the process lifetime
    pub total_alloc_bytes: u64,
    /// Heap bytes in use
    pub heap_alloc_bytes: u64,
    /// Heap bytes reserved from the OS
    pub heap_sys_bytes: u64,
    /// Heap bytes handed back to the OS
    pub heap_released_bytes: u64,
    /// Heap bytes reserved but not in use
    pub heap_idle_bytes: u64,
    /// Live threads
    pub threads: u64,
}

impl RuntimeSnapshot {
    /// `(gauge name, value)` pairs in [`RUNTIME_GAUGES`] order
    pub fn gauges(&self) -> [(&'static str, f64); 7] {
        [
            (RUNTIME_GAUGES[0], self.alloc_bytes as f64),
            (RUNTIME_GAUGES[1], self.total_alloc_bytes as f64),
            (RUNTIME_GAUGES[2], self.heap_alloc_bytes as f64),
            (RUNTIME_GAUGES[3], self.heap_sys_bytes as f64),
            (RUNTIME_GAUGES[4], self.heap_released_bytes as f64),
            (RUNTIME_GAUGES[5], self.heap_idle_bytes as f64),
            (RUNTIME_GAUGES[6], self.threads as f64),
        ]
    }
}

/// Source of runtime snapshots
///
/// Called once per tick from the reporting thread. Should be cheap and must
/// not have side effects.
pub trait RuntimeStats: Send + Sync {
    fn read(&self) -> RuntimeSnapshot;
}

impl<F> RuntimeStats for F
where
    F: Fn() -> RuntimeSnapshot + Send + Sync,
{
    fn read(&self) -> RuntimeSnapshot {
        self()
    }
}

/// Default collector for the current process
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessStats;

impl ProcessStats {
    pub fn new() -> Self {
        Self
    }
}

impl RuntimeStats for ProcessStats {
    fn read(&self) -> RuntimeSnapshot {
        let (live, total) = allocation_counters();
        let heap = read_heap();

        let heap_alloc = heap.in_use.unwrap_or(live);

        RuntimeSnapshot {
            alloc_bytes: heap.allocated.unwrap_or(live),
            total_alloc_bytes: total,
            heap_alloc_bytes: heap_alloc,
            heap_sys_bytes: heap.reserved,
            heap_released_bytes: heap.released,
            heap_idle_bytes: heap.reserved.saturating_sub(heap_alloc),
            threads: thread_count().unwrap_or(0),
        }
    }
}

/// Heap figures from whichever source is available
#[derive(Debug, Default)]
struct HeapFigures {
    allocated: Option<u64>,
    in_use: Option<u64>,
    reserved: u64,
    released: u64,
}

#[cfg(feature = "jemalloc")]
fn read_heap() -> HeapFigures {
    use tikv_jemalloc_ctl::{epoch, stats};

    // Stats are cached until the epoch advances
    if epoch::advance().is_err() {
        return HeapFigures::default();
    }

    HeapFigures {
        allocated: stats::allocated::read().ok().map(|v| v as u64),
        in_use: stats::active::read().ok().map(|v| v as u64),
        reserved: stats::mapped::read().map(|v| v as u64).unwrap_or(0),
        released: stats::retained::read().map(|v| v as u64).unwrap_or(0),
    }
}

#[cfg(all(not(feature = "jemalloc"), target_os = "linux"))]
fn read_heap() -> HeapFigures {
    // statm: size resident shared text lib data dt, in pages
    let Ok(statm) = std::fs::read_to_string("/proc/self/statm") else {
        return HeapFigures::default();
    };
    let fields: Vec<u64> = statm
        .split_whitespace()
        .filter_map(|f| f.parse().ok())
        .collect();
    if fields.len() < 6 {
        return HeapFigures::default();
    }

    let page_size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    let page_size = if page_size > 0 { page_size as u64 } else { 4096 };

    let resident = fields[1] * page_size;
    let data = fields[5] * page_size;

    HeapFigures {
        allocated: None,
        in_use: None,
        reserved: data,
        released: data.saturating_sub(resident),
    }
}

#[cfg(all(not(feature = "jemalloc"), not(target_os = "linux")))]
fn read_heap() -> HeapFigures {
    HeapFigures::default()
}

#[cfg(target_os = "linux")]
fn thread_count() -> Option<u64> {
    let entries = std::fs::read_dir("/proc/self/task").ok()?;
    Some(entries.count() as u64)
}

#[cfg(not(target_os = "linux"))]
fn thread_count() -> Option<u64> {
    None
}

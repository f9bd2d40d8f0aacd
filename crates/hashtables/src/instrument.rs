//! Before/after measurement of table operations.
//!
//! A [`Meter`] is owned by every table. Each public operation takes a
//! [`Sample`] on entry and hands it back with its step count on exit,
//! getting one [`Observation`] covering wall clock, process and
//! user/system CPU time, traced heap usage and the resident set size.
//!
//! Heap figures come from [`TrackingAllocator`] and stay at zero unless
//! the final binary installs it:
//!
//! ```ignore
//! #[global_allocator]
//! static ALLOC: hashtables::instrument::TrackingAllocator = hashtables::instrument::TrackingAllocator;
//! ```

use std::{
    alloc::{GlobalAlloc, Layout, System},
    fmt,
    sync::atomic::{AtomicUsize, Ordering},
    time::Instant,
};

use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate};

use crate::metrics::Observation;

static CURRENT: AtomicUsize = AtomicUsize::new(0);
static PEAK: AtomicUsize = AtomicUsize::new(0);

/// System allocator that keeps a live byte count and its high-water mark
#[derive(Debug, Default, Clone, Copy)]
pub struct TrackingAllocator;

unsafe impl GlobalAlloc for TrackingAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let ptr = unsafe { System.alloc(layout) };
        if !ptr.is_null() {
            grew(layout.size());
        }
        ptr
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        let ptr = unsafe { System.alloc_zeroed(layout) };
        if !ptr.is_null() {
            grew(layout.size());
        }
        ptr
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        unsafe { System.dealloc(ptr, layout) };
        CURRENT.fetch_sub(layout.size(), Ordering::Relaxed);
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        let new_ptr = unsafe { System.realloc(ptr, layout, new_size) };
        if !new_ptr.is_null() {
            if new_size >= layout.size() {
                grew(new_size - layout.size());
            } else {
                CURRENT.fetch_sub(layout.size() - new_size, Ordering::Relaxed);
            }
        }
        new_ptr
    }
}

#[inline]
fn grew(bytes: usize) {
    let now = CURRENT.fetch_add(bytes, Ordering::Relaxed) + bytes;
    PEAK.fetch_max(now, Ordering::Relaxed);
}

impl TrackingAllocator {
    /// Bytes currently allocated through the tracker
    pub fn current() -> usize {
        CURRENT.load(Ordering::Relaxed)
    }

    /// High-water mark since the last [`TrackingAllocator::reset_peak`]
    pub fn peak() -> usize {
        PEAK.load(Ordering::Relaxed)
    }

    pub fn reset_peak() {
        PEAK.store(CURRENT.load(Ordering::Relaxed), Ordering::Relaxed);
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct CpuTimes {
    process: f64,
    user: f64,
    system: f64,
}

#[cfg(unix)]
fn cpu_times() -> CpuTimes {
    let mut ts = libc::timespec {
        tv_sec: 0,
        tv_nsec: 0,
    };
    let process = unsafe {
        if libc::clock_gettime(libc::CLOCK_PROCESS_CPUTIME_ID, &mut ts) == 0 {
            ts.tv_sec as f64 + ts.tv_nsec as f64 / 1e9
        } else {
            0.0
        }
    };

    let mut usage = std::mem::MaybeUninit::<libc::rusage>::zeroed();
    let usage = unsafe {
        if libc::getrusage(libc::RUSAGE_SELF, usage.as_mut_ptr()) != 0 {
            return CpuTimes {
                process,
                ..Default::default()
            };
        }
        usage.assume_init()
    };

    CpuTimes {
        process,
        user: timeval_secs(usage.ru_utime),
        system: timeval_secs(usage.ru_stime),
    }
}

#[cfg(unix)]
fn timeval_secs(tv: libc::timeval) -> f64 {
    tv.tv_sec as f64 + tv.tv_usec as f64 / 1e6
}

#[cfg(not(unix))]
fn cpu_times() -> CpuTimes {
    CpuTimes::default()
}

/// State captured when an operation starts
#[derive(Debug, Clone, Copy)]
pub struct Sample {
    wall: Instant,
    cpu: CpuTimes,
    heap: usize,
}

/// Takes [`Sample`]s and turns them into [`Observation`]s
pub struct Meter {
    system: sysinfo::System,
    pid: Option<Pid>,
}

impl fmt::Debug for Meter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Meter").field("pid", &self.pid).finish()
    }
}

impl Default for Meter {
    fn default() -> Self {
        Self::new()
    }
}

impl Meter {
    pub fn new() -> Self {
        let pid = sysinfo::get_current_pid()
            .inspect_err(|e| log::warn!("resident memory will not be sampled: {e}"))
            .ok();

        Self {
            system: sysinfo::System::new(),
            pid,
        }
    }

    /// Opens a measurement
    ///
    /// # Note
    ///
    /// The allocator's peak is global and reset here, so a measurement
    /// nested inside another one (a resize inside an insert) also resets
    /// the outer one's peak. Nested measurements must start before the
    /// outer operation has allocated anything, as the grow check at the
    /// top of every insert does.
    pub fn start(&self) -> Sample {
        TrackingAllocator::reset_peak();
        Sample {
            heap: TrackingAllocator::current(),
            cpu: cpu_times(),
            wall: Instant::now(),
        }
    }

    /// Closes the measurement opened by `sample`
    ///
    /// Clocks are read first and the heap counters next, the resident set
    /// size last since reading it costs far more than a table operation.
    pub fn finish(&mut self, sample: Sample, steps: u64) -> Observation {
        let wall = sample.wall.elapsed().as_secs_f64();
        let cpu = cpu_times();

        let heap = TrackingAllocator::current();
        let peak = TrackingAllocator::peak();
        let resident = self.resident();

        Observation {
            steps,
            process_time: cpu.process - sample.cpu.process,
            wall_time: wall,
            user_cpu_time: cpu.user - sample.cpu.user,
            system_cpu_time: cpu.system - sample.cpu.system,
            memory_peak: peak.saturating_sub(sample.heap) as u64,
            memory_delta: heap as i64 - sample.heap as i64,
            memory_resident: resident,
        }
    }

    fn resident(&mut self) -> u64 {
        let Some(pid) = self.pid else {
            return 0;
        };

        self.system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[pid]),
            true,
            ProcessRefreshKind::new().with_memory(),
        );
        self.system.process(pid).map(|p| p.memory()).unwrap_or(0)
    }
}

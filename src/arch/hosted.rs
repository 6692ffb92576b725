//! # Hosted Port
//!
//! Runs the demo on a multicore Linux host. Each periodic unit is an OS
//! thread pinned to one CPU with `sched_setaffinity`, so "core" here means
//! a logical CPU of the host.
//!
//! A user-space thread cannot mask hardware interrupts. The interrupt flag
//! is therefore modelled: every thread carries its own enable bit (threads
//! are pinned, so per thread is per core) and pinned threads mirror it into
//! a per-core table that other threads can observe through
//! [`interrupts_masked`].
//!
//! Pinning is a best-effort hint. On a host with fewer CPUs than
//! [`NUM_CORES`], or outside Linux, the unit still runs and a warning is
//! logged.

use std::cell::Cell;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};

use super::Interrupt;
use crate::config::NUM_CORES;

const ENABLED: usize = 1;
const DISABLED: usize = 0;

thread_local! {
    static CPU_ID: Cell<Option<usize>> = const { Cell::new(None) };
    static IRQ_ENABLED: Cell<bool> = const { Cell::new(true) };
}

static MASKED: [AtomicBool; NUM_CORES] = [AtomicBool::new(false), AtomicBool::new(false)];

pub struct ArchInterrupt;

impl Interrupt for ArchInterrupt {
    fn get_flag() -> usize {
        if interrupts_enabled() {
            ENABLED
        } else {
            DISABLED
        }
    }

    fn disable() {
        store(false);
    }

    fn set_flag(flag: usize) {
        store(flag == ENABLED);
    }
}

fn store(enabled: bool) {
    IRQ_ENABLED.with(|f| f.set(enabled));
    if let Some(slot) = cpu_id().and_then(|core| MASKED.get(core)) {
        slot.store(!enabled, Ordering::Release);
    }
}

/// Whether the calling thread currently has its interrupts enabled.
pub fn interrupts_enabled() -> bool {
    IRQ_ENABLED.with(Cell::get)
}

/// Whether the unit pinned to `core` currently has its interrupts masked.
pub fn interrupts_masked(core: usize) -> bool {
    MASKED
        .get(core)
        .is_some_and(|slot| slot.load(Ordering::Acquire))
}

/// Core the calling thread was pinned to, if any.
pub fn cpu_id() -> Option<usize> {
    CPU_ID.with(Cell::get)
}

/// Get the number of logical CPUs.
pub fn nprocs() -> usize {
    let result = unsafe { libc::sysconf(libc::_SC_NPROCESSORS_ONLN) };
    if result < 1 {
        1
    } else {
        result as usize
    }
}

/// Bind the calling thread to `core`.
///
/// The core id is recorded even when the OS refuses the affinity request,
/// so the interrupt model keeps working. Returns whether the OS accepted it.
pub fn pin_to_core(core: usize) -> bool {
    CPU_ID.with(|id| id.set(Some(core)));
    match set_affinity(core) {
        Ok(()) => true,
        Err(e) => {
            log::warn!("failed to pin thread to core {core}, running unpinned: {e}");
            false
        }
    }
}

#[cfg(target_os = "linux")]
fn set_affinity(core: usize) -> io::Result<()> {
    if core >= libc::CPU_SETSIZE as usize {
        return Err(io::Error::from(io::ErrorKind::InvalidInput));
    }

    unsafe {
        let mut cpuset: libc::cpu_set_t = std::mem::zeroed();
        libc::CPU_ZERO(&mut cpuset);
        libc::CPU_SET(core, &mut cpuset);

        if libc::sched_setaffinity(0, std::mem::size_of::<libc::cpu_set_t>(), &cpuset) != 0 {
            return Err(io::Error::last_os_error());
        }
    }

    Ok(())
}

#[cfg(not(target_os = "linux"))]
fn set_affinity(_core: usize) -> io::Result<()> {
    Err(io::Error::from(io::ErrorKind::Unsupported))
}

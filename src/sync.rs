//! # Synchronization Primitives
//!
//! The one shared resource of the system: a lock whose critical section
//! also masks the holding core's interrupts, and therefore its scheduler
//! tick. This is the semantics of a multicore RTOS "portMUX" style
//! spinlock:
//!
//! - a core that finds the lock taken spins, interrupts already masked,
//!   until the holder releases it
//! - while held, nothing else runs on the holding core
//! - release restores the interrupt state saved at acquire
//!
//! The lock is not reentrant. Acquiring it twice on the same flow of
//! control, or never releasing it, stalls the cores involved forever; this
//! is not detected.

use core::marker::PhantomData;
use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::arch::Interrupt;

// ---------------------------------------------------------------------------
// Lock contract
// ---------------------------------------------------------------------------

/// A process-wide mutual-exclusion primitive with critical-section
/// semantics.
///
/// `acquire` and `release` must be paired on the same flow of control with
/// no suspension point in between. Prefer [`SharedLock::critical_section`],
/// which makes the pairing structural.
pub trait SharedLock {
    /// Block (spinning) until the calling core owns the lock. The calling
    /// core's interrupts are masked from here until `release`.
    fn acquire(&self);

    /// Give up ownership and restore the interrupt state saved by `acquire`.
    fn release(&self);

    /// Run `f` with the lock held.
    ///
    /// # Usage
    /// ```ignore
    /// lock.critical_section(|| {
    ///     // at most one core is in here, with its interrupts masked
    /// });
    /// ```
    #[inline]
    fn critical_section<R>(&self, f: impl FnOnce() -> R) -> R {
        self.acquire();
        let r = f();
        self.release();
        r
    }
}

impl<L: SharedLock + ?Sized> SharedLock for &L {
    fn acquire(&self) {
        (**self).acquire();
    }

    fn release(&self) {
        (**self).release();
    }
}

#[cfg(feature = "std")]
impl<L: SharedLock + ?Sized> SharedLock for std::sync::Arc<L> {
    fn acquire(&self) {
        (**self).acquire();
    }

    fn release(&self) {
        (**self).release();
    }
}

// ---------------------------------------------------------------------------
// Interrupt-masking spinlock
// ---------------------------------------------------------------------------

/// Spinlock that masks the holder's interrupts, generic over the port's
/// interrupt controller.
///
/// Requires compare-and-swap; ports without it (ARMv6-M) provide their own
/// [`SharedLock`] on top of a hardware spinlock.
pub struct SpinLock<I> {
    locked: AtomicBool,
    /// Interrupt flag of the holder before it acquired. Written only by the
    /// holder, after the lock word was won.
    saved_flag: AtomicUsize,
    acquisitions: AtomicUsize,
    _arch: PhantomData<fn() -> I>,
}

impl<I> SpinLock<I> {
    pub const fn new() -> Self {
        Self {
            locked: AtomicBool::new(false),
            saved_flag: AtomicUsize::new(0),
            acquisitions: AtomicUsize::new(0),
            _arch: PhantomData,
        }
    }

    /// Whether some core currently holds the lock.
    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Relaxed)
    }

    /// Number of successful acquisitions since creation.
    pub fn acquisitions(&self) -> usize {
        self.acquisitions.load(Ordering::Relaxed)
    }
}

impl<I> Default for SpinLock<I> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(target_has_atomic = "8")]
impl<I: Interrupt> SharedLock for SpinLock<I> {
    fn acquire(&self) {
        let flag = I::get_flag();
        I::disable();

        // Spin with interrupts already masked: a waiting core is just as
        // unavailable to its scheduler as the holding one.
        while self
            .locked
            .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            while self.locked.load(Ordering::Relaxed) {
                core::hint::spin_loop();
            }
        }

        self.saved_flag.store(flag, Ordering::Relaxed);
        self.acquisitions.fetch_add(1, Ordering::Relaxed);
    }

    fn release(&self) {
        let flag = self.saved_flag.load(Ordering::Relaxed);
        self.locked.store(false, Ordering::Release);
        I::set_flag(flag);
    }
}

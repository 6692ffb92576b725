//! # RP2040 Port
//!
//! Bare-metal port for the RP2040's two Cortex-M0+ cores.
//!
//! ## Interrupt Masking
//!
//! Each core has its own PRIMASK, so masking is naturally per core, exactly
//! what the critical section needs: while core 1 holds the lock its SysTick
//! cannot fire, core 0 is untouched unless it is spinning on the lock too.
//!
//! ## Hardware Spinlock
//!
//! ARMv6-M has no exclusive load/store, so [`crate::sync::SpinLock`] (which
//! needs compare-and-swap) cannot be used here. [`HwSpinLock`] claims one of
//! the 32 SIO spinlocks instead. Spinlock 31 belongs to the HAL's
//! `critical-section` implementation; this port uses spinlock 1.

use core::sync::atomic::{compiler_fence, AtomicUsize, Ordering};

use cortex_m::register::primask;
use rp2040_hal::sio::Spinlock1;

use super::Interrupt;
use crate::sync::SharedLock;

/// Spin iterations per millisecond at the default 125 MHz system clock.
///
/// One `spin_loop` hint lowers to a `nop`; together with the loop counter
/// that is about four cycles per iteration on the M0+.
pub const HOG_ITERATIONS_PER_MS: u32 = 31_250;

/// Line driven by Task 1 on the Pico. GP23 is the board's SMPS mode pin,
/// so [`crate::config::PIN_1`] is not used here.
pub const PICO_PIN_1: u8 = 21;

const ENABLED: usize = 1;
const DISABLED: usize = 0;

pub struct ArchInterrupt;

impl Interrupt for ArchInterrupt {
    fn get_flag() -> usize {
        if primask::read().is_active() {
            ENABLED
        } else {
            DISABLED
        }
    }

    fn disable() {
        cortex_m::interrupt::disable();
    }

    fn set_flag(flag: usize) {
        if flag == ENABLED {
            unsafe { cortex_m::interrupt::enable() };
        }
    }
}

/// Interrupt-masking lock backed by SIO spinlock 1.
pub struct HwSpinLock {
    saved_flag: AtomicUsize,
}

impl HwSpinLock {
    pub const fn new() -> Self {
        Self {
            saved_flag: AtomicUsize::new(DISABLED),
        }
    }
}

impl Default for HwSpinLock {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedLock for HwSpinLock {
    fn acquire(&self) {
        let flag = ArchInterrupt::get_flag();
        ArchInterrupt::disable();

        // Ownership lives in the SIO block; `release` frees it explicitly.
        core::mem::forget(Spinlock1::claim());
        compiler_fence(Ordering::Acquire);

        self.saved_flag.store(flag, Ordering::Relaxed);
    }

    fn release(&self) {
        let flag = self.saved_flag.load(Ordering::Relaxed);

        compiler_fence(Ordering::Release);
        unsafe { Spinlock1::release() };

        ArchInterrupt::set_flag(flag);
    }
}

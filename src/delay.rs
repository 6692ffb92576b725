//! # Delay Strategies
//!
//! Two ways to let time pass, both behind `embedded-hal`'s `DelayMs`:
//!
//! - [`BusyWait`] burns the CPU in a calibrated spin loop and never gives
//!   the core back. Inside a held [`SharedLock`](crate::sync::SharedLock)
//!   this makes the whole core unavailable, its scheduler included.
//! - [`SleepDelay`] (hosted only) hands the core back to the OS scheduler
//!   for the duration. Used for the units' periodic sleep, and as a hog
//!   replacement in harnesses where burning a CPU is unwanted.

use embedded_hal::blocking::delay::DelayMs;

use crate::config::HOG_ITERATIONS_PER_MS;

// ---------------------------------------------------------------------------
// Busy-wait
// ---------------------------------------------------------------------------

/// CPU-bound delay: `iterations_per_ms` spin hints per millisecond.
///
/// Accuracy depends entirely on the calibration. Keep requested durations
/// at or below about one second; longer spins accumulate the error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusyWait {
    iterations_per_ms: u32,
}

impl BusyWait {
    /// Calibration for the reference 240 MHz core.
    pub const DEFAULT: Self = Self::new(HOG_ITERATIONS_PER_MS);

    pub const fn new(iterations_per_ms: u32) -> Self {
        Self { iterations_per_ms }
    }

    pub const fn iterations_per_ms(&self) -> u32 {
        self.iterations_per_ms
    }

    #[inline(never)]
    fn spin(iterations: u32) {
        for _ in 0..iterations {
            core::hint::spin_loop();
        }
    }

    /// Measure how many spin iterations the calling CPU executes per
    /// millisecond.
    ///
    /// Takes the fastest of a few samples so a preemption during
    /// calibration does not shorten every later hog.
    #[cfg(feature = "std")]
    pub fn calibrate() -> Self {
        use std::time::{Duration, Instant};

        const SAMPLE: u32 = 200_000;
        const ROUNDS: usize = 3;

        Self::spin(SAMPLE / 10);

        let mut best = Duration::MAX;
        for _ in 0..ROUNDS {
            let start = Instant::now();
            Self::spin(SAMPLE);
            best = best.min(start.elapsed());
        }

        let per_ms = u128::from(SAMPLE) * 1_000_000 / best.as_nanos().max(1);
        let per_ms = u32::try_from(per_ms).unwrap_or(u32::MAX).max(1);

        log::debug!("busy-wait calibrated: {per_ms} iterations/ms");
        Self::new(per_ms)
    }
}

impl Default for BusyWait {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl DelayMs<u32> for BusyWait {
    fn delay_ms(&mut self, ms: u32) {
        for _ in 0..ms {
            Self::spin(self.iterations_per_ms);
        }
    }
}

// ---------------------------------------------------------------------------
// Yielding sleep
// ---------------------------------------------------------------------------

/// Suspends the calling thread, letting other work run on its core.
#[cfg(feature = "std")]
#[derive(Debug, Clone, Copy, Default)]
pub struct SleepDelay;

#[cfg(feature = "std")]
impl DelayMs<u32> for SleepDelay {
    fn delay_ms(&mut self, ms: u32) {
        std::thread::sleep(std::time::Duration::from_millis(u64::from(ms)));
    }
}

//! # Hosted Demo
//!
//! Runs both periodic units on a multicore Linux host, one thread pinned per
//! core, with the output lines simulated in memory. Set `LOG_LEVEL` in
//! `config` to `Trace` to see every edge of both lines.
//!
//! | Task | Core | Line | Critical section | Period |
//! |------|------|------|------------------|--------|
//! | Task 0 | `PRO_CPU_NUM` | `PIN_0` | toggle | `TASK_0_DELAY_MS` |
//! | Task 1 | `APP_CPU_NUM` | `PIN_1` | pulse + `TIME_HOG_MS` spin | `TASK_1_DELAY_MS` |

use std::sync::Arc;

use anyhow::Context;

use dualcore_spinlock::arch::hosted::ArchInterrupt;
use dualcore_spinlock::config::{DemoConfig, LOG_LEVEL};
use dualcore_spinlock::delay::BusyWait;
use dualcore_spinlock::kernel::Bootstrap;
use dualcore_spinlock::logger;
use dualcore_spinlock::sync::SpinLock;

fn main() -> anyhow::Result<()> {
    logger::init(LOG_LEVEL);

    // The reference calibration is for a 240 MHz core; measure this one.
    let hog = BusyWait::calibrate();

    let lock = Arc::new(SpinLock::<ArchInterrupt>::new());
    let system = Bootstrap::new(DemoConfig::DEFAULT, lock)
        .with_hog(hog)
        .start()
        .context("failed to start the periodic units")?;

    system.run_forever()
}

//! # Dual-Core Spinlock Demo
//!
//! Two periodic units of work, pinned one per core, contending for a single
//! lock whose critical section also masks the holder's interrupts. The
//! point is the timing of two output lines on a scope:
//!
//! - **Task 0** (core 0) inverts line `PIN_0` every `TASK_0_DELAY_MS`,
//!   optionally inside the critical section.
//! - **Task 1** (core 1) raises line `PIN_1`, busy-waits `TIME_HOG_MS`
//!   inside the critical section, lowers the line, then sleeps
//!   `TASK_1_DELAY_MS`.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │   Bootstrap: kernel.rs (hosted) · bin/firmware.rs      │
//! ├────────────────────────────────────────────────────────┤
//! │          Periodic units (task.rs)                      │
//! │      Toggler (Task 0) · Hog (Task 1)                   │
//! ├───────────────────────────┬────────────────────────────┤
//! │  Shared lock (sync.rs)    │  Delays (delay.rs)         │
//! │  SharedLock · SpinLock    │  BusyWait · SleepDelay     │
//! ├───────────────────────────┴────────────────────────────┤
//! │  Ports (arch/): hosted threads · RP2040                │
//! └────────────────────────────────────────────────────────┘
//! ```
//!
//! ## What to Look For
//!
//! 1. Task 0 without the lock (`scenario-a`): its period stays at
//!    `TASK_0_DELAY_MS` whatever Task 1 does, since nothing is shared.
//! 2. Task 0 with the lock (default): whenever it collides with Task 1 it
//!    spins, interrupts masked, until Task 1 lets go. Its period stretches
//!    by up to `TIME_HOG_MS`.
//! 3. Task 1's high pulse is `TIME_HOG_MS` wide. During the pulse core 1
//!    services nothing else, its own scheduler tick included.
//!
//! ## Memory Model
//!
//! - **No heap** in the library core: `sync`, `delay`, `task`, `config`
//!   build without `std`
//! - The hosted pieces (`kernel`, `logger`, `trace`, `arch::hosted`) need
//!   the `std` feature

#![cfg_attr(not(feature = "std"), no_std)]

pub mod arch;
pub mod config;
pub mod delay;
pub mod sync;
pub mod task;

#[cfg(feature = "std")]
pub mod kernel;
#[cfg(feature = "std")]
pub mod logger;
#[cfg(feature = "std")]
pub mod trace;

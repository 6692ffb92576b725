//! # Kernel (hosted)
//!
//! Task creation and system startup for the hosted port.
//!
//! ## Startup Sequence
//!
//! ```text
//! main()
//!   └─► Bootstrap::start()
//!         └─► setup context (pinned to APP_CPU_NUM)
//!               ├─► wait startup_delay_ms
//!               ├─► banner
//!               ├─► spawn Task 0 (Toggler) pinned to PRO_CPU_NUM
//!               ├─► spawn Task 1 (Hog)     pinned to APP_CPU_NUM
//!               └─► return (the setup context is gone for good)
//!   └─► System::run_forever()   ← repeating idle hook, empty
//! ```
//!
//! `Bootstrap` is consumed by `start`, so the setup flow cannot run twice.

use std::error::Error;
use std::fmt;
use std::io;
use std::mem;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use embedded_hal::blocking::delay::DelayMs;

use crate::arch::hosted;
use crate::config::{DemoConfig, NUM_CORES};
use crate::delay::{BusyWait, SleepDelay};
use crate::sync::SharedLock;
use crate::task::{Hog, PeriodicUnit, TaskConfig, Toggler};
use crate::trace::{SimPin, Trace};

/// Smallest stack handed to a host thread. The device stack sizes in
/// `TaskConfig` are far below what std threads need.
const HOST_MIN_STACK: usize = 64 * 1024;

/// Startup banner, logged once the startup delay has passed.
pub const BANNER: &str = "Dual-core spinlock demo";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum SpawnError {
    /// The OS refused to create the thread for a task.
    Thread {
        name: &'static str,
        source: io::Error,
    },
    /// The setup context died before handing over the units.
    Bootstrap,
}

impl fmt::Display for SpawnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpawnError::Thread { name, .. } => write!(f, "failed to create task \"{name}\""),
            SpawnError::Bootstrap => f.write_str("setup context panicked"),
        }
    }
}

impl Error for SpawnError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            SpawnError::Thread { source, .. } => Some(source),
            SpawnError::Bootstrap => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Task creation
// ---------------------------------------------------------------------------

/// Create a thread for `config` and pin it to `config.core` before running
/// `f`.
///
/// Pinning is best-effort. The priority is recorded but host threads keep
/// the default scheduling policy.
pub fn spawn_pinned<F, T>(config: TaskConfig, f: F) -> Result<JoinHandle<T>, SpawnError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    thread::Builder::new()
        .name(config.name.into())
        .stack_size(config.stack_size.max(HOST_MIN_STACK))
        .spawn(move || {
            hosted::pin_to_core(config.core);
            log::debug!(
                "{} started on core {} (priority {})",
                config.name,
                config.core,
                config.priority
            );
            f()
        })
        .map_err(|source| SpawnError::Thread {
            name: config.name,
            source,
        })
}

fn spawn_unit<U>(
    config: TaskConfig,
    mut unit: U,
    stop: &Arc<AtomicBool>,
) -> Result<JoinHandle<u64>, SpawnError>
where
    U: PeriodicUnit + Send + 'static,
{
    let stop = Arc::clone(stop);
    spawn_pinned(config, move || unit.run_until(&stop))
}

/// Blank line, then [`BANNER`].
fn banner() {
    log::info!("");
    log::info!("{BANNER}");
}

/// The platform's repeating hook. Intentionally empty: all the work lives
/// in the two units.
pub fn idle() {}

// ---------------------------------------------------------------------------
// Bootstrap
// ---------------------------------------------------------------------------

/// One-shot system startup.
pub struct Bootstrap<L, D = BusyWait> {
    config: DemoConfig,
    lock: Arc<L>,
    hog: D,
    trace: Option<Arc<Trace>>,
}

impl<L> Bootstrap<L>
where
    L: SharedLock + Send + Sync + 'static,
{
    /// Startup with the reference busy-wait calibration for the hog.
    pub fn new(config: DemoConfig, lock: Arc<L>) -> Self {
        Self {
            config,
            lock,
            hog: BusyWait::DEFAULT,
            trace: None,
        }
    }
}

impl<L, D> Bootstrap<L, D>
where
    L: SharedLock + Send + Sync + 'static,
    D: DelayMs<u32> + Send + 'static,
{
    /// Replace the delay Task 1 holds the lock with.
    pub fn with_hog<H>(self, hog: H) -> Bootstrap<L, H>
    where
        H: DelayMs<u32> + Send + 'static,
    {
        Bootstrap {
            config: self.config,
            lock: self.lock,
            hog,
            trace: self.trace,
        }
    }

    /// Capture both output lines into `trace`.
    pub fn with_trace(mut self, trace: Arc<Trace>) -> Self {
        self.trace = Some(trace);
        self
    }

    /// Run the setup context to completion and hand back the running
    /// system.
    pub fn start(self) -> Result<System, SpawnError> {
        let nprocs = hosted::nprocs();
        if nprocs < NUM_CORES {
            log::warn!("host has {nprocs} CPU(s), the two units will share cores");
        }

        let stop = Arc::new(AtomicBool::new(false));
        let boot = TaskConfig {
            name: "setup",
            core: self.config.boot_core,
            priority: self.config.priority,
            stack_size: self.config.stack_size,
        };

        let units = {
            let stop = Arc::clone(&stop);
            spawn_pinned(boot, move || self.setup(&stop))?
        }
        .join()
        .map_err(|_| SpawnError::Bootstrap)??;

        Ok(System { units, stop })
    }

    fn setup(self, stop: &Arc<AtomicBool>) -> Result<Vec<JoinHandle<u64>>, SpawnError> {
        let Self {
            config,
            lock,
            hog,
            trace,
        } = self;

        SleepDelay.delay_ms(config.startup_delay_ms);
        banner();

        let pin = |id| match &trace {
            Some(trace) => SimPin::traced(id, Arc::clone(trace)),
            None => SimPin::new(id),
        };

        let toggler = Toggler::new(
            Arc::clone(&lock),
            pin(config.pin_0),
            SleepDelay,
            config.task_0_delay_ms,
        )
        .with_lock(config.task_0_uses_lock);
        let task_0 = spawn_unit(
            TaskConfig {
                name: "Task 0",
                core: config.task_0_core,
                priority: config.priority,
                stack_size: config.stack_size,
            },
            toggler,
            stop,
        )?;

        let hogger = Hog::new(
            lock,
            pin(config.pin_1),
            hog,
            SleepDelay,
            config.time_hog_ms,
            config.task_1_delay_ms,
        );
        let task_1 = spawn_unit(
            TaskConfig {
                name: "Task 1",
                core: config.task_1_core,
                priority: config.priority,
                stack_size: config.stack_size,
            },
            hogger,
            stop,
        );

        match task_1 {
            Ok(task_1) => Ok(vec![task_0, task_1]),
            Err(e) => {
                stop.store(true, Ordering::Release);
                let _ = task_0.join();
                Err(e)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Running system
// ---------------------------------------------------------------------------

/// Iterations each unit completed before shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Report {
    pub task_0_iterations: u64,
    pub task_1_iterations: u64,
}

/// Handle on the two running units.
///
/// Dropping it asks the units to stop at their next sleep boundary without
/// waiting for them.
pub struct System {
    units: Vec<JoinHandle<u64>>,
    stop: Arc<AtomicBool>,
}

impl System {
    /// Number of units still running.
    pub fn units(&self) -> usize {
        self.units.iter().filter(|h| !h.is_finished()).count()
    }

    /// Stop both units at their next sleep boundary and wait for them.
    pub fn shutdown(mut self) -> Report {
        self.stop.store(true, Ordering::Release);

        let mut counts = mem::take(&mut self.units)
            .into_iter()
            .map(|h| h.join().unwrap_or(0));

        Report {
            task_0_iterations: counts.next().unwrap_or(0),
            task_1_iterations: counts.next().unwrap_or(0),
        }
    }

    /// Hand the calling context over to the idle hook. Never returns.
    pub fn run_forever(self) -> ! {
        loop {
            idle();
            thread::park();
        }
    }
}

impl Drop for System {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::thread::ThreadId;

    /// Keeps `Info` records per thread so parallel tests do not mix.
    struct Capture(Mutex<Vec<(ThreadId, String)>>);

    impl log::Log for Capture {
        fn enabled(&self, metadata: &log::Metadata) -> bool {
            metadata.level() <= log::Level::Info
        }

        fn log(&self, record: &log::Record) {
            if self.enabled(record.metadata()) {
                let line = record.args().to_string();
                self.0.lock().unwrap().push((thread::current().id(), line));
            }
        }

        fn flush(&self) {}
    }

    static CAPTURE: Capture = Capture(Mutex::new(Vec::new()));

    fn config(name: &'static str, core: usize) -> TaskConfig {
        TaskConfig {
            name,
            core,
            priority: 1,
            stack_size: 1024,
        }
    }

    #[test]
    fn spawned_task_sees_its_core() {
        let handle = spawn_pinned(config("probe", 1), hosted::cpu_id).unwrap();
        assert_eq!(handle.join().unwrap(), Some(1));
    }

    #[test]
    fn spawned_task_carries_its_name() {
        let handle = spawn_pinned(config("named", 0), || {
            thread::current().name().map(str::to_owned)
        })
        .unwrap();
        assert_eq!(handle.join().unwrap().as_deref(), Some("named"));
    }

    #[test]
    fn banner_follows_an_empty_line() {
        let _ = log::set_logger(&CAPTURE);
        log::set_max_level(log::LevelFilter::Info);

        banner();

        let me = thread::current().id();
        let lines: Vec<String> = CAPTURE
            .0
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| *id == me)
            .map(|(_, line)| line.clone())
            .collect();
        assert_eq!(lines, ["", BANNER]);
    }

    #[test]
    fn spawn_error_reports_task_name() {
        let err = SpawnError::Thread {
            name: "Task 1",
            source: io::Error::from(io::ErrorKind::OutOfMemory),
        };
        assert_eq!(err.to_string(), "failed to create task \"Task 1\"");
        assert!(err.source().is_some());
        assert!(SpawnError::Bootstrap.source().is_none());
    }
}

//! # Demo Configuration
//!
//! Compile-time constants governing the two periodic units and the shared
//! lock. Nothing here is read from the command line or the environment:
//! change a constant (or a Cargo feature) and rebuild.

// ---------------------------------------------------------------------------
// Timing
// ---------------------------------------------------------------------------

/// How long Task 1 monopolizes its core inside the critical section (ms).
pub const TIME_HOG_MS: u32 = 1;

/// Sleep between two toggles of Task 0 (ms).
pub const TASK_0_DELAY_MS: u32 = 30;

/// Sleep between two pulses of Task 1 (ms).
pub const TASK_1_DELAY_MS: u32 = 100;

/// Pause before the banner so an external probe or terminal can attach.
pub const STARTUP_DELAY_MS: u32 = 1000;

/// Inner spin iterations that take about one millisecond.
///
/// Calibrated for a 240 MHz core executing one no-op per iteration.
/// Porting to a different clock means recalibrating this value, otherwise
/// the hog duration drifts proportionally.
pub const HOG_ITERATIONS_PER_MS: u32 = 40_000;

// ---------------------------------------------------------------------------
// Pins
// ---------------------------------------------------------------------------

/// Output line driven by Task 0.
pub const PIN_0: u8 = 22;

/// Output line driven by Task 1.
///
/// The RP2040 firmware drives `arch::rp2040::PICO_PIN_1` instead.
pub const PIN_1: u8 = 23;

// ---------------------------------------------------------------------------
// Cores and tasks
// ---------------------------------------------------------------------------

/// Number of cores the demo needs.
pub const NUM_CORES: usize = 2;

/// Protocol core. Task 0 is pinned here.
pub const PRO_CPU_NUM: usize = 0;

/// Application core. Task 1 and the bootstrap context run here.
pub const APP_CPU_NUM: usize = 1;

/// Priority of both periodic units.
pub const TASK_PRIORITY: u8 = 1;

/// Stack size requested for each unit, in bytes.
pub const TASK_STACK_SIZE: usize = 1024;

/// Baud rate of the logging channel.
pub const SERIAL_BAUD: u32 = 115_200;

/// Verbosity of the hosted console. `Trace` logs every edge of both lines.
pub const LOG_LEVEL: log::LevelFilter = log::LevelFilter::Info;

/// Whether Task 0 wraps its toggle in the shared critical section.
///
/// `false` is demonstration case "a" (no contention point, Task 0 timing is
/// unaffected by the hog); `true` is case "b". Selected with the
/// `scenario-a` feature.
pub const TASK_0_USES_LOCK: bool = !cfg!(feature = "scenario-a");

// ---------------------------------------------------------------------------
// Bundled configuration
// ---------------------------------------------------------------------------

/// Every tunable of the demo in one value.
///
/// The firmware and the hosted binary use [`DemoConfig::DEFAULT`]; test
/// harnesses override individual fields with struct-update syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DemoConfig {
    pub time_hog_ms: u32,
    pub task_0_delay_ms: u32,
    pub task_1_delay_ms: u32,
    pub startup_delay_ms: u32,
    pub pin_0: u8,
    pub pin_1: u8,
    /// Core Task 0 is pinned to.
    pub task_0_core: usize,
    /// Core Task 1 is pinned to.
    pub task_1_core: usize,
    /// Core the bootstrap context runs on before it exits.
    pub boot_core: usize,
    pub priority: u8,
    pub stack_size: usize,
    pub task_0_uses_lock: bool,
}

impl DemoConfig {
    pub const DEFAULT: Self = Self {
        time_hog_ms: TIME_HOG_MS,
        task_0_delay_ms: TASK_0_DELAY_MS,
        task_1_delay_ms: TASK_1_DELAY_MS,
        startup_delay_ms: STARTUP_DELAY_MS,
        pin_0: PIN_0,
        pin_1: PIN_1,
        task_0_core: PRO_CPU_NUM,
        task_1_core: APP_CPU_NUM,
        boot_core: APP_CPU_NUM,
        priority: TASK_PRIORITY,
        stack_size: TASK_STACK_SIZE,
        task_0_uses_lock: TASK_0_USES_LOCK,
    };

    /// Upper bound on one Task 0 period under contention: its own sleep
    /// plus one full hold by Task 1.
    pub const fn worst_case_task_0_period_ms(&self) -> u32 {
        if self.task_0_uses_lock {
            self.task_0_delay_ms + self.time_hog_ms
        } else {
            self.task_0_delay_ms
        }
    }
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_constants() {
        let cfg = DemoConfig::default();
        assert_eq!(cfg.time_hog_ms, 1);
        assert_eq!(cfg.task_0_delay_ms, 30);
        assert_eq!(cfg.task_1_delay_ms, 100);
        assert_eq!((cfg.pin_0, cfg.pin_1), (22, 23));
        assert_ne!(cfg.task_0_core, cfg.task_1_core);
        assert_eq!(cfg.priority, 1);
    }

    #[test]
    fn worst_case_period_includes_hog_only_when_locked() {
        let locked = DemoConfig { task_0_uses_lock: true, time_hog_ms: 7, ..DemoConfig::DEFAULT };
        let unlocked = DemoConfig { task_0_uses_lock: false, ..locked };
        assert_eq!(locked.worst_case_task_0_period_ms(), 37);
        assert_eq!(unlocked.worst_case_task_0_period_ms(), 30);
    }
}

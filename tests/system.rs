//! The whole system through `Bootstrap`, with both lines captured.
//!
//! Periods are shortened so a run takes well under a second. Upper bounds
//! carry generous slack, since the host scheduler can only make things
//! later.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use dualcore_spinlock::arch::hosted::ArchInterrupt;
use dualcore_spinlock::config::DemoConfig;
use dualcore_spinlock::delay::{BusyWait, SleepDelay};
use dualcore_spinlock::kernel::Bootstrap;
use dualcore_spinlock::sync::SpinLock;
use dualcore_spinlock::trace::{RecordingLock, Trace};

type Lock = SpinLock<ArchInterrupt>;

const FAST: DemoConfig = DemoConfig {
    time_hog_ms: 2,
    task_0_delay_ms: 5,
    task_1_delay_ms: 12,
    startup_delay_ms: 0,
    task_0_uses_lock: true,
    ..DemoConfig::DEFAULT
};

fn max(intervals: &[Duration]) -> Duration {
    intervals.iter().copied().max().unwrap_or_default()
}

#[test]
fn bootstrap_leaves_exactly_two_units() {
    let system = Bootstrap::new(FAST, Arc::new(Lock::new())).start().unwrap();
    assert_eq!(system.units(), 2);

    thread::sleep(Duration::from_millis(50));
    let report = system.shutdown();
    assert!(report.task_0_iterations > 0);
    assert!(report.task_1_iterations > 0);
}

#[test]
fn critical_sections_never_overlap() {
    let lock = Arc::new(RecordingLock::new(Lock::new()));
    let system = Bootstrap::new(FAST, Arc::clone(&lock))
        .with_hog(BusyWait::calibrate())
        .start()
        .unwrap();

    thread::sleep(Duration::from_millis(300));
    system.shutdown();

    let sections = lock.sections();
    assert!(sections.iter().any(|s| s.core == Some(FAST.task_0_core)));
    assert!(sections.iter().any(|s| s.core == Some(FAST.task_1_core)));
    assert_eq!(lock.overlapping(), None);
    assert!(!lock.inner().is_locked());
}

#[test]
fn both_units_keep_making_progress() {
    let config = DemoConfig {
        time_hog_ms: 1,
        task_0_delay_ms: 10,
        task_1_delay_ms: 20,
        startup_delay_ms: 0,
        task_0_uses_lock: true,
        ..DemoConfig::DEFAULT
    };
    let run = Duration::from_millis(400);

    let system = Bootstrap::new(config, Arc::new(Lock::new()))
        .with_hog(BusyWait::calibrate())
        .start()
        .unwrap();
    thread::sleep(run);
    let report = system.shutdown();

    // Half the naive `run / longest period` bound leaves room for sleep
    // overshoot on a loaded host.
    let floor = run.as_millis() as u64 / u64::from(config.task_1_delay_ms) / 2;
    assert!(report.task_0_iterations >= floor, "{report:?}");
    assert!(report.task_1_iterations >= floor, "{report:?}");
}

#[test]
fn hog_pulse_width_and_gap() {
    let config = DemoConfig {
        time_hog_ms: 8,
        task_1_delay_ms: 20,
        ..FAST
    };
    let trace = Arc::new(Trace::new());

    let system = Bootstrap::new(config, Arc::new(Lock::new()))
        .with_hog(SleepDelay)
        .with_trace(Arc::clone(&trace))
        .start()
        .unwrap();
    thread::sleep(Duration::from_millis(300));
    system.shutdown();

    let high = trace.high_durations(config.pin_1);
    let low = trace.low_durations(config.pin_1);
    assert!(high.len() >= 3, "only {} pulses", high.len());
    assert!(high.iter().all(|d| *d >= Duration::from_millis(8)), "{high:?}");
    assert!(low.iter().all(|d| *d >= Duration::from_millis(20)), "{low:?}");
}

#[test]
fn busy_wait_pulse_tracks_time_hog() {
    let config = DemoConfig {
        task_0_uses_lock: false,
        time_hog_ms: 10,
        task_1_delay_ms: 20,
        ..FAST
    };
    let hog = Duration::from_millis(config.time_hog_ms.into());
    let trace = Arc::new(Trace::new());

    let system = Bootstrap::new(config, Arc::new(Lock::new()))
        .with_hog(BusyWait::calibrate())
        .with_trace(Arc::clone(&trace))
        .start()
        .unwrap();
    thread::sleep(Duration::from_millis(400));
    system.shutdown();

    let mut high = trace.high_durations(config.pin_1);
    assert!(high.len() >= 3, "only {} pulses", high.len());

    // The spin can be preempted, so bound the typical pulse, not each one.
    high.sort();
    let median = high[high.len() / 2];
    assert!(median >= hog / 2, "median pulse {median:?} for a {hog:?} hog");
    assert!(median <= hog * 4, "median pulse {median:?} for a {hog:?} hog");
}

#[test]
fn unlocked_task_0_period_ignores_hog() {
    let config = DemoConfig {
        task_0_uses_lock: false,
        time_hog_ms: 40,
        task_0_delay_ms: 5,
        task_1_delay_ms: 5,
        ..FAST
    };
    let lock = Arc::new(RecordingLock::new(Lock::new()));
    let trace = Arc::new(Trace::new());

    let system = Bootstrap::new(config, Arc::clone(&lock))
        .with_hog(SleepDelay)
        .with_trace(Arc::clone(&trace))
        .start()
        .unwrap();
    thread::sleep(Duration::from_millis(400));
    system.shutdown();

    // Only Task 1 ever took the lock.
    assert!(lock.sections().iter().all(|s| s.core == Some(config.task_1_core)));

    // Task 0 kept toggling while Task 1 spent most of the run inside the
    // critical section: far more edges than hog windows.
    let intervals = trace.toggle_intervals(config.pin_0);
    assert!(intervals.len() > 20, "only {} toggles", intervals.len());

    // No toggle ever waited out a hold.
    let hog = Duration::from_millis(config.time_hog_ms.into());
    assert!(max(&intervals) < hog, "longest Task 0 period {:?}", max(&intervals));
}

#[test]
fn locked_task_0_period_stretches_behind_hog() {
    let config = DemoConfig {
        task_0_uses_lock: true,
        time_hog_ms: 40,
        task_0_delay_ms: 5,
        task_1_delay_ms: 5,
        ..FAST
    };
    let trace = Arc::new(Trace::new());

    let system = Bootstrap::new(config, Arc::new(Lock::new()))
        .with_hog(SleepDelay)
        .with_trace(Arc::clone(&trace))
        .start()
        .unwrap();
    thread::sleep(Duration::from_millis(400));
    system.shutdown();

    // Task 1 holds the lock ~90 % of the time, so Task 0 collides with it
    // and waits out most of a 40 ms hold at least once.
    let intervals = trace.toggle_intervals(config.pin_0);
    assert!(!intervals.is_empty());
    assert!(
        max(&intervals) >= Duration::from_millis(20),
        "longest Task 0 period {:?}",
        max(&intervals)
    );

    // ... but never more than one hold on top of its own sleep.
    let worst = Duration::from_millis(config.worst_case_task_0_period_ms().into());
    let slack = Duration::from_millis(40);
    assert!(
        max(&intervals) <= worst + slack,
        "longest Task 0 period {:?}, bound {worst:?}",
        max(&intervals)
    );
}

//! # Periodic Units
//!
//! The two units of work of the demo. Each one owns an output line, shares
//! the lock with the other, and alternates between a critical section and
//! a voluntary sleep forever:
//!
//! ```text
//!   ┌──────┐      ┌──────────────────┐      ┌──────────────┐
//!   │ Init │ ───► │ critical section │ ───► │ sleep(period)│ ──┐
//!   └──────┘      └──────────────────┘      └──────────────┘   │
//!                          ▲                                   │
//!                          └───────────────────────────────────┘
//! ```
//!
//! | Unit | Core | Critical section | Sleep |
//! |------|------|------------------|-------|
//! | [`Toggler`] (Task 0) | 0 | read + invert the line | `task_0_delay` |
//! | [`Hog`] (Task 1) | 1 | raise, busy-wait `time_hog`, lower | `task_1_delay` |
//!
//! The lock is taken and released exactly once per iteration, never held
//! across the sleep.

use core::fmt::Debug;
use core::sync::atomic::{AtomicBool, Ordering};

use embedded_hal::blocking::delay::DelayMs;
use embedded_hal::digital::v2::{OutputPin, StatefulOutputPin};

use crate::sync::SharedLock;

// ---------------------------------------------------------------------------
// Task configuration
// ---------------------------------------------------------------------------

/// Where and how a unit is spawned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskConfig {
    pub name: &'static str,
    /// Core the unit is pinned to.
    pub core: usize,
    pub priority: u8,
    /// Requested stack size in bytes.
    pub stack_size: usize,
}

// ---------------------------------------------------------------------------
// Unit contract
// ---------------------------------------------------------------------------

/// A periodic unit of work.
pub trait PeriodicUnit {
    type Error: Debug;

    fn name(&self) -> &'static str;

    /// Put the output line into its initial state. Runs once.
    fn init(&mut self) -> Result<(), Self::Error>;

    /// One pass of the unit's protected work. The lock, when used, is
    /// released before this returns, on the error path too.
    fn critical(&mut self) -> Result<(), Self::Error>;

    /// Yield the core for one period.
    fn sleep(&mut self);

    /// One full iteration: critical section, then sleep.
    fn step(&mut self) -> Result<(), Self::Error> {
        let result = self.critical();
        self.sleep();
        result
    }

    /// Run forever. Errors are logged and the loop carries on.
    fn run(mut self) -> !
    where
        Self: Sized,
    {
        start(&mut self);
        loop {
            let result = self.critical();
            report(self.name(), result);
            self.sleep();
        }
    }

    /// Like [`PeriodicUnit::run`], but checks `stop` at every sleep
    /// boundary. Returns the number of completed iterations.
    fn run_until(&mut self, stop: &AtomicBool) -> u64 {
        start(self);
        let mut iterations = 0;
        while !stop.load(Ordering::Acquire) {
            let result = self.critical();
            report(self.name(), result);
            iterations += 1;
            self.sleep();
        }
        iterations
    }
}

fn start<U: PeriodicUnit + ?Sized>(unit: &mut U) {
    match unit.init() {
        Ok(()) => log::debug!("{}: output configured", unit.name()),
        Err(e) => log::warn!("{}: failed to configure output: {e:?}", unit.name()),
    }
}

fn report<E: Debug>(name: &str, result: Result<(), E>) {
    if let Err(e) = result {
        log::warn!("{name}: output write failed: {e:?}");
    }
}

fn toggle<P: StatefulOutputPin>(pin: &mut P) -> Result<(), P::Error> {
    if pin.is_set_high()? {
        pin.set_low()
    } else {
        pin.set_high()
    }
}

// ---------------------------------------------------------------------------
// Task 0: toggler
// ---------------------------------------------------------------------------

/// Task 0. Inverts its line once per period.
///
/// The critical section is a single read-modify-write: it exists to make
/// this unit a contender for the lock, not to protect anything.
pub struct Toggler<L, P, S> {
    lock: L,
    pin: P,
    sleep: S,
    period_ms: u32,
    uses_lock: bool,
}

impl<L, P, S> Toggler<L, P, S>
where
    L: SharedLock,
    P: StatefulOutputPin,
    S: DelayMs<u32>,
{
    pub fn new(lock: L, pin: P, sleep: S, period_ms: u32) -> Self {
        Self {
            lock,
            pin,
            sleep,
            period_ms,
            uses_lock: true,
        }
    }

    /// Whether the toggle is wrapped in the shared critical section.
    pub fn with_lock(mut self, uses_lock: bool) -> Self {
        self.uses_lock = uses_lock;
        self
    }

    pub fn pin(&self) -> &P {
        &self.pin
    }
}

impl<L, P, S> PeriodicUnit for Toggler<L, P, S>
where
    L: SharedLock,
    P: StatefulOutputPin,
    P::Error: Debug,
    S: DelayMs<u32>,
{
    type Error = P::Error;

    fn name(&self) -> &'static str {
        "Task 0"
    }

    fn init(&mut self) -> Result<(), P::Error> {
        self.pin.set_low()
    }

    fn critical(&mut self) -> Result<(), P::Error> {
        let pin = &mut self.pin;
        if self.uses_lock {
            self.lock.critical_section(|| toggle(pin))
        } else {
            toggle(pin)
        }
    }

    fn sleep(&mut self) {
        self.sleep.delay_ms(self.period_ms);
    }
}

// ---------------------------------------------------------------------------
// Task 1: hog
// ---------------------------------------------------------------------------

/// Task 1. Holds the lock across a long busy-wait.
///
/// The line is high for the whole hold, so its pulse width on a scope is
/// the time core 1 spent with its interrupts masked.
pub struct Hog<L, P, D, S> {
    lock: L,
    pin: P,
    hog: D,
    sleep: S,
    hog_ms: u32,
    period_ms: u32,
}

impl<L, P, D, S> Hog<L, P, D, S>
where
    L: SharedLock,
    P: OutputPin,
    D: DelayMs<u32>,
    S: DelayMs<u32>,
{
    pub fn new(lock: L, pin: P, hog: D, sleep: S, hog_ms: u32, period_ms: u32) -> Self {
        Self {
            lock,
            pin,
            hog,
            sleep,
            hog_ms,
            period_ms,
        }
    }

    pub fn pin(&self) -> &P {
        &self.pin
    }
}

impl<L, P, D, S> PeriodicUnit for Hog<L, P, D, S>
where
    L: SharedLock,
    P: OutputPin,
    P::Error: Debug,
    D: DelayMs<u32>,
    S: DelayMs<u32>,
{
    type Error = P::Error;

    fn name(&self) -> &'static str {
        "Task 1"
    }

    fn init(&mut self) -> Result<(), P::Error> {
        self.pin.set_low()
    }

    fn critical(&mut self) -> Result<(), P::Error> {
        let Self {
            lock,
            pin,
            hog,
            hog_ms,
            ..
        } = self;

        lock.critical_section(|| -> Result<(), P::Error> {
            pin.set_high()?;
            hog.delay_ms(*hog_ms);
            pin.set_low()
        })
    }

    fn sleep(&mut self) {
        self.sleep.delay_ms(self.period_ms);
    }
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Event {
        Acquire,
        Release,
        High,
        Low,
        Spin(u32),
        Sleep(u32),
    }

    type Log = Rc<RefCell<Vec<Event>>>;

    struct MockLock(Log);

    impl SharedLock for MockLock {
        fn acquire(&self) {
            self.0.borrow_mut().push(Event::Acquire);
        }

        fn release(&self) {
            self.0.borrow_mut().push(Event::Release);
        }
    }

    #[derive(Debug, PartialEq, Eq)]
    struct Broken;

    struct MockPin {
        log: Log,
        high: bool,
        fail: bool,
    }

    impl OutputPin for MockPin {
        type Error = Broken;

        fn set_low(&mut self) -> Result<(), Broken> {
            if self.fail {
                return Err(Broken);
            }
            self.high = false;
            self.log.borrow_mut().push(Event::Low);
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Broken> {
            if self.fail {
                return Err(Broken);
            }
            self.high = true;
            self.log.borrow_mut().push(Event::High);
            Ok(())
        }
    }

    impl StatefulOutputPin for MockPin {
        fn is_set_high(&self) -> Result<bool, Broken> {
            Ok(self.high)
        }

        fn is_set_low(&self) -> Result<bool, Broken> {
            Ok(!self.high)
        }
    }

    struct MockDelay {
        log: Log,
        spin: bool,
    }

    impl DelayMs<u32> for MockDelay {
        fn delay_ms(&mut self, ms: u32) {
            let event = if self.spin { Event::Spin(ms) } else { Event::Sleep(ms) };
            self.log.borrow_mut().push(event);
        }
    }

    fn parts(log: &Log) -> (MockLock, MockPin, MockDelay, MockDelay) {
        (
            MockLock(Rc::clone(log)),
            MockPin { log: Rc::clone(log), high: false, fail: false },
            MockDelay { log: Rc::clone(log), spin: true },
            MockDelay { log: Rc::clone(log), spin: false },
        )
    }

    #[test]
    fn toggler_inverts_under_lock_then_sleeps() {
        let log = Log::default();
        let (lock, pin, _, sleep) = parts(&log);
        let mut task = Toggler::new(lock, pin, sleep, 30);

        task.step().unwrap();
        task.step().unwrap();

        use Event::*;
        assert_eq!(
            *log.borrow(),
            [Acquire, High, Release, Sleep(30), Acquire, Low, Release, Sleep(30)]
        );
    }

    #[test]
    fn unlocked_toggler_never_touches_lock() {
        let log = Log::default();
        let (lock, pin, _, sleep) = parts(&log);
        let mut task = Toggler::new(lock, pin, sleep, 30).with_lock(false);

        task.step().unwrap();

        assert_eq!(*log.borrow(), [Event::High, Event::Sleep(30)]);
        assert!(task.pin().high);
    }

    #[test]
    fn hog_holds_lock_across_whole_pulse() {
        let log = Log::default();
        let (lock, pin, hog, sleep) = parts(&log);
        let mut task = Hog::new(lock, pin, hog, sleep, 1, 100);

        task.step().unwrap();

        use Event::*;
        assert_eq!(*log.borrow(), [Acquire, High, Spin(1), Low, Release, Sleep(100)]);
        assert!(!task.pin().high);
    }

    #[test]
    fn failed_write_still_releases_and_sleeps() {
        let log = Log::default();
        let (lock, mut pin, hog, sleep) = parts(&log);
        pin.fail = true;
        let mut task = Hog::new(lock, pin, hog, sleep, 5, 100);

        assert_eq!(task.step(), Err(Broken));

        use Event::*;
        assert_eq!(*log.borrow(), [Acquire, Release, Sleep(100)]);
    }

    #[test]
    fn stop_is_checked_at_sleep_boundary() {
        let log = Log::default();
        let (lock, pin, _, sleep) = parts(&log);
        let mut task = Toggler::new(lock, pin, sleep, 30);
        let stop = AtomicBool::new(true);

        assert_eq!(task.run_until(&stop), 0);
        assert_eq!(*log.borrow(), [Event::Low]);
    }
}

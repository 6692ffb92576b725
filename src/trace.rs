//! # Signal Capture
//!
//! What an oscilloscope shows on the board, captured in software on the
//! host:
//!
//! - [`SimPin`] is an `embedded-hal` output line. Every level change is
//!   logged at `trace` and, when the pin is attached to a [`Trace`],
//!   timestamped into a bounded buffer.
//! - [`RecordingLock`] wraps any [`SharedLock`] and records every critical
//!   section as (core, entered, left).
//!
//! Both share the same time origin semantics: durations since the capture
//! object was created.

use std::collections::VecDeque;
use std::convert::Infallible;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use embedded_hal::digital::v2::{OutputPin, StatefulOutputPin};

use crate::arch::hosted;
use crate::sync::SharedLock;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

// ---------------------------------------------------------------------------
// Edge capture
// ---------------------------------------------------------------------------

/// One level change of one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub pin: u8,
    pub high: bool,
    pub at: Duration,
}

/// Ring buffer of edges from any number of lines. The oldest edges are
/// dropped once `capacity` is reached.
pub struct Trace {
    origin: Instant,
    capacity: usize,
    edges: Mutex<VecDeque<Edge>>,
}

impl Trace {
    pub const DEFAULT_CAPACITY: usize = 4096;

    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            origin: Instant::now(),
            capacity: capacity.max(1),
            edges: Mutex::new(VecDeque::with_capacity(capacity.max(1))),
        }
    }

    fn record(&self, pin: u8, high: bool) {
        let at = self.origin.elapsed();
        let mut edges = lock(&self.edges);
        if edges.len() == self.capacity {
            edges.pop_front();
        }
        edges.push_back(Edge { pin, high, at });
    }

    /// Edges of `pin`, oldest first.
    pub fn edges(&self, pin: u8) -> Vec<Edge> {
        lock(&self.edges).iter().filter(|e| e.pin == pin).copied().collect()
    }

    /// Time between consecutive edges of `pin`. For a toggling line this is
    /// its period.
    pub fn toggle_intervals(&self, pin: u8) -> Vec<Duration> {
        self.edges(pin).windows(2).map(|w| w[1].at - w[0].at).collect()
    }

    /// Width of every complete high pulse of `pin`.
    pub fn high_durations(&self, pin: u8) -> Vec<Duration> {
        self.pulses(pin, true)
    }

    /// Width of every complete low gap of `pin`.
    pub fn low_durations(&self, pin: u8) -> Vec<Duration> {
        self.pulses(pin, false)
    }

    fn pulses(&self, pin: u8, level: bool) -> Vec<Duration> {
        self.edges(pin)
            .windows(2)
            .filter(|w| w[0].high == level && w[1].high != level)
            .map(|w| w[1].at - w[0].at)
            .collect()
    }
}

impl Default for Trace {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Simulated output line
// ---------------------------------------------------------------------------

/// A digital output line that exists only in memory.
pub struct SimPin {
    id: u8,
    high: bool,
    trace: Option<Arc<Trace>>,
}

impl SimPin {
    /// A line that starts low.
    pub fn new(id: u8) -> Self {
        Self {
            id,
            high: false,
            trace: None,
        }
    }

    /// A line whose edges are captured into `trace`.
    pub fn traced(id: u8, trace: Arc<Trace>) -> Self {
        Self {
            trace: Some(trace),
            ..Self::new(id)
        }
    }

    pub fn is_high(&self) -> bool {
        self.high
    }

    fn drive(&mut self, high: bool) {
        if self.high == high {
            return;
        }
        self.high = high;
        log::trace!("pin {} {}", self.id, if high { "high" } else { "low" });
        if let Some(trace) = &self.trace {
            trace.record(self.id, high);
        }
    }
}

impl OutputPin for SimPin {
    type Error = Infallible;

    fn set_low(&mut self) -> Result<(), Infallible> {
        self.drive(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.drive(true);
        Ok(())
    }
}

impl StatefulOutputPin for SimPin {
    fn is_set_high(&self) -> Result<bool, Infallible> {
        Ok(self.high)
    }

    fn is_set_low(&self) -> Result<bool, Infallible> {
        Ok(!self.high)
    }
}

// ---------------------------------------------------------------------------
// Critical-section capture
// ---------------------------------------------------------------------------

/// One completed critical section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Section {
    /// Core of the holder, if it was a pinned unit.
    pub core: Option<usize>,
    pub entered: Duration,
    pub left: Duration,
}

/// A [`SharedLock`] that records when each holder entered and left.
///
/// Timestamps are taken while the inner lock is held, so with a correct
/// inner lock no two recorded sections can overlap.
pub struct RecordingLock<L> {
    inner: L,
    origin: Instant,
    open: Mutex<Option<(Option<usize>, Duration)>>,
    sections: Mutex<Vec<Section>>,
}

impl<L: SharedLock> RecordingLock<L> {
    pub fn new(inner: L) -> Self {
        Self {
            inner,
            origin: Instant::now(),
            open: Mutex::new(None),
            sections: Mutex::new(Vec::new()),
        }
    }

    pub fn inner(&self) -> &L {
        &self.inner
    }

    /// Completed sections in the order they were left.
    pub fn sections(&self) -> Vec<Section> {
        lock(&self.sections).clone()
    }

    /// The first pair of sections that overlap in time, if any.
    pub fn overlapping(&self) -> Option<(Section, Section)> {
        let mut sections = self.sections();
        sections.sort_by_key(|s| s.entered);
        sections
            .windows(2)
            .find(|w| w[1].entered < w[0].left)
            .map(|w| (w[0], w[1]))
    }
}

impl<L: SharedLock> SharedLock for RecordingLock<L> {
    fn acquire(&self) {
        self.inner.acquire();
        *lock(&self.open) = Some((hosted::cpu_id(), self.origin.elapsed()));
    }

    fn release(&self) {
        let left = self.origin.elapsed();
        if let Some((core, entered)) = lock(&self.open).take() {
            lock(&self.sections).push(Section { core, entered, left });
        }
        self.inner.release();
    }
}

//! Timers driving the worker: the fixed-cadence simulation clock and the
//! display link that paces rendering.
//!
//! Both are polled with an explicit `now` so the worker's event loop can
//! multiplex them on one thread, and so they can be tested without sleeping.

use std::time::{Duration, Instant};

/// Opaque token identifying one started run of a [`SimulationClock`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClockHandle(u64);

#[derive(Debug)]
struct ActiveTimer {
    handle: ClockHandle,
    deadline: Instant,
}

/// Periodic driver for the automaton's step operation.
///
/// At most one timer is active. Starting while running cancels the previous
/// timer first. Ticks that fall due while the worker is busy are dropped
/// rather than replayed.
#[derive(Debug)]
pub struct SimulationClock {
    interval: Duration,
    active: Option<ActiveTimer>,
    next_handle: u64,
    ticks: u64,
}

impl SimulationClock {
    /// Longest interval accepted by [`Self::from_millis`].
    pub const MAX_INTERVAL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

    /// Create a stopped clock.
    ///
    /// # Panics
    /// Panics if `interval` is zero.
    pub fn new(interval: Duration) -> Self {
        assert!(!interval.is_zero(), "clock interval must be non-zero");
        Self {
            interval,
            active: None,
            next_handle: 0,
            ticks: 0,
        }
    }

    /// Create a stopped clock from an interval in milliseconds.
    ///
    /// The interval is clamped between 1ns and [`Self::MAX_INTERVAL`].
    pub fn from_millis(interval_ms: f64) -> Self {
        let interval =
            Duration::try_from_secs_f64(interval_ms / 1000.0).unwrap_or(Self::MAX_INTERVAL);
        Self::new(interval.clamp(Duration::from_nanos(1), Self::MAX_INTERVAL))
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// (Re)start from zero phase: the first tick is due one interval after `now`.
    pub fn start(&mut self, now: Instant) -> ClockHandle {
        if let Some(previous) = self.active.take() {
            log::trace!("Restarting simulation clock, cancelled {:?}", previous.handle);
        }
        let handle = ClockHandle(self.next_handle);
        self.next_handle += 1;
        self.active = Some(ActiveTimer {
            handle,
            deadline: now + self.interval,
        });
        handle
    }

    /// Cancel the running timer, if any.
    pub fn stop(&mut self) -> Option<ClockHandle> {
        self.active.take().map(|timer| timer.handle)
    }

    /// Cancel the timer only if `handle` is the one currently running.
    pub fn cancel(&mut self, handle: ClockHandle) -> bool {
        if self.handle() == Some(handle) {
            self.active = None;
            true
        } else {
            false
        }
    }

    pub fn is_running(&self) -> bool {
        self.active.is_some()
    }

    /// Number of live periodic timers; always 0 or 1.
    pub fn active_timers(&self) -> usize {
        usize::from(self.active.is_some())
    }

    pub fn handle(&self) -> Option<ClockHandle> {
        self.active.as_ref().map(|timer| timer.handle)
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.active.as_ref().map(|timer| timer.deadline)
    }

    /// Total ticks fired since construction.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Report whether a tick is due at `now`, advancing the schedule if so.
    pub fn poll(&mut self, now: Instant) -> bool {
        let interval = self.interval;
        let Some(timer) = self.active.as_mut() else {
            return false;
        };
        if now < timer.deadline {
            return false;
        }

        timer.deadline = next_deadline(timer.deadline, interval, now);
        self.ticks += 1;
        true
    }
}

/// Per-display-frame signal for the render loop.
///
/// Fires at most once per refresh interval; refreshes missed while the
/// worker was busy are skipped.
#[derive(Debug)]
pub struct DisplayLink {
    interval: Duration,
    deadline: Instant,
    frames: u64,
}

impl DisplayLink {
    /// Default refresh interval (60 Hz).
    pub const DEFAULT_INTERVAL: Duration = Duration::from_nanos(1_000_000_000 / 60);

    /// Create a link whose first frame is due immediately.
    ///
    /// # Panics
    /// Panics if `interval` is zero.
    pub fn new(interval: Duration, now: Instant) -> Self {
        assert!(!interval.is_zero(), "refresh interval must be non-zero");
        Self {
            interval,
            deadline: now,
            frames: 0,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn next_deadline(&self) -> Instant {
        self.deadline
    }

    /// Frames signalled since construction.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Report whether a frame is due at `now`.
    pub fn poll(&mut self, now: Instant) -> bool {
        if now < self.deadline {
            return false;
        }
        self.deadline = next_deadline(self.deadline, self.interval, now);
        self.frames += 1;
        true
    }
}

/// Keep the cadence when on time; restart the phase from `now` when behind.
fn next_deadline(deadline: Instant, interval: Duration, now: Instant) -> Instant {
    let next = deadline + interval;
    if next <= now { now + interval } else { next }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS: Duration = Duration::from_millis(1);

    #[test]
    fn test_stopped_clock_never_fires() {
        let mut clock = SimulationClock::new(10 * MS);
        let t0 = Instant::now();
        assert!(!clock.poll(t0 + 100 * MS));
        assert_eq!(clock.active_timers(), 0);
        assert_eq!(clock.next_deadline(), None);
    }

    #[test]
    fn test_fires_on_cadence() {
        let mut clock = SimulationClock::new(10 * MS);
        let t0 = Instant::now();
        clock.start(t0);

        assert!(!clock.poll(t0 + 9 * MS));
        assert!(clock.poll(t0 + 10 * MS));
        assert!(!clock.poll(t0 + 15 * MS));
        assert!(clock.poll(t0 + 21 * MS));
        assert_eq!(clock.next_deadline(), Some(t0 + 30 * MS));
        assert_eq!(clock.ticks(), 2);
    }

    #[test]
    fn test_missed_ticks_are_dropped() {
        let mut clock = SimulationClock::new(10 * MS);
        let t0 = Instant::now();
        clock.start(t0);

        // 10 intervals late: one tick, then the phase restarts from now.
        assert!(clock.poll(t0 + 105 * MS));
        assert!(!clock.poll(t0 + 106 * MS));
        assert_eq!(clock.next_deadline(), Some(t0 + 115 * MS));
        assert_eq!(clock.ticks(), 1);
    }

    #[test]
    fn test_restart_cancels_previous_timer() {
        let mut clock = SimulationClock::new(10 * MS);
        let t0 = Instant::now();
        let first = clock.start(t0);
        let second = clock.start(t0 + 5 * MS);

        assert_ne!(first, second);
        assert_eq!(clock.active_timers(), 1);
        assert_eq!(clock.handle(), Some(second));
        assert!(!clock.cancel(first));
        // Zero phase relative to the restart.
        assert!(!clock.poll(t0 + 10 * MS));
        assert!(clock.poll(t0 + 15 * MS));
    }

    #[test]
    fn test_pause_resume_twice_leaves_one_timer() {
        let mut clock = SimulationClock::new(10 * MS);
        let t0 = Instant::now();
        clock.start(t0);

        for _ in 0..2 {
            clock.stop();
            assert_eq!(clock.active_timers(), 0);
            clock.start(t0);
        }
        assert_eq!(clock.active_timers(), 1);

        // Resume twice without a pause in between is still one timer.
        clock.start(t0);
        clock.start(t0);
        assert_eq!(clock.active_timers(), 1);
    }

    #[test]
    fn test_cancel_by_handle() {
        let mut clock = SimulationClock::from_millis(1000.0 / 60.0);
        let handle = clock.start(Instant::now());
        assert!(clock.cancel(handle));
        assert!(!clock.is_running());
        assert!(!clock.cancel(handle));
    }

    #[test]
    fn test_display_link_first_frame_immediate() {
        let t0 = Instant::now();
        let mut link = DisplayLink::new(16 * MS, t0);
        assert!(link.poll(t0));
        assert!(!link.poll(t0 + 15 * MS));
        assert!(link.poll(t0 + 16 * MS));
        // Stalled for several refreshes: one frame, no burst.
        assert!(link.poll(t0 + 100 * MS));
        assert!(!link.poll(t0 + 101 * MS));
        assert_eq!(link.frames(), 3);
    }
}

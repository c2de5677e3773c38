//! Clock abstraction for deterministic gaze scheduling.
//!
//! The live backend relies on calloop timers. The replay driver asks a
//! `Clock` instead, so tests can step time by hand with `ManualClock`
//! while `--backend replay` runs the same script on `SystemClock`.

use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Trait abstracting time sources for testability.
pub trait Clock: Send + Sync {
    /// Returns the current monotonic instant.
    fn now(&self) -> Instant;

    /// Let `duration` pass on this clock.
    fn sleep(&self, duration: Duration);
}

/// Production clock using real system time.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Clock that only moves when told to.
pub struct ManualClock {
    instant: Mutex<Instant>,
}

impl ManualClock {
    /// Create a manual clock frozen at the current real time.
    pub fn new() -> Self {
        Self {
            instant: Mutex::new(Instant::now()),
        }
    }

    /// Advance time by the given duration.
    pub fn advance(&self, duration: Duration) {
        let mut inst = self.instant.lock().unwrap_or_else(|e| e.into_inner());
        *inst += duration;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.instant.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn sleep(&self, duration: Duration) {
        self.advance(duration);
    }
}

/// Fixed-cadence tick schedule driven by a [`Clock`].
#[derive(Debug, Clone, Copy)]
pub struct TickSchedule {
    interval: Duration,
    next: Instant,
}

impl TickSchedule {
    /// First tick is due one interval after `start`.
    pub fn new(start: Instant, interval: Duration) -> Self {
        Self {
            interval,
            next: start + interval,
        }
    }

    /// Number of ticks that have come due by `now`, consuming them.
    pub fn due(&mut self, now: Instant) -> u32 {
        if self.interval.is_zero() {
            return 0;
        }
        let mut count = 0;
        while self.next <= now {
            self.next += self.interval;
            count += 1;
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_system_clock_monotonic() {
        let clock = SystemClock;
        let now = clock.now();
        assert!(clock.now() >= now);
    }

    #[test]
    fn test_manual_clock_advance() {
        let clock = ManualClock::new();
        let t0 = clock.now();
        clock.advance(Duration::from_secs(5));
        assert_eq!(clock.now() - t0, Duration::from_secs(5));
    }

    #[test]
    fn test_manual_clock_frozen() {
        let clock = ManualClock::new();
        let t0 = clock.now();
        std::thread::sleep(Duration::from_millis(2));
        assert_eq!(clock.now(), t0);
    }

    #[test]
    fn test_clock_trait_object() {
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::new());
        let t0 = clock.now();
        clock.sleep(Duration::from_millis(250));
        assert_eq!(clock.now() - t0, Duration::from_millis(250));
    }

    #[test]
    fn test_tick_schedule_counts() {
        let clock = ManualClock::new();
        let mut schedule = TickSchedule::new(clock.now(), Duration::from_millis(33));
        assert_eq!(schedule.due(clock.now()), 0);

        clock.advance(Duration::from_millis(32));
        assert_eq!(schedule.due(clock.now()), 0);

        clock.advance(Duration::from_millis(1));
        assert_eq!(schedule.due(clock.now()), 1);

        clock.advance(Duration::from_millis(100));
        assert_eq!(schedule.due(clock.now()), 3);
        assert_eq!(schedule.due(clock.now()), 0);
    }

    #[test]
    fn test_tick_schedule_zero_interval() {
        let clock = ManualClock::new();
        let mut schedule = TickSchedule::new(clock.now(), Duration::ZERO);
        clock.advance(Duration::from_secs(1));
        assert_eq!(schedule.due(clock.now()), 0);
    }
}

//! Redraw scheduler
//!
//! Holds at most one pending tick. Ticks are aligned to multiples of the
//! update rate on the wall clock rather than spaced by a fixed interval,
//! which keeps the separator blink in phase with real seconds.

use crate::fmt::debug;

/// A scheduled redraw
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PendingTick {
    /// Wall-clock time the tick is due, in ms since the epoch
    pub due_millis: i64,
    /// Identifies this tick; older generations are cancelled
    pub generation: u32,
}

impl PendingTick {
    /// Milliseconds left until the tick is due, never negative
    pub fn remaining(&self, now_millis: i64) -> u64 {
        (self.due_millis - now_millis).max(0) as u64
    }
}

/// Delay from `now_millis` to the next multiple of `rate_ms`
///
/// Rates below 1 ms are treated as 1 ms.
pub fn delay_to_next_boundary(now_millis: i64, rate_ms: i64) -> i64 {
    let rate_ms = rate_ms.max(1);
    rate_ms - now_millis.rem_euclid(rate_ms)
}

/// Single-timer redraw scheduler
#[derive(Debug)]
pub struct RedrawScheduler {
    rate_ms: i64,
    pending: Option<PendingTick>,
    generation: u32,
}

impl RedrawScheduler {
    pub fn new(rate_ms: i64) -> Self {
        Self {
            rate_ms: rate_ms.max(1),
            pending: None,
            generation: 0,
        }
    }

    /// Currently pending tick, if the scheduler is running
    pub fn pending(&self) -> Option<PendingTick> {
        self.pending
    }

    pub fn is_running(&self) -> bool {
        self.pending.is_some()
    }

    /// Drop any pending tick
    pub fn cancel(&mut self) {
        if self.pending.take().is_some() {
            debug!("Redraw timer cancelled");
        }
        self.generation = self.generation.wrapping_add(1);
    }

    /// Stop or start the timer depending on `should_run`
    ///
    /// Always cancels first, so calling this repeatedly never leaves more
    /// than one tick pending. A started timer fires immediately.
    pub fn update(&mut self, should_run: bool, now_millis: i64) {
        self.cancel();
        if should_run {
            self.schedule_at(now_millis);
        }
    }

    /// Consume a fired tick
    ///
    /// Returns `false` for ticks that were cancelled in the meantime. For a
    /// current tick, schedules the next one on the following boundary when
    /// `should_run` still holds.
    pub fn fire(&mut self, generation: u32, should_run: bool, now_millis: i64) -> bool {
        match self.pending {
            Some(tick) if tick.generation == generation => {}
            _ => {
                debug!("Ignoring stale redraw tick {}", generation);
                return false;
            }
        }

        self.pending = None;
        if should_run {
            let delay = delay_to_next_boundary(now_millis, self.rate_ms);
            self.schedule_at(now_millis + delay);
        }
        true
    }

    fn schedule_at(&mut self, due_millis: i64) {
        self.pending = Some(PendingTick {
            due_millis,
            generation: self.generation,
        });
    }
}

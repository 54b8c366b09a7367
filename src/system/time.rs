//! Time keeping module for PineTime
//!
//! The RTC only counts time since boot. Wall-clock time is a reference point
//! (epoch milliseconds at a known `Instant`) that the phone refreshes through
//! the Current Time Service.

use core::cell::RefCell;

use chrono::{FixedOffset, NaiveDateTime};
use embassy_sync::blocking_mutex::{raw::CriticalSectionRawMutex, Mutex};
use embassy_time::Instant;
use sunshine_face::Clock;

use super::config::UTC_OFFSET_SECS;

// Include the build time as the initial reference
include!(concat!(env!("OUT_DIR"), "/utc.rs"));

/// Shared by the BLE task (writer) and the face task (reader)
static TIME: Mutex<CriticalSectionRawMutex, RefCell<TimeManager>> =
    Mutex::new(RefCell::new(TimeManager::init()));

pub struct TimeReference {
    /// Wall-clock time in ms since the Unix epoch
    millis: i64,
    /// Related system time
    instant: Instant,
}

impl TimeReference {
    /// Reference taken now for a UTC timestamp
    pub fn now(millis: i64) -> Self {
        Self {
            millis,
            instant: Instant::now(),
        }
    }
}

pub struct TimeManager {
    reference: TimeReference,
    /// Offset of the phone's local time in seconds, used to interpret CTS writes
    offset_secs: i32,
}

impl TimeManager {
    /// Initialize time measurement on boot
    pub const fn init() -> Self {
        Self {
            reference: TimeReference {
                millis: UTC_EPOCH_MILLIS,
                instant: Instant::from_ticks(0),
            },
            offset_secs: UTC_OFFSET_SECS,
        }
    }

    /// Current time in ms since the Unix epoch
    pub fn now_millis(&self) -> i64 {
        let elapsed = Instant::now().duration_since(self.reference.instant);
        self.reference.millis + elapsed.as_millis() as i64
    }

    /// Update the reference from a local time written by the phone
    pub fn set_local_time(&mut self, local: NaiveDateTime) {
        let utc = local.and_utc().timestamp_millis() - self.offset_secs as i64 * 1000;
        self.reference = TimeReference::now(utc);
    }

    pub fn set_offset(&mut self, offset: FixedOffset) {
        self.offset_secs = offset.local_minus_utc();
    }
}

/// Apply a Current Time characteristic write
pub fn set_local_time(local: NaiveDateTime) {
    TIME.lock(|time| time.borrow_mut().set_local_time(local));
    defmt::info!("Clock set to {}", defmt::Display2Format(&local));
}

/// Apply a Local Time Information characteristic write
pub fn set_offset(offset: FixedOffset) {
    TIME.lock(|time| time.borrow_mut().set_offset(offset));
}

/// Wall clock handed to the face engine
#[derive(Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        TIME.lock(|time| time.borrow().now_millis())
    }
}

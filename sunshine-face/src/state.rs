//! Display state owned by the engine

use chrono::{FixedOffset, NaiveDateTime};
use embedded_graphics::geometry::Point;

use crate::clock::local_time;
use crate::config::Capabilities;

/// Surface size and shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Geometry {
    pub width: u32,
    pub height: u32,
    pub round: bool,
}

impl Geometry {
    pub fn center(&self) -> Point {
        Point::new(self.width as i32 / 2, self.height as i32 / 2)
    }
}

/// Everything the render pass needs besides the weather
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayState {
    /// Wall clock at the last refresh, ms since the epoch
    pub now_millis: i64,
    pub utc_offset: FixedOffset,
    /// Local time derived from `now_millis` and `utc_offset`
    pub local: NaiveDateTime,
    pub ambient: bool,
    pub visible: bool,
    /// Whether the hour/minute separator is drawn this frame
    pub show_separator: bool,
    /// Completed taps since the face started
    pub tap_count: u32,
    pub capabilities: Capabilities,
    pub geometry: Geometry,
}

impl DisplayState {
    pub fn new(capabilities: Capabilities, geometry: Geometry, utc_offset: FixedOffset) -> Self {
        Self {
            now_millis: 0,
            utc_offset,
            local: local_time(0, utc_offset),
            ambient: false,
            visible: false,
            show_separator: true,
            tap_count: 0,
            capabilities,
            geometry,
        }
    }

    /// Redraw ticks are only wanted while shown in interactive mode
    pub fn should_tick(&self) -> bool {
        self.visible && !self.ambient
    }

    pub fn set_time(&mut self, now_millis: i64) {
        self.now_millis = now_millis;
        self.local = local_time(now_millis, self.utc_offset);
    }
}

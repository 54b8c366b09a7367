//! Side button of the PineTime

use debouncr::{debounce_2, Debouncer, Edge, Repeat2};
use embassy_nrf::{
    gpio::{Input, Output},
    peripherals::{P0_13, P0_15},
};
use embassy_time::{Duration, Timer};

/// Polled push button
///
/// The button is only powered while it is sampled.
pub struct Button<'a> {
    /// Button detection pin (high/low)
    pin: Input<'a, P0_13>,
    /// Button enable pin
    enable: Output<'a, P0_15>,
    debouncer: Debouncer<u8, Repeat2>,
}

impl<'a> Button<'a> {
    pub fn init(pin: Input<'a, P0_13>, enable: Output<'a, P0_15>) -> Self {
        Self {
            pin,
            enable,
            debouncer: debounce_2(false),
        }
    }

    /// Sample the button once, returning `true` on a debounced press
    pub async fn pressed(&mut self) -> bool {
        self.enable.set_high();
        // The button needs a short time to give stable outputs
        Timer::after(Duration::from_micros(1)).await;

        let edge = self.debouncer.update(self.pin.is_high());

        // Button consumes around 34µA when P0.15 is left high.
        // To reduce current consumption, set it low most of the time.
        self.enable.set_low();

        edge == Some(Edge::Rising)
    }
}

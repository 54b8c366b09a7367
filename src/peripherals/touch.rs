//! Touch controller module for PineTime

pub use cst816s::{TouchEvent, TouchGesture};

use cst816s::CST816S;
use embassy_nrf::{
    gpio::{Input, Output},
    peripherals::{P0_10, P0_28},
    twim::{self, Twim},
};
use embassy_time::Delay;

/// CST816S touch panel on the shared TWI bus
pub struct TouchController<'a, TWI>
where
    TWI: twim::Instance,
{
    touchpad: CST816S<Twim<'a, TWI>, Input<'a, P0_28>, Output<'a, P0_10>>,
}

impl<'a, TWI> TouchController<'a, TWI>
where
    TWI: twim::Instance,
{
    /// Reset and configure the touch panel
    pub fn init(
        twi: Twim<'a, TWI>,
        interrupt_pin: Input<'a, P0_28>,
        reset_pin: Output<'a, P0_10>,
    ) -> Result<Self, Error> {
        let mut touchpad = CST816S::new(twi, interrupt_pin, reset_pin);
        touchpad.setup(&mut Delay).map_err(|_| Error::Setup)?;
        Ok(Self { touchpad })
    }

    /// Check for a new touch event
    pub fn try_event_detected(&mut self) -> Option<TouchEvent> {
        self.touchpad.read_one_touch_event(true)
    }
}

#[derive(Debug, defmt::Format)]
pub enum Error {
    Setup,
}

//! Watch face host
//!
//! Drives the face engine from the event queue and its redraw timer, and
//! puts the rendered frames on the LCD.

use embassy_futures::select::{select, Either};
use embassy_nrf::spim;
use embassy_sync::blocking_mutex::raw::ThreadModeRawMutex;
use embassy_time::Timer;
use sunshine_face::{Engine, FaceEvent};

use crate::{
    peripherals::{backlight::Backlight, display::Display},
    system::{
        config::{AMBIENT_BRIGHTNESS, INTERACTIVE_BRIGHTNESS},
        time::SystemClock,
    },
    FACE_EVENTS, LINK,
};

pub type FaceEngine = Engine<'static, SystemClock, ThreadModeRawMutex>;

pub struct WatchFace<'a, SPI>
where
    SPI: spim::Instance,
{
    engine: FaceEngine,
    display: Display<'a, SPI>,
    backlight: Backlight<'a>,
}

impl<'a, SPI> WatchFace<'a, SPI>
where
    SPI: spim::Instance,
{
    pub fn new(engine: FaceEngine, display: Display<'a, SPI>, backlight: Backlight<'a>) -> Self {
        Self {
            engine,
            display,
            backlight,
        }
    }

    /// Serve face events and redraw ticks forever
    pub async fn run(&mut self) -> ! {
        loop {
            let Some(tick) = self.engine.pending_tick() else {
                let event = FACE_EVENTS.receive().await;
                self.handle(event);
                continue;
            };

            let delay = tick.remaining(self.engine.now_millis());
            match select(FACE_EVENTS.receive(), Timer::after_millis(delay)).await {
                Either::First(event) => self.handle(event),
                Either::Second(()) => {
                    if self.engine.on_tick(tick.generation) {
                        self.redraw();
                    }
                }
            }
        }
    }

    fn handle(&mut self, event: FaceEvent) {
        let response = self.engine.handle(event);
        if let Some(command) = response.link {
            LINK.signal(command);
        }
        if matches!(
            event,
            FaceEvent::VisibilityChanged(_) | FaceEvent::AmbientModeChanged(_) | FaceEvent::Destroy
        ) {
            self.update_backlight(event == FaceEvent::Destroy);
        }
        if response.redraw {
            self.redraw();
        }
    }

    fn redraw(&mut self) {
        // Nothing to see with the backlight off
        if !self.engine.state().visible {
            return;
        }
        let frame = self.engine.frame();
        if let Err(err) = self.display.draw(&frame) {
            defmt::warn!("Failed to draw frame: {}", err);
        }
    }

    fn update_backlight(&mut self, off: bool) {
        let state = self.engine.state();
        let level = if off || !state.visible {
            0
        } else if state.ambient {
            AMBIENT_BRIGHTNESS
        } else {
            INTERACTIVE_BRIGHTNESS
        };
        if self.backlight.brightness() == level {
            return;
        }
        if let Err(err) = self.backlight.set(level) {
            defmt::warn!("Failed to set backlight: {}", err);
        }
    }
}

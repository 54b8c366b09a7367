//! Display engine
//!
//! Owns the display state and the redraw scheduler. The host feeds it
//! lifecycle events through [`Engine::handle`], fires scheduled ticks
//! through [`Engine::on_tick`] and asks for a [`Frame`] whenever a redraw
//! is due.

use chrono::{Offset, Utc};
use embassy_sync::blocking_mutex::raw::RawMutex;

use crate::{
    clock::{utc_offset, Clock},
    config::{Capabilities, FaceConfig},
    fmt::{debug, info, warn},
    palette::Palette,
    render::{render, Frame},
    scheduler::{PendingTick, RedrawScheduler},
    state::{DisplayState, Geometry},
    weather::WeatherCell,
};

/// Kind of touch reported with a tap event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TapKind {
    /// Finger went down
    Touch,
    /// Gesture turned into something else
    TouchCancel,
    /// Completed tap
    Tap,
}

/// Lifecycle events delivered by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FaceEvent {
    VisibilityChanged(bool),
    AmbientModeChanged(bool),
    PropertiesChanged(Capabilities),
    SurfaceChanged { width: u32, height: u32 },
    InsetsChanged { round: bool },
    Tap { kind: TapKind, x: i32, y: i32, time: u64 },
    /// Periodic tick, once a minute
    TimeTick,
    TimeZoneChanged { offset_secs: i32 },
    /// The reconciler swapped in a new weather snapshot
    WeatherUpdated,
    Destroy,
}

/// Request to the data layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkCommand {
    Connect,
    Disconnect,
}

/// What the host has to do after an event
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Response {
    /// Run a render pass
    pub redraw: bool,
    pub link: Option<LinkCommand>,
}

impl Response {
    const NONE: Self = Self {
        redraw: false,
        link: None,
    };

    const REDRAW: Self = Self {
        redraw: true,
        link: None,
    };
}

/// Whether the separator is lit at `now_millis`: first half of each second
pub fn separator_visible(now_millis: i64) -> bool {
    now_millis.rem_euclid(1000) < 500
}

pub struct Engine<'a, C: Clock, M: RawMutex> {
    clock: C,
    config: FaceConfig,
    state: DisplayState,
    palette: Palette,
    scheduler: RedrawScheduler,
    weather: &'a WeatherCell<M>,
}

impl<'a, C: Clock, M: RawMutex> Engine<'a, C, M> {
    /// Create the engine, hidden and in interactive mode
    pub fn new(config: FaceConfig, clock: C, weather: &'a WeatherCell<M>) -> Self {
        let offset = utc_offset(config.utc_offset_secs).unwrap_or_else(|err| {
            warn!("Configured {}, using UTC", err);
            Utc.fix()
        });
        let geometry = Geometry {
            width: config.width,
            height: config.height,
            round: false,
        };
        let mut state = DisplayState::new(config.capabilities, geometry, offset);
        state.set_time(clock.now_millis());

        Self {
            palette: Palette::resolve(&config.theme, false, config.capabilities),
            scheduler: RedrawScheduler::new(config.interactive_update_rate_ms),
            clock,
            config,
            state,
            weather,
        }
    }

    pub fn state(&self) -> &DisplayState {
        &self.state
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    /// The scheduled redraw, if interactive ticking is on
    pub fn pending_tick(&self) -> Option<PendingTick> {
        self.scheduler.pending()
    }

    pub fn is_ticking(&self) -> bool {
        self.scheduler.is_running()
    }

    pub fn now_millis(&self) -> i64 {
        self.clock.now_millis()
    }

    /// Dispatch a lifecycle event
    pub fn handle(&mut self, event: FaceEvent) -> Response {
        match event {
            FaceEvent::VisibilityChanged(visible) => self.on_visibility_changed(visible),
            FaceEvent::AmbientModeChanged(ambient) => self.on_ambient_mode_changed(ambient),
            FaceEvent::PropertiesChanged(capabilities) => {
                self.state.capabilities = capabilities;
                self.resolve_palette();
                // Only the ambient palette depends on the capabilities
                if self.state.ambient {
                    Response::REDRAW
                } else {
                    Response::NONE
                }
            }
            FaceEvent::SurfaceChanged { width, height } => {
                self.state.geometry.width = width;
                self.state.geometry.height = height;
                Response::NONE
            }
            FaceEvent::InsetsChanged { round } => {
                self.state.geometry.round = round;
                Response::NONE
            }
            FaceEvent::Tap { kind, .. } => {
                if kind == TapKind::Tap {
                    self.state.tap_count = self.state.tap_count.wrapping_add(1);
                }
                Response::REDRAW
            }
            FaceEvent::TimeTick | FaceEvent::WeatherUpdated => Response::REDRAW,
            FaceEvent::TimeZoneChanged { offset_secs } => match utc_offset(offset_secs) {
                Ok(offset) => {
                    self.state.utc_offset = offset;
                    self.state.set_time(self.clock.now_millis());
                    Response::REDRAW
                }
                Err(err) => {
                    warn!("Ignoring time zone change: {}", err);
                    Response::NONE
                }
            },
            FaceEvent::Destroy => {
                self.scheduler.cancel();
                Response {
                    redraw: false,
                    link: Some(LinkCommand::Disconnect),
                }
            }
        }
    }

    fn on_visibility_changed(&mut self, visible: bool) -> Response {
        info!("Face {}", if visible { "visible" } else { "hidden" });
        self.state.visible = visible;

        let link = if visible {
            // Time may have jumped while hidden
            self.state.set_time(self.clock.now_millis());
            LinkCommand::Connect
        } else {
            LinkCommand::Disconnect
        };
        self.update_timer();

        Response {
            redraw: visible,
            link: Some(link),
        }
    }

    fn on_ambient_mode_changed(&mut self, ambient: bool) -> Response {
        let changed = self.state.ambient != ambient;
        if changed {
            info!("Entering {} mode", if ambient { "ambient" } else { "interactive" });
            self.state.ambient = ambient;
            self.resolve_palette();
        }
        self.update_timer();

        Response {
            redraw: changed,
            link: None,
        }
    }

    fn resolve_palette(&mut self) {
        self.palette = Palette::resolve(
            &self.config.theme,
            self.state.ambient,
            self.state.capabilities,
        );
    }

    /// Start or stop ticking to match visibility and mode
    fn update_timer(&mut self) {
        let should_tick = self.state.should_tick();
        self.scheduler
            .update(should_tick, self.clock.now_millis());
        debug!("Redraw timer {}", if should_tick { "running" } else { "stopped" });
    }

    /// A scheduled tick fired
    ///
    /// Returns `true` when the host should run a render pass. Cancelled
    /// ticks return `false`.
    pub fn on_tick(&mut self, generation: u32) -> bool {
        let should_tick = self.state.should_tick();
        self.scheduler
            .fire(generation, should_tick, self.clock.now_millis())
    }

    /// Render pass
    ///
    /// Refreshes the clock and the separator blink, then reads the weather
    /// snapshot once.
    pub fn frame(&mut self) -> Frame {
        let now = self.clock.now_millis();
        self.state.set_time(now);
        self.state.show_separator = self.state.ambient || separator_visible(now);

        let weather = self.weather.get();
        let layout = self.config.layout(self.state.geometry.round);
        render(&self.state, &weather, &self.palette, &layout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::SEPARATOR;
    use crate::weather::WeatherSnapshot;
    use core::cell::Cell;
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;
    use proptest::prelude::*;

    struct FakeClock(Cell<i64>);

    impl FakeClock {
        fn at(millis: i64) -> Self {
            Self(Cell::new(millis))
        }

        fn set(&self, millis: i64) {
            self.0.set(millis);
        }
    }

    impl Clock for FakeClock {
        fn now_millis(&self) -> i64 {
            self.0.get()
        }
    }

    // 2016-07-15 09:05:00 UTC
    const T0: i64 = 1_468_573_500_000;

    fn engine<'a>(
        clock: &'a FakeClock,
        weather: &'a WeatherCell<NoopRawMutex>,
    ) -> Engine<'a, &'a FakeClock, NoopRawMutex> {
        Engine::new(FaceConfig::default(), clock, weather)
    }

    #[test]
    fn test_starts_hidden_and_idle() {
        let clock = FakeClock::at(T0);
        let weather = WeatherCell::default();
        let engine = engine(&clock, &weather);

        assert!(!engine.state().visible);
        assert!(!engine.state().ambient);
        assert!(!engine.is_ticking());
    }

    #[test]
    fn test_visibility_connects_and_starts_ticking() {
        let clock = FakeClock::at(T0);
        let weather = WeatherCell::default();
        let mut engine = engine(&clock, &weather);

        clock.set(T0 + 60_000);
        let response = engine.handle(FaceEvent::VisibilityChanged(true));
        assert_eq!(
            response,
            Response {
                redraw: true,
                link: Some(LinkCommand::Connect)
            }
        );
        assert_eq!(engine.state().now_millis, T0 + 60_000);
        assert!(engine.is_ticking());

        let response = engine.handle(FaceEvent::VisibilityChanged(false));
        assert_eq!(response.link, Some(LinkCommand::Disconnect));
        assert!(!engine.is_ticking());
    }

    #[test]
    fn test_visible_ambient_redraws_without_ticking() {
        let clock = FakeClock::at(T0);
        let weather = WeatherCell::default();
        let mut engine = engine(&clock, &weather);
        engine.handle(FaceEvent::VisibilityChanged(true));

        let response = engine.handle(FaceEvent::AmbientModeChanged(true));
        assert!(response.redraw);
        assert!(!engine.is_ticking());

        // Same mode again changes nothing
        let response = engine.handle(FaceEvent::AmbientModeChanged(true));
        assert!(!response.redraw);
        assert!(!engine.is_ticking());

        engine.handle(FaceEvent::AmbientModeChanged(false));
        assert!(engine.is_ticking());
    }

    #[test]
    fn test_tick_cadence_aligns_to_half_seconds() {
        let clock = FakeClock::at(T0 + 123);
        let weather = WeatherCell::default();
        let mut engine = engine(&clock, &weather);
        engine.handle(FaceEvent::VisibilityChanged(true));

        let first = engine.pending_tick().unwrap();
        assert_eq!(first.due_millis, T0 + 123);

        clock.set(T0 + 130);
        assert!(engine.on_tick(first.generation));
        let next = engine.pending_tick().unwrap();
        assert_eq!(next.due_millis, T0 + 500);

        clock.set(T0 + 502);
        assert!(engine.on_tick(next.generation));
        assert_eq!(engine.pending_tick().unwrap().due_millis, T0 + 1_000);
    }

    #[test]
    fn test_repeated_start_keeps_one_timer() {
        let clock = FakeClock::at(T0);
        let weather = WeatherCell::default();
        let mut engine = engine(&clock, &weather);

        engine.handle(FaceEvent::VisibilityChanged(true));
        let stale = engine.pending_tick().unwrap();
        engine.handle(FaceEvent::VisibilityChanged(true));
        let current = engine.pending_tick().unwrap();

        assert_ne!(stale.generation, current.generation);
        assert!(!engine.on_tick(stale.generation));
        assert_eq!(engine.pending_tick(), Some(current));
    }

    #[test]
    fn test_tick_after_hide_is_ignored() {
        let clock = FakeClock::at(T0);
        let weather = WeatherCell::default();
        let mut engine = engine(&clock, &weather);
        engine.handle(FaceEvent::VisibilityChanged(true));
        let tick = engine.pending_tick().unwrap();

        engine.handle(FaceEvent::VisibilityChanged(false));
        assert!(!engine.on_tick(tick.generation));
        assert!(!engine.is_ticking());
    }

    #[test]
    fn test_separator_blinks_with_wall_clock() {
        let clock = FakeClock::at(T0);
        let weather = WeatherCell::default();
        let mut engine = engine(&clock, &weather);
        engine.handle(FaceEvent::VisibilityChanged(true));

        clock.set(T0 + 250);
        assert!(engine.frame().texts().any(|t| t == SEPARATOR));
        clock.set(T0 + 750);
        assert!(!engine.frame().texts().any(|t| t == SEPARATOR));

        engine.handle(FaceEvent::AmbientModeChanged(true));
        assert!(engine.frame().texts().any(|t| t == SEPARATOR));
        assert!(engine.state().show_separator);
    }

    #[test]
    fn test_weather_update_in_ambient_reaches_next_frame() {
        let clock = FakeClock::at(T0);
        let weather = WeatherCell::default();
        let mut engine = engine(&clock, &weather);
        engine.handle(FaceEvent::VisibilityChanged(true));
        engine.handle(FaceEvent::AmbientModeChanged(true));
        assert!(!engine.is_ticking());

        weather.replace(WeatherSnapshot::new(22, 5, 500));
        let response = engine.handle(FaceEvent::WeatherUpdated);
        assert!(response.redraw);
        assert!(!engine.is_ticking());

        let frame = engine.frame();
        let texts: std::vec::Vec<&str> = frame.texts().collect();
        assert!(texts.contains(&" 22°"));
        assert!(texts.contains(&"  5°"));
    }

    #[test]
    fn test_taps_are_counted() {
        let clock = FakeClock::at(T0);
        let weather = WeatherCell::default();
        let mut engine = engine(&clock, &weather);

        for kind in [TapKind::Touch, TapKind::Tap, TapKind::TouchCancel, TapKind::Tap] {
            let response = engine.handle(FaceEvent::Tap {
                kind,
                x: 120,
                y: 120,
                time: 0,
            });
            assert!(response.redraw);
        }
        assert_eq!(engine.state().tap_count, 2);
    }

    #[test]
    fn test_time_zone_change() {
        let clock = FakeClock::at(T0);
        let weather = WeatherCell::default();
        let mut engine = engine(&clock, &weather);

        assert!(engine
            .handle(FaceEvent::TimeZoneChanged { offset_secs: 2 * 3_600 })
            .redraw);
        assert_eq!(engine.frame().texts().next(), Some("11"));

        let response = engine.handle(FaceEvent::TimeZoneChanged {
            offset_secs: 100_000,
        });
        assert!(!response.redraw);
        assert_eq!(engine.state().utc_offset.local_minus_utc(), 7_200);
    }

    #[test]
    fn test_properties_and_geometry() {
        let clock = FakeClock::at(T0);
        let weather = WeatherCell::default();
        let mut engine = engine(&clock, &weather);
        engine.handle(FaceEvent::VisibilityChanged(true));
        engine.handle(FaceEvent::PropertiesChanged(Capabilities {
            low_bit_ambient: true,
            burn_in_protection: true,
        }));
        engine.handle(FaceEvent::AmbientModeChanged(true));

        assert!(engine
            .palette()
            .text_styles()
            .iter()
            .all(|style| !style.anti_alias));
        assert!(engine.palette().icon_outline);

        engine.handle(FaceEvent::SurfaceChanged {
            width: 320,
            height: 320,
        });
        engine.handle(FaceEvent::InsetsChanged { round: true });
        assert_eq!(engine.state().geometry.center().x, 160);
        assert!(engine.state().geometry.round);
    }

    #[test]
    fn test_capability_change_redraws_only_in_ambient() {
        let clock = FakeClock::at(T0);
        let weather = WeatherCell::default();
        let mut engine = engine(&clock, &weather);
        engine.handle(FaceEvent::VisibilityChanged(true));
        let burn_in = Capabilities {
            low_bit_ambient: false,
            burn_in_protection: true,
        };

        assert!(!engine.handle(FaceEvent::PropertiesChanged(burn_in)).redraw);

        engine.handle(FaceEvent::AmbientModeChanged(true));
        assert!(engine.handle(FaceEvent::PropertiesChanged(Capabilities::default())).redraw);
        assert!(!engine.palette().icon_outline);
        assert!(engine.handle(FaceEvent::PropertiesChanged(burn_in)).redraw);
        assert!(engine.palette().icon_outline);
    }

    #[test]
    fn test_destroy_stops_everything() {
        let clock = FakeClock::at(T0);
        let weather = WeatherCell::default();
        let mut engine = engine(&clock, &weather);
        engine.handle(FaceEvent::VisibilityChanged(true));

        let response = engine.handle(FaceEvent::Destroy);
        assert_eq!(response.link, Some(LinkCommand::Disconnect));
        assert!(!engine.is_ticking());
    }

    #[test]
    fn test_separator_visible_boundaries() {
        for (millis, lit) in [(0, true), (499, true), (500, false), (999, false), (1_000, true), (-1, false)] {
            assert_eq!(separator_visible(millis), lit, "{millis}");
        }
    }

    #[derive(Debug, Clone, Copy)]
    enum Transition {
        Visibility(bool),
        Ambient(bool),
        Tick,
    }

    fn transition() -> impl Strategy<Value = Transition> {
        prop_oneof![
            any::<bool>().prop_map(Transition::Visibility),
            any::<bool>().prop_map(Transition::Ambient),
            Just(Transition::Tick),
        ]
    }

    proptest! {
        #[test]
        fn prop_ticking_iff_visible_and_interactive(
            transitions in proptest::collection::vec(transition(), 1..40),
            start in 0i64..10_000_000,
        ) {
            let clock = FakeClock::at(T0 + start);
            let weather = WeatherCell::default();
            let mut engine = engine(&clock, &weather);

            for (i, transition) in transitions.into_iter().enumerate() {
                clock.set(T0 + start + i as i64 * 137);
                match transition {
                    Transition::Visibility(visible) => {
                        engine.handle(FaceEvent::VisibilityChanged(visible));
                    }
                    Transition::Ambient(ambient) => {
                        engine.handle(FaceEvent::AmbientModeChanged(ambient));
                    }
                    Transition::Tick => {
                        if let Some(tick) = engine.pending_tick() {
                            prop_assert!(engine.on_tick(tick.generation));
                        }
                    }
                }

                let state = engine.state();
                prop_assert_eq!(engine.is_ticking(), state.visible && !state.ambient);
            }
        }

        #[test]
        fn prop_separator_lit_in_first_half_second(offset in 0i64..5_000) {
            let clock = FakeClock::at(T0);
            let weather = WeatherCell::default();
            let mut engine = engine(&clock, &weather);
            engine.handle(FaceEvent::VisibilityChanged(true));

            clock.set(T0 + offset);
            let frame = engine.frame();
            prop_assert_eq!(
                frame.texts().any(|t| t == SEPARATOR),
                (T0 + offset) % 1000 < 500
            );
        }

        #[test]
        fn prop_ambient_always_shows_separator(offset in 0i64..5_000) {
            let clock = FakeClock::at(T0);
            let weather = WeatherCell::default();
            let mut engine = engine(&clock, &weather);
            engine.handle(FaceEvent::VisibilityChanged(true));
            engine.handle(FaceEvent::AmbientModeChanged(true));

            clock.set(T0 + offset);
            let frame = engine.frame();
            prop_assert!(frame.texts().any(|t| t == SEPARATOR));
        }
    }
}

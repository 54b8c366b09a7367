//! Board-agnostic core of the Sunshine watch face
//!
//! Everything here is free of hardware and platform dependencies:
//!
//! - Display engine: display state, lifecycle event dispatch and render pass
//! - Redraw scheduler aligned to half-second wall-clock boundaries
//! - Weather reconciler applying pushed data items to a shared snapshot
//! - Renderer producing draw commands for any `Rgb565` draw target
//! - Face configuration (theme, layouts, cadence)

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

extern crate alloc;

pub(crate) mod fmt;

pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod palette;
pub mod reconciler;
pub mod render;
pub mod scheduler;
pub mod state;
pub mod weather;

pub use clock::Clock;
pub use config::FaceConfig;
pub use engine::{Engine, FaceEvent, LinkCommand, Response, TapKind};
pub use error::{LinkError, PayloadError};
pub use reconciler::{DataFeed, DataItem, Reconciler, WEATHER_PATH};
pub use render::Frame;
pub use weather::{WeatherCell, WeatherSnapshot};

//! Weather snapshot and icons
//!
//! The snapshot is replaced as a whole. Readers copy it out under the
//! mutex, so a render pass never sees a half-written update.

use core::cell::Cell;

use embassy_sync::blocking_mutex::{raw::RawMutex, Mutex};
use embedded_graphics::pixelcolor::{Rgb888, RgbColor};

use crate::config::DEFAULT_CONDITION;

/// Icon family for a weather condition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IconKind {
    Clear,
    LightClouds,
    Clouds,
    LightRain,
    Rain,
    Snow,
    Fog,
    Storm,
    /// Condition code without an icon
    None,
}

impl IconKind {
    /// Map an OpenWeatherMap condition code to an icon
    pub fn for_condition(code: i32) -> Self {
        match code {
            200..=232 => Self::Storm,
            300..=321 => Self::LightRain,
            500..=504 => Self::Rain,
            511 => Self::Snow,
            520..=531 => Self::Rain,
            600..=622 => Self::Snow,
            701..=761 => Self::Fog,
            781 => Self::Storm,
            800 => Self::Clear,
            801 => Self::LightClouds,
            802..=804 => Self::Clouds,
            _ => Self::None,
        }
    }
}

/// Colours an icon is painted with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IconPalette {
    pub sun: Rgb888,
    pub cloud: Rgb888,
    /// Rain, snow, lightning or fog strokes
    pub accent: Rgb888,
}

/// A drawable weather icon
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IconArt {
    pub kind: IconKind,
    pub palette: IconPalette,
}

impl IconArt {
    /// Full colour icon for a condition code
    pub fn for_condition(code: i32) -> Self {
        let kind = IconKind::for_condition(code);
        let accent = match kind {
            IconKind::LightRain | IconKind::Rain => Rgb888::new(0x21, 0x96, 0xF3),
            IconKind::Snow => Rgb888::new(0xE1, 0xF5, 0xFE),
            IconKind::Storm => Rgb888::new(0xFF, 0xEB, 0x3B),
            IconKind::Fog => Rgb888::new(0xB0, 0xBE, 0xC5),
            _ => Rgb888::new(0xFF, 0xFF, 0xFF),
        };

        Self {
            kind,
            palette: IconPalette {
                sun: Rgb888::new(0xFF, 0xC1, 0x07),
                cloud: Rgb888::new(0xEC, 0xEF, 0xF1),
                accent,
            },
        }
    }

    /// The same icon with saturation removed
    pub fn desaturated(&self) -> Self {
        Self {
            kind: self.kind,
            palette: IconPalette {
                sun: desaturate(self.palette.sun),
                cloud: desaturate(self.palette.cloud),
                accent: desaturate(self.palette.accent),
            },
        }
    }
}

/// Replace a colour by its luminance (saturation 0 colour matrix)
pub fn desaturate(color: Rgb888) -> Rgb888 {
    let luma = (213 * color.r() as u32 + 715 * color.g() as u32 + 72 * color.b() as u32 + 500)
        / 1000;
    let luma = luma.min(255) as u8;
    Rgb888::new(luma, luma, luma)
}

/// Colour icon for interactive mode and grayscale variant for ambient mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IconPair {
    pub color: IconArt,
    pub grayscale: IconArt,
}

impl IconPair {
    pub fn for_condition(code: i32) -> Self {
        let color = IconArt::for_condition(code);
        Self {
            color,
            grayscale: color.desaturated(),
        }
    }
}

/// Most recently reconciled weather
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeatherSnapshot {
    /// Daily high in whole degrees
    pub high: i32,
    /// Daily low in whole degrees
    pub low: i32,
    /// OpenWeatherMap condition code
    pub condition: i32,
    pub icon: IconPair,
}

impl WeatherSnapshot {
    pub fn new(high: i32, low: i32, condition: i32) -> Self {
        Self {
            high,
            low,
            condition,
            icon: IconPair::for_condition(condition),
        }
    }

    /// Shown until the first update arrives: clear sky, 0°
    pub fn placeholder() -> Self {
        Self::new(0, 0, DEFAULT_CONDITION)
    }
}

impl Default for WeatherSnapshot {
    fn default() -> Self {
        Self::placeholder()
    }
}

/// Shared, atomically replaceable weather snapshot
pub struct WeatherCell<M: RawMutex> {
    inner: Mutex<M, Cell<WeatherSnapshot>>,
}

impl<M: RawMutex> WeatherCell<M> {
    pub const fn new(snapshot: WeatherSnapshot) -> Self {
        Self {
            inner: Mutex::new(Cell::new(snapshot)),
        }
    }

    /// Copy of the current snapshot
    pub fn get(&self) -> WeatherSnapshot {
        self.inner.lock(|cell| cell.get())
    }

    /// Swap in a new snapshot, returning the previous one
    pub fn replace(&self, snapshot: WeatherSnapshot) -> WeatherSnapshot {
        self.inner.lock(|cell| cell.replace(snapshot))
    }
}

impl<M: RawMutex> Default for WeatherCell<M> {
    fn default() -> Self {
        Self::new(WeatherSnapshot::placeholder())
    }
}

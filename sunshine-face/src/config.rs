//! Face configuration
//!
//! Colours, layouts and cadence. Everything has a sensible default so a
//! board only overrides what differs.

use embedded_graphics::pixelcolor::Rgb888;

use crate::weather::WeatherSnapshot;

/// Redraw cadence in interactive mode
pub const INTERACTIVE_UPDATE_RATE_MS: i64 = 500;

/// Condition shown before the first weather update (clear sky)
pub const DEFAULT_CONDITION: i32 = 800;

/// Colour theme
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    pub background: Rgb888,
    pub background_ambient: Rgb888,
    pub primary_text: Rgb888,
    pub secondary_text: Rgb888,
    pub text_ambient: Rgb888,
    pub line: Rgb888,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            background: Rgb888::new(0x03, 0xA9, 0xF4),
            background_ambient: Rgb888::new(0x00, 0x00, 0x00),
            primary_text: Rgb888::new(0xFF, 0xFF, 0xFF),
            secondary_text: Rgb888::new(0xB3, 0xE5, 0xFC),
            text_ambient: Rgb888::new(0xFF, 0xFF, 0xFF),
            line: Rgb888::new(0x81, 0xD4, 0xFA),
        }
    }
}

/// Size class of the text, chosen by screen shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TextScale {
    Regular,
    Compact,
}

/// Placement of the face content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    /// Left edge of the text column
    pub x_offset: i32,
    /// Top of the time text
    pub y_offset: i32,
    /// Vertical gap between rows
    pub row_gap: i32,
    /// Half length of the divider line
    pub divider_half_width: i32,
    pub scale: TextScale,
}

impl Layout {
    /// Layout for square screens
    pub const fn square() -> Self {
        Self {
            x_offset: 48,
            y_offset: 40,
            row_gap: 8,
            divider_half_width: 20,
            scale: TextScale::Regular,
        }
    }

    /// Layout for round screens, pulled in from the clipped edges
    pub const fn round() -> Self {
        Self {
            x_offset: 64,
            y_offset: 48,
            row_gap: 6,
            divider_half_width: 20,
            scale: TextScale::Compact,
        }
    }
}

/// Display capabilities reported by the host
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Capabilities {
    /// Fewer bits per colour in ambient mode, so no anti-aliasing there
    pub low_bit_ambient: bool,
    /// Screen is prone to burn-in, so keep lit pixels to a minimum in ambient
    pub burn_in_protection: bool,
}

/// Complete face configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceConfig {
    pub theme: Theme,
    pub square: Layout,
    pub round: Layout,
    pub capabilities: Capabilities,
    /// Initial UTC offset in seconds
    pub utc_offset_secs: i32,
    pub interactive_update_rate_ms: i64,
    /// Condition code of the weather shown before the first update
    pub default_condition: i32,
    /// Surface size until the host reports one
    pub width: u32,
    pub height: u32,
}

impl Default for FaceConfig {
    fn default() -> Self {
        Self {
            theme: Theme::default(),
            square: Layout::square(),
            round: Layout::round(),
            capabilities: Capabilities::default(),
            utc_offset_secs: 0,
            interactive_update_rate_ms: INTERACTIVE_UPDATE_RATE_MS,
            default_condition: DEFAULT_CONDITION,
            width: 240,
            height: 240,
        }
    }
}

impl FaceConfig {
    pub fn with_theme(mut self, theme: Theme) -> Self {
        self.theme = theme;
        self
    }

    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn with_utc_offset(mut self, secs: i32) -> Self {
        self.utc_offset_secs = secs;
        self
    }

    pub fn with_surface(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_default_condition(mut self, code: i32) -> Self {
        self.default_condition = code;
        self
    }

    /// Weather to seed the shared cell with: default condition, 0°
    pub fn placeholder_weather(&self) -> WeatherSnapshot {
        WeatherSnapshot::new(0, 0, self.default_condition)
    }

    /// Layout for the given screen shape
    pub fn layout(&self, round: bool) -> Layout {
        if round {
            self.round
        } else {
            self.square
        }
    }
}

//! Render pass
//!
//! [`render`] turns the display state, weather snapshot and palette into a
//! [`Frame`]: an ordered list of draw commands. Drawing the frame onto a
//! display is a separate step, see [`Frame`]'s `Drawable` impl.

use core::fmt::{self, Write};

use chrono::{Datelike, Timelike};
use embedded_graphics::{
    geometry::Point,
    mono_font::{
        iso_8859_1::{
            FONT_6X12, FONT_7X13, FONT_8X13, FONT_8X13_BOLD, FONT_9X18, FONT_9X18_BOLD,
        },
        MonoFont,
    },
    pixelcolor::Rgb888,
};
use heapless::{String, Vec};
use profont::{PROFONT_18_POINT, PROFONT_24_POINT};

use crate::{
    config::{Layout, TextScale},
    fmt::warn,
    palette::{FontRole, IconVariant, Palette, TextStyle},
    state::DisplayState,
    weather::{IconArt, IconKind, WeatherSnapshot},
};

mod draw;
pub mod icon;

pub use icon::ICON_SIZE;

/// Most commands a frame ever holds
pub const MAX_COMMANDS: usize = 12;

pub const SEPARATOR: &str = ":";

const WEEKDAYS: [&str; 7] = ["MON", "TUE", "WED", "THU", "FRI", "SAT", "SUN"];
const MONTHS: [&str; 12] = [
    "JAN", "FEB", "MAR", "APR", "MAY", "JUN", "JUL", "AUG", "SEP", "OCT", "NOV", "DEC",
];

pub type Label = String<24>;

/// One drawing primitive
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    /// Fill the whole surface
    Fill(Rgb888),
    /// Text with its top-left corner at `origin`
    Text {
        text: Label,
        origin: Point,
        style: TextStyle,
        scale: TextScale,
    },
    Line {
        start: Point,
        end: Point,
        color: Rgb888,
    },
    /// Weather icon in an [`ICON_SIZE`] square at `origin`
    Icon {
        origin: Point,
        art: IconArt,
        outline: bool,
    },
}

/// Draw commands for one redraw, in painting order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    commands: Vec<DrawCommand, MAX_COMMANDS>,
}

impl Frame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    /// All text in painting order
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.commands.iter().filter_map(|command| match command {
            DrawCommand::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }

    fn push(&mut self, command: DrawCommand) {
        if self.commands.push(command).is_err() {
            warn!("Frame full, dropping draw command");
        }
    }

    fn text(&mut self, text: Label, origin: Point, style: TextStyle, scale: TextScale) {
        self.push(DrawCommand::Text {
            text,
            origin,
            style,
            scale,
        });
    }
}

/// Font for a text style at the given scale
pub fn font(style: &TextStyle, scale: TextScale) -> &'static MonoFont<'static> {
    match (style.role, scale, style.bold) {
        (FontRole::Time, TextScale::Regular, _) => &PROFONT_24_POINT,
        (FontRole::Time, TextScale::Compact, _) => &PROFONT_18_POINT,
        (FontRole::Date, TextScale::Regular, _) => &FONT_7X13,
        (FontRole::Date, TextScale::Compact, _) => &FONT_6X12,
        (FontRole::Temperature, TextScale::Regular, false) => &FONT_9X18,
        (FontRole::Temperature, TextScale::Regular, true) => &FONT_9X18_BOLD,
        (FontRole::Temperature, TextScale::Compact, false) => &FONT_8X13,
        (FontRole::Temperature, TextScale::Compact, true) => &FONT_8X13_BOLD,
    }
}

/// Width of `text` in pixels for a monospaced font
pub fn text_width(font: &MonoFont<'_>, text: &str) -> i32 {
    let advance = font.character_size.width + font.character_spacing;
    text.chars().count() as i32 * advance as i32
}

fn label(args: fmt::Arguments<'_>) -> Label {
    let mut label = Label::new();
    // Labels are sized for the longest text the face shows
    let _ = label.write_fmt(args);
    label
}

/// Temperature right-aligned to three columns, e.g. `" 22°"`
pub fn temperature_label(degrees: i32) -> Label {
    label(format_args!("{:>3}°", degrees))
}

/// Date line, e.g. `"WED, OCT 18 2026"`
pub fn date_label<D: Datelike>(date: &D) -> Label {
    label(format_args!(
        "{}, {} {} {}",
        WEEKDAYS[date.weekday().num_days_from_monday() as usize],
        MONTHS[date.month0() as usize],
        date.day(),
        date.year()
    ))
}

/// Build the frame for the current state
///
/// The separator is drawn when `show_separator` is set and always in
/// ambient mode.
pub fn render(
    state: &DisplayState,
    weather: &WeatherSnapshot,
    palette: &Palette,
    layout: &Layout,
) -> Frame {
    let scale = layout.scale;
    let mut frame = Frame::new();
    frame.push(DrawCommand::Fill(palette.background));

    let x = layout.x_offset;
    let mut y = layout.y_offset;

    // HH:MM, separator blinking in interactive mode
    let time_font = font(&palette.time, scale);
    let hours = label(format_args!("{}", state.local.hour()));
    let minutes = label(format_args!("{:02}", state.local.minute()));
    let hours_width = text_width(time_font, &hours);
    let separator_width = text_width(time_font, SEPARATOR);

    frame.text(hours, Point::new(x, y), palette.time, scale);
    if state.ambient || state.show_separator {
        frame.text(
            label(format_args!("{}", SEPARATOR)),
            Point::new(x + hours_width, y),
            palette.time,
            scale,
        );
    }
    frame.text(
        minutes,
        Point::new(x + hours_width + separator_width, y),
        palette.time,
        scale,
    );
    y += time_font.character_size.height as i32 + layout.row_gap;

    // Date
    let date_font = font(&palette.date, scale);
    frame.text(date_label(&state.local), Point::new(x, y), palette.date, scale);
    y += date_font.character_size.height as i32 + layout.row_gap;

    // Divider, transparent in ambient mode
    if let Some(color) = palette.divider {
        let center = state.geometry.center().x;
        frame.push(DrawCommand::Line {
            start: Point::new(center - layout.divider_half_width, y),
            end: Point::new(center + layout.divider_half_width, y),
            color,
        });
    }
    y += layout.row_gap;

    // Icon
    let art = match palette.icon {
        IconVariant::Color => weather.icon.color,
        IconVariant::Grayscale => weather.icon.grayscale,
    };
    if art.kind != IconKind::None {
        frame.push(DrawCommand::Icon {
            origin: Point::new(x, y),
            art,
            outline: palette.icon_outline,
        });
    }

    // High and low, vertically centred on the icon
    let high_font = font(&palette.high, scale);
    let high = temperature_label(weather.high);
    let temp_x = x + ICON_SIZE as i32 + layout.row_gap;
    let temp_y = y + (ICON_SIZE as i32 - high_font.character_size.height as i32) / 2;
    let low_x = temp_x + text_width(high_font, &high) + layout.row_gap / 2;

    frame.text(high, Point::new(temp_x, temp_y), palette.high, scale);
    frame.text(
        temperature_label(weather.low),
        Point::new(low_x, temp_y),
        palette.low,
        scale,
    );

    frame
}

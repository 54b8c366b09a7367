//! Painting frames onto a display

use embedded_graphics::{
    mono_font::MonoTextStyle,
    pixelcolor::{Rgb565, RgbColor},
    prelude::*,
    primitives::{Line, PrimitiveStyle},
    text::{Baseline, Text},
};

use super::{font, icon, DrawCommand, Frame};
use crate::palette::TextStyle;

const LINE_WIDTH: u32 = 2;

/// Text colour on the panel
///
/// Aliased text is snapped to pure black or white so low-bit panels
/// show it without dithering.
fn ink(style: &TextStyle) -> Rgb565 {
    if style.anti_alias {
        return style.color.into();
    }

    let c = style.color;
    let luma = (c.r() as u32 * 299 + c.g() as u32 * 587 + c.b() as u32 * 114) / 1000;
    if luma >= 128 {
        Rgb565::WHITE
    } else {
        Rgb565::BLACK
    }
}

impl Drawable for DrawCommand {
    type Color = Rgb565;
    type Output = ();

    fn draw<D>(&self, target: &mut D) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = Rgb565>,
    {
        match self {
            DrawCommand::Fill(color) => target.clear(Rgb565::from(*color)),
            DrawCommand::Text {
                text,
                origin,
                style,
                scale,
            } => {
                let character_style = MonoTextStyle::new(font(style, *scale), ink(style));
                Text::with_baseline(text.as_str(), *origin, character_style, Baseline::Top)
                    .draw(target)
                    .map(|_| ())
            }
            DrawCommand::Line { start, end, color } => Line::new(*start, *end)
                .into_styled(PrimitiveStyle::with_stroke(
                    Rgb565::from(*color),
                    LINE_WIDTH,
                ))
                .draw(target),
            DrawCommand::Icon {
                origin,
                art,
                outline,
            } => icon::draw(art, *origin, *outline, target),
        }
    }
}

impl Drawable for Frame {
    type Color = Rgb565;
    type Output = ();

    fn draw<D>(&self, target: &mut D) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = Rgb565>,
    {
        for command in self.commands() {
            command.draw(target)?;
        }
        Ok(())
    }
}

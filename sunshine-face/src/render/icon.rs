//! Procedural weather icons
//!
//! Each icon fits an [`ICON_SIZE`] square. Outline mode strokes the
//! shapes instead of filling them.

use embedded_graphics::{
    pixelcolor::Rgb565,
    prelude::*,
    primitives::{Circle, Line, PrimitiveStyle, Rectangle, Triangle},
};

use crate::weather::{IconArt, IconKind};

pub const ICON_SIZE: u32 = 40;

const STROKE: u32 = 2;

fn paint(color: Rgb565, outline: bool) -> PrimitiveStyle<Rgb565> {
    if outline {
        PrimitiveStyle::with_stroke(color, 1)
    } else {
        PrimitiveStyle::with_fill(color)
    }
}

/// Cloud in a 36x22 box at `at`
fn cloud<D>(at: Point, style: PrimitiveStyle<Rgb565>, target: &mut D) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb565>,
{
    Circle::new(at + Point::new(2, 8), 14)
        .into_styled(style)
        .draw(target)?;
    Circle::new(at + Point::new(10, 0), 20)
        .into_styled(style)
        .draw(target)?;
    Circle::new(at + Point::new(22, 6), 16)
        .into_styled(style)
        .draw(target)?;
    Rectangle::new(at + Point::new(9, 12), Size::new(21, 10))
        .into_styled(style)
        .draw(target)
}

/// Slanted strokes below the cloud
fn streaks<D>(origin: Point, count: i32, color: Rgb565, target: &mut D) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb565>,
{
    for i in 0..count {
        let x = 12 + i * 8;
        Line::new(origin + Point::new(x, 30), origin + Point::new(x - 3, 38))
            .into_styled(PrimitiveStyle::with_stroke(color, STROKE))
            .draw(target)?;
    }
    Ok(())
}

pub fn draw<D>(art: &IconArt, origin: Point, outline: bool, target: &mut D) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb565>,
{
    let sun = paint(art.palette.sun.into(), outline);
    let cloud_style = paint(art.palette.cloud.into(), outline);
    let accent: Rgb565 = art.palette.accent.into();

    match art.kind {
        IconKind::Clear => Circle::with_center(origin + Point::new(20, 20), 26)
            .into_styled(sun)
            .draw(target),
        IconKind::LightClouds => {
            Circle::with_center(origin + Point::new(27, 12), 18)
                .into_styled(sun)
                .draw(target)?;
            cloud(origin + Point::new(0, 14), cloud_style, target)
        }
        IconKind::Clouds => cloud(origin + Point::new(2, 8), cloud_style, target),
        IconKind::LightRain => {
            cloud(origin + Point::new(2, 4), cloud_style, target)?;
            streaks(origin, 2, accent, target)
        }
        IconKind::Rain => {
            cloud(origin + Point::new(2, 4), cloud_style, target)?;
            streaks(origin, 3, accent, target)
        }
        IconKind::Snow => {
            cloud(origin + Point::new(2, 4), cloud_style, target)?;
            for x in [10, 18, 26] {
                Circle::new(origin + Point::new(x, 31), 5)
                    .into_styled(paint(accent, outline))
                    .draw(target)?;
            }
            Ok(())
        }
        IconKind::Storm => {
            cloud(origin + Point::new(2, 2), cloud_style, target)?;
            Triangle::new(
                origin + Point::new(22, 24),
                origin + Point::new(14, 34),
                origin + Point::new(21, 33),
            )
            .into_styled(paint(accent, outline))
            .draw(target)?;
            Triangle::new(
                origin + Point::new(21, 31),
                origin + Point::new(25, 31),
                origin + Point::new(16, 40),
            )
            .into_styled(paint(accent, outline))
            .draw(target)
        }
        IconKind::Fog => {
            for (i, y) in [12, 20, 28].into_iter().enumerate() {
                let inset = (i as i32 % 2) * 4;
                Line::new(
                    origin + Point::new(4 + inset, y),
                    origin + Point::new(36 - inset, y),
                )
                .into_styled(PrimitiveStyle::with_stroke(accent, STROKE + 1))
                .draw(target)?;
            }
            Ok(())
        }
        IconKind::None => Ok(()),
    }
}

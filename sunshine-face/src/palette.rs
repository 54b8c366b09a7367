//! Interactive and ambient palettes
//!
//! Colours, weights and anti-aliasing for every element of the face,
//! resolved once per mode change.

use embedded_graphics::pixelcolor::Rgb888;

use crate::config::{Capabilities, Theme};

/// What a piece of text shows, which decides its font
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FontRole {
    Time,
    Date,
    Temperature,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextStyle {
    pub color: Rgb888,
    pub role: FontRole,
    pub bold: bool,
    pub anti_alias: bool,
}

impl TextStyle {
    const fn new(color: Rgb888, role: FontRole) -> Self {
        Self {
            color,
            role,
            bold: false,
            anti_alias: true,
        }
    }
}

/// Which of the two icon renditions to draw
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IconVariant {
    Color,
    Grayscale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub background: Rgb888,
    pub time: TextStyle,
    pub date: TextStyle,
    pub high: TextStyle,
    pub low: TextStyle,
    /// `None` when the divider is transparent
    pub divider: Option<Rgb888>,
    pub icon: IconVariant,
    /// Draw the icon as strokes only
    pub icon_outline: bool,
}

impl Palette {
    pub fn interactive(theme: &Theme) -> Self {
        Self {
            background: theme.background,
            time: TextStyle::new(theme.primary_text, FontRole::Time),
            date: TextStyle::new(theme.secondary_text, FontRole::Date),
            high: TextStyle {
                bold: true,
                ..TextStyle::new(theme.primary_text, FontRole::Temperature)
            },
            low: TextStyle::new(theme.secondary_text, FontRole::Temperature),
            divider: Some(theme.line),
            icon: IconVariant::Color,
            icon_outline: false,
        }
    }

    pub fn ambient(theme: &Theme, capabilities: Capabilities) -> Self {
        let text = |role| TextStyle {
            anti_alias: !capabilities.low_bit_ambient,
            ..TextStyle::new(theme.text_ambient, role)
        };

        Self {
            background: theme.background_ambient,
            time: text(FontRole::Time),
            date: text(FontRole::Date),
            high: text(FontRole::Temperature),
            low: text(FontRole::Temperature),
            divider: None,
            icon: IconVariant::Grayscale,
            icon_outline: capabilities.burn_in_protection,
        }
    }

    pub fn resolve(theme: &Theme, ambient: bool, capabilities: Capabilities) -> Self {
        if ambient {
            Self::ambient(theme, capabilities)
        } else {
            Self::interactive(theme)
        }
    }

    pub fn text_styles(&self) -> [TextStyle; 4] {
        [self.time, self.date, self.high, self.low]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOW_BIT: Capabilities = Capabilities {
        low_bit_ambient: true,
        burn_in_protection: false,
    };

    #[test]
    fn test_interactive_uses_theme_and_bold_high() {
        let theme = Theme::default();
        let palette = Palette::resolve(&theme, false, LOW_BIT);

        assert_eq!(palette.background, theme.background);
        assert!(palette.high.bold);
        assert!(!palette.low.bold);
        assert_eq!(palette.divider, Some(theme.line));
        assert_eq!(palette.icon, IconVariant::Color);
        // Low-bit only matters in ambient mode
        assert!(palette.text_styles().iter().all(|s| s.anti_alias));
    }

    #[test]
    fn test_ambient_is_plain() {
        let theme = Theme::default();
        let palette = Palette::resolve(&theme, true, Capabilities::default());

        assert_eq!(palette.background, theme.background_ambient);
        assert_eq!(palette.divider, None);
        assert_eq!(palette.icon, IconVariant::Grayscale);
        assert!(!palette.icon_outline);
        for style in palette.text_styles() {
            assert!(!style.bold);
            assert!(style.anti_alias);
            assert_eq!(style.color, theme.text_ambient);
        }
    }

    #[test]
    fn test_low_bit_ambient_disables_anti_aliasing() {
        let palette = Palette::resolve(&Theme::default(), true, LOW_BIT);
        assert!(palette.text_styles().iter().all(|s| !s.anti_alias));
    }

    #[test]
    fn test_burn_in_protection_outlines_icon() {
        let capabilities = Capabilities {
            low_bit_ambient: false,
            burn_in_protection: true,
        };
        assert!(Palette::ambient(&Theme::default(), capabilities).icon_outline);
        assert!(!Palette::resolve(&Theme::default(), false, capabilities).icon_outline);
    }
}

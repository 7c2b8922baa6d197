use std::fmt;
use std::str::FromStr;

/// A color with four 8-bit channels.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Color {
        Color { r, g, b, a }
    }

    /// Fully opaque color.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Color {
        Color::rgba(r, g, b, 255)
    }

    /// Same color with the alpha channel replaced.
    pub const fn opaque(self, alpha: u8) -> Color {
        Color::rgba(self.r, self.g, self.b, alpha)
    }

    /// Complement of the RGB channels; alpha is preserved.
    pub const fn inverted(self) -> Color {
        Color::rgba(255 - self.r, 255 - self.g, 255 - self.b, self.a)
    }

    pub const fn fully_opaque(self) -> bool {
        self.a == 255
    }
}

pub mod colors {
    use super::Color;

    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const RED: Color = Color::rgb(255, 0, 0);
    pub const GREEN: Color = Color::rgb(0, 255, 0);
    pub const BLUE: Color = Color::rgb(0, 0, 255);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const MAGENTA: Color = Color::rgb(255, 0, 255);
    pub const YELLOW: Color = Color::rgb(255, 255, 0);
    pub const CYAN: Color = Color::rgb(0, 255, 255);
    pub const GRAY: Color = Color::rgb(128, 128, 128);
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}{:02X}", self.a, self.r, self.g, self.b)
    }
}

/// Parses the `#AARRGGBB` notation used on the command line.
impl FromStr for Color {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Color, Self::Err> {
        let digits = s.strip_prefix('#').ok_or("expected leading '#'")?;
        if digits.len() != 8 {
            return Err("expected 8 hex digits");
        }
        let value = u32::from_str_radix(digits, 16).map_err(|_| "invalid hex digit")?;
        Ok(Color::rgba(
            (value >> 16) as u8,
            (value >> 8) as u8,
            value as u8,
            (value >> 24) as u8,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inverted_preserves_alpha() {
        let color = Color::rgba(10, 20, 30, 77);
        assert_eq!(color.inverted(), Color::rgba(245, 235, 225, 77));
        assert_eq!(color.inverted().inverted(), color);
    }

    #[test]
    fn opaque_overrides_alpha_only() {
        assert_eq!(colors::MAGENTA.opaque(0), Color::rgba(255, 0, 255, 0));
    }

    #[test]
    fn parse_and_print() {
        let color: Color = "#FFFF00FF".parse().unwrap();
        assert_eq!(color, colors::MAGENTA);
        assert_eq!(color.to_string(), "#FFFF00FF");

        assert!("FFFF00FF".parse::<Color>().is_err());
        assert!("#FFFF00F".parse::<Color>().is_err());
        assert!("#FFFF00FG".parse::<Color>().is_err());
    }
}

//! RGBA color with the KVA `"{R};{G};{B}[;{A}]"` text form.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }

    /// Scale the alpha channel by an opacity factor in [0,1].
    pub fn faded(self, opacity: f64) -> Self {
        let a = (opacity.clamp(0.0, 1.0) * 255.0) as u8;
        self.with_alpha(a)
    }

    pub fn invert(self) -> Self {
        Self {
            r: 255 - self.r,
            g: 255 - self.g,
            b: 255 - self.b,
            a: self.a,
        }
    }

    /// Black or white, whichever contrasts with this color.
    pub fn contrast(self) -> Self {
        // Rec. 601 luma.
        let luma = 0.299 * self.r as f64 + 0.587 * self.g as f64 + 0.114 * self.b as f64;
        if luma > 128.0 {
            Color::BLACK
        } else {
            Color::WHITE
        }
    }

    /// Parse the KVA text form. Three components mean opaque.
    /// Malformed input falls back to black, logged by the caller's protocol.
    pub fn parse(s: &str) -> Option<Color> {
        let parts: Vec<&str> = s.split(';').collect();
        match parts.len() {
            3 => Some(Color::rgb(
                parts[0].trim().parse().ok()?,
                parts[1].trim().parse().ok()?,
                parts[2].trim().parse().ok()?,
            )),
            4 => Some(Color::rgba(
                parts[0].trim().parse().ok()?,
                parts[1].trim().parse().ok()?,
                parts[2].trim().parse().ok()?,
                parts[3].trim().parse().ok()?,
            )),
            _ => None,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.a == 255 {
            write!(f, "{};{};{}", self.r, self.g, self.b)
        } else {
            write!(f, "{};{};{};{}", self.r, self.g, self.b, self.a)
        }
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::BLACK
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_roundtrip() {
        let c = Color::rgb(12, 200, 5);
        assert_eq!(Color::parse(&c.to_string()), Some(c));

        let c = Color::rgba(12, 200, 5, 128);
        assert_eq!(Color::parse(&c.to_string()), Some(c));
    }

    #[test]
    fn test_parse_malformed() {
        assert_eq!(Color::parse("1;2"), None);
        assert_eq!(Color::parse("red"), None);
        assert_eq!(Color::parse("1;2;300"), None);
    }

    #[test]
    fn test_contrast() {
        assert_eq!(Color::WHITE.contrast(), Color::BLACK);
        assert_eq!(Color::rgb(20, 20, 60).contrast(), Color::WHITE);
    }
}

//! Named colors and transparency for the diagnostic figures.
use crate::errors::{CalibError, Result};
use plotters::style::{RGBAColor, RGBColor};
use std::fmt;

const NAMED: [(&str, (u8, u8, u8)); 24] = [
    ("black", (0, 0, 0)),
    ("white", (255, 255, 255)),
    ("red", (255, 0, 0)),
    ("green", (0, 255, 0)),
    ("blue", (0, 0, 255)),
    ("yellow", (255, 255, 0)),
    ("cyan", (0, 255, 255)),
    ("magenta", (255, 0, 255)),
    ("grey", (190, 190, 190)),
    ("gray", (190, 190, 190)),
    ("darkgrey", (169, 169, 169)),
    ("lightgrey", (211, 211, 211)),
    ("orange", (255, 165, 0)),
    ("purple", (160, 32, 240)),
    ("brown", (165, 42, 42)),
    ("navy", (0, 0, 128)),
    ("darkgreen", (0, 100, 0)),
    ("forestgreen", (34, 139, 34)),
    ("dodgerblue", (30, 144, 255)),
    ("steelblue", (70, 130, 180)),
    ("tomato", (255, 99, 71)),
    ("firebrick", (178, 34, 34)),
    ("goldenrod", (218, 165, 32)),
    ("wheat", (245, 222, 179)),
];

/// Color with an 8-bit alpha channel, 255 being opaque.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgba {
    /// Red.
    pub r: u8,
    /// Green.
    pub g: u8,
    /// Blue.
    pub b: u8,
    /// Alpha, 0 fully transparent.
    pub a: u8,
}

impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}{:02X}", self.r, self.g, self.b, self.a)
    }
}

impl From<Rgba> for RGBAColor {
    fn from(c: Rgba) -> Self {
        RGBAColor(c.r, c.g, c.b, c.a as f64 / 255.0)
    }
}

/// Look up a color by name (case insensitive) or parse a `#RRGGBB` hex string.
pub fn named_color(name: &str) -> Result<RGBColor> {
    let unknown = || CalibError::UnknownColor(name.to_string());
    if let Some(hex) = name.strip_prefix('#') {
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(unknown());
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| unknown());
        return Ok(RGBColor(channel(0)?, channel(2)?, channel(4)?));
    }
    let lower = name.to_ascii_lowercase();
    NAMED
        .iter()
        .find(|(n, _)| *n == lower)
        .map(|(_, (r, g, b))| RGBColor(*r, *g, *b))
        .ok_or_else(unknown)
}

/// Make a named color `percent` transparent: 0 keeps it opaque, 100 makes it invisible.
///
/// # Examples
///
/// ```
/// use pmodel_calib::colors::transparent;
/// let grey = transparent("grey", 50.0).unwrap();
/// assert_eq!(grey.to_string(), "#BEBEBE80");
/// assert!(transparent("grey", 120.0).is_err());
/// ```
pub fn transparent(name: &str, percent: f64) -> Result<Rgba> {
    if !(0.0..=100.0).contains(&percent) {
        return Err(CalibError::InvalidPercent(percent));
    }
    let RGBColor(r, g, b) = named_color(name)?;
    let a = ((100.0 - percent) * 255.0 / 100.0).round() as u8;
    Ok(Rgba { r, g, b, a })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alpha_spans_opaque_to_invisible() {
        assert_eq!(transparent("red", 0.0).unwrap().a, 255);
        assert_eq!(transparent("red", 100.0).unwrap().a, 0);
        assert_eq!(transparent("red", 0.0).unwrap(), transparent("red", 0.0).unwrap());
        let c = transparent("dodgerblue", 25.0).unwrap();
        assert_eq!((c.r, c.g, c.b, c.a), (30, 144, 255, 191));
    }

    #[test]
    fn percent_outside_range_is_rejected() {
        for p in [-0.1, 100.5, f64::NAN] {
            assert!(matches!(transparent("red", p), Err(CalibError::InvalidPercent(_))));
        }
    }

    #[test]
    fn names_and_hex_resolve() {
        assert_eq!(named_color("DarkGreen").unwrap(), RGBColor(0, 100, 0));
        assert_eq!(named_color("#29a274").unwrap(), RGBColor(0x29, 0xa2, 0x74));
        assert!(matches!(named_color("#29a27"), Err(CalibError::UnknownColor(_))));
        assert!(named_color("no-such-color").is_err());
    }

    #[test]
    fn plotters_alpha_is_fractional() {
        let RGBAColor(_, _, _, a) = transparent("black", 100.0).unwrap().into();
        assert_eq!(a, 0.0);
    }
}

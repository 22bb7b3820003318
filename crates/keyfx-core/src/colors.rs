//! # Colors Module
//!
//! 8-bit color value types shared by the runtime and its hosts.
//!
//! ## Responsibilities
//! - **RGBColor**: three-channel color with `#RRGGBB` canonical text form.
//! - **RGBAColor**: four-channel color. Alpha is carried but ignored by equality.
//! - **Parsing**: flag-style `parse` that never fails hard, plus `FromStr` for `?` users.
//!
//! ## Key Types
//! - `RGBColor`: device-level key color.
//! - `RGBAColor`: script-level color, blended onto render targets.

use keyframe::CanTween;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Error returned by the `FromStr` implementations when text is not a recognized color.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid color literal: {0:?}")]
pub struct ParseColorError(pub String);

/// A single R8G8B8 value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RGBColor {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl RGBColor {
    pub const fn new(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }

    /// Parses `#RRGGBB`, `RRGGBB` or the `#RGB` shorthand.
    ///
    /// Returns the parsed color and `true`, or black and `false` when the text is not a color.
    pub fn parse(text: &str) -> (Self, bool) {
        match parse_hex(text) {
            Some((color, None)) => (color, true),
            _ => (Self::default(), false),
        }
    }
}

impl fmt::Display for RGBColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.red, self.green, self.blue)
    }
}

impl FromStr for RGBColor {
    type Err = ParseColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match Self::parse(s) {
            (color, true) => Ok(color),
            (_, false) => Err(ParseColorError(s.to_string())),
        }
    }
}

/// A single R8G8B8A8 value.
///
/// Equality only looks at red, green and blue. Two colors differing only by alpha compare equal;
/// alpha matters for blending and printing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RGBAColor {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    pub alpha: u8,
}

impl RGBAColor {
    pub const OPAQUE: u8 = u8::MAX;

    pub const fn new(red: u8, green: u8, blue: u8, alpha: u8) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }

    /// Builds a color from an RGB value and an explicit alpha.
    pub const fn from_rgb(rgb: RGBColor, alpha: u8) -> Self {
        Self::new(rgb.red, rgb.green, rgb.blue, alpha)
    }

    /// Drops the alpha channel.
    pub const fn rgb(&self) -> RGBColor {
        RGBColor::new(self.red, self.green, self.blue)
    }

    /// Parses `#RRGGBBAA` or any form accepted by [`RGBColor::parse`] (alpha is then opaque).
    pub fn parse(text: &str) -> (Self, bool) {
        match parse_hex(text) {
            Some((rgb, alpha)) => (Self::from_rgb(rgb, alpha.unwrap_or(Self::OPAQUE)), true),
            None => (Self::from(RGBColor::default()), false),
        }
    }

    /// Source-over composition of `over` on top of `self`, weighted by `over.alpha`.
    ///
    /// The result keeps the alpha of `self`.
    pub fn blend(&self, over: RGBAColor) -> Self {
        let a = over.alpha as u32;
        let mix = |below: u8, above: u8| -> u8 {
            ((below as u32 * (255 - a) + above as u32 * a + 127) / 255) as u8
        };
        Self::new(
            mix(self.red, over.red),
            mix(self.green, over.green),
            mix(self.blue, over.blue),
            self.alpha,
        )
    }
}

impl Default for RGBAColor {
    fn default() -> Self {
        Self::new(0, 0, 0, Self::OPAQUE)
    }
}

impl From<RGBColor> for RGBAColor {
    fn from(rgb: RGBColor) -> Self {
        Self::from_rgb(rgb, Self::OPAQUE)
    }
}

impl PartialEq for RGBAColor {
    fn eq(&self, other: &Self) -> bool {
        self.red == other.red && self.green == other.green && self.blue == other.blue
    }
}

impl Eq for RGBAColor {}

impl fmt::Display for RGBAColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{:02X}{:02X}{:02X}{:02X}",
            self.red, self.green, self.blue, self.alpha
        )
    }
}

impl FromStr for RGBAColor {
    type Err = ParseColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match Self::parse(s) {
            (color, true) => Ok(color),
            (_, false) => Err(ParseColorError(s.to_string())),
        }
    }
}

impl CanTween for RGBAColor {
    fn ease(from: Self, to: Self, time: impl keyframe::num_traits::Float) -> Self {
        let t = time.to_f64().unwrap_or(1.0);
        let lerp = |a: u8, b: u8| -> u8 {
            let value = a as f64 + (b as f64 - a as f64) * t;
            value.round().clamp(0.0, 255.0) as u8
        };
        Self::new(
            lerp(from.red, to.red),
            lerp(from.green, to.green),
            lerp(from.blue, to.blue),
            lerp(from.alpha, to.alpha),
        )
    }
}

/// Splits hex text into a color and an optional alpha channel.
fn parse_hex(text: &str) -> Option<(RGBColor, Option<u8>)> {
    let hex = text.trim();
    let hex = hex.strip_prefix('#').unwrap_or(hex);
    if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    match hex.len() {
        3 => {
            let nibble = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|v| v * 17);
            Some((RGBColor::new(nibble(0)?, nibble(1)?, nibble(2)?), None))
        }
        6 => Some((RGBColor::new(byte(0)?, byte(2)?, byte(4)?), None)),
        8 => Some((RGBColor::new(byte(0)?, byte(2)?, byte(4)?), Some(byte(6)?))),
        _ => None,
    }
}

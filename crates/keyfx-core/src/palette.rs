//! # Palette Module
//!
//! Symbolic color names available to controllers when scripts call `tocolor("name")`.
//!
//! ## Responsibilities
//! - **Defaults**: a small set of common color names.
//! - **Extension**: extra names from [`EnvironmentConfig`](crate::config::EnvironmentConfig).
//! - **Parsing**: name lookup first, hex literal second.

use crate::colors::{RGBAColor, RGBColor};
use std::collections::HashMap;
use tracing::warn;

/// Name to color table. Names are matched case-insensitively.
#[derive(Clone, Debug)]
pub struct Palette {
    pub colors: HashMap<String, RGBColor>,
}

impl Palette {
    /// Initializes the palette with the standard names.
    pub fn new() -> Self {
        let mut colors = HashMap::new();
        for (name, rgb) in [
            ("black", RGBColor::new(0x00, 0x00, 0x00)),
            ("white", RGBColor::new(0xff, 0xff, 0xff)),
            ("red", RGBColor::new(0xff, 0x00, 0x00)),
            ("green", RGBColor::new(0x00, 0xff, 0x00)),
            ("blue", RGBColor::new(0x00, 0x00, 0xff)),
            ("yellow", RGBColor::new(0xff, 0xff, 0x00)),
            ("cyan", RGBColor::new(0x00, 0xff, 0xff)),
            ("magenta", RGBColor::new(0xff, 0x00, 0xff)),
            ("orange", RGBColor::new(0xff, 0xa5, 0x00)),
            ("purple", RGBColor::new(0x80, 0x00, 0x80)),
            ("pink", RGBColor::new(0xff, 0xc0, 0xcb)),
            ("gray", RGBColor::new(0x80, 0x80, 0x80)),
            ("grey", RGBColor::new(0x80, 0x80, 0x80)),
            ("navy", RGBColor::new(0x00, 0x00, 0x80)),
            ("teal", RGBColor::new(0x00, 0x80, 0x80)),
            ("gold", RGBColor::new(0xff, 0xd7, 0x00)),
        ] {
            colors.insert(name.to_string(), rgb);
        }
        Self { colors }
    }

    /// Adds or replaces entries from a name → hex literal map.
    ///
    /// Entries whose value does not parse are skipped with a warning.
    pub fn extend_from_literals<'a>(
        &mut self,
        entries: impl IntoIterator<Item = (&'a String, &'a String)>,
    ) {
        for (name, literal) in entries {
            match RGBColor::parse(literal) {
                (rgb, true) => {
                    self.colors.insert(name.to_ascii_lowercase(), rgb);
                }
                (_, false) => warn!("Ignoring palette entry {name:?}: {literal:?} is not a color"),
            }
        }
    }

    /// Resolves a color name or hex literal.
    pub fn parse(&self, text: &str) -> Option<RGBAColor> {
        let key = text.trim().to_ascii_lowercase();
        if let Some(rgb) = self.colors.get(&key) {
            return Some(RGBAColor::from(*rgb));
        }
        match RGBAColor::parse(text) {
            (color, true) => Some(color),
            (_, false) => None,
        }
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::new()
    }
}

//! # Device Module
//!
//! Host-owned views of the keyboard that scripts can reach through borrowed handles.
//!
//! ## Responsibilities
//! - **KeyDatabase**: read-only key layout (keys and named groups).
//! - **RenderTarget**: one color per key, written by scripts, read by the renderer.
//!
//! Building a database from a device description is the host's job; this module only stores
//! the result.

use crate::colors::RGBAColor;
use serde::{Deserialize, Serialize};

/// Bounding box of a key on the physical layout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRect {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

/// A single key. `index` is its slot in the database and in render targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Key {
    #[serde(default)]
    pub index: usize,
    pub key_code: u32,
    pub name: String,
    #[serde(default)]
    pub position: KeyRect,
}

/// A named set of keys, stored as indices into the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyGroup {
    pub name: String,
    pub keys: Vec<usize>,
}

/// Key layout of a device.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KeyDatabase {
    keys: Vec<Key>,
    #[serde(default)]
    groups: Vec<KeyGroup>,
}

impl KeyDatabase {
    /// Builds a database, renumbering keys by position and dropping group entries that point
    /// past the end of the key list.
    pub fn new(mut keys: Vec<Key>, mut groups: Vec<KeyGroup>) -> Self {
        for (index, key) in keys.iter_mut().enumerate() {
            key.index = index;
        }
        let count = keys.len();
        for group in &mut groups {
            group.keys.retain(|&index| index < count);
        }
        Self { keys, groups }
    }

    /// Deserializes a layout from JSON and normalizes it like [`KeyDatabase::new`].
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        let raw: KeyDatabase = serde_json::from_str(text)?;
        Ok(Self::new(raw.keys, raw.groups))
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    pub fn groups(&self) -> &[KeyGroup] {
        &self.groups
    }

    pub fn key(&self, index: usize) -> Option<&Key> {
        self.keys.get(index)
    }

    pub fn find_name(&self, name: &str) -> Option<&Key> {
        self.keys.iter().find(|k| k.name.eq_ignore_ascii_case(name))
    }

    pub fn find_key_code(&self, key_code: u32) -> Option<&Key> {
        self.keys.iter().find(|k| k.key_code == key_code)
    }

    /// Index of the group called `name`.
    pub fn group_index(&self, name: &str) -> Option<usize> {
        self.groups.iter().position(|g| g.name.eq_ignore_ascii_case(name))
    }

    pub fn group(&self, index: usize) -> Option<&KeyGroup> {
        self.groups.get(index)
    }
}

/// Color buffer with one entry per key.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderTarget {
    colors: Vec<RGBAColor>,
}

impl RenderTarget {
    /// Creates a target of `size` transparent black entries.
    pub fn new(size: usize) -> Self {
        Self {
            colors: vec![RGBAColor::new(0, 0, 0, 0); size],
        }
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<RGBAColor> {
        self.colors.get(index).copied()
    }

    /// Writes a color; returns `false` when `index` is out of range.
    pub fn set(&mut self, index: usize, color: RGBAColor) -> bool {
        match self.colors.get_mut(index) {
            Some(slot) => {
                *slot = color;
                true
            }
            None => false,
        }
    }

    pub fn fill(&mut self, color: RGBAColor) {
        self.colors.fill(color);
    }

    pub fn colors(&self) -> &[RGBAColor] {
        &self.colors
    }
}

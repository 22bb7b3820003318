//! # Scripting Utilities
//!
//! Argument decoding helpers shared by the capability functions.
//!
//! ## Responsibilities
//! - **Numbers**: `as_number`, `coerce_number`, `number_arg`, 1-based `as_index`.
//! - **Channels**: `channel` clamps script numbers into 8-bit color channels.
//! - **Color arguments**: `ColorArgs` classifies the overloads accepted by `tocolor`.

use crate::errors::ScriptError;
use mlua::{Lua, Value};

use super::registry::{describe, Stack};

/// Numeric value of an integer or float script value.
pub fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Integer(i) => Some(*i as f64),
        Value::Number(n) => Some(*n),
        _ => None,
    }
}

/// Like [`as_number`], but also accepts strings Lua converts to numbers (`"0.5"`, `"0x10"`).
pub fn coerce_number<'lua>(lua: &'lua Lua, value: &Value<'lua>) -> Option<f64> {
    match value {
        Value::String(_) => lua.coerce_number(value.clone()).ok().flatten(),
        other => as_number(other),
    }
}

/// Converts a 1-based script index into a zero-based one.
pub fn as_index(value: &Value) -> Option<usize> {
    let n = as_number(value)?;
    if n.fract() != 0.0 || n < 1.0 {
        return None;
    }
    Some(n as usize - 1)
}

/// Reads a finite number argument, coercing numeric strings.
pub fn number_arg<'lua>(
    lua: &'lua Lua,
    stack: &Stack<'lua>,
    position: usize,
    function: &'static str,
) -> Result<f64, ScriptError> {
    match stack.get(position).and_then(|value| coerce_number(lua, value)) {
        Some(n) if n.is_finite() => Ok(n),
        _ => Err(ScriptError::argument(
            function,
            position,
            format!("number expected, got {}", describe(stack.get(position))),
        )),
    }
}

/// Clamps a script number to a color channel.
pub fn channel(value: f64) -> u8 {
    if value.is_nan() {
        return 0;
    }
    value.round().clamp(0.0, 255.0) as u8
}

/// Shapes of argument lists accepted by `tocolor`.
#[derive(Debug, Clone, PartialEq)]
pub enum ColorArgs {
    Text(String),
    Rgb(f64, f64, f64),
    Rgba(f64, f64, f64, f64),
    Unmatched,
}

impl ColorArgs {
    pub fn classify<'lua>(lua: &'lua Lua, stack: &Stack<'lua>) -> Self {
        let number = |position: usize| stack.get(position).and_then(|v| coerce_number(lua, v));
        match stack.height() {
            1 => match stack.get(1) {
                Some(Value::String(text)) => ColorArgs::Text(text.to_string_lossy().into_owned()),
                _ => ColorArgs::Unmatched,
            },
            3 => match (number(1), number(2), number(3)) {
                (Some(r), Some(g), Some(b)) => ColorArgs::Rgb(r, g, b),
                _ => ColorArgs::Unmatched,
            },
            4 => match (number(1), number(2), number(3), number(4)) {
                (Some(r), Some(g), Some(b), Some(a)) => ColorArgs::Rgba(r, g, b, a),
                _ => ColorArgs::Unmatched,
            },
            _ => ColorArgs::Unmatched,
        }
    }
}

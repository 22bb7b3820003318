//! # Colors API
//!
//! `tocolor(...)` builds an `RGBAColor` from text or channels.
//!
//! | Arguments | Result |
//! |---|---|
//! | one string | parsed by the controller, or nil |
//! | three numbers | opaque color, channels 0-255 |
//! | four numbers | color with alpha |
//! | anything else | nil |

use crate::colors::RGBAColor;
use mlua::{Lua, Value};
use std::rc::Rc;
use tracing::trace;

use super::super::context::RuntimeContext;
use super::super::registry::{entry_point, push};
use super::super::utils::{channel, ColorArgs};

pub fn register(lua: &Lua, context: &Rc<RuntimeContext>) -> mlua::Result<()> {
    let context = context.clone();

    // ========== TOCOLOR ==========
    let tocolor = entry_point(lua, "tocolor", move |lua, stack| {
        let color = match ColorArgs::classify(lua, stack) {
            ColorArgs::Text(text) => context.controller()?.parse_color(&text),
            ColorArgs::Rgb(r, g, b) => Some(RGBAColor::new(
                channel(r),
                channel(g),
                channel(b),
                RGBAColor::OPAQUE,
            )),
            ColorArgs::Rgba(r, g, b, a) => {
                Some(RGBAColor::new(channel(r), channel(g), channel(b), channel(a)))
            }
            ColorArgs::Unmatched => {
                trace!(arity = stack.height(), "tocolor: no matching overload");
                None
            }
        };
        match color {
            Some(color) => push(lua, stack, color)?,
            None => stack.push(Value::Nil),
        }
        Ok(1)
    })?;
    lua.globals().set("tocolor", tocolor)
}

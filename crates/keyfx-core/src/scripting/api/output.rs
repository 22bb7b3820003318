//! # Output API
//!
//! `print(...)` forwards text to the attached controller instead of stdout.

use mlua::{Function, Lua, Value};
use std::rc::Rc;

use super::super::context::RuntimeContext;
use super::super::registry::entry_point;

pub fn register(lua: &Lua, context: &Rc<RuntimeContext>) -> mlua::Result<()> {
    // Captured before scripts run, so a script redefining `tostring` cannot change `print`.
    let tostring = lua.create_registry_value(lua.globals().get::<_, Function>("tostring")?)?;
    let context = context.clone();

    // ========== PRINT ==========
    let print = entry_point(lua, "print", move |lua, stack| {
        let controller = context.controller()?;
        let tostring: Function = lua.registry_value(&tostring)?;
        let mut text = String::new();
        for position in 1..=stack.height() {
            let value = stack.get(position).cloned().unwrap_or(Value::Nil);
            let piece: mlua::String = tostring.call(value)?;
            text.push_str(&piece.to_string_lossy());
        }
        controller.print(&text);
        Ok(0)
    })?;
    lua.globals().set("print", print)
}

//! # keyfx Table
//!
//! Runtime information for scripts: `keyfx.now()` and `keyfx.db`.

use mlua::{Lua, Table, Value};
use std::rc::Rc;

use super::super::context::RuntimeContext;
use super::super::registry::entry_point;

/// Registry slot keeping the table reachable even if a script reassigns the global.
const TABLE_KEY: &str = "keyfx.table";

pub fn register(lua: &Lua, context: &Rc<RuntimeContext>) -> mlua::Result<()> {
    let context = context.clone();
    let table = lua.create_table()?;

    // ========== NOW ==========
    let now = entry_point(lua, "now", move |_, stack| {
        stack.push(Value::Number(context.now()));
        Ok(1)
    })?;
    table.set("now", now)?;

    lua.set_named_registry_value(TABLE_KEY, table.clone())?;
    lua.globals().set("keyfx", table)
}

/// Sets or clears `keyfx.db`.
pub fn set_database<'lua>(lua: &'lua Lua, handle: Value<'lua>) -> mlua::Result<()> {
    let table: Table = lua.named_registry_value(TABLE_KEY)?;
    table.set("db", handle)
}

//! # API Module
//!
//! Aggregates the capability sub-modules and provides a single registration point.
//!
//! ## Sub-modules
//! - **output**: `print`
//! - **colors**: `tocolor`
//! - **animation**: `fade`
//! - **threads**: `thread`, `wait`
//! - **keyfx**: the `keyfx` table (`keyfx.db`, `keyfx.now`)

pub mod animation;
pub mod colors;
pub mod keyfx;
pub mod output;
pub mod threads;

use crate::scheduler::Scheduler;
use mlua::Lua;
use std::rc::Rc;

use super::context::RuntimeContext;

/// Install every capability global into `lua`.
pub fn register_all(
    lua: &Lua,
    context: &Rc<RuntimeContext>,
    scheduler: &Rc<Scheduler>,
) -> mlua::Result<()> {
    output::register(lua, context)?;
    colors::register(lua, context)?;
    animation::register(lua, context)?;
    threads::register(lua, scheduler)?;
    keyfx::register(lua, context)?;
    Ok(())
}

//! # Threads API
//!
//! Cooperative routines.
//!
//! ## Responsibilities
//! - **thread(fn, ...)**: hands `fn` to the scheduler; extra arguments are passed on its first run.
//!   The thread stops once the returned handle is no longer referenced.
//! - **wait(seconds)**: suspends the calling thread until the environment clock has advanced.
//!
//! `wait` is a native request builder wrapped in a small Lua function that yields the request, so
//! the native side never has to yield across a Rust frame.

use crate::errors::ScriptError;
use crate::scheduler::{Scheduler, SuspendRequest, Suspension};
use mlua::{Function, Lua, Table, Value};
use std::rc::Rc;

use super::super::registry::{describe, entry_point, push, to_value};
use super::super::types::ThreadHandle;
use super::super::utils::number_arg;

const WAIT_GLUE: &str = r#"
local request, yield = ...
return function(...)
    return yield(request(...))
end
"#;

pub fn register(lua: &Lua, scheduler: &Rc<Scheduler>) -> mlua::Result<()> {
    let scheduler = scheduler.clone();

    // ========== THREAD ==========
    let thread = entry_point(lua, "thread", move |lua, stack| {
        let routine = match stack.get(1) {
            Some(Value::Function(f)) => f.clone(),
            other => {
                return Err(ScriptError::argument(
                    "thread",
                    1,
                    format!("function expected, got {}", describe(other)),
                )
                .into())
            }
        };
        let args: Vec<Value> = (2..=stack.height())
            .filter_map(|position| stack.get(position).cloned())
            .collect();
        let handle = scheduler.spawn(lua, routine, args, |cell| {
            to_value(lua, ThreadHandle { cell })
        })?;
        stack.push(Value::UserData(handle));
        Ok(1)
    })?;
    lua.globals().set("thread", thread)?;

    // ========== WAIT ==========
    let request = entry_point(lua, "wait", |lua, stack| {
        let seconds = number_arg(lua, stack, 1, "wait")?.max(0.0);
        push(lua, stack, Suspension(SuspendRequest::Wait(seconds)))?;
        Ok(1)
    })?;
    let yield_fn: Function = lua
        .globals()
        .get::<_, Table>("coroutine")?
        .get("yield")?;
    let wait: Function = lua
        .load(WAIT_GLUE)
        .set_name("=wait")
        .call((request, yield_fn))?;
    lua.globals().set("wait", wait)
}

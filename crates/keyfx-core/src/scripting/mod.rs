//! # Scripting Module
//!
//! Lua bindings for keyfx effects.
//!
//! ## Responsibilities
//! - **Type Setup**: registers every script-visible type with the [`registry`].
//! - **Capabilities**: installs `print`, `tocolor`, `fade`, `thread`, `wait` and `keyfx`.
//!
//! ## Pattern
//! All native functions follow: `entry_point(lua, "name", |lua, stack| { ...; Ok(pushed) })`
//!
//! ## Module Structure
//! - `registry`: descriptors, operand stack, push/check, entry point adapter
//! - `context`: controller slot, clock and leases shared with the environment
//! - `types`: value and script-owned types (RGBAColor, Interpolator, Thread, Suspension)
//! - `handles`: borrowed host views (KeyDatabase, KeyGroup, Key, RenderTarget)
//! - `utils`: argument decoding helpers
//! - `api/`: capability sub-modules

mod api;
pub mod context;
pub mod handles;
pub mod registry;
pub mod types;
pub mod utils;

pub use api::keyfx::set_database;
pub use context::{Clock, Lease, RuntimeContext};
pub use handles::{KeyDatabaseHandle, KeyGroupHandle, KeyHandle, RenderTargetHandle};
pub use registry::{check, check_opt, entry_point, push, register, Ownership, Stack, Tagged};
pub use types::ThreadHandle;

use crate::animation::Interpolator;
use crate::colors::RGBAColor;
use crate::scheduler::{Scheduler, Suspension};
use mlua::Lua;
use std::rc::Rc;

/// Registers the keyfx types and capability globals into `lua`.
pub fn open_keyfx(
    lua: &Lua,
    context: &Rc<RuntimeContext>,
    scheduler: &Rc<Scheduler>,
) -> mlua::Result<()> {
    lua.set_app_data(context.clock());

    register::<RGBAColor>(lua);
    register::<Interpolator>(lua);
    register::<ThreadHandle>(lua);
    register::<Suspension>(lua);
    register::<KeyDatabaseHandle>(lua);
    register::<KeyGroupHandle>(lua);
    register::<KeyHandle>(lua);
    register::<RenderTargetHandle>(lua);

    api::register_all(lua, context, scheduler)
}

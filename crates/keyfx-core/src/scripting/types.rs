//! # Scripting Types
//!
//! Script-visible value types and their method tables.
//!
//! ## Responsibilities
//! - **RGBAColor**: copied color value (`red`, `green`, `blue`, `alpha`, `blend`).
//! - **Interpolator**: pure fade evaluated on the environment clock.
//! - **ThreadHandle**: script view of a scheduled thread.
//! - **Suspension**: request yielded by suspending primitives, decoded by the scheduler.
//!
//! Borrowed device handles live in [`handles`](super::handles).

use crate::animation::{Interpolated, Interpolator};
use crate::colors::RGBAColor;
use crate::errors::ScriptError;
use crate::scheduler::{Suspension, ThreadCell, ThreadId, ThreadState};
use mlua::{Lua, MetaMethod, UserData, UserDataFields, UserDataMethods, Value};
use std::rc::Rc;

use super::context::Clock;
use super::registry::{from_value, to_value, Ownership, Tagged};
use super::utils::as_number;

impl Tagged for RGBAColor {
    const NAME: &'static str = "RGBAColor";
    const OWNERSHIP: Ownership = Ownership::Value;
}

impl UserData for RGBAColor {
    fn add_fields<'lua, F: UserDataFields<'lua, Self>>(fields: &mut F) {
        fields.add_field_method_get("red", |_, this| Ok(this.red));
        fields.add_field_method_get("green", |_, this| Ok(this.green));
        fields.add_field_method_get("blue", |_, this| Ok(this.blue));
        fields.add_field_method_get("alpha", |_, this| Ok(this.alpha));
    }

    fn add_methods<'lua, M: UserDataMethods<'lua, Self>>(methods: &mut M) {
        methods.add_meta_method(MetaMethod::ToString, |_, this, ()| Ok(this.to_string()));
        methods.add_meta_method(MetaMethod::Eq, |_, this, other: Value| {
            Ok(from_value::<RGBAColor>(Some(&other), 2).is_ok_and(|other| *this == other))
        });
        methods.add_method("blend", |lua, this, other: Value| {
            let over = from_value::<RGBAColor>(Some(&other), 2)?;
            to_value(lua, this.blend(over))
        });
    }
}

impl Tagged for Interpolator {
    const NAME: &'static str = "Interpolator";
    const OWNERSHIP: Ownership = Ownership::Script;
}

/// Converts an interpolated value back into a script value.
pub fn interpolated_value(lua: &Lua, value: Interpolated) -> mlua::Result<Value<'_>> {
    match value {
        Interpolated::Color(color) => to_value(lua, color),
        Interpolated::Number(number) => Ok(Value::Number(number)),
    }
}

impl UserData for Interpolator {
    fn add_fields<'lua, F: UserDataFields<'lua, Self>>(fields: &mut F) {
        fields.add_field_method_get("duration", |_, this| Ok(this.duration));
        fields.add_field_method_get("done", |lua, this| Ok(this.is_done(Clock::of(lua))));
    }

    fn add_methods<'lua, M: UserDataMethods<'lua, Self>>(methods: &mut M) {
        methods.add_method("value", |lua, this, ()| {
            interpolated_value(lua, this.value_at(Clock::of(lua)))
        });
        methods.add_method("at", |lua, this, elapsed: Value| {
            let elapsed = as_number(&elapsed)
                .ok_or_else(|| ScriptError::argument("at", 2, "elapsed time must be a number"))?;
            interpolated_value(lua, this.value_after(elapsed))
        });
        methods.add_meta_method(MetaMethod::ToString, |_, this, ()| {
            Ok(format!("Interpolator({}s)", this.duration))
        });
    }
}

/// Script handle of a scheduled thread.
///
/// The coroutine is kept in the handle's user value, so it is collected with the handle.
#[derive(Clone, Debug)]
pub struct ThreadHandle {
    pub cell: Rc<ThreadCell>,
}

impl ThreadHandle {
    pub fn id(&self) -> ThreadId {
        self.cell.id()
    }

    pub fn state(&self) -> ThreadState {
        self.cell.state()
    }
}

impl Tagged for ThreadHandle {
    const NAME: &'static str = "Thread";
    const OWNERSHIP: Ownership = Ownership::Script;
}

impl UserData for ThreadHandle {
    fn add_fields<'lua, F: UserDataFields<'lua, Self>>(fields: &mut F) {
        fields.add_field_method_get("id", |_, this| Ok(this.id()));
        fields.add_field_method_get("state", |_, this| Ok(this.state().name()));
    }

    fn add_methods<'lua, M: UserDataMethods<'lua, Self>>(methods: &mut M) {
        methods.add_meta_method(MetaMethod::ToString, |_, this, ()| {
            Ok(format!("Thread#{} ({})", this.id(), this.state().name()))
        });
        methods.add_meta_method(MetaMethod::Eq, |_, this, other: Value| {
            Ok(from_value::<ThreadHandle>(Some(&other), 2)
                .is_ok_and(|other| Rc::ptr_eq(&this.cell, &other.cell)))
        });
    }
}

impl Tagged for Suspension {
    const NAME: &'static str = "Suspension";
    const OWNERSHIP: Ownership = Ownership::Value;
}

impl UserData for Suspension {}

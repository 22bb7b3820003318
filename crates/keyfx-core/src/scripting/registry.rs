//! # Type Registry
//!
//! Marshaling of native values across the Lua boundary.
//!
//! ## Responsibilities
//! - **Descriptors**: each script-visible type registers its name and ownership once per Lua state.
//! - **push / check**: typed conversion between native values and tagged userdata.
//! - **Entry points**: native functions run against an explicit operand [`Stack`]; the adapter
//!   checks on exit that the body left exactly the results it declared.
//!
//! ## Pattern
//! ```ignore
//! entry_point(lua, "name", |lua, stack| {
//!     let x = check::<T>(stack, 1)?;
//!     push(lua, stack, y)?;
//!     Ok(1)
//! })
//! ```

use crate::errors::ScriptError;
use mlua::{Function, Lua, MultiValue, UserData, Value};
use std::any::TypeId;
use std::collections::HashMap;
use tracing::debug;

/// Who owns the native data behind a script value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    /// Copied into the userdata (colors).
    Value,
    /// Allocated for the script and released by the Lua collector (interpolators, threads).
    Script,
    /// Non-owning reference to host data, checked against a lease on every access.
    Borrowed,
}

/// A native type with a script-visible representation.
///
/// The method table is the type's [`UserData`] implementation.
pub trait Tagged: UserData + Clone + 'static {
    /// Unique script-visible type name, used in error messages.
    const NAME: &'static str;
    const OWNERSHIP: Ownership;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Descriptor {
    pub name: &'static str,
    pub ownership: Ownership,
}

impl Descriptor {
    pub fn of<T: Tagged>() -> Self {
        Self {
            name: T::NAME,
            ownership: T::OWNERSHIP,
        }
    }
}

/// Descriptors installed in one Lua state, kept in its app data.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    types: HashMap<TypeId, Descriptor>,
}

/// Installs `T`'s descriptor. Returns `false` if it was already installed.
pub fn register<T: Tagged>(lua: &Lua) -> bool {
    if lua.app_data_ref::<TypeRegistry>().is_none() {
        lua.set_app_data(TypeRegistry::default());
    }
    let Some(mut registry) = lua.app_data_mut::<TypeRegistry>() else {
        return false;
    };
    if registry.types.contains_key(&TypeId::of::<T>()) {
        debug!(name = T::NAME, "Type already registered");
        return false;
    }
    registry.types.insert(TypeId::of::<T>(), Descriptor::of::<T>());
    debug!(name = T::NAME, ownership = ?T::OWNERSHIP, "Registered script type");
    true
}

pub fn descriptor<T: Tagged>(lua: &Lua) -> Option<Descriptor> {
    lua.app_data_ref::<TypeRegistry>()
        .and_then(|registry| registry.types.get(&TypeId::of::<T>()).copied())
}

/// Names of every registered type, sorted.
pub fn registered_names(lua: &Lua) -> Vec<&'static str> {
    let mut names: Vec<&'static str> = lua
        .app_data_ref::<TypeRegistry>()
        .map(|registry| registry.types.values().map(|d| d.name).collect())
        .unwrap_or_default();
    names.sort_unstable();
    names
}

/// Operand stack of a native call: arguments at the bottom (1-based), results pushed on top.
#[derive(Debug, Default)]
pub struct Stack<'lua> {
    values: Vec<Value<'lua>>,
}

impl<'lua> Stack<'lua> {
    pub fn new() -> Self {
        Self { values: Vec::new() }
    }

    pub fn from_args(args: MultiValue<'lua>) -> Self {
        Self {
            values: args.into_vec(),
        }
    }

    pub fn height(&self) -> usize {
        self.values.len()
    }

    /// Value at a 1-based position.
    pub fn get(&self, position: usize) -> Option<&Value<'lua>> {
        position.checked_sub(1).and_then(|i| self.values.get(i))
    }

    pub fn push(&mut self, value: Value<'lua>) {
        self.values.push(value);
    }

    pub fn pop(&mut self) -> Option<Value<'lua>> {
        self.values.pop()
    }

    /// The top `count` values, bottom first.
    pub fn into_results(mut self, count: usize) -> MultiValue<'lua> {
        let split = self.values.len().saturating_sub(count);
        MultiValue::from_vec(self.values.split_off(split))
    }
}

/// Short description of a script value for error messages.
pub fn describe(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Nil) => "no value".to_string(),
        Some(value) => value.type_name().to_string(),
    }
}

/// Converts a native value into a tagged script value.
pub fn to_value<T: Tagged>(lua: &Lua, value: T) -> mlua::Result<Value<'_>> {
    if descriptor::<T>(lua).is_none() {
        return Err(ScriptError::Unregistered(T::NAME).into());
    }
    Ok(Value::UserData(lua.create_userdata(value)?))
}

/// Extracts a native value from a script value carrying `T`'s tag.
///
/// `position` is only used to build the error.
pub fn from_value<T: Tagged>(value: Option<&Value>, position: usize) -> Result<T, ScriptError> {
    match value {
        Some(Value::UserData(ud)) if ud.is::<T>() => ud
            .borrow::<T>()
            .map(|data| T::clone(&data))
            .map_err(|_| ScriptError::HandleBusy { type_name: T::NAME }),
        other => Err(ScriptError::TypeMismatch {
            position,
            expected: T::NAME,
            found: describe(other),
        }),
    }
}

/// Pushes `value` onto the stack as a `T` handle.
pub fn push<'lua, T: Tagged>(
    lua: &'lua Lua,
    stack: &mut Stack<'lua>,
    value: T,
) -> mlua::Result<()> {
    let value = to_value(lua, value)?;
    stack.push(value);
    Ok(())
}

/// Reads the `T` at `position` without touching the stack.
pub fn check<T: Tagged>(stack: &Stack, position: usize) -> Result<T, ScriptError> {
    from_value(stack.get(position), position)
}

/// Like [`check`], but a missing or nil argument yields `None`.
pub fn check_opt<T: Tagged>(stack: &Stack, position: usize) -> Result<Option<T>, ScriptError> {
    match stack.get(position) {
        None | Some(Value::Nil) => Ok(None),
        value => from_value(value, position).map(Some),
    }
}

/// Wraps a native body into a Lua function.
///
/// The body receives the call arguments on a [`Stack`], pushes its results and returns how many
/// it pushed. Only those results are returned to Lua.
pub fn entry_point<'lua, F>(
    lua: &'lua Lua,
    name: &'static str,
    body: F,
) -> mlua::Result<Function<'lua>>
where
    F: for<'a> Fn(&'a Lua, &mut Stack<'a>) -> mlua::Result<usize> + 'static,
{
    lua.create_function(move |lua, args: MultiValue| {
        let mut stack = Stack::from_args(args);
        let entry_height = stack.height();
        let pushed = body(lua, &mut stack)?;
        debug_assert_eq!(
            stack.height(),
            entry_height + pushed,
            "unbalanced stack in native function '{name}'"
        );
        Ok(stack.into_results(pushed))
    })
}

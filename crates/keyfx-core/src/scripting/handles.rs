//! # Borrowed Handles
//!
//! Non-owning script views of host data: the key database, its groups and keys, and render
//! targets.
//!
//! A handle holds a `Weak` reference plus a [`Lease`]. Every access re-validates both, so a
//! script (or a thread resumed much later) touching a handle after the host dropped the data or
//! detached the controller gets `StaleHandle` instead of reaching freed or foreign state.

use crate::animation::{Interpolated, Interpolator};
use crate::colors::RGBAColor;
use crate::device::{Key, KeyDatabase, KeyGroup, RenderTarget};
use crate::errors::ScriptError;
use mlua::{Lua, MetaMethod, UserData, UserDataFields, UserDataMethods, Value};
use std::cell::RefCell;
use std::rc::{Rc, Weak};

use super::context::{Clock, Lease};
use super::registry::{describe, from_value, to_value, Ownership, Tagged};
use super::utils::{as_index, as_number};

#[derive(Clone, Debug)]
pub struct KeyDatabaseHandle {
    database: Weak<KeyDatabase>,
    lease: Lease,
}

impl KeyDatabaseHandle {
    pub fn new(database: &Rc<KeyDatabase>, lease: Lease) -> Self {
        Self {
            database: Rc::downgrade(database),
            lease,
        }
    }

    pub fn resolve(&self) -> Result<Rc<KeyDatabase>, ScriptError> {
        let stale = ScriptError::StaleHandle {
            type_name: Self::NAME,
        };
        if !self.lease.is_live() {
            return Err(stale);
        }
        self.database.upgrade().ok_or(stale)
    }

    /// Address of the referenced database, for identity comparisons.
    pub fn as_ptr(&self) -> *const KeyDatabase {
        self.database.as_ptr()
    }

    pub fn key(&self, index: usize) -> KeyHandle {
        KeyHandle {
            database: self.clone(),
            index,
        }
    }

    fn group(&self, index: usize) -> KeyGroupHandle {
        KeyGroupHandle {
            database: self.clone(),
            index,
        }
    }
}

impl Tagged for KeyDatabaseHandle {
    const NAME: &'static str = "KeyDatabase";
    const OWNERSHIP: Ownership = Ownership::Borrowed;
}

impl UserData for KeyDatabaseHandle {
    fn add_methods<'lua, M: UserDataMethods<'lua, Self>>(methods: &mut M) {
        methods.add_meta_method(MetaMethod::Len, |_, this, ()| Ok(this.resolve()?.len()));
        methods.add_meta_method(MetaMethod::Index, |lua, this, key: Value| {
            let database = this.resolve()?;
            let found = match &key {
                Value::String(name) => database.find_name(&name.to_string_lossy()),
                other => as_index(other).and_then(|index| database.key(index)),
            };
            match found {
                Some(k) => to_value(lua, this.key(k.index)),
                None => Ok(Value::Nil),
            }
        });
        methods.add_method("find_key_code", |lua, this, code: Value| {
            let code = as_number(&code)
                .filter(|c| c.fract() == 0.0 && (0.0..=u32::MAX as f64).contains(c))
                .ok_or_else(|| {
                    let message = "key code must be an unsigned integer";
                    ScriptError::argument("find_key_code", 2, message)
                })?;
            match this.resolve()?.find_key_code(code as u32) {
                Some(k) => to_value(lua, this.key(k.index)),
                None => Ok(Value::Nil),
            }
        });
        methods.add_method("group", |lua, this, name: String| {
            match this.resolve()?.group_index(&name) {
                Some(index) => to_value(lua, this.group(index)),
                None => Ok(Value::Nil),
            }
        });
        methods.add_meta_method(MetaMethod::ToString, |_, this, ()| {
            Ok(format!("KeyDatabase({} keys)", this.resolve()?.len()))
        });
    }
}

#[derive(Clone, Debug)]
pub struct KeyGroupHandle {
    database: KeyDatabaseHandle,
    index: usize,
}

impl KeyGroupHandle {
    fn with_group<R>(&self, f: impl FnOnce(&KeyGroup) -> R) -> Result<R, ScriptError> {
        let database = self.database.resolve()?;
        database.group(self.index).map(f).ok_or(ScriptError::StaleHandle {
            type_name: Self::NAME,
        })
    }
}

impl Tagged for KeyGroupHandle {
    const NAME: &'static str = "KeyGroup";
    const OWNERSHIP: Ownership = Ownership::Borrowed;
}

impl UserData for KeyGroupHandle {
    fn add_fields<'lua, F: UserDataFields<'lua, Self>>(fields: &mut F) {
        fields.add_field_method_get("name", |_, this| Ok(this.with_group(|g| g.name.clone())?));
    }

    fn add_methods<'lua, M: UserDataMethods<'lua, Self>>(methods: &mut M) {
        methods.add_meta_method(MetaMethod::Len, |_, this, ()| {
            Ok(this.with_group(|g| g.keys.len())?)
        });
        methods.add_meta_method(MetaMethod::Index, |lua, this, position: Value| {
            let key = as_index(&position)
                .and_then(|i| this.with_group(|g| g.keys.get(i).copied()).transpose())
                .transpose()?;
            match key {
                Some(index) => to_value(lua, this.database.key(index)),
                None => Ok(Value::Nil),
            }
        });
        methods.add_method("contains", |_, this, key: Value| {
            let key = from_value::<KeyHandle>(Some(&key), 2)?;
            Ok(key.database.as_ptr() == this.database.as_ptr()
                && this.with_group(|g| g.keys.contains(&key.index))?)
        });
        methods.add_meta_method(MetaMethod::ToString, |_, this, ()| {
            Ok(format!("KeyGroup({})", this.with_group(|g| g.name.clone())?))
        });
    }
}

#[derive(Clone, Debug)]
pub struct KeyHandle {
    database: KeyDatabaseHandle,
    index: usize,
}

impl KeyHandle {
    /// Zero-based slot of the key in the database and in render targets.
    pub fn index(&self) -> usize {
        self.index
    }

    fn with_key<R>(&self, f: impl FnOnce(&Key) -> R) -> Result<R, ScriptError> {
        let database = self.database.resolve()?;
        database.key(self.index).map(f).ok_or(ScriptError::StaleHandle {
            type_name: Self::NAME,
        })
    }
}

impl Tagged for KeyHandle {
    const NAME: &'static str = "Key";
    const OWNERSHIP: Ownership = Ownership::Borrowed;
}

impl UserData for KeyHandle {
    fn add_fields<'lua, F: UserDataFields<'lua, Self>>(fields: &mut F) {
        fields.add_field_method_get("index", |_, this| Ok(this.with_key(|k| k.index + 1)?));
        fields.add_field_method_get("key_code", |_, this| Ok(this.with_key(|k| k.key_code)?));
        fields.add_field_method_get("name", |_, this| Ok(this.with_key(|k| k.name.clone())?));
        fields.add_field_method_get("x0", |_, this| Ok(this.with_key(|k| k.position.x0)?));
        fields.add_field_method_get("y0", |_, this| Ok(this.with_key(|k| k.position.y0)?));
        fields.add_field_method_get("x1", |_, this| Ok(this.with_key(|k| k.position.x1)?));
        fields.add_field_method_get("y1", |_, this| Ok(this.with_key(|k| k.position.y1)?));
    }

    fn add_methods<'lua, M: UserDataMethods<'lua, Self>>(methods: &mut M) {
        methods.add_meta_method(MetaMethod::Eq, |_, this, other: Value| {
            Ok(from_value::<KeyHandle>(Some(&other), 2).is_ok_and(|other| {
                other.index == this.index && other.database.as_ptr() == this.database.as_ptr()
            }))
        });
        methods.add_meta_method(MetaMethod::ToString, |_, this, ()| {
            Ok(format!("Key({})", this.with_key(|k| k.name.clone())?))
        });
    }
}

#[derive(Clone, Debug)]
pub struct RenderTargetHandle {
    target: Weak<RefCell<RenderTarget>>,
    lease: Lease,
}

impl RenderTargetHandle {
    pub fn new(target: &Rc<RefCell<RenderTarget>>, lease: Lease) -> Self {
        Self {
            target: Rc::downgrade(target),
            lease,
        }
    }

    pub fn resolve(&self) -> Result<Rc<RefCell<RenderTarget>>, ScriptError> {
        let stale = ScriptError::StaleHandle {
            type_name: Self::NAME,
        };
        if !self.lease.is_live() {
            return Err(stale);
        }
        self.target.upgrade().ok_or(stale)
    }

    /// Address of the referenced target, for identity comparisons.
    pub fn as_ptr(&self) -> *const RefCell<RenderTarget> {
        self.target.as_ptr()
    }

    fn read<R>(&self, f: impl FnOnce(&RenderTarget) -> R) -> Result<R, ScriptError> {
        let target = self.resolve()?;
        let guard = target.try_borrow().map_err(|_| ScriptError::HandleBusy {
            type_name: Self::NAME,
        })?;
        Ok(f(&guard))
    }

    fn write<R>(&self, f: impl FnOnce(&mut RenderTarget) -> R) -> Result<R, ScriptError> {
        let target = self.resolve()?;
        let mut guard = target.try_borrow_mut().map_err(|_| ScriptError::HandleBusy {
            type_name: Self::NAME,
        })?;
        Ok(f(&mut guard))
    }
}

/// Zero-based slot addressed by a 1-based integer or a Key handle.
fn target_slot(key: &Value, position: usize) -> Result<Option<usize>, ScriptError> {
    if let Value::UserData(ud) = key {
        if ud.is::<KeyHandle>() {
            return from_value::<KeyHandle>(Some(key), position).map(|k| Some(k.index));
        }
    }
    match key {
        Value::Integer(_) | Value::Number(_) => Ok(as_index(key)),
        other => Err(ScriptError::TypeMismatch {
            position,
            expected: "integer or Key",
            found: describe(Some(other)),
        }),
    }
}

/// A color for a render target slot: a color, or an interpolator sampled at `now`.
fn slot_color(lua: &Lua, value: &Value, position: usize) -> Result<RGBAColor, ScriptError> {
    if let Ok(color) = from_value::<RGBAColor>(Some(value), position) {
        return Ok(color);
    }
    match from_value::<Interpolator>(Some(value), position) {
        Ok(fade) => match fade.value_at(Clock::of(lua)) {
            Interpolated::Color(color) => Ok(color),
            Interpolated::Number(_) => Err(ScriptError::argument(
                "__newindex",
                position,
                "interpolator does not produce colors",
            )),
        },
        Err(_) => Err(ScriptError::TypeMismatch {
            position,
            expected: "RGBAColor or Interpolator",
            found: describe(Some(value)),
        }),
    }
}

impl Tagged for RenderTargetHandle {
    const NAME: &'static str = "RenderTarget";
    const OWNERSHIP: Ownership = Ownership::Borrowed;
}

impl UserData for RenderTargetHandle {
    fn add_methods<'lua, M: UserDataMethods<'lua, Self>>(methods: &mut M) {
        methods.add_meta_method(MetaMethod::Len, |_, this, ()| Ok(this.read(|t| t.len())?));
        methods.add_meta_method(MetaMethod::Index, |lua, this, key: Value| {
            let color = match target_slot(&key, 2)? {
                Some(slot) => this.read(|t| t.get(slot))?,
                None => None,
            };
            match color {
                Some(color) => to_value(lua, color),
                None => Ok(Value::Nil),
            }
        });
        methods.add_meta_method(MetaMethod::NewIndex, |lua, this, (key, value): (Value, Value)| {
            let color = slot_color(lua, &value, 3)?;
            let written = match target_slot(&key, 2)? {
                Some(slot) => this.write(|t| t.set(slot, color))?,
                None => false,
            };
            if !written {
                return Err(ScriptError::argument("__newindex", 2, "key index out of range").into());
            }
            Ok(())
        });
        methods.add_method("fill", |lua, this, value: Value| {
            let color = slot_color(lua, &value, 2)?;
            Ok(this.write(|t| t.fill(color))?)
        });
        methods.add_meta_method(MetaMethod::ToString, |_, this, ()| {
            Ok(format!("RenderTarget({} keys)", this.read(|t| t.len())?))
        });
    }
}

//! # Animation API
//!
//! `fade(from, to, duration[, easing])` creates an `Interpolator` starting at the current
//! environment time.
//!
//! Endpoints are two colors (`RGBAColor` values or strings resolved by the controller) or two
//! numbers. Interpolators are plain values: nothing schedules them, scripts sample them with
//! `value()` / `at(t)` or by assigning them to a render target slot.

use crate::animation::{EasingType, Endpoints, Interpolator};
use crate::colors::RGBAColor;
use crate::errors::ScriptError;
use mlua::{Lua, Value};
use std::rc::Rc;

use super::super::context::RuntimeContext;
use super::super::registry::{describe, entry_point, from_value, push, Stack};
use super::super::utils::{as_number, number_arg};

pub fn register(lua: &Lua, context: &Rc<RuntimeContext>) -> mlua::Result<()> {
    let context = context.clone();

    // ========== FADE ==========
    let fade = entry_point(lua, "fade", move |lua, stack| {
        let endpoints = endpoints(&context, stack)?;
        let duration = number_arg(lua, stack, 3, "fade")?;
        if duration < 0.0 {
            return Err(ScriptError::argument("fade", 3, "duration must not be negative").into());
        }
        let easing = easing(&context, stack)?;
        let fade = Interpolator::new(endpoints, context.now(), duration, easing);
        push(lua, stack, fade)?;
        Ok(1)
    })?;
    lua.globals().set("fade", fade)
}

fn endpoints(context: &RuntimeContext, stack: &Stack) -> Result<Endpoints, ScriptError> {
    let from = stack.get(1);
    let to = stack.get(2);
    if let (Some(a), Some(b)) = (from.and_then(as_number), to.and_then(as_number)) {
        return Ok(Endpoints::Number(a, b));
    }
    if from.and_then(as_number).is_some() || to.and_then(as_number).is_some() {
        return Err(ScriptError::argument(
            "fade",
            2,
            format!(
                "endpoints must both be numbers or both colors, got {} and {}",
                describe(from),
                describe(to)
            ),
        ));
    }
    Ok(Endpoints::Color(
        endpoint_color(context, from, 1)?,
        endpoint_color(context, to, 2)?,
    ))
}

fn endpoint_color(
    context: &RuntimeContext,
    value: Option<&Value>,
    position: usize,
) -> Result<RGBAColor, ScriptError> {
    match value {
        Some(Value::String(text)) => {
            let text = text.to_string_lossy();
            context
                .controller()?
                .parse_color(&text)
                .ok_or_else(|| {
                    ScriptError::argument("fade", position, format!("unknown color '{text}'"))
                })
        }
        Some(Value::UserData(_)) => from_value::<RGBAColor>(value, position),
        other => Err(ScriptError::argument(
            "fade",
            position,
            format!("color or number expected, got {}", describe(other)),
        )),
    }
}

fn easing(context: &RuntimeContext, stack: &Stack) -> Result<EasingType, ScriptError> {
    match stack.get(4) {
        None | Some(Value::Nil) => Ok(context.default_easing()),
        Some(Value::String(name)) => {
            let name = name.to_string_lossy();
            EasingType::from_name(&name)
                .ok_or_else(|| ScriptError::argument("fade", 4, format!("unknown easing '{name}'")))
        }
        other => Err(ScriptError::argument(
            "fade",
            4,
            format!("easing name expected, got {}", describe(other)),
        )),
    }
}

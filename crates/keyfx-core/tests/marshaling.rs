//! Host-side marshaling through an environment's type registry.

mod common;

use common::{attached, eval};
use keyfx_core::animation::{Endpoints, Interpolator};
use keyfx_core::scripting::registry::{descriptor, registered_names};
use keyfx_core::scripting::{
    check, check_opt, entry_point, push, register, Ownership, Stack, ThreadHandle,
};
use keyfx_core::{RGBAColor, ScriptError};

#[test]
fn environment_registers_every_type() {
    let (env, _recorder) = attached();
    assert_eq!(
        registered_names(env.lua()),
        vec![
            "Interpolator",
            "Key",
            "KeyDatabase",
            "KeyGroup",
            "RGBAColor",
            "RenderTarget",
            "Suspension",
            "Thread",
        ]
    );
    assert_eq!(
        descriptor::<RGBAColor>(env.lua()).map(|d| d.ownership),
        Some(Ownership::Value)
    );
    assert_eq!(
        descriptor::<ThreadHandle>(env.lua()).map(|d| d.ownership),
        Some(Ownership::Script)
    );
}

#[test]
fn registering_twice_is_harmless() {
    let (env, _recorder) = attached();
    assert!(!register::<RGBAColor>(env.lua()));
    assert!(!register::<RGBAColor>(env.lua()));
    assert_eq!(registered_names(env.lua()).len(), 8);
    assert_eq!(eval::<String>(&env, "tostring(tocolor(1, 2, 3))"), "#010203FF");
}

#[test]
fn push_then_check_copies_values() {
    let (env, _recorder) = attached();
    let mut stack = Stack::new();
    let color = RGBAColor::new(1, 2, 3, 4);
    push(env.lua(), &mut stack, color).unwrap();
    let back = check::<RGBAColor>(&stack, 1).unwrap();
    assert_eq!(back, color);
    assert_eq!(back.alpha, 4);

    let err = check::<Interpolator>(&stack, 1).unwrap_err();
    assert!(matches!(err, ScriptError::TypeMismatch { expected: "Interpolator", .. }));
    assert!(matches!(
        check::<RGBAColor>(&stack, 2),
        Err(ScriptError::TypeMismatch { position: 2, .. })
    ));
    assert_eq!(check_opt::<RGBAColor>(&stack, 2), Ok(None));
    assert_eq!(stack.height(), 1);
}

#[test]
fn host_values_reach_scripts() {
    let (env, _recorder) = attached();
    let fade = Interpolator::new(Endpoints::Number(0.0, 1.0), 0.0, 4.0, Default::default());
    let value = env.push_value(fade).unwrap();
    env.lua().globals().set("host_fade", value).unwrap();
    assert_eq!(eval::<f64>(&env, "host_fade:at(1)"), 0.25);

    let value: mlua::Value = eval(&env, "host_fade");
    let back = env.check_value::<Interpolator>(&value, 1).unwrap();
    assert_eq!(back.duration, 4.0);
    assert!(env.check_value::<RGBAColor>(&value, 1).is_err());
}

#[test]
fn entry_points_marshal_through_stack() {
    let (env, _recorder) = attached();
    let darken = entry_point(env.lua(), "darken", |lua, stack| {
        let color = check::<RGBAColor>(stack, 1)?;
        let dark = RGBAColor::new(color.red / 2, color.green / 2, color.blue / 2, color.alpha);
        push(lua, stack, dark)?;
        Ok(1)
    })
    .unwrap();
    env.lua().globals().set("darken", darken).unwrap();

    assert_eq!(eval::<String>(&env, "tostring(darken(tocolor(200, 100, 50)))"), "#643219FF");
    let message: String = eval(&env, "tostring(select(2, pcall(darken, 5)))");
    assert!(message.contains("RGBAColor expected, got integer"), "{message}");
}

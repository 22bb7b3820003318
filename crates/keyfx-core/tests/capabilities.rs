//! Capability functions as scripts see them: `print`, `tocolor`, `fade` and `keyfx`.

mod common;

use common::{attached, detached, eval};
use keyfx_core::{EngineError, RGBAColor, ScriptError};

#[test]
fn print_concatenates_without_separator() {
    let (env, recorder) = attached();
    env.load("print", "print('a', 1, nil, true) print() print(tocolor(1, 2, 3))")
        .unwrap();
    assert_eq!(recorder.lines(), vec!["a1niltrue", "", "#010203FF"]);
}

#[test]
fn print_requires_controller() {
    let env = detached();
    let err = env.load("print", "print('lost')").unwrap_err();
    assert_eq!(err.script_error(), Some(&ScriptError::NoController));

    let caught: bool = eval(&env, "not pcall(print, 'lost')");
    assert!(caught);
}

#[test]
fn tocolor_text_matches_channels() {
    let (env, _recorder) = attached();
    assert!(eval::<bool>(&env, r##"tocolor("#112233") == tocolor(0x11, 0x22, 0x33)"##));
    assert_eq!(eval::<u8>(&env, r##"tocolor("#112233").alpha"##), 255);
    assert_eq!(eval::<u8>(&env, "tocolor(0x11, 0x22, 0x33).alpha"), 255);
    assert_eq!(eval::<String>(&env, "tostring(tocolor('orange'))"), "#FFA500FF");
}

#[test]
fn tocolor_wrong_arity_is_nil() {
    let (env, _recorder) = attached();
    for call in [
        "tocolor()",
        "tocolor(1, 2)",
        "tocolor(1, 2, 3, 4, 5)",
        "tocolor(1, 'x', 3)",
        "tocolor({})",
        "tocolor('not a color')",
    ] {
        assert!(eval::<bool>(&env, &format!("{call} == nil")), "{call}");
    }
}

#[test]
fn tocolor_clamps_channels() {
    let (env, _recorder) = attached();
    let channels = "(function(c) return c.red, c.green, c.blue, c.alpha end)";
    let (r, g, b, a): (u8, u8, u8, u8) =
        eval(&env, &format!("{channels}(tocolor(300, -5, 127.6, 64))"));
    assert_eq!((r, g, b, a), (255, 0, 128, 64));
}

#[test]
fn tocolor_coerces_numeric_strings() {
    let (env, _recorder) = attached();
    assert_eq!(eval::<String>(&env, "tostring(tocolor('1', '2', '3'))"), "#010203FF");
    assert_eq!(eval::<String>(&env, "tostring(tocolor('0x10', 32, 48, '128'))"), "#10203080");
    assert!(eval::<bool>(&env, "tocolor('1', 'two', '3') == nil"));
}

#[test]
fn tocolor_numbers_work_without_controller() {
    let env = detached();
    assert_eq!(eval::<String>(&env, "tostring(tocolor(255, 0, 0))"), "#FF0000FF");

    let err = env.load("tocolor", "tocolor('red')").unwrap_err();
    assert_eq!(err.script_error(), Some(&ScriptError::NoController));
}

#[test]
fn colors_ignore_alpha_when_compared() {
    let (env, _recorder) = attached();
    assert!(eval::<bool>(&env, "tocolor(1, 2, 3, 4) == tocolor(1, 2, 3, 200)"));
    assert!(eval::<bool>(&env, "tocolor(1, 2, 3) ~= tocolor(1, 2, 4)"));
    let blended: String =
        eval(&env, "tostring(tocolor(0, 0, 0):blend(tocolor(255, 255, 255, 255)))");
    assert_eq!(blended, "#FFFFFFFF");
}

#[test]
fn host_side_checks_see_script_colors() {
    let (env, _recorder) = attached();
    let value: mlua::Value = eval(&env, "tocolor('#0A0B0C')");
    let color = env.check_value::<RGBAColor>(&value, 1).unwrap();
    assert_eq!(color, RGBAColor::new(10, 11, 12, 0));
    assert_eq!(color.alpha, 255);
}

#[test]
fn fade_numbers_follow_clock() {
    let (env, _recorder) = attached();
    env.load("fade", "f = fade(0, 10, 2)").unwrap();
    env.tick(1.0).unwrap();
    assert_eq!(eval::<f64>(&env, "f:value()"), 5.0);
    assert!(!eval::<bool>(&env, "f.done"));
    assert_eq!(eval::<f64>(&env, "f:at(4)"), 10.0);
    assert_eq!(eval::<f64>(&env, "f:at(-1)"), 0.0);
    env.tick(2.0).unwrap();
    assert!(eval::<bool>(&env, "f.done"));
    assert_eq!(eval::<f64>(&env, "f.duration"), 2.0);
}

#[test]
fn fade_colors_from_names_and_values() {
    let (env, _recorder) = attached();
    env.load("fade", "f = fade('black', tocolor(255, 255, 255), 1, 'ease_in_out')")
        .unwrap();
    assert!(eval::<bool>(&env, "f:at(0) == tocolor('black')"));
    assert!(eval::<bool>(&env, "f:at(1) == tocolor('white')"));
    assert!(eval::<bool>(&env, "f:at(5) == tocolor('white')"));
}

#[test]
fn fade_zero_duration_is_finished() {
    let (env, _recorder) = attached();
    assert_eq!(eval::<f64>(&env, "fade(3, 7, 0):value()"), 7.0);
}

#[test]
fn fade_rejects_bad_arguments() {
    let (env, _recorder) = attached();
    for call in [
        "fade(0, 'red', 1)",
        "fade(0, 1, -1)",
        "fade(0, 1, 'soon')",
        "fade(0, 1, 1, 'wobbly')",
        "fade('no such color', 'red', 1)",
        "fade({}, {}, 1)",
    ] {
        let err = env.load("fade", call).unwrap_err();
        assert!(
            matches!(err.script_error(), Some(ScriptError::ArgumentError { function: "fade", .. })),
            "{call}: {err}"
        );
    }
}

#[test]
fn keyfx_now_reports_clock() {
    let (env, _recorder) = attached();
    assert_eq!(eval::<f64>(&env, "keyfx.now()"), 0.0);
    env.tick(2.5).unwrap();
    assert_eq!(eval::<f64>(&env, "keyfx.now()"), 2.5);
    assert!(eval::<bool>(&env, "keyfx.db == nil"));
}

#[test]
fn script_errors_surface_as_lua_errors() {
    let (env, _recorder) = attached();
    let err = env.load("broken", "error('nope')").unwrap_err();
    assert!(matches!(err, EngineError::Lua(_)));
    assert!(err.to_string().contains("nope"));
}

//! Borrowed host views: key database, keys, groups and render targets.

mod common;

use common::{attached, eval, layout};
use keyfx_core::scripting::{check, push, KeyHandle, RenderTargetHandle, Stack};
use keyfx_core::{RGBAColor, RenderTarget, ScriptError};
use std::cell::RefCell;
use std::rc::Rc;

#[test]
fn render_target_round_trips_identity() {
    let (env, _recorder) = attached();
    let target = Rc::new(RefCell::new(RenderTarget::new(4)));
    let mut stack = Stack::new();
    push(env.lua(), &mut stack, env.borrow_render_target(&target)).unwrap();

    let back = check::<RenderTargetHandle>(&stack, 1).unwrap();
    assert_eq!(back.as_ptr(), Rc::as_ptr(&target));

    let err = check::<KeyHandle>(&stack, 1).unwrap_err();
    assert_eq!(
        err,
        ScriptError::TypeMismatch {
            position: 1,
            expected: "Key",
            found: "userdata".to_string(),
        }
    );
    assert_eq!(stack.height(), 1);
}

#[test]
fn render_writes_into_target() {
    let (env, _recorder) = attached();
    env.load(
        "render",
        r#"
        frames = 0
        function render(elapsed, target)
            frames = frames + 1
            last_elapsed = elapsed
            target:fill(tocolor(0, 0, 0))
            target[1] = tocolor(255, 0, 0)
            target[#target] = tocolor(0, 0, 255)
        end
        "#,
    )
    .unwrap();
    let target = Rc::new(RefCell::new(RenderTarget::new(3)));

    assert!(env.render(0.0, &target).unwrap());
    assert_eq!(eval::<f64>(&env, "last_elapsed"), 0.0);
    assert!(env.render(0.25, &target).unwrap());
    assert_eq!(eval::<f64>(&env, "last_elapsed"), 250.0);
    assert_eq!(eval::<i64>(&env, "frames"), 2);

    let target = target.borrow();
    assert_eq!(target.get(0), Some(RGBAColor::new(255, 0, 0, 255)));
    assert_eq!(target.get(1), Some(RGBAColor::new(0, 0, 0, 255)));
    assert_eq!(target.get(2), Some(RGBAColor::new(0, 0, 255, 255)));
}

#[test]
fn render_without_entry_point() {
    let (env, _recorder) = attached();
    let target = Rc::new(RefCell::new(RenderTarget::new(1)));
    assert!(!env.render(0.0, &target).unwrap());
}

#[test]
fn target_slots_validate_index_and_value() {
    let (env, _recorder) = attached();
    env.load(
        "slots",
        r#"
        function render(_, target)
            ok_range = pcall(function() target[9] = tocolor(1, 1, 1) end)
            ok_value = pcall(function() target[1] = "red" end)
            missing = target[9]
        end
        "#,
    )
    .unwrap();
    let target = Rc::new(RefCell::new(RenderTarget::new(2)));
    env.render(0.0, &target).unwrap();
    assert!(!eval::<bool>(&env, "ok_range"));
    assert!(!eval::<bool>(&env, "ok_value"));
    assert!(eval::<bool>(&env, "missing == nil"));
}

#[test]
fn interpolator_assigned_to_slot_samples_clock() {
    let (env, _recorder) = attached();
    env.load(
        "fade",
        r#"
        pulse = fade(tocolor(0, 0, 0), tocolor(200, 100, 0), 2)
        function render(_, target)
            target[1] = pulse
        end
        "#,
    )
    .unwrap();
    let target = Rc::new(RefCell::new(RenderTarget::new(1)));
    env.render(1.0, &target).unwrap();
    assert_eq!(target.borrow().get(0), Some(RGBAColor::new(100, 50, 0, 255)));
    env.render(3.0, &target).unwrap();
    assert_eq!(target.borrow().get(0), Some(RGBAColor::new(200, 100, 0, 255)));
}

#[test]
fn key_database_lookups() {
    let (env, _recorder) = attached();
    let db = layout();
    env.set_key_database(&db).unwrap();

    assert_eq!(eval::<usize>(&env, "#keyfx.db"), 3);
    assert_eq!(eval::<String>(&env, "keyfx.db[1].name"), "ESC");
    assert_eq!(eval::<u32>(&env, "keyfx.db['a'].key_code"), 30);
    assert_eq!(eval::<usize>(&env, "keyfx.db:find_key_code(48).index"), 3);
    assert!(eval::<bool>(&env, "keyfx.db[4] == nil"));
    assert!(eval::<bool>(&env, "keyfx.db:find_key_code(999) == nil"));
    assert!(eval::<bool>(&env, "keyfx.db[2] == keyfx.db.A"));

    let (x0, y0, x1, y1): (u32, u32, u32, u32) =
        eval(&env, "(function(k) return k.x0, k.y0, k.x1, k.y1 end)(keyfx.db[2])");
    assert_eq!((x0, y0, x1, y1), (20, 30, 30, 40));

    assert_eq!(eval::<String>(&env, "keyfx.db:group('letters').name"), "letters");
    assert_eq!(eval::<usize>(&env, "#keyfx.db:group('letters')"), 2);
    assert!(eval::<bool>(&env, "keyfx.db:group('letters'):contains(keyfx.db.B)"));
    assert!(!eval::<bool>(&env, "keyfx.db:group('letters'):contains(keyfx.db.ESC)"));
    assert!(eval::<bool>(&env, "keyfx.db:group('numbers') == nil"));
}

#[test]
fn find_key_code_rejects_non_integral_codes() {
    let (env, _recorder) = attached();
    let db = layout();
    env.set_key_database(&db).unwrap();

    for code in ["-1", "30.9", "2^40", "'thirty'"] {
        let source =
            format!("tostring(select(2, pcall(keyfx.db.find_key_code, keyfx.db, {code})))");
        let message: String = eval(&env, &source);
        assert!(message.contains("unsigned integer"), "{code}: {message}");
    }
    assert_eq!(eval::<usize>(&env, "keyfx.db:find_key_code(30.0).index"), 2);
}

#[test]
fn keys_address_render_slots() {
    let (env, _recorder) = attached();
    let db = layout();
    env.set_key_database(&db).unwrap();
    env.load(
        "keys",
        r#"
        function render(_, target)
            local letters = keyfx.db:group("letters")
            for i = 1, #letters do
                target[letters[i]] = tocolor("green")
            end
        end
        "#,
    )
    .unwrap();
    let target = Rc::new(RefCell::new(RenderTarget::new(3)));
    env.render(0.0, &target).unwrap();
    let target = target.borrow();
    assert_eq!(target.get(0), Some(RGBAColor::new(0, 0, 0, 0)));
    assert_eq!(target.get(1), Some(RGBAColor::new(0, 255, 0, 255)));
    assert_eq!(target.get(2), Some(RGBAColor::new(0, 255, 0, 255)));
}

#[test]
fn key_events_reach_script() {
    let (env, recorder) = attached();
    let db = layout();
    env.set_key_database(&db).unwrap();
    env.load(
        "events",
        "function onKeyEvent(key, pressed) print(key.name, ':', pressed) end",
    )
    .unwrap();
    assert!(env.key_event(1, true).unwrap());
    assert!(!env.key_event(7, true).unwrap());
    assert_eq!(recorder.lines(), vec!["A:true"]);
}

#[test]
fn handles_go_stale_after_detach() {
    let (env, _recorder) = attached();
    let db = layout();
    env.set_key_database(&db).unwrap();
    env.load(
        "stale",
        r#"
        db = keyfx.db
        function render(_, target) saved = target end
        "#,
    )
    .unwrap();
    let target = Rc::new(RefCell::new(RenderTarget::new(2)));
    env.render(0.0, &target).unwrap();
    assert_eq!(eval::<usize>(&env, "#saved"), 2);

    env.detach_controller().unwrap();
    let message: String = eval(&env, "tostring(select(2, pcall(function() return #saved end)))");
    assert!(message.contains("RenderTarget handle is no longer valid"), "{message}");
    assert!(!eval::<bool>(&env, "pcall(function() return #db end)"));
}

#[test]
fn handles_go_stale_when_host_drops_data() {
    let (env, _recorder) = attached();
    let db = layout();
    env.set_key_database(&db).unwrap();
    env.load("keep", "db = keyfx.db function render(_, target) saved = target end")
        .unwrap();
    let target = Rc::new(RefCell::new(RenderTarget::new(2)));
    env.render(0.0, &target).unwrap();

    drop(target);
    drop(db);
    assert!(!eval::<bool>(&env, "pcall(function() return #saved end)"));
    assert!(!eval::<bool>(&env, "pcall(function() return db[1] end)"));
}

#[test]
fn reattaching_publishes_fresh_database_handle() {
    let (env, recorder) = attached();
    let db = layout();
    env.set_key_database(&db).unwrap();
    env.detach_controller().unwrap();
    let controller: Rc<dyn keyfx_core::Controller> = recorder.clone();
    env.attach_controller(&controller).unwrap();
    assert_eq!(eval::<usize>(&env, "#keyfx.db"), 3);
}

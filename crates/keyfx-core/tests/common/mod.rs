//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use keyfx_core::{Controller, Environment, EnvironmentConfig, KeyDatabase, Palette, RGBAColor};
use mlua::FromLuaMulti;
use std::cell::RefCell;
use std::rc::Rc;

/// Controller that records every printed line and resolves colors through the default palette.
#[derive(Default)]
pub struct Recorder {
    lines: RefCell<Vec<String>>,
    palette: Palette,
}

impl Recorder {
    pub fn lines(&self) -> Vec<String> {
        self.lines.borrow().clone()
    }
}

impl Controller for Recorder {
    fn print(&self, text: &str) {
        self.lines.borrow_mut().push(text.to_string());
    }

    fn parse_color(&self, text: &str) -> Option<RGBAColor> {
        self.palette.parse(text)
    }
}

/// An environment with a [`Recorder`] attached. Keep the recorder alive for the test.
pub fn attached() -> (Environment, Rc<Recorder>) {
    let env = Environment::new(EnvironmentConfig::default()).unwrap();
    let recorder = Rc::new(Recorder::default());
    let controller: Rc<dyn Controller> = recorder.clone();
    env.attach_controller(&controller).unwrap();
    (env, recorder)
}

pub fn detached() -> Environment {
    Environment::new(EnvironmentConfig::default()).unwrap()
}

pub fn eval<'lua, T: FromLuaMulti<'lua>>(env: &'lua Environment, source: &str) -> T {
    env.lua().load(source).eval().unwrap()
}

pub fn layout() -> Rc<KeyDatabase> {
    Rc::new(
        KeyDatabase::from_json(
            r#"{
                "keys": [
                    {"key_code": 1, "name": "ESC",
                     "position": {"x0": 0, "y0": 0, "x1": 10, "y1": 10}},
                    {"key_code": 30, "name": "A",
                     "position": {"x0": 20, "y0": 30, "x1": 30, "y1": 40}},
                    {"key_code": 48, "name": "B"}
                ],
                "groups": [{"name": "letters", "keys": [1, 2]}]
            }"#,
        )
        .unwrap(),
    )
}

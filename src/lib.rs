//! # keyfx
//!
//! Scriptable per-key lighting effects.
//!
//! This crate re-exports [`keyfx_core`], the Lua runtime that runs effect scripts, together with
//! the `mlua` version it is built against. The `keyfx` binary lives in `crates/keyfx-cli`.
//!
//! ```rust,no_run
//! use keyfx::{Controller, Environment, EnvironmentConfig, PaletteController, RenderTarget};
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! let env = Environment::new(EnvironmentConfig::default()).unwrap();
//! let controller: Rc<dyn Controller> = Rc::new(PaletteController::default());
//! env.attach_controller(&controller).unwrap();
//! env.load("solid", "function render(_, target) target:fill(tocolor('teal')) end").unwrap();
//!
//! let target = Rc::new(RefCell::new(RenderTarget::new(104)));
//! env.render(0.0, &target).unwrap();
//! ```

pub use keyfx_core::*;

// Re-export mlua for hosts that marshal values themselves
pub use mlua;

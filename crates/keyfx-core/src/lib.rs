//! # keyfx
//!
//! `keyfx-core` runs user-authored Lua effects that animate per-key RGB lighting.
//!
//! Scripts get a small, capability-based API: colors, text output, timed fades and cooperative
//! threads. Everything that touches hardware stays in the host, reached through a [`Controller`]
//! and the [`KeyDatabase`](device::KeyDatabase) / [`RenderTarget`](device::RenderTarget) views.
//!
//! ## Core Features
//!
//! *   **Color Model**: `RGBColor` / `RGBAColor` with canonical hex printing and parsing.
//! *   **Marshaling**: typed push/check of native values through tagged Lua userdata.
//! *   **Threads**: `thread(fn)` and `wait(seconds)` backed by Lua coroutines, resumed on each
//!     tick while their handle is referenced.
//! *   **Fades**: pure interpolators between colors or numbers with selectable easing.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use keyfx_core::{Controller, Environment, EnvironmentConfig, PaletteController};
//! use std::rc::Rc;
//!
//! let env = Environment::new(EnvironmentConfig::default()).unwrap();
//! let controller: Rc<dyn Controller> = Rc::new(PaletteController::default());
//! env.attach_controller(&controller).unwrap();
//! env.load("effect", "ticker = thread(function() wait(1) print('tick') end)").unwrap();
//! env.tick(0.0).unwrap();
//! ```

/// Color value types.
pub mod colors;

/// Named colors.
pub mod palette;

/// Easing curves and interpolators.
pub mod animation;

/// Host-owned key layout and render target types.
pub mod device;

/// Lua bindings: type registry, handles and capability functions.
pub mod scripting;

/// Cooperative thread scheduler.
pub mod scheduler;

/// The per-effect Lua environment.
pub mod environment;

pub mod config;
pub mod errors;

pub use colors::{RGBAColor, RGBColor};
pub use config::EnvironmentConfig;
pub use device::{Key, KeyDatabase, KeyGroup, KeyRect, RenderTarget};
pub use environment::Environment;
pub use errors::{EngineError, ScriptError, ThreadFailure};
pub use palette::Palette;
pub use scheduler::{ThreadId, ThreadState, TickSummary};

use tracing::info;

/// The device-side capability an environment talks to.
///
/// Scripts reach it only through `print`, `tocolor` and `fade`; environments hold it weakly.
pub trait Controller {
    /// Receives the text of a script `print` call.
    fn print(&self, text: &str);

    /// Resolves a color description. Returns `None` if it is not a color.
    ///
    /// The default implementation accepts hex forms only.
    fn parse_color(&self, text: &str) -> Option<RGBAColor> {
        let (color, ok) = RGBAColor::parse(text);
        ok.then_some(color)
    }
}

/// A controller that logs script output and resolves color names through a [`Palette`].
#[derive(Debug, Default)]
pub struct PaletteController {
    palette: Palette,
}

impl PaletteController {
    pub fn new(palette: Palette) -> Self {
        Self { palette }
    }
}

impl Controller for PaletteController {
    fn print(&self, text: &str) {
        info!(target: "keyfx::script", "{}", text);
    }

    fn parse_color(&self, text: &str) -> Option<RGBAColor> {
        self.palette.parse(text)
    }
}

//! # Runtime Context
//!
//! State shared between an [`Environment`](crate::Environment) and the native functions it
//! installs into Lua.
//!
//! ## Responsibilities
//! - **Controller slot**: weak, swappable reference to the attached controller.
//! - **Clock**: environment time in seconds, advanced by each tick.
//! - **Leases**: generation counter that borrowed handles check on every access.

use crate::animation::EasingType;
use crate::errors::ScriptError;
use crate::Controller;
use mlua::Lua;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

/// Environment time in seconds.
///
/// A copy lives in Lua app data so userdata methods (which cannot capture state) can read it.
#[derive(Clone, Debug, Default)]
pub struct Clock(Rc<Cell<f64>>);

impl Clock {
    pub fn now(&self) -> f64 {
        self.0.get()
    }

    pub fn set(&self, now: f64) {
        self.0.set(now);
    }

    /// Current time of the environment owning `lua`, or zero outside an environment.
    pub fn of(lua: &Lua) -> f64 {
        lua.app_data_ref::<Clock>().map(|c| c.now()).unwrap_or(0.0)
    }
}

/// Validity token carried by every borrowed handle.
#[derive(Clone, Debug)]
pub struct Lease {
    generation: u64,
    current: Rc<Cell<u64>>,
}

impl Lease {
    pub fn is_live(&self) -> bool {
        self.current.get() == self.generation
    }
}

pub struct RuntimeContext {
    controller: RefCell<Option<Weak<dyn Controller>>>,
    clock: Clock,
    generation: Rc<Cell<u64>>,
    default_easing: EasingType,
}

impl RuntimeContext {
    pub fn new(default_easing: EasingType) -> Self {
        Self {
            controller: RefCell::new(None),
            clock: Clock::default(),
            generation: Rc::new(Cell::new(0)),
            default_easing,
        }
    }

    pub fn clock(&self) -> Clock {
        self.clock.clone()
    }

    pub fn now(&self) -> f64 {
        self.clock.now()
    }

    pub fn default_easing(&self) -> EasingType {
        self.default_easing
    }

    /// The attached controller, or `NoController` if none is attached or it was dropped.
    pub fn controller(&self) -> Result<Rc<dyn Controller>, ScriptError> {
        self.controller
            .borrow()
            .as_ref()
            .and_then(Weak::upgrade)
            .ok_or(ScriptError::NoController)
    }

    pub fn has_controller(&self) -> bool {
        self.controller().is_ok()
    }

    pub fn attach(&self, controller: &Rc<dyn Controller>) {
        *self.controller.borrow_mut() = Some(Rc::downgrade(controller));
    }

    /// Clears the controller slot; returns whether one was attached.
    pub fn detach(&self) -> bool {
        self.controller.borrow_mut().take().is_some()
    }

    /// A lease valid until the next [`revoke_leases`](Self::revoke_leases).
    pub fn lease(&self) -> Lease {
        Lease {
            generation: self.generation.get(),
            current: self.generation.clone(),
        }
    }

    pub fn revoke_leases(&self) {
        self.generation.set(self.generation.get() + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colors::RGBAColor;

    struct Silent;

    impl Controller for Silent {
        fn print(&self, _text: &str) {}
        fn parse_color(&self, _text: &str) -> Option<RGBAColor> {
            None
        }
    }

    #[test]
    fn controller_slot_is_weak() {
        let context = RuntimeContext::new(EasingType::Linear);
        assert_eq!(context.controller().err(), Some(ScriptError::NoController));
        let controller: Rc<dyn Controller> = Rc::new(Silent);
        context.attach(&controller);
        assert!(context.has_controller());
        drop(controller);
        assert!(!context.has_controller());
    }

    #[test]
    fn revoked_leases_are_dead() {
        let context = RuntimeContext::new(EasingType::Linear);
        let lease = context.lease();
        assert!(lease.is_live());
        context.revoke_leases();
        assert!(!lease.is_live());
        assert!(context.lease().is_live());
    }
}

//! # Environment Module
//!
//! One Lua state running one effect.
//!
//! ## Responsibilities
//! - **Setup**: creates the Lua state and installs the keyfx types and capabilities.
//! - **Controller slot**: attach/detach; detaching cancels threads and invalidates handles.
//! - **Host calls**: `load`, `invoke`, `render`, `key_event`.
//! - **Scheduling**: `tick` advances the clock and resumes due threads.
//!
//! An `Environment` is single-threaded and not `Send`.

use crate::config::EnvironmentConfig;
use crate::device::{KeyDatabase, RenderTarget};
use crate::errors::{EngineError, ScriptError, ThreadFailure};
use crate::scheduler::{Scheduler, ThreadId, ThreadState, TickSummary};
use crate::scripting::registry::{from_value, to_value};
use crate::scripting::{self, KeyDatabaseHandle, RenderTargetHandle, RuntimeContext, Tagged};
use crate::Controller;
use mlua::{IntoLuaMulti, Lua, Value};
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use tracing::{debug, info, instrument, warn};

pub struct Environment {
    lua: Lua,
    context: Rc<RuntimeContext>,
    scheduler: Rc<Scheduler>,
    config: EnvironmentConfig,
    database: RefCell<Option<Weak<KeyDatabase>>>,
    last_render: Cell<Option<f64>>,
}

impl Environment {
    /// Creates a Lua state with the keyfx globals installed and no controller attached.
    #[instrument(level = "debug", skip(config), fields(easing = ?config.default_easing))]
    pub fn new(config: EnvironmentConfig) -> Result<Self, EngineError> {
        let lua = Lua::new();
        let context = Rc::new(RuntimeContext::new(config.default_easing));
        let scheduler = Rc::new(Scheduler::new());
        scripting::open_keyfx(&lua, &context, &scheduler)?;
        debug!(types = ?scripting::registry::registered_names(&lua), "Environment ready");
        Ok(Self {
            lua,
            context,
            scheduler,
            config,
            database: RefCell::new(None),
            last_render: Cell::new(None),
        })
    }

    pub fn lua(&self) -> &Lua {
        &self.lua
    }

    pub fn config(&self) -> &EnvironmentConfig {
        &self.config
    }

    /// Environment clock in seconds, as of the last tick.
    pub fn now(&self) -> f64 {
        self.context.now()
    }

    /// Attaches `controller`. The environment keeps only a weak reference.
    pub fn attach_controller(&self, controller: &Rc<dyn Controller>) -> Result<(), EngineError> {
        self.context.attach(controller);
        self.publish_database()?;
        info!("Controller attached");
        Ok(())
    }

    /// Detaches the controller, cancels every thread and invalidates borrowed handles.
    ///
    /// Returns whether a controller was attached.
    #[instrument(level = "debug", skip(self))]
    pub fn detach_controller(&self) -> Result<bool, EngineError> {
        let attached = self.context.detach();
        let cancelled = self.scheduler.cancel_all(&self.lua)?;
        self.context.revoke_leases();
        info!(cancelled, "Controller detached");
        Ok(attached)
    }

    pub fn has_controller(&self) -> bool {
        self.context.has_controller()
    }

    /// Exposes `database` to scripts as `keyfx.db`.
    pub fn set_key_database(&self, database: &Rc<KeyDatabase>) -> Result<(), EngineError> {
        *self.database.borrow_mut() = Some(Rc::downgrade(database));
        self.publish_database()
    }

    fn publish_database(&self) -> Result<(), EngineError> {
        let handle = match self.key_database() {
            Some(database) => to_value(&self.lua, self.borrow_key_database(&database))?,
            None => Value::Nil,
        };
        scripting::set_database(&self.lua, handle)?;
        Ok(())
    }

    fn key_database(&self) -> Option<Rc<KeyDatabase>> {
        self.database.borrow().as_ref().and_then(Weak::upgrade)
    }

    /// A script handle on `database`, valid until the controller is detached.
    pub fn borrow_key_database(&self, database: &Rc<KeyDatabase>) -> KeyDatabaseHandle {
        KeyDatabaseHandle::new(database, self.context.lease())
    }

    /// A script handle on `target`, valid until the controller is detached.
    pub fn borrow_render_target(&self, target: &Rc<RefCell<RenderTarget>>) -> RenderTargetHandle {
        RenderTargetHandle::new(target, self.context.lease())
    }

    fn ensure_healthy(&self) -> Result<(), EngineError> {
        match self.scheduler.poisoned() {
            Some(reason) => Err(EngineError::SchedulerInvariantViolation(reason)),
            None => Ok(()),
        }
    }

    /// Runs a script chunk; `name` appears in error messages.
    #[instrument(level = "info", skip(self, source), fields(bytes = source.len()))]
    pub fn load(&self, name: &str, source: &str) -> Result<(), EngineError> {
        self.ensure_healthy()?;
        self.lua.load(source).set_name(format!("={name}")).exec()?;
        Ok(())
    }

    /// Calls the global function `name` if it exists. Returns whether it was called.
    #[instrument(level = "trace", skip(self, args))]
    pub fn invoke<'lua, A>(&'lua self, name: &str, args: A) -> Result<bool, EngineError>
    where
        A: IntoLuaMulti<'lua>,
    {
        self.ensure_healthy()?;
        match self.lua.globals().get::<_, Value>(name)? {
            Value::Function(function) => {
                function.call::<_, ()>(args)?;
                Ok(true)
            }
            Value::Nil => Ok(false),
            other => {
                warn!(name, found = other.type_name(), "Entry point is not a function");
                Ok(false)
            }
        }
    }

    /// Advances the clock to `now` and resumes due threads.
    #[instrument(level = "trace", skip(self))]
    pub fn tick(&self, now: f64) -> Result<TickSummary, EngineError> {
        self.context.clock().set(now);
        self.scheduler.tick(&self.lua, now)
    }

    /// Ticks, then calls the script's `render(elapsed_ms, target)`.
    ///
    /// `elapsed_ms` is the time since the previous render (zero on the first one). Returns whether
    /// the script defines `render`.
    #[instrument(level = "trace", skip(self, target))]
    pub fn render(
        &self,
        now: f64,
        target: &Rc<RefCell<RenderTarget>>,
    ) -> Result<bool, EngineError> {
        self.tick(now)?;
        let elapsed_ms = self
            .last_render
            .replace(Some(now))
            .map_or(0.0, |previous| (now - previous).max(0.0) * 1000.0);
        let handle = to_value(&self.lua, self.borrow_render_target(target))?;
        self.invoke("render", (elapsed_ms, handle))
    }

    /// Calls `onKeyEvent(key, pressed)` for the key at zero-based `index`.
    #[instrument(level = "debug", skip(self))]
    pub fn key_event(&self, index: usize, pressed: bool) -> Result<bool, EngineError> {
        let Some(database) = self.key_database() else {
            warn!("Key event without a key database");
            return Ok(false);
        };
        if database.key(index).is_none() {
            warn!(len = database.len(), "Key event index out of range");
            return Ok(false);
        }
        let key = to_value(&self.lua, self.borrow_key_database(&database).key(index))?;
        self.invoke("onKeyEvent", (key, pressed))
    }

    /// Thread failures recorded since the last call.
    pub fn take_failures(&self) -> Vec<ThreadFailure> {
        self.scheduler.take_failures()
    }

    /// Live threads in creation order.
    pub fn thread_states(&self) -> Vec<(ThreadId, ThreadState)> {
        self.scheduler.states()
    }

    /// Converts a native value into a script value of its registered type.
    pub fn push_value<T: Tagged>(&self, value: T) -> Result<Value<'_>, EngineError> {
        Ok(to_value(&self.lua, value)?)
    }

    /// Extracts a native value from a script value; `position` is only used in the error.
    pub fn check_value<T: Tagged>(&self, value: &Value, position: usize) -> Result<T, ScriptError> {
        from_value(Some(value), position)
    }
}

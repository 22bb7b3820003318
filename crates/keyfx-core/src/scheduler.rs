//! # Scheduler Module
//!
//! Cooperative execution of script threads.
//!
//! ## Responsibilities
//! - **Spawn**: wraps a script function into a coroutine in the `Ready` state.
//! - **Tick**: resumes due threads one at a time, in creation order.
//! - **Suspension**: decodes the [`Suspension`] a thread yields into its next wake condition.
//! - **Failures**: records uncaught thread errors for the host to collect once.
//!
//! ## State Machine
//! `Ready → Running → {Waiting | Finished | Errored}`, `Waiting → Running` once the wake time
//! has passed. `Cancelled` is entered when the environment detaches its controller.

use crate::errors::{EngineError, ThreadFailure};
use mlua::{AnyUserData, Function, Lua, MultiValue, Table, Thread, ThreadStatus, Value};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tracing::{debug, error, warn};

pub type ThreadId = u64;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ThreadState {
    Ready,
    Running,
    Waiting { wake_at: f64 },
    Finished,
    Errored,
    Cancelled,
}

impl ThreadState {
    pub fn name(&self) -> &'static str {
        match self {
            ThreadState::Ready => "ready",
            ThreadState::Running => "running",
            ThreadState::Waiting { .. } => "waiting",
            ThreadState::Finished => "finished",
            ThreadState::Errored => "errored",
            ThreadState::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ThreadState::Finished | ThreadState::Errored | ThreadState::Cancelled
        )
    }

    fn is_due(&self, now: f64) -> bool {
        match self {
            ThreadState::Ready => true,
            ThreadState::Waiting { wake_at } => *wake_at <= now,
            _ => false,
        }
    }
}

/// Scheduling state of one thread, shared with its script handle.
#[derive(Debug)]
pub struct ThreadCell {
    id: ThreadId,
    state: Cell<ThreadState>,
}

impl ThreadCell {
    pub fn id(&self) -> ThreadId {
        self.id
    }

    pub fn state(&self) -> ThreadState {
        self.state.get()
    }

    fn set(&self, state: ThreadState) {
        self.state.set(state);
    }
}

/// What a suspended thread is waiting for.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SuspendRequest {
    /// Resume once this many seconds have passed on the environment clock.
    Wait(f64),
}

/// Value yielded by suspending primitives. Only native code constructs it, so the scheduler
/// recognizes it by type and scripts cannot forge one.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Suspension(pub SuspendRequest);

/// Counters for one tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickSummary {
    pub resumed: usize,
    pub finished: usize,
    pub errored: usize,
    pub waiting: usize,
}

const HANDLES: &str = "keyfx.threads";

struct Entry {
    cell: Rc<ThreadCell>,
}

#[derive(Default)]
struct SchedulerInner {
    entries: Vec<Entry>,
    next_id: ThreadId,
    failures: Vec<ThreadFailure>,
    poisoned: Option<String>,
}

/// Runs script threads cooperatively. Never resumes two threads at once.
///
/// A thread lives as long as its script handle: the coroutine is stored in the handle's user
/// value and the scheduler only keeps a weak reference to the handle. Once the handle has been
/// collected, the thread is dropped without being resumed again.
#[derive(Default)]
pub struct Scheduler {
    inner: RefCell<SchedulerInner>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a thread over `routine`; `args` are passed on its first resume.
    ///
    /// `wrap` builds the script handle for the new thread's [`ThreadCell`]; the returned userdata
    /// carries the coroutine.
    pub fn spawn<'lua, F>(
        &self,
        lua: &'lua Lua,
        routine: Function<'lua>,
        args: Vec<Value<'lua>>,
        wrap: F,
    ) -> mlua::Result<AnyUserData<'lua>>
    where
        F: FnOnce(Rc<ThreadCell>) -> mlua::Result<Value<'lua>>,
    {
        let id = self.inner.borrow().next_id + 1;
        let cell = Rc::new(ThreadCell {
            id,
            state: Cell::new(ThreadState::Ready),
        });
        let Value::UserData(handle) = wrap(cell.clone())? else {
            return Err(mlua::Error::RuntimeError(
                "thread handle must be a userdata".to_string(),
            ));
        };

        let slots = lua.create_table()?;
        slots.raw_set("coroutine", lua.create_thread(routine)?)?;
        if !args.is_empty() {
            slots.raw_set("args", pack(lua, args)?)?;
        }
        handle.set_user_value(slots)?;
        handles(lua)?.raw_set(id, handle.clone())?;

        let mut inner = self.inner.borrow_mut();
        inner.next_id = id;
        inner.entries.push(Entry { cell });
        debug!(thread = id, "Spawned script thread");
        Ok(handle)
    }

    /// Resumes every thread that is ready or whose wake time is at or before `now`.
    ///
    /// Threads spawned during the tick first run on the next one. An uncaught error stops only
    /// the thread that raised it. A thread yielding anything but a [`Suspension`] poisons the
    /// scheduler: this and every later tick fail with `SchedulerInvariantViolation`.
    pub fn tick(&self, lua: &Lua, now: f64) -> Result<TickSummary, EngineError> {
        if let Some(reason) = self.poisoned() {
            return Err(EngineError::SchedulerInvariantViolation(reason));
        }

        let handles = handles(lua)?;
        let mut due = Vec::new();
        {
            let inner = self.inner.borrow();
            for entry in &inner.entries {
                if !entry.cell.state().is_due(now) {
                    continue;
                }
                match handles.raw_get::<_, Option<AnyUserData>>(entry.cell.id)? {
                    Some(handle) => {
                        let slots: Table = handle.user_value()?;
                        let coroutine: Thread = slots.raw_get("coroutine")?;
                        let args: Option<Table> = slots.raw_get("args")?;
                        if args.is_some() {
                            slots.raw_set("args", Value::Nil)?;
                        }
                        due.push((entry.cell.clone(), handle, coroutine, args));
                    }
                    None => entry.cell.set(ThreadState::Cancelled),
                }
            }
        }

        let mut summary = TickSummary::default();
        let mut outcome = Ok(());
        // `_handle` keeps each due thread alive until it has been resumed.
        for (cell, _handle, coroutine, args) in due {
            let args = match args {
                Some(packed) => unpack(packed)?,
                None => MultiValue::new(),
            };
            summary.resumed += 1;
            if let Err(err) = self.resume(&cell, &coroutine, args, now) {
                outcome = Err(err);
                break;
            }
            match cell.state() {
                ThreadState::Finished => summary.finished += 1,
                ThreadState::Errored => summary.errored += 1,
                ThreadState::Waiting { .. } => summary.waiting += 1,
                _ => {}
            }
        }

        self.reap(lua)?;
        outcome.map(|()| summary)
    }

    fn resume<'lua>(
        &self,
        cell: &ThreadCell,
        coroutine: &Thread<'lua>,
        args: MultiValue<'lua>,
        now: f64,
    ) -> Result<(), EngineError> {
        cell.set(ThreadState::Running);
        match coroutine.resume::<_, MultiValue>(args) {
            Ok(yielded) => {
                if !matches!(coroutine.status(), ThreadStatus::Resumable) {
                    debug!(thread = cell.id, "Script thread finished");
                    cell.set(ThreadState::Finished);
                    return Ok(());
                }
                match decode(&yielded) {
                    Some(SuspendRequest::Wait(seconds)) => {
                        cell.set(ThreadState::Waiting {
                            wake_at: now + seconds,
                        });
                        Ok(())
                    }
                    None => {
                        cell.set(ThreadState::Errored);
                        let found = yielded.iter().next().map_or("nothing", |v| v.type_name());
                        let reason = format!(
                            "thread #{} yielded {} instead of a suspension request",
                            cell.id, found
                        );
                        error!("{}", reason);
                        self.inner.borrow_mut().poisoned = Some(reason.clone());
                        Err(EngineError::SchedulerInvariantViolation(reason))
                    }
                }
            }
            Err(err) => {
                cell.set(ThreadState::Errored);
                let failure = ThreadFailure {
                    thread: cell.id,
                    message: err.to_string(),
                };
                warn!("{}", failure);
                self.inner.borrow_mut().failures.push(failure);
                Ok(())
            }
        }
    }

    /// Drops terminal threads and threads whose handle was collected.
    fn reap(&self, lua: &Lua) -> mlua::Result<()> {
        let handles = handles(lua)?;
        let done: Vec<Entry> = {
            let mut inner = self.inner.borrow_mut();
            let mut done = Vec::new();
            let mut live = Vec::with_capacity(inner.entries.len());
            for entry in inner.entries.drain(..) {
                let collected = handles.raw_get::<_, Value>(entry.cell.id)?.is_nil();
                if collected {
                    debug!(thread = entry.cell.id, "Script thread collected");
                }
                if collected || entry.cell.state().is_terminal() {
                    done.push(entry);
                } else {
                    live.push(entry);
                }
            }
            inner.entries = live;
            done
        };
        for entry in done {
            if let Some(handle) = handles.raw_get::<_, Option<AnyUserData>>(entry.cell.id)? {
                handle.set_user_value(Value::Nil)?;
            }
            handles.raw_set(entry.cell.id, Value::Nil)?;
        }
        Ok(())
    }

    /// Cancels every live thread. Returns how many were cancelled.
    pub fn cancel_all(&self, lua: &Lua) -> mlua::Result<usize> {
        let count = {
            let inner = self.inner.borrow();
            for entry in &inner.entries {
                entry.cell.set(ThreadState::Cancelled);
            }
            inner.entries.len()
        };
        self.reap(lua)?;
        if count > 0 {
            debug!(count, "Cancelled script threads");
        }
        Ok(count)
    }

    /// Failures recorded since the last call.
    pub fn take_failures(&self) -> Vec<ThreadFailure> {
        std::mem::take(&mut self.inner.borrow_mut().failures)
    }

    /// Live threads with their states, in creation order.
    pub fn states(&self) -> Vec<(ThreadId, ThreadState)> {
        self.inner
            .borrow()
            .entries
            .iter()
            .map(|entry| (entry.cell.id, entry.cell.state()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Why the scheduler was poisoned, if it was.
    pub fn poisoned(&self) -> Option<String> {
        self.inner.borrow().poisoned.clone()
    }
}

/// Weak-valued table of live thread handles, keyed by thread id.
fn handles(lua: &Lua) -> mlua::Result<Table<'_>> {
    if let Some(table) = lua.named_registry_value::<Option<Table>>(HANDLES)? {
        return Ok(table);
    }
    let table = lua.create_table()?;
    let mode = lua.create_table()?;
    mode.raw_set("__mode", "v")?;
    table.set_metatable(Some(mode));
    lua.set_named_registry_value(HANDLES, table.clone())?;
    Ok(table)
}

fn decode(yielded: &MultiValue) -> Option<SuspendRequest> {
    match yielded.iter().next()? {
        Value::UserData(ud) if ud.is::<Suspension>() => {
            ud.borrow::<Suspension>().ok().map(|s| s.0)
        }
        _ => None,
    }
}

fn pack<'lua>(lua: &'lua Lua, values: Vec<Value<'lua>>) -> mlua::Result<Table<'lua>> {
    let table = lua.create_table()?;
    let count = values.len();
    for (i, value) in values.into_iter().enumerate() {
        table.raw_set(i + 1, value)?;
    }
    table.raw_set("n", count)?;
    Ok(table)
}

fn unpack<'lua>(table: Table<'lua>) -> mlua::Result<MultiValue<'lua>> {
    let count: usize = table.raw_get("n")?;
    let values = (1..=count)
        .map(|i| table.raw_get::<_, Value>(i))
        .collect::<mlua::Result<Vec<_>>>()?;
    Ok(MultiValue::from_vec(values))
}

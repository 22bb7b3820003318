use thiserror::Error;

/// Errors raised at a script call site.
///
/// These travel through Lua as external errors, so scripts can catch them with `pcall`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScriptError {
    #[error("bad argument #{position}: {expected} expected, got {found}")]
    TypeMismatch {
        position: usize,
        expected: &'static str,
        found: String,
    },
    #[error("no controller attached to this environment")]
    NoController,
    #[error("bad argument #{position} to '{function}': {message}")]
    ArgumentError {
        function: &'static str,
        position: usize,
        message: String,
    },
    #[error("{type_name} handle is no longer valid")]
    StaleHandle { type_name: &'static str },
    #[error("{type_name} is in use by the host")]
    HandleBusy { type_name: &'static str },
    #[error("type {0} is not registered with this environment")]
    Unregistered(&'static str),
}

impl ScriptError {
    pub fn argument(function: &'static str, position: usize, message: impl Into<String>) -> Self {
        Self::ArgumentError {
            function,
            position,
            message: message.into(),
        }
    }

    /// Finds the `ScriptError` a Lua error was raised from, looking through callback wrappers.
    pub fn find(err: &mlua::Error) -> Option<&ScriptError> {
        match err {
            mlua::Error::ExternalError(inner) => inner.as_ref().downcast_ref::<ScriptError>(),
            mlua::Error::CallbackError { cause, .. } | mlua::Error::WithContext { cause, .. } => {
                Self::find(cause)
            }
            _ => None,
        }
    }
}

impl From<ScriptError> for mlua::Error {
    fn from(err: ScriptError) -> Self {
        mlua::Error::external(err)
    }
}

/// An uncaught error inside a script thread. Only that thread stops.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("thread #{thread} failed: {message}")]
pub struct ThreadFailure {
    pub thread: u64,
    pub message: String,
}

/// Errors returned to the host.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Script(#[from] ScriptError),
    #[error("lua: {0}")]
    Lua(#[from] mlua::Error),
    #[error("scheduler invariant violated: {0}")]
    SchedulerInvariantViolation(String),
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl EngineError {
    /// The script-level error behind this one, if any.
    pub fn script_error(&self) -> Option<&ScriptError> {
        match self {
            EngineError::Script(err) => Some(err),
            EngineError::Lua(err) => ScriptError::find(err),
            _ => None,
        }
    }
}

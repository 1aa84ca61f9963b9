use thiserror::Error;

pub type DeviceResult<T> = Result<T, DeviceError>;
pub type SessionResult<T> = Result<T, SessionError>;

#[derive(Debug, Error)]
pub enum DeviceError {
    /// The backend for this locator is not part of this build or has no device
    #[error("device unavailable: {0}")]
    Unavailable(String),

    #[error("failed to open '{locator}': {reason}")]
    Open { locator: String, reason: String },

    #[error("device i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl DeviceError {
    pub fn open(locator: impl Into<String>, reason: impl ToString) -> Self {
        DeviceError::Open {
            locator: locator.into(),
            reason: reason.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("start.mode must be acquire|generate (got {0})")]
    InvalidMode(String),

    #[error("wait needs exactly one of seconds or loops ({0})")]
    WaitParameter(&'static str),

    #[error("a background job is already running; stop it first")]
    JobActive,

    #[error("one-shot {0} needs n, loops or seconds to bound the run")]
    MissingBudget(&'static str),

    #[error("{0} locator is required")]
    MissingLocator(&'static str),

    #[error("seconds must fit in a duration (got {0})")]
    InvalidDuration(f64),

    #[error(transparent)]
    Device(#[from] DeviceError),

    #[error("failed to spawn worker thread: {0}")]
    Spawn(std::io::Error),
}

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("failed to read script: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid script json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid script: {0}")]
    Shape(&'static str),
}

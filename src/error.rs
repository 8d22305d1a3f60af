use std::path::PathBuf;

use thiserror::Error;

use crate::engine::{SessionAction, SessionState};

/// Errors surfaced to the command issuer by the region store and the click engine.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid geometry for region '{name}': ({x0},{y0})-({x1},{y1}) needs x0 < x1 and y0 < y1")]
    InvalidGeometry {
        name: String,
        x0: i32,
        y0: i32,
        x1: i32,
        y1: i32,
    },
    #[error("region '{0}' not found")]
    NotFound(String),
    #[error("no active region selected")]
    NoActiveRegion,
    #[error("session is already running")]
    AlreadyRunning,
    #[error("cannot {action} a session that is {from}")]
    InvalidState {
        from: SessionState,
        action: SessionAction,
    },
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    #[error(transparent)]
    Hook(#[from] HookError),
}

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed data in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid content in {}: {reason}", path.display())]
    Invalid { path: PathBuf, reason: String },
}

impl PersistenceError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.into(),
            source,
        }
    }
}

#[derive(Debug, Error)]
pub enum HookError {
    #[error("input hook is not available: {0}")]
    Unavailable(String),
    #[error("input hook is already attached")]
    AlreadyAttached,
}

#[derive(Debug, Error)]
pub enum TimerError {
    #[error("timer duration must be greater than zero")]
    ZeroDuration,
    #[error("timer is not running")]
    NotRunning,
    #[error("timer is not paused")]
    NotPaused,
}

use crate::range::LockKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LockError {
    #[error("Invalid argument: {msg}")]
    InvalidArgument { msg: String },

    #[error("No {kind} lock held at offset {offset} with length {length}")]
    NoSuchLock {
        offset: i64,
        length: i64,
        kind: LockKind,
    },

    #[error("Timed out after {waited_ms}ms waiting for {kind} lock at offset {offset} with length {length}")]
    Timeout {
        offset: i64,
        length: i64,
        kind: LockKind,
        waited_ms: u64,
    },

    #[error("Lock table mutex poisoned")]
    Poisoned,

    #[error("Invalid configuration: {msg}")]
    Config { msg: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, LockError>;

impl<T> From<std::sync::PoisonError<T>> for LockError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        LockError::Poisoned
    }
}

impl LockError {
    pub fn to_errno(&self) -> i32 {
        use libc::*;
        match self {
            LockError::InvalidArgument { .. } => EINVAL,
            LockError::NoSuchLock { .. } => ENOLCK,
            LockError::Timeout { .. } => EAGAIN,
            LockError::Poisoned => EIO,
            LockError::Config { .. } => EINVAL,
            LockError::Io(e) => e.raw_os_error().unwrap_or(EIO),
            LockError::Json(_) => EINVAL,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, LockError::Timeout { .. })
    }
}

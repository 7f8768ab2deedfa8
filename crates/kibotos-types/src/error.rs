//! The Kibotos error taxonomy.
//!
//! One variant per error code in the external API, plus the internal
//! `WrongState`/`HasPending` guard failures the store's transactions raise.
//! `code()` gives the wire-format string; `status()` the HTTP status an API
//! handler should map it to.

use serde::{Deserialize, Serialize};

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, KibotosError>;

#[derive(Debug, Clone, thiserror::Error, Serialize, Deserialize)]
#[serde(tag = "code", content = "message")]
pub enum KibotosError {
    #[error("invalid signature")]
    BadSignature,

    #[error("duplicate submission")]
    Duplicate,

    #[error("rate limit exceeded")]
    RateLimited,

    #[error("unknown or inactive prompt")]
    UnknownPrompt,

    #[error("no open cycle")]
    NoOpenCycle,

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("lease lost")]
    LeaseLost,

    #[error("wrong cycle or submission state")]
    WrongState,

    #[error("cycle has non-terminal submissions")]
    HasPending,

    #[error("not found")]
    NotFound,

    #[error("already an active cycle")]
    AlreadyActive,

    #[error("internal error: {0}")]
    Internal(String),
}

impl KibotosError {
    /// The wire-format error code returned to API callers.
    pub fn code(&self) -> &'static str {
        match self {
            KibotosError::BadSignature => "BAD_SIGNATURE",
            KibotosError::Duplicate => "DUPLICATE",
            KibotosError::RateLimited => "RATE_LIMITED",
            KibotosError::UnknownPrompt => "UNKNOWN_PROMPT",
            KibotosError::NoOpenCycle => "NO_OPEN_CYCLE",
            KibotosError::Validation(_) => "VALIDATION",
            KibotosError::LeaseLost => "LEASE_LOST",
            KibotosError::WrongState | KibotosError::AlreadyActive => "WRONG_STATE",
            KibotosError::HasPending => "HAS_PENDING",
            KibotosError::NotFound => "NOT_FOUND",
            KibotosError::Internal(_) => "INTERNAL",
        }
    }

    /// HTTP status an API handler should respond with.
    pub fn http_status(&self) -> u16 {
        match self {
            KibotosError::BadSignature
            | KibotosError::Duplicate
            | KibotosError::RateLimited
            | KibotosError::UnknownPrompt
            | KibotosError::NoOpenCycle
            | KibotosError::Validation(_) => 400,
            KibotosError::LeaseLost | KibotosError::WrongState | KibotosError::AlreadyActive => {
                409
            }
            KibotosError::HasPending => 409,
            KibotosError::NotFound => 404,
            KibotosError::Internal(_) => 500,
        }
    }
}

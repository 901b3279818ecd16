//! Mapping of HTTP response statuses to span outcomes.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Reason attached to an errored span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusReason {
    Unauthenticated,
    PermissionDenied,
    NotFound,
    AlreadyExists,
    FailedPrecondition,
    ResourceExhausted,
    Cancelled,
    InvalidArgument,
    Unimplemented,
    Unavailable,
    DeadlineExceeded,
    InternalError,
    UnknownError,
}

impl StatusReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusReason::Unauthenticated => "unauthenticated",
            StatusReason::PermissionDenied => "permission_denied",
            StatusReason::NotFound => "not_found",
            StatusReason::AlreadyExists => "already_exists",
            StatusReason::FailedPrecondition => "failed_precondition",
            StatusReason::ResourceExhausted => "resource_exhausted",
            StatusReason::Cancelled => "cancelled",
            StatusReason::InvalidArgument => "invalid_argument",
            StatusReason::Unimplemented => "unimplemented",
            StatusReason::Unavailable => "unavailable",
            StatusReason::DeadlineExceeded => "deadline_exceeded",
            StatusReason::InternalError => "internal_error",
            StatusReason::UnknownError => "unknown_error",
        }
    }
}

impl fmt::Display for StatusReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of a span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpanStatus {
    Ok,
    Error(StatusReason),
}

impl SpanStatus {
    pub fn reason(&self) -> Option<StatusReason> {
        match self {
            SpanStatus::Ok => None,
            SpanStatus::Error(reason) => Some(*reason),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, SpanStatus::Ok)
    }

    /// Whether this outcome should overwrite a span's status.
    ///
    /// Statuses outside 100..=599 map to `unknown_error`, which is not reported.
    pub fn is_reportable(&self) -> bool {
        !matches!(self, SpanStatus::Error(StatusReason::UnknownError))
    }

    /// Map an HTTP status to a span outcome.
    pub fn from_http(status: u16) -> Self {
        match status {
            100..=399 => SpanStatus::Ok,
            400..=499 => SpanStatus::Error(match status {
                401 => StatusReason::Unauthenticated,
                403 => StatusReason::PermissionDenied,
                404 => StatusReason::NotFound,
                409 => StatusReason::AlreadyExists,
                413 => StatusReason::FailedPrecondition,
                429 => StatusReason::ResourceExhausted,
                499 => StatusReason::Cancelled,
                _ => StatusReason::InvalidArgument,
            }),
            500..=599 => SpanStatus::Error(match status {
                501 => StatusReason::Unimplemented,
                503 => StatusReason::Unavailable,
                504 => StatusReason::DeadlineExceeded,
                _ => StatusReason::InternalError,
            }),
            _ => SpanStatus::Error(StatusReason::UnknownError),
        }
    }
}

impl fmt::Display for SpanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpanStatus::Ok => write!(f, "ok"),
            SpanStatus::Error(reason) => write!(f, "error({reason})"),
        }
    }
}

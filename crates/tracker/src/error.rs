//! Error types surfaced by the tracker core

use chrono::NaiveDate;
use serde_json::Value;

/// Numeric error codes used by the backend envelope
///
/// Grouped by hundreds: 1xxx generic, 2xxx auth, 3xxx membership,
/// 4xxx payment, 5xxx content.
pub mod codes {
    pub const SUCCESS: i64 = 0;

    pub const UNKNOWN_ERROR: i64 = 1000;
    pub const INVALID_PARAMS: i64 = 1001;
    pub const NOT_FOUND: i64 = 1002;
    pub const PERMISSION_DENIED: i64 = 1003;
    pub const RATE_LIMIT_EXCEEDED: i64 = 1004;

    pub const UNAUTHORIZED: i64 = 2000;
    pub const INVALID_TOKEN: i64 = 2001;
    pub const TOKEN_EXPIRED: i64 = 2002;
    pub const INVALID_CREDENTIALS: i64 = 2003;

    pub const MEMBERSHIP_EXPIRED: i64 = 3000;
    pub const MEMBERSHIP_REQUIRED: i64 = 3001;

    pub const ORDER_NOT_FOUND: i64 = 4000;
    pub const PAYMENT_FAILED: i64 = 4003;

    pub const CONTENT_NOT_FOUND: i64 = 5000;
    pub const CONTENT_UNAVAILABLE: i64 = 5001;
}

/// Coarse classification of an [`ApiError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiErrorKind {
    Unauthenticated,
    Validation,
    NotFound,
    PermissionDenied,
    RateLimited,
    MembershipRequired,
    PaymentFailed,
    ContentUnavailable,
    /// Network or decoding failure; the request may never have reached the server
    RemoteUnavailable,
    Unknown,
}

impl ApiErrorKind {
    /// Classify a backend error code
    pub fn from_code(code: i64) -> Self {
        match code {
            codes::INVALID_PARAMS => ApiErrorKind::Validation,
            codes::NOT_FOUND => ApiErrorKind::NotFound,
            codes::PERMISSION_DENIED => ApiErrorKind::PermissionDenied,
            codes::RATE_LIMIT_EXCEEDED => ApiErrorKind::RateLimited,
            2000..=2999 => ApiErrorKind::Unauthenticated,
            3000..=3999 => ApiErrorKind::MembershipRequired,
            4000..=4999 => ApiErrorKind::PaymentFailed,
            5000..=5999 => ApiErrorKind::ContentUnavailable,
            _ => ApiErrorKind::Unknown,
        }
    }
}

/// Where an [`ApiError`] came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    /// The server answered with a non-zero envelope code
    Server,
    /// Transport failure, missing envelope, or malformed JSON
    Transport,
    /// Credentials could not be refreshed
    Session,
}

/// Error returned by every remote call
///
/// Carries the envelope's `code`, `message` and `data` verbatim when the
/// server produced them. Transport failures are folded into code 1000.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("API error {code}: {message}")]
pub struct ApiError {
    pub code: i64,
    pub message: String,
    pub data: Option<Value>,
    origin: Origin,
}

impl ApiError {
    /// Error built from a server envelope
    pub fn new(code: i64, message: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            code,
            message: message.into(),
            data,
            origin: Origin::Server,
        }
    }

    /// Wrap a transport or decoding failure
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            code: codes::UNKNOWN_ERROR,
            message: message.into(),
            data: None,
            origin: Origin::Transport,
        }
    }

    /// The session expired and could not be refreshed
    pub fn session_expired() -> Self {
        Self {
            code: codes::UNAUTHORIZED,
            message: "Session expired, please sign in again".to_string(),
            data: None,
            origin: Origin::Session,
        }
    }

    pub fn kind(&self) -> ApiErrorKind {
        match self.origin {
            Origin::Transport => ApiErrorKind::RemoteUnavailable,
            Origin::Session => ApiErrorKind::Unauthenticated,
            Origin::Server => ApiErrorKind::from_code(self.code),
        }
    }

    /// True if the request failed before a well-formed envelope came back
    pub fn is_transport(&self) -> bool {
        self.origin == Origin::Transport
    }

    pub fn is_unauthenticated(&self) -> bool {
        self.kind() == ApiErrorKind::Unauthenticated
    }
}

/// Rejections from the check-in workflow
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CheckinError {
    #[error("{completed} of {required} tasks completed, cannot check in yet")]
    InsufficientTasks { completed: usize, required: usize },
    #[error("already checked in on {date}")]
    AlreadyCheckedIn { date: NaiveDate },
}

/// Invalid arguments to the calendar and monthly statistics queries
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CalendarError {
    #[error("invalid month {year}-{month}")]
    InvalidMonth { year: i32, month: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_grouping() {
        assert_eq!(ApiErrorKind::from_code(1001), ApiErrorKind::Validation);
        assert_eq!(ApiErrorKind::from_code(1002), ApiErrorKind::NotFound);
        assert_eq!(ApiErrorKind::from_code(1003), ApiErrorKind::PermissionDenied);
        assert_eq!(ApiErrorKind::from_code(1004), ApiErrorKind::RateLimited);
        assert_eq!(ApiErrorKind::from_code(1000), ApiErrorKind::Unknown);
        assert_eq!(ApiErrorKind::from_code(2003), ApiErrorKind::Unauthenticated);
        assert_eq!(ApiErrorKind::from_code(3001), ApiErrorKind::MembershipRequired);
        assert_eq!(ApiErrorKind::from_code(4003), ApiErrorKind::PaymentFailed);
        assert_eq!(ApiErrorKind::from_code(5001), ApiErrorKind::ContentUnavailable);
        assert_eq!(ApiErrorKind::from_code(42), ApiErrorKind::Unknown);
    }

    #[test]
    fn test_transport_errors_use_generic_code() {
        let err = ApiError::transport("connection refused");
        assert_eq!(err.code, codes::UNKNOWN_ERROR);
        assert_eq!(err.kind(), ApiErrorKind::RemoteUnavailable);
        assert!(err.is_transport());
    }

    #[test]
    fn test_session_expired_is_unauthenticated() {
        let err = ApiError::session_expired();
        assert!(err.is_unauthenticated());
        assert!(!err.is_transport());
    }
}

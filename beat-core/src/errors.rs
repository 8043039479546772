//! # Errors
//!
//! Beatflow carries a single structured error type across crate boundaries.
//! Core goals:
//! - one status code + class name per kind
//! - can be carried through `anyhow::Error`
//! - transport-agnostic (the HTTP crate decides how to serialize)
//!
//! Library crates keep their own `thiserror` enums and convert into
//! [`BeatError`] at the edge. The `reason` field names the media/feed
//! failure (`InvalidRange`, `URLExpired`, ...) so clients can branch on it
//! without parsing messages.

use std::fmt;

use anyhow::Error as AnyError;
use serde_json::Value;

/// A convenience result type for Beatflow application code.
pub type BeatResult<T> = std::result::Result<T, AnyError>;

/// Error class names + status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    BadRequest,       // 400
    NotAuthenticated, // 401
    Forbidden,        // 403
    NotFound,         // 404
    LengthRequired,   // 411
    GeneralError,     // 500
    Unavailable,      // 503
}

impl ErrorKind {
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorKind::BadRequest => 400,
            ErrorKind::NotAuthenticated => 401,
            ErrorKind::Forbidden => 403,
            ErrorKind::NotFound => 404,
            ErrorKind::LengthRequired => 411,
            ErrorKind::GeneralError => 500,
            ErrorKind::Unavailable => 503,
        }
    }

    /// Error `name` (e.g. "NotFound")
    pub fn name(&self) -> &'static str {
        match self {
            ErrorKind::BadRequest => "BadRequest",
            ErrorKind::NotAuthenticated => "NotAuthenticated",
            ErrorKind::Forbidden => "Forbidden",
            ErrorKind::NotFound => "NotFound",
            ErrorKind::LengthRequired => "LengthRequired",
            ErrorKind::GeneralError => "GeneralError",
            ErrorKind::Unavailable => "Unavailable",
        }
    }

    /// Kebab-cased `className`
    pub fn class_name(&self) -> &'static str {
        match self {
            ErrorKind::BadRequest => "bad-request",
            ErrorKind::NotAuthenticated => "not-authenticated",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::NotFound => "not-found",
            ErrorKind::LengthRequired => "length-required",
            ErrorKind::GeneralError => "general-error",
            ErrorKind::Unavailable => "unavailable",
        }
    }

    /// Unexpected failures; their message never reaches clients.
    pub fn is_internal(&self) -> bool {
        matches!(self, ErrorKind::GeneralError)
    }
}

/// A structured Beatflow error that can live inside `anyhow::Error`.
#[derive(Debug)]
pub struct BeatError {
    pub kind: ErrorKind,
    pub message: String,
    pub reason: Option<&'static str>,
    pub errors: Option<Value>,
    pub source: Option<AnyError>,
}

impl BeatError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            reason: None,
            errors: None,
            source: None,
        }
    }

    /// Machine-readable failure name, e.g. `"InvalidRange"`.
    pub fn with_reason(mut self, reason: &'static str) -> Self {
        self.reason = Some(reason);
        self
    }

    pub fn with_errors(mut self, errors: Value) -> Self {
        self.errors = Some(errors);
        self
    }

    pub fn with_source(mut self, source: AnyError) -> Self {
        self.source = Some(source);
        self
    }

    pub fn code(&self) -> u16 {
        self.kind.status_code()
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn class_name(&self) -> &'static str {
        self.kind.class_name()
    }

    pub fn into_anyhow(self) -> AnyError {
        AnyError::new(self)
    }

    /// Turn any error into a BeatError:
    /// - if it's already a BeatError, keep it
    /// - otherwise wrap as GeneralError
    pub fn normalize(err: AnyError) -> BeatError {
        match err.downcast::<BeatError>() {
            Ok(beat) => beat,
            Err(other) => BeatError::new(ErrorKind::GeneralError, other.to_string()).with_source(other),
        }
    }

    /// A version safe to hand to clients: the source is dropped and
    /// internal messages are replaced with a generic text.
    pub fn sanitize_for_client(&self) -> BeatError {
        let message = if self.kind.is_internal() {
            "Internal server error".to_string()
        } else {
            self.message.clone()
        };
        BeatError {
            kind: self.kind,
            message,
            reason: self.reason,
            errors: self.errors.clone(),
            source: None,
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest, msg)
    }
    pub fn not_authenticated(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotAuthenticated, msg)
    }
    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Forbidden, msg)
    }
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, msg)
    }
    pub fn length_required(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::LengthRequired, msg)
    }
    pub fn general_error(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::GeneralError, msg)
    }
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unavailable, msg)
    }

    /// JSON payload: `{name, message, code, className, reason?, errors?}`.
    pub fn to_json(&self) -> Value {
        use serde_json::json;

        let mut base = json!({
            "name": self.name(),
            "message": self.message,
            "code": self.code(),
            "className": self.class_name(),
        });

        if let Some(r) = self.reason {
            base["reason"] = Value::from(r);
        }
        if let Some(e) = &self.errors {
            base["errors"] = e.clone();
        }
        base
    }
}

impl fmt::Display for BeatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.name(), self.code(), self.message)
    }
}

impl std::error::Error for BeatError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Bail out of a `BeatResult` function with a `BeatError`.
#[macro_export]
macro_rules! bail_beat {
    ($ctor:ident, $msg:expr) => {
        return Err($crate::errors::BeatError::$ctor($msg).into_anyhow())
    };
    ($ctor:ident, $fmt:expr, $($arg:tt)*) => {
        return Err($crate::errors::BeatError::$ctor(format!($fmt, $($arg)*)).into_anyhow())
    };
}

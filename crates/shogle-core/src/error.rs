use std::collections::TryReserveError;
use std::fmt;

use crate::backend::BackendError;
use crate::memory::AllocError;

/// Result alias used by every fallible construction path of the core.
pub type RenderResult<T> = Result<T, RenderError>;

/// Broad category of a [`RenderError`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ErrorKind {
    /// A description was rejected before reaching the backend.
    Validation,
    /// The backend reported a failure (compile/link errors, GPU OOM, ...).
    Backend,
    /// Host memory could not be obtained (arena growth, registry growth).
    Allocation,
    /// A handle did not refer to a live resource.
    InvalidHandle,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Validation => "validation error",
            ErrorKind::Backend => "backend error",
            ErrorKind::Allocation => "allocation failure",
            ErrorKind::InvalidHandle => "invalid handle",
        };
        f.write_str(s)
    }
}

/// Error carried by the core's result channel.
///
/// Always holds a human-readable message; backend diagnostics (compiler or
/// linker logs) are folded into it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderError {
    pub kind: ErrorKind,
    pub message: String,
}

impl RenderError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn backend(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Backend, message)
    }

    pub fn allocation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Allocation, message)
    }

    pub fn invalid_handle(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidHandle, message)
    }

    /// Wraps a backend status with the operation that produced it.
    pub(crate) fn from_backend(op: &str, err: BackendError) -> Self {
        match err {
            BackendError::OutOfMemory => Self::allocation(format!("{op}: out of GPU memory")),
            BackendError::InvalidHandle => Self::invalid_handle(format!("{op}: {err}")),
            other => Self::backend(format!("{op}: {other}")),
        }
    }

    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for RenderError {}

impl From<AllocError> for RenderError {
    fn from(err: AllocError) -> Self {
        Self::allocation(err.to_string())
    }
}

impl From<TryReserveError> for RenderError {
    fn from(err: TryReserveError) -> Self {
        Self::allocation(format!("resource registry growth failed: {err}"))
    }
}

/// Returns `Err(RenderError::validation(..))` unless `cond` holds.
macro_rules! ensure_valid {
    ($cond:expr, $($arg:tt)+) => {
        if !$cond {
            return Err($crate::error::RenderError::validation(format!($($arg)+)));
        }
    };
}

pub(crate) use ensure_valid;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_kind_and_message() {
        let e = RenderError::validation("buffer size is zero");
        assert_eq!(e.to_string(), "validation error: buffer size is zero");
    }

    #[test]
    fn backend_oom_maps_to_allocation() {
        let e = RenderError::from_backend("create_buffer", BackendError::OutOfMemory);
        assert_eq!(e.kind(), ErrorKind::Allocation);
        assert!(e.message.starts_with("create_buffer"));
    }

    #[test]
    fn compile_diagnostics_are_folded_into_message() {
        let e = RenderError::from_backend(
            "create_shader",
            BackendError::CompileFailed("0:3: syntax error".into()),
        );
        assert_eq!(e.kind(), ErrorKind::Backend);
        assert!(e.message.contains("0:3: syntax error"));
    }
}

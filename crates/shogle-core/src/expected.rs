//! Value-or-error vocabulary on top of `Result`.
//!
//! `Result` already is the tagged union every fallible path returns. This
//! module adds checked accessors and the `transform` naming used by the
//! resource creation chain (`validate → transform → create`). `and_then` and
//! `or_else` are the native combinators.

use std::fmt;

/// Raised when the inactive alternative of a result is accessed.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct BadAccess {
    /// `true` when the caller asked for the value but an error was held.
    pub wanted_value: bool,
}

impl fmt::Display for BadAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.wanted_value {
            f.write_str("bad access: value requested but an error is held")
        } else {
            f.write_str("bad access: error requested but a value is held")
        }
    }
}

impl std::error::Error for BadAccess {}

/// Extension methods for `Result<T, E>`.
///
/// Borrowing receivers go through `as_ref()` / `as_mut()`; the by-value forms
/// move the contained alternative.
pub trait Expected<T, E>: Sized {
    fn has_value(&self) -> bool;

    /// Borrows the value, or reports [`BadAccess`] without touching the error.
    fn value(&self) -> Result<&T, BadAccess>;

    /// Borrows the error, or reports [`BadAccess`] without touching the value.
    fn error(&self) -> Result<&E, BadAccess>;

    fn into_value(self) -> Result<T, BadAccess>;

    fn into_error(self) -> Result<E, BadAccess>;

    /// Maps the value through `f`, wrapping the plain result.
    fn transform<U, F>(self, f: F) -> Result<U, E>
    where
        F: FnOnce(T) -> U;

    /// Maps the error through `f`, leaving a value untouched.
    fn transform_error<G, F>(self, f: F) -> Result<T, G>
    where
        F: FnOnce(E) -> G;
}

impl<T, E> Expected<T, E> for Result<T, E> {
    #[inline]
    fn has_value(&self) -> bool {
        self.is_ok()
    }

    #[inline]
    fn value(&self) -> Result<&T, BadAccess> {
        self.as_ref().map_err(|_| BadAccess { wanted_value: true })
    }

    #[inline]
    fn error(&self) -> Result<&E, BadAccess> {
        match self {
            Err(e) => Ok(e),
            Ok(_) => Err(BadAccess { wanted_value: false }),
        }
    }

    #[inline]
    fn into_value(self) -> Result<T, BadAccess> {
        self.map_err(|_| BadAccess { wanted_value: true })
    }

    #[inline]
    fn into_error(self) -> Result<E, BadAccess> {
        match self {
            Err(e) => Ok(e),
            Ok(_) => Err(BadAccess { wanted_value: false }),
        }
    }

    #[inline]
    fn transform<U, F>(self, f: F) -> Result<U, E>
    where
        F: FnOnce(T) -> U,
    {
        self.map(f)
    }

    #[inline]
    fn transform_error<G, F>(self, f: F) -> Result<T, G>
    where
        F: FnOnce(E) -> G,
    {
        self.map_err(f)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    type R = Result<i32, String>;

    fn half(v: i32) -> R {
        if v % 2 == 0 { Ok(v / 2) } else { Err(format!("{v} is odd")) }
    }

    // ── accessors ─────────────────────────────────────────────────────────

    #[test]
    fn value_on_error_is_bad_access() {
        let e: R = Err("boom".into());
        assert!(!e.has_value());
        assert_eq!(e.value(), Err(BadAccess { wanted_value: true }));
        assert_eq!(e.error().map(String::as_str), Ok("boom"));
    }

    #[test]
    fn error_on_value_is_bad_access() {
        let v: R = Ok(4);
        assert!(v.has_value());
        assert_eq!(v.error(), Err(BadAccess { wanted_value: false }));
        assert_eq!(v.into_value(), Ok(4));
    }

    // ── laws ──────────────────────────────────────────────────────────────

    #[test]
    fn and_then_on_value_equals_direct_call() {
        let v: R = Ok(8);
        assert_eq!(v.clone().and_then(half), half(8));
    }

    #[test]
    fn and_then_on_error_skips_the_continuation() {
        let calls = Cell::new(0);
        let e: R = Err("bad".into());
        let out = e.and_then(|v| {
            calls.set(calls.get() + 1);
            half(v)
        });
        assert_eq!(out, Err("bad".to_string()));
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn transform_composes() {
        let f = |v: i32| v + 3;
        let g = |v: i32| v * 10;
        let v: R = Ok(2);
        assert_eq!(v.clone().transform(f).transform(g), v.transform(|x| g(f(x))));
    }

    #[test]
    fn transform_error_leaves_values_alone() {
        let v: R = Ok(1);
        let mapped: Result<i32, usize> = v.transform_error(|e| e.len());
        assert_eq!(mapped, Ok(1));

        let e: R = Err("four".into());
        assert_eq!(e.transform_error(|e| e.len()), Err(4));
    }

    #[test]
    fn or_else_recovers_only_errors() {
        let calls = Cell::new(0);
        let recover = |_: String| -> R {
            calls.set(calls.get() + 1);
            Ok(0)
        };
        assert_eq!(R::Ok(5).or_else(recover), Ok(5));
        assert_eq!(calls.get(), 0);
        assert_eq!(R::Err("x".into()).or_else(recover), Ok(0));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn borrowed_receivers_do_not_move() {
        let v: R = Ok(6);
        let doubled = v.as_ref().transform(|x| x * 2);
        assert_eq!(doubled, Ok(12));
        assert_eq!(v, Ok(6));
    }
}

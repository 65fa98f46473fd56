//! The value captured when a middleware or handler fails.

use std::any::Any;
use std::borrow::Cow;
use std::error::Error;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

/// Error currency of handlers and middleware.
pub type BoxError = Box<dyn Error + Send + Sync>;

/// A failure raised by application code while a request was being dispatched.
///
/// Both returned errors and panics end up here; error handlers receive it opaquely
/// and may inspect it through [`Failure::message`] or the downcast helpers.
pub enum Failure {
    /// The middleware or handler returned `Err`.
    Error(BoxError),
    /// The middleware or handler panicked, carrying the panic payload.
    Panic(Box<dyn Any + Send>),
}

impl Failure {
    #[inline]
    pub fn is_panic(&self) -> bool {
        matches!(self, Failure::Panic(_))
    }

    /// Human readable description, the panic message for string payloads.
    pub fn message(&self) -> Cow<'_, str> {
        match self {
            Failure::Error(e) => Cow::Owned(e.to_string()),
            Failure::Panic(payload) => {
                if let Some(s) = payload.downcast_ref::<&'static str>() {
                    Cow::Borrowed(s)
                } else if let Some(s) = payload.downcast_ref::<String>() {
                    Cow::Borrowed(s.as_str())
                } else {
                    Cow::Borrowed("<non-string panic payload>")
                }
            }
        }
    }

    /// Returns the returned error if it is of type `E`.
    pub fn downcast_error<E: Error + 'static>(&self) -> Option<&E> {
        match self {
            Failure::Error(e) => e.downcast_ref::<E>(),
            Failure::Panic(_) => None,
        }
    }

    /// Returns the panic payload if it is of type `T`.
    pub fn downcast_panic<T: Any>(&self) -> Option<&T> {
        match self {
            Failure::Panic(payload) => payload.downcast_ref::<T>(),
            Failure::Error(_) => None,
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Failure::Error(e) => write!(f, "{e}"),
            Failure::Panic(_) => write!(f, "panicked: {}", self.message()),
        }
    }
}

impl fmt::Debug for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Failure::Error(e) => f.debug_tuple("Error").field(e).finish(),
            Failure::Panic(_) => f.debug_tuple("Panic").field(&self.message()).finish(),
        }
    }
}

/// Runs `f`, turning both an `Err` and a panic into a [`Failure`].
pub(crate) fn capture<T, F>(f: F) -> Result<T, Failure>
where
    F: FnOnce() -> Result<T, BoxError>,
{
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(Failure::Error(e)),
        Err(payload) => Err(Failure::Panic(payload)),
    }
}

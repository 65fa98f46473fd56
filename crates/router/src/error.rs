use crate::failure::BoxError;
use http::Method;
use std::io;
use thiserror::Error;

/// Errors reported while freezing a [`RouterBuilder`](crate::RouterBuilder) into a [`Router`](crate::Router).
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("route {method} '{path}' is registered twice on the same node")]
    DuplicateRoute { method: Method, path: String },

    #[error("route path '{path}' must start with '/'")]
    InvalidPath { path: String },

    #[error("invalid route '{path}': {source}")]
    InvalidRoute {
        path: String,
        #[source]
        source: matchit::InsertError,
    },
}

/// Errors surfaced to the hosting transport by [`Router::serve`](crate::Router::serve).
///
/// Application failures never show up here: they are answered by an error handler
/// or by the built-in default response.
#[derive(Error, Debug)]
pub enum ServeError {
    #[error("error handler failed: {source}")]
    ErrorHandler { source: BoxError },

    #[error("failed to write response: {source}")]
    Write {
        #[from]
        source: io::Error,
    },
}

/// An erased context value did not have the type its node declared.
#[derive(Error, Debug, Clone, Copy)]
#[error("context type mismatch, expected '{expected}'")]
pub struct ContextMismatch {
    expected: &'static str,
}

impl ContextMismatch {
    pub(crate) fn new(expected: &'static str) -> Self {
        Self { expected }
    }

    pub(crate) fn of<T>() -> Self {
        Self::new(std::any::type_name::<T>())
    }

    /// The type name the node expected.
    pub fn expected(&self) -> &'static str {
        self.expected
    }
}

impl ServeError {
    pub(crate) fn error_handler<E: Into<BoxError>>(e: E) -> Self {
        Self::ErrorHandler { source: e.into() }
    }
}

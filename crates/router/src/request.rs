//! Request view handed to middleware, route handlers and error handlers.
//!
//! This module contains:
//! - `Request`: read access to the request head and the matched path parameters
//! - `PathParams`: named URL segments captured by the matched route pattern

use http::request::Parts;
use http::{HeaderMap, Method, Uri, Version};
use matchit::Params;

/// A borrowed view of the request being dispatched.
///
/// The router only needs the request head; bodies stay with the hosting server.
#[derive(Debug)]
pub struct Request<'server, 'req> {
    parts: &'req Parts,
    path_params: &'req PathParams<'server, 'req>,
}

impl<'server, 'req> Request<'server, 'req> {
    /// Creates a new Request with the given request head and path parameters
    pub fn new(parts: &'req Parts, path_params: &'req PathParams<'server, 'req>) -> Self {
        Self { parts, path_params }
    }

    /// Returns the HTTP method of the request
    pub fn method(&self) -> &Method {
        &self.parts.method
    }

    /// Returns the URI of the request
    pub fn uri(&self) -> &Uri {
        &self.parts.uri
    }

    /// Returns the path component of the request URI
    pub fn path(&self) -> &str {
        self.parts.uri.path()
    }

    /// Returns the HTTP version of the request
    pub fn version(&self) -> Version {
        self.parts.version
    }

    /// Returns the HTTP headers of the request
    pub fn headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    /// Returns a reference to the path parameters extracted from the request URL
    pub fn path_params(&self) -> &PathParams<'server, 'req> {
        self.path_params
    }
}

/// Represents path parameters extracted from the URL path of an HTTP request.
///
/// For the pattern `/users/{id}` registered under a `/admin` subrouter, a request
/// to `/admin/users/42` yields the parameter `id = "42"`.
#[derive(Debug, Clone)]
pub struct PathParams<'server, 'req> {
    kind: PathParamsKind<'server, 'req>,
}

#[derive(Debug, Clone)]
enum PathParamsKind<'server, 'req> {
    None,
    Params(Params<'server, 'req>),
}

impl<'server, 'req> PathParams<'server, 'req> {
    #[inline]
    fn new(params: Params<'server, 'req>) -> Self {
        if params.is_empty() { Self::empty() } else { Self { kind: PathParamsKind::Params(params) } }
    }

    /// Creates an empty PathParams instance with no parameters
    #[inline]
    pub fn empty() -> Self {
        Self { kind: PathParamsKind::None }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        match &self.kind {
            PathParamsKind::None => true,
            PathParamsKind::Params(params) => params.is_empty(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        match &self.kind {
            PathParamsKind::None => 0,
            PathParamsKind::Params(params) => params.len(),
        }
    }

    /// Gets the value of a path parameter by its name
    #[inline]
    pub fn get(&self, key: impl AsRef<str>) -> Option<&'req str> {
        match &self.kind {
            PathParamsKind::Params(params) => params.get(key),
            PathParamsKind::None => None,
        }
    }
}

impl<'server, 'req> From<Params<'server, 'req>> for PathParams<'server, 'req> {
    fn from(params: Params<'server, 'req>) -> Self {
        PathParams::new(params)
    }
}

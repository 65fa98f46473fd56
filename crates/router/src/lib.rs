//! A hierarchical HTTP request router with typed, composed request contexts.
//!
//! A [`Router`] is a tree of nodes. Each node declares its own context type, a set of
//! routes, an ordered middleware chain and an optional error handler; subrouters
//! extend their parent's path prefix and embed their parent's context through
//! [`SubContext`].
//!
//! For every request the router:
//! - matches the full path and method to a route, answering `404 Not Found` otherwise
//! - builds the context chain from the root down to the route's node
//! - runs the middleware of every node on the way, root first
//! - runs the route handler
//! - on an error or a panic, hands the failure to the nearest error handler between
//!   the failing node and the root, or answers `500 Application Error`
//!
//! # Example
//!
//! ```
//! use micro_router::{Failure, HandlerResult, Request, ResponseWriter, Router, SubContext};
//! use std::io::Write;
//!
//! #[derive(Default)]
//! struct AppContext;
//!
//! struct AdminContext {
//!     app: AppContext,
//! }
//!
//! impl SubContext<AppContext> for AdminContext {
//!     fn from_parent(app: AppContext) -> Self {
//!         Self { app }
//!     }
//!
//!     fn parent(&self) -> &AppContext {
//!         &self.app
//!     }
//!
//!     fn parent_mut(&mut self) -> &mut AppContext {
//!         &mut self.app
//!     }
//! }
//!
//! fn dashboard(_ctx: &mut AdminContext, _rw: &mut dyn ResponseWriter, _req: &Request) -> HandlerResult {
//!     Err("database unavailable".into())
//! }
//!
//! fn admin_error(
//!     _ctx: &mut AdminContext,
//!     rw: &mut dyn ResponseWriter,
//!     _req: &Request,
//!     _failure: &Failure,
//! ) -> HandlerResult {
//!     rw.set_status(http::StatusCode::SERVICE_UNAVAILABLE);
//!     write!(rw, "Admin Error")?;
//!     Ok(())
//! }
//!
//! let router = Router::builder::<AppContext>()
//!     .subrouter::<AdminContext, _>("/admin", |admin| admin.error(admin_error).get("/dashboard", dashboard))
//!     .build()
//!     .unwrap();
//!
//! let request = http::Request::get("/admin/dashboard").body(()).unwrap();
//! let response = router.call(request).unwrap();
//! assert_eq!(response.status(), http::StatusCode::SERVICE_UNAVAILABLE);
//! assert_eq!(response.body().remaining(), b"Admin Error");
//! ```

mod body;
mod context;
mod error;
mod failure;
mod handler;
mod request;
mod response;

pub mod router;

pub use body::ResponseBody;
pub use context::SubContext;
pub use error::{BuildError, ContextMismatch, ServeError};
pub use failure::{BoxError, Failure};
pub use handler::{
    ErrorHandler, HandlerResult, Middleware, MiddlewareResult, Next, NoContext, RouteHandler, WithContext,
};
pub use request::{PathParams, Request};
pub use response::{BufferedResponse, ResponseWriter};
pub use router::{DEFAULT_ERROR_BODY, NOT_FOUND_BODY, Router, RouterBuilder, Subrouter};

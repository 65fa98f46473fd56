//! Request dispatch: route matching, context construction, middleware and handler
//! execution, and recovery from application failures.
//!
//! A request matched to a node at depth `d` gets a fresh chain of contexts
//! `C0 .. Cd`, built root to leaf; the leaf instance owns the chain. Middleware of
//! node `i` run against `Ci`, the route handler against `Cd`. When any of them fails,
//! the parent links are walked from the failing (origin) node up to the root and the
//! first error handler found runs against its own node's context. Recovery happens at
//! most once: what an error handler itself does is not caught again.

use super::{Router, RouterItem};
use crate::context::AnyContext;
use crate::error::{ContextMismatch, ServeError};
use crate::failure::{self, BoxError, Failure};
use crate::handler::{ErasedErrorHandler, ErasedHandler, ErasedMiddleware, Next};
use crate::{BufferedResponse, Request, ResponseBody, ResponseWriter};
use http::header::CONTENT_TYPE;
use http::request::Parts;
use http::{HeaderValue, Response, StatusCode};
use std::io::{self, Write};
use tracing::{debug, error};

/// Body of the response written when no error handler exists between the origin and the root.
pub const DEFAULT_ERROR_BODY: &str = "Application Error";

/// Body of the response written when no route matches.
pub const NOT_FOUND_BODY: &str = "Not Found";

/// Where and how the execution of a request failed.
struct Failed {
    origin_depth: usize,
    failure: Failure,
}

impl Router {
    /// Dispatches one request, writing exactly one response into `rw`.
    ///
    /// Errors are only returned when the selected error handler fails, or when
    /// `rw` refuses a built-in response.
    pub fn serve(&self, rw: &mut dyn ResponseWriter, parts: &Parts) -> Result<(), ServeError> {
        let path = parts.uri.path();
        let route_result = self.at(path);
        let request = Request::new(parts, route_result.params());

        let item_option = route_result.router_items().iter().find(|item| item.filter().matches(&request));

        match item_option {
            Some(item) => self.dispatch(item, rw, &request),
            None => {
                debug!(method = %parts.method, path, "no route matched");
                write_fixed(rw, StatusCode::NOT_FOUND, NOT_FOUND_BODY)?;
                Ok(())
            }
        }
    }

    /// Dispatches an [`http::Request`], buffering the response.
    ///
    /// The request body is not read by the router and is dropped.
    pub fn call<B>(&self, req: http::Request<B>) -> Result<Response<ResponseBody>, ServeError> {
        let (parts, _body) = req.into_parts();
        let mut rw = BufferedResponse::new();
        self.serve(&mut rw, &parts)?;
        Ok(rw.into_response())
    }

    fn dispatch(
        &self,
        item: &RouterItem,
        rw: &mut dyn ResponseWriter,
        req: &Request<'_, '_>,
    ) -> Result<(), ServeError> {
        let chain = self.chain(item.node);
        debug!(method = %req.method(), path = req.path(), node = self.nodes[item.node].prefix(), "route matched");

        let mut leaf = match failure::capture(|| self.instantiate(&chain).map_err(BoxError::from)) {
            Ok(leaf) => leaf,
            Err(failure) => {
                // the chain is gone, no context is left to hand to an error handler
                error!(cause = %failure, node = self.nodes[item.node].prefix(), "failed to build request context");
                write_fixed(rw, StatusCode::INTERNAL_SERVER_ERROR, DEFAULT_ERROR_BODY)?;
                return Ok(());
            }
        };

        match self.execute(&chain, &mut *leaf, item, rw, req) {
            Ok(()) => Ok(()),
            Err(failed) => self.recover(&chain, &mut *leaf, rw, req, failed),
        }
    }

    /// Builds `C0 .. Cd` root to leaf, returning the leaf which owns the chain.
    fn instantiate(&self, chain: &[usize]) -> Result<Box<AnyContext>, ContextMismatch> {
        let mut current = None;
        for &index in chain {
            current = Some(self.nodes[index].context.instantiate(current)?);
        }
        current.ok_or(ContextMismatch::new("request context"))
    }

    /// Reaches `C_depth` from the leaf instance through the parent links.
    fn context_at<'a>(
        &self,
        chain: &[usize],
        leaf: &'a mut AnyContext,
        depth: usize,
    ) -> Result<&'a mut AnyContext, ContextMismatch> {
        chain[depth + 1..].iter().rev().try_fold(leaf, |ctx, &index| self.nodes[index].context.parent_of(ctx))
    }

    fn execute(
        &self,
        chain: &[usize],
        leaf: &mut AnyContext,
        item: &RouterItem,
        rw: &mut dyn ResponseWriter,
        req: &Request<'_, '_>,
    ) -> Result<(), Failed> {
        for (depth, &index) in chain.iter().enumerate() {
            for middleware in &self.nodes[index].middleware {
                let next = failure::capture(|| {
                    let ctx = self.context_at(chain, &mut *leaf, depth)?;
                    middleware.call(ctx, &mut *rw, req)
                })
                .map_err(|failure| Failed { origin_depth: depth, failure })?;

                if next == Next::Stop {
                    debug!(node = self.nodes[index].prefix(), "middleware stopped the chain");
                    return Ok(());
                }
            }
        }

        failure::capture(|| item.handler.call(&mut *leaf, &mut *rw, req))
            .map_err(|failure| Failed { origin_depth: chain.len() - 1, failure })
    }

    fn recover(
        &self,
        chain: &[usize],
        leaf: &mut AnyContext,
        rw: &mut dyn ResponseWriter,
        req: &Request<'_, '_>,
        failed: Failed,
    ) -> Result<(), ServeError> {
        let Failed { origin_depth, failure } = failed;
        let origin = chain[origin_depth];
        error!(cause = %failure, node = self.nodes[origin].prefix(), path = req.path(), "request failed");

        let mut cursor = Some(origin);
        while let Some(index) = cursor {
            let node = &self.nodes[index];
            if let Some(error_handler) = &node.error_handler {
                debug!(node = node.prefix(), "recovering with error handler");
                let ctx = self.context_at(chain, leaf, node.depth).map_err(ServeError::error_handler)?;
                return error_handler.call(ctx, rw, req, &failure).map_err(ServeError::error_handler);
            }
            cursor = node.parent;
        }

        debug!("no error handler registered, using default");
        write_fixed(rw, StatusCode::INTERNAL_SERVER_ERROR, DEFAULT_ERROR_BODY)?;
        Ok(())
    }
}

fn write_fixed(rw: &mut dyn ResponseWriter, status: StatusCode, body: &str) -> io::Result<()> {
    rw.set_status(status);
    if let Ok(content_type) = HeaderValue::from_str(mime::TEXT_PLAIN_UTF_8.as_ref()) {
        rw.insert_header(CONTENT_TYPE, content_type);
    }
    rw.write_all(body.as_bytes())
}

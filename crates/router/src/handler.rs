//! Route handlers, middleware and error handlers bound to a node's context type.
//!
//! Application code registers plain functions; the traits below are implemented for
//! every `Fn` with a matching signature. The marker parameter `M` tells apart
//! functions taking the node's context ([`WithContext`]) from context-agnostic ones
//! ([`NoContext`]), so both kinds go through the same registration methods.

use crate::context::AnyContext;
use crate::error::ContextMismatch;
use crate::failure::{BoxError, Failure};
use crate::{Request, ResponseWriter};
use std::marker::PhantomData;

/// Outcome of a route handler or error handler.
pub type HandlerResult = Result<(), BoxError>;

/// Outcome of a middleware.
pub type MiddlewareResult = Result<Next, BoxError>;

/// What a middleware asks the dispatcher to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Next {
    /// Run the remaining middleware and the route handler.
    Continue,
    /// The response is complete, skip everything that remains.
    Stop,
}

/// Marker for functions that take the node's context as first argument.
#[derive(Debug)]
pub struct WithContext;

/// Marker for functions that do not need a context.
#[derive(Debug)]
pub struct NoContext;

/// A route handler for nodes whose context type is `C`.
pub trait RouteHandler<C, M>: Send + Sync + 'static {
    fn handle(&self, ctx: &mut C, rw: &mut dyn ResponseWriter, req: &Request<'_, '_>) -> HandlerResult;
}

impl<C, F> RouteHandler<C, WithContext> for F
where
    F: Fn(&mut C, &mut dyn ResponseWriter, &Request<'_, '_>) -> HandlerResult + Send + Sync + 'static,
{
    #[inline]
    fn handle(&self, ctx: &mut C, rw: &mut dyn ResponseWriter, req: &Request<'_, '_>) -> HandlerResult {
        (self)(ctx, rw, req)
    }
}

impl<C, F> RouteHandler<C, NoContext> for F
where
    F: Fn(&mut dyn ResponseWriter, &Request<'_, '_>) -> HandlerResult + Send + Sync + 'static,
{
    #[inline]
    fn handle(&self, _ctx: &mut C, rw: &mut dyn ResponseWriter, req: &Request<'_, '_>) -> HandlerResult {
        (self)(rw, req)
    }
}

/// A middleware for nodes whose context type is `C`.
pub trait Middleware<C, M>: Send + Sync + 'static {
    fn run(&self, ctx: &mut C, rw: &mut dyn ResponseWriter, req: &Request<'_, '_>) -> MiddlewareResult;
}

impl<C, F> Middleware<C, WithContext> for F
where
    F: Fn(&mut C, &mut dyn ResponseWriter, &Request<'_, '_>) -> MiddlewareResult + Send + Sync + 'static,
{
    #[inline]
    fn run(&self, ctx: &mut C, rw: &mut dyn ResponseWriter, req: &Request<'_, '_>) -> MiddlewareResult {
        (self)(ctx, rw, req)
    }
}

impl<C, F> Middleware<C, NoContext> for F
where
    F: Fn(&mut dyn ResponseWriter, &Request<'_, '_>) -> MiddlewareResult + Send + Sync + 'static,
{
    #[inline]
    fn run(&self, _ctx: &mut C, rw: &mut dyn ResponseWriter, req: &Request<'_, '_>) -> MiddlewareResult {
        (self)(rw, req)
    }
}

/// An error handler for nodes whose context type is `C`.
///
/// It receives the context instance of the node it is registered on, never a
/// deeper one, together with the captured [`Failure`].
pub trait ErrorHandler<C, M>: Send + Sync + 'static {
    fn recover(&self, ctx: &mut C, rw: &mut dyn ResponseWriter, req: &Request<'_, '_>, failure: &Failure)
    -> HandlerResult;
}

impl<C, F> ErrorHandler<C, WithContext> for F
where
    F: Fn(&mut C, &mut dyn ResponseWriter, &Request<'_, '_>, &Failure) -> HandlerResult + Send + Sync + 'static,
{
    #[inline]
    fn recover(
        &self,
        ctx: &mut C,
        rw: &mut dyn ResponseWriter,
        req: &Request<'_, '_>,
        failure: &Failure,
    ) -> HandlerResult {
        (self)(ctx, rw, req, failure)
    }
}

impl<C, F> ErrorHandler<C, NoContext> for F
where
    F: Fn(&mut dyn ResponseWriter, &Request<'_, '_>, &Failure) -> HandlerResult + Send + Sync + 'static,
{
    #[inline]
    fn recover(
        &self,
        _ctx: &mut C,
        rw: &mut dyn ResponseWriter,
        req: &Request<'_, '_>,
        failure: &Failure,
    ) -> HandlerResult {
        (self)(rw, req, failure)
    }
}

pub(crate) trait ErasedHandler: Send + Sync {
    fn call(&self, ctx: &mut AnyContext, rw: &mut dyn ResponseWriter, req: &Request<'_, '_>) -> HandlerResult;
}

pub(crate) trait ErasedMiddleware: Send + Sync {
    fn call(&self, ctx: &mut AnyContext, rw: &mut dyn ResponseWriter, req: &Request<'_, '_>) -> MiddlewareResult;
}

pub(crate) trait ErasedErrorHandler: Send + Sync {
    fn call(
        &self,
        ctx: &mut AnyContext,
        rw: &mut dyn ResponseWriter,
        req: &Request<'_, '_>,
        failure: &Failure,
    ) -> HandlerResult;
}

/// Holds a function together with the context type it was registered for.
///
/// The context type is fixed at registration, so the only runtime check left is a
/// single downcast of the erased context per call.
pub(crate) struct Bound<F, C, M> {
    f: F,
    _phantom: PhantomData<fn(C, M)>,
}

impl<F, C, M> Bound<F, C, M> {
    pub(crate) fn new(f: F) -> Self {
        Self { f, _phantom: PhantomData }
    }
}

fn downcast<C: 'static>(ctx: &mut AnyContext) -> Result<&mut C, ContextMismatch> {
    ctx.downcast_mut::<C>().ok_or(ContextMismatch::of::<C>())
}

impl<F, C, M> ErasedHandler for Bound<F, C, M>
where
    F: RouteHandler<C, M>,
    C: 'static,
{
    fn call(&self, ctx: &mut AnyContext, rw: &mut dyn ResponseWriter, req: &Request<'_, '_>) -> HandlerResult {
        self.f.handle(downcast::<C>(ctx)?, rw, req)
    }
}

impl<F, C, M> ErasedMiddleware for Bound<F, C, M>
where
    F: Middleware<C, M>,
    C: 'static,
{
    fn call(&self, ctx: &mut AnyContext, rw: &mut dyn ResponseWriter, req: &Request<'_, '_>) -> MiddlewareResult {
        self.f.run(downcast::<C>(ctx)?, rw, req)
    }
}

impl<F, C, M> ErasedErrorHandler for Bound<F, C, M>
where
    F: ErrorHandler<C, M>,
    C: 'static,
{
    fn call(
        &self,
        ctx: &mut AnyContext,
        rw: &mut dyn ResponseWriter,
        req: &Request<'_, '_>,
        failure: &Failure,
    ) -> HandlerResult {
        self.f.recover(downcast::<C>(ctx)?, rw, req, failure)
    }
}

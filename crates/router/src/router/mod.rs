//! The routing tree: builders used at registration time and the frozen [`Router`].
//!
//! Nodes are registered top-down through [`RouterBuilder`]: the root is created with
//! [`Router::builder`], every [`RouterBuilder::subrouter`] call adds a child whose
//! prefix is appended to its parent's. [`RouterBuilder::build`] flattens the tree into
//! an arena of nodes linked by parent indices, and registers every route by its full
//! path in a [`matchit`] router.

mod dispatch;
pub mod filter;

pub use dispatch::{DEFAULT_ERROR_BODY, NOT_FOUND_BODY};

use crate::PathParams;
use crate::context::{ContextDescriptor, SubContext};
use crate::error::BuildError;
use crate::handler::{
    Bound, ErasedErrorHandler, ErasedHandler, ErasedMiddleware, ErrorHandler, Middleware, RouteHandler,
};
use filter::MethodFilter;
use http::Method;
use std::cmp::Reverse;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use tracing::debug;

type InnerRouter<T> = matchit::Router<T>;

/// An immutable tree of nodes, ready to dispatch requests.
///
/// `Router` is `Send + Sync` and never mutated while serving, so it can be shared
/// behind an `Arc` by any number of concurrently running requests.
pub struct Router {
    inner_router: InnerRouter<Vec<RouterItem>>,
    nodes: Vec<Node>,
}

/// A route registered at a full path, bound to the node that declared it.
pub(crate) struct RouterItem {
    node: usize,
    filter: MethodFilter,
    handler: Box<dyn ErasedHandler>,
}

/// Result of matching a path, containing matched items and path parameters
pub(crate) struct RouteResult<'router, 'req> {
    router_items: &'router [RouterItem],
    params: PathParams<'router, 'req>,
}

/// One level of the frozen tree.
pub(crate) struct Node {
    prefix: String,
    parent: Option<usize>,
    depth: usize,
    context: ContextDescriptor,
    middleware: Vec<Box<dyn ErasedMiddleware>>,
    error_handler: Option<Box<dyn ErasedErrorHandler>>,
}

impl Router {
    /// Creates the builder of a root node whose context type is `C`.
    pub fn builder<C: Default + 'static>() -> RouterBuilder<C, Root> {
        RouterBuilder::new(String::new(), ContextDescriptor::root::<C>())
    }

    /// Matches a path against the full paths of all registered routes
    pub(crate) fn at<'router, 'req>(&'router self, path: &'req str) -> RouteResult<'router, 'req> {
        self.inner_router
            .at(path)
            .map(|matched| RouteResult { router_items: matched.value.as_slice(), params: matched.params.into() })
            .map_err(|e| debug!("match '{}' error: {}", path, e))
            .unwrap_or(RouteResult::empty())
    }

    /// Node indices from the root down to `leaf`.
    fn chain(&self, leaf: usize) -> Vec<usize> {
        let mut chain = Vec::with_capacity(self.nodes[leaf].depth + 1);
        let mut cursor = Some(leaf);
        while let Some(index) = cursor {
            chain.push(index);
            cursor = self.nodes[index].parent;
        }
        chain.reverse();
        chain
    }
}

impl RouterItem {
    pub(crate) fn filter(&self) -> &MethodFilter {
        &self.filter
    }
}

impl<'router, 'req> RouteResult<'router, 'req> {
    fn empty() -> Self {
        Self { router_items: &[], params: PathParams::empty() }
    }

    pub(crate) fn params(&self) -> &PathParams<'router, 'req> {
        &self.params
    }

    pub(crate) fn router_items(&self) -> &'router [RouterItem] {
        self.router_items
    }
}

impl Node {
    pub(crate) fn prefix(&self) -> &str {
        if self.prefix.is_empty() { "/" } else { &self.prefix }
    }
}

/// Type-state of a builder for the root node, the only one that can [`build`](RouterBuilder::build).
#[derive(Debug)]
pub struct Root;

/// Type-state of a builder for a subrouter.
#[derive(Debug)]
pub struct Nested;

/// Builder of a subrouter whose context type is `C`.
pub type Subrouter<C> = RouterBuilder<C, Nested>;

/// Registers routes, middleware, an error handler and subrouters on one node.
pub struct RouterBuilder<C, L = Root> {
    node: NodeBuilder,
    _phantom: PhantomData<fn() -> (C, L)>,
}

struct NodeBuilder {
    prefix: String,
    context: ContextDescriptor,
    routes: Vec<RouteBuilder>,
    middleware: Vec<Box<dyn ErasedMiddleware>>,
    error_handler: Option<Box<dyn ErasedErrorHandler>>,
    children: Vec<NodeBuilder>,
}

struct RouteBuilder {
    filter: MethodFilter,
    pattern: String,
    handler: Box<dyn ErasedHandler>,
}

macro_rules! method_route {
    ($method:ident, $method_name:ident) => {
        #[doc = concat!("Registers a `", stringify!($method), "` route on this node.")]
        pub fn $method<H, M>(self, pattern: &str, handler: H) -> Self
        where
            H: RouteHandler<C, M>,
            M: 'static,
        {
            self.route_with(filter::$method_name(), pattern, handler)
        }
    };
}

impl<C: 'static, L> RouterBuilder<C, L> {
    fn new(prefix: String, context: ContextDescriptor) -> Self {
        let node = NodeBuilder {
            prefix,
            context,
            routes: Vec::new(),
            middleware: Vec::new(),
            error_handler: None,
            children: Vec::new(),
        };
        Self { node, _phantom: PhantomData }
    }

    /// The effective prefix of this node, every ancestor prefix included.
    pub fn prefix(&self) -> &str {
        &self.node.prefix
    }

    /// Creates a child node at `prefix` relative to this node, configured by `f`.
    ///
    /// The child context type `D` must compose this node's context type `C`.
    pub fn subrouter<D, F>(mut self, prefix: &str, f: F) -> Self
    where
        D: SubContext<C>,
        F: FnOnce(Subrouter<D>) -> Subrouter<D>,
    {
        let child = Subrouter::<D>::new(join_path(&self.node.prefix, prefix), ContextDescriptor::child::<C, D>());
        self.node.children.push(f(child).node);
        self
    }

    /// Appends a middleware; middleware run in registration order.
    pub fn middleware<H, M>(mut self, middleware: H) -> Self
    where
        H: Middleware<C, M>,
        M: 'static,
    {
        self.node.middleware.push(Box::new(Bound::<H, C, M>::new(middleware)));
        self
    }

    /// Sets the error handler of this node, replacing a previously registered one.
    pub fn error<H, M>(mut self, handler: H) -> Self
    where
        H: ErrorHandler<C, M>,
        M: 'static,
    {
        if self.node.error_handler.is_some() {
            debug!(prefix = %self.node.prefix, "replacing error handler");
        }
        self.node.error_handler = Some(Box::new(Bound::<H, C, M>::new(handler)));
        self
    }

    /// Registers a route for an arbitrary method.
    pub fn route<H, M>(self, method: Method, pattern: &str, handler: H) -> Self
    where
        H: RouteHandler<C, M>,
        M: 'static,
    {
        self.route_with(MethodFilter::new(method), pattern, handler)
    }

    method_route!(get, get_method);
    method_route!(post, post_method);
    method_route!(put, put_method);
    method_route!(delete, delete_method);
    method_route!(head, head_method);
    method_route!(options, options_method);
    method_route!(patch, patch_method);

    fn route_with<H, M>(mut self, filter: MethodFilter, pattern: &str, handler: H) -> Self
    where
        H: RouteHandler<C, M>,
        M: 'static,
    {
        let handler = Box::new(Bound::<H, C, M>::new(handler));
        self.node.routes.push(RouteBuilder { filter, pattern: pattern.to_owned(), handler });
        self
    }
}

impl<C> RouterBuilder<C, Root> {
    /// Freezes the tree into a [`Router`].
    ///
    /// Fails if a node registers the same method and pattern twice, if a full path
    /// does not start with `/`, or if a full path is rejected by the path matcher.
    pub fn build(self) -> Result<Router, BuildError> {
        let mut nodes = Vec::new();
        let mut table = RouteTable::default();
        flatten(self.node, None, &mut nodes, &mut table)?;

        let mut inner_router = InnerRouter::new();
        let mut route_count = 0;
        for (path, mut items) in table.routes {
            // the deepest subrouter owning a path takes precedence
            items.sort_by_key(|item| Reverse(nodes[item.node].depth));
            route_count += items.len();
            inner_router.insert(path.clone(), items).map_err(|source| BuildError::InvalidRoute { path, source })?;
        }

        debug!(nodes = nodes.len(), routes = route_count, "router built");
        Ok(Router { inner_router, nodes })
    }
}

#[derive(Default)]
struct RouteTable {
    routes: Vec<(String, Vec<RouterItem>)>,
    index: HashMap<String, usize>,
}

impl RouteTable {
    fn insert(&mut self, path: String, item: RouterItem) -> Result<(), BuildError> {
        let slot = match self.index.get(&path) {
            Some(&slot) => slot,
            None => {
                self.index.insert(path.clone(), self.routes.len());
                self.routes.push((path.clone(), Vec::new()));
                self.routes.len() - 1
            }
        };

        let items = &mut self.routes[slot].1;
        if items.iter().any(|existing| existing.node == item.node && existing.filter == item.filter) {
            return Err(BuildError::DuplicateRoute { method: item.filter.method().clone(), path });
        }
        items.push(item);
        Ok(())
    }
}

fn flatten(
    builder: NodeBuilder,
    parent: Option<usize>,
    nodes: &mut Vec<Node>,
    table: &mut RouteTable,
) -> Result<usize, BuildError> {
    let NodeBuilder { prefix, context, routes, middleware, error_handler, children } = builder;
    let index = nodes.len();
    let depth = parent.map_or(0, |parent| nodes[parent].depth + 1);

    for route in routes {
        let path = join_path(&prefix, &route.pattern);
        // request paths always start with '/', anything else could never match
        if !path.starts_with('/') {
            return Err(BuildError::InvalidPath { path });
        }
        let item = RouterItem { node: index, filter: route.filter, handler: route.handler };
        table.insert(path, item)?;
    }

    nodes.push(Node { prefix, parent, depth, context, middleware, error_handler });

    for child in children {
        flatten(child, Some(index), nodes, table)?;
    }
    Ok(index)
}

/// Concatenates a prefix and a path, dropping the prefix's trailing `/`.
fn join_path(prefix: &str, path: &str) -> String {
    let prefix = prefix.strip_suffix('/').unwrap_or(prefix);
    let mut joined = String::with_capacity(prefix.len() + path.len());
    joined.push_str(prefix);
    joined.push_str(path);
    joined
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router").field("nodes", &self.nodes).finish_non_exhaustive()
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("prefix", &self.prefix())
            .field("parent", &self.parent)
            .field("depth", &self.depth)
            .field("context", &self.context.type_name())
            .field("middleware", &self.middleware.len())
            .field("error_handler", &self.error_handler.is_some())
            .finish()
    }
}

impl<C, L> fmt::Debug for RouterBuilder<C, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouterBuilder")
            .field("prefix", &self.node.prefix)
            .field("context", &self.node.context.type_name())
            .field("routes", &self.node.routes.len())
            .field("children", &self.node.children.len())
            .finish_non_exhaustive()
    }
}

//! Per-node request contexts and their composition.
//!
//! Every node of the routing tree declares the Rust type of its context. The
//! root type only needs [`Default`]; a subrouter type embeds its parent's
//! context by value and exposes it through [`SubContext`]. At request time the
//! chain is built root to leaf, the leaf owning the whole chain, so a
//! middleware or error handler typed against an ancestor reaches the very same
//! data the descendants see.

use crate::error::ContextMismatch;
use std::any::{Any, type_name};
use std::fmt;

/// Type-erased context value as stored during a dispatch.
pub(crate) type AnyContext = dyn Any;

/// A context type that composes the context `P` of its parent node.
///
/// # Example
/// ```
/// use micro_router::SubContext;
///
/// #[derive(Default)]
/// struct AppContext {
///     user: Option<String>,
/// }
///
/// struct AdminContext {
///     app: AppContext,
///     audited: bool,
/// }
///
/// impl SubContext<AppContext> for AdminContext {
///     fn from_parent(app: AppContext) -> Self {
///         Self { app, audited: false }
///     }
///
///     fn parent(&self) -> &AppContext {
///         &self.app
///     }
///
///     fn parent_mut(&mut self) -> &mut AppContext {
///         &mut self.app
///     }
/// }
/// ```
pub trait SubContext<P>: 'static {
    /// Builds the child context around an already populated parent.
    fn from_parent(parent: P) -> Self;

    /// Returns the embedded parent context.
    fn parent(&self) -> &P;

    /// Returns the embedded parent context mutably.
    fn parent_mut(&mut self) -> &mut P;
}

/// A subrouter declared with its parent's context type shares the parent instance.
impl<T: 'static> SubContext<T> for T {
    #[inline]
    fn from_parent(parent: T) -> Self {
        parent
    }

    #[inline]
    fn parent(&self) -> &T {
        self
    }

    #[inline]
    fn parent_mut(&mut self) -> &mut T {
        self
    }
}

/// Describes how a node instantiates its context and how the context reaches its parent.
pub(crate) struct ContextDescriptor {
    type_name: &'static str,
    kind: DescriptorKind,
}

enum DescriptorKind {
    Root {
        init: fn() -> Box<AnyContext>,
    },
    Child {
        derive: fn(Box<AnyContext>) -> Option<Box<AnyContext>>,
        parent_of: fn(&mut AnyContext) -> Option<&mut AnyContext>,
        parent_type_name: &'static str,
    },
}

impl ContextDescriptor {
    pub(crate) fn root<C: Default + 'static>() -> Self {
        Self { type_name: type_name::<C>(), kind: DescriptorKind::Root { init: init_root::<C> } }
    }

    pub(crate) fn child<P: 'static, D: SubContext<P>>() -> Self {
        Self {
            type_name: type_name::<D>(),
            kind: DescriptorKind::Child {
                derive: derive_child::<P, D>,
                parent_of: parent_of::<P, D>,
                parent_type_name: type_name::<P>(),
            },
        }
    }

    pub(crate) fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub(crate) fn is_root(&self) -> bool {
        matches!(self.kind, DescriptorKind::Root { .. })
    }

    /// Creates this node's context, consuming the parent instance for child nodes.
    pub(crate) fn instantiate(&self, parent: Option<Box<AnyContext>>) -> Result<Box<AnyContext>, ContextMismatch> {
        match (&self.kind, parent) {
            (DescriptorKind::Root { init }, _) => Ok(init()),
            (DescriptorKind::Child { derive, parent_type_name, .. }, Some(parent)) => {
                derive(parent).ok_or(ContextMismatch::new(*parent_type_name))
            }
            (DescriptorKind::Child { parent_type_name, .. }, None) => Err(ContextMismatch::new(*parent_type_name)),
        }
    }

    /// Steps from an instance of this node's context to the embedded parent instance.
    pub(crate) fn parent_of<'a>(&self, ctx: &'a mut AnyContext) -> Result<&'a mut AnyContext, ContextMismatch> {
        match &self.kind {
            DescriptorKind::Child { parent_of, .. } => parent_of(ctx).ok_or(ContextMismatch::new(self.type_name)),
            DescriptorKind::Root { .. } => Err(ContextMismatch::new(self.type_name)),
        }
    }
}

impl fmt::Debug for ContextDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextDescriptor").field("type_name", &self.type_name).field("root", &self.is_root()).finish()
    }
}

fn init_root<C: Default + 'static>() -> Box<AnyContext> {
    Box::new(C::default())
}

fn derive_child<P: 'static, D: SubContext<P>>(parent: Box<AnyContext>) -> Option<Box<AnyContext>> {
    let parent = parent.downcast::<P>().ok()?;
    Some(Box::new(D::from_parent(*parent)))
}

fn parent_of<P: 'static, D: SubContext<P>>(ctx: &mut AnyContext) -> Option<&mut AnyContext> {
    let child = ctx.downcast_mut::<D>()?;
    Some(child.parent_mut() as &mut AnyContext)
}

#[cfg(test)]
mod tests {
    use super::{AnyContext, ContextDescriptor, SubContext};

    #[derive(Default)]
    struct Root {
        hits: u32,
    }

    struct Admin {
        root: Root,
    }

    impl SubContext<Root> for Admin {
        fn from_parent(root: Root) -> Self {
            Self { root }
        }

        fn parent(&self) -> &Root {
            &self.root
        }

        fn parent_mut(&mut self) -> &mut Root {
            &mut self.root
        }
    }

    #[test]
    fn test_child_embeds_parent() {
        let root = ContextDescriptor::root::<Root>();
        let admin = ContextDescriptor::child::<Root, Admin>();
        assert!(root.is_root());
        assert!(!admin.is_root());

        let mut root_ctx = root.instantiate(None).unwrap();
        root_ctx.downcast_mut::<Root>().unwrap().hits = 3;

        let mut admin_ctx = admin.instantiate(Some(root_ctx)).unwrap();
        let parent: &mut AnyContext = admin.parent_of(admin_ctx.as_mut()).unwrap();
        let parent = parent.downcast_mut::<Root>().unwrap();
        assert_eq!(parent.hits, 3);

        parent.hits += 1;
        assert_eq!(<Admin as SubContext<Root>>::parent(admin_ctx.downcast_ref::<Admin>().unwrap()).hits, 4);
    }

    #[test]
    fn test_same_type_shares_instance() {
        let shared = ContextDescriptor::child::<Root, Root>();
        let mut ctx = shared.instantiate(Some(Box::new(Root { hits: 7 }))).unwrap();

        let parent = shared.parent_of(ctx.as_mut()).unwrap();
        parent.downcast_mut::<Root>().unwrap().hits = 8;
        assert_eq!(ctx.downcast_ref::<Root>().unwrap().hits, 8);
    }

    #[test]
    fn test_mismatched_parent_is_rejected() {
        let admin = ContextDescriptor::child::<Root, Admin>();
        let err = admin.instantiate(Some(Box::new(42_u8))).err().unwrap();
        assert!(err.to_string().contains("Root"));

        assert!(admin.instantiate(None).is_err());
        assert!(ContextDescriptor::root::<Root>().parent_of(&mut Root::default()).is_err());
    }
}

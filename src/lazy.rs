//! Deferred values resolved at render time.
//!
//! A [`Lazy`] is a description of a computation to run against the
//! render-time context. Resolution is iterative: a lazy value may resolve to
//! another lazy value, and the engine loops until a concrete result (or the
//! step cap) is reached. The two built-in variants mirror the classic pair:
//! a dotted-path context lookup and a caller-supplied context function.

use std::sync::Arc;

use crate::context::Context;
use crate::error::{Error, MAX_LAZY_STEPS, Result};
use crate::node::Node;
use crate::value::Value;

/// A caller-supplied render-time function. May fail; failures are render
/// faults, caught at the nearest enclosing child boundary.
pub type LazyFn = Arc<dyn Fn(&Context) -> Result<Resolved> + Send + Sync>;

/// A deferred value, resolved against the context at render time.
#[derive(Clone)]
pub enum Lazy {
    /// Dotted-path lookup against the context; a miss resolves to
    /// [`Value::Null`].
    Lookup(String),
    /// A caller-supplied function of the context.
    Func(LazyFn),
}

/// One step of lazy resolution: a concrete value, another lazy value to
/// resolve again, or a render node to render in place.
#[derive(Clone, Debug)]
pub enum Resolved {
    Value(Value),
    Lazy(Lazy),
    Node(Node),
}

/// A fully-resolved child: the resolve loop has run to completion.
#[derive(Clone, Debug)]
pub enum Concrete {
    Value(Value),
    Node(Node),
}

impl Lazy {
    /// Look up a dotted path in the context at render time.
    pub fn lookup(path: impl Into<String>) -> Lazy {
        Lazy::Lookup(path.into())
    }

    /// Compute a value from the context at render time.
    pub fn func<F>(f: F) -> Lazy
    where
        F: Fn(&Context) -> Result<Resolved> + Send + Sync + 'static,
    {
        Lazy::Func(Arc::new(f))
    }

    /// Run a single resolution step.
    pub fn resolve(&self, ctx: &Context) -> Result<Resolved> {
        match self {
            Lazy::Lookup(path) => Ok(Resolved::Value(ctx.lookup(path))),
            Lazy::Func(f) => f(ctx),
        }
    }

    /// Run the resolve loop until the result is no longer lazy.
    pub fn resolve_fully(&self, ctx: &Context) -> Result<Concrete> {
        let mut current = self.resolve(ctx)?;
        for _ in 0..MAX_LAZY_STEPS {
            match current {
                Resolved::Value(v) => return Ok(Concrete::Value(v)),
                Resolved::Node(n) => return Ok(Concrete::Node(n)),
                Resolved::Lazy(next) => current = next.resolve(ctx)?,
            }
        }
        Err(Error::LazyLimit)
    }
}

impl std::fmt::Debug for Lazy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Lazy::Lookup(path) => write!(f, "Lookup({path:?})"),
            Lazy::Func(_) => write!(f, "Func(..)"),
        }
    }
}

impl From<Value> for Resolved {
    fn from(v: Value) -> Self {
        Resolved::Value(v)
    }
}

impl From<Lazy> for Resolved {
    fn from(l: Lazy) -> Self {
        Resolved::Lazy(l)
    }
}

impl From<Node> for Resolved {
    fn from(n: Node) -> Self {
        Resolved::Node(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_resolves_against_context() {
        let ctx = Context::new().with("name", "Alice");
        let lazy = Lazy::lookup("name");
        match lazy.resolve_fully(&ctx).unwrap() {
            Concrete::Value(v) => assert_eq!(v, Value::from("Alice")),
            other => panic!("expected value, got {other:?}"),
        }
    }

    #[test]
    fn test_func_can_chain_into_another_lazy() {
        let ctx = Context::new().with("name", "Bob");
        let lazy = Lazy::func(|_ctx| Ok(Resolved::Lazy(Lazy::lookup("name"))));
        match lazy.resolve_fully(&ctx).unwrap() {
            Concrete::Value(v) => assert_eq!(v, Value::from("Bob")),
            other => panic!("expected value, got {other:?}"),
        }
    }

    #[test]
    fn test_self_returning_lazy_hits_step_cap() {
        let ctx = Context::new();
        let lazy = Lazy::func(|_ctx| {
            Ok(Resolved::Lazy(Lazy::func(|_ctx| {
                Ok(Resolved::Lazy(Lazy::lookup("x")))
            })))
        });
        // Two hops then a value; well under the cap.
        assert!(lazy.resolve_fully(&ctx).is_ok());

        fn forever(_ctx: &Context) -> Result<Resolved> {
            Ok(Resolved::Lazy(Lazy::func(forever)))
        }
        let endless = Lazy::func(forever);
        assert!(matches!(
            endless.resolve_fully(&ctx),
            Err(Error::LazyLimit)
        ));
    }
}

//! An HTML render-tree engine.
//!
//! Pages are built as trees of [`Node`]s instead of text templates. Leaves
//! are [`Value`]s, escaped on output unless safe-marked; [`Lazy`] children
//! defer to render time and resolve against a [`Context`]; control flow
//! ([`If`], [`Each`], [`Scope`]) lives in the tree itself. Rendering a tree
//! against a context produces the final HTML string.
//!
//! ```
//! use feuillage::{Context, Lazy, tags};
//!
//! let page = tags::div()
//!     .attr("class", "greeting")
//!     .child("Hello ")
//!     .child(Lazy::lookup("name"));
//! let ctx = Context::new().with("name", "Alice");
//! assert_eq!(
//!     feuillage::render(&page.into(), &ctx),
//!     "<div class=\"greeting\">Hello Alice</div>"
//! );
//! ```
//!
//! Trees stay queryable and editable after construction: [`Node::filter`]
//! walks them in pre-order, and [`Node::wrap`], [`Node::delete`] and
//! [`Node::replace`] edit them in place. A fault while rendering never
//! takes the page down: it is reported through the context's fault hook
//! and replaced by a visible error fragment.

pub mod context;
pub mod element;
pub mod error;
pub mod format;
pub mod id;
pub mod lazy;
pub mod node;
pub mod safe;
pub mod tags;
pub mod tree;
pub mod value;

pub use context::{Context, FaultHandler};
pub use element::{Element, VoidElement, append_attribute};
pub use error::{Error, MAX_LAZY_STEPS, Result};
pub use format::{Format, format};
pub use id::{IdGenerator, html_id};
pub use lazy::{Concrete, Lazy, LazyFn, Resolved};
pub use node::{Child, Each, Fragment, Group, If, Node, Scope};
pub use safe::{SafeString, conditional_escape, escape, mark_safe};
pub use tree::inside_tag;
pub use value::{ContextFn, Value};

/// Render a tree against a context. Equivalent to [`Node::render`].
pub fn render(root: &Node, ctx: &Context) -> String {
    root.render(ctx)
}

/// Render only the named [`Fragment`] of a tree.
///
/// The first fragment with that name in pre-order (the root included) is
/// rendered as if it were the whole tree, against the same context. An
/// unknown name renders as the empty string.
pub fn render_fragment(root: &Node, ctx: &Context, name: &str) -> String {
    let Some(fragment) = node::find_fragment(root, name) else {
        return String::new();
    };
    let mut out = String::new();
    let mut stack = vec![format!("Fragment({})", fragment.name())];
    node::render_children(fragment.children(), &mut out, ctx, &mut stack);
    out
}

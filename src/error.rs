//! Error types for tree construction and rendering.
//!
//! Render-time faults are caught at the nearest enclosing child boundary and
//! turned into a visible error fragment (see [`crate::node`]); they never
//! escape [`crate::render`]. Construction-time errors (wrapping with a void
//! element, appending children to a node that cannot hold them) are returned
//! to the caller immediately.

/// Cap on the "while the result is lazy, resolve again" loop.
///
/// A lazy value whose resolution keeps yielding lazy values would otherwise
/// hang rendering; exceeding the cap is a render fault.
pub const MAX_LAZY_STEPS: usize = 64;

/// Error type for feuillage operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A fault raised while rendering (a caller-supplied function failed,
    /// a malformed node was encountered, ...).
    #[error("{0}")]
    Render(String),

    /// The lazy resolution loop did not reach a concrete value.
    #[error("lazy value did not resolve after {MAX_LAZY_STEPS} steps")]
    LazyLimit,

    /// The lazily-produced attribute mapping resolved to something other
    /// than a map.
    #[error("lazy attributes must resolve to a map, got {found}")]
    LazyAttrs { found: &'static str },

    /// Attempted to wrap tree nodes with a void element, which cannot have
    /// children.
    #[error("cannot wrap with void element <{tag}>")]
    VoidWrap { tag: String },

    /// Attempted to wrap with a node variant that has no child sequence to
    /// receive the wrapped node.
    #[error("wrapper node {kind} cannot hold children")]
    WrapTarget { kind: &'static str },
}

/// Result type alias for feuillage operations.
pub type Result<T> = std::result::Result<T, Error>;

//! The render-time context.
//!
//! A [`Context`] is a mapping from string keys to [`Value`]s, passed through
//! the recursive render call. It is never mutated in place during rendering:
//! scoping constructs ([`crate::node::Scope`], [`crate::node::Each`]) clone
//! and extend it, so sibling subtrees never observe each other's bindings.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::value::Value;

/// Callback invoked with `(context, diagnostic)` when a render fault occurs.
pub type FaultHandler = Arc<dyn Fn(&Context, &str) + Send + Sync>;

/// Variables in scope during rendering, plus the render fault hook.
///
/// Cloning is the scoping primitive: `extend` copies the map and overlays the
/// extra bindings, leaving the original untouched.
#[derive(Clone, Default)]
pub struct Context {
    vars: IndexMap<String, Value>,
    fault_handler: Option<FaultHandler>,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("vars", &self.vars)
            .field("fault_handler", &self.fault_handler.as_ref().map(|_| ".."))
            .finish()
    }
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }

    /// Set a variable.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.vars.insert(name.into(), value.into());
    }

    /// Get a variable by exact name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    /// Produce a new context with the given bindings overlaid.
    /// The overlay wins on key collision; `self` is unchanged.
    pub fn extend(&self, overlay: &IndexMap<String, Value>) -> Context {
        let mut next = self.clone();
        for (k, v) in overlay {
            next.vars.insert(k.clone(), v.clone());
        }
        next
    }

    /// Install the render fault hook, invoked with `(context, diagnostic)`
    /// whenever an otherwise-uncaught error occurs during rendering.
    pub fn set_fault_handler(&mut self, handler: FaultHandler) {
        self.fault_handler = Some(handler);
    }

    /// Report a render fault through the hook, or the default handler when
    /// none is installed (logs the diagnostic and writes it to stderr).
    pub(crate) fn handle_fault(&self, diagnostic: &str) {
        match &self.fault_handler {
            Some(handler) => handler(self, diagnostic),
            None => {
                tracing::error!(diagnostic, "render fault");
                eprintln!("{diagnostic}");
            }
        }
    }

    /// Resolve a dotted path against the context (e.g. `person.name` or
    /// `items.0.title`).
    ///
    /// Each segment is tried as map-key access, then as integer index on
    /// lists. A [`Value::Fn`] reached at any step is invoked with the context
    /// and its result continues the traversal. Any failure yields
    /// [`Value::Null`] rather than an error.
    pub fn lookup(&self, path: &str) -> Value {
        let mut segments = path.split('.');
        let Some(first) = segments.next() else {
            return Value::Null;
        };
        let Some(mut current) = self.vars.get(first).cloned() else {
            return Value::Null;
        };
        if let Value::Fn(f) = &current {
            current = f(self);
        }
        for segment in segments {
            current = match &current {
                Value::Map(m) => match m.get(segment) {
                    Some(v) => v.clone(),
                    None => return Value::Null,
                },
                Value::List(l) => {
                    match segment.parse::<usize>().ok().and_then(|i| l.get(i)) {
                        Some(v) => v.clone(),
                        None => return Value::Null,
                    }
                }
                _ => return Value::Null,
            };
            if let Value::Fn(f) = &current {
                current = f(self);
            }
        }
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person_context() -> Context {
        let mut person = IndexMap::new();
        person.insert("name".to_string(), Value::from("Alice"));
        person.insert(
            "pets".to_string(),
            Value::List(vec![Value::from("cat"), Value::from("dog")]),
        );
        Context::new().with("person", Value::Map(person))
    }

    #[test]
    fn test_lookup_map_key() {
        assert_eq!(person_context().lookup("person.name"), Value::from("Alice"));
    }

    #[test]
    fn test_lookup_list_index() {
        assert_eq!(person_context().lookup("person.pets.1"), Value::from("dog"));
    }

    #[test]
    fn test_lookup_miss_is_null_not_error() {
        let ctx = person_context();
        assert_eq!(ctx.lookup("person.age"), Value::Null);
        assert_eq!(ctx.lookup("nobody.here"), Value::Null);
        assert_eq!(ctx.lookup("person.pets.7"), Value::Null);
        assert_eq!(ctx.lookup("person.name.deeper"), Value::Null);
    }

    #[test]
    fn test_lookup_invokes_functions() {
        let ctx = Context::new().with(
            "now",
            Value::Fn(Arc::new(|_ctx: &Context| {
                let mut m = IndexMap::new();
                m.insert("year".to_string(), Value::Int(2024));
                Value::Map(m)
            })),
        );
        assert_eq!(ctx.lookup("now.year"), Value::Int(2024));
    }

    #[test]
    fn test_extend_does_not_mutate_original() {
        let base = Context::new().with("x", 1i64);
        let mut overlay = IndexMap::new();
        overlay.insert("x".to_string(), Value::Int(2));
        overlay.insert("y".to_string(), Value::Int(3));
        let extended = base.extend(&overlay);
        assert_eq!(extended.lookup("x"), Value::Int(2));
        assert_eq!(extended.lookup("y"), Value::Int(3));
        assert_eq!(base.lookup("x"), Value::Int(1));
        assert_eq!(base.lookup("y"), Value::Null);
    }
}

//! HTML elements and attribute serialization.
//!
//! Attribute keys go through a Rust-friendly normalization before output:
//! one leading underscore is stripped (so reserved words like `_type` work
//! as keys) and remaining underscores become hyphens (`data_id` becomes
//! `data-id`). Values follow the usual HTML conventions: `true` emits a
//! bare key, `false` and null emit nothing, everything else emits
//! `key="escaped value"`. The `value` key is the one exception and is
//! always emitted, since `value="0"` and a missing `value` mean different
//! things to form controls.

use indexmap::IndexMap;

use crate::context::Context;
use crate::error::{Error, Result};
use crate::lazy::{Concrete, Lazy};
use crate::node::{Child, Group, Node, render_children, render_node_to_string};
use crate::safe::{SafeString, conditional_escape};
use crate::value::Value;

/// An HTML element: tag, attributes, lazy attributes, children.
#[derive(Clone, Debug)]
pub struct Element {
    pub(crate) tag: String,
    pub(crate) attrs: IndexMap<String, Child>,
    pub(crate) lazy_attrs: Option<Lazy>,
    pub(crate) children: Vec<Child>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attrs: IndexMap::new(),
            lazy_attrs: None,
            children: Vec::new(),
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Set an attribute. Keys are normalized at serialization time, so
    /// `_type` and `data_id` are fine as written.
    pub fn attr(mut self, key: impl Into<String>, value: impl Into<Child>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }

    /// Supply a whole attribute map lazily. It must resolve to a map at
    /// render time; on key collision the statically-set attribute wins.
    pub fn lazy_attrs(mut self, lazy: Lazy) -> Self {
        self.lazy_attrs = Some(lazy);
        self
    }

    pub fn child(mut self, child: impl Into<Child>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn children(&self) -> &[Child] {
        &self.children
    }

    /// Append to an attribute, joining with the existing value. The
    /// separator defaults by key: space for `class`, semicolon for `style`
    /// and `on*` handlers, space otherwise.
    pub fn append_attr(
        mut self,
        key: impl Into<String>,
        value: impl Into<Child>,
        separator: Option<&str>,
    ) -> Self {
        append_attribute(&mut self.attrs, key, value, separator);
        self
    }

    pub(crate) fn render_into(
        &self,
        out: &mut String,
        ctx: &Context,
        stack: &mut Vec<String>,
    ) -> Result<()> {
        let attrs = flatten_attrs(&self.attrs, self.lazy_attrs.as_ref(), ctx)?;
        out.push('<');
        out.push_str(&self.tag);
        if !attrs.is_empty() {
            out.push(' ');
            out.push_str(&attrs);
        }
        out.push('>');
        render_children(&self.children, out, ctx, stack);
        out.push_str("</");
        out.push_str(&self.tag);
        out.push('>');
        Ok(())
    }
}

/// A void element (`br`, `img`, `input`, ...): attributes only, no
/// children and no closing tag. Holding no child storage at all is what
/// enforces the "no children" rule.
#[derive(Clone, Debug)]
pub struct VoidElement {
    pub(crate) tag: String,
    pub(crate) attrs: IndexMap<String, Child>,
    pub(crate) lazy_attrs: Option<Lazy>,
}

impl VoidElement {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attrs: IndexMap::new(),
            lazy_attrs: None,
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn attr(mut self, key: impl Into<String>, value: impl Into<Child>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }

    pub fn lazy_attrs(mut self, lazy: Lazy) -> Self {
        self.lazy_attrs = Some(lazy);
        self
    }

    pub fn append_attr(
        mut self,
        key: impl Into<String>,
        value: impl Into<Child>,
        separator: Option<&str>,
    ) -> Self {
        append_attribute(&mut self.attrs, key, value, separator);
        self
    }

    pub(crate) fn render_into(&self, out: &mut String, ctx: &Context) -> Result<()> {
        let attrs = flatten_attrs(&self.attrs, self.lazy_attrs.as_ref(), ctx)?;
        out.push('<');
        out.push_str(&self.tag);
        if !attrs.is_empty() {
            out.push(' ');
            out.push_str(&attrs);
        }
        out.push_str(" />");
        Ok(())
    }
}

/// Normalize an attribute key for output: strip one leading underscore,
/// then turn the remaining underscores into hyphens.
pub(crate) fn attr_key(key: &str) -> String {
    let key = key.strip_prefix('_').unwrap_or(key);
    key.replace('_', "-")
}

fn default_separator(name: &str) -> &'static str {
    match name {
        "style" => ";",
        n if n.starts_with("on") => ";",
        _ => " ",
    }
}

/// Append `value` to the attribute at `key`, joining with the existing
/// value through a separator. When the key is absent this is a plain
/// insert. Joining happens lazily: the old and new values become a group
/// with the separator between them, so lazy attribute values keep working.
pub fn append_attribute(
    attrs: &mut IndexMap<String, Child>,
    key: impl Into<String>,
    value: impl Into<Child>,
    separator: Option<&str>,
) {
    let key = key.into();
    let name = attr_key(&key);
    let existing = attrs.keys().find(|k| attr_key(k) == name).cloned();
    match existing {
        Some(k) => {
            let sep = separator
                .map(str::to_string)
                .unwrap_or_else(|| default_separator(&name).to_string());
            let slot = attrs.get_mut(&k).expect("key was just found");
            let old = std::mem::replace(slot, Child::Value(Value::Null));
            *slot = Child::Node(Node::Group(Group {
                children: vec![old, Child::Value(Value::Safe(SafeString::new(sep))), value.into()],
            }));
        }
        None => {
            attrs.insert(key, value.into());
        }
    }
}

/// Serialize attributes to the `key="value"` form joined by single spaces.
///
/// Static attributes come first in insertion order, then lazy attributes
/// in map order minus keys already set statically. Errors here are render
/// faults for the whole element, since a half-written tag is worse than an
/// error fragment.
pub(crate) fn flatten_attrs(
    attrs: &IndexMap<String, Child>,
    lazy_attrs: Option<&Lazy>,
    ctx: &Context,
) -> Result<String> {
    let mut parts: Vec<String> = Vec::new();
    let mut seen: Vec<String> = Vec::new();
    for (key, child) in attrs {
        let name = attr_key(key);
        emit_attr(&name, child, ctx, &mut parts)?;
        seen.push(name);
    }
    if let Some(lazy) = lazy_attrs {
        match lazy.resolve_fully(ctx)? {
            Concrete::Value(Value::Map(m)) => {
                for (key, value) in &m {
                    let name = attr_key(key);
                    if seen.contains(&name) {
                        continue;
                    }
                    emit_attr(&name, &Child::Value(value.clone()), ctx, &mut parts)?;
                }
            }
            Concrete::Value(Value::Null) => {}
            Concrete::Value(v) => {
                return Err(Error::LazyAttrs {
                    found: v.type_name(),
                });
            }
            Concrete::Node(_) => return Err(Error::LazyAttrs { found: "node" }),
        }
    }
    Ok(parts.join(" "))
}

fn emit_attr(name: &str, child: &Child, ctx: &Context, parts: &mut Vec<String>) -> Result<()> {
    let value = match child {
        Child::Value(v) => v.clone(),
        Child::Lazy(l) => match l.resolve_fully(ctx)? {
            Concrete::Value(v) => v,
            Concrete::Node(n) => node_attr_value(&n, ctx)?,
        },
        Child::Node(n) => node_attr_value(n, ctx)?,
    };
    // `value` is always emitted so form controls can carry value="" and
    // value="0".
    if name == "value" {
        parts.push(format!("{name}=\"{}\"", conditional_escape(&value)));
        return Ok(());
    }
    match value {
        Value::Null | Value::Bool(false) => {}
        Value::Bool(true) => parts.push(name.to_string()),
        v => parts.push(format!("{name}=\"{}\"", conditional_escape(&v))),
    }
    Ok(())
}

/// A node in attribute value position. Conditionals yield their raw branch
/// value so present-or-absent attributes work; anything else is rendered
/// and the result treated as already escaped.
fn node_attr_value(node: &Node, ctx: &Context) -> Result<Value> {
    match node {
        Node::If(cond) => Ok(cond.eval(ctx)?.unwrap_or(Value::Null)),
        other => Ok(Value::Safe(SafeString::new(render_node_to_string(
            other, ctx,
        )?))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::If;
    use crate::tags::{div, img, input};

    fn render(node: impl Into<Node>, ctx: &Context) -> String {
        node.into().render(ctx)
    }

    #[test]
    fn test_attr_key_normalization() {
        assert_eq!(attr_key("class"), "class");
        assert_eq!(attr_key("_type"), "type");
        assert_eq!(attr_key("data_id"), "data-id");
        assert_eq!(attr_key("_data_id"), "data-id");
    }

    #[test]
    fn test_element_without_attrs_has_no_space() {
        assert_eq!(render(div(), &Context::new()), "<div></div>");
    }

    #[test]
    fn test_attr_forms() {
        let el = div()
            .attr("class", "a")
            .attr("hidden", true)
            .attr("disabled", false)
            .attr("title", Value::Null)
            .attr("data_x", 1i64);
        assert_eq!(
            render(el, &Context::new()),
            "<div class=\"a\" hidden data-x=\"1\"></div>"
        );
    }

    #[test]
    fn test_value_attr_always_emitted() {
        let el = input().attr("value", Value::Null);
        assert_eq!(render(el, &Context::new()), "<input value=\"\" />");
        let el = input().attr("value", 0i64);
        assert_eq!(render(el, &Context::new()), "<input value=\"0\" />");
    }

    #[test]
    fn test_attr_values_escaped() {
        let el = div().attr("title", "a\"b<c>");
        assert_eq!(
            render(el, &Context::new()),
            "<div title=\"a&quot;b&lt;c&gt;\"></div>"
        );
    }

    #[test]
    fn test_safe_marked_attr_value_is_verbatim() {
        let el = div().attr("attr", crate::safe::mark_safe("\""));
        assert_eq!(render(el, &Context::new()), "<div attr=\"\"\"></div>");
        let el = div().attr("attr", "\"");
        assert_eq!(render(el, &Context::new()), "<div attr=\"&quot;\"></div>");
    }

    #[test]
    fn test_lazy_attr_value() {
        let el = div().attr("class", Lazy::lookup("cls"));
        let ctx = Context::new().with("cls", "active");
        assert_eq!(render(el, &ctx), "<div class=\"active\"></div>");
    }

    #[test]
    fn test_conditional_attr_value() {
        let ctx = Context::new();
        let el = div().attr("class", If::new(true, "active"));
        assert_eq!(render(el, &ctx), "<div class=\"active\"></div>");
        let el = div().attr("class", If::new(false, "active"));
        assert_eq!(render(el, &ctx), "<div></div>");
    }

    #[test]
    fn test_lazy_attrs_merge_static_wins() {
        let attrs = Lazy::func(|_ctx| {
            let mut m = IndexMap::new();
            m.insert("class".to_string(), Value::from("from-lazy"));
            m.insert("role".to_string(), Value::from("note"));
            Ok(crate::lazy::Resolved::Value(Value::Map(m)))
        });
        let el = div().attr("class", "static").lazy_attrs(attrs);
        assert_eq!(
            render(el, &Context::new()),
            "<div class=\"static\" role=\"note\"></div>"
        );
    }

    #[test]
    fn test_lazy_attrs_must_be_a_map() {
        let el = div().lazy_attrs(Lazy::func(|_ctx| {
            Ok(crate::lazy::Resolved::Value(Value::from("nope")))
        }));
        let out = render(el, &Context::new());
        assert!(out.contains("~~~ Exception:"), "got: {out}");
        assert!(out.contains("lazy attributes must resolve to a map"));
    }

    #[test]
    fn test_void_element_rendering() {
        let el = img().attr("src", "x.png");
        assert_eq!(render(el, &Context::new()), "<img src=\"x.png\" />");
        assert_eq!(render(crate::tags::br(), &Context::new()), "<br />");
    }

    #[test]
    fn test_append_attr_class_joins_with_space() {
        let el = div()
            .attr("class", "a")
            .append_attr("class", "b", None);
        assert_eq!(render(el, &Context::new()), "<div class=\"a b\"></div>");
    }

    #[test]
    fn test_append_attr_style_joins_with_semicolon() {
        let el = div()
            .attr("style", "color: red")
            .append_attr("style", "margin: 0", None);
        assert_eq!(
            render(el, &Context::new()),
            "<div style=\"color: red;margin: 0\"></div>"
        );
    }

    #[test]
    fn test_append_attr_handlers_join_with_semicolon() {
        let el = div()
            .attr("onclick", "a()")
            .append_attr("onclick", "b()", None);
        assert_eq!(
            render(el, &Context::new()),
            "<div onclick=\"a();b()\"></div>"
        );
    }

    #[test]
    fn test_append_attr_on_missing_key_inserts() {
        let el = div().append_attr("class", "only", None);
        assert_eq!(render(el, &Context::new()), "<div class=\"only\"></div>");
    }

    #[test]
    fn test_append_attr_matches_normalized_keys() {
        let el = div()
            .attr("data_x", "a")
            .append_attr("_data_x", "b", Some(","));
        assert_eq!(render(el, &Context::new()), "<div data-x=\"a,b\"></div>");
    }
}

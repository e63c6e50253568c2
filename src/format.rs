//! Format-string expansion with escaping.
//!
//! [`Format`] builds output from a template with `{}` placeholders. The
//! template's literal text is escaped unless the template is safe-marked;
//! every argument is resolved through the lazy protocol and then
//! conditional-escaped, so safe-marked arguments pass through verbatim.
//! The assembled result is safe-marked as a whole and is not escaped again
//! on output.
//!
//! Placeholders are `{}` (next positional argument), `{N}` (positional by
//! index) and `{name}` (named argument). `{{` and `}}` are literal braces.

use indexmap::IndexMap;

use crate::context::Context;
use crate::error::{Error, Result};
use crate::lazy::{Concrete, Lazy, Resolved};
use crate::node::{Child, render_node_to_string};
use crate::safe::{SafeString, conditional_escape, escape};
use crate::value::Value;

/// A deferred format-string expansion. Expansion happens at render time,
/// after the arguments have been resolved against the context.
#[derive(Clone, Debug)]
pub struct Format {
    template: Value,
    args: Vec<Child>,
    named: IndexMap<String, Child>,
}

impl Format {
    pub fn new(template: impl Into<Value>) -> Self {
        Self {
            template: template.into(),
            args: Vec::new(),
            named: IndexMap::new(),
        }
    }

    /// Append a positional argument.
    pub fn arg(mut self, value: impl Into<Child>) -> Self {
        self.args.push(value.into());
        self
    }

    /// Bind a named argument, referenced as `{name}`.
    pub fn named(mut self, name: impl Into<String>, value: impl Into<Child>) -> Self {
        self.named.insert(name.into(), value.into());
        self
    }

    /// Expand against the context. The result is safe-marked: escaping has
    /// already happened per piece.
    pub fn render_to_value(&self, ctx: &Context) -> Result<Value> {
        Ok(Value::Safe(SafeString::new(self.expand(ctx)?)))
    }

    fn expand(&self, ctx: &Context) -> Result<String> {
        let owned;
        let (text, template_safe) = match &self.template {
            Value::Safe(s) => (s.as_str(), true),
            Value::Str(s) => (s.as_str(), false),
            other => {
                owned = other.to_display_string();
                (owned.as_str(), false)
            }
        };
        let mut out = String::new();
        let mut literal = String::new();
        let mut next_auto = 0usize;
        let mut chars = text.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    literal.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    literal.push('}');
                }
                '{' => {
                    push_literal(&mut out, &literal, template_safe);
                    literal.clear();
                    let mut field = String::new();
                    let mut closed = false;
                    for c in chars.by_ref() {
                        if c == '}' {
                            closed = true;
                            break;
                        }
                        field.push(c);
                    }
                    if !closed {
                        return Err(Error::Render(
                            "unclosed '{' in format string".to_string(),
                        ));
                    }
                    out.push_str(&self.field_text(&field, &mut next_auto, ctx)?);
                }
                '}' => {
                    return Err(Error::Render(
                        "unmatched '}' in format string".to_string(),
                    ));
                }
                c => literal.push(c),
            }
        }
        push_literal(&mut out, &literal, template_safe);
        Ok(out)
    }

    fn field_text(&self, field: &str, next_auto: &mut usize, ctx: &Context) -> Result<String> {
        if field.contains(':') || field.contains('!') {
            return Err(Error::Render(format!(
                "format specs are not supported: {{{field}}}"
            )));
        }
        let child = if field.is_empty() {
            let i = *next_auto;
            *next_auto += 1;
            self.args
                .get(i)
                .ok_or_else(|| Error::Render(format!("format argument {i} missing")))?
        } else if let Ok(i) = field.parse::<usize>() {
            self.args
                .get(i)
                .ok_or_else(|| Error::Render(format!("format argument {i} missing")))?
        } else {
            self.named
                .get(field)
                .ok_or_else(|| Error::Render(format!("unknown format field {field:?}")))?
        };
        resolve_argument(child, ctx)
    }
}

fn push_literal(out: &mut String, literal: &str, template_safe: bool) {
    if template_safe {
        out.push_str(literal);
    } else {
        out.push_str(&escape(literal));
    }
}

/// An argument resolves through the lazy loop, then values are
/// conditional-escaped and nodes rendered (node output is already escaped).
fn resolve_argument(child: &Child, ctx: &Context) -> Result<String> {
    match child {
        Child::Value(v) => Ok(conditional_escape(v)),
        Child::Node(n) => render_node_to_string(n, ctx),
        Child::Lazy(l) => match l.resolve_fully(ctx)? {
            Concrete::Value(v) => Ok(conditional_escape(&v)),
            Concrete::Node(n) => render_node_to_string(&n, ctx),
        },
    }
}

/// Shorthand for [`Format::new`]: `format("hi {}").arg(Lazy::lookup("name"))`.
pub fn format(template: impl Into<Value>) -> Format {
    Format::new(template)
}

impl From<Format> for Child {
    fn from(f: Format) -> Self {
        Child::Lazy(Lazy::func(move |ctx| {
            Ok(Resolved::Value(f.render_to_value(ctx)?))
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Group, Node};
    use crate::safe::mark_safe;

    fn render(f: Format, ctx: &Context) -> String {
        Node::from(Group::new().child(f)).render(ctx)
    }

    #[test]
    fn test_plain_text_unchanged() {
        assert_eq!(
            render(format("xkcd and xhtml are great"), &Context::new()),
            "xkcd and xhtml are great"
        );
    }

    #[test]
    fn test_template_literals_are_escaped() {
        let ctx = Context::new();
        assert_eq!(render(format("\""), &ctx), "&quot;");
        assert_eq!(render(format("<>"), &ctx), "&lt;&gt;");
        assert_eq!(render(format("&"), &ctx), "&amp;");
    }

    #[test]
    fn test_safe_template_literals_pass_through() {
        let ctx = Context::new();
        assert_eq!(render(format(mark_safe("\"")), &ctx), "\"");
        assert_eq!(render(format(mark_safe("<&>")), &ctx), "<&>");
    }

    #[test]
    fn test_argument_substitution() {
        let ctx = Context::new();
        assert_eq!(
            render(format("test: {}").arg("field1"), &ctx),
            "test: field1"
        );
        assert_eq!(
            render(format("<>: {}").arg("field1"), &ctx),
            "&lt;&gt;: field1"
        );
        assert_eq!(render(format("<>: {}").arg("&"), &ctx), "&lt;&gt;: &amp;");
    }

    #[test]
    fn test_safety_is_per_piece() {
        let ctx = Context::new();
        // Safe template, unsafe argument.
        assert_eq!(
            render(format(mark_safe("<>: {}")).arg("&"), &ctx),
            "<>: &amp;"
        );
        // Unsafe template, safe argument.
        assert_eq!(
            render(format("<>: {}").arg(mark_safe("&")), &ctx),
            "&lt;&gt;: &"
        );
        // Both safe.
        assert_eq!(
            render(format(mark_safe("<>: {}")).arg(mark_safe("&")), &ctx),
            "<>: &"
        );
    }

    #[test]
    fn test_named_arguments() {
        let ctx = Context::new();
        assert_eq!(
            render(
                format(mark_safe("<>: {test}")).named("test", mark_safe("&")),
                &ctx
            ),
            "<>: &"
        );
    }

    #[test]
    fn test_positional_index_can_repeat() {
        assert_eq!(
            render(format("{0} and {0}").arg("x"), &Context::new()),
            "x and x"
        );
    }

    #[test]
    fn test_brace_escapes() {
        assert_eq!(render(format("{{}}"), &Context::new()), "{}");
    }

    #[test]
    fn test_lazy_argument_resolved_before_formatting() {
        let ctx = Context::new().with("name", "<Alice>");
        assert_eq!(
            render(format("hello {}").arg(Lazy::lookup("name")), &ctx),
            "hello &lt;Alice&gt;"
        );
    }

    #[test]
    fn test_missing_argument_is_a_render_fault() {
        let out = render(format("{} {}").arg("only"), &Context::new());
        assert!(out.contains("~~~ Exception:"), "got: {out}");
        assert!(out.contains("format argument 1 missing"));
    }

    #[test]
    fn test_result_not_escaped_twice() {
        // The expansion is safe-marked as a whole; the escaped literal must
        // come out as &amp; and not &amp;amp;.
        assert_eq!(render(format("&"), &Context::new()), "&amp;");
    }
}

//! The composite render node and its control-flow variants.
//!
//! A tree is an ordered sequence of children; each child is a literal value,
//! a lazy value, or another node. Behavior is determined by which node
//! variant is instantiated, resolved by exhaustive matching rather than
//! runtime type tests. Parents exclusively own their children; nothing holds
//! a back-reference, and the tree is acyclic by construction.
//!
//! Rendering is recursive and pure with respect to the tree. Every child
//! render is fenced: a fault inside a subtree is reported through the
//! context's fault hook and replaced by a visible error fragment, so one
//! broken leaf cannot blank an entire page.

use indexmap::IndexMap;

use crate::context::Context;
use crate::element::{Element, VoidElement};
use crate::error::{Error, Result};
use crate::lazy::{Concrete, Lazy};
use crate::safe::{SafeString, conditional_escape, escape};
use crate::value::Value;

/// One entry in a node's child sequence.
#[derive(Clone, Debug)]
pub enum Child {
    /// A literal leaf value, escaped on output unless safe-marked.
    Value(Value),
    /// A deferred value, resolved against the context at render time.
    Lazy(Lazy),
    /// A nested node, rendered recursively.
    Node(Node),
}

/// A node in the render tree.
#[derive(Clone, Debug)]
pub enum Node {
    /// A plain ordered sequence of children.
    Group(Group),
    /// Renders one of two branches based on a condition.
    If(If),
    /// Renders a body once per element of an iterable.
    Each(Each),
    /// Renders children against an extended context.
    Scope(Scope),
    /// An HTML element with attributes and children.
    Element(Element),
    /// An HTML void element: attributes only, no closing tag.
    Void(VoidElement),
    /// A named subtree, addressable for partial rendering.
    Fragment(Fragment),
}

impl Node {
    /// Render this node against the given context.
    ///
    /// Never fails: a fault while rendering is reported through the
    /// context's fault hook and a visible error fragment is returned in
    /// place of the faulting subtree's output.
    pub fn render(&self, ctx: &Context) -> String {
        let mut out = String::new();
        let mut stack = Vec::new();
        let mut buf = String::new();
        match self.render_into(&mut buf, ctx, &mut stack) {
            Ok(()) => out.push_str(&buf),
            Err(err) => {
                ctx.handle_fault(&format_fault(&err, &stack));
                out.push_str(&fault_fragment(&err));
            }
        }
        out
    }

    pub(crate) fn render_into(
        &self,
        out: &mut String,
        ctx: &Context,
        stack: &mut Vec<String>,
    ) -> Result<()> {
        stack.push(self.describe());
        let result = match self {
            Node::Group(g) => {
                render_children(&g.children, out, ctx, stack);
                Ok(())
            }
            Node::Fragment(f) => {
                render_children(&f.children, out, ctx, stack);
                Ok(())
            }
            Node::If(f) => f.render_into(out, ctx, stack),
            Node::Each(e) => e.render_into(out, ctx, stack),
            Node::Scope(s) => {
                let scoped = ctx.extend(&s.bindings);
                render_children(&s.children, out, &scoped, stack);
                Ok(())
            }
            Node::Element(el) => el.render_into(out, ctx, stack),
            Node::Void(v) => v.render_into(out, ctx),
        };
        // On error the frame is left in place so the fault trail can be
        // reconstructed at the catch site, which truncates the stack.
        if result.is_ok() {
            stack.pop();
        }
        result
    }

    /// A short description of this node for fault diagnostics.
    pub fn describe(&self) -> String {
        match self {
            Node::Group(_) => "Group".to_string(),
            Node::If(_) => "If".to_string(),
            Node::Each(e) => format!("Each({})", e.var),
            Node::Scope(_) => "Scope".to_string(),
            Node::Element(el) => format!("<{}>", el.tag),
            Node::Void(v) => format!("<{} />", v.tag),
            Node::Fragment(f) => format!("Fragment({})", f.name),
        }
    }

    /// Whether this node has any children. Used for truthiness when a node
    /// ends up as a condition value.
    pub fn has_children(&self) -> bool {
        match self {
            Node::Group(g) => !g.children.is_empty(),
            Node::Scope(s) => !s.children.is_empty(),
            Node::Fragment(f) => !f.children.is_empty(),
            Node::Each(e) => !e.body.is_empty(),
            Node::Element(el) => !el.children.is_empty(),
            Node::Void(_) => false,
            // A conditional always owns at least its true branch.
            Node::If(_) => true,
        }
    }

    /// Structural clone of the tree. Lazy values are pure descriptions, so
    /// their internals are shared rather than duplicated.
    pub fn deep_copy(&self) -> Node {
        self.clone()
    }
}

/// Render each child in order; faults are fenced per child.
pub(crate) fn render_children(
    children: &[Child],
    out: &mut String,
    ctx: &Context,
    stack: &mut Vec<String>,
) {
    for child in children {
        render_child(child, out, ctx, stack);
    }
}

/// Render one child. This is the fault fence: an error anywhere below is
/// reported through the context hook and replaced by the error fragment.
pub(crate) fn render_child(child: &Child, out: &mut String, ctx: &Context, stack: &mut Vec<String>) {
    let depth = stack.len();
    let mut buf = String::new();
    let result = try_render_child(child, &mut buf, ctx, stack);
    match result {
        Ok(()) => out.push_str(&buf),
        Err(err) => {
            ctx.handle_fault(&format_fault(&err, stack));
            stack.truncate(depth);
            out.push_str(&fault_fragment(&err));
        }
    }
}

fn try_render_child(
    child: &Child,
    out: &mut String,
    ctx: &Context,
    stack: &mut Vec<String>,
) -> Result<()> {
    match child {
        Child::Value(v) => {
            if !v.is_null() {
                out.push_str(&conditional_escape(v));
            }
            Ok(())
        }
        Child::Node(n) => n.render_into(out, ctx, stack),
        Child::Lazy(l) => match l.resolve_fully(ctx)? {
            Concrete::Value(v) => {
                if !v.is_null() {
                    out.push_str(&conditional_escape(&v));
                }
                Ok(())
            }
            Concrete::Node(n) => n.render_into(out, ctx, stack),
        },
    }
}

/// Render a node to a standalone string, propagating faults to the caller.
/// Used where a node appears in value position (attribute values, raw
/// conditional evaluation).
pub(crate) fn render_node_to_string(node: &Node, ctx: &Context) -> Result<String> {
    let mut buf = String::new();
    let mut stack = Vec::new();
    node.render_into(&mut buf, ctx, &mut stack)?;
    Ok(buf)
}

/// Format the outer-to-inner chain of nodes that were rendering when a
/// fault occurred, one frame per line with increasing indentation.
fn format_fault(err: &Error, stack: &[String]) -> String {
    let mut lines = Vec::with_capacity(stack.len() + 1);
    for (i, frame) in stack.iter().enumerate() {
        lines.push(format!("{}{}", "  ".repeat(i), frame));
    }
    lines.push(format!("{}{}", "  ".repeat(stack.len()), err));
    lines.join("\n")
}

/// The visible, escaped fragment substituted for a faulting subtree.
pub(crate) fn fault_fragment(err: &Error) -> String {
    format!(
        "<pre style=\"border: solid 1px red; color: red; padding: 1rem; \
         background-color: #ffdddd\"><code>~~~ Exception: {} ~~~</code></pre>",
        escape(&err.to_string())
    )
}

/// Truthiness of a child: values by their own rules, nodes by whether they
/// have children (an empty group is falsy).
fn child_truthy(child: &Child, ctx: &Context) -> Result<bool> {
    match child {
        Child::Value(v) => Ok(v.is_truthy()),
        Child::Node(n) => Ok(n.has_children()),
        Child::Lazy(l) => match l.resolve_fully(ctx)? {
            Concrete::Value(v) => Ok(v.is_truthy()),
            Concrete::Node(n) => Ok(n.has_children()),
        },
    }
}

/// A plain ordered sequence of children, rendered by concatenation with no
/// separators.
#[derive(Clone, Debug, Default)]
pub struct Group {
    pub(crate) children: Vec<Child>,
}

impl Group {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn child(mut self, child: impl Into<Child>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn children(&self) -> &[Child] {
        &self.children
    }
}

impl FromIterator<Child> for Group {
    fn from_iter<I: IntoIterator<Item = Child>>(iter: I) -> Self {
        Group {
            children: iter.into_iter().collect(),
        }
    }
}

/// Renders exactly one of two branches based on a condition resolved
/// through the lazy protocol.
#[derive(Clone, Debug)]
pub struct If {
    pub(crate) condition: Box<Child>,
    pub(crate) then: Box<Child>,
    pub(crate) otherwise: Option<Box<Child>>,
}

impl If {
    pub fn new(condition: impl Into<Child>, then: impl Into<Child>) -> Self {
        Self {
            condition: Box::new(condition.into()),
            then: Box::new(then.into()),
            otherwise: None,
        }
    }

    /// Set the branch rendered when the condition is falsy.
    pub fn otherwise(mut self, child: impl Into<Child>) -> Self {
        self.otherwise = Some(Box::new(child.into()));
        self
    }

    fn branch(&self, ctx: &Context) -> Result<Option<&Child>> {
        if child_truthy(&self.condition, ctx)? {
            Ok(Some(&self.then))
        } else {
            Ok(self.otherwise.as_deref())
        }
    }

    fn render_into(&self, out: &mut String, ctx: &Context, stack: &mut Vec<String>) -> Result<()> {
        if let Some(child) = self.branch(ctx)? {
            render_child(child, out, ctx, stack);
        }
        Ok(())
    }

    /// Resolve to the raw value of the selected branch instead of its
    /// rendering. Used where the node appears in value position, e.g. an
    /// attribute that is present or absent based on truthiness.
    ///
    /// Returns `None` when no branch applies or the branch resolves to
    /// null. A branch that resolves to a node is rendered to a safe string.
    pub fn eval(&self, ctx: &Context) -> Result<Option<Value>> {
        let Some(child) = self.branch(ctx)? else {
            return Ok(None);
        };
        let value = match child {
            Child::Value(v) => v.clone(),
            Child::Node(n) => Value::Safe(SafeString::new(render_node_to_string(n, ctx)?)),
            Child::Lazy(l) => match l.resolve_fully(ctx)? {
                Concrete::Value(v) => v,
                Concrete::Node(n) => Value::Safe(SafeString::new(render_node_to_string(&n, ctx)?)),
            },
        };
        Ok(if value.is_null() { None } else { Some(value) })
    }
}

/// Renders a body once per element of an iterable, binding the loop
/// variable and `{var}_index` in a derived context.
#[derive(Clone, Debug)]
pub struct Each {
    pub(crate) iterable: Box<Child>,
    pub(crate) var: String,
    pub(crate) body: Vec<Child>,
}

impl Each {
    pub fn new(iterable: impl Into<Child>, var: impl Into<String>, body: impl Into<Child>) -> Self {
        Self {
            iterable: Box::new(iterable.into()),
            var: var.into(),
            body: vec![body.into()],
        }
    }

    /// Append another child to the loop body.
    pub fn child(mut self, child: impl Into<Child>) -> Self {
        self.body.push(child.into());
        self
    }

    fn render_into(&self, out: &mut String, ctx: &Context, stack: &mut Vec<String>) -> Result<()> {
        for (i, item) in self.items(ctx)?.into_iter().enumerate() {
            let mut overlay = IndexMap::new();
            overlay.insert(self.var.clone(), item);
            overlay.insert(format!("{}_index", self.var), Value::Int(i as i64));
            let scoped = ctx.extend(&overlay);
            render_children(&self.body, out, &scoped, stack);
        }
        Ok(())
    }

    fn items(&self, ctx: &Context) -> Result<Vec<Value>> {
        let value = match &*self.iterable {
            Child::Value(v) => v.clone(),
            Child::Lazy(l) => match l.resolve_fully(ctx)? {
                Concrete::Value(v) => v,
                Concrete::Node(n) => {
                    return Err(Error::Render(format!(
                        "cannot iterate over {}",
                        n.describe()
                    )));
                }
            },
            Child::Node(n) => {
                return Err(Error::Render(format!(
                    "cannot iterate over {}",
                    n.describe()
                )));
            }
        };
        match value {
            Value::List(l) => Ok(l),
            Value::Str(s) => Ok(s.chars().map(|c| Value::Str(c.to_string())).collect()),
            Value::Safe(s) => Ok(s
                .as_str()
                .chars()
                .map(|c| Value::Str(c.to_string()))
                .collect()),
            Value::Map(m) => Ok(m
                .into_iter()
                .map(|(k, v)| Value::List(vec![Value::Str(k), v]))
                .collect()),
            // A missing iterable renders nothing, like any lookup miss.
            Value::Null => Ok(Vec::new()),
            other => Err(Error::Render(format!(
                "cannot iterate over {}",
                other.type_name()
            ))),
        }
    }
}

/// Renders children against the ambient context overlaid with extra
/// bindings. The overlay wins on key collision and is invisible outside
/// this node.
#[derive(Clone, Debug, Default)]
pub struct Scope {
    pub(crate) bindings: IndexMap<String, Value>,
    pub(crate) children: Vec<Child>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.bindings.insert(name.into(), value.into());
        self
    }

    pub fn child(mut self, child: impl Into<Child>) -> Self {
        self.children.push(child.into());
        self
    }
}

/// A named subtree. Renders transparently as a group; the render entry
/// point can address it by name to produce only this subtree's output.
#[derive(Clone, Debug)]
pub struct Fragment {
    pub(crate) name: String,
    pub(crate) children: Vec<Child>,
}

impl Fragment {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            children: Vec::new(),
        }
    }

    pub fn child(mut self, child: impl Into<Child>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn children(&self) -> &[Child] {
        &self.children
    }
}

/// Find the first fragment with the given name in pre-order, the root
/// included.
pub(crate) fn find_fragment<'a>(node: &'a Node, name: &str) -> Option<&'a Fragment> {
    if let Node::Fragment(f) = node
        && f.name == name
    {
        return Some(f);
    }
    let children: &[Child] = match node {
        Node::Group(g) => &g.children,
        Node::Scope(s) => &s.children,
        Node::Fragment(f) => &f.children,
        Node::Each(e) => &e.body,
        Node::Element(el) => &el.children,
        Node::Void(_) => &[],
        Node::If(f) => {
            if let Child::Node(n) = &*f.then
                && let Some(found) = find_fragment(n, name)
            {
                return Some(found);
            }
            if let Some(otherwise) = &f.otherwise
                && let Child::Node(n) = &**otherwise
                && let Some(found) = find_fragment(n, name)
            {
                return Some(found);
            }
            return None;
        }
    };
    for child in children {
        if let Child::Node(n) = child
            && let Some(found) = find_fragment(n, name)
        {
            return Some(found);
        }
    }
    None
}

impl From<Value> for Child {
    fn from(v: Value) -> Self {
        Child::Value(v)
    }
}

impl From<Lazy> for Child {
    fn from(l: Lazy) -> Self {
        Child::Lazy(l)
    }
}

impl From<Node> for Child {
    fn from(n: Node) -> Self {
        Child::Node(n)
    }
}

impl From<&str> for Child {
    fn from(s: &str) -> Self {
        Child::Value(Value::from(s))
    }
}

impl From<String> for Child {
    fn from(s: String) -> Self {
        Child::Value(Value::from(s))
    }
}

impl From<SafeString> for Child {
    fn from(s: SafeString) -> Self {
        Child::Value(Value::Safe(s))
    }
}

impl From<bool> for Child {
    fn from(b: bool) -> Self {
        Child::Value(Value::Bool(b))
    }
}

impl From<i64> for Child {
    fn from(i: i64) -> Self {
        Child::Value(Value::Int(i))
    }
}

impl From<i32> for Child {
    fn from(i: i32) -> Self {
        Child::Value(Value::Int(i64::from(i)))
    }
}

impl From<f64> for Child {
    fn from(f: f64) -> Self {
        Child::Value(Value::Float(f))
    }
}

impl From<Group> for Child {
    fn from(g: Group) -> Self {
        Child::Node(Node::Group(g))
    }
}

impl From<If> for Child {
    fn from(f: If) -> Self {
        Child::Node(Node::If(f))
    }
}

impl From<Each> for Child {
    fn from(e: Each) -> Self {
        Child::Node(Node::Each(e))
    }
}

impl From<Scope> for Child {
    fn from(s: Scope) -> Self {
        Child::Node(Node::Scope(s))
    }
}

impl From<Fragment> for Child {
    fn from(f: Fragment) -> Self {
        Child::Node(Node::Fragment(f))
    }
}

impl From<Element> for Child {
    fn from(el: Element) -> Self {
        Child::Node(Node::Element(el))
    }
}

impl From<VoidElement> for Child {
    fn from(v: VoidElement) -> Self {
        Child::Node(Node::Void(v))
    }
}

impl From<Group> for Node {
    fn from(g: Group) -> Self {
        Node::Group(g)
    }
}

impl From<If> for Node {
    fn from(f: If) -> Self {
        Node::If(f)
    }
}

impl From<Each> for Node {
    fn from(e: Each) -> Self {
        Node::Each(e)
    }
}

impl From<Scope> for Node {
    fn from(s: Scope) -> Self {
        Node::Scope(s)
    }
}

impl From<Fragment> for Node {
    fn from(f: Fragment) -> Self {
        Node::Fragment(f)
    }
}

impl From<Element> for Node {
    fn from(el: Element) -> Self {
        Node::Element(el)
    }
}

impl From<VoidElement> for Node {
    fn from(v: VoidElement) -> Self {
        Node::Void(v)
    }
}

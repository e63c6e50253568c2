//! Tree query and mutation.
//!
//! Traversal is pre-order. For elements, nodes sitting in attribute value
//! position are visited before the element's children. Predicates receive
//! the candidate node and its ancestor chain ordered root-first; the root
//! itself is never a candidate.
//!
//! Mutations run in two phases: an immutable traversal collects the slot
//! paths of every match, then the edits are applied innermost-and-last
//! first so earlier removals cannot shift the indices of later ones.

use crate::error::{Error, Result};
use crate::node::{Child, Node};
use crate::value::Value;

/// One hop from a node to a child slot.
#[derive(Clone, Debug, PartialEq, Eq)]
enum Step {
    /// Index into the node's child sequence.
    Child(usize),
    /// An element attribute, by its stored (un-normalized) key.
    Attr(String),
    /// The true branch of a conditional.
    Then,
    /// The false branch of a conditional.
    Else,
}

impl Node {
    /// All descendant nodes matching the predicate, in pre-order.
    ///
    /// The predicate sees `(candidate, ancestors)` with ancestors ordered
    /// root-first; `self` is part of every ancestor chain but never a
    /// candidate.
    ///
    /// The match set is a snapshot taken when `filter` is called: the whole
    /// traversal runs up front and the returned iterator replays its
    /// results. Edits made to the tree afterwards are not observed.
    pub fn filter<'a, F>(&'a self, mut pred: F) -> impl Iterator<Item = &'a Node>
    where
        F: FnMut(&Node, &[&Node]) -> bool,
    {
        let mut matches = Vec::new();
        let mut ancestors: Vec<&'a Node> = vec![self];
        collect_refs(self, &mut ancestors, &mut pred, &mut matches);
        matches.into_iter()
    }

    /// All descendant elements with the given tag.
    pub fn filter_tag<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Node> {
        self.filter(move |node, _ancestors| {
            matches!(node, Node::Element(el) if el.tag == tag)
                || matches!(node, Node::Void(v) if v.tag == tag)
        })
    }

    /// Replace every match with a fresh copy of `wrapper` holding the
    /// original match as an appended child. Returns the match count.
    ///
    /// Fails up front when the wrapper cannot hold children (a void
    /// element or a conditional); no edit is applied in that case.
    pub fn wrap<F>(&mut self, mut pred: F, wrapper: &Node) -> Result<usize>
    where
        F: FnMut(&Node, &[&Node]) -> bool,
    {
        match wrapper {
            Node::Void(v) => return Err(Error::VoidWrap { tag: v.tag.clone() }),
            Node::If(_) => return Err(Error::WrapTarget { kind: "If" }),
            _ => {}
        }
        let paths = self.match_paths(&mut pred, false);
        for path in paths.iter().rev() {
            if let Some(slot) = slot_mut(self, path) {
                let original = std::mem::replace(slot, Child::Value(Value::Null));
                let mut fresh = wrapper.deep_copy();
                push_child(&mut fresh, original);
                *slot = Child::Node(fresh);
            }
        }
        Ok(paths.len())
    }

    /// Remove every match from the tree. Returns the match count.
    ///
    /// Matches in a child sequence are removed outright; matches in fixed
    /// slots (attribute values, conditional branches) are blanked instead,
    /// since the slot itself cannot disappear.
    pub fn delete<F>(&mut self, mut pred: F) -> usize
    where
        F: FnMut(&Node, &[&Node]) -> bool,
    {
        let paths = self.match_paths(&mut pred, false);
        for path in paths.iter().rev() {
            remove_at(self, path);
        }
        paths.len()
    }

    /// Replace matches with copies of `replacement`. With `all` false only
    /// the first match in pre-order is replaced and traversal stops there.
    /// Returns the replacement count.
    pub fn replace<F>(&mut self, mut pred: F, replacement: &Node, all: bool) -> usize
    where
        F: FnMut(&Node, &[&Node]) -> bool,
    {
        let paths = self.match_paths(&mut pred, !all);
        for path in paths.iter().rev() {
            if let Some(slot) = slot_mut(self, path) {
                *slot = Child::Node(replacement.deep_copy());
            }
        }
        paths.len()
    }

    fn match_paths(
        &self,
        pred: &mut dyn FnMut(&Node, &[&Node]) -> bool,
        first_only: bool,
    ) -> Vec<Vec<Step>> {
        let mut out = Vec::new();
        let mut ancestors: Vec<&Node> = vec![self];
        let mut prefix = Vec::new();
        collect_paths(self, &mut ancestors, &mut prefix, pred, &mut out, first_only);
        out
    }
}

/// The node's child slots in traversal order. Element attribute values
/// come before element children.
fn child_slots(node: &Node) -> Vec<(Step, &Child)> {
    match node {
        Node::Group(g) => indexed(&g.children),
        Node::Scope(s) => indexed(&s.children),
        Node::Fragment(f) => indexed(&f.children),
        Node::Each(e) => indexed(&e.body),
        Node::If(f) => {
            let mut slots = vec![(Step::Then, &*f.then)];
            if let Some(otherwise) = &f.otherwise {
                slots.push((Step::Else, &**otherwise));
            }
            slots
        }
        Node::Element(el) => {
            let mut slots: Vec<(Step, &Child)> = el
                .attrs
                .iter()
                .map(|(k, c)| (Step::Attr(k.clone()), c))
                .collect();
            slots.extend(indexed(&el.children));
            slots
        }
        Node::Void(v) => v
            .attrs
            .iter()
            .map(|(k, c)| (Step::Attr(k.clone()), c))
            .collect(),
    }
}

fn indexed(children: &[Child]) -> Vec<(Step, &Child)> {
    children
        .iter()
        .enumerate()
        .map(|(i, c)| (Step::Child(i), c))
        .collect()
}

fn collect_refs<'a>(
    node: &'a Node,
    ancestors: &mut Vec<&'a Node>,
    pred: &mut dyn FnMut(&Node, &[&Node]) -> bool,
    out: &mut Vec<&'a Node>,
) {
    for (_step, child) in child_slots(node) {
        if let Child::Node(n) = child {
            if pred(n, ancestors) {
                out.push(n);
            }
            ancestors.push(n);
            collect_refs(n, ancestors, pred, out);
            ancestors.pop();
        }
    }
}

fn collect_paths<'a>(
    node: &'a Node,
    ancestors: &mut Vec<&'a Node>,
    prefix: &mut Vec<Step>,
    pred: &mut dyn FnMut(&Node, &[&Node]) -> bool,
    out: &mut Vec<Vec<Step>>,
    first_only: bool,
) -> bool {
    for (step, child) in child_slots(node) {
        if let Child::Node(n) = child {
            prefix.push(step);
            if pred(n, ancestors) {
                out.push(prefix.clone());
                if first_only {
                    prefix.pop();
                    return true;
                }
            }
            ancestors.push(n);
            let stop = collect_paths(n, ancestors, prefix, pred, out, first_only);
            ancestors.pop();
            prefix.pop();
            if stop {
                return true;
            }
        }
    }
    false
}

fn step_mut<'a>(node: &'a mut Node, step: &Step) -> Option<&'a mut Child> {
    match (node, step) {
        (Node::Group(g), Step::Child(i)) => g.children.get_mut(*i),
        (Node::Scope(s), Step::Child(i)) => s.children.get_mut(*i),
        (Node::Fragment(f), Step::Child(i)) => f.children.get_mut(*i),
        (Node::Each(e), Step::Child(i)) => e.body.get_mut(*i),
        (Node::Element(el), Step::Child(i)) => el.children.get_mut(*i),
        (Node::Element(el), Step::Attr(k)) => el.attrs.get_mut(k),
        (Node::Void(v), Step::Attr(k)) => v.attrs.get_mut(k),
        (Node::If(f), Step::Then) => Some(&mut *f.then),
        (Node::If(f), Step::Else) => f.otherwise.as_deref_mut(),
        _ => None,
    }
}

fn slot_mut<'a>(root: &'a mut Node, path: &[Step]) -> Option<&'a mut Child> {
    let (last, rest) = path.split_last()?;
    let mut node = root;
    for step in rest {
        match step_mut(node, step)? {
            Child::Node(n) => node = n,
            _ => return None,
        }
    }
    step_mut(node, last)
}

fn remove_at(root: &mut Node, path: &[Step]) {
    let Some((last, rest)) = path.split_last() else {
        return;
    };
    let mut node = root;
    for step in rest {
        match step_mut(node, step) {
            Some(Child::Node(n)) => node = n,
            _ => return,
        }
    }
    match (node, last) {
        (Node::Group(g), Step::Child(i)) if *i < g.children.len() => {
            g.children.remove(*i);
        }
        (Node::Scope(s), Step::Child(i)) if *i < s.children.len() => {
            s.children.remove(*i);
        }
        (Node::Fragment(f), Step::Child(i)) if *i < f.children.len() => {
            f.children.remove(*i);
        }
        (Node::Each(e), Step::Child(i)) if *i < e.body.len() => {
            e.body.remove(*i);
        }
        (Node::Element(el), Step::Child(i)) if *i < el.children.len() => {
            el.children.remove(*i);
        }
        (Node::Element(el), Step::Attr(k)) => {
            el.attrs.shift_remove(k);
        }
        (Node::Void(v), Step::Attr(k)) => {
            v.attrs.shift_remove(k);
        }
        (Node::If(f), Step::Then) => *f.then = Child::Value(Value::Null),
        (Node::If(f), Step::Else) => f.otherwise = None,
        _ => {}
    }
}

fn push_child(node: &mut Node, child: Child) {
    match node {
        Node::Group(g) => g.children.push(child),
        Node::Scope(s) => s.children.push(child),
        Node::Fragment(f) => f.children.push(child),
        Node::Each(e) => e.body.push(child),
        Node::Element(el) => el.children.push(child),
        // Rejected before any edit is applied.
        Node::If(_) | Node::Void(_) => unreachable!("wrapper kind checked up front"),
    }
}

/// Whether any ancestor in the chain is an element with the given tag.
pub fn inside_tag(ancestors: &[&Node], tag: &str) -> bool {
    ancestors
        .iter()
        .any(|n| matches!(n, Node::Element(el) if el.tag == tag))
}

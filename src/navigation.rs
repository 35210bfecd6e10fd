//! Read-only navigation and iterative preorder traversal.
//!
//! [`Navigate`] is the only thing traversals need from a tree, so the same
//! preorder walk serves the arena [`Tree`](crate::Tree) and any other
//! navigable structure. Traversal keeps its own frame stack; its depth is
//! bounded by the depth of the tree, never by the call stack.

use crate::tree::NodeId;

/// Stateless parent/first-child/next-sibling access.
pub trait Navigate {
    type Label;

    fn root(&self) -> Option<NodeId>;
    fn parent(&self, node: NodeId) -> Option<NodeId>;
    fn first_child(&self, node: NodeId) -> Option<NodeId>;
    fn next_sibling(&self, node: NodeId) -> Option<NodeId>;
    fn label(&self, node: NodeId) -> &Self::Label;
}

/// A traversal step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    /// Entering a node, before its children.
    Open(NodeId),
    /// Leaving a node, after its children.
    Close(NodeId),
}

/// Explicit stack record of a traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavFrame {
    pub node: NodeId,
    pub parent: Option<NodeId>,
    /// Whether the walk has already gone down into `node`.
    pub descended: bool,
}

/// Preorder open/close walk over any [`Navigate`].
pub struct Preorder<'a, N: ?Sized> {
    nav: &'a N,
    stack: Vec<NavFrame>,
}

impl<'a, N: Navigate + ?Sized> Preorder<'a, N> {
    pub fn new(nav: &'a N) -> Self {
        let stack = nav
            .root()
            .map(|root| NavFrame {
                node: root,
                parent: None,
                descended: false,
            })
            .into_iter()
            .collect();
        Self { nav, stack }
    }

    /// Current depth of the walk.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }
}

impl<N: Navigate + ?Sized> Iterator for Preorder<'_, N> {
    type Item = Visit;

    fn next(&mut self) -> Option<Visit> {
        let frame = self.stack.last_mut()?;
        if !frame.descended {
            frame.descended = true;
            let node = frame.node;
            if let Some(child) = self.nav.first_child(node) {
                self.stack.push(NavFrame {
                    node: child,
                    parent: Some(node),
                    descended: false,
                });
            }
            return Some(Visit::Open(node));
        }

        let frame = self.stack.pop()?;
        if frame.parent.is_some() {
            if let Some(sibling) = self.nav.next_sibling(frame.node) {
                self.stack.push(NavFrame {
                    node: sibling,
                    parent: frame.parent,
                    descended: false,
                });
            }
        }
        Some(Visit::Close(frame.node))
    }
}

/// Balanced-parentheses form: `true` opens a node, `false` closes it.
pub fn bp_string<N: Navigate + ?Sized>(nav: &N) -> Vec<bool> {
    Preorder::new(nav)
        .map(|visit| matches!(visit, Visit::Open(_)))
        .collect()
}

/// Labels in preorder.
pub fn preorder_labels<N: Navigate + ?Sized>(nav: &N) -> Vec<&N::Label> {
    Preorder::new(nav)
        .filter_map(|visit| match visit {
            Visit::Open(node) => Some(nav.label(node)),
            Visit::Close(_) => None,
        })
        .collect()
}

/// True if both trees have the same shape, child order and labels.
///
/// Walks both in lockstep and stops at the first difference.
pub fn same_tree<A, B>(a: &A, b: &B) -> bool
where
    A: Navigate + ?Sized,
    B: Navigate<Label = A::Label> + ?Sized,
    A::Label: PartialEq,
{
    let mut left = Preorder::new(a);
    let mut right = Preorder::new(b);
    loop {
        match (left.next(), right.next()) {
            (None, None) => return true,
            (Some(Visit::Open(x)), Some(Visit::Open(y))) => {
                if a.label(x) != b.label(y) {
                    return false;
                }
            }
            (Some(Visit::Close(_)), Some(Visit::Close(_))) => {}
            _ => return false,
        }
    }
}

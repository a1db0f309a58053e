//! Table of contents in the host's model

use std::{mem, slice};

use crate::pdf::tree::{self, TreeNode};
use crate::pdf::{LinkDestination, Outline};

#[derive(Debug, Default)]
pub struct SynopsisNode {
    pub title: String,
    /// Shown expanded initially
    pub open: bool,
    pub destination: Option<LinkDestination>,
    pub children: Vec<SynopsisNode>,
}

impl TreeNode for SynopsisNode {
    fn child_nodes(&self) -> &[Self] {
        &self.children
    }

    fn child_nodes_mut(&mut self) -> &mut Vec<Self> {
        &mut self.children
    }

    fn shallow_clone(&self) -> Self {
        Self {
            title: self.title.clone(),
            open: self.open,
            destination: self.destination.clone(),
            children: Vec::new(),
        }
    }

    fn shallow_eq(&self, other: &Self) -> bool {
        self.title == other.title && self.open == other.open && self.destination == other.destination
    }
}

impl Clone for SynopsisNode {
    fn clone(&self) -> Self {
        tree::deep_clone(self)
    }
}

impl PartialEq for SynopsisNode {
    fn eq(&self, other: &Self) -> bool {
        tree::deep_eq(self, other)
    }
}

impl Drop for SynopsisNode {
    fn drop(&mut self) {
        tree::dismantle(self);
    }
}

/// Top-level entries of the document outline
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Synopsis {
    pub entries: Vec<SynopsisNode>,
}

impl Synopsis {
    /// Mirror the children of `root`, keeping order and nesting
    #[must_use]
    pub fn from_outline(root: &Outline) -> Self {
        struct Frame<'a> {
            pending: slice::Iter<'a, Outline>,
            node: SynopsisNode,
        }

        let mut stack = vec![Frame {
            pending: root.children().iter(),
            node: SynopsisNode::default(),
        }];

        while let Some(frame) = stack.last_mut() {
            if let Some(child) = frame.pending.next() {
                stack.push(Frame {
                    pending: child.children().iter(),
                    node: SynopsisNode {
                        title: child.title().to_string(),
                        open: child.is_open(),
                        destination: child.destination().cloned(),
                        children: Vec::new(),
                    },
                });
                continue;
            }

            let Some(mut done) = stack.pop() else { break };
            match stack.last_mut() {
                Some(parent) => parent.node.children.push(done.node),
                None => {
                    return Self {
                        entries: mem::take(&mut done.node.children),
                    };
                }
            }
        }
        Self::default()
    }

    /// Depth-first walk yielding each node with its nesting level
    pub fn walk(&self) -> impl Iterator<Item = (usize, &SynopsisNode)> {
        let mut stack: Vec<(usize, &SynopsisNode)> =
            self.entries.iter().rev().map(|n| (0, n)).collect();
        std::iter::from_fn(move || {
            let (level, node) = stack.pop()?;
            stack.extend(node.children.iter().rev().map(|c| (level + 1, c)));
            Some((level, node))
        })
    }
}

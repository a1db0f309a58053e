//! Outline (bookmark) tree

use std::slice;

use super::engine::RawOutline;
use super::link::LinkDestination;
use super::tree::{self, TreeNode};

/// A node of the document outline.
///
/// The root returned by [`Document::outline`](super::Document::outline) has
/// no title or destination of its own and holds the top-level entries.
#[derive(Debug, Default)]
pub struct Outline {
    title: String,
    open: bool,
    children: Vec<Outline>,
    destination: Option<LinkDestination>,
}

impl Outline {
    fn from_entry(raw: &RawOutline) -> Self {
        Self {
            title: raw.title.clone().unwrap_or_default(),
            open: raw.is_open,
            children: Vec::with_capacity(raw.down.len()),
            destination: LinkDestination::from_raw(&raw.link),
        }
    }

    /// Copy the library outline into an owned tree.
    ///
    /// Walks with an explicit stack so that deeply nested bookmarks cannot
    /// exhaust the call stack. A node is attached to its parent only once all
    /// of its children have been converted.
    #[must_use]
    pub fn from_raw(entries: &[RawOutline]) -> Self {
        struct Frame<'a> {
            pending: slice::Iter<'a, RawOutline>,
            node: Outline,
        }

        let mut stack = vec![Frame {
            pending: entries.iter(),
            node: Self::default(),
        }];

        loop {
            let next = match stack.last_mut() {
                Some(frame) => frame.pending.next(),
                None => return Self::default(),
            };

            if let Some(raw) = next {
                stack.push(Frame {
                    pending: raw.down.iter(),
                    node: Self::from_entry(raw),
                });
                continue;
            }

            let Some(done) = stack.pop() else {
                return Self::default();
            };
            match stack.last_mut() {
                Some(parent) => parent.node.children.push(done.node),
                None => return done.node,
            }
        }
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Whether the entry should be shown expanded initially
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.open
    }

    #[must_use]
    pub fn children(&self) -> &[Outline] {
        &self.children
    }

    #[must_use]
    pub const fn destination(&self) -> Option<&LinkDestination> {
        self.destination.as_ref()
    }

    /// Number of levels below this node
    #[must_use]
    pub fn depth(&self) -> usize {
        let mut max = 0;
        let mut stack = vec![(self, 0usize)];
        while let Some((node, level)) = stack.pop() {
            max = max.max(level);
            stack.extend(node.children.iter().map(|c| (c, level + 1)));
        }
        max
    }
}

impl TreeNode for Outline {
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
            children: Vec::new(),
            destination: self.destination.clone(),
        }
    }

    fn shallow_eq(&self, other: &Self) -> bool {
        self.title == other.title && self.open == other.open && self.destination == other.destination
    }
}

impl Clone for Outline {
    fn clone(&self) -> Self {
        tree::deep_clone(self)
    }
}

impl PartialEq for Outline {
    fn eq(&self, other: &Self) -> bool {
        tree::deep_eq(self, other)
    }
}

impl Drop for Outline {
    fn drop(&mut self) {
        tree::dismantle(self);
    }
}

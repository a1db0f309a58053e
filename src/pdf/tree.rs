//! Stack-safe clone, comparison and teardown for owned trees
//!
//! Bookmark trees come from files and can be nested arbitrarily deep, so
//! none of these walks use the call stack for depth.

use std::mem;
use std::slice;

/// A node owning its children in a `Vec`
pub(crate) trait TreeNode: Sized {
    fn child_nodes(&self) -> &[Self];

    fn child_nodes_mut(&mut self) -> &mut Vec<Self>;

    /// Copy of the node's own fields, with no children
    fn shallow_clone(&self) -> Self;

    /// Equality of the node's own fields, children excluded
    fn shallow_eq(&self, other: &Self) -> bool;
}

/// Deep copy of `root`
pub(crate) fn deep_clone<T: TreeNode>(root: &T) -> T {
    struct Frame<'a, T> {
        pending: slice::Iter<'a, T>,
        node: T,
    }

    let mut stack = vec![Frame {
        pending: root.child_nodes().iter(),
        node: root.shallow_clone(),
    }];

    loop {
        let Some(frame) = stack.last_mut() else {
            return root.shallow_clone();
        };
        if let Some(child) = frame.pending.next() {
            stack.push(Frame {
                pending: child.child_nodes().iter(),
                node: child.shallow_clone(),
            });
            continue;
        }

        let Some(done) = stack.pop() else {
            return root.shallow_clone();
        };
        match stack.last_mut() {
            Some(parent) => parent.node.child_nodes_mut().push(done.node),
            None => return done.node,
        }
    }
}

/// Structural equality of two trees
pub(crate) fn deep_eq<T: TreeNode>(a: &T, b: &T) -> bool {
    let mut stack = vec![(a, b)];
    while let Some((x, y)) = stack.pop() {
        if !x.shallow_eq(y) || x.child_nodes().len() != y.child_nodes().len() {
            return false;
        }
        stack.extend(x.child_nodes().iter().zip(y.child_nodes()));
    }
    true
}

/// Detach every descendant of `node` so that dropping it does not recurse.
///
/// Call from `Drop`: each node popped here has had its children moved out
/// before it is dropped.
pub(crate) fn dismantle<T: TreeNode>(node: &mut T) {
    let mut pending = mem::take(node.child_nodes_mut());
    while let Some(mut next) = pending.pop() {
        pending.append(next.child_nodes_mut());
    }
}

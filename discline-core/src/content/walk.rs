//! Pre-order traversal of a [`ContentTree`].

use super::{ContentTree, ItemId};

/// One visited item and its depth relative to the walk's start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalkEntry {
    pub id: ItemId,
    pub depth: usize,
}

/// Iterator returned by [`ContentTree::walk`].
///
/// Directories are yielded before their children, and children in insertion
/// order.
pub struct Walk<'a> {
    tree: &'a ContentTree,
    stack: Vec<WalkEntry>,
}

impl<'a> Walk<'a> {
    pub(super) fn new(tree: &'a ContentTree, from: ItemId) -> Self {
        let stack = if tree.contains(from) {
            vec![WalkEntry { id: from, depth: 0 }]
        } else {
            Vec::new()
        };
        Self { tree, stack }
    }
}

impl Iterator for Walk<'_> {
    type Item = WalkEntry;

    fn next(&mut self) -> Option<WalkEntry> {
        let entry = self.stack.pop()?;
        self.stack.extend(
            self.tree
                .children(entry.id)
                .iter()
                .rev()
                .map(|&id| WalkEntry {
                    id,
                    depth: entry.depth + 1,
                }),
        );
        Some(entry)
    }
}

// ============================================================================
// discline-core/src/content/mod.rs
// ============================================================================
//
// CONTENT TREE: Directory/File Hierarchy with Cached Aggregates
//
// The tree is an arena of nodes addressed by generational `ItemId`s. Parents
// own their children through the `children` index lists; the child->parent
// link is a plain index used for lookups and aggregate propagation only.
//
// Every directory caches the total byte size, file count and directory count
// of its subtree. Mutations validate first and then apply a single delta to
// each ancestor up to the root, so an update costs O(depth). Only building a
// subtree from a detached `ContentItem` (or taking one back out) walks the
// subtree itself.

mod item;
mod policy;
mod walk;

pub use item::{ContentItem, DirectoryItem, FileItem, InsertMode, ItemSource};
pub use policy::{AllRemovable, FileView, PreviousSessionPolicy, RemovalPolicy};
pub use walk::{Walk, WalkEntry};

use std::collections::HashSet;

use log::{debug, warn};

use crate::error::TreeError;

/// Handle to an item inside a [`ContentTree`].
///
/// Ids stay valid until the item leaves the tree; a stale id is rejected
/// rather than aliasing whatever reuses its slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ItemId {
    index: u32,
    generation: u32,
}

/// Cached subtree summary of a directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Totals {
    size: u64,
    files: u64,
    dirs: u64,
}

#[derive(Debug)]
struct FileData {
    length: u64,
    source: ItemSource,
    replaced_previous_session: Option<Box<FileItem>>,
}

#[derive(Debug, Default)]
struct DirData {
    children: Vec<ItemId>,
    totals: Totals,
}

#[derive(Debug)]
enum NodeKind {
    File(FileData),
    Directory(DirData),
}

#[derive(Debug)]
struct Node {
    name: String,
    parent: Option<ItemId>,
    kind: NodeKind,
}

impl Node {
    /// What this node adds to each ancestor's totals.
    fn contribution(&self) -> Totals {
        match &self.kind {
            NodeKind::File(f) => Totals {
                size: f.length,
                files: 1,
                dirs: 0,
            },
            NodeKind::Directory(d) => Totals {
                size: d.totals.size,
                files: d.totals.files,
                dirs: d.totals.dirs + 1,
            },
        }
    }
}

#[derive(Debug, Default)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// Result of a successful [`ContentTree::insert`].
#[derive(Debug)]
pub struct Insertion {
    /// Id of the newly attached item.
    pub id: ItemId,
    /// Sibling detached by [`InsertMode::Replace`], if any.
    pub replaced: Option<ContentItem>,
}

/// Hierarchy of directories and files with a single root directory.
#[derive(Debug)]
pub struct ContentTree {
    slots: Vec<Slot>,
    free: Vec<u32>,
    root: ItemId,
}

fn validate_name(name: &str) -> Result<(), TreeError> {
    if name.is_empty() || name == "." || name == ".." || name.contains('/') {
        return Err(TreeError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Checks names and sibling uniqueness of a detached subtree.
fn validate_detached(item: &ContentItem) -> Result<(), TreeError> {
    validate_name(item.name())?;
    if let ContentItem::Directory(dir) = item {
        let mut seen = HashSet::with_capacity(dir.children.len());
        for child in &dir.children {
            if !seen.insert(child.name()) {
                return Err(TreeError::DuplicateName(child.name().to_string()));
            }
            validate_detached(child)?;
        }
    }
    Ok(())
}

impl ContentTree {
    /// Creates a tree holding only an empty root directory.
    pub fn new(root_name: impl Into<String>) -> Self {
        let mut tree = Self {
            slots: Vec::new(),
            free: Vec::new(),
            root: ItemId {
                index: 0,
                generation: 0,
            },
        };
        tree.root = tree.alloc(Node {
            name: root_name.into(),
            parent: None,
            kind: NodeKind::Directory(DirData::default()),
        });
        tree
    }

    // ---- Arena plumbing ----

    fn alloc(&mut self, node: Node) -> ItemId {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            ItemId {
                index,
                generation: slot.generation,
            }
        } else {
            let index = u32::try_from(self.slots.len()).unwrap_or(u32::MAX);
            self.slots.push(Slot {
                generation: 0,
                node: Some(node),
            });
            ItemId {
                index,
                generation: 0,
            }
        }
    }

    fn release(&mut self, id: ItemId) -> Option<Node> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let node = slot.node.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        Some(node)
    }

    fn node(&self, id: ItemId) -> Option<&Node> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.node.as_ref()
    }

    fn node_mut(&mut self, id: ItemId) -> Option<&mut Node> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.node.as_mut()
    }

    fn dir(&self, id: ItemId) -> Result<&DirData, TreeError> {
        match &self.node(id).ok_or(TreeError::UnknownItem)?.kind {
            NodeKind::Directory(d) => Ok(d),
            NodeKind::File(_) => Err(TreeError::NotADirectory),
        }
    }

    fn dir_mut(&mut self, id: ItemId) -> Result<&mut DirData, TreeError> {
        match &mut self.node_mut(id).ok_or(TreeError::UnknownItem)?.kind {
            NodeKind::Directory(d) => Ok(d),
            NodeKind::File(_) => Err(TreeError::NotADirectory),
        }
    }

    /// Adds `delta` to `from` and every ancestor.
    fn propagate_add(&mut self, from: ItemId, delta: Totals) {
        let mut current = Some(from);
        while let Some(id) = current {
            let Some(node) = self.node_mut(id) else { break };
            if let NodeKind::Directory(d) = &mut node.kind {
                d.totals.size += delta.size;
                d.totals.files += delta.files;
                d.totals.dirs += delta.dirs;
            }
            current = node.parent;
        }
    }

    /// Subtracts `delta` from `from` and every ancestor.
    fn propagate_sub(&mut self, from: ItemId, delta: Totals) {
        let mut current = Some(from);
        while let Some(id) = current {
            let Some(node) = self.node_mut(id) else { break };
            if let NodeKind::Directory(d) = &mut node.kind {
                d.totals.size -= delta.size;
                d.totals.files -= delta.files;
                d.totals.dirs -= delta.dirs;
            }
            current = node.parent;
        }
    }

    // ---- Read access ----

    /// The root directory.
    #[must_use]
    pub fn root(&self) -> ItemId {
        self.root
    }

    /// Number of items in the tree, root included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// A tree always holds its root, so this is true only for a root with
    /// no children.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 1
    }

    #[must_use]
    pub fn contains(&self, id: ItemId) -> bool {
        self.node(id).is_some()
    }

    #[must_use]
    pub fn name(&self, id: ItemId) -> Option<&str> {
        self.node(id).map(|n| n.name.as_str())
    }

    /// Parent directory; `None` for the root and for unknown ids.
    #[must_use]
    pub fn parent(&self, id: ItemId) -> Option<ItemId> {
        self.node(id).and_then(|n| n.parent)
    }

    #[must_use]
    pub fn is_directory(&self, id: ItemId) -> bool {
        matches!(
            self.node(id).map(|n| &n.kind),
            Some(NodeKind::Directory(_))
        )
    }

    /// File length, or the cached subtree size of a directory.
    #[must_use]
    pub fn size(&self, id: ItemId) -> Option<u64> {
        self.node(id).map(|n| match &n.kind {
            NodeKind::File(f) => f.length,
            NodeKind::Directory(d) => d.totals.size,
        })
    }

    /// Cached total byte size of a directory's subtree.
    #[must_use]
    pub fn total_size(&self, dir: ItemId) -> Option<u64> {
        self.dir(dir).ok().map(|d| d.totals.size)
    }

    /// Cached number of files below a directory.
    #[must_use]
    pub fn file_count(&self, dir: ItemId) -> Option<u64> {
        self.dir(dir).ok().map(|d| d.totals.files)
    }

    /// Cached number of directories below a directory (itself excluded).
    #[must_use]
    pub fn directory_count(&self, dir: ItemId) -> Option<u64> {
        self.dir(dir).ok().map(|d| d.totals.dirs)
    }

    /// Direct children in insertion order; empty for files and unknown ids.
    #[must_use]
    pub fn children(&self, dir: ItemId) -> &[ItemId] {
        self.dir(dir).map(|d| d.children.as_slice()).unwrap_or(&[])
    }

    /// Data source of a file.
    #[must_use]
    pub fn source(&self, id: ItemId) -> Option<&ItemSource> {
        match &self.node(id)?.kind {
            NodeKind::File(f) => Some(&f.source),
            NodeKind::Directory(_) => None,
        }
    }

    /// The previous-session file shadowed by `id`, if any.
    #[must_use]
    pub fn replaced_previous_session(&self, id: ItemId) -> Option<&FileItem> {
        match &self.node(id)?.kind {
            NodeKind::File(f) => f.replaced_previous_session.as_deref(),
            NodeKind::Directory(_) => None,
        }
    }

    /// Finds a direct child of `dir` by exact (case-sensitive) name.
    #[must_use]
    pub fn find_by_name(&self, dir: ItemId, name: &str) -> Option<ItemId> {
        self.dir(dir)
            .ok()?
            .children
            .iter()
            .copied()
            .find(|&child| self.name(child) == Some(name))
    }

    /// Resolves a slash separated path relative to `dir`.
    ///
    /// Leading, trailing and repeated slashes are ignored; an empty path is
    /// `dir` itself. Fails if an intermediate segment is not a directory.
    #[must_use]
    pub fn find_by_path(&self, dir: ItemId, path: &str) -> Option<ItemId> {
        self.node(dir)?;
        path.split('/')
            .filter(|segment| !segment.is_empty())
            .try_fold(dir, |current, segment| self.find_by_name(current, segment))
    }

    /// Absolute slash path of an item; the root is `/`.
    #[must_use]
    pub fn path_of(&self, id: ItemId) -> Option<String> {
        self.node(id)?;
        let mut segments = Vec::new();
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            segments.push(self.name(current)?);
            current = parent;
        }
        segments.reverse();
        Some(format!("/{}", segments.join("/")))
    }

    /// True when `item` is `ancestor` or lies somewhere below it.
    #[must_use]
    pub fn is_within(&self, item: ItemId, ancestor: ItemId) -> bool {
        let mut current = Some(item);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// Depth-first pre-order walk starting at (and including) `from`.
    #[must_use]
    pub fn walk(&self, from: ItemId) -> Walk<'_> {
        Walk::new(self, from)
    }

    /// Whether `id` may be removed under `policy`.
    ///
    /// A directory is removable only if every file and directory below it is;
    /// the check stops at the first item that is not. The root never is.
    pub fn is_removable(&self, id: ItemId, policy: &dyn RemovalPolicy) -> bool {
        if id == self.root {
            return false;
        }
        self.subtree_removable(id, policy)
    }

    fn subtree_removable(&self, id: ItemId, policy: &dyn RemovalPolicy) -> bool {
        let Some(node) = self.node(id) else {
            return false;
        };
        match &node.kind {
            NodeKind::File(f) => policy.is_removable(&FileView {
                name: &node.name,
                length: f.length,
                source: &f.source,
            }),
            NodeKind::Directory(d) => d
                .children
                .iter()
                .all(|&child| self.subtree_removable(child, policy)),
        }
    }

    /// Whether `id` is, or contains, a file imported from a previous session.
    #[must_use]
    pub fn is_from_previous_session(&self, id: ItemId) -> bool {
        let Some(node) = self.node(id) else {
            return false;
        };
        match &node.kind {
            NodeKind::File(f) => f.source.is_previous_session(),
            NodeKind::Directory(d) => d
                .children
                .iter()
                .any(|&child| self.is_from_previous_session(child)),
        }
    }

    // ---- Mutation ----

    /// Inserts a detached item into directory `into`.
    ///
    /// The whole subtree is validated (names, sibling uniqueness) before the
    /// tree is touched. With [`InsertMode::Replace`] a clashing sibling is
    /// detached and returned in [`Insertion::replaced`]; when a file replaces
    /// a previous-session file, the old file is kept on the new item instead
    /// and comes back when the new item is removed.
    pub fn insert(
        &mut self,
        item: impl Into<ContentItem>,
        into: ItemId,
        mode: InsertMode,
    ) -> Result<Insertion, TreeError> {
        let mut item = item.into();
        validate_detached(&item)?;
        self.dir(into)?;

        let mut replaced = None;
        if let Some(existing) = self.find_by_name(into, item.name()) {
            if mode == InsertMode::Reject {
                return Err(TreeError::DuplicateName(item.name().to_string()));
            }
            let shadows_previous = matches!(
                (&item, self.source(existing)),
                (ContentItem::File(_), Some(ItemSource::PreviousSession))
            );
            let old = self.detach(existing, false)?;
            match (old, &mut item) {
                (ContentItem::File(old), ContentItem::File(new)) if shadows_previous => {
                    debug!("'{}' replaces a previous-session file", new.name);
                    new.replaced_previous_session = Some(Box::new(old));
                }
                (old, _) => replaced = Some(old),
            }
        }

        let id = self.materialize(item, into);
        let contribution = self.node(id).map(Node::contribution).unwrap_or_default();
        if let Ok(dir) = self.dir_mut(into) {
            dir.children.push(id);
        }
        self.propagate_add(into, contribution);

        Ok(Insertion { id, replaced })
    }

    /// Convenience wrapper inserting a file; fails on a name clash.
    pub fn add_file(
        &mut self,
        into: ItemId,
        name: impl Into<String>,
        length: u64,
        source: ItemSource,
    ) -> Result<ItemId, TreeError> {
        self.insert(FileItem::new(name, length, source), into, InsertMode::Reject)
            .map(|insertion| insertion.id)
    }

    /// Convenience wrapper creating an empty directory; fails on a name clash.
    pub fn add_directory(
        &mut self,
        into: ItemId,
        name: impl Into<String>,
    ) -> Result<ItemId, TreeError> {
        self.insert(DirectoryItem::new(name), into, InsertMode::Reject)
            .map(|insertion| insertion.id)
    }

    /// Detaches `id` from its parent and hands the subtree back.
    ///
    /// If the removed file shadowed a previous-session file, that file is
    /// put back into the directory.
    pub fn remove(&mut self, id: ItemId) -> Result<ContentItem, TreeError> {
        self.detach(id, true)
    }

    /// Removes `id` only if `policy` allows it.
    pub fn remove_checked(
        &mut self,
        id: ItemId,
        policy: &dyn RemovalPolicy,
    ) -> Result<ContentItem, TreeError> {
        self.node(id).ok_or(TreeError::UnknownItem)?;
        if !self.is_removable(id, policy) {
            return Err(TreeError::NotRemovable);
        }
        self.remove(id)
    }

    /// Moves `id` into directory `into`, keeping its id and subtree.
    ///
    /// Fails with [`TreeError::Cycle`] when `into` is `id` or lies below it,
    /// and with [`TreeError::ReplacesAncestor`] when the sibling a replacing
    /// move would displace contains `id`.
    /// Aggregates are adjusted with the subtree's cached totals, so the cost
    /// is O(depth) regardless of subtree size. Returns the sibling displaced
    /// under [`InsertMode::Replace`].
    pub fn move_item(
        &mut self,
        id: ItemId,
        into: ItemId,
        mode: InsertMode,
    ) -> Result<Option<ContentItem>, TreeError> {
        if id == self.root {
            return Err(TreeError::RootImmutable);
        }
        let name = self.name(id).ok_or(TreeError::UnknownItem)?.to_string();
        self.dir(into)?;
        if self.is_within(into, id) {
            return Err(TreeError::Cycle);
        }
        let old_parent = self.parent(id).ok_or(TreeError::UnknownItem)?;
        if old_parent == into {
            return Ok(None);
        }

        let existing = self.find_by_name(into, &name);
        if let Some(existing) = existing {
            if mode == InsertMode::Reject {
                return Err(TreeError::DuplicateName(name));
            }
            if self.is_within(id, existing) {
                return Err(TreeError::ReplacesAncestor(name));
            }
        }

        let replaced = match existing {
            Some(existing) => Some(self.detach(existing, false)?),
            None => None,
        };

        self.unlink(id, true);
        let contribution = self.node(id).map(Node::contribution).unwrap_or_default();
        if let Some(node) = self.node_mut(id) {
            node.parent = Some(into);
        }
        if let Ok(dir) = self.dir_mut(into) {
            dir.children.push(id);
        }
        self.propagate_add(into, contribution);

        Ok(replaced)
    }

    /// Renames an item; the new name must be unique among its siblings.
    pub fn rename(&mut self, id: ItemId, new_name: impl Into<String>) -> Result<(), TreeError> {
        let new_name = new_name.into();
        validate_name(&new_name)?;
        self.node(id).ok_or(TreeError::UnknownItem)?;
        if let Some(parent) = self.parent(id) {
            if let Some(existing) = self.find_by_name(parent, &new_name) {
                if existing != id {
                    return Err(TreeError::DuplicateName(new_name));
                }
            }
        }
        if let Some(node) = self.node_mut(id) {
            node.name = new_name;
        }
        Ok(())
    }

    /// Removes an item and drops its subtree.
    pub fn destroy(&mut self, id: ItemId) -> Result<(), TreeError> {
        self.remove(id).map(drop)
    }

    /// Unlinks `id` from its parent and subtracts its totals. Restores a
    /// shadowed previous-session file when `restore` is set.
    fn unlink(&mut self, id: ItemId, restore: bool) {
        let Some(parent) = self.parent(id) else { return };
        let contribution = self.node(id).map(Node::contribution).unwrap_or_default();
        self.propagate_sub(parent, contribution);
        if let Ok(dir) = self.dir_mut(parent) {
            dir.children.retain(|&child| child != id);
        }
        if let Some(node) = self.node_mut(id) {
            node.parent = None;
        }

        if restore {
            let shadowed = match self.node_mut(id).map(|n| &mut n.kind) {
                Some(NodeKind::File(f)) => f.replaced_previous_session.take(),
                _ => None,
            };
            if let Some(old) = shadowed {
                if self.find_by_name(parent, &old.name).is_some() {
                    warn!(
                        "Dropping previous-session file '{}': name is taken",
                        old.name
                    );
                } else {
                    debug!("Restoring previous-session file '{}'", old.name);
                    let restored = self.materialize(ContentItem::File(*old), parent);
                    let contribution = self
                        .node(restored)
                        .map(Node::contribution)
                        .unwrap_or_default();
                    if let Ok(dir) = self.dir_mut(parent) {
                        dir.children.push(restored);
                    }
                    self.propagate_add(parent, contribution);
                }
            }
        }
    }

    fn detach(&mut self, id: ItemId, restore: bool) -> Result<ContentItem, TreeError> {
        if id == self.root {
            return Err(TreeError::RootImmutable);
        }
        self.node(id).ok_or(TreeError::UnknownItem)?;
        self.unlink(id, restore);
        self.extract(id).ok_or(TreeError::UnknownItem)
    }

    /// Allocates nodes for a validated detached subtree under `parent`,
    /// computing directory totals bottom-up. Does not link into `parent`.
    fn materialize(&mut self, item: ContentItem, parent: ItemId) -> ItemId {
        match item {
            ContentItem::File(file) => self.alloc(Node {
                name: file.name,
                parent: Some(parent),
                kind: NodeKind::File(FileData {
                    length: file.length,
                    source: file.source,
                    replaced_previous_session: file.replaced_previous_session,
                }),
            }),
            ContentItem::Directory(dir) => {
                let id = self.alloc(Node {
                    name: dir.name,
                    parent: Some(parent),
                    kind: NodeKind::Directory(DirData::default()),
                });
                let mut data = DirData {
                    children: Vec::with_capacity(dir.children.len()),
                    totals: Totals::default(),
                };
                for child in dir.children {
                    let child_id = self.materialize(child, id);
                    if let Some(node) = self.node(child_id) {
                        let c = node.contribution();
                        data.totals.size += c.size;
                        data.totals.files += c.files;
                        data.totals.dirs += c.dirs;
                    }
                    data.children.push(child_id);
                }
                if let Some(node) = self.node_mut(id) {
                    node.kind = NodeKind::Directory(data);
                }
                id
            }
        }
    }

    /// Frees the nodes of an unlinked subtree and rebuilds the owned form.
    fn extract(&mut self, id: ItemId) -> Option<ContentItem> {
        let node = self.release(id)?;
        Some(match node.kind {
            NodeKind::File(f) => ContentItem::File(FileItem {
                name: node.name,
                length: f.length,
                source: f.source,
                replaced_previous_session: f.replaced_previous_session,
            }),
            NodeKind::Directory(d) => ContentItem::Directory(DirectoryItem {
                name: node.name,
                children: d
                    .children
                    .into_iter()
                    .filter_map(|child| self.extract(child))
                    .collect(),
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str, len: u64) -> FileItem {
        FileItem::synthetic(name, len)
    }

    /// Recomputes totals from scratch for every directory and compares with
    /// the cached values.
    fn assert_consistent(tree: &ContentTree) {
        fn recompute(tree: &ContentTree, id: ItemId) -> Totals {
            let mut totals = Totals::default();
            for &child in tree.children(id) {
                if tree.is_directory(child) {
                    let sub = recompute(tree, child);
                    totals.size += sub.size;
                    totals.files += sub.files;
                    totals.dirs += sub.dirs + 1;
                } else {
                    totals.size += tree.size(child).unwrap();
                    totals.files += 1;
                }
            }
            assert_eq!(tree.total_size(id), Some(totals.size), "size of {:?}", tree.path_of(id));
            assert_eq!(tree.file_count(id), Some(totals.files));
            assert_eq!(tree.directory_count(id), Some(totals.dirs));
            totals
        }
        recompute(tree, tree.root());
    }

    #[test]
    fn test_two_files_into_root() {
        let mut tree = ContentTree::new("root");
        let root = tree.root();
        tree.insert(file("a.txt", 100), root, InsertMode::Reject).unwrap();
        tree.insert(file("b.txt", 200), root, InsertMode::Reject).unwrap();

        assert_eq!(tree.total_size(root), Some(300));
        assert_eq!(tree.file_count(root), Some(2));
        assert_eq!(tree.directory_count(root), Some(0));
        assert_consistent(&tree);
    }

    #[test]
    fn test_nested_insert_propagates_to_every_ancestor() {
        let mut tree = ContentTree::new("root");
        let root = tree.root();
        let a = tree.add_directory(root, "a").unwrap();
        let b = tree.add_directory(a, "b").unwrap();
        tree.add_file(b, "deep.bin", 4096, ItemSource::Synthetic).unwrap();

        assert_eq!(tree.total_size(b), Some(4096));
        assert_eq!(tree.total_size(a), Some(4096));
        assert_eq!(tree.total_size(root), Some(4096));
        assert_eq!(tree.directory_count(root), Some(2));
        assert_eq!(tree.directory_count(a), Some(1));
        assert_consistent(&tree);
    }

    #[test]
    fn test_duplicate_name_is_rejected_and_tree_unchanged() {
        let mut tree = ContentTree::new("root");
        let root = tree.root();
        tree.add_file(root, "a.txt", 10, ItemSource::Synthetic).unwrap();

        let err = tree
            .insert(file("a.txt", 99), root, InsertMode::Reject)
            .unwrap_err();
        assert_eq!(err, TreeError::DuplicateName("a.txt".to_string()));
        assert_eq!(tree.total_size(root), Some(10));
        assert_eq!(tree.children(root).len(), 1);
    }

    #[test]
    fn test_names_are_case_sensitive() {
        let mut tree = ContentTree::new("root");
        let root = tree.root();
        tree.add_file(root, "README", 1, ItemSource::Synthetic).unwrap();
        tree.add_file(root, "readme", 2, ItemSource::Synthetic).unwrap();
        assert_eq!(tree.file_count(root), Some(2));
    }

    #[test]
    fn test_replace_returns_previous_item() {
        let mut tree = ContentTree::new("root");
        let root = tree.root();
        tree.add_file(root, "a.txt", 10, ItemSource::Synthetic).unwrap();

        let insertion = tree
            .insert(file("a.txt", 25), root, InsertMode::Replace)
            .unwrap();
        let replaced = insertion.replaced.expect("old item returned");
        assert_eq!(replaced, ContentItem::File(file("a.txt", 10)));
        assert_eq!(tree.total_size(root), Some(25));
        assert_eq!(tree.file_count(root), Some(1));
        assert_consistent(&tree);
    }

    #[test]
    fn test_replace_directory_with_file_updates_counts() {
        let mut tree = ContentTree::new("root");
        let root = tree.root();
        let dir = tree.add_directory(root, "x").unwrap();
        tree.add_file(dir, "1", 5, ItemSource::Synthetic).unwrap();
        tree.add_file(dir, "2", 6, ItemSource::Synthetic).unwrap();

        let insertion = tree.insert(file("x", 1), root, InsertMode::Replace).unwrap();
        assert!(insertion.replaced.unwrap().is_directory());
        assert_eq!(tree.total_size(root), Some(1));
        assert_eq!(tree.directory_count(root), Some(0));
        assert_consistent(&tree);
    }

    #[test]
    fn test_invalid_detached_subtree_is_rejected_before_mutation() {
        let mut tree = ContentTree::new("root");
        let root = tree.root();
        let bad = DirectoryItem::new("dir")
            .with_child(file("same", 1))
            .with_child(file("same", 2));
        assert_eq!(
            tree.insert(bad, root, InsertMode::Reject).unwrap_err(),
            TreeError::DuplicateName("same".to_string())
        );
        assert!(tree.is_empty());

        assert!(matches!(
            tree.insert(file("a/b", 1), root, InsertMode::Reject),
            Err(TreeError::InvalidName(_))
        ));
        assert!(matches!(
            tree.insert(file("", 1), root, InsertMode::Reject),
            Err(TreeError::InvalidName(_))
        ));
    }

    #[test]
    fn test_insert_into_file_fails() {
        let mut tree = ContentTree::new("root");
        let root = tree.root();
        let f = tree.add_file(root, "f", 1, ItemSource::Synthetic).unwrap();
        assert_eq!(
            tree.insert(file("g", 1), f, InsertMode::Reject).unwrap_err(),
            TreeError::NotADirectory
        );
    }

    #[test]
    fn test_remove_returns_subtree_and_updates_aggregates() {
        let mut tree = ContentTree::new("root");
        let root = tree.root();
        let docs = tree.add_directory(root, "docs").unwrap();
        tree.add_file(docs, "a", 100, ItemSource::Synthetic).unwrap();
        let sub = tree.add_directory(docs, "sub").unwrap();
        tree.add_file(sub, "b", 50, ItemSource::Synthetic).unwrap();
        tree.add_file(root, "top", 7, ItemSource::Synthetic).unwrap();

        let removed = tree.remove(docs).unwrap();
        assert_eq!(removed.total_size(), 150);
        assert_eq!(removed.file_count(), 2);
        assert_eq!(removed.directory_count(), 1);
        assert!(!tree.contains(docs));
        assert!(!tree.contains(sub));
        assert_eq!(tree.total_size(root), Some(7));
        assert_eq!(tree.directory_count(root), Some(0));
        assert_eq!(tree.len(), 2);
        assert_consistent(&tree);

        // The removed subtree can be reused elsewhere.
        let other = tree.add_directory(root, "other").unwrap();
        let again = tree.insert(removed, other, InsertMode::Reject).unwrap();
        assert_eq!(tree.total_size(again.id), Some(150));
        assert_eq!(tree.total_size(root), Some(157));
        assert_consistent(&tree);
    }

    #[test]
    fn test_stale_ids_are_rejected() {
        let mut tree = ContentTree::new("root");
        let root = tree.root();
        let a = tree.add_file(root, "a", 1, ItemSource::Synthetic).unwrap();
        tree.destroy(a).unwrap();
        let b = tree.add_file(root, "b", 2, ItemSource::Synthetic).unwrap();
        assert_ne!(a, b);
        assert!(!tree.contains(a));
        assert_eq!(tree.remove(a).unwrap_err(), TreeError::UnknownItem);
        assert_eq!(tree.name(b), Some("b"));
    }

    #[test]
    fn test_root_is_immutable() {
        let mut tree = ContentTree::new("root");
        let root = tree.root();
        let dir = tree.add_directory(root, "d").unwrap();
        assert_eq!(tree.remove(root).unwrap_err(), TreeError::RootImmutable);
        assert_eq!(
            tree.move_item(root, dir, InsertMode::Reject).unwrap_err(),
            TreeError::RootImmutable
        );
        assert!(!tree.is_removable(root, &AllRemovable));
    }

    #[test]
    fn test_move_into_own_descendant_is_a_cycle() {
        let mut tree = ContentTree::new("root");
        let root = tree.root();
        let a = tree.add_directory(root, "a").unwrap();
        let b = tree.add_directory(a, "b").unwrap();
        let c = tree.add_directory(b, "c").unwrap();
        tree.add_file(c, "f", 9, ItemSource::Synthetic).unwrap();

        assert_eq!(tree.move_item(a, c, InsertMode::Reject).unwrap_err(), TreeError::Cycle);
        assert_eq!(tree.move_item(a, a, InsertMode::Reject).unwrap_err(), TreeError::Cycle);
        assert_eq!(tree.parent(a), Some(root));
        assert_eq!(tree.parent(c), Some(b));
        assert_eq!(tree.total_size(root), Some(9));
        assert_consistent(&tree);
    }

    #[test]
    fn test_move_reparents_with_cached_totals() {
        let mut tree = ContentTree::new("root");
        let root = tree.root();
        let src = tree.add_directory(root, "src").unwrap();
        let dst = tree.add_directory(root, "dst").unwrap();
        let payload = tree.add_directory(src, "payload").unwrap();
        tree.add_file(payload, "x", 30, ItemSource::Synthetic).unwrap();
        tree.add_file(payload, "y", 12, ItemSource::Synthetic).unwrap();

        assert!(tree.move_item(payload, dst, InsertMode::Reject).unwrap().is_none());
        assert_eq!(tree.parent(payload), Some(dst));
        assert_eq!(tree.total_size(src), Some(0));
        assert_eq!(tree.total_size(dst), Some(42));
        assert_eq!(tree.directory_count(dst), Some(1));
        assert_eq!(tree.total_size(root), Some(42));
        assert_eq!(tree.path_of(payload).as_deref(), Some("/dst/payload"));
        assert_consistent(&tree);
    }

    #[test]
    fn test_move_with_name_clash() {
        let mut tree = ContentTree::new("root");
        let root = tree.root();
        let d = tree.add_directory(root, "d").unwrap();
        let f = tree.add_file(root, "f", 3, ItemSource::Synthetic).unwrap();
        tree.add_file(d, "f", 4, ItemSource::Synthetic).unwrap();

        assert_eq!(
            tree.move_item(f, d, InsertMode::Reject).unwrap_err(),
            TreeError::DuplicateName("f".to_string())
        );
        let replaced = tree.move_item(f, d, InsertMode::Replace).unwrap().unwrap();
        assert_eq!(replaced.total_size(), 4);
        assert_eq!(tree.total_size(d), Some(3));
        assert_eq!(tree.total_size(root), Some(3));
        assert_consistent(&tree);
    }

    #[test]
    fn test_replacing_move_cannot_displace_own_ancestor() {
        let mut tree = ContentTree::new("root");
        let root = tree.root();
        let outer = tree.add_directory(root, "d").unwrap();
        let sub = tree.add_directory(outer, "sub").unwrap();
        let inner = tree.add_directory(sub, "d").unwrap();
        tree.add_file(inner, "payload", 42, ItemSource::Synthetic).unwrap();

        assert_eq!(
            tree.move_item(inner, root, InsertMode::Replace).unwrap_err(),
            TreeError::ReplacesAncestor("d".to_string())
        );
        assert_eq!(tree.parent(inner), Some(sub));
        assert_eq!(tree.parent(outer), Some(root));
        assert_eq!(tree.children(root), &[outer]);
        assert!(tree.find_by_path(root, "d/sub/d/payload").is_some());
        assert_eq!(tree.total_size(root), Some(42));
        assert_eq!(tree.file_count(root), Some(1));
        assert_eq!(tree.directory_count(root), Some(3));
        assert_consistent(&tree);

        // A clash with an unrelated sibling is still replaced.
        tree.add_file(root, "y", 5, ItemSource::Synthetic).unwrap();
        let moved = tree.add_file(sub, "y", 7, ItemSource::Synthetic).unwrap();
        let replaced = tree.move_item(moved, root, InsertMode::Replace).unwrap().unwrap();
        assert_eq!(replaced.total_size(), 5);
        assert_eq!(tree.parent(moved), Some(root));
        assert_eq!(tree.total_size(root), Some(49));
        assert_consistent(&tree);
    }

    #[test]
    fn test_find_by_path() {
        let mut tree = ContentTree::new("root");
        let root = tree.root();
        let a = tree.add_directory(root, "a").unwrap();
        let b = tree.add_directory(a, "b").unwrap();
        let f = tree.add_file(b, "file.iso", 1, ItemSource::Synthetic).unwrap();
        let g = tree.add_file(a, "g", 1, ItemSource::Synthetic).unwrap();

        assert_eq!(tree.find_by_path(root, "a/b/file.iso"), Some(f));
        assert_eq!(tree.find_by_path(root, "/a/b/file.iso"), Some(f));
        assert_eq!(tree.find_by_path(root, "a//b/"), Some(b));
        assert_eq!(tree.find_by_path(root, ""), Some(root));
        assert_eq!(tree.find_by_path(root, "/"), Some(root));
        assert_eq!(tree.find_by_path(a, "b"), Some(b));
        assert_eq!(tree.find_by_path(root, "a/g/x"), None);
        assert_eq!(tree.find_by_path(root, "a/missing"), None);
        assert_eq!(tree.find_by_path(root, "a/g"), Some(g));
        assert_eq!(tree.find_by_name(root, "b"), None);
    }

    #[test]
    fn test_rename_checks_siblings() {
        let mut tree = ContentTree::new("root");
        let root = tree.root();
        let a = tree.add_file(root, "a", 1, ItemSource::Synthetic).unwrap();
        tree.add_file(root, "b", 1, ItemSource::Synthetic).unwrap();

        assert_eq!(
            tree.rename(a, "b").unwrap_err(),
            TreeError::DuplicateName("b".to_string())
        );
        tree.rename(a, "a").unwrap();
        tree.rename(a, "c").unwrap();
        assert_eq!(tree.find_by_name(root, "c"), Some(a));
    }

    #[test]
    fn test_removability_follows_policy() {
        let mut tree = ContentTree::new("root");
        let root = tree.root();
        let dir = tree.add_directory(root, "dir").unwrap();
        let local = tree
            .add_file(dir, "new.txt", 1, ItemSource::Local("/tmp/new.txt".into()))
            .unwrap();
        let old = tree
            .add_file(dir, "old.txt", 1, ItemSource::PreviousSession)
            .unwrap();

        let policy = PreviousSessionPolicy;
        assert!(tree.is_removable(local, &policy));
        assert!(!tree.is_removable(old, &policy));
        assert!(!tree.is_removable(dir, &policy));
        assert!(tree.is_removable(dir, &AllRemovable));
        assert!(tree.is_from_previous_session(dir));
        assert_eq!(
            tree.remove_checked(dir, &policy).unwrap_err(),
            TreeError::NotRemovable
        );

        let only_small = |f: &FileView<'_>| f.length < 10;
        assert!(tree.is_removable(dir, &only_small));
    }

    #[test]
    fn test_previous_session_file_is_restored_after_replacement_removed() {
        let mut tree = ContentTree::new("root");
        let root = tree.root();
        tree.add_file(root, "data.bin", 500, ItemSource::PreviousSession)
            .unwrap();

        let insertion = tree
            .insert(file("data.bin", 800), root, InsertMode::Replace)
            .unwrap();
        assert!(insertion.replaced.is_none());
        assert_eq!(tree.total_size(root), Some(800));
        assert_eq!(tree.file_count(root), Some(1));
        assert_eq!(
            tree.replaced_previous_session(insertion.id).map(|f| f.length),
            Some(500)
        );

        let removed = tree.remove(insertion.id).unwrap();
        let ContentItem::File(removed) = removed else {
            panic!("expected a file");
        };
        assert!(removed.replaced_previous_session().is_none());

        let restored = tree.find_by_name(root, "data.bin").expect("restored");
        assert_eq!(tree.source(restored), Some(&ItemSource::PreviousSession));
        assert_eq!(tree.total_size(root), Some(500));
        assert_consistent(&tree);
    }
}

//! Owned content items.
//!
//! These are the detached form of the content tree: a caller builds a
//! [`ContentItem`] (or receives one back from [`ContentTree::remove`]) and
//! owns it outright until it is inserted into a tree.
//!
//! [`ContentTree::remove`]: super::ContentTree::remove

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Where a file's data comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemSource {
    /// A file on the local filesystem.
    Local(PathBuf),
    /// Data generated at write time (boot catalogs, padding, ...).
    Synthetic,
    /// A file already present on the medium from an earlier session.
    PreviousSession,
    /// A local symbolic link, recorded as the link itself.
    Link { path: PathBuf, target: PathBuf },
}

impl ItemSource {
    #[must_use]
    pub fn is_previous_session(&self) -> bool {
        matches!(self, ItemSource::PreviousSession)
    }
}

/// How [`ContentTree::insert`](super::ContentTree::insert) treats a sibling
/// with the same name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InsertMode {
    /// Fail with [`TreeError::DuplicateName`](crate::error::TreeError::DuplicateName).
    #[default]
    Reject,
    /// Detach the existing sibling first and hand it back to the caller.
    Replace,
}

/// A file with a fixed byte length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileItem {
    pub name: String,
    pub length: u64,
    pub source: ItemSource,
    /// Previous-session file this item shadows; restored when this item is
    /// taken out of its directory.
    pub(crate) replaced_previous_session: Option<Box<FileItem>>,
}

impl FileItem {
    pub fn new(name: impl Into<String>, length: u64, source: ItemSource) -> Self {
        Self {
            name: name.into(),
            length,
            source,
            replaced_previous_session: None,
        }
    }

    /// A file with generated content and no local backing file.
    pub fn synthetic(name: impl Into<String>, length: u64) -> Self {
        Self::new(name, length, ItemSource::Synthetic)
    }

    /// The previous-session file this item currently shadows, if any.
    #[must_use]
    pub fn replaced_previous_session(&self) -> Option<&FileItem> {
        self.replaced_previous_session.as_deref()
    }
}

/// A directory and its owned children, in insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DirectoryItem {
    pub name: String,
    pub children: Vec<ContentItem>,
}

impl DirectoryItem {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            children: Vec::new(),
        }
    }

    /// Appends a child and returns the directory, for building literals.
    #[must_use]
    pub fn with_child(mut self, child: impl Into<ContentItem>) -> Self {
        self.children.push(child.into());
        self
    }
}

/// A file or a directory subtree not attached to any tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentItem {
    File(FileItem),
    Directory(DirectoryItem),
}

impl From<FileItem> for ContentItem {
    fn from(file: FileItem) -> Self {
        ContentItem::File(file)
    }
}

impl From<DirectoryItem> for ContentItem {
    fn from(dir: DirectoryItem) -> Self {
        ContentItem::Directory(dir)
    }
}

impl ContentItem {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            ContentItem::File(f) => &f.name,
            ContentItem::Directory(d) => &d.name,
        }
    }

    #[must_use]
    pub fn is_directory(&self) -> bool {
        matches!(self, ContentItem::Directory(_))
    }

    /// Sum of all file lengths in this subtree. Walks the whole subtree.
    #[must_use]
    pub fn total_size(&self) -> u64 {
        match self {
            ContentItem::File(f) => f.length,
            ContentItem::Directory(d) => d.children.iter().map(ContentItem::total_size).sum(),
        }
    }

    /// Number of files in this subtree (1 for a file).
    #[must_use]
    pub fn file_count(&self) -> u64 {
        match self {
            ContentItem::File(_) => 1,
            ContentItem::Directory(d) => d.children.iter().map(ContentItem::file_count).sum(),
        }
    }

    /// Number of directories below this item, not counting the item itself.
    #[must_use]
    pub fn directory_count(&self) -> u64 {
        match self {
            ContentItem::File(_) => 0,
            ContentItem::Directory(d) => d
                .children
                .iter()
                .map(|c| c.directory_count() + u64::from(c.is_directory()))
                .sum(),
        }
    }

    /// Name an item built from `path` gets: its last component, resolved
    /// through the filesystem for `.` and `..`. `None` for a filesystem
    /// root.
    #[must_use]
    pub fn local_name(path: &Path) -> Option<String> {
        let resolved;
        let path = if path.file_name().is_some() {
            path
        } else {
            resolved = fs::canonicalize(path).ok()?;
            resolved.as_path()
        };
        path.file_name().map(|n| n.to_string_lossy().into_owned())
    }

    /// Builds an item from a local path, recursing into directories.
    ///
    /// Children are sorted by name. Entries that cannot be read are skipped
    /// with a warning rather than failing the whole scan; only an unreadable
    /// `path` itself is an error. Symbolic links are never followed: each
    /// becomes an empty file item with an [`ItemSource::Link`] source.
    pub fn from_path(path: &Path) -> CoreResult<ContentItem> {
        let name = ContentItem::local_name(path).ok_or_else(|| {
            CoreError::InvalidParameters(format!("'{}' has no file name", path.display()))
        })?;
        ContentItem::from_path_named(path, name)
    }

    /// Like [`ContentItem::from_path`] with an explicit name for the top item.
    pub fn from_path_named(path: &Path, name: impl Into<String>) -> CoreResult<ContentItem> {
        let name = name.into();
        let metadata = fs::symlink_metadata(path)?;

        if metadata.file_type().is_symlink() {
            let target = fs::read_link(path)?;
            debug!("Keeping link {} -> {}", path.display(), target.display());
            return Ok(ContentItem::File(FileItem::new(
                name,
                0,
                ItemSource::Link {
                    path: path.to_path_buf(),
                    target,
                },
            )));
        }

        if !metadata.is_dir() {
            return Ok(ContentItem::File(FileItem::new(
                name,
                metadata.len(),
                ItemSource::Local(path.to_path_buf()),
            )));
        }

        let mut entries: Vec<PathBuf> = fs::read_dir(path)?
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry.path()),
                Err(e) => {
                    warn!("Skipping unreadable entry in {}: {e}", path.display());
                    None
                }
            })
            .collect();
        entries.sort();

        let mut dir = DirectoryItem::new(name);
        for entry in entries {
            match ContentItem::from_path(&entry) {
                Ok(child) => dir.children.push(child),
                Err(e) => warn!("Skipping {}: {e}", entry.display()),
            }
        }
        Ok(ContentItem::Directory(dir))
    }
}

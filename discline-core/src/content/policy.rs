//! Per-file removability decisions.

use super::item::ItemSource;

/// Read-only view of a file handed to a [`RemovalPolicy`].
#[derive(Debug, Clone, Copy)]
pub struct FileView<'a> {
    pub name: &'a str,
    pub length: u64,
    pub source: &'a ItemSource,
}

/// Decides whether an individual file may be removed from a tree.
///
/// Directories are never asked directly: a directory is removable when every
/// file below it is.
pub trait RemovalPolicy {
    fn is_removable(&self, file: &FileView<'_>) -> bool;
}

/// Files imported from a previous session stay on the medium.
#[derive(Debug, Clone, Copy, Default)]
pub struct PreviousSessionPolicy;

impl RemovalPolicy for PreviousSessionPolicy {
    fn is_removable(&self, file: &FileView<'_>) -> bool {
        !file.source.is_previous_session()
    }
}

/// Every file may be removed.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllRemovable;

impl RemovalPolicy for AllRemovable {
    fn is_removable(&self, _file: &FileView<'_>) -> bool {
        true
    }
}

impl<F> RemovalPolicy for F
where
    F: Fn(&FileView<'_>) -> bool,
{
    fn is_removable(&self, file: &FileView<'_>) -> bool {
        self(file)
    }
}

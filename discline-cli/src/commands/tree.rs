//! Implementation of the 'tree' subcommand.
//!
//! Builds a content tree from local files and directories and reports what
//! the resulting project would occupy.

use console::Term;
use discline_core::utils::sectors_for_bytes;
use discline_core::{ContentItem, ContentTree, InsertMode, ItemSource, format_bytes};
use log::debug;
use serde_json::json;

use crate::cli::TreeArgs;
use crate::error::{CliErrorContext, CliResult};
use crate::terminal;

/// Creates a tree with one top-level entry per path.
pub fn build_tree(args: &TreeArgs) -> CliResult<ContentTree> {
    let mut tree = ContentTree::new(args.name.clone());
    let root = tree.root();
    for path in &args.paths {
        // A filesystem root has no name of its own.
        let name = ContentItem::local_name(path).unwrap_or_else(|| args.name.clone());
        let item = ContentItem::from_path_named(path, name)
            .cli_with_context(|| format!("Cannot read '{}'", path.display()))?;
        debug!(
            "Adding {} ({} files, {})",
            path.display(),
            item.file_count(),
            format_bytes(item.total_size())
        );
        tree.insert(item, root, InsertMode::Reject)
            .cli_with_context(|| format!("Cannot add '{}'", path.display()))?;
    }
    Ok(tree)
}

/// Prints totals, and with `--list` every entry in traversal order.
pub fn run_tree(args: TreeArgs) -> CliResult<()> {
    let tree = build_tree(&args)?;
    let root = tree.root();
    let size = tree.total_size(root).unwrap_or(0);
    let files = tree.file_count(root).unwrap_or(0);
    let directories = tree.directory_count(root).unwrap_or(0);

    let term = Term::stdout();
    if args.json {
        let totals = json!({
            "name": args.name,
            "size": size,
            "files": files,
            "directories": directories,
            "sectors": sectors_for_bytes(size),
        });
        let _ = term.write_line(&totals.to_string());
        return Ok(());
    }

    if args.list {
        terminal::print_section(&term, "Contents");
        for entry in tree.walk(root).skip(1) {
            let name = tree.name(entry.id).unwrap_or_default();
            let line = if tree.is_directory(entry.id) {
                format!("{name}/")
            } else if let Some(ItemSource::Link { target, .. }) = tree.source(entry.id) {
                format!("{name} -> {}", target.display())
            } else {
                format!("{name} ({})", format_bytes(tree.size(entry.id).unwrap_or(0)))
            };
            let _ = term.write_line(&format!("{}{line}", "  ".repeat(entry.depth)));
        }
    }

    terminal::print_section(&term, "Project");
    terminal::print_status(&term, "Files", &files.to_string(), false);
    terminal::print_status(&term, "Directories", &directories.to_string(), false);
    terminal::print_status(&term, "Total size", &format_bytes(size), true);
    terminal::print_status(&term, "Sectors", &sectors_for_bytes(size).to_string(), false);
    Ok(())
}

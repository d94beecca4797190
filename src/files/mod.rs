//! Filesystem side of serving: the sandboxed root, path resolution and
//! directory listings.

pub mod listing;
pub mod resolver;

use std::path::Path;

pub use resolver::{NotFoundReason, Resolution, ServedRoot};

/// One directory entry as seen by the listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub name: String,
    pub is_dir: bool,
}

/// Entries of `path`, sorted by name. Names that are not valid UTF-8 and
/// entries whose target cannot be stat'ed (e.g. dangling symlinks) are
/// skipped.
pub async fn list_directory(path: &Path) -> std::io::Result<Vec<Entry>> {
    let mut dir = tokio::fs::read_dir(path).await?;
    let mut entries = Vec::new();

    while let Some(entry) = dir.next_entry().await? {
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        // Follow symlinks so a linked directory lists as a directory
        let Ok(metadata) = tokio::fs::metadata(entry.path()).await else {
            continue;
        };
        entries.push(Entry {
            name,
            is_dir: metadata.is_dir(),
        });
    }

    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(entries)
}

pub async fn read_file(path: &Path) -> std::io::Result<Vec<u8>> {
    tokio::fs::read(path).await
}

//! Maps request targets onto the served directory.
//!
//! Paths are normalized lexically, so `..` cannot climb above the root, but a
//! symlink inside the root that points elsewhere is followed. That gap is
//! known and left open.

use std::path::{Path, PathBuf};

use anyhow::Context;
use path_clean::PathClean;

/// Why a request target did not resolve. All variants look the same on the
/// wire (404); the distinction only shows up in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotFoundReason {
    Missing,
    OutsideRoot,
    ExtensionNotAllowed,
}

impl std::fmt::Display for NotFoundReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotFoundReason::Missing => write!(f, "path does not exist"),
            NotFoundReason::OutsideRoot => write!(f, "path escapes the served root"),
            NotFoundReason::ExtensionNotAllowed => write!(f, "file extension is not allowed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Directory(PathBuf),
    File(PathBuf),
    NotFound(NotFoundReason),
}

/// The directory being served and the file extensions it exposes.
#[derive(Debug, Clone)]
pub struct ServedRoot {
    root: PathBuf,
    allowed_extensions: Vec<String>,
}

impl ServedRoot {
    /// Canonicalizes `root`, which must be an existing directory.
    ///
    /// Extensions are matched as case-insensitive suffixes of the file name,
    /// so they are normally given with their dot (".html").
    pub fn new<I, S>(root: impl AsRef<Path>, allowed_extensions: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let root = root.as_ref();
        let root = std::fs::canonicalize(root)
            .with_context(|| format!("served root {} is not accessible", root.display()))?;

        if !root.is_dir() {
            anyhow::bail!("served root {} is not a directory", root.display());
        }

        Ok(Self {
            root,
            allowed_extensions: allowed_extensions
                .into_iter()
                .map(|e| e.as_ref().to_ascii_lowercase())
                .collect(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn allowed_extensions(&self) -> &[String] {
        &self.allowed_extensions
    }

    /// Whether a file called `name` may be served.
    pub fn allows(&self, name: &str) -> bool {
        let name = name.to_ascii_lowercase();
        self.allowed_extensions.iter().any(|ext| name.ends_with(ext))
    }

    /// Resolves a raw (percent-encoded) request target.
    pub async fn resolve(&self, request_path: &str) -> Resolution {
        let Ok(decoded) = urlencoding::decode(request_path) else {
            return Resolution::NotFound(NotFoundReason::Missing);
        };

        let relative = decoded.trim_start_matches('/');
        let candidate = self.root.join(relative).clean();

        if !candidate.starts_with(&self.root) {
            return Resolution::NotFound(NotFoundReason::OutsideRoot);
        }

        let metadata = match tokio::fs::metadata(&candidate).await {
            Ok(m) => m,
            Err(_) => return Resolution::NotFound(NotFoundReason::Missing),
        };

        if metadata.is_dir() {
            return Resolution::Directory(candidate);
        }

        let allowed = candidate
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| self.allows(n));

        if allowed {
            Resolution::File(candidate)
        } else {
            Resolution::NotFound(NotFoundReason::ExtensionNotAllowed)
        }
    }

    /// Path of `resolved` relative to the root, with `/` separators and no
    /// leading slash. Empty for the root itself.
    pub fn relative(&self, resolved: &Path) -> String {
        resolved
            .strip_prefix(&self.root)
            .map(|rel| {
                rel.components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect::<Vec<_>>()
                    .join("/")
            })
            .unwrap_or_default()
    }
}

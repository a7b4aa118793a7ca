//! Root-anchored path resolution.
//!
//! Every path a client sends is relative to the library root and starts with
//! `/`. This module turns such a path into an absolute one, rejecting any
//! result that would land outside the root, and maps absolute paths back to
//! their root-anchored form.

use std::io;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use tracing::warn;

/// Errors that can occur while resolving paths against the root.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The requested path resolves outside the library root.
    #[error("path is outside the library root: {0}")]
    AccessDenied(PathBuf),

    /// The configured root cannot be used.
    #[error("invalid library root {path}: {source}")]
    InvalidRoot {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Navigation context of a resolved directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    /// Root-anchored path of the directory itself.
    pub current: String,
    /// Root-anchored path of its parent. Equal to `current` when the parent
    /// is not reachable.
    pub parent: String,
    /// Whether the parent is reachable without leaving the root.
    pub can_go_up: bool,
}

/// The library root: an absolute, canonical directory fixed at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryRoot {
    path: PathBuf,
}

impl LibraryRoot {
    /// Canonicalize `path` and use it as the root.
    ///
    /// Fails if the path does not exist or is not a directory.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, ResolveError> {
        let path = path.as_ref();
        let invalid = |source| ResolveError::InvalidRoot {
            path: path.to_path_buf(),
            source,
        };

        let canonical = path.canonicalize().map_err(invalid)?;
        if !canonical.is_dir() {
            return Err(invalid(io::Error::new(
                io::ErrorKind::InvalidInput,
                "not a directory",
            )));
        }

        Ok(Self { path: canonical })
    }

    /// Absolute path of the root.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Resolve a root-anchored path to an absolute path inside the root.
    ///
    /// An absent or empty path is the root itself. One leading `/` is
    /// stripped, the remainder is joined onto the root and `.`/`..` segments
    /// are folded lexically. Containment is checked on the folded result.
    pub fn resolve(&self, requested: Option<&str>) -> Result<PathBuf, ResolveError> {
        let Some(requested) = requested.filter(|r| !r.is_empty()) else {
            return Ok(self.path.clone());
        };

        let relative = requested.strip_prefix('/').unwrap_or(requested);
        let resolved = normalize_lexically(&self.path.join(relative));

        if !resolved.starts_with(&self.path) {
            warn!(
                requested = %requested,
                resolved = %resolved.display(),
                root = %self.path.display(),
                "Rejected path outside library root"
            );
            return Err(ResolveError::AccessDenied(resolved));
        }

        Ok(resolved)
    }

    /// Map an absolute path inside the root back to its root-anchored form.
    ///
    /// The root itself maps to `/`. Separators are always `/`.
    pub fn to_relative(&self, absolute: &Path) -> Result<String, ResolveError> {
        let relative = absolute
            .strip_prefix(&self.path)
            .map_err(|_| ResolveError::AccessDenied(absolute.to_path_buf()))?;

        let parts: Vec<String> = relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy().replace('\\', "/")),
                _ => None,
            })
            .collect();

        if parts.is_empty() {
            return Ok("/".to_string());
        }

        Ok(format!("/{}", parts.join("/")))
    }

    /// Compute the navigation context of a resolved directory.
    pub fn location(&self, current: &Path) -> Result<Location, ResolveError> {
        let current_relative = self.to_relative(current)?;

        let parent = current.parent();
        let can_go_up = current != self.path
            && parent.is_some_and(|p| p.starts_with(&self.path));

        let parent_relative = match parent {
            Some(p) if can_go_up => self.to_relative(p)?,
            _ => current_relative.clone(),
        };

        Ok(Location {
            current: current_relative,
            parent: parent_relative,
            can_go_up,
        })
    }
}

/// Fold `.` and `..` segments without touching the filesystem.
///
/// `..` at the filesystem root stays at the root.
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            Component::Normal(part) => out.push(part),
        }
    }
    out
}

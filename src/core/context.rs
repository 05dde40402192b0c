//! Project context for bosun operations.
//!
//! The context is the project root directory every relative path in the
//! configuration is resolved against. It is threaded explicitly through the
//! service instead of living in process-global state.

use std::path::{Path, PathBuf};

/// The project root and path-resolution helpers.
#[derive(Debug, Clone)]
pub struct ProjectContext {
    root: PathBuf,
}

impl ProjectContext {
    /// Create a context rooted at the given directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        ProjectContext { root: root.into() }
    }

    /// Get the project root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a path against the project root. Absolute paths pass through.
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

}

use crate::error::GuardRejection;
use std::path::{Component, Path, PathBuf};

/// Confines source reads to an authorized root.
#[derive(Debug, Clone)]
pub struct PathGuard {
    root: PathBuf,
}

impl PathGuard {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `candidate` (relative to the root, or absolute) and return its
    /// canonical form if it stays inside the root.
    ///
    /// Traversal segments are refused before the filesystem is touched; a
    /// symlink leading out of the root is caught after canonicalization.
    pub fn check(&self, candidate: &Path) -> Result<PathBuf, GuardRejection> {
        if candidate
            .components()
            .any(|component| matches!(component, Component::ParentDir))
        {
            return Err(GuardRejection::Traversal(display(candidate)));
        }

        let root = self
            .root
            .canonicalize()
            .map_err(|source| GuardRejection::Unresolvable {
                path: display(&self.root),
                source,
            })?;

        let joined = if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            root.join(candidate)
        };
        let canonical = joined
            .canonicalize()
            .map_err(|source| GuardRejection::Unresolvable {
                path: display(candidate),
                source,
            })?;

        if !canonical.starts_with(&root) {
            return Err(GuardRejection::OutsideRoot(display(candidate)));
        }
        Ok(canonical)
    }
}

fn display(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

//! Scratch workspace lifecycle.
//!
//! Every acquisition gets an exclusively owned directory. Ownership is explicit:
//! the caller must `release()` a workspace it is done with; `Drop` only does a
//! best-effort cleanup for abandoned acquisitions.

use crate::Result;
use ohno::IntoAppError;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

const LOG_TARGET: &str = "   acquire";

static WORKSPACE_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Sanitize a string for use as a path component, stripping traversal
/// sequences and characters some filesystems reject.
#[must_use]
pub fn sanitize_path_component(s: &str) -> String {
    let s = s.replace("..", "__");
    s.replace(['/', '\\', ':', '*', '?', '"', '<', '>', '|'], "_")
}

/// The directory under which all scratch workspaces are created.
#[derive(Debug, Clone)]
pub struct WorkspaceRoot {
    root: PathBuf,
}

impl WorkspaceRoot {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root).into_app_err_with(|| format!("unable to create workspace root {}", root.display()))?;
        Ok(Self { root })
    }

    /// Create an exclusive workspace for the named package.
    ///
    /// The suffix combines time, pid, and a process-local counter so concurrent
    /// re-analysis of the same package and case-insensitive filesystems cannot
    /// collide.
    pub fn workspace(&self, name: &str) -> Result<Workspace> {
        let safe_name = sanitize_path_component(name);
        let unique = format!(
            "{}-{}-{}",
            chrono::Utc::now().timestamp_millis(),
            std::process::id(),
            WORKSPACE_COUNTER.fetch_add(1, Ordering::Relaxed),
        );
        let path = self.root.join(format!("{safe_name}-{unique}"));

        std::fs::create_dir(&path).into_app_err_with(|| format!("unable to create workspace {}", path.display()))?;
        log::debug!(target: LOG_TARGET, "Created workspace {}", path.display());

        Ok(Workspace { path, released: false })
    }
}

/// An exclusively owned scratch directory.
#[derive(Debug)]
pub struct Workspace {
    path: PathBuf,
    released: bool,
}

impl Workspace {
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the workspace directory, consuming the workspace.
    pub fn release(mut self) -> Result<()> {
        self.released = true;
        std::fs::remove_dir_all(&self.path)
            .into_app_err_with(|| format!("unable to remove workspace {}", self.path.display()))
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if self.released {
            return;
        }

        if let Err(e) = std::fs::remove_dir_all(&self.path)
            && e.kind() != std::io::ErrorKind::NotFound
        {
            log::warn!(target: LOG_TARGET, "Could not clean up workspace {}: {e}", self.path.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_traversal_and_dangerous_chars() {
        assert_eq!(sanitize_path_component("left-pad"), "left-pad");
        assert_eq!(sanitize_path_component("@scope/name"), "@scope_name");
        assert_eq!(sanitize_path_component("../../etc/passwd"), "______etc_passwd");
    }

    #[test]
    fn workspaces_for_the_same_name_never_collide() {
        let dir = tempfile::tempdir().unwrap();
        let root = WorkspaceRoot::new(dir.path()).unwrap();

        let first = root.workspace("left-pad").unwrap();
        let second = root.workspace("left-pad").unwrap();
        assert_ne!(first.path(), second.path());
        assert!(first.path().is_dir());
        assert!(second.path().is_dir());

        first.release().unwrap();
        second.release().unwrap();
    }

    #[test]
    fn release_removes_the_directory() {
        let dir = tempfile::tempdir().unwrap();
        let root = WorkspaceRoot::new(dir.path()).unwrap();

        let workspace = root.workspace("left-pad").unwrap();
        let path = workspace.path().to_path_buf();
        std::fs::write(path.join("file"), "data").unwrap();

        workspace.release().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn dropped_workspace_is_cleaned_up() {
        let dir = tempfile::tempdir().unwrap();
        let root = WorkspaceRoot::new(dir.path()).unwrap();

        let path = {
            let workspace = root.workspace("left-pad").unwrap();
            workspace.path().to_path_buf()
        };
        assert!(!path.exists());
    }
}

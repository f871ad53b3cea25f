//! `WorkspaceFs` — a sandboxed per-agent filesystem rooted at an isolated
//! directory, grounded in the teacher's `AgentWorkspace`/`WorkspaceManager`
//! pair but rebuilt around a single choke-point path resolver so every
//! operation enforces the containment invariant the same way.

use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("path '{0}' escapes the workspace root")]
    PathEscape(String),
    #[error("path '{0}' not found")]
    NotFound(String),
    #[error("io error on '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// A sandboxed filesystem rooted at `root`. Every relative path passed to its
/// operations is resolved through [`WorkspaceFs::resolve`], the single choke
/// point that enforces containment.
#[derive(Debug, Clone)]
pub struct WorkspaceFs {
    root: PathBuf,
}

impl WorkspaceFs {
    /// Create a workspace rooted at `root`, creating the directory if needed.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, WorkspaceError> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|source| WorkspaceError::Io {
            path: root.display().to_string(),
            source,
        })?;
        let root = root.canonicalize().map_err(|source| WorkspaceError::Io {
            path: root.display().to_string(),
            source,
        })?;
        Ok(Self { root })
    }

    /// Create a fresh, uniquely named workspace under `parent`, used by
    /// `TournamentEngine` to allocate isolated per-worker roots.
    pub fn new_isolated(parent: impl AsRef<Path>) -> Result<Self, WorkspaceError> {
        let dir = parent.as_ref().join(format!("workspace-{}", Uuid::new_v4()));
        Self::new(dir)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a relative path under the workspace root, rejecting anything
    /// that would escape it — `..` components, absolute paths, null bytes,
    /// or (via canonicalization) symlinks pointing outside the root.
    fn resolve(&self, rel: &str) -> Result<PathBuf, WorkspaceError> {
        if rel.contains('\0') {
            return Err(WorkspaceError::PathEscape(rel.to_string()));
        }

        let rel_path = Path::new(rel);
        if rel_path.is_absolute() {
            return Err(WorkspaceError::PathEscape(rel.to_string()));
        }
        if rel_path
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)))
        {
            return Err(WorkspaceError::PathEscape(rel.to_string()));
        }

        let normalized: PathBuf = rel_path
            .components()
            .filter(|c| !matches!(c, Component::CurDir))
            .collect();
        if normalized.as_os_str().is_empty() {
            return Ok(self.root.clone());
        }

        let joined = self.root.join(&normalized);

        // The file need not exist yet (writes create it), but its parent
        // directory must, and must canonicalize inside the root.
        let parent = joined.parent().unwrap_or(&self.root);
        std::fs::create_dir_all(parent).map_err(|source| WorkspaceError::Io {
            path: parent.display().to_string(),
            source,
        })?;
        let canonical_parent = parent.canonicalize().map_err(|source| WorkspaceError::Io {
            path: parent.display().to_string(),
            source,
        })?;
        if !canonical_parent.starts_with(&self.root) {
            return Err(WorkspaceError::PathEscape(rel.to_string()));
        }

        Ok(canonical_parent.join(joined.file_name().unwrap_or_default()))
    }

    pub fn read(&self, rel: &str) -> Result<Vec<u8>, WorkspaceError> {
        let path = self.resolve(rel)?;
        std::fs::read(&path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                WorkspaceError::NotFound(rel.to_string())
            } else {
                WorkspaceError::Io {
                    path: path.display().to_string(),
                    source,
                }
            }
        })
    }

    pub fn read_to_string(&self, rel: &str) -> Result<String, WorkspaceError> {
        let bytes = self.read(rel)?;
        String::from_utf8(bytes).map_err(|e| WorkspaceError::Io {
            path: rel.to_string(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
        })
    }

    /// Write `contents` to `rel`, atomically: write to a temp sibling then
    /// rename over the destination, so a crash mid-write never leaves a
    /// half-written file in place.
    pub fn write(&self, rel: &str, contents: &[u8]) -> Result<(), WorkspaceError> {
        let path = self.resolve(rel)?;
        let parent = path.parent().unwrap_or(&self.root);
        let tmp_path = parent.join(format!(".{}.tmp-{}", path_file_name(&path), Uuid::new_v4()));

        std::fs::write(&tmp_path, contents).map_err(|source| WorkspaceError::Io {
            path: tmp_path.display().to_string(),
            source,
        })?;
        std::fs::rename(&tmp_path, &path).map_err(|source| WorkspaceError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(())
    }

    pub fn exists(&self, rel: &str) -> bool {
        self.resolve(rel).map(|p| p.exists()).unwrap_or(false)
    }

    pub fn delete(&self, rel: &str) -> Result<(), WorkspaceError> {
        let path = self.resolve(rel)?;
        if !path.exists() {
            return Err(WorkspaceError::NotFound(rel.to_string()));
        }
        if path.is_dir() {
            std::fs::remove_dir_all(&path)
        } else {
            std::fs::remove_file(&path)
        }
        .map_err(|source| WorkspaceError::Io {
            path: path.display().to_string(),
            source,
        })
    }

    /// List file paths (relative to the root) under `rel`, recursively.
    pub fn list(&self, rel: &str) -> Result<Vec<String>, WorkspaceError> {
        let path = self.resolve(rel)?;
        if !path.exists() {
            return Ok(Vec::new());
        }
        let mut out = Vec::new();
        collect_files(&path, &self.root, &mut out)?;
        out.sort();
        Ok(out)
    }
}

fn path_file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

fn collect_files(dir: &Path, root: &Path, out: &mut Vec<String>) -> Result<(), WorkspaceError> {
    let entries = std::fs::read_dir(dir).map_err(|source| WorkspaceError::Io {
        path: dir.display().to_string(),
        source,
    })?;
    for entry in entries {
        let entry = entry.map_err(|source| WorkspaceError::Io {
            path: dir.display().to_string(),
            source,
        })?;
        let path = entry.path();
        if path.is_dir() {
            collect_files(&path, root, out)?;
        } else {
            let relative = path.strip_prefix(root).unwrap_or(&path);
            out.push(relative.to_string_lossy().to_string());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let ws = WorkspaceFs::new(dir.path()).unwrap();
        ws.write("notes.txt", b"hello").unwrap();
        assert_eq!(ws.read_to_string("notes.txt").unwrap(), "hello");
    }

    #[test]
    fn write_creates_missing_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let ws = WorkspaceFs::new(dir.path()).unwrap();
        ws.write("nested/dir/file.txt", b"x").unwrap();
        assert!(ws.exists("nested/dir/file.txt"));
    }

    #[test]
    fn parent_dir_traversal_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let ws = WorkspaceFs::new(dir.path()).unwrap();
        let err = ws.write("../escape.txt", b"x").unwrap_err();
        assert!(matches!(err, WorkspaceError::PathEscape(_)));
    }

    #[test]
    fn absolute_path_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let ws = WorkspaceFs::new(dir.path()).unwrap();
        let err = ws.write("/etc/passwd", b"x").unwrap_err();
        assert!(matches!(err, WorkspaceError::PathEscape(_)));
    }

    #[test]
    fn delete_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let ws = WorkspaceFs::new(dir.path()).unwrap();
        let err = ws.delete("nope.txt").unwrap_err();
        assert!(matches!(err, WorkspaceError::NotFound(_)));
    }

    #[test]
    fn list_is_recursive_and_relative() {
        let dir = tempfile::tempdir().unwrap();
        let ws = WorkspaceFs::new(dir.path()).unwrap();
        ws.write("a.txt", b"1").unwrap();
        ws.write("sub/b.txt", b"2").unwrap();
        let files = ws.list(".").unwrap();
        assert!(files.contains(&"a.txt".to_string()));
        assert!(files.contains(&"sub/b.txt".to_string()));
    }
}

//! File existence and type queries
//!
//! The resolver, validator and derived unit generator never touch the disk
//! directly; they ask a [`FileSystem`]. [`LocalFileSystem`] answers from the
//! real disk, [`MemoryFileSystem`] from an in-memory tree.

use crate::project::Project;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

pub trait FileSystem: Send + Sync {
    fn exists(&self, path: &str) -> bool;

    fn is_dir(&self, path: &str) -> bool;

    /// Existing non-directory
    fn is_file(&self, path: &str) -> bool {
        self.exists(path) && !self.is_dir(path)
    }

    /// Source root containing `path`, falling back to a content root
    fn find_source_root(&self, path: &str) -> Option<String>;

    /// Whether output paths differing only in case name different files
    fn is_case_sensitive(&self) -> bool;

    fn read_to_string(&self, path: &str) -> std::io::Result<String>;
}

/// Real file system with the project's source and content roots
#[derive(Debug, Clone)]
pub struct LocalFileSystem {
    source_roots: Vec<String>,
    content_roots: Vec<String>,
    case_sensitive: bool,
}

impl LocalFileSystem {
    pub fn new(source_roots: Vec<String>, content_roots: Vec<String>) -> Self {
        Self {
            source_roots,
            content_roots,
            case_sensitive: !cfg!(any(target_os = "windows", target_os = "macos")),
        }
    }

    pub fn for_project(project: &Project) -> Self {
        Self::new(
            project.source_roots().map(str::to_string).collect(),
            project.content_roots().map(str::to_string).collect(),
        )
    }

    pub fn with_case_sensitivity(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }
}

impl FileSystem for LocalFileSystem {
    fn exists(&self, path: &str) -> bool {
        Path::new(path).exists()
    }

    fn is_dir(&self, path: &str) -> bool {
        Path::new(path).is_dir()
    }

    fn find_source_root(&self, path: &str) -> Option<String> {
        innermost_root(&self.source_roots, path).or_else(|| innermost_root(&self.content_roots, path))
    }

    fn is_case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    fn read_to_string(&self, path: &str) -> std::io::Result<String> {
        std::fs::read_to_string(path)
    }
}

/// In-memory file tree
///
/// Adding a file registers all of its parent directories.
#[derive(Debug, Clone)]
pub struct MemoryFileSystem {
    files: BTreeMap<String, String>,
    dirs: BTreeSet<String>,
    source_roots: Vec<String>,
    content_roots: Vec<String>,
    case_sensitive: bool,
}

impl Default for MemoryFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self {
            files: BTreeMap::new(),
            dirs: BTreeSet::new(),
            source_roots: Vec::new(),
            content_roots: Vec::new(),
            case_sensitive: true,
        }
    }

    pub fn with_file(mut self, path: &str, contents: &str) -> Self {
        let path = normalize(path);
        self.add_parents(&path);
        let _ = self.files.insert(path, contents.to_string());
        self
    }

    pub fn with_dir(mut self, path: &str) -> Self {
        let path = normalize(path);
        self.add_parents(&path);
        let _ = self.dirs.insert(path);
        self
    }

    pub fn with_source_root(mut self, root: &str) -> Self {
        self.source_roots.push(normalize(root));
        self.with_dir(root)
    }

    pub fn with_content_root(mut self, root: &str) -> Self {
        self.content_roots.push(normalize(root));
        self.with_dir(root)
    }

    pub fn case_insensitive(mut self) -> Self {
        self.case_sensitive = false;
        self
    }

    fn add_parents(&mut self, path: &str) {
        let mut parent = parent_path(path);
        while let Some(dir) = parent {
            if dir.is_empty() || !self.dirs.insert(dir.clone()) {
                break;
            }
            parent = parent_path(&dir);
        }
    }
}

impl FileSystem for MemoryFileSystem {
    fn exists(&self, path: &str) -> bool {
        let path = normalize(path);
        self.files.contains_key(&path) || self.dirs.contains(&path)
    }

    fn is_dir(&self, path: &str) -> bool {
        self.dirs.contains(&normalize(path))
    }

    fn find_source_root(&self, path: &str) -> Option<String> {
        innermost_root(&self.source_roots, path).or_else(|| innermost_root(&self.content_roots, path))
    }

    fn is_case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    fn read_to_string(&self, path: &str) -> std::io::Result<String> {
        self.files.get(&normalize(path)).cloned().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotFound, format!("{} not found", path))
        })
    }
}

fn normalize(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() && path.starts_with('/') {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

fn innermost_root(roots: &[String], path: &str) -> Option<String> {
    roots
        .iter()
        .filter(|root| Path::new(path).starts_with(root.as_str()))
        .max_by_key(|root| root.len())
        .cloned()
}

/// Parent directory of a '/'-separated path
pub fn parent_path(path: &str) -> Option<String> {
    Path::new(path)
        .parent()
        .map(|parent| parent.to_string_lossy().into_owned())
}

/// `path` relative to `root` with '/' separators; `None` when outside the root
pub fn relative_path(path: &str, root: &str) -> Option<String> {
    let relative = Path::new(path).strip_prefix(root).ok()?;
    let parts: Vec<_> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Some(parts.join("/"))
}

// src/fs/mock.rs

use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::SystemTime;

use anyhow::{Result, anyhow};

use super::FileSystem;

#[derive(Debug, Clone)]
enum Node {
    File { text: String, mtime: SystemTime },
    Dir { children: BTreeSet<String>, mtime: SystemTime },
}

/// In-memory project tree with explicit modification times.
///
/// Parent directories are created on demand. Paths are compared verbatim, so
/// keep every path in a test absolute (or every path relative). Directories
/// default to `UNIX_EPOCH` unless stamped with [`MockFileSystem::add_dir_with_mtime`].
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    nodes: Arc<Mutex<BTreeMap<PathBuf, Node>>>,
}

fn not_found(path: &Path) -> anyhow::Error {
    anyhow::Error::new(io::Error::new(io::ErrorKind::NotFound, "no such entry"))
        .context(format!("mock fs: {}", path.display()))
}

fn parent_of(path: &Path) -> Option<&Path> {
    match path.parent() {
        Some(p) if p.as_os_str().is_empty() => Some(Path::new(".")),
        other => other,
    }
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<PathBuf, Node>> {
        self.nodes.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Add (or replace) a file stamped with the current time.
    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<String>) {
        self.add_file_with_mtime(path, content, SystemTime::now());
    }

    pub fn add_file_with_mtime(
        &self,
        path: impl AsRef<Path>,
        content: impl Into<String>,
        mtime: SystemTime,
    ) {
        let path = path.as_ref();
        let mut nodes = self.lock();
        if let Some(parent) = parent_of(path) {
            Self::mkdirs(&mut nodes, parent, SystemTime::UNIX_EPOCH);
            Self::attach(&mut nodes, parent, path);
        }
        nodes.insert(
            path.to_path_buf(),
            Node::File {
                text: content.into(),
                mtime,
            },
        );
    }

    /// Create a directory (and its parents).
    pub fn add_dir(&self, path: impl AsRef<Path>) {
        self.add_dir_with_mtime(path, SystemTime::UNIX_EPOCH);
    }

    pub fn add_dir_with_mtime(&self, path: impl AsRef<Path>, mtime: SystemTime) {
        let path = path.as_ref();
        let mut nodes = self.lock();
        Self::mkdirs(&mut nodes, path, mtime);
        if let Some(Node::Dir { mtime: m, .. }) = nodes.get_mut(path) {
            *m = mtime;
        }
    }

    /// Set the modification time of an existing file or directory.
    pub fn touch(&self, path: impl AsRef<Path>, mtime: SystemTime) {
        match self.lock().get_mut(path.as_ref()) {
            Some(Node::File { mtime: m, .. }) | Some(Node::Dir { mtime: m, .. }) => *m = mtime,
            None => {}
        }
    }

    /// Remove a file or a whole directory subtree.
    pub fn remove(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        let mut nodes = self.lock();
        nodes.retain(|p, _| !p.starts_with(path));
        if let (Some(parent), Some(name)) = (parent_of(path), path.file_name().and_then(|n| n.to_str())) {
            if let Some(Node::Dir { children, .. }) = nodes.get_mut(parent) {
                children.remove(name);
            }
        }
    }

    fn mkdirs(nodes: &mut BTreeMap<PathBuf, Node>, dir: &Path, mtime: SystemTime) {
        if nodes.contains_key(dir) {
            return;
        }
        nodes.insert(
            dir.to_path_buf(),
            Node::Dir {
                children: BTreeSet::new(),
                mtime,
            },
        );
        if let Some(parent) = parent_of(dir).filter(|p| *p != dir) {
            Self::mkdirs(nodes, parent, SystemTime::UNIX_EPOCH);
            Self::attach(nodes, parent, dir);
        }
    }

    fn attach(nodes: &mut BTreeMap<PathBuf, Node>, parent: &Path, child: &Path) {
        let Some(name) = child.file_name().and_then(|n| n.to_str()) else {
            return;
        };
        if let Some(Node::Dir { children, .. }) = nodes.get_mut(parent) {
            children.insert(name.to_string());
        }
    }
}

impl FileSystem for MockFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        match self.lock().get(path) {
            Some(Node::File { text, .. }) => Ok(text.clone()),
            Some(Node::Dir { .. }) => Err(anyhow!("mock fs: {} is a directory", path.display())),
            None => Err(not_found(path)),
        }
    }

    fn is_file(&self, path: &Path) -> bool {
        matches!(self.lock().get(path), Some(Node::File { .. }))
    }

    fn is_dir(&self, path: &Path) -> bool {
        matches!(self.lock().get(path), Some(Node::Dir { .. }))
    }

    fn modified(&self, path: &Path) -> Result<SystemTime> {
        match self.lock().get(path) {
            Some(Node::File { mtime, .. }) | Some(Node::Dir { mtime, .. }) => Ok(*mtime),
            None => Err(not_found(path)),
        }
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        match self.lock().get(path) {
            Some(Node::Dir { children, .. }) => Ok(children.iter().map(|c| path.join(c)).collect()),
            Some(Node::File { .. }) => Err(anyhow!("mock fs: {} is not a directory", path.display())),
            None => Err(not_found(path)),
        }
    }
}

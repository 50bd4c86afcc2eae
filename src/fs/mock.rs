// src/fs/mock.rs

use super::FileSystem;
use anyhow::{Result, anyhow};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
enum Node {
    File,
    Dir(BTreeSet<String>),
}

/// In-memory directory tree for discovery tests.
///
/// Adding a file creates all its parent directories.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    nodes: Arc<Mutex<BTreeMap<PathBuf, Node>>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&self, path: impl AsRef<Path>) {
        let path = path.as_ref().to_path_buf();
        let mut nodes = self.nodes.lock().unwrap();
        nodes.insert(path.clone(), Node::File);
        Self::link_to_parent(&mut nodes, &path);
    }

    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let path = path.as_ref().to_path_buf();
        let mut nodes = self.nodes.lock().unwrap();
        Self::ensure_dir(&mut nodes, &path);
    }

    fn ensure_dir(nodes: &mut BTreeMap<PathBuf, Node>, path: &Path) {
        if nodes.contains_key(path) {
            return;
        }
        nodes.insert(path.to_path_buf(), Node::Dir(BTreeSet::new()));
        Self::link_to_parent(nodes, path);
    }

    fn link_to_parent(nodes: &mut BTreeMap<PathBuf, Node>, path: &Path) {
        let (Some(parent), Some(name)) = (path.parent(), path.file_name()) else {
            return;
        };
        if parent.as_os_str().is_empty() {
            return;
        }

        Self::ensure_dir(nodes, parent);
        if let Some(Node::Dir(children)) = nodes.get_mut(parent) {
            children.insert(name.to_string_lossy().into_owned());
        }
    }
}

impl FileSystem for MockFileSystem {
    fn exists(&self, path: &Path) -> bool {
        self.nodes.lock().unwrap().contains_key(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        matches!(self.nodes.lock().unwrap().get(path), Some(Node::File))
    }

    fn is_dir(&self, path: &Path) -> bool {
        matches!(self.nodes.lock().unwrap().get(path), Some(Node::Dir(_)))
    }

    fn canonicalize(&self, path: &Path) -> Result<PathBuf> {
        // Tests use absolute paths; nothing to resolve.
        if self.exists(path) {
            Ok(path.to_path_buf())
        } else {
            Err(anyhow!("No such file or directory: {:?}", path))
        }
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        match self.nodes.lock().unwrap().get(path) {
            Some(Node::Dir(children)) => Ok(children.iter().map(|name| path.join(name)).collect()),
            _ => Err(anyhow!("Not a directory or not found: {:?}", path)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn files_create_their_parents() {
        let fs = MockFileSystem::new();
        fs.add_file("/repo/src/App/App.csproj");

        assert!(fs.is_dir(Path::new("/repo")));
        assert!(fs.is_dir(Path::new("/repo/src/App")));
        assert!(fs.is_file(Path::new("/repo/src/App/App.csproj")));
        assert_eq!(
            fs.read_dir(Path::new("/repo/src")).unwrap(),
            vec![PathBuf::from("/repo/src/App")]
        );
    }

    #[test]
    fn reading_a_file_as_dir_fails() {
        let fs = MockFileSystem::new();
        fs.add_file("/a/b.txt");
        assert!(fs.read_dir(Path::new("/a/b.txt")).is_err());
        assert!(fs.canonicalize(Path::new("/missing")).is_err());
    }
}

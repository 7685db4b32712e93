use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    File,
    Directory,
}

/// One entry in a file tree. A tree is either a snapshot (every `path` is a
/// real filesystem path) or a proposal, where directory nodes may carry a
/// `virtual://` key while file nodes always keep their original real path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileNode {
    pub path: String,
    pub name: String,
    pub kind: FileKind,
    pub size: u64,
    pub modified_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<FileNode>>,
}

impl FileNode {
    pub fn file(
        path: impl Into<String>,
        name: impl Into<String>,
        size: u64,
        modified_at: i64,
    ) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            kind: FileKind::File,
            size,
            modified_at,
            children: None,
        }
    }

    pub fn directory(
        path: impl Into<String>,
        name: impl Into<String>,
        modified_at: i64,
        children: Vec<FileNode>,
    ) -> Self {
        let size = children.iter().map(|c| c.size).sum();
        Self {
            path: path.into(),
            name: name.into(),
            kind: FileKind::Directory,
            size,
            modified_at,
            children: Some(children),
        }
    }

    pub fn is_dir(&self) -> bool {
        self.kind == FileKind::Directory
    }

    /// Count of file-kind descendants; directories are excluded.
    pub fn file_count(&self) -> usize {
        match &self.children {
            Some(children) => children.iter().map(FileNode::file_count).sum(),
            None => 1,
        }
    }

    /// All file-kind descendants in pre-order.
    pub fn flatten_files(&self) -> Vec<&FileNode> {
        let mut out = Vec::new();
        self.collect_files(&mut out);
        out
    }

    fn collect_files<'a>(&'a self, out: &mut Vec<&'a FileNode>) {
        match &self.children {
            Some(children) => {
                for child in children {
                    child.collect_files(out);
                }
            }
            None => out.push(self),
        }
    }

    /// First node whose path matches exactly, in pre-order.
    pub fn find(&self, path: &str) -> Option<&FileNode> {
        if self.path == path {
            return Some(self);
        }
        self.children.as_ref()?.iter().find_map(|c| c.find(path))
    }

    /// Detach and return the node with the given path, searching all levels.
    /// The root itself is never removed.
    pub fn remove(&mut self, path: &str) -> Option<FileNode> {
        let children = self.children.as_mut()?;
        if let Some(index) = children.iter().position(|c| c.path == path) {
            return Some(children.remove(index));
        }
        children.iter_mut().find_map(|c| c.remove(path))
    }

    /// Append `node` as the last child of the directory whose path matches
    /// `target_dir_path`. Returns the node back if no such directory exists.
    pub fn insert_child(&mut self, target_dir_path: &str, node: FileNode) -> Option<FileNode> {
        if self.is_dir() && self.path == target_dir_path {
            self.children.get_or_insert_with(Vec::new).push(node);
            return None;
        }
        let mut node = node;
        if let Some(children) = self.children.as_mut() {
            for child in children {
                match child.insert_child(target_dir_path, node) {
                    None => return None,
                    Some(rejected) => node = rejected,
                }
            }
        }
        Some(node)
    }

    /// Sort children directories-first, then by name ascending, recursively.
    pub fn sort_children(&mut self) {
        if let Some(children) = self.children.as_mut() {
            children.sort_by(|a, b| match (a.kind, b.kind) {
                (FileKind::Directory, FileKind::File) => Ordering::Less,
                (FileKind::File, FileKind::Directory) => Ordering::Greater,
                _ => a.name.cmp(&b.name),
            });
            for child in children {
                child.sort_children();
            }
        }
    }

    /// Recompute directory sizes bottom-up as the sum of descendant file
    /// sizes. Returns this node's size.
    pub fn recompute_sizes(&mut self) -> u64 {
        if let Some(children) = self.children.as_mut() {
            self.size = children.iter_mut().map(FileNode::recompute_sizes).sum();
        }
        self.size
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ScanResult {
    pub root: FileNode,
    pub file_count: usize,
    pub total_size: u64,
}

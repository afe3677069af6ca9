//! Virtual archive file tree
//!
//! Mirrors the files of a document's working tree. Files uploaded during an
//! edition are first attached to their node as a staged artifact and only
//! written to the working tree when the edition is saved.

use crate::ids::ArtifactId;
use crate::path::ArchivePath;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io;
use std::path::Path;

/// Directory entries ignored when scanning a working tree
const IGNORED_ENTRIES: &[&str] = &[".git"];

/// Node of the archive file tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum FileNode {
    /// A directory and its children by name
    Directory {
        #[serde(default)]
        children: BTreeMap<String, FileNode>,
    },
    /// A file, possibly pointing at a staged artifact not yet written
    File {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        staged: Option<ArtifactId>,
    },
}

impl FileNode {
    fn directory() -> Self {
        Self::Directory {
            children: BTreeMap::new(),
        }
    }

    /// Whether this node is a file
    #[inline]
    #[must_use]
    pub fn is_file(&self) -> bool {
        matches!(self, Self::File { .. })
    }

    /// Staged artifact attached to a file node
    #[inline]
    #[must_use]
    pub fn staged(&self) -> Option<&ArtifactId> {
        match self {
            Self::File { staged } => staged.as_ref(),
            Self::Directory { .. } => None,
        }
    }
}

/// Errors raised while inserting into the tree
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    /// A folder of the path is actually a file
    #[error("path <{path}> is invalid (segment '{segment}' of the path is a file)")]
    SegmentIsFile { path: String, segment: String },

    /// The path names an existing directory
    #[error("path <{path}> is invalid (must be a file and not a directory)")]
    IsDirectory { path: String },
}

/// The archive file tree, rooted at the working tree directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileTree {
    root: FileNode,
}

impl Default for FileTree {
    fn default() -> Self {
        Self::new()
    }
}

impl FileTree {
    /// Empty tree
    #[must_use]
    pub fn new() -> Self {
        Self {
            root: FileNode::directory(),
        }
    }

    /// Build a tree mirroring the files below `dir`
    ///
    /// # Errors
    /// Returns error if the directory cannot be read
    pub fn scan(dir: &Path) -> io::Result<Self> {
        Ok(Self {
            root: scan_dir(dir)?,
        })
    }

    /// Root directory node
    #[inline]
    #[must_use]
    pub fn root(&self) -> &FileNode {
        &self.root
    }

    /// Look up a node
    #[must_use]
    pub fn get(&self, path: &ArchivePath) -> Option<&FileNode> {
        let mut node = &self.root;
        for segment in path.iter() {
            match node {
                FileNode::Directory { children } => node = children.get(segment)?,
                FileNode::File { .. } => return None,
            }
        }
        Some(node)
    }

    /// Walk `path`, creating missing directories and the final file node
    ///
    /// Returns the file node. Fails when a segment on the way is a file or
    /// when the path resolves to an existing directory.
    ///
    /// # Errors
    /// See [`TreeError`]
    pub fn insert_file(&mut self, path: &ArchivePath) -> Result<&mut FileNode, TreeError> {
        let last = path.len().saturating_sub(1);
        let mut node = &mut self.root;
        for (i, segment) in path.iter().enumerate() {
            let FileNode::Directory { children } = node else {
                return Err(TreeError::SegmentIsFile {
                    path: path.to_string(),
                    segment: path.segments()[i - 1].clone(),
                });
            };
            node = children.entry(segment.to_string()).or_insert_with(|| {
                if i == last {
                    FileNode::File { staged: None }
                } else {
                    FileNode::directory()
                }
            });
        }
        if node.is_file() {
            Ok(node)
        } else {
            Err(TreeError::IsDirectory {
                path: path.to_string(),
            })
        }
    }

    /// Point a file node at a staged artifact (or clear it with `None`)
    ///
    /// Returns `false` when no file node exists at `path`.
    pub fn set_staged(&mut self, path: &ArchivePath, artifact: Option<ArtifactId>) -> bool {
        let mut node = &mut self.root;
        for segment in path.iter() {
            match node {
                FileNode::Directory { children } => match children.get_mut(segment) {
                    Some(child) => node = child,
                    None => return false,
                },
                FileNode::File { .. } => return false,
            }
        }
        match node {
            FileNode::File { staged } => {
                *staged = artifact;
                true
            }
            FileNode::Directory { .. } => false,
        }
    }

    /// All files currently pointing at a staged artifact
    #[must_use]
    pub fn staged_files(&self) -> Vec<(String, ArtifactId)> {
        let mut out = Vec::new();
        collect_staged(&self.root, "", &mut out);
        out
    }
}

fn scan_dir(dir: &Path) -> io::Result<FileNode> {
    let mut children = BTreeMap::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if IGNORED_ENTRIES.contains(&name.as_str()) {
            continue;
        }
        let node = if entry.file_type()?.is_dir() {
            scan_dir(&entry.path())?
        } else {
            FileNode::File { staged: None }
        };
        children.insert(name, node);
    }
    Ok(FileNode::Directory { children })
}

fn collect_staged(node: &FileNode, prefix: &str, out: &mut Vec<(String, ArtifactId)>) {
    match node {
        FileNode::Directory { children } => {
            for (name, child) in children {
                let path = if prefix.is_empty() {
                    name.clone()
                } else {
                    format!("{prefix}/{name}")
                };
                collect_staged(child, &path, out);
            }
        }
        FileNode::File { staged: Some(id) } => out.push((prefix.to_string(), id.clone())),
        FileNode::File { staged: None } => {}
    }
}

//! Hierarchical path index built from the flat file table.
//!
//! Nodes live in an arena and are addressed by [`EntryId`], with parents
//! tracked as optional indices, so the tree has no ownership cycles. It
//! is built once per archive load and treated as read-only afterwards.

use std::collections::HashMap;

use crate::error::{PakError, Result};
use crate::format::{FileRecord, SEPARATOR};

/// Stable handle to a node in an [`EntryTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryId(usize);

#[derive(Debug)]
enum NodeKind {
    Dir { children: HashMap<String, EntryId> },
    File { record: FileRecord },
}

#[derive(Debug)]
struct Node {
    name: String,
    parent: Option<EntryId>,
    kind: NodeKind,
}

/// Directory/file tree over backslash-separated record paths.
///
/// The root is a directory named after the path separator with no
/// parent. Children are keyed by exact name for O(1) lookup; sorted
/// views are produced on demand via [`EntryTree::children_sorted`].
///
/// # Examples
///
/// ```
/// use dnpak_core::{EntryTree, FileRecord};
///
/// let mut tree = EntryTree::new();
/// let record = FileRecord {
///     path: "resource\\ui\\login.dds".to_string(),
///     disk_size: 10,
///     decompressed_size: 40,
///     compressed_size: 10,
///     disk_offset: 1024,
///     unknown: [0; 4],
/// };
/// tree.insert("resource\\ui\\login.dds", record)?;
///
/// let id = tree.get("resource\\ui\\login.dds")?.unwrap();
/// assert_eq!(tree.name(id), "login.dds");
/// assert!(tree.get("resource\\missing.dds")?.is_none());
/// # Ok::<(), dnpak_core::PakError>(())
/// ```
#[derive(Debug)]
pub struct EntryTree {
    nodes: Vec<Node>,
}

impl EntryTree {
    /// Creates a tree holding only the root directory.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                name: SEPARATOR.to_string(),
                parent: None,
                kind: NodeKind::Dir {
                    children: HashMap::new(),
                },
            }],
        }
    }

    /// Root directory of the tree.
    #[must_use]
    pub fn root(&self) -> EntryId {
        EntryId(0)
    }

    /// Inserts `path` as a file entry owning `record`, creating
    /// intermediate directories as needed. Leading separators are
    /// optional and stripped. An existing file entry at the final
    /// segment is overwritten.
    ///
    /// # Errors
    ///
    /// `Conflict` if an intermediate segment names a file entry (files
    /// are leaves only) or the final segment names a directory.
    /// `InvalidFormat` if the final segment is empty.
    pub fn insert(&mut self, path: &str, record: FileRecord) -> Result<EntryId> {
        let mut current = self.root();
        let mut rest = path.trim_start_matches(SEPARATOR);
        loop {
            match rest.split_once(SEPARATOR) {
                Some((segment, remainder)) => {
                    current = self.descend_or_create_dir(current, segment, path)?;
                    rest = remainder;
                }
                None => return self.put_file(current, rest, record, path),
            }
        }
    }

    /// Resolves `path` to an entry.
    ///
    /// A missing segment yields `Ok(None)`; absence is not an error.
    ///
    /// # Errors
    ///
    /// `Conflict` if traversal would descend through a file entry.
    pub fn get(&self, path: &str) -> Result<Option<EntryId>> {
        let mut current = self.root();
        let mut rest = path.trim_start_matches(SEPARATOR);
        loop {
            match rest.split_once(SEPARATOR) {
                Some((segment, remainder)) => {
                    let Some(child) = self.child_of(current, segment) else {
                        return Ok(None);
                    };
                    match &self.nodes[child.0].kind {
                        NodeKind::Dir { .. } => {
                            current = child;
                            rest = remainder;
                        }
                        NodeKind::File { .. } => {
                            return Err(PakError::Conflict {
                                path: path.to_string(),
                            });
                        }
                    }
                }
                None => return Ok(self.child_of(current, rest)),
            }
        }
    }

    /// Name of the entry; the root is named after the separator.
    #[must_use]
    pub fn name(&self, id: EntryId) -> &str {
        &self.nodes[id.0].name
    }

    /// Parent of the entry; `None` for the root.
    #[must_use]
    pub fn parent(&self, id: EntryId) -> Option<EntryId> {
        self.nodes[id.0].parent
    }

    /// Whether the entry is a directory.
    #[must_use]
    pub fn is_dir(&self, id: EntryId) -> bool {
        matches!(self.nodes[id.0].kind, NodeKind::Dir { .. })
    }

    /// The file record owned by the entry, or `None` for directories.
    #[must_use]
    pub fn record(&self, id: EntryId) -> Option<&FileRecord> {
        match &self.nodes[id.0].kind {
            NodeKind::File { record } => Some(record),
            NodeKind::Dir { .. } => None,
        }
    }

    /// Children of a directory ordered case-insensitively by name; empty
    /// for file entries. Partitioning directories before files is the
    /// browsing caller's job.
    #[must_use]
    pub fn children_sorted(&self, id: EntryId) -> Vec<(&str, EntryId)> {
        let mut out: Vec<(&str, EntryId)> = match &self.nodes[id.0].kind {
            NodeKind::Dir { children } => children
                .iter()
                .map(|(name, &child)| (name.as_str(), child))
                .collect(),
            NodeKind::File { .. } => Vec::new(),
        };
        out.sort_by(|a, b| a.0.to_lowercase().cmp(&b.0.to_lowercase()));
        out
    }

    fn child_of(&self, dir: EntryId, name: &str) -> Option<EntryId> {
        match &self.nodes[dir.0].kind {
            NodeKind::Dir { children } => children.get(name).copied(),
            NodeKind::File { .. } => None,
        }
    }

    fn descend_or_create_dir(
        &mut self,
        dir: EntryId,
        segment: &str,
        full_path: &str,
    ) -> Result<EntryId> {
        match self.child_of(dir, segment) {
            Some(child) => match &self.nodes[child.0].kind {
                NodeKind::Dir { .. } => Ok(child),
                NodeKind::File { .. } => Err(PakError::Conflict {
                    path: full_path.to_string(),
                }),
            },
            None => {
                let id = EntryId(self.nodes.len());
                self.nodes.push(Node {
                    name: segment.to_string(),
                    parent: Some(dir),
                    kind: NodeKind::Dir {
                        children: HashMap::new(),
                    },
                });
                self.link_child(dir, segment, id);
                Ok(id)
            }
        }
    }

    fn put_file(
        &mut self,
        dir: EntryId,
        name: &str,
        record: FileRecord,
        full_path: &str,
    ) -> Result<EntryId> {
        if name.is_empty() {
            return Err(PakError::InvalidFormat(format!(
                "record path {full_path:?} has an empty file name"
            )));
        }
        match self.child_of(dir, name) {
            Some(existing) => match &mut self.nodes[existing.0].kind {
                NodeKind::File { record: slot } => {
                    *slot = record;
                    Ok(existing)
                }
                NodeKind::Dir { .. } => Err(PakError::Conflict {
                    path: full_path.to_string(),
                }),
            },
            None => {
                let id = EntryId(self.nodes.len());
                self.nodes.push(Node {
                    name: name.to_string(),
                    parent: Some(dir),
                    kind: NodeKind::File { record },
                });
                self.link_child(dir, name, id);
                Ok(id)
            }
        }
    }

    fn link_child(&mut self, dir: EntryId, name: &str, child: EntryId) {
        if let NodeKind::Dir { children } = &mut self.nodes[dir.0].kind {
            children.insert(name.to_string(), child);
        }
    }
}

impl Default for EntryTree {
    fn default() -> Self {
        Self::new()
    }
}

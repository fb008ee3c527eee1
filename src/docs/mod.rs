pub mod blocks;
pub mod ingest;
pub mod types;

use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use types::{Block, DocId, FileKind, FileNode, Heading};

/// Read-only (between ingests) knowledge-base tree.
#[derive(Debug, Clone, Default)]
pub struct DocumentTree {
    roots: Vec<FileNode>,
}

fn node_id(path: &str) -> DocId {
    blake3::hash(path.as_bytes()).to_hex().to_string()
}

/// Fill in missing ids from each node's `/`-joined tree path.
fn assign_ids(nodes: &mut [FileNode], parent: &str) {
    for node in nodes {
        let path = if parent.is_empty() {
            node.name.clone()
        } else {
            format!("{}/{}", parent, node.name)
        };
        if node.id.is_empty() {
            node.id = node_id(&path);
        }
        assign_ids(&mut node.children, &path);
    }
}

fn find_by<'a>(nodes: &'a [FileNode], pred: &dyn Fn(&FileNode) -> bool) -> Option<&'a FileNode> {
    for node in nodes {
        if pred(node) {
            return Some(node);
        }
        if let Some(found) = find_by(&node.children, pred) {
            return Some(found);
        }
    }
    None
}

impl DocumentTree {
    pub fn new(mut roots: Vec<FileNode>) -> Self {
        assign_ids(&mut roots, "");
        Self { roots }
    }

    /// Load a tree from a JSON file (array of nodes) or from a directory on disk.
    pub fn load(path: &Path) -> Result<Self> {
        let tree = if path.is_dir() {
            let roots = read_dir_nodes(path)
                .with_context(|| format!("Failed to read knowledge base dir {:?}", path))?;
            Self::new(roots)
        } else {
            let bytes = std::fs::read(path)
                .with_context(|| format!("Failed to read knowledge base file {:?}", path))?;
            let roots: Vec<FileNode> =
                serde_json::from_slice(&bytes).context("Failed to parse knowledge base JSON")?;
            Self::new(roots)
        };
        info!(
            path = %path.display(),
            documents = tree.documents().len(),
            "Knowledge base loaded"
        );
        Ok(tree)
    }

    pub fn roots(&self) -> &[FileNode] {
        &self.roots
    }

    /// Depth-first lookup by exact, case-sensitive name. Folders match too.
    pub fn resolve_by_name(&self, name: &str) -> Option<&FileNode> {
        find_by(&self.roots, &|n| n.name == name)
    }

    pub fn find_by_id(&self, id: &str) -> Option<&FileNode> {
        find_by(&self.roots, &|n| n.id == id)
    }

    /// All non-folder nodes in depth-first order.
    pub fn documents(&self) -> Vec<&FileNode> {
        fn walk<'a>(nodes: &'a [FileNode], out: &mut Vec<&'a FileNode>) {
            for node in nodes {
                if !node.is_folder() {
                    out.push(node);
                }
                walk(&node.children, out);
            }
        }
        let mut out = Vec::new();
        walk(&self.roots, &mut out);
        out
    }

    /// Renderable blocks of a text document. `None` for unknown ids and non-text nodes.
    pub fn blocks(&self, id: &str) -> Option<Vec<Block>> {
        let text = self.find_by_id(id)?.text()?;
        Some(blocks::split_blocks(text))
    }

    pub fn headings(&self, id: &str) -> Vec<Heading> {
        self.find_by_id(id)
            .and_then(|n| n.text())
            .map(blocks::headings)
            .unwrap_or_default()
    }

    /// Insert a document under a top-level folder, creating the folder if needed.
    /// A document with the same name in that folder is replaced.
    pub fn insert(&mut self, folder: &str, mut node: FileNode) -> DocId {
        let idx = match self.roots.iter().position(|n| n.is_folder() && n.name == folder) {
            Some(idx) => idx,
            None => {
                debug!(folder, "creating folder");
                self.roots.push(FileNode {
                    id: node_id(folder),
                    name: folder.to_string(),
                    kind: FileKind::Folder,
                    content: None,
                    children: Vec::new(),
                    last_modified: None,
                });
                self.roots.len() - 1
            }
        };

        node.id = node_id(&format!("{}/{}", folder, node.name));
        let id = node.id.clone();
        let children = &mut self.roots[idx].children;
        match children.iter_mut().find(|c| c.name == node.name) {
            Some(existing) => {
                warn!(name = %node.name, folder, "replacing existing document");
                *existing = node;
            }
            None => children.push(node),
        }
        id
    }

    /// Indented listing of the whole tree.
    pub fn outline(&self) -> String {
        fn walk(nodes: &[FileNode], depth: usize, out: &mut String) {
            for node in nodes {
                let icon = if node.is_folder() { "📁" } else { "📄" };
                out.push_str(&format!("{}{} {}\n", "  ".repeat(depth), icon, node.name));
                walk(&node.children, depth + 1, out);
            }
        }
        let mut out = String::new();
        walk(&self.roots, 0, &mut out);
        out
    }
}

/// Strip the extension (from the last `.`) for display labels.
pub fn display_name(name: &str) -> &str {
    match name.rfind('.') {
        Some(idx) => &name[..idx],
        None => name,
    }
}

fn read_dir_nodes(dir: &Path) -> Result<Vec<FileNode>> {
    let mut entries: Vec<_> = std::fs::read_dir(dir)?.collect::<std::io::Result<_>>()?;
    entries.sort_by_key(|e| e.file_name());

    let mut nodes = Vec::new();
    for entry in entries {
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with('.') {
            continue;
        }
        let last_modified = entry
            .metadata()
            .and_then(|m| m.modified())
            .ok()
            .map(chrono::DateTime::<chrono::Utc>::from);

        if path.is_dir() {
            nodes.push(FileNode {
                id: String::new(),
                name,
                kind: FileKind::Folder,
                content: None,
                children: read_dir_nodes(&path)?,
                last_modified,
            });
            continue;
        }

        let kind = path
            .extension()
            .map(|e| FileKind::from_extension(&e.to_string_lossy()))
            .unwrap_or(FileKind::Text);
        let content = match kind {
            FileKind::Text => match std::fs::read(&path) {
                Ok(bytes) => Some(String::from_utf8_lossy(&bytes).to_string()),
                Err(e) => {
                    warn!("Skipping unreadable file {:?}: {}", path, e);
                    continue;
                }
            },
            _ => Some(path.display().to_string()),
        };
        nodes.push(FileNode {
            id: String::new(),
            name,
            kind,
            content,
            children: Vec::new(),
            last_modified,
        });
    }
    Ok(nodes)
}

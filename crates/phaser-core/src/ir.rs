//! Tree IR consumed by the pipeline.
//!
//! A [`Module`] owns its [`File`]s in compilation-unit order. Each file owns
//! an arena of [`Node`]s addressed by [`NodeId`]; the tree structure lives in
//! the `children` lists and every node also carries a back link to its
//! parent. Lowerings that move nodes around are allowed to leave the back
//! links stale for a while; the parent-link checks in `phaser-pipeline`
//! catch a repair that never happened.
//!
//! Nodes are never freed. A node dropped from every `children` list is simply
//! unreachable and ignored by traversals.

use std::fmt::{self, Write as _};

use xxhash_rust::xxh64::xxh64;

use crate::{FileId, NodeId, NodeRef, SymbolId};

/// What a node represents.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Root of a file; never has a parent.
    Root,
    /// A function declaration whose children form its body.
    Function { name: String },
    /// A nested statement block.
    Block,
    /// A call by name, bound to a function symbol once resolved.
    Call {
        callee: String,
        target: Option<SymbolId>,
    },
    /// `alias name = target`, resolved to the function it finally names.
    Alias {
        name: String,
        target: String,
        resolved: Option<SymbolId>,
    },
    Literal(i64),
    /// Compiler-introduced temporary holding the value of its only child.
    Temporary { name: String },
}

impl NodeKind {
    /// The name this node declares, if it is a declaration.
    pub fn declared_name(&self) -> Option<&str> {
        match self {
            NodeKind::Function { name } | NodeKind::Alias { name, .. } => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Root => write!(f, "root"),
            NodeKind::Function { name } => write!(f, "fun {}", name),
            NodeKind::Block => write!(f, "block"),
            NodeKind::Call { callee, target } => match target {
                Some(sym) => write!(f, "call {} -> ${}", callee, sym.0),
                None => write!(f, "call {} -> ?", callee),
            },
            NodeKind::Alias {
                name,
                target,
                resolved,
            } => match resolved {
                Some(sym) => write!(f, "alias {} = {} -> ${}", name, target, sym.0),
                None => write!(f, "alias {} = {} -> ?", name, target),
            },
            NodeKind::Literal(value) => write!(f, "lit {}", value),
            NodeKind::Temporary { name } => write!(f, "tmp {}", name),
        }
    }
}

/// One IR node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Node {
    pub kind: NodeKind,
    /// Back link to the structural parent. `None` only for the root and for
    /// detached nodes.
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

impl Node {
    fn new(kind: NodeKind, parent: Option<NodeId>) -> Self {
        Self {
            kind,
            parent,
            children: Vec::new(),
        }
    }
}

/// One source file's IR.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct File {
    id: FileId,
    path: String,
    nodes: Vec<Node>,
    root: NodeId,
}

impl File {
    /// Create an empty file containing only its root node.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            id: FileId::default(),
            path: path.into(),
            nodes: vec![Node::new(NodeKind::Root, None)],
            root: NodeId::new(0),
        }
    }

    pub fn id(&self) -> FileId {
        self.id
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    /// Number of nodes in the arena, reachable or not.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// A location for diagnostics.
    pub fn node_ref(&self, id: NodeId) -> NodeRef {
        NodeRef::new(self.id, self.path.clone(), id)
    }

    /// Allocate a node and append it to `parent`'s children.
    pub fn add_child(&mut self, parent: NodeId, kind: NodeKind) -> NodeId {
        let id = self.alloc(kind, Some(parent));
        self.nodes[parent.index()].children.push(id);
        id
    }

    /// Allocate a node that is not yet linked into the tree.
    pub fn alloc(&mut self, kind: NodeKind, parent: Option<NodeId>) -> NodeId {
        let id = NodeId::new(self.nodes.len() as u32);
        self.nodes.push(Node::new(kind, parent));
        id
    }

    /// The node behind `id`, or `None` if `id` is out of range.
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    /// All nodes reachable from the root, in pre-order.
    ///
    /// Each node is visited once. Child ids past the end of the arena and
    /// nodes already visited through another parent are skipped, so a
    /// broken tree still yields a finite walk.
    pub fn preorder(&self) -> Vec<NodeId> {
        self.walk().into_iter().map(|(id, _)| id).collect()
    }

    /// Pre-order walk with the depth of every node, the root at depth 0.
    fn walk(&self) -> Vec<(NodeId, usize)> {
        let mut visited = vec![false; self.nodes.len()];
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![(self.root, 0)];
        while let Some((id, depth)) = stack.pop() {
            match visited.get_mut(id.index()) {
                Some(seen) if !*seen => *seen = true,
                _ => continue,
            }
            order.push((id, depth));
            for &child in self.nodes[id.index()].children.iter().rev() {
                stack.push((child, depth + 1));
            }
        }
        order
    }

    /// Reachable `(parent, child)` pairs, following `children` lists.
    ///
    /// Only pairs whose child id is in range are returned.
    pub fn edges(&self) -> Vec<(NodeId, NodeId)> {
        self.preorder()
            .into_iter()
            .flat_map(|id| self.node(id).children.iter().map(move |&c| (id, c)))
            .filter(|&(_, child)| child.index() < self.nodes.len())
            .collect()
    }

    /// Render the reachable tree as indented text.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "file {}", self.path);
        for (id, depth) in self.walk().into_iter().skip(1) {
            let node = self.node(id);
            let parent = match node.parent {
                Some(p) => p.to_string(),
                None => "-".to_string(),
            };
            let _ = writeln!(
                out,
                "{:indent$}{} {} (parent {})",
                "",
                id,
                node.kind,
                parent,
                indent = depth * 2
            );
        }
        out
    }
}

/// A whole program: files in compilation-unit order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Module {
    name: String,
    files: Vec<File>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            files: Vec::new(),
        }
    }

    /// Append a file, assigning it the next [`FileId`].
    pub fn add_file(&mut self, mut file: File) -> FileId {
        let id = FileId::new(self.files.len() as u32);
        file.id = id;
        self.files.push(file);
        id
    }

    /// Builder-style [`Module::add_file`].
    pub fn with_file(mut self, file: File) -> Self {
        self.add_file(file);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn files(&self) -> &[File] {
        &self.files
    }

    pub fn files_mut(&mut self) -> &mut [File] {
        &mut self.files
    }

    pub fn file(&self, id: FileId) -> &File {
        &self.files[id.index()]
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "module {}", self.name);
        for file in &self.files {
            out.push_str(&file.render());
        }
        out
    }

    /// Hash of the rendered module, for comparing the results of two runs.
    pub fn fingerprint(&self) -> u64 {
        xxh64(self.render().as_bytes(), 0)
    }
}

/// Convenience builder for files, mostly used by tests and benchmarks.
pub struct FileBuilder {
    file: File,
}

impl FileBuilder {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            file: File::new(path),
        }
    }

    pub fn root(&self) -> NodeId {
        self.file.root()
    }

    pub fn function(&mut self, parent: NodeId, name: &str) -> NodeId {
        self.file.add_child(
            parent,
            NodeKind::Function {
                name: name.to_string(),
            },
        )
    }

    pub fn block(&mut self, parent: NodeId) -> NodeId {
        self.file.add_child(parent, NodeKind::Block)
    }

    pub fn call(&mut self, parent: NodeId, callee: &str) -> NodeId {
        self.file.add_child(
            parent,
            NodeKind::Call {
                callee: callee.to_string(),
                target: None,
            },
        )
    }

    pub fn alias(&mut self, parent: NodeId, name: &str, target: &str) -> NodeId {
        self.file.add_child(
            parent,
            NodeKind::Alias {
                name: name.to_string(),
                target: target.to_string(),
                resolved: None,
            },
        )
    }

    pub fn literal(&mut self, parent: NodeId, value: i64) -> NodeId {
        self.file.add_child(parent, NodeKind::Literal(value))
    }

    pub fn finish(self) -> File {
        self.file
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> File {
        let mut b = FileBuilder::new("main.src");
        let root = b.root();
        let main = b.function(root, "main");
        let block = b.block(main);
        b.call(block, "helper");
        b.literal(main, 7);
        b.finish()
    }

    #[test]
    fn preorder_follows_children_lists() {
        let file = sample();
        let kinds: Vec<String> = file
            .preorder()
            .into_iter()
            .map(|id| file.node(id).kind.to_string())
            .collect();
        assert_eq!(
            kinds,
            ["root", "fun main", "block", "call helper -> ?", "lit 7"]
        );
    }

    #[test]
    fn detached_nodes_are_not_rendered() {
        let mut file = sample();
        let orphan = file.alloc(NodeKind::Literal(99), None);
        assert_eq!(file.node_count(), 6);
        assert!(!file.preorder().contains(&orphan));
        assert!(!file.render().contains("lit 99"));
    }

    #[test]
    fn broken_trees_are_walked_once() {
        let mut file = sample();
        let block = NodeId::new(2);
        file.node_mut(block).children.push(NodeId::new(1));
        file.node_mut(block).children.push(NodeId::new(99));

        let edges = file.edges();
        assert_eq!(file.preorder().len(), 5);
        assert!(edges.iter().all(|&(_, c)| c != NodeId::new(99)));
        assert_eq!(file.render().lines().count(), 5);
    }

    #[test]
    fn declared_names() {
        let file = sample();
        let names: Vec<Option<&str>> = file
            .preorder()
            .into_iter()
            .map(|id| file.node(id).kind.declared_name())
            .collect();
        assert_eq!(names, [None, Some("main"), None, None, None]);
        assert_eq!(file.get(NodeId::new(5)), None);
    }

    #[test]
    fn add_file_assigns_ids_in_order() {
        let mut module = Module::new("app");
        let a = module.add_file(File::new("a.src"));
        let b = module.add_file(File::new("b.src"));
        assert_eq!((a, b), (FileId::new(0), FileId::new(1)));
        assert_eq!(module.file(b).path(), "b.src");
        assert_eq!(module.file(b).node_ref(NodeId::new(0)).file, b);
    }

    #[test]
    fn render_shows_parent_links() {
        let text = sample().render();
        assert!(text.starts_with("file main.src\n"));
        assert!(text.contains("  #1 fun main (parent #0)\n"));
        assert!(text.contains("      #3 call helper -> ? (parent #2)\n"));
    }

    #[test]
    fn fingerprint_tracks_content() {
        let a = Module::new("app").with_file(sample());
        let b = Module::new("app").with_file(sample());
        assert_eq!(a.fingerprint(), b.fingerprint());

        let mut c = b.clone();
        let root = c.files_mut()[0].root();
        c.files_mut()[0].add_child(root, NodeKind::Literal(1));
        assert_ne!(a.fingerprint(), c.fingerprint());
    }
}

//! Arena-backed rooted tree with a name index.
//!
//! # Overview
//! All nodes are stored in one `Vec<Node>`; parent and child links are
//! indices into it. A [`Tree`] is only produced by [`TreeBuilder::build`],
//! which the Newick parser drives, and is immutable afterwards. Because it
//! holds no interior mutability it is `Send + Sync`, so divergence queries can
//! run from many threads at once.

use crate::node::{Node, NodeId};
use std::collections::HashMap;

/// A parsed, immutable rooted tree.
#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<Node>,
    root: NodeId,
    index: HashMap<String, NodeId>,
}

impl Tree {
    /// Number of nodes in the tree, leaves and internal nodes alike.
    ///
    /// Counts arena entries, so a node whose name was shadowed by a later
    /// duplicate is still counted.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn root(&self) -> &Node {
        &self.nodes[self.root]
    }

    pub fn root_id(&self) -> NodeId {
        self.root
    }

    /// Look up a node by name. Returns `None` for names not in the tree.
    pub fn lookup(&self, name: &str) -> Option<&Node> {
        self.index.get(name).map(|&id| &self.nodes[id])
    }

    pub fn id_of(&self, name: &str) -> Option<NodeId> {
        self.index.get(name).copied()
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn parent_of(&self, node: &Node) -> Option<&Node> {
        node.parent.map(|id| &self.nodes[id])
    }

    pub fn children_of<'a>(&'a self, node: &'a Node) -> impl Iterator<Item = &'a Node> + 'a {
        node.children.iter().map(move |&id| &self.nodes[id])
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    pub fn leaves(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|n| n.is_leaf())
    }
}

/// Incremental construction of a [`Tree`].
///
/// Nodes are added unattached, linked with [`add_child`](Self::add_child),
/// and registered under their final names with [`register`](Self::register).
/// The first node added becomes the root.
#[derive(Debug, Default)]
pub(crate) struct TreeBuilder {
    nodes: Vec<Node>,
    index: HashMap<String, NodeId>,
}

impl TreeBuilder {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        TreeBuilder {
            nodes: Vec::with_capacity(capacity),
            index: HashMap::with_capacity(capacity),
        }
    }

    pub(crate) fn add_node(&mut self, name: String, length: f64) -> NodeId {
        self.nodes.push(Node::new(name, length));
        self.nodes.len() - 1
    }

    /// Attach `child` under `parent`: sets the back link and appends to the
    /// parent's child list.
    pub(crate) fn add_child(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[child].parent = Some(parent);
        self.nodes[parent].children.push(child);
    }

    pub(crate) fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub(crate) fn rename(&mut self, id: NodeId, name: String) {
        self.nodes[id].name = name;
    }

    /// Index `id` under its current name. A later registration of the same
    /// name replaces the earlier one.
    pub(crate) fn register(&mut self, id: NodeId) {
        let name = self.nodes[id].name.clone();
        self.index.insert(name, id);
    }

    /// Finish the tree. Returns `None` if no node was ever added.
    pub(crate) fn build(self) -> Option<Tree> {
        if self.nodes.is_empty() {
            return None;
        }
        Some(Tree {
            nodes: self.nodes,
            root: 0,
            index: self.index,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// ```text
    ///        R
    ///      /   \
    ///     A     X
    ///          / \
    ///         B   C
    /// ```
    fn small_tree() -> Tree {
        let mut builder = TreeBuilder::with_capacity(5);
        let r = builder.add_node("R".into(), 0.0);
        let a = builder.add_node("A".into(), 1.0);
        let x = builder.add_node("X".into(), 2.0);
        let b = builder.add_node("B".into(), 3.0);
        let c = builder.add_node("C".into(), 4.0);
        builder.add_child(r, a);
        builder.add_child(r, x);
        builder.add_child(x, b);
        builder.add_child(x, c);
        for id in [a, b, c, x, r] {
            builder.register(id);
        }
        builder.build().unwrap()
    }

    #[test]
    fn test_links() {
        let tree = small_tree();
        assert_eq!(tree.node_count(), 5);
        assert_eq!(tree.root().name(), "R");
        assert!(tree.root().is_root());

        let x = tree.lookup("X").unwrap();
        let kids: Vec<&str> = tree.children_of(x).map(|n| n.name()).collect();
        assert_eq!(kids, vec!["B", "C"]);
        assert_eq!(tree.parent_of(x).unwrap().name(), "R");

        let leaves: Vec<&str> = tree.leaves().map(|n| n.name()).collect();
        assert_eq!(leaves, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_lookup_missing() {
        let tree = small_tree();
        assert!(tree.lookup("Z").is_none());
        assert!(tree.id_of("Z").is_none());
        assert!(tree.get(99).is_none());
    }

    #[test]
    fn test_duplicate_registration_last_wins() {
        let mut builder = TreeBuilder::default();
        let r = builder.add_node("R".into(), 0.0);
        let first = builder.add_node("A".into(), 1.0);
        let second = builder.add_node("A".into(), 2.0);
        builder.add_child(r, first);
        builder.add_child(r, second);
        builder.register(first);
        builder.register(second);
        builder.register(r);
        let tree = builder.build().unwrap();

        assert_eq!(tree.node_count(), 3);
        assert_eq!(tree.id_of("A"), Some(second));
        assert_eq!(tree.lookup("A").unwrap().length(), 2.0);
    }

    #[test]
    fn test_empty_builder() {
        assert!(TreeBuilder::default().build().is_none());
    }
}

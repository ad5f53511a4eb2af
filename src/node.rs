//! A single vertex of a parsed phylogenetic tree.
//!
//! Nodes live in the arena owned by [`Tree`](crate::tree::Tree) and refer to
//! each other by [`NodeId`]. The parent link is purely navigational; the arena
//! owns every node.

use std::fmt;

/// Index of a node inside its tree's arena.
pub type NodeId = usize;

/// A tree vertex: name, length of the branch leading to it, and its links.
///
/// # Display
/// `{name}:{length}`, where the length uses the shortest decimal form that
/// round-trips (`0.1` prints as `0.1`, `1.0` as `1`).
/// ```
/// # use natural_experiments::parser::NewickParser;
/// let tree = NewickParser::new().parse("(A:0.1,B:1.0)R;").unwrap();
/// assert_eq!(tree.lookup("A").unwrap().to_string(), "A:0.1");
/// assert_eq!(tree.lookup("B").unwrap().to_string(), "B:1");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub(crate) name: String,
    pub(crate) length: f64,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
}

impl Node {
    pub(crate) fn new(name: String, length: f64) -> Self {
        Node {
            name,
            length,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Length of the branch connecting this node to its parent.
    ///
    /// Carried for the root as well, but never counted in a distance.
    pub fn length(&self) -> f64 {
        self.length
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Children in the order they appear in the Newick text.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    #[inline]
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.length)
    }
}

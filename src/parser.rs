//! Newick string parser.
//!
//! # Overview
//! The parser follows the grammar
//! ```text
//! tree     := subtree ";"
//! subtree  := leaf | internal
//! internal := "(" subtree ("," subtree)* ")" label?
//! leaf     := label
//! label    := name? (":" length)?
//! ```
//! where names may be single-quoted.
//!
//! # Algorithm
//! 1. Strip whitespace and the trailing `;`, then match every parenthesis
//!    once. Unbalanced input is rejected here, before any node exists.
//! 2. Decompose subtrees top-down: split each subtree on its last `)` into a
//!    children group and a trailing label, then split the group's interior on
//!    commas at nesting depth 0. Nested groups are skipped in one step via the
//!    parenthesis table, so every byte is scanned once per level it is top-level on.
//! 3. Walk the finished tree in post-order, naming anonymous nodes and
//!    registering every node in the name index.
//!
//! Both passes use explicit stacks, so nesting depth is limited only by memory.

use crate::error::MalformedTreeError;
use crate::node::NodeId;
use crate::tree::{Tree, TreeBuilder};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Prefix of the names given to nodes that carry no name in the Newick text.
pub const DEFAULT_ANONYMOUS_PREFIX: &str = "node";

/// Parser for single Newick trees.
///
/// Anonymous nodes are named `<prefix><n>` with `n` counting up from 1 in
/// post-order. The counter restarts for every parsed tree and skips any name
/// already used by a labelled node of the same tree.
///
/// # Example
/// ```
/// use natural_experiments::parser::NewickParser;
///
/// let tree = NewickParser::new().parse("((A:1,B:2):0.5,C:3);").unwrap();
/// assert_eq!(tree.node_count(), 5);
/// assert_eq!(tree.lookup("node1").unwrap().length(), 0.5);
/// assert_eq!(tree.root().name(), "node2");
/// ```
#[derive(Debug, Clone)]
pub struct NewickParser {
    anonymous_prefix: String,
    anonymous_count: usize,
}

impl Default for NewickParser {
    fn default() -> Self {
        Self::new()
    }
}

/// A subtree waiting to be turned into a node: byte range plus the node it hangs from.
struct Pending {
    start: usize,
    end: usize,
    parent: Option<NodeId>,
}

impl NewickParser {
    pub fn new() -> Self {
        NewickParser {
            anonymous_prefix: DEFAULT_ANONYMOUS_PREFIX.to_string(),
            anonymous_count: 0,
        }
    }

    /// Sets the prefix used when naming anonymous nodes.
    pub fn with_anonymous_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.anonymous_prefix = prefix.into();
        self
    }

    /// Parse one Newick tree.
    ///
    /// # Errors
    /// Returns [`MalformedTreeError`] for unbalanced parentheses, empty
    /// subtrees (e.g. a trailing comma), text outside the outermost group, a
    /// stray `;`, or a branch length that is not a finite number. Negative
    /// lengths are accepted. No partial tree is ever returned.
    pub fn parse(&mut self, text: &str) -> Result<Tree, MalformedTreeError> {
        self.anonymous_count = 0;

        let text = strip_terminator(text);
        if text.is_empty() {
            return Err(MalformedTreeError::Empty);
        }
        let groups = Groups::match_parentheses(text)?;

        // Rough guess: every leaf is followed by ',' or ')'.
        let capacity = text.bytes().filter(|b| matches!(b, b',' | b')')).count() + 1;
        let mut builder = TreeBuilder::with_capacity(capacity);
        let mut labelled: HashSet<String> = HashSet::with_capacity(capacity);

        let mut stack = vec![Pending {
            start: 0,
            end: text.len(),
            parent: None,
        }];
        while let Some(Pending { start, end, parent }) = stack.pop() {
            let (start, end) = trim_range(text, start, end);
            if start == end {
                return Err(MalformedTreeError::EmptySubtree { position: start });
            }

            let (label_start, siblings) = match text[start..end].rfind(')') {
                None => (start, None),
                Some(offset) => {
                    let close = start + offset;
                    let open = groups.open_of[&close];
                    if open != start {
                        return Err(MalformedTreeError::UnexpectedText {
                            position: start,
                            fragment: text[start..open].to_string(),
                        });
                    }
                    (close + 1, Some(groups.split_siblings(text, open + 1, close)))
                }
            };

            let label = &text[label_start..end];
            if let Some(stray) = label.find([',', ';']) {
                return Err(MalformedTreeError::UnexpectedText {
                    position: label_start + stray,
                    fragment: label[stray..].to_string(),
                });
            }
            let (name, length) = decode_label(label, siblings.is_some())?;
            if !name.is_empty() {
                labelled.insert(name.clone());
            }

            let id = builder.add_node(name, length);
            if let Some(parent) = parent {
                builder.add_child(parent, id);
            }
            // Reversed so the leftmost sibling is popped, and attached, first.
            for (s, e) in siblings.into_iter().flatten().rev() {
                stack.push(Pending {
                    start: s,
                    end: e,
                    parent: Some(id),
                });
            }
        }

        self.name_and_register(&mut builder, &labelled);

        let tree = builder.build().ok_or(MalformedTreeError::Empty)?;
        debug!(
            nodes = tree.node_count(),
            root = tree.root().name(),
            "parsed newick tree"
        );
        Ok(tree)
    }

    /// Post-order pass: children (left to right) before their parent.
    fn name_and_register(&mut self, builder: &mut TreeBuilder, labelled: &HashSet<String>) {
        let mut stack: Vec<(NodeId, bool)> = vec![(0, false)];
        while let Some((id, expanded)) = stack.pop() {
            if expanded {
                if builder.node(id).name().is_empty() {
                    let name = self.next_anonymous_name(labelled);
                    builder.rename(id, name);
                }
                builder.register(id);
            } else {
                stack.push((id, true));
                for &child in builder.node(id).children().iter().rev() {
                    stack.push((child, false));
                }
            }
        }
    }

    fn next_anonymous_name(&mut self, taken: &HashSet<String>) -> String {
        loop {
            self.anonymous_count += 1;
            let name = format!("{}{}", self.anonymous_prefix, self.anonymous_count);
            if !taken.contains(&name) {
                return name;
            }
        }
    }
}

/// Matching parenthesis positions, both directions.
#[derive(Debug, Default)]
struct Groups {
    close_of: HashMap<usize, usize>,
    open_of: HashMap<usize, usize>,
}

impl Groups {
    fn match_parentheses(text: &str) -> Result<Self, MalformedTreeError> {
        let mut groups = Groups::default();
        let mut open = Vec::new();
        for (position, byte) in text.bytes().enumerate() {
            match byte {
                b'(' => open.push(position),
                b')' => {
                    let start = open
                        .pop()
                        .ok_or(MalformedTreeError::UnbalancedParentheses { position })?;
                    groups.close_of.insert(start, position);
                    groups.open_of.insert(position, start);
                }
                _ => {}
            }
        }
        if let Some(&position) = open.first() {
            return Err(MalformedTreeError::UnclosedParenthesis { position });
        }
        Ok(groups)
    }

    /// Split `text[from..to]` on commas at nesting depth 0.
    fn split_siblings(&self, text: &str, from: usize, to: usize) -> Vec<(usize, usize)> {
        let bytes = text.as_bytes();
        let mut parts = Vec::new();
        let mut part_start = from;
        let mut pos = from;
        while pos < to {
            match bytes[pos] {
                b'(' => pos = self.close_of[&pos],
                b',' => {
                    parts.push((part_start, pos));
                    part_start = pos + 1;
                }
                _ => {}
            }
            pos += 1;
        }
        parts.push((part_start, to));
        parts
    }
}

/// Trim surrounding whitespace and one trailing `;`.
fn strip_terminator(text: &str) -> &str {
    let text = text.trim();
    text.strip_suffix(';').unwrap_or(text).trim_end()
}

fn trim_range(text: &str, start: usize, end: usize) -> (usize, usize) {
    let slice = &text[start..end];
    let leading = slice.len() - slice.trim_start().len();
    let start = start + leading;
    (start, start + slice.trim().len())
}

/// Decode a label into `(name, length)`; an empty name marks an anonymous node.
///
/// Quote characters are dropped, not unescaped. Without a colon, a numeric
/// label on an internal node is read as its branch length.
fn decode_label(label: &str, internal: bool) -> Result<(String, f64), MalformedTreeError> {
    let cleaned: String = label.chars().filter(|&c| c != '\'').collect();
    let cleaned = cleaned.trim();

    if let Some((name, length)) = cleaned.split_once(':') {
        return Ok((name.trim().to_string(), parse_length(label, length.trim())?));
    }
    if internal && cleaned.parse::<f64>().is_ok_and(f64::is_finite) {
        return Ok((String::new(), parse_length(label, cleaned)?));
    }
    Ok((cleaned.to_string(), 0.0))
}

fn parse_length(label: &str, value: &str) -> Result<f64, MalformedTreeError> {
    if value.is_empty() {
        return Ok(0.0);
    }
    match value.parse::<f64>() {
        Ok(length) if length.is_finite() => Ok(length),
        _ => Err(MalformedTreeError::InvalidLength {
            label: label.to_string(),
            value: value.to_string(),
        }),
    }
}

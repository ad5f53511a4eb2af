//! Divergence between named nodes of a parsed tree.
//!
//! # Algorithm
//! Both nodes are turned into their path from the root (root first). The
//! paths agree up to the most recent common ancestor; past that point each
//! path's remaining branch lengths are summed.
//!
//! - **Paths split** at position `i`: the divergence is the larger of the two
//!   tail sums. The shared ancestor sits just above `i`, and the deeper of the
//!   two branches is the time needed to reach both tips from it.
//! - **One path contains the other** (ancestor and descendant, or the same
//!   node): the divergence is the sum of the longer path's extra nodes.
//!
//! The root's own branch length never enters a sum.
//!
//! # Example
//! ```text
//! (A:0.1,B:0.2,(C:0.3,D:0.4)E:0.5)F:0.1;
//!
//!         F
//!      /  |  \
//!    A   B    E (0.5)
//!            / \
//!          C    D
//!
//! path(C) = [F, E, C]     path(D) = [F, E, D]
//! split at 2 → max(0.3, 0.4) = 0.4
//!
//! path(F) = [F]           path(D) = [F, E, D]
//! no split  → 0.5 + 0.4 = 0.9
//! ```

use crate::node::NodeId;
use crate::tree::Tree;
use rayon::prelude::*;

/// Node ids from the root down to the node called `name`.
///
/// Empty if the tree has no node with that name.
pub fn path_from_root(tree: &Tree, name: &str) -> Vec<NodeId> {
    let Some(mut id) = tree.id_of(name) else {
        return Vec::new();
    };
    let mut path = vec![id];
    while let Some(parent) = tree.get(id).and_then(|n| n.parent()) {
        path.push(parent);
        id = parent;
    }
    path.reverse();
    path
}

/// Sum of branch lengths along `path`, skipping the root.
fn branch_sum(tree: &Tree, path: &[NodeId]) -> f64 {
    path.iter()
        .filter(|&&id| id != tree.root_id())
        .filter_map(|&id| tree.get(id))
        .fold(0.0, |total, node| total + node.length())
}

/// Divergence between the nodes named `a` and `b`.
///
/// Returns `None` if either name is missing from the tree, so an unknown
/// species is never mistaken for a zero divergence. Symmetric in `a` and `b`,
/// and `Some(0.0)` when both names resolve to the same node.
///
/// ```
/// # use natural_experiments::parser::NewickParser;
/// # use natural_experiments::divergence::divergence;
/// let tree = NewickParser::new()
///     .parse("(A:0.1,B:0.2,(C:0.3,D:0.4)E:0.5)F:0.1;")
///     .unwrap();
/// assert_eq!(divergence(&tree, "A", "B"), Some(0.2));
/// assert_eq!(divergence(&tree, "A", "Z"), None);
/// ```
pub fn divergence(tree: &Tree, a: &str, b: &str) -> Option<f64> {
    let path_a = path_from_root(tree, a);
    let path_b = path_from_root(tree, b);
    if path_a.is_empty() || path_b.is_empty() {
        return None;
    }

    let shared = path_a.len().min(path_b.len());
    match (0..shared).find(|&idx| path_a[idx] != path_b[idx]) {
        Some(split) => {
            let tail_a = branch_sum(tree, &path_a[split..]);
            let tail_b = branch_sum(tree, &path_b[split..]);
            Some(tail_a.max(tail_b))
        }
        None => {
            let longer = if path_a.len() >= path_b.len() { &path_a } else { &path_b };
            Some(branch_sum(tree, &longer[shared..]))
        }
    }
}

/// Divergence for every unordered pair of `names`, computed in parallel.
///
/// Returns `(i, j, divergence)` with `i < j`, ordered by `i` then `j`.
pub fn pairwise_divergences(tree: &Tree, names: &[String]) -> Vec<(usize, usize, Option<f64>)> {
    let n = names.len();
    (0..n)
        .into_par_iter()
        .flat_map_iter(|i| (i + 1..n).map(move |j| (i, j)))
        .map(|(i, j)| (i, j, divergence(tree, &names[i], &names[j])))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::NewickParser;
    use itertools::Itertools;

    const TREE: &str = "(A:0.1,B:0.2,(C:0.3,D:0.4)E:0.5)F:0.1;";

    fn tree(text: &str) -> Tree {
        NewickParser::new().parse(text).unwrap()
    }

    fn approx(actual: Option<f64>, expected: f64) {
        let actual = actual.expect("both nodes present");
        assert!(
            (actual - expected).abs() < 1e-12,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_reference_distances() {
        let t = tree(TREE);
        let cases = [
            ("A", "B", 0.2),
            ("E", "B", 0.5),
            ("C", "D", 0.4),
            ("C", "E", 0.3),
            ("F", "D", 0.9),
        ];
        for (a, b, expected) in cases {
            approx(divergence(&t, a, b), expected);
        }
    }

    #[test]
    fn test_symmetric_and_zero_on_self() {
        let t = tree(TREE);
        let names = ["A", "B", "C", "D", "E", "F"];
        for pair in names.iter().combinations(2) {
            let (a, b) = (pair[0], pair[1]);
            assert_eq!(divergence(&t, a, b), divergence(&t, b, a), "{a} vs {b}");
        }
        for name in names {
            assert_eq!(divergence(&t, name, name), Some(0.0));
        }
    }

    #[test]
    fn test_unknown_names() {
        let t = tree(TREE);
        assert_eq!(divergence(&t, "A", "Z"), None);
        assert_eq!(divergence(&t, "Z", "A"), None);
        assert_eq!(divergence(&t, "Z", "Z"), None);
    }

    #[test]
    fn test_path_from_root() {
        let t = tree(TREE);
        let names = |path: Vec<NodeId>| -> Vec<String> {
            path.into_iter()
                .map(|id| t.get(id).unwrap().name().to_string())
                .collect()
        };
        assert_eq!(names(path_from_root(&t, "C")), vec!["F", "E", "C"]);
        assert_eq!(names(path_from_root(&t, "F")), vec!["F"]);
        assert!(path_from_root(&t, "Z").is_empty());
    }

    #[test]
    fn test_root_length_excluded() {
        let short = tree("(A:1,B:2)R:0;");
        let long = tree("(A:1,B:2)R:100;");
        assert_eq!(divergence(&short, "A", "R"), divergence(&long, "A", "R"));
        assert_eq!(divergence(&long, "R", "B"), Some(2.0));
    }

    #[test]
    fn test_uneven_depths() {
        //        R
        //      /   \
        //     X:1   C:4
        //    /  \
        //  A:2   B:3
        let t = tree("((A:2,B:3)X:1,C:4)R;");
        assert_eq!(divergence(&t, "A", "C"), Some(4.0));
        assert_eq!(divergence(&t, "B", "C"), Some(4.0));
        assert_eq!(divergence(&t, "A", "B"), Some(3.0));
        assert_eq!(divergence(&t, "R", "A"), Some(3.0));
        assert_eq!(divergence(&t, "X", "B"), Some(3.0));
    }

    #[test]
    fn test_anonymous_internal_nodes_are_addressable() {
        let t = tree("((A:1,B:1):2,C:1);");
        assert_eq!(divergence(&t, "node1", "A"), Some(1.0));
        assert_eq!(divergence(&t, "node2", "B"), Some(3.0));
    }

    #[test]
    fn test_deep_chain() {
        let depth = 2_000;
        let text = format!("{}A:1{})R;", "(".repeat(depth), "):1".repeat(depth - 1));
        let t = tree(&text);
        assert_eq!(path_from_root(&t, "A").len(), depth + 1);
        approx(divergence(&t, "R", "A"), depth as f64);
    }

    #[test]
    fn test_pairwise_divergences() {
        let t = tree(TREE);
        let names: Vec<String> = ["A", "B", "Z"].iter().map(|s| s.to_string()).collect();
        let pairs = pairwise_divergences(&t, &names);
        assert_eq!(pairs.len(), 3);
        assert_eq!(pairs[0].0, 0);
        assert_eq!(pairs[0].1, 1);
        approx(pairs[0].2, 0.2);
        assert_eq!(pairs[1], (0, 2, None));
        assert_eq!(pairs[2], (1, 2, None));
    }
}

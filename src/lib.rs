//! Crate root: lightweight module orchestration and public re-exports.
//!
//! Modules:
//! - `node` / `tree`: arena-backed rooted tree with a name index.
//! - `parser`: Newick string parser producing a `Tree`.
//! - `divergence`: root paths and pairwise divergence between named nodes.
//! - `io`: reading tree files and cancer rate tables, writing result CSVs.
//! - `experiments`: the parallel sweep for natural experiments.
//! - `error`: parse and I/O error types.
//! - `api`: Python bindings via `pyo3` (gated behind "python" feature).

pub mod divergence;
pub mod error;
pub mod experiments;
pub mod io;
pub mod node;
pub mod parser;
pub mod tree;

#[cfg(feature = "python")]
pub mod api;

// Re-export frequently used types & functions
pub use divergence::{divergence, path_from_root};
pub use error::{Error, MalformedTreeError, Result};
pub use experiments::{NaturalExperiment, Thresholds, identify};
pub use io::{CancerRate, RateColumn, load_tree, read_cancer_rates, write_results_csv};
pub use node::{Node, NodeId};
pub use parser::NewickParser;
pub use tree::Tree;

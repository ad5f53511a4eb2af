//! Error types for tree parsing and the surrounding file I/O.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Reasons a Newick string is rejected by [`NewickParser`](crate::parser::NewickParser).
///
/// Positions are byte offsets into the text handed to the parser, after the
/// surrounding whitespace and trailing `;` were stripped.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MalformedTreeError {
    #[error("tree string is empty")]
    Empty,

    #[error("unmatched ')' at byte {position}")]
    UnbalancedParentheses { position: usize },

    #[error("'(' at byte {position} is never closed")]
    UnclosedParenthesis { position: usize },

    #[error("empty subtree at byte {position}")]
    EmptySubtree { position: usize },

    #[error("unexpected text {fragment:?} at byte {position}")]
    UnexpectedText { position: usize, fragment: String },

    #[error("invalid branch length {value:?} in label {label:?}")]
    InvalidLength { label: String, value: String },
}

/// Crate-level error for everything past the parser: reading files,
/// locating columns, writing results.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    MalformedTree(#[from] MalformedTreeError),

    #[error("failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write {target}: {source}")]
    Write {
        target: String,
        #[source]
        source: io::Error,
    },

    #[error("no tree found in {0:?}")]
    NoTree(PathBuf),

    #[error("column {column:?} not found in rate table header")]
    MissingColumn { column: String },

    #[error("rate table is empty")]
    EmptyTable,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

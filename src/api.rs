//! Python binding layer for divergence queries and the natural experiment sweep.

use pyo3::exceptions::{PyIOError, PyValueError};
use pyo3::prelude::*;

use crate::divergence::pairwise_divergences;
use crate::error::Error;
use crate::experiments::{DEFAULT_MAX_DIVERGENCE, DEFAULT_MIN_DIFFERENCE, Thresholds, identify};
use crate::io::{RateColumn, load_tree, read_cancer_rates, tree_from_str};

fn to_py_err(err: Error) -> PyErr {
    match err {
        Error::Read { .. } | Error::Write { .. } => PyIOError::new_err(err.to_string()),
        _ => PyValueError::new_err(err.to_string()),
    }
}

/// Divergence between two named nodes of a Newick tree.
///
/// Args:
///     newick: Newick tree string (trailing ';' optional)
///     a: Name of the first node
///     b: Name of the second node
///
/// Returns:
///     The divergence as a float, or None if either name is not in the tree.
///
/// Raises:
///     ValueError: If the Newick string is malformed
#[pyfunction]
fn divergence(newick: &str, a: &str, b: &str) -> PyResult<Option<f64>> {
    let tree = tree_from_str(newick).map_err(to_py_err)?;
    Ok(crate::divergence::divergence(&tree, a, b))
}

/// Compute the pairwise divergence matrix for a list of node names.
///
/// Args:
///     newick: Newick tree string (trailing ';' optional)
///     names: Node names to compare
///
/// Returns:
///     A square matrix (list of lists) where entry [i][j] is the divergence
///     between names[i] and names[j], or None if either is not in the tree.
///     The diagonal is 0.0 for names present in the tree.
///
/// Raises:
///     ValueError: If the Newick string is malformed
#[pyfunction]
fn pairwise_divergence(newick: &str, names: Vec<String>) -> PyResult<Vec<Vec<Option<f64>>>> {
    let tree = tree_from_str(newick).map_err(to_py_err)?;

    let n = names.len();
    let mut matrix: Vec<Vec<Option<f64>>> = (0..n)
        .map(|i| {
            let known = tree.lookup(&names[i]).is_some();
            (0..n).map(|j| if i == j && known { Some(0.0) } else { None }).collect()
        })
        .collect();

    // Fill matrix (symmetric)
    for (i, j, dist) in pairwise_divergences(&tree, &names) {
        matrix[i][j] = dist;
        matrix[j][i] = dist;
    }

    Ok(matrix)
}

/// Identify recently diverged species pairs with different cancer rates.
///
/// Args:
///     tree_path: Path to a Newick tree file (first non-empty line is used)
///     rates_path: Path to a CSV/TSV cancer rate table with a Species column
///     malignant: Compare MalignancyRate instead of NeoplasiaRate (default: False)
///     max_divergence: Maximum divergence between reported species (default: 10.0)
///     min_difference: Minimum absolute rate difference (default: 0.2)
///     min_total: Ignore species with fewer records than this (default: 0)
///
/// Returns:
///     A list of (species_a, rate_a, species_b, rate_b, difference, divergence) tuples
///
/// Raises:
///     IOError: If a file cannot be read
///     ValueError: If the tree is malformed or the rate table lacks a column
#[pyfunction]
#[pyo3(signature = (
    tree_path,
    rates_path,
    malignant=false,
    max_divergence=DEFAULT_MAX_DIVERGENCE,
    min_difference=DEFAULT_MIN_DIFFERENCE,
    min_total=0
))]
fn natural_experiments(
    tree_path: String,
    rates_path: String,
    malignant: bool,
    max_divergence: f64,
    min_difference: f64,
    min_total: u32,
) -> PyResult<Vec<(String, f64, String, f64, f64, f64)>> {
    let tree = load_tree(&tree_path).map_err(to_py_err)?;
    let column = if malignant {
        RateColumn::Malignancy
    } else {
        RateColumn::Neoplasia
    };
    let rates = read_cancer_rates(&rates_path, column).map_err(to_py_err)?;

    let thresholds = Thresholds {
        max_divergence,
        min_difference,
        min_total,
    };
    Ok(identify(&tree, &rates, &thresholds)
        .into_iter()
        .map(|e| (e.species_a, e.rate_a, e.species_b, e.rate_b, e.difference, e.divergence))
        .collect())
}

/// Python module definition
#[pymodule]
#[pyo3(name = "natural_experiments")]
fn natural_experiments_py(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(divergence, m)?)?;
    m.add_function(wrap_pyfunction!(pairwise_divergence, m)?)?;
    m.add_function(wrap_pyfunction!(natural_experiments, m)?)?;
    Ok(())
}

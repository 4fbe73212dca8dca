//! Group elastic-net penalty of fitted coefficient rows.
//!
//! For each row β of a coefficient matrix (typically a path from the solver):
//!
//! ```text
//! Σ_g p_g ‖β_g‖₂ (α + ½ (1 − α) ‖β_g‖₂)
//! ```
//!
//! Rows are independent, so both the dense and the sparse variant split them
//! across a dedicated rayon pool when `n_threads > 1`.

use ndarray::{s, Array1, ArrayView1, ArrayView2, Axis};
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use sprs::{CsMatView, CsVecView};
use thiserror::Error;

use crate::solver::GroupPartition;

#[derive(Debug, Error)]
pub enum PenaltyError {
    #[error("coefficients have {found} columns, but the group partition covers {expected} features")]
    FeatureMismatch { expected: usize, found: usize },

    #[error("penalty has length {found}, expected one entry per group ({expected})")]
    PenaltyLength { expected: usize, found: usize },

    #[error("failed to build thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

#[inline]
fn group_term(sq_norm: f64, pg: f64, alpha: f64) -> f64 {
    let norm = sq_norm.sqrt();
    pg * norm * (alpha + 0.5 * (1.0 - alpha) * norm)
}

fn check_dims(
    n_cols: usize,
    partition: &GroupPartition,
    penalty: &[f64],
) -> Result<(), PenaltyError> {
    if n_cols != partition.n_features() {
        return Err(PenaltyError::FeatureMismatch {
            expected: partition.n_features(),
            found: n_cols,
        });
    }
    if penalty.len() != partition.n_groups() {
        return Err(PenaltyError::PenaltyLength {
            expected: partition.n_groups(),
            found: penalty.len(),
        });
    }
    Ok(())
}

/// Run `f` on a pool of `n_threads` workers, or inline when one is enough.
fn run_with_threads<T, F>(n_threads: usize, f: F) -> Result<T, PenaltyError>
where
    T: Send,
    F: FnOnce() -> T + Send,
{
    if n_threads <= 1 {
        return Ok(f());
    }
    let pool = ThreadPoolBuilder::new().num_threads(n_threads).build()?;
    Ok(pool.install(f))
}

fn dense_row_penalty(
    row: ArrayView1<f64>,
    partition: &GroupPartition,
    penalty: &[f64],
    alpha: f64,
) -> f64 {
    partition
        .iter()
        .zip(penalty.iter())
        .map(|((start, size), &pg)| {
            let block = row.slice(s![start..start + size]);
            group_term(block.dot(&block), pg, alpha)
        })
        .sum()
}

/// Row entries are visited in column order, which sprs guarantees for valid matrices.
fn sparse_row_penalty(
    row: CsVecView<f64>,
    partition: &GroupPartition,
    penalty: &[f64],
    alpha: f64,
) -> f64 {
    let mut total = 0.0;
    let mut g = 0;
    let mut sq_norm = 0.0;
    for (j, &val) in row.iter() {
        while j >= partition.start(g) + partition.size(g) {
            total += group_term(sq_norm, penalty[g], alpha);
            sq_norm = 0.0;
            g += 1;
        }
        sq_norm += val * val;
    }
    if sq_norm > 0.0 {
        total += group_term(sq_norm, penalty[g], alpha);
    }
    total
}

/// Penalty of every row of a dense `(n_rows × p)` coefficient matrix.
pub fn compute_penalty_dense(
    betas: ArrayView2<f64>,
    partition: &GroupPartition,
    penalty: &[f64],
    alpha: f64,
    n_threads: usize,
) -> Result<Array1<f64>, PenaltyError> {
    check_dims(betas.ncols(), partition, penalty)?;

    let out: Vec<f64> = run_with_threads(n_threads, || {
        betas
            .axis_iter(Axis(0))
            .into_par_iter()
            .map(|row| dense_row_penalty(row, partition, penalty, alpha))
            .collect()
    })?;
    Ok(Array1::from_vec(out))
}

/// Penalty of every row of a sparse coefficient matrix.
///
/// Column-compressed input is converted to row-compressed first.
pub fn compute_penalty_sparse(
    betas: CsMatView<f64>,
    partition: &GroupPartition,
    penalty: &[f64],
    alpha: f64,
    n_threads: usize,
) -> Result<Array1<f64>, PenaltyError> {
    check_dims(betas.cols(), partition, penalty)?;

    let converted;
    let csr = if betas.is_csr() {
        betas
    } else {
        converted = betas.to_csr();
        converted.view()
    };

    let out: Vec<f64> = run_with_threads(n_threads, || {
        (0..csr.rows())
            .into_par_iter()
            .map(|i| {
                csr.outer_view(i)
                    .map_or(0.0, |row| sparse_row_penalty(row, partition, penalty, alpha))
            })
            .collect()
    })?;
    Ok(Array1::from_vec(out))
}

// =============================================================================
// Python bindings
// =============================================================================

#[cfg(feature = "python")]
use numpy::{IntoPyArray, PyArray1, PyReadonlyArray1, PyReadonlyArray2};
#[cfg(feature = "python")]
use pyo3::exceptions::PyValueError;
#[cfg(feature = "python")]
use pyo3::prelude::*;
#[cfg(feature = "python")]
use sprs::CsMat;

#[cfg(feature = "python")]
impl From<PenaltyError> for PyErr {
    fn from(err: PenaltyError) -> PyErr {
        PyValueError::new_err(err.to_string())
    }
}

#[cfg(feature = "python")]
fn partition_from_py(groups: Vec<usize>, group_sizes: Vec<usize>) -> PyResult<GroupPartition> {
    GroupPartition::new(groups, group_sizes).map_err(|err| PyValueError::new_err(err.to_string()))
}

/// Group elastic-net penalty of each row of a dense coefficient matrix.
///
/// Parameters
/// ----------
/// betas : numpy.ndarray (float64), shape (n_rows, p)
/// groups, group_sizes : sequences of int
///     Start offset and size of each contiguous group.
/// penalty : numpy.ndarray (float64), shape (n_groups,)
/// alpha : float
///     Elastic-net mixing in [0, 1].
/// n_threads : int
///     Worker threads; 1 runs sequentially.
///
/// Returns
/// -------
/// numpy.ndarray (float64), shape (n_rows,)
#[cfg(feature = "python")]
#[pyfunction]
#[pyo3(signature = (betas, groups, group_sizes, penalty, alpha, n_threads=1))]
pub fn _compute_penalty_dense_rs<'py>(
    py: Python<'py>,
    betas: PyReadonlyArray2<f64>,
    groups: Vec<usize>,
    group_sizes: Vec<usize>,
    penalty: PyReadonlyArray1<f64>,
    alpha: f64,
    n_threads: usize,
) -> PyResult<Bound<'py, PyArray1<f64>>> {
    let partition = partition_from_py(groups, group_sizes)?;
    let betas_arr = betas.as_array();
    let penalty_vec = penalty.as_array().to_vec();

    let out = py.allow_threads(|| {
        compute_penalty_dense(betas_arr, &partition, &penalty_vec, alpha, n_threads)
    })?;
    Ok(out.into_pyarray(py))
}

/// Group elastic-net penalty of each row of a CSR coefficient matrix.
///
/// The matrix is passed as its scipy CSR components `(data, indices, indptr, shape)`.
#[cfg(feature = "python")]
#[pyfunction]
#[pyo3(signature = (data, indices, indptr, shape, groups, group_sizes, penalty, alpha, n_threads=1))]
#[allow(clippy::too_many_arguments)]
pub fn _compute_penalty_sparse_rs<'py>(
    py: Python<'py>,
    data: PyReadonlyArray1<f64>,
    indices: Vec<usize>,
    indptr: Vec<usize>,
    shape: (usize, usize),
    groups: Vec<usize>,
    group_sizes: Vec<usize>,
    penalty: PyReadonlyArray1<f64>,
    alpha: f64,
    n_threads: usize,
) -> PyResult<Bound<'py, PyArray1<f64>>> {
    let partition = partition_from_py(groups, group_sizes)?;
    let csr = CsMat::try_new(shape, indptr, indices, data.as_array().to_vec())
        .map_err(|(_, _, _, err)| PyValueError::new_err(err.to_string()))?;
    let penalty_vec = penalty.as_array().to_vec();

    let out = py.allow_threads(|| {
        compute_penalty_sparse(csr.view(), &partition, &penalty_vec, alpha, n_threads)
    })?;
    Ok(out.into_pyarray(py))
}

//! Group elastic-net path solver using naive Gaussian coordinate descent.
//!
//! Given a design `X`, a response `y`, a contiguous group partition and a
//! decreasing lambda path, the solver minimises for each lambda
//!
//! ```text
//! ½ ‖y − Xβ‖² + λ Σ_g p_g (α ‖β_g‖₂ + ½ (1 − α) ‖β_g‖₂²)
//! ```
//!
//! over the groups of a screened strong set. One sparse snapshot and one R²
//! value are appended per lambda. Within each group the columns are assumed
//! orthogonal, so `X_gᵀ X_g` is diagonal and stored as `strong_vars`.
//!
//! # Module Structure
//!
//! - [`types`]: Core data types
//!   - [`GroupPartition`]: Contiguous group layout
//!   - [`StrongSet`] / [`ActiveSet`]: Screened and currently nonzero groups
//!   - [`SolverState`] / [`SolverStateBuilder`]: Long-lived solver record
//!   - [`SolverConfig`]: Tolerances and iteration caps
//!   - [`SolverError`]: Everything a solve can fail with
//! - [`matrix`]: Design backends behind the [`GroupMatrix`] trait
//!   - Dense `ndarray` matrices and [`SparseDesign`] (CSC)
//! - [`newton`]: Per-group proximal update (soft threshold, bounded Newton)
//! - [`coordinate_descent`]: The path loop, [`solve`]
//! - [`multi_response`]: K-class responses through variable stacking
//!   - [`StackedMatrix`], [`MultiResponseStateBuilder`], [`solve_multi_response`]

pub mod coordinate_descent;
pub mod matrix;
pub mod multi_response;
pub mod newton;
pub mod types;

pub use coordinate_descent::{never_interrupt, solve, update_residual};
pub use matrix::{GroupMatrix, SparseDesign};
pub use multi_response::{
    solve_multi_response, stack_partition, stack_response, MultiResponseState,
    MultiResponseStateBuilder, StackedMatrix,
};
pub use newton::{block_norm_objective, compute_h_max, compute_h_min, group_prox, scalar_prox};
pub use types::{
    ActiveSet, ConvergenceState, Diagnostics, GroupKind, GroupPartition, SolverConfig,
    SolverError, SolverState, SolverStateBuilder, StrongSet,
};

use ndarray::Array2;
use sprs::CsVec;

/// Expand sparse path snapshots into a dense `(n_snapshots × width)` array.
pub fn dense_path(betas: &[CsVec<f64>], width: usize) -> Array2<f64> {
    let mut out = Array2::zeros((betas.len(), width));
    for (row, beta) in betas.iter().enumerate() {
        for (j, &val) in beta.iter() {
            out[[row, j]] = val;
        }
    }
    out
}

// =============================================================================
// Python bindings
// =============================================================================

#[cfg(feature = "python")]
use numpy::{PyArray1, PyArray2, PyReadonlyArray1, PyReadonlyArray2};
#[cfg(feature = "python")]
use pyo3::exceptions::PyValueError;
#[cfg(feature = "python")]
use pyo3::prelude::*;
#[cfg(feature = "python")]
use pyo3::types::PyDict;

#[cfg(feature = "python")]
fn to_py_err(err: SolverError) -> PyErr {
    PyValueError::new_err(err.to_string())
}

/// Gaussian group elastic-net path on a dense design.
///
/// Returns a dict with:
/// - "betas": Dense coefficient path (n_fitted × p)
/// - "rsqs": R² per fitted lambda
/// - "iters": Total coordinate sweeps
/// - "error": None on success, otherwise the message of the error that stopped the path
///
/// The path fitted before an error is still returned. Ctrl-C is honoured
/// between sweeps. Columns inside a group must be orthogonal; a correlated
/// group raises `ValueError` before any fitting.
#[cfg(feature = "python")]
#[pyfunction]
#[pyo3(signature = (
    x, y, groups, group_sizes, lmdas, alpha=1.0, penalty=None, strong_set=None,
    max_iters=100_000, tol=1e-7, rsq_slope_tol=1e-6, rsq_curv_tol=1e-6,
    newton_tol=1e-12, newton_max_iters=1000, display_progress=false
))]
#[allow(clippy::too_many_arguments)]
pub fn _solve_gaussian_rs<'py>(
    py: Python<'py>,
    x: PyReadonlyArray2<f64>,
    y: PyReadonlyArray1<f64>,
    groups: Vec<usize>,
    group_sizes: Vec<usize>,
    lmdas: Vec<f64>,
    alpha: f64,
    penalty: Option<Vec<f64>>,
    strong_set: Option<Vec<usize>>,
    max_iters: usize,
    tol: f64,
    rsq_slope_tol: f64,
    rsq_curv_tol: f64,
    newton_tol: f64,
    newton_max_iters: usize,
    display_progress: bool,
) -> PyResult<Bound<'py, PyDict>> {
    let x_arr = x.as_array();
    let partition = GroupPartition::new(groups, group_sizes).map_err(to_py_err)?;
    let config = SolverConfig {
        max_iters,
        tol,
        rsq_slope_tol,
        rsq_curv_tol,
        newton_tol,
        newton_max_iters,
        ..SolverConfig::default()
    };

    let mut builder = SolverStateBuilder::new(x_arr, partition)
        .alpha(alpha)
        .lmdas(lmdas)
        .response(y.as_array())
        .config(config);
    if let Some(penalty) = penalty {
        builder = builder.penalty(penalty);
    }
    if let Some(strong_set) = strong_set {
        builder = builder.strong_set(strong_set);
    }
    let mut state = builder.build().map_err(to_py_err)?;

    let result = solve(&mut state, display_progress, update_residual, || {
        py.check_signals().is_err()
    });

    let dict = PyDict::new(py);
    dict.set_item(
        "betas",
        PyArray2::from_owned_array(py, dense_path(state.betas(), x_arr.ncols())),
    )?;
    dict.set_item("rsqs", PyArray1::from_slice(py, state.rsqs()))?;
    dict.set_item("iters", state.iters())?;
    dict.set_item("error", result.err().map(|err| err.to_string()))?;
    Ok(dict)
}

/// Multi-response Gaussian group elastic-net path on a dense design.
///
/// `y` has shape (n, K). `penalty` and `strong_set` refer to the base groups.
///
/// Returns the same dict as `_solve_gaussian_rs`, with "betas" of width p·K
/// (column `j·K + k` is feature j, class k) and an extra "intercepts" array
/// of shape (n_fitted × K).
#[cfg(feature = "python")]
#[pyfunction]
#[pyo3(signature = (
    x, y, groups, group_sizes, lmdas, multi_intercept=true, alpha=1.0, penalty=None,
    strong_set=None, max_iters=100_000, tol=1e-7, rsq_slope_tol=1e-6, rsq_curv_tol=1e-6,
    newton_tol=1e-12, newton_max_iters=1000, display_progress=false
))]
#[allow(clippy::too_many_arguments)]
pub fn _solve_multigaussian_rs<'py>(
    py: Python<'py>,
    x: PyReadonlyArray2<f64>,
    y: PyReadonlyArray2<f64>,
    groups: Vec<usize>,
    group_sizes: Vec<usize>,
    lmdas: Vec<f64>,
    multi_intercept: bool,
    alpha: f64,
    penalty: Option<Vec<f64>>,
    strong_set: Option<Vec<usize>>,
    max_iters: usize,
    tol: f64,
    rsq_slope_tol: f64,
    rsq_curv_tol: f64,
    newton_tol: f64,
    newton_max_iters: usize,
    display_progress: bool,
) -> PyResult<Bound<'py, PyDict>> {
    let x_arr = x.as_array();
    let partition = GroupPartition::new(groups, group_sizes).map_err(to_py_err)?;
    let config = SolverConfig {
        max_iters,
        tol,
        rsq_slope_tol,
        rsq_curv_tol,
        newton_tol,
        newton_max_iters,
        ..SolverConfig::default()
    };

    let mut builder = MultiResponseStateBuilder::new(x_arr, partition, y.as_array())
        .multi_intercept(multi_intercept)
        .alpha(alpha)
        .lmdas(lmdas)
        .config(config);
    if let Some(penalty) = penalty {
        builder = builder.penalty(penalty);
    }
    if let Some(strong_set) = strong_set {
        builder = builder.strong_set(strong_set);
    }
    let mut state = builder.build().map_err(to_py_err)?;

    let result = solve_multi_response(&mut state, display_progress, update_residual, || {
        py.check_signals().is_err()
    });

    let width = x_arr.ncols() * state.n_classes();
    let dict = PyDict::new(py);
    dict.set_item(
        "betas",
        PyArray2::from_owned_array(py, dense_path(state.betas(), width)),
    )?;
    dict.set_item(
        "intercepts",
        PyArray2::from_owned_array(py, state.intercepts().clone()),
    )?;
    dict.set_item("rsqs", PyArray1::from_slice(py, state.rsqs()))?;
    dict.set_item("iters", state.stacked().iters())?;
    dict.set_item("error", result.err().map(|err| err.to_string()))?;
    Ok(dict)
}

/// Lower bound on the block-norm root; see [`compute_h_min`].
#[cfg(feature = "python")]
#[pyfunction]
pub fn _compute_h_min_rs(d: Vec<f64>, v: Vec<f64>, l1: f64) -> PyResult<f64> {
    check_same_length(&d, &v)?;
    Ok(compute_h_min(&d, &v, l1))
}

/// Upper bound on the block-norm root and the smallest nonzero curvature.
#[cfg(feature = "python")]
#[pyfunction]
#[pyo3(signature = (d, v, l1, zero_tol=1e-10))]
pub fn _compute_h_max_rs(d: Vec<f64>, v: Vec<f64>, l1: f64, zero_tol: f64) -> PyResult<(f64, f64)> {
    check_same_length(&d, &v)?;
    Ok(compute_h_max(&d, &v, l1, zero_tol))
}

/// `Σ v_i² / (d_i h + l1)² − 1`.
#[cfg(feature = "python")]
#[pyfunction]
pub fn _block_norm_objective_rs(h: f64, d: Vec<f64>, v: Vec<f64>, l1: f64) -> PyResult<f64> {
    check_same_length(&d, &v)?;
    Ok(block_norm_objective(h, &d, &v, l1))
}

#[cfg(feature = "python")]
fn check_same_length(d: &[f64], v: &[f64]) -> PyResult<()> {
    if d.len() != v.len() {
        return Err(to_py_err(SolverError::DimensionMismatch {
            what: "v",
            expected: d.len(),
            found: v.len(),
        }));
    }
    Ok(())
}

// =============================================================================
// Test helpers
// =============================================================================

#[cfg(test)]
pub(crate) mod testing {
    use super::GroupPartition;
    use ndarray::{Array1, Array2};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    /// Random regression problem whose columns are orthonormal within each group.
    pub struct Problem {
        pub x: Array2<f64>,
        pub y: Array1<f64>,
        pub partition: GroupPartition,
    }

    pub fn random_problem(n: usize, group_sizes: &[usize], seed: u64) -> Problem {
        let mut rng = StdRng::seed_from_u64(seed);
        let partition = GroupPartition::from_sizes(group_sizes).unwrap();
        let p = partition.n_features();

        let mut x = Array2::<f64>::zeros((n, p));
        x.mapv_inplace(|_| rng.gen_range(-1.0..1.0));

        // Gram-Schmidt inside each group, then unit norm
        for (start, size) in partition.iter() {
            for j in start..start + size {
                for prev in start..j {
                    let proj = x.column(j).dot(&x.column(prev));
                    let prev_col = x.column(prev).to_owned();
                    x.column_mut(j).scaled_add(-proj, &prev_col);
                }
                let norm = x.column(j).dot(&x.column(j)).sqrt();
                x.column_mut(j).mapv_inplace(|v| v / norm);
            }
        }

        let beta_true = Array1::from_shape_fn(p, |j| if j % 3 == 0 { 2.0 - j as f64 * 0.1 } else { 0.0 });
        let noise = Array1::from_shape_fn(n, |_| rng.gen_range(-0.1..0.1));
        let y = x.dot(&beta_true) + noise;

        Problem { x, y, partition }
    }

    /// Geometric path from the smallest all-zero lambda down to `min_ratio` of it.
    pub fn lambda_path(problem: &Problem, alpha: f64, n_lmdas: usize, min_ratio: f64) -> Vec<f64> {
        let lmda_max = problem
            .partition
            .iter()
            .map(|(start, size)| {
                (start..start + size)
                    .map(|j| problem.x.column(j).dot(&problem.y).powi(2))
                    .sum::<f64>()
                    .sqrt()
            })
            .fold(0.0, f64::max)
            / alpha;
        let step = min_ratio.powf(1.0 / (n_lmdas - 1) as f64);
        (0..n_lmdas).map(|i| lmda_max * step.powi(i as i32)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{lambda_path, random_problem, Problem};
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array1};
    use sprs::TriMat;

    fn tight_config() -> SolverConfig {
        SolverConfig {
            tol: 1e-14,
            ..SolverConfig::default()
        }
    }

    /// Largest violation of the group elastic-net optimality conditions.
    fn max_kkt_violation(problem: &Problem, beta: &Array1<f64>, lmda: f64, alpha: f64) -> f64 {
        let resid = &problem.y - &problem.x.dot(beta);
        let mut worst: f64 = 0.0;
        for (start, size) in problem.partition.iter() {
            let grad: Vec<f64> = (start..start + size)
                .map(|j| problem.x.column(j).dot(&resid))
                .collect();
            let block = beta.slice(ndarray::s![start..start + size]);
            let b_norm = block.dot(&block).sqrt();
            let l1 = lmda * alpha;
            let l2 = lmda * (1.0 - alpha);

            if b_norm == 0.0 {
                let g_norm = grad.iter().map(|g| g * g).sum::<f64>().sqrt();
                worst = worst.max(g_norm - l1);
            } else {
                for (gr, &b) in grad.iter().zip(block.iter()) {
                    worst = worst.max((gr - l1 * b / b_norm - l2 * b).abs());
                }
            }
        }
        worst
    }

    #[test]
    fn test_path_rsq_monotone_and_kkt() {
        let problem = random_problem(60, &[1, 3, 2, 1, 4], 42);
        let lmdas = lambda_path(&problem, 1.0, 8, 0.02);
        let mut state = SolverStateBuilder::new(&problem.x, problem.partition.clone())
            .lmdas(lmdas.clone())
            .response(problem.y.view())
            .config(tight_config())
            .build()
            .unwrap();

        solve(&mut state, false, update_residual, never_interrupt).unwrap();

        assert_eq!(state.betas().len(), lmdas.len());
        assert_eq!(state.rsqs().len(), lmdas.len());
        assert_eq!(state.betas()[0].nnz(), 0, "lambda_max should give the zero solution");
        for w in state.rsqs().windows(2) {
            assert!(w[1] >= w[0] - 1e-10, "rsq should not decrease along the path");
        }

        let last = state.betas().last().unwrap().to_dense();
        let violation = max_kkt_violation(&problem, &last, *lmdas.last().unwrap(), 1.0);
        assert!(violation < 1e-5, "KKT violation {violation}");

        // running R² agrees with the explicit residual
        let resid = &problem.y - &problem.x.dot(&last);
        let rsq = 1.0 - resid.dot(&resid) / problem.y.dot(&problem.y);
        assert_abs_diff_eq!(*state.rsqs().last().unwrap(), rsq, epsilon = 1e-8);
    }

    #[test]
    fn test_elastic_net_kkt() {
        let problem = random_problem(50, &[2, 2, 1, 3], 3);
        let lmdas = lambda_path(&problem, 0.5, 5, 0.05);
        let mut state = SolverStateBuilder::new(&problem.x, problem.partition.clone())
            .alpha(0.5)
            .lmdas(lmdas.clone())
            .response(problem.y.view())
            .config(tight_config())
            .build()
            .unwrap();

        solve(&mut state, false, update_residual, never_interrupt).unwrap();

        for (beta, &lmda) in state.betas().iter().zip(lmdas.iter()) {
            let violation = max_kkt_violation(&problem, &beta.to_dense(), lmda, 0.5);
            assert!(violation < 1e-5, "KKT violation {violation} at lambda {lmda}");
        }
    }

    #[test]
    fn test_group_below_threshold_stays_inactive() {
        let x = array![[1.0], [0.0], [0.0], [0.0]];
        let y = array![0.5, 1.0, 0.0, 0.0];
        let mut state = SolverStateBuilder::new(&x, GroupPartition::from_sizes(&[1]).unwrap())
            .lmdas(vec![1.0])
            .response(y.view())
            .build()
            .unwrap();

        solve(&mut state, false, update_residual, never_interrupt).unwrap();

        assert!(state.active().is_empty());
        assert_eq!(state.betas()[0].nnz(), 0);
        assert_eq!(state.rsqs(), &[0.0]);
    }

    #[test]
    fn test_active_groups_stay_inside_strong_set() {
        let problem = random_problem(40, &[2, 1, 3, 2], 11);
        let lmdas = lambda_path(&problem, 1.0, 5, 0.01);
        let mut state = SolverStateBuilder::new(&problem.x, problem.partition.clone())
            .strong_set(vec![2, 0])
            .lmdas(lmdas)
            .response(problem.y.view())
            .build()
            .unwrap();

        solve(&mut state, false, update_residual, never_interrupt).unwrap();

        let allowed: Vec<usize> = (0..2).chain(3..6).collect();
        for beta in state.betas() {
            assert!(beta.indices().iter().all(|j| allowed.contains(j)));
            assert!(beta.indices().windows(2).all(|w| w[0] < w[1]), "indices must be sorted");
        }
        assert!(state.active().len() <= state.strong().len());
    }

    #[test]
    fn test_resolve_at_converged_lambda_is_stable() {
        let problem = random_problem(30, &[1, 2, 2], 5);
        let lmdas = lambda_path(&problem, 1.0, 4, 0.1);
        let mut state = SolverStateBuilder::new(&problem.x, problem.partition.clone())
            .lmdas(vec![lmdas[3]])
            .response(problem.y.view())
            .config(tight_config())
            .build()
            .unwrap();
        solve(&mut state, false, update_residual, never_interrupt).unwrap();

        let mut again = state.clone();
        solve(&mut again, false, update_residual, never_interrupt).unwrap();

        assert_eq!(again.betas().len(), 2);
        let first = again.betas()[0].to_dense();
        let second = again.betas()[1].to_dense();
        for (a, b) in first.iter().zip(second.iter()) {
            assert_abs_diff_eq!(a, b, epsilon = 1e-8);
        }
        assert_eq!(state.betas().len(), 1, "solving the clone leaves the source state untouched");
    }

    #[test]
    fn test_independent_solves_are_identical() {
        let problem = random_problem(45, &[2, 1, 3, 2], 17);
        let lmdas = lambda_path(&problem, 0.8, 6, 0.05);
        let state = SolverStateBuilder::new(&problem.x, problem.partition.clone())
            .alpha(0.8)
            .lmdas(lmdas)
            .response(problem.y.view())
            .build()
            .unwrap();

        let mut first = state.clone();
        let mut second = state.clone();
        solve(&mut first, false, update_residual, never_interrupt).unwrap();
        solve(&mut second, false, update_residual, never_interrupt).unwrap();

        assert_eq!(first.betas(), second.betas(), "same input state must give the same path");
        assert_eq!(first.rsqs(), second.rsqs());
        assert_eq!(first.iters(), second.iters());
        assert!(state.betas().is_empty(), "the source state is never solved");
    }

    #[test]
    fn test_newton_cap_keeps_full_path() {
        let problem = random_problem(50, &[3, 4, 2, 5], 8);
        let lmdas = lambda_path(&problem, 1.0, 6, 0.05);
        let mut state = SolverStateBuilder::new(&problem.x, problem.partition.clone())
            .lmdas(lmdas.clone())
            .response(problem.y.view())
            .config(SolverConfig {
                newton_max_iters: 1,
                newton_tol: 0.0,
                ..SolverConfig::default()
            })
            .build()
            .unwrap();

        solve(&mut state, false, update_residual, never_interrupt)
            .expect("an unconverged block update is not a solver error");

        assert_eq!(state.betas().len(), lmdas.len());
        assert_eq!(state.rsqs().len(), lmdas.len());
        assert!(
            state.diagnostics().newton_failures > 0,
            "every block update should hit the one-step cap"
        );
        assert!(state.betas().last().unwrap().nnz() > 0);
    }

    #[test]
    fn test_zeroed_group_kept_active_without_eviction() {
        let x = array![[1.0, 0.0], [0.0, 1.0], [0.0, 0.0]];
        let y = array![2.0, 0.1, 0.0];
        let partition = GroupPartition::from_sizes(&[1, 1]).unwrap();
        // warm start at (2, 1): group 1 then sees v = 0.1 and is thresholded to zero
        let build = |evict_zeroed| {
            SolverStateBuilder::new(&x, partition.clone())
                .strong_beta(vec![2.0, 1.0])
                .lmdas(vec![1.0])
                .response(y.view())
                .config(SolverConfig {
                    evict_zeroed,
                    ..SolverConfig::default()
                })
                .build()
                .unwrap()
        };

        let mut kept = build(false);
        solve(&mut kept, false, update_residual, never_interrupt).unwrap();
        assert!(kept.active().is_active(1), "zeroed group stays active");
        assert_eq!(kept.active().len(), 2);
        assert_eq!(kept.betas()[0].indices(), &[0]);
        assert_abs_diff_eq!(kept.betas()[0].data()[0], 1.0, epsilon = 1e-12);

        let mut evicted = build(true);
        solve(&mut evicted, false, update_residual, never_interrupt).unwrap();
        assert!(!evicted.active().is_active(1));
        assert_eq!(evicted.active().len(), 1);
        assert_eq!(evicted.betas(), kept.betas());
    }

    #[test]
    fn test_max_iters_keeps_partial_path() {
        let problem = random_problem(40, &[1, 2, 1, 2], 9);
        let lmdas = lambda_path(&problem, 1.0, 10, 0.01);
        let mut state = SolverStateBuilder::new(&problem.x, problem.partition.clone())
            .lmdas(lmdas)
            .response(problem.y.view())
            .config(SolverConfig {
                max_iters: 3,
                ..SolverConfig::default()
            })
            .build()
            .unwrap();

        let err = solve(&mut state, false, update_residual, never_interrupt).unwrap_err();
        match err {
            SolverError::MaxIterationsExceeded {
                max_iters,
                lmda_index,
            } => {
                assert_eq!(max_iters, 3);
                assert_eq!(state.betas().len(), lmda_index);
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(state.betas().len(), state.rsqs().len());
        assert_eq!(state.iters(), 3);
    }

    #[test]
    fn test_user_interrupt() {
        let problem = random_problem(30, &[1, 2], 1);
        let lmdas = lambda_path(&problem, 1.0, 5, 0.05);
        let mut state = SolverStateBuilder::new(&problem.x, problem.partition.clone())
            .lmdas(lmdas)
            .response(problem.y.view())
            .build()
            .unwrap();

        let mut polls = 0;
        let result = solve(&mut state, false, update_residual, || {
            polls += 1;
            polls > 2
        });

        assert!(matches!(result, Err(SolverError::UserInterrupted { .. })));
        assert_eq!(state.betas().len(), state.rsqs().len());
        assert_eq!(state.iters(), 2);
    }

    #[test]
    fn test_sparse_backend_matches_dense() {
        let problem = random_problem(35, &[2, 1, 3], 21);
        let lmdas = lambda_path(&problem, 1.0, 5, 0.05);

        let mut tri = TriMat::new(problem.x.dim());
        for ((i, j), &v) in problem.x.indexed_iter() {
            tri.add_triplet(i, j, v);
        }
        let sparse = SparseDesign::new(tri.to_csc());

        let mut dense_state = SolverStateBuilder::new(&problem.x, problem.partition.clone())
            .lmdas(lmdas.clone())
            .response(problem.y.view())
            .config(tight_config())
            .build()
            .unwrap();
        let mut sparse_state = SolverStateBuilder::new(sparse, problem.partition.clone())
            .lmdas(lmdas)
            .response(problem.y.view())
            .config(tight_config())
            .build()
            .unwrap();

        solve(&mut dense_state, false, update_residual, never_interrupt).unwrap();
        solve(&mut sparse_state, false, update_residual, never_interrupt).unwrap();

        let from_dense = dense_path(dense_state.betas(), 6);
        let from_sparse = dense_path(sparse_state.betas(), sparse_state.partition().n_features());
        for (a, b) in from_dense.iter().zip(from_sparse.iter()) {
            assert_abs_diff_eq!(a, b, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_custom_update_function_is_used() {
        let problem = random_problem(20, &[1, 1], 2);
        let lmdas = lambda_path(&problem, 1.0, 3, 0.1);
        let mut state = SolverStateBuilder::new(&problem.x, problem.partition.clone())
            .lmdas(lmdas)
            .response(problem.y.view())
            .build()
            .unwrap();

        let mut calls = 0usize;
        solve(
            &mut state,
            false,
            |m: &&ndarray::Array2<f64>, begin: usize, delta: &[f64], resid: &mut [f64]| {
                calls += 1;
                update_residual(m, begin, delta, resid);
            },
            never_interrupt,
        )
        .unwrap();

        assert!(calls > 0);
        assert!(state.diagnostics().time_strong_cd.len() >= 3);
    }
}

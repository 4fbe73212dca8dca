pub mod penalty;
pub mod solver;

#[cfg(feature = "python")]
use pyo3::prelude::*;

#[cfg(feature = "python")]
#[pymodule]
fn _grouplasso_impl(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_wrapped(wrap_pyfunction!(solver::_solve_gaussian_rs))?;
    m.add_wrapped(wrap_pyfunction!(solver::_solve_multigaussian_rs))?;
    m.add_wrapped(wrap_pyfunction!(solver::_compute_h_min_rs))?;
    m.add_wrapped(wrap_pyfunction!(solver::_compute_h_max_rs))?;
    m.add_wrapped(wrap_pyfunction!(solver::_block_norm_objective_rs))?;
    m.add_wrapped(wrap_pyfunction!(penalty::_compute_penalty_dense_rs))?;
    m.add_wrapped(wrap_pyfunction!(penalty::_compute_penalty_sparse_rs))?;
    Ok(())
}

//! Per-group proximal update for the group elastic-net penalty.
//!
//! For one group with diagonal curvature `vars`, linear term `v` and penalty
//! strengths `l1 = λ α p_g`, `l2 = λ (1 − α) p_g`, the update minimises
//!
//! ```text
//! ½ βᵀ diag(vars) β − vᵀ β + l1 ‖β‖₂ + ½ l2 ‖β‖₂²
//! ```
//!
//! With `D = vars + l2`, the nonzero solution has the form
//! `β_i = h v_i / (D_i h + l1)` where `h = ‖β‖₂` is the root of
//!
//! ```text
//! φ(h) = Σ v_i² / (D_i h + l1)² − 1
//! ```
//!
//! `φ` is convex and decreasing on `h > 0`, so Newton started at the lower
//! bound [`compute_h_min`] moves monotonically towards the root.

use crate::solver::types::ConvergenceState;

/// Outcome of one block proximal solve.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProxOutcome {
    /// Newton steps taken (0 for closed-form cases).
    pub iters: usize,
    pub convergence: ConvergenceState,
}

impl ProxOutcome {
    const CLOSED_FORM: Self = Self {
        iters: 0,
        convergence: ConvergenceState::Converged,
    };
}

/// Closed-form update for a size-1 group: soft threshold then ridge shrinkage.
#[inline]
pub fn scalar_prox(v: f64, var: f64, l1: f64, l2: f64) -> f64 {
    let abs_v = v.abs();
    let denom = var + l2;
    if abs_v <= l1 || denom <= 0.0 {
        return 0.0;
    }
    v.signum() * (abs_v - l1) / denom
}

/// `φ(h)`, whose root is the norm of the block proximal solution.
pub fn block_norm_objective(h: f64, d: &[f64], v: &[f64], l1: f64) -> f64 {
    d.iter()
        .zip(v.iter())
        .map(|(&di, &vi)| {
            let ratio = vi / (di * h + l1);
            ratio * ratio
        })
        .sum::<f64>()
        - 1.0
}

/// Lower bound on the root of `φ`: `(‖v‖ − l1) / max(D)`.
pub fn compute_h_min(d: &[f64], v: &[f64], l1: f64) -> f64 {
    let v_norm = v.iter().map(|x| x * x).sum::<f64>().sqrt();
    let d_max = d.iter().copied().fold(0.0, f64::max);
    if d_max <= 0.0 {
        return 0.0;
    }
    ((v_norm - l1) / d_max).max(0.0)
}

/// Upper bound on the root of `φ`, and the smallest `D_i` above `zero_tol`.
///
/// Coordinates with `D_i <= zero_tol` contribute the constant `v_i² / l1²`.
/// When those already reach 1 the root is unbounded and `f64::INFINITY` is returned.
pub fn compute_h_max(d: &[f64], v: &[f64], l1: f64, zero_tol: f64) -> (f64, f64) {
    let mut v_zero_sq = 0.0;
    let mut v_nonzero_sq = 0.0;
    let mut d_min_nonzero = f64::INFINITY;
    for (&di, &vi) in d.iter().zip(v.iter()) {
        if di <= zero_tol {
            v_zero_sq += vi * vi;
        } else {
            v_nonzero_sq += vi * vi;
            d_min_nonzero = d_min_nonzero.min(di);
        }
    }

    if d_min_nonzero.is_infinite() {
        return (f64::INFINITY, d_min_nonzero);
    }
    let remaining = if l1 > 0.0 {
        1.0 - v_zero_sq / (l1 * l1)
    } else if v_zero_sq > 0.0 {
        0.0
    } else {
        1.0
    };
    if remaining <= 0.0 {
        return (f64::INFINITY, d_min_nonzero);
    }
    (v_nonzero_sq.sqrt() / (d_min_nonzero * remaining.sqrt()), d_min_nonzero)
}

/// Block proximal update for a group of size > 1.
///
/// # Arguments
///
/// * `vars` - Diagonal curvature of the group
/// * `v` - Linear term `vars·β_old + X_gᵀ r`
/// * `l1`, `l2` - Group lasso and ridge strengths at the current lambda
/// * `buffer` - Scratch of the group size, holds `D = vars + l2`
/// * `out` - Receives the updated coefficients
///
/// Hitting `newton_max_iters` is not fatal: the last iterate is written to `out`
/// and the outcome is flagged [`ConvergenceState::NotConverged`].
#[allow(clippy::too_many_arguments)]
pub fn group_prox(
    vars: &[f64],
    v: &[f64],
    l1: f64,
    l2: f64,
    newton_tol: f64,
    newton_max_iters: usize,
    buffer: &mut [f64],
    out: &mut [f64],
) -> ProxOutcome {
    debug_assert_eq!(vars.len(), v.len());
    debug_assert_eq!(out.len(), v.len());

    let v_norm = v.iter().map(|x| x * x).sum::<f64>().sqrt();
    if v_norm <= l1 {
        out.fill(0.0);
        return ProxOutcome::CLOSED_FORM;
    }

    let d = &mut buffer[..v.len()];
    for (di, &var) in d.iter_mut().zip(vars.iter()) {
        *di = var + l2;
    }

    // Unpenalized group: plain ridge-scaled solution
    if l1 <= 0.0 {
        for ((o, &di), &vi) in out.iter_mut().zip(d.iter()).zip(v.iter()) {
            *o = if di > 0.0 { vi / di } else { 0.0 };
        }
        return ProxOutcome::CLOSED_FORM;
    }

    let h_min = compute_h_min(d, v, l1);
    let (h_max, _) = compute_h_max(d, v, l1, 1e-10);

    let mut h = h_min;
    let mut outcome = ProxOutcome {
        iters: 0,
        convergence: ConvergenceState::NotConverged,
    };
    for iter in 1..=newton_max_iters {
        let mut phi = -1.0;
        let mut dphi = 0.0;
        for (&di, &vi) in d.iter().zip(v.iter()) {
            let denom = di * h + l1;
            let ratio = vi / denom;
            phi += ratio * ratio;
            dphi -= 2.0 * ratio * ratio * di / denom;
        }
        outcome.iters = iter;
        if dphi == 0.0 {
            outcome.convergence = ConvergenceState::Converged;
            break;
        }
        let h_next = (h - phi / dphi).max(h_min).min(h_max);
        let step = (h_next - h).abs();
        h = h_next;
        if step < newton_tol {
            outcome.convergence = ConvergenceState::Converged;
            break;
        }
    }

    for ((o, &di), &vi) in out.iter_mut().zip(d.iter()).zip(v.iter()) {
        *o = h * vi / (di * h + l1);
    }
    outcome
}

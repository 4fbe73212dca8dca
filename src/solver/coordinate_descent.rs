//! Coordinate-descent path solver over a [`SolverState`].
//!
//! For each lambda in input order the solver alternates two phases:
//!
//! 1. **Active loop**: repeated sweeps over the currently nonzero groups only.
//!    Cheap, and usually where most of the work happens.
//! 2. **Strong sweep**: one pass over every screened group, admitting groups
//!    that become nonzero and evicting those driven back to exactly zero.
//!
//! A lambda is converged once a strong sweep admits nothing and moves no
//! coefficient by more than `tol`. Its solution is then appended to the path.
//!
//! The loop is strictly sequential: each group update changes the residual
//! that the next group reads.

use std::time::Instant;

use crate::solver::matrix::GroupMatrix;
use crate::solver::newton::{group_prox, scalar_prox};
use crate::solver::types::{
    ActiveSet, ConvergenceState, GroupKind, GroupPartition, SolverConfig, SolverError,
    SolverState, StrongSet,
};

/// Standard residual update: `resid -= X[:, begin..] · delta`.
pub fn update_residual<M: GroupMatrix>(matrix: &M, begin: usize, delta: &[f64], resid: &mut [f64]) {
    matrix.apply_block_sub(begin, delta, resid);
}

/// Interrupt check that never fires.
pub fn never_interrupt() -> bool {
    false
}

/// Fit every lambda of `state.lmdas`, appending one snapshot per lambda.
///
/// # Arguments
///
/// * `display_progress` - Log one `info` line per converged lambda
/// * `update_coefficients_f` - Folds a group's coefficient delta into the residual;
///   called as `f(matrix, column_begin, delta, resid)`. Use [`update_residual`]
///   unless the backend keeps extra caches.
/// * `check_user_interrupt` - Polled before every sweep; returning `true` stops
///   the solve with [`SolverError::UserInterrupted`]
///
/// # Errors
///
/// [`SolverError::MaxIterationsExceeded`] and [`SolverError::UserInterrupted`].
/// In both cases every snapshot appended so far stays valid.
pub fn solve<M, F, I>(
    state: &mut SolverState<M>,
    display_progress: bool,
    mut update_coefficients_f: F,
    mut check_user_interrupt: I,
) -> Result<(), SolverError>
where
    M: GroupMatrix,
    F: FnMut(&M, usize, &[f64], &mut [f64]),
    I: FnMut() -> bool,
{
    let mut workspace = Workspace::new(state.strong.max_group_size());
    let n_lmdas = state.lmdas.len();

    for lmda_index in 0..n_lmdas {
        let lmda = state.lmdas[lmda_index];
        fit_lambda(
            state,
            lmda_index,
            lmda,
            &mut workspace,
            &mut update_coefficients_f,
            &mut check_user_interrupt,
        )?;

        let beta = state.snapshot();
        if display_progress {
            log::info!(
                "lambda {}/{} = {:.6e}: rsq = {:.6}, active groups = {}, nnz = {}, sweeps = {}",
                lmda_index + 1,
                n_lmdas,
                lmda,
                state.rsq,
                state.active.len(),
                beta.nnz(),
                state.iters
            );
        }
        state.betas.push(beta);
        state.rsqs.push(state.rsq);
    }
    Ok(())
}

/// Outer strong/active alternation for one lambda.
fn fit_lambda<M, F, I>(
    state: &mut SolverState<M>,
    lmda_index: usize,
    lmda: f64,
    workspace: &mut Workspace,
    update_f: &mut F,
    check_user_interrupt: &mut I,
) -> Result<(), SolverError>
where
    M: GroupMatrix,
    F: FnMut(&M, usize, &[f64], &mut [f64]),
    I: FnMut() -> bool,
{
    let SolverState {
        matrix,
        partition,
        alpha,
        penalty,
        strong,
        y_var,
        config,
        resid,
        rsq,
        strong_beta,
        strong_grad,
        active,
        iters,
        diagnostics,
        ..
    } = state;

    let mut sweeper = Sweeper {
        matrix: &*matrix,
        partition: &*partition,
        strong: &*strong,
        penalty: penalty.as_slice(),
        alpha: *alpha,
        y_var: *y_var,
        config: &*config,
        lmda,
        resid: resid.as_mut_slice(),
        strong_beta: strong_beta.as_mut_slice(),
        strong_grad: strong_grad.as_mut_slice(),
        rsq,
        workspace,
        update_f,
    };

    let mut round = 0usize;
    loop {
        round += 1;

        let start = Instant::now();
        let active_sweeps =
            sweeper.active_loop(active, iters, lmda_index, check_user_interrupt)?;
        diagnostics.time_active_cd.push(start.elapsed().as_secs_f64());

        let start = Instant::now();
        begin_sweep(iters, config.max_iters, lmda_index, check_user_interrupt)?;
        let summary = sweeper.strong_sweep(active);
        diagnostics.time_strong_cd.push(start.elapsed().as_secs_f64());
        diagnostics.newton_failures += summary.newton_failures;

        log::debug!(
            "lambda {lmda_index} round {round}: {active_sweeps} active sweeps, strong sweep admitted {} evicted {} (measure {:.3e})",
            summary.admitted,
            summary.evicted,
            summary.measure
        );

        if summary.admitted == 0 && summary.measure < config.tol {
            return Ok(());
        }
    }
}

/// Poll for interruption and charge one sweep against `max_iters`.
#[inline]
fn begin_sweep<I: FnMut() -> bool>(
    iters: &mut usize,
    max_iters: usize,
    lmda_index: usize,
    check_user_interrupt: &mut I,
) -> Result<(), SolverError> {
    if check_user_interrupt() {
        return Err(SolverError::UserInterrupted { lmda_index });
    }
    if *iters >= max_iters {
        return Err(SolverError::MaxIterationsExceeded {
            max_iters,
            lmda_index,
        });
    }
    *iters += 1;
    Ok(())
}

/// Whether the last three sweep-end R² values have flattened out.
///
/// `history` is ordered oldest first.
#[inline]
fn rsq_plateau(history: [f64; 3], config: &SolverConfig) -> bool {
    let [rsq_l, rsq_m, rsq_u] = history;
    let slope = (rsq_u - rsq_m).abs();
    let curvature = (rsq_u - 2.0 * rsq_m + rsq_l).abs();
    slope <= config.rsq_slope_tol * rsq_u.abs() && curvature <= config.rsq_curv_tol
}

// =============================================================================
// Workspace
// =============================================================================

/// Scratch buffers sized to the largest strong group, reused across groups.
struct Workspace {
    v: Vec<f64>,
    delta: Vec<f64>,
    prox_out: Vec<f64>,
    prox_buffer: Vec<f64>,
}

impl Workspace {
    fn new(max_group_size: usize) -> Self {
        Self {
            v: vec![0.0; max_group_size],
            delta: vec![0.0; max_group_size],
            prox_out: vec![0.0; max_group_size],
            prox_buffer: vec![0.0; max_group_size],
        }
    }
}

// =============================================================================
// Sweeper
// =============================================================================

/// Result of updating one group.
#[derive(Clone, Copy)]
struct GroupStep {
    /// `Σ vars·δ²` for this group.
    measure: f64,
    /// Block is nonzero after the update.
    nonzero: bool,
    newton: ConvergenceState,
}

#[derive(Clone, Copy, Default)]
struct SweepSummary {
    measure: f64,
    admitted: usize,
    evicted: usize,
    newton_failures: usize,
}

impl SweepSummary {
    #[inline]
    fn absorb(&mut self, step: GroupStep) {
        self.measure = self.measure.max(step.measure);
        if step.newton == ConvergenceState::NotConverged {
            self.newton_failures += 1;
        }
    }
}

/// Disjoint borrows of the state fields touched by a sweep.
///
/// The active set and iteration counter stay outside so that sweeps can
/// iterate the active order while mutating coefficients.
struct Sweeper<'s, M, F> {
    matrix: &'s M,
    partition: &'s GroupPartition,
    strong: &'s StrongSet,
    penalty: &'s [f64],
    alpha: f64,
    y_var: f64,
    config: &'s SolverConfig,
    lmda: f64,
    resid: &'s mut [f64],
    strong_beta: &'s mut [f64],
    strong_grad: &'s mut [f64],
    rsq: &'s mut f64,
    workspace: &'s mut Workspace,
    update_f: &'s mut F,
}

impl<M, F> Sweeper<'_, M, F>
where
    M: GroupMatrix,
    F: FnMut(&M, usize, &[f64], &mut [f64]),
{
    /// Coordinate update of strong position `s`.
    fn update_group(&mut self, s: usize) -> GroupStep {
        let g = self.strong.groups[s];
        let column_begin = self.partition.start(g);
        let range = self.strong.buffer_range(s);
        let size = range.len();

        let vars = &self.strong.vars[range.clone()];
        let pg = self.penalty[g];
        let l1 = self.lmda * self.alpha * pg;
        let l2 = self.lmda * (1.0 - self.alpha) * pg;

        let grad = &mut self.strong_grad[range.clone()];
        self.matrix.apply_block_t(column_begin, &*self.resid, grad);

        let beta = &mut self.strong_beta[range];
        let delta = &mut self.workspace.delta[..size];
        let mut newton = ConvergenceState::Converged;

        match self.strong.kind(s) {
            GroupKind::Scalar => {
                let old = beta[0];
                let new = scalar_prox(vars[0] * old + grad[0], vars[0], l1, l2);
                delta[0] = new - old;
                beta[0] = new;
            }
            GroupKind::Block => {
                let v = &mut self.workspace.v[..size];
                for (((vi, &var), &b), &gr) in v.iter_mut().zip(vars).zip(beta.iter()).zip(grad.iter()) {
                    *vi = var * b + gr;
                }
                let new = &mut self.workspace.prox_out[..size];
                let outcome = group_prox(
                    vars,
                    v,
                    l1,
                    l2,
                    self.config.newton_tol,
                    self.config.newton_max_iters,
                    &mut self.workspace.prox_buffer[..size],
                    new,
                );
                if outcome.convergence == ConvergenceState::NotConverged {
                    log::warn!(
                        "newton sub-solve for group {g} stopped after {} iterations at lambda {:.6e}",
                        outcome.iters,
                        self.lmda
                    );
                }
                newton = outcome.convergence;
                for ((d, b), &n) in delta.iter_mut().zip(beta.iter_mut()).zip(new.iter()) {
                    *d = n - *b;
                    *b = n;
                }
            }
        }

        let nonzero = beta.iter().any(|&b| b != 0.0);
        if delta.iter().all(|&d| d == 0.0) {
            return GroupStep {
                measure: 0.0,
                nonzero,
                newton,
            };
        }

        // RSS changes by −2 δᵀ(X_gᵀ r) + δᵀ diag(vars) δ
        let mut rsq_gain = 0.0;
        let mut measure = 0.0;
        for ((&d, &gr), &var) in delta.iter().zip(grad.iter()).zip(vars) {
            rsq_gain += d * (2.0 * gr - var * d);
            measure += var * d * d;
        }
        *self.rsq += rsq_gain / self.y_var;

        (self.update_f)(self.matrix, column_begin, delta, &mut *self.resid);

        GroupStep {
            measure,
            nonzero,
            newton,
        }
    }

    /// One pass over the active groups in `active.order`.
    fn active_sweep(&mut self, active: &ActiveSet) -> SweepSummary {
        let mut summary = SweepSummary::default();
        for &s in &active.order {
            let step = self.update_group(s);
            summary.absorb(step);
        }
        summary
    }

    /// Sweep active groups until the change or the R² curve flattens.
    ///
    /// Returns the number of sweeps performed.
    fn active_loop<I: FnMut() -> bool>(
        &mut self,
        active: &ActiveSet,
        iters: &mut usize,
        lmda_index: usize,
        check_user_interrupt: &mut I,
    ) -> Result<usize, SolverError> {
        if active.is_empty() {
            return Ok(0);
        }

        let mut history = [*self.rsq; 3];
        let mut sweeps = 0usize;
        loop {
            begin_sweep(iters, self.config.max_iters, lmda_index, check_user_interrupt)?;
            let summary = self.active_sweep(active);
            sweeps += 1;

            if summary.measure < self.config.tol {
                return Ok(sweeps);
            }

            history = [history[1], history[2], *self.rsq];
            if sweeps >= 2 && rsq_plateau(history, self.config) {
                return Ok(sweeps);
            }
        }
    }

    /// One pass over every strong group, updating active membership.
    fn strong_sweep(&mut self, active: &mut ActiveSet) -> SweepSummary {
        let mut summary = SweepSummary::default();
        for s in 0..self.strong.len() {
            let step = self.update_group(s);
            summary.absorb(step);
            if step.nonzero && !active.is_active(s) {
                active.insert(s);
                summary.admitted += 1;
            }
        }

        if self.config.evict_zeroed {
            let strong = self.strong;
            let beta = &*self.strong_beta;
            summary.evicted =
                active.retain(|s| beta[strong.buffer_range(s)].iter().any(|&b| b != 0.0));
        }

        if summary.admitted > 0 || summary.evicted > 0 {
            active.rebuild_order(self.strong, self.partition);
        }
        summary
    }
}

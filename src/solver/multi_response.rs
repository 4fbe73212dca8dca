//! Multi-response group elastic net through variable stacking.
//!
//! A K-class response `Y (n × K)` with design `X (n × p)` is rewritten as a
//! single-response problem. The unmodified single-response solver runs on it,
//! then per-class intercepts are sliced back out of each snapshot.
//!
//! # Stacked Layout
//!
//! ```text
//! rows:    i·K + k                      (observation i, class k)
//! columns: [c_0 .. c_{K-1} | (j=0,k=0) (j=0,k=1) .. (j=p-1,k=K-1)]
//!           intercepts        feature j, class k at offset + j·K + k
//! ```
//!
//! Intercept indicators exist only when `multi_intercept` is set. They always
//! occupy the lowest K stacked columns, and their group is the first group.
//! Intercept extraction depends on this. A base group of size s becomes a
//! stacked group of size s·K, so one group couples a feature across all classes.

use std::cell::RefCell;

use ndarray::{s, Array2, ArrayView1, ArrayView2};
use sprs::CsVec;

use crate::solver::coordinate_descent::solve;
use crate::solver::matrix::GroupMatrix;
use crate::solver::types::{
    GroupPartition, SolverConfig, SolverError, SolverState, SolverStateBuilder,
};

// =============================================================================
// StackedMatrix
// =============================================================================

/// `[1_K ⊗ intercepts | X ⊗ I_K]` as a [`GroupMatrix`] view over a base design.
///
/// Block operations gather one class at a time into an internal scratch buffer
/// and delegate to the base matrix. The scratch uses interior mutability, so a
/// `StackedMatrix` serves one solve at a time.
#[derive(Clone, Debug)]
pub struct StackedMatrix<M> {
    base: M,
    n_classes: usize,
    multi_intercept: bool,
    scratch: RefCell<Vec<f64>>,
}

impl<M: GroupMatrix> StackedMatrix<M> {
    pub fn new(base: M, n_classes: usize, multi_intercept: bool) -> Self {
        Self {
            base,
            n_classes,
            multi_intercept,
            scratch: RefCell::new(Vec::new()),
        }
    }

    #[inline]
    pub fn base(&self) -> &M {
        &self.base
    }

    #[inline]
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// Number of leading intercept columns (K or 0).
    #[inline]
    pub fn intercept_offset(&self) -> usize {
        if self.multi_intercept {
            self.n_classes
        } else {
            0
        }
    }

    /// Base features `[j_lo, j_hi)` touched by stacked feature columns `[first, last)`.
    #[inline]
    fn feature_span(&self, first: usize, last: usize) -> (usize, usize) {
        (first / self.n_classes, (last - 1) / self.n_classes + 1)
    }
}

impl<M: GroupMatrix> GroupMatrix for StackedMatrix<M> {
    #[inline]
    fn rows(&self) -> usize {
        self.base.rows() * self.n_classes
    }

    #[inline]
    fn cols(&self) -> usize {
        self.intercept_offset() + self.base.cols() * self.n_classes
    }

    fn apply_block_t(&self, begin: usize, values: &[f64], out: &mut [f64]) {
        let n_classes = self.n_classes;
        let n = self.base.rows();
        let offset = self.intercept_offset();
        let end = begin + out.len();

        let mut c = begin;
        while c < end && c < offset {
            out[c - begin] = (0..n).map(|i| values[i * n_classes + c]).sum();
            c += 1;
        }
        if c == end {
            return;
        }

        let out_shift = c - begin;
        let (first, last) = (c - offset, end - offset);
        let (j_lo, j_hi) = self.feature_span(first, last);
        let width = j_hi - j_lo;

        let mut scratch = self.scratch.borrow_mut();
        scratch.resize(n + width, 0.0);
        let (class_values, feature_out) = scratch.split_at_mut(n);

        for k in 0..n_classes {
            for (i, cv) in class_values.iter_mut().enumerate() {
                *cv = values[i * n_classes + k];
            }
            self.base.apply_block_t(j_lo, class_values, feature_out);
            for (jj, &val) in feature_out.iter().enumerate() {
                let col = (j_lo + jj) * n_classes + k;
                if (first..last).contains(&col) {
                    out[out_shift + col - first] = val;
                }
            }
        }
    }

    fn apply_block_sub(&self, begin: usize, delta: &[f64], resid: &mut [f64]) {
        let n_classes = self.n_classes;
        let n = self.base.rows();
        let offset = self.intercept_offset();
        let end = begin + delta.len();

        let mut c = begin;
        while c < end && c < offset {
            let d = delta[c - begin];
            if d != 0.0 {
                for i in 0..n {
                    resid[i * n_classes + c] -= d;
                }
            }
            c += 1;
        }
        if c == end {
            return;
        }

        let delta_shift = c - begin;
        let (first, last) = (c - offset, end - offset);
        let (j_lo, j_hi) = self.feature_span(first, last);
        let width = j_hi - j_lo;

        let mut scratch = self.scratch.borrow_mut();
        scratch.resize(n + width, 0.0);
        let (class_resid, class_delta) = scratch.split_at_mut(n);

        for k in 0..n_classes {
            let mut any = false;
            for (jj, cd) in class_delta.iter_mut().enumerate() {
                let col = (j_lo + jj) * n_classes + k;
                *cd = if (first..last).contains(&col) {
                    delta[delta_shift + col - first]
                } else {
                    0.0
                };
                any |= *cd != 0.0;
            }
            if !any {
                continue;
            }

            for (i, cr) in class_resid.iter_mut().enumerate() {
                *cr = resid[i * n_classes + k];
            }
            self.base.apply_block_sub(j_lo, class_delta, class_resid);
            for (i, &cr) in class_resid.iter().enumerate() {
                resid[i * n_classes + k] = cr;
            }
        }
    }

    fn col_sq_norm(&self, j: usize) -> f64 {
        let offset = self.intercept_offset();
        if j < offset {
            self.base.rows() as f64
        } else {
            self.base.col_sq_norm((j - offset) / self.n_classes)
        }
    }
}

// =============================================================================
// Stacking helpers
// =============================================================================

/// Expand a base partition to the stacked column space.
///
/// Each base group of size s becomes a group of size s·K. With
/// `multi_intercept` a leading intercept group of size K is prepended.
pub fn stack_partition(
    base: &GroupPartition,
    n_classes: usize,
    multi_intercept: bool,
) -> Result<GroupPartition, SolverError> {
    let sizes: Vec<usize> = multi_intercept
        .then_some(n_classes)
        .into_iter()
        .chain(base.group_sizes().iter().map(|&size| size * n_classes))
        .collect();
    GroupPartition::from_sizes(&sizes)
}

/// Flatten `Y (n × K)` row-major into the stacked response.
pub fn stack_response(y: ArrayView2<f64>) -> Vec<f64> {
    y.iter().copied().collect()
}

/// Split one stacked snapshot into its intercept row and feature coefficients.
///
/// Entries below index K are intercepts; absent entries are zero intercepts.
/// The remaining entries shift down by K.
pub(crate) fn split_intercepts(
    beta: &CsVec<f64>,
    n_classes: usize,
    multi_intercept: bool,
) -> (Vec<f64>, CsVec<f64>) {
    if !multi_intercept {
        return (vec![0.0; n_classes], beta.clone());
    }

    let mut intercepts = vec![0.0; n_classes];
    let mut indices = Vec::with_capacity(beta.nnz());
    let mut data = Vec::with_capacity(beta.nnz());
    for (idx, &val) in beta.iter() {
        if idx < n_classes {
            intercepts[idx] = val;
        } else {
            indices.push(idx - n_classes);
            data.push(val);
        }
    }
    (
        intercepts,
        CsVec::new(beta.dim() - n_classes, indices, data),
    )
}

// =============================================================================
// MultiResponseState
// =============================================================================

/// Multi-response solver state: a stacked single-response state plus its
/// un-stacked path output.
#[derive(Clone, Debug)]
pub struct MultiResponseState<M> {
    pub(crate) state: SolverState<StackedMatrix<M>>,
    pub(crate) n_classes: usize,
    pub(crate) multi_intercept: bool,
    /// Intercept path, shape `(betas.len(), n_classes)`.
    pub(crate) intercepts: Array2<f64>,
    /// Feature coefficients per snapshot, width `p·K`.
    pub(crate) betas: Vec<CsVec<f64>>,
}

impl<M> MultiResponseState<M> {
    /// The stacked single-response state the solver runs on.
    #[inline]
    pub fn stacked(&self) -> &SolverState<StackedMatrix<M>> {
        &self.state
    }

    #[inline]
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    #[inline]
    pub fn multi_intercept(&self) -> bool {
        self.multi_intercept
    }

    #[inline]
    pub fn intercepts(&self) -> &Array2<f64> {
        &self.intercepts
    }

    /// Feature coefficients per snapshot; index `j·K + k` is feature j, class k.
    #[inline]
    pub fn betas(&self) -> &[CsVec<f64>] {
        &self.betas
    }

    #[inline]
    pub fn rsqs(&self) -> &[f64] {
        self.state.rsqs()
    }

    /// Snapshot `i` as a dense `(p × K)` coefficient matrix.
    pub fn coefficient_matrix(&self, i: usize) -> Option<Array2<f64>> {
        let beta = self.betas.get(i)?;
        let n_features = beta.dim() / self.n_classes;
        let mut out = Array2::zeros((n_features, self.n_classes));
        for (idx, &val) in beta.iter() {
            out[[idx / self.n_classes, idx % self.n_classes]] = val;
        }
        Some(out)
    }

    /// Un-stack every snapshot the stacked state appended since the last call.
    ///
    /// Rows already processed are never revisited.
    fn extract_new_snapshots(&mut self) {
        let done = self.betas.len();
        let total = self.state.betas.len();
        if total == done {
            return;
        }

        let mut intercepts = Array2::zeros((total, self.n_classes));
        intercepts.slice_mut(s![..done, ..]).assign(&self.intercepts);
        for (row, beta) in self.state.betas[done..].iter().enumerate() {
            let (icpt, emitted) = split_intercepts(beta, self.n_classes, self.multi_intercept);
            intercepts
                .row_mut(done + row)
                .assign(&ArrayView1::from(&icpt));
            self.betas.push(emitted);
        }
        self.intercepts = intercepts;
    }
}

/// Run the single-response solver on the stacked state, then un-stack.
///
/// Extraction also runs when the solve stops early, so the partial path is
/// available next to the returned error.
pub fn solve_multi_response<M, F, I>(
    state: &mut MultiResponseState<M>,
    display_progress: bool,
    update_coefficients_f: F,
    check_user_interrupt: I,
) -> Result<(), SolverError>
where
    M: GroupMatrix,
    F: FnMut(&StackedMatrix<M>, usize, &[f64], &mut [f64]),
    I: FnMut() -> bool,
{
    let result = solve(
        &mut state.state,
        display_progress,
        update_coefficients_f,
        check_user_interrupt,
    );
    state.extract_new_snapshots();
    result
}

// =============================================================================
// MultiResponseStateBuilder
// =============================================================================

/// Builds a [`MultiResponseState`] from a base design and a `(n × K)` response.
///
/// `penalty` and `strong_set` refer to base groups. The intercept group, when
/// present, is unpenalized and always strong.
pub struct MultiResponseStateBuilder<'y, M> {
    matrix: M,
    partition: GroupPartition,
    response: ArrayView2<'y, f64>,
    multi_intercept: bool,
    alpha: f64,
    penalty: Option<Vec<f64>>,
    strong_set: Option<Vec<usize>>,
    lmdas: Vec<f64>,
    config: SolverConfig,
}

impl<'y, M: GroupMatrix> MultiResponseStateBuilder<'y, M> {
    pub fn new(matrix: M, partition: GroupPartition, response: ArrayView2<'y, f64>) -> Self {
        Self {
            matrix,
            partition,
            response,
            multi_intercept: true,
            alpha: 1.0,
            penalty: None,
            strong_set: None,
            lmdas: Vec::new(),
            config: SolverConfig::default(),
        }
    }

    pub fn multi_intercept(mut self, multi_intercept: bool) -> Self {
        self.multi_intercept = multi_intercept;
        self
    }

    pub fn alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn penalty(mut self, penalty: Vec<f64>) -> Self {
        self.penalty = Some(penalty);
        self
    }

    pub fn strong_set(mut self, strong_set: Vec<usize>) -> Self {
        self.strong_set = Some(strong_set);
        self
    }

    pub fn lmdas(mut self, lmdas: Vec<f64>) -> Self {
        self.lmdas = lmdas;
        self
    }

    pub fn config(mut self, config: SolverConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<MultiResponseState<M>, SolverError> {
        let (n_obs, n_classes) = self.response.dim();
        if n_classes == 0 {
            return Err(SolverError::InvalidParameter {
                name: "n_classes",
                value: 0.0,
            });
        }
        if n_obs != self.matrix.rows() {
            return Err(SolverError::DimensionMismatch {
                what: "response rows",
                expected: self.matrix.rows(),
                found: n_obs,
            });
        }

        let n_base_groups = self.partition.n_groups();
        let base_penalty = self.penalty.unwrap_or_else(|| vec![1.0; n_base_groups]);
        if base_penalty.len() != n_base_groups {
            return Err(SolverError::DimensionMismatch {
                what: "penalty",
                expected: n_base_groups,
                found: base_penalty.len(),
            });
        }

        let group_shift = usize::from(self.multi_intercept);
        let intercept_group = self.multi_intercept.then_some(0usize);
        let penalty = intercept_group
            .map(|_| 0.0)
            .into_iter()
            .chain(base_penalty)
            .collect();
        let strong_set = intercept_group
            .into_iter()
            .chain(
                self.strong_set
                    .unwrap_or_else(|| (0..n_base_groups).collect())
                    .into_iter()
                    .map(|g| g + group_shift),
            )
            .collect();

        let partition = stack_partition(&self.partition, n_classes, self.multi_intercept)?;
        let y = stack_response(self.response);
        let matrix = StackedMatrix::new(self.matrix, n_classes, self.multi_intercept);

        let state = SolverStateBuilder::new(matrix, partition)
            .alpha(self.alpha)
            .penalty(penalty)
            .strong_set(strong_set)
            .lmdas(self.lmdas)
            .response(ArrayView1::from(&y))
            .config(self.config)
            .build()?;

        Ok(MultiResponseState {
            state,
            n_classes,
            multi_intercept: self.multi_intercept,
            intercepts: Array2::zeros((0, n_classes)),
            betas: Vec::new(),
        })
    }
}

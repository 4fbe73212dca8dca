//! Core data types for the group elastic-net path solver.
//!
//! # Overview
//!
//! The solver fits one sparse coefficient vector per regularization level in a
//! decreasing lambda path. Predictors are partitioned into contiguous groups
//! that are penalized jointly.
//!
//! # Two Index Spaces
//!
//! - **Feature space**: length p (number of design columns). Path snapshots and
//!   the group partition live here.
//! - **Strong space**: the concatenated coordinates of the strong-set groups only.
//!   `strong_beta`, `strong_grad` and `strong_vars` are stored flat in this space,
//!   with `begins[s]` giving the offset of strong position `s`.
//!
//! ```text
//! partition:   [g0 | g1 g1 g1 | g2 | g3 g3]        (p = 7)
//! strong set:  [g3, g1]
//! strong_beta: [g3 g3 | g1 g1 g1]                 begins = [0, 2]
//! ```
//!
//! # Main Types
//!
//! - [`GroupPartition`]: Group start offsets and sizes
//! - [`StrongSet`]: Screened groups with their [`GroupKind`] and buffer offsets
//! - [`ActiveSet`]: Strong positions with a nonzero coefficient block
//! - [`SolverConfig`]: Tolerances and iteration caps
//! - [`SolverState`]: Everything above plus residual, R² and the accumulated path
//! - [`SolverStateBuilder`]: Named-field construction and validation

use std::ops::Range;

use ndarray::ArrayView1;
use sprs::CsVec;
use thiserror::Error;

use crate::solver::matrix::GroupMatrix;

// =============================================================================
// SolverError
// =============================================================================

/// Conditions that abort a solve call or reject a state at construction.
///
/// Every variant leaves already-appended path entries untouched.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolverError {
    #[error("maximum number of coordinate sweeps ({max_iters}) exceeded at lambda index {lmda_index}")]
    MaxIterationsExceeded { max_iters: usize, lmda_index: usize },

    #[error("solve interrupted by user at lambda index {lmda_index}")]
    UserInterrupted { lmda_index: usize },

    #[error("malformed group partition at group {group}: {reason}")]
    MalformedGroupPartition { group: usize, reason: String },

    #[error("{what} has length {found}, expected {expected}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("invalid value for {name}: {value}")]
    InvalidParameter { name: &'static str, value: f64 },
}

// =============================================================================
// GroupPartition
// =============================================================================

/// Whether a group takes the scalar soft-threshold path or the Newton block path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GroupKind {
    /// Group of size 1: closed-form soft threshold.
    Scalar,
    /// Group of size > 1: bounded Newton sub-solve.
    Block,
}

impl GroupKind {
    #[inline]
    pub fn of_size(size: usize) -> Self {
        if size == 1 {
            GroupKind::Scalar
        } else {
            GroupKind::Block
        }
    }
}

/// Contiguous, non-overlapping groups covering the feature space.
///
/// Invariant: `groups[0] == 0` and `groups[i] + group_sizes[i] == groups[i + 1]`.
/// It is checked once here; the solver relies on it without re-validation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupPartition {
    groups: Vec<usize>,
    group_sizes: Vec<usize>,
}

impl GroupPartition {
    /// Create a partition from start offsets and sizes.
    pub fn new(groups: Vec<usize>, group_sizes: Vec<usize>) -> Result<Self, SolverError> {
        if groups.len() != group_sizes.len() {
            return Err(SolverError::DimensionMismatch {
                what: "group_sizes",
                expected: groups.len(),
                found: group_sizes.len(),
            });
        }

        let mut expected_start = 0usize;
        for (i, (&start, &size)) in groups.iter().zip(group_sizes.iter()).enumerate() {
            if size == 0 {
                return Err(SolverError::MalformedGroupPartition {
                    group: i,
                    reason: "group size must be positive".to_string(),
                });
            }
            if start != expected_start {
                return Err(SolverError::MalformedGroupPartition {
                    group: i,
                    reason: format!("starts at {start}, expected {expected_start}"),
                });
            }
            expected_start = start + size;
        }

        Ok(Self {
            groups,
            group_sizes,
        })
    }

    /// Create a partition from group sizes, laying groups out back to back.
    pub fn from_sizes(group_sizes: &[usize]) -> Result<Self, SolverError> {
        let groups = group_sizes
            .iter()
            .scan(0usize, |acc, &size| {
                let start = *acc;
                *acc += size;
                Some(start)
            })
            .collect();
        Self::new(groups, group_sizes.to_vec())
    }

    #[inline]
    pub fn n_groups(&self) -> usize {
        self.groups.len()
    }

    /// Total feature count covered by the partition.
    #[inline]
    pub fn n_features(&self) -> usize {
        match (self.groups.last(), self.group_sizes.last()) {
            (Some(&start), Some(&size)) => start + size,
            _ => 0,
        }
    }

    #[inline]
    pub fn groups(&self) -> &[usize] {
        &self.groups
    }

    #[inline]
    pub fn group_sizes(&self) -> &[usize] {
        &self.group_sizes
    }

    #[inline]
    pub fn start(&self, g: usize) -> usize {
        self.groups[g]
    }

    #[inline]
    pub fn size(&self, g: usize) -> usize {
        self.group_sizes[g]
    }

    /// Iterate `(start, size)` pairs in group order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.groups
            .iter()
            .copied()
            .zip(self.group_sizes.iter().copied())
    }
}

// =============================================================================
// StrongSet
// =============================================================================

/// Groups screened in as candidates for nonzero coefficients.
///
/// Indexed by strong position `s`. The arena offsets in `begins` replace
/// per-group allocations: group `s` owns `begins[s]..begins[s] + sizes[s]` of
/// every strong-space buffer.
#[derive(Clone, Debug)]
pub struct StrongSet {
    pub(crate) groups: Vec<usize>,
    pub(crate) sizes: Vec<usize>,
    pub(crate) kinds: Vec<GroupKind>,
    pub(crate) begins: Vec<usize>,
    /// Diagonal of `X_gᵀ X_g` per strong coordinate.
    pub(crate) vars: Vec<f64>,
}

impl StrongSet {
    fn new(partition: &GroupPartition, groups: Vec<usize>, vars: Vec<f64>) -> Self {
        let sizes: Vec<usize> = groups.iter().map(|&g| partition.size(g)).collect();
        let kinds = sizes.iter().map(|&size| GroupKind::of_size(size)).collect();
        let begins = sizes
            .iter()
            .scan(0usize, |acc, &size| {
                let begin = *acc;
                *acc += size;
                Some(begin)
            })
            .collect();
        Self {
            groups,
            sizes,
            kinds,
            begins,
            vars,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Group index for each strong position.
    #[inline]
    pub fn groups(&self) -> &[usize] {
        &self.groups
    }

    #[inline]
    pub fn begins(&self) -> &[usize] {
        &self.begins
    }

    #[inline]
    pub fn vars(&self) -> &[f64] {
        &self.vars
    }

    #[inline]
    pub fn kind(&self, s: usize) -> GroupKind {
        self.kinds[s]
    }

    /// Range of strong position `s` inside the strong-space buffers.
    #[inline]
    pub fn buffer_range(&self, s: usize) -> Range<usize> {
        self.begins[s]..self.begins[s] + self.sizes[s]
    }

    /// Total number of strong coordinates.
    pub fn n_coords(&self) -> usize {
        self.sizes.iter().sum()
    }

    pub(crate) fn max_group_size(&self) -> usize {
        self.sizes.iter().copied().max().unwrap_or(0)
    }

    /// Strong positions of size-1 groups.
    pub fn strong_g1(&self) -> Vec<usize> {
        self.positions_of(GroupKind::Scalar)
    }

    /// Strong positions of groups with more than one coefficient.
    pub fn strong_g2(&self) -> Vec<usize> {
        self.positions_of(GroupKind::Block)
    }

    fn positions_of(&self, kind: GroupKind) -> Vec<usize> {
        (0..self.len()).filter(|&s| self.kinds[s] == kind).collect()
    }
}

// =============================================================================
// ActiveSet
// =============================================================================

/// Strong positions whose coefficient block is currently nonzero.
#[derive(Clone, Debug)]
pub struct ActiveSet {
    /// Insertion order.
    pub(crate) set: Vec<usize>,
    /// Same positions sorted by feature offset; inner-loop visitation order.
    pub(crate) order: Vec<usize>,
    /// Membership flag per strong position.
    pub(crate) is_active: Vec<bool>,
}

impl ActiveSet {
    pub(crate) fn new(n_strong: usize) -> Self {
        Self {
            set: Vec::new(),
            order: Vec::new(),
            is_active: vec![false; n_strong],
        }
    }

    #[inline]
    pub fn set(&self) -> &[usize] {
        &self.set
    }

    #[inline]
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    #[inline]
    pub fn is_active(&self, s: usize) -> bool {
        self.is_active[s]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.set.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    /// Active positions holding size-1 groups, in insertion order.
    pub fn g1<'a>(&'a self, strong: &'a StrongSet) -> impl Iterator<Item = usize> + 'a {
        self.set
            .iter()
            .copied()
            .filter(move |&s| strong.kind(s) == GroupKind::Scalar)
    }

    /// Active positions holding multi-coefficient groups, in insertion order.
    pub fn g2<'a>(&'a self, strong: &'a StrongSet) -> impl Iterator<Item = usize> + 'a {
        self.set
            .iter()
            .copied()
            .filter(move |&s| strong.kind(s) == GroupKind::Block)
    }

    pub(crate) fn insert(&mut self, s: usize) {
        if !self.is_active[s] {
            self.is_active[s] = true;
            self.set.push(s);
        }
    }

    /// Drop every position for which `keep` is false. Returns the number evicted.
    pub(crate) fn retain<K: Fn(usize) -> bool>(&mut self, keep: K) -> usize {
        let before = self.set.len();
        let is_active = &mut self.is_active;
        self.set.retain(|&s| {
            let kept = keep(s);
            if !kept {
                is_active[s] = false;
            }
            kept
        });
        before - self.set.len()
    }

    pub(crate) fn rebuild_order(&mut self, strong: &StrongSet, partition: &GroupPartition) {
        self.order.clear();
        self.order.extend_from_slice(&self.set);
        self.order
            .sort_unstable_by_key(|&s| partition.start(strong.groups[s]));
    }
}

// =============================================================================
// SolverConfig
// =============================================================================

/// Solver tolerances and iteration caps.
#[derive(Clone, Copy, Debug)]
pub struct SolverConfig {
    /// Cap on total coordinate sweeps (active and strong) across the path.
    pub max_iters: usize,

    /// Convergence threshold on `max_g Σ vars·δ²` of one sweep.
    pub tol: f64,

    /// Relative R² change per sweep below which the active loop may stop.
    pub rsq_slope_tol: f64,

    /// Absolute R² second difference below which the active loop may stop.
    pub rsq_curv_tol: f64,

    /// Step size on `‖β_g‖` at which the Newton sub-solve stops.
    pub newton_tol: f64,

    pub newton_max_iters: usize,

    /// Largest normalized inner product `|x_aᵀ x_b| / (‖x_a‖ ‖x_b‖)` allowed
    /// between two columns of the same group when `strong_vars` is derived
    /// from the matrix.
    pub orthogonality_tol: f64,

    /// Evict active groups driven back to exactly zero during a strong sweep.
    pub evict_zeroed: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_iters: 100_000,
            tol: 1e-7,
            rsq_slope_tol: 1e-6,
            rsq_curv_tol: 1e-6,
            newton_tol: 1e-12,
            newton_max_iters: 1000,
            orthogonality_tol: 1e-8,
            evict_zeroed: true,
        }
    }
}

// =============================================================================
// ConvergenceState
// =============================================================================

/// Whether an iterative routine reached its tolerance.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConvergenceState {
    Converged,
    #[default]
    NotConverged,
}

// =============================================================================
// Diagnostics
// =============================================================================

/// Timing and sub-solve bookkeeping collected during a solve.
#[derive(Clone, Debug, Default)]
pub struct Diagnostics {
    /// Seconds spent in each strong-set sweep.
    pub time_strong_cd: Vec<f64>,
    /// Seconds spent in each active-set inner loop.
    pub time_active_cd: Vec<f64>,
    /// Newton sub-solves that stopped at `newton_max_iters`.
    pub newton_failures: usize,
}

// =============================================================================
// SolverState
// =============================================================================

/// Long-lived solver record: problem description, configuration and dynamic state.
///
/// Built through [`SolverStateBuilder`], mutated only by
/// [`solve`](crate::solver::solve), read through accessors.
#[derive(Clone, Debug)]
pub struct SolverState<M> {
    // Static problem description
    pub(crate) matrix: M,
    pub(crate) partition: GroupPartition,
    pub(crate) alpha: f64,
    pub(crate) penalty: Vec<f64>,
    pub(crate) strong: StrongSet,
    pub(crate) lmdas: Vec<f64>,
    pub(crate) y_var: f64,

    pub(crate) config: SolverConfig,

    // Dynamic state
    pub(crate) resid: Vec<f64>,
    pub(crate) rsq: f64,
    pub(crate) strong_beta: Vec<f64>,
    pub(crate) strong_grad: Vec<f64>,
    pub(crate) active: ActiveSet,
    pub(crate) betas: Vec<CsVec<f64>>,
    pub(crate) rsqs: Vec<f64>,
    pub(crate) iters: usize,
    pub(crate) diagnostics: Diagnostics,
}

impl<M> SolverState<M> {
    #[inline]
    pub fn matrix(&self) -> &M {
        &self.matrix
    }

    #[inline]
    pub fn partition(&self) -> &GroupPartition {
        &self.partition
    }

    #[inline]
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    #[inline]
    pub fn penalty(&self) -> &[f64] {
        &self.penalty
    }

    #[inline]
    pub fn strong(&self) -> &StrongSet {
        &self.strong
    }

    #[inline]
    pub fn lmdas(&self) -> &[f64] {
        &self.lmdas
    }

    #[inline]
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    #[inline]
    pub fn resid(&self) -> &[f64] {
        &self.resid
    }

    /// Running fraction of response variance explained.
    #[inline]
    pub fn rsq(&self) -> f64 {
        self.rsq
    }

    #[inline]
    pub fn strong_beta(&self) -> &[f64] {
        &self.strong_beta
    }

    /// `X_gᵀ r` for each strong group, as of its last visit.
    #[inline]
    pub fn strong_grad(&self) -> &[f64] {
        &self.strong_grad
    }

    #[inline]
    pub fn active(&self) -> &ActiveSet {
        &self.active
    }

    /// One sparse snapshot per converged lambda.
    #[inline]
    pub fn betas(&self) -> &[CsVec<f64>] {
        &self.betas
    }

    #[inline]
    pub fn rsqs(&self) -> &[f64] {
        &self.rsqs
    }

    /// Total coordinate sweeps performed.
    #[inline]
    pub fn iters(&self) -> usize {
        self.iters
    }

    #[inline]
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Expand the active strong coefficients into a feature-space sparse vector.
    ///
    /// Exact zeros are not stored. Indices come out sorted because `active.order`
    /// is sorted by group start and groups do not overlap.
    pub(crate) fn snapshot(&self) -> CsVec<f64> {
        let mut indices = Vec::new();
        let mut data = Vec::new();
        for &s in &self.active.order {
            let begin = self.partition.start(self.strong.groups[s]);
            let block = &self.strong_beta[self.strong.buffer_range(s)];
            for (l, &b) in block.iter().enumerate() {
                if b != 0.0 {
                    indices.push(begin + l);
                    data.push(b);
                }
            }
        }
        CsVec::new(self.partition.n_features(), indices, data)
    }
}

// =============================================================================
// SolverStateBuilder
// =============================================================================

/// Named-field construction of a [`SolverState`].
///
/// # Defaults
///
/// - `alpha = 1.0` (pure group lasso)
/// - `penalty = 1.0` for every group
/// - strong set = every group
/// - zero warm start, `strong_vars` from squared column norms
pub struct SolverStateBuilder<M> {
    matrix: M,
    partition: GroupPartition,
    alpha: f64,
    penalty: Option<Vec<f64>>,
    strong_set: Option<Vec<usize>>,
    lmdas: Vec<f64>,
    response: Option<Vec<f64>>,
    strong_vars: Option<Vec<f64>>,
    strong_beta: Option<Vec<f64>>,
    config: SolverConfig,
}

impl<M: GroupMatrix> SolverStateBuilder<M> {
    pub fn new(matrix: M, partition: GroupPartition) -> Self {
        Self {
            matrix,
            partition,
            alpha: 1.0,
            penalty: None,
            strong_set: None,
            lmdas: Vec::new(),
            response: None,
            strong_vars: None,
            strong_beta: None,
            config: SolverConfig::default(),
        }
    }

    /// Elastic-net mixing: 1 is group lasso, 0 is ridge.
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

    /// Regularization path, fitted in the given order.
    ///
    /// Pass it in decreasing order: each lambda warm-starts from the previous
    /// solution, and `rsqs` is only non-decreasing along a decreasing path.
    pub fn lmdas(mut self, lmdas: Vec<f64>) -> Self {
        self.lmdas = lmdas;
        self
    }

    /// Response vector; becomes the initial residual.
    pub fn response(mut self, y: ArrayView1<f64>) -> Self {
        self.response = Some(y.to_vec());
        self
    }

    /// Diagonal of `X_gᵀ X_g` per strong coordinate, in strong-space order.
    pub fn strong_vars(mut self, vars: Vec<f64>) -> Self {
        self.strong_vars = Some(vars);
        self
    }

    /// Warm-start coefficients in strong-space order.
    pub fn strong_beta(mut self, beta: Vec<f64>) -> Self {
        self.strong_beta = Some(beta);
        self
    }

    pub fn config(mut self, config: SolverConfig) -> Self {
        self.config = config;
        self
    }

    /// Validate inputs and assemble the state.
    pub fn build(self) -> Result<SolverState<M>, SolverError> {
        let partition = self.partition;
        let matrix = self.matrix;
        let n_groups = partition.n_groups();

        if matrix.cols() != partition.n_features() {
            return Err(SolverError::DimensionMismatch {
                what: "matrix columns",
                expected: partition.n_features(),
                found: matrix.cols(),
            });
        }
        if !(0.0..=1.0).contains(&self.alpha) {
            return Err(SolverError::InvalidParameter {
                name: "alpha",
                value: self.alpha,
            });
        }

        let penalty = self.penalty.unwrap_or_else(|| vec![1.0; n_groups]);
        if penalty.len() != n_groups {
            return Err(SolverError::DimensionMismatch {
                what: "penalty",
                expected: n_groups,
                found: penalty.len(),
            });
        }
        if let Some(&bad) = penalty.iter().find(|p| !p.is_finite() || **p < 0.0) {
            return Err(SolverError::InvalidParameter {
                name: "penalty",
                value: bad,
            });
        }
        if let Some(&bad) = self.lmdas.iter().find(|l| !l.is_finite() || **l < 0.0) {
            return Err(SolverError::InvalidParameter {
                name: "lmdas",
                value: bad,
            });
        }

        let strong_groups = self.strong_set.unwrap_or_else(|| (0..n_groups).collect());
        let mut seen = vec![false; n_groups];
        for &g in &strong_groups {
            if g >= n_groups || seen[g] {
                return Err(SolverError::InvalidParameter {
                    name: "strong_set",
                    value: g as f64,
                });
            }
            seen[g] = true;
        }

        let mut resid = self.response.ok_or(SolverError::DimensionMismatch {
            what: "response",
            expected: matrix.rows(),
            found: 0,
        })?;
        if resid.len() != matrix.rows() {
            return Err(SolverError::DimensionMismatch {
                what: "response",
                expected: matrix.rows(),
                found: resid.len(),
            });
        }

        let n_coords: usize = strong_groups.iter().map(|&g| partition.size(g)).sum();
        let vars = match self.strong_vars {
            Some(vars) if vars.len() != n_coords => {
                return Err(SolverError::DimensionMismatch {
                    what: "strong_vars",
                    expected: n_coords,
                    found: vars.len(),
                });
            }
            Some(vars) => vars,
            None => {
                check_group_orthogonality(
                    &matrix,
                    &partition,
                    &strong_groups,
                    self.config.orthogonality_tol,
                )?;
                strong_groups
                    .iter()
                    .flat_map(|&g| {
                        let start = partition.start(g);
                        start..start + partition.size(g)
                    })
                    .map(|j| matrix.col_sq_norm(j))
                    .collect()
            }
        };
        let strong = StrongSet::new(&partition, strong_groups, vars);

        let y_var = match resid.iter().map(|r| r * r).sum::<f64>() {
            v if v > 0.0 => v,
            _ => 1.0,
        };

        let strong_beta = match self.strong_beta {
            Some(beta) if beta.len() != n_coords => {
                return Err(SolverError::DimensionMismatch {
                    what: "strong_beta",
                    expected: n_coords,
                    found: beta.len(),
                });
            }
            Some(beta) => beta,
            None => vec![0.0; n_coords],
        };

        // Warm start: fold the initial fit into the residual and activate its groups
        let mut active = ActiveSet::new(strong.len());
        for s in 0..strong.len() {
            let block = &strong_beta[strong.buffer_range(s)];
            if block.iter().any(|&b| b != 0.0) {
                matrix.apply_block_sub(partition.start(strong.groups[s]), block, &mut resid);
                active.insert(s);
            }
        }
        active.rebuild_order(&strong, &partition);
        let rsq = 1.0 - resid.iter().map(|r| r * r).sum::<f64>() / y_var;

        Ok(SolverState {
            matrix,
            partition,
            alpha: self.alpha,
            penalty,
            lmdas: self.lmdas,
            y_var,
            config: self.config,
            resid,
            rsq: if active.is_empty() { 0.0 } else { rsq },
            strong_grad: vec![0.0; n_coords],
            strong_beta,
            strong,
            active,
            betas: Vec::new(),
            rsqs: Vec::new(),
            iters: 0,
            diagnostics: Diagnostics::default(),
        })
    }
}

/// Reject strong groups whose columns are not mutually orthogonal.
///
/// The coordinate update treats `X_gᵀ X_g` as diagonal. Each column is
/// materialised through the block operations, then dotted against its group.
fn check_group_orthogonality<M: GroupMatrix>(
    matrix: &M,
    partition: &GroupPartition,
    strong_groups: &[usize],
    tol: f64,
) -> Result<(), SolverError> {
    let mut column = vec![0.0; matrix.rows()];
    let mut gram_row = Vec::new();
    for &g in strong_groups {
        let (begin, size) = (partition.start(g), partition.size(g));
        if size < 2 {
            continue;
        }
        gram_row.resize(size, 0.0);
        let sq_norms: Vec<f64> = (begin..begin + size)
            .map(|j| matrix.col_sq_norm(j))
            .collect();

        for a in 0..size - 1 {
            column.fill(0.0);
            matrix.apply_block_sub(begin + a, &[-1.0], &mut column);
            matrix.apply_block_t(begin, &column, &mut gram_row);

            for b in a + 1..size {
                let scale = (sq_norms[a] * sq_norms[b]).sqrt();
                if scale > 0.0 && gram_row[b].abs() > tol * scale {
                    return Err(SolverError::MalformedGroupPartition {
                        group: g,
                        reason: format!(
                            "columns {} and {} are not orthogonal (normalized inner product {:.3e})",
                            begin + a,
                            begin + b,
                            gram_row[b] / scale
                        ),
                    });
                }
            }
        }
    }
    Ok(())
}

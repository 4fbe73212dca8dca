//! Design-matrix backends for the coordinate-descent solver.
//!
//! The solver never touches a design directly. It only asks for the inner
//! product of one group's columns with the residual, and for a group's
//! coefficient delta to be folded back into the residual. [`GroupMatrix`]
//! captures exactly that, so dense, sparse and stacked designs plug in unchanged.
//!
//! - Dense: any `ndarray::ArrayBase<S, Ix2>` with `f64` elements
//! - Sparse: [`SparseDesign`], a CSC `sprs` matrix
//! - Stacked: [`StackedMatrix`](crate::solver::multi_response::StackedMatrix)
//! - Borrowed: `&M` for any of the above, so one design can back several states

use ndarray::{ArrayBase, ArrayView1, Data, Ix2};
use sprs::{CsMat, CsMatView};

/// Block-column operations the solver needs from a design matrix.
pub trait GroupMatrix {
    fn rows(&self) -> usize;

    fn cols(&self) -> usize;

    /// Apply the transpose of a column block: `out[l] = Σᵢ X[i, begin + l] · values[i]`.
    ///
    /// The block width is `out.len()`.
    fn apply_block_t(&self, begin: usize, values: &[f64], out: &mut [f64]);

    /// Subtract a column block times a delta: `resid[i] -= Σₗ X[i, begin + l] · delta[l]`.
    fn apply_block_sub(&self, begin: usize, delta: &[f64], resid: &mut [f64]);

    /// Squared Euclidean norm of column `j`.
    fn col_sq_norm(&self, j: usize) -> f64;
}

impl<M: GroupMatrix + ?Sized> GroupMatrix for &M {
    #[inline]
    fn rows(&self) -> usize {
        (**self).rows()
    }

    #[inline]
    fn cols(&self) -> usize {
        (**self).cols()
    }

    #[inline]
    fn apply_block_t(&self, begin: usize, values: &[f64], out: &mut [f64]) {
        (**self).apply_block_t(begin, values, out)
    }

    #[inline]
    fn apply_block_sub(&self, begin: usize, delta: &[f64], resid: &mut [f64]) {
        (**self).apply_block_sub(begin, delta, resid)
    }

    #[inline]
    fn col_sq_norm(&self, j: usize) -> f64 {
        (**self).col_sq_norm(j)
    }
}

// =============================================================================
// Dense
// =============================================================================

impl<S: Data<Elem = f64>> GroupMatrix for ArrayBase<S, Ix2> {
    #[inline]
    fn rows(&self) -> usize {
        self.nrows()
    }

    #[inline]
    fn cols(&self) -> usize {
        self.ncols()
    }

    fn apply_block_t(&self, begin: usize, values: &[f64], out: &mut [f64]) {
        let values = ArrayView1::from(values);
        for (l, o) in out.iter_mut().enumerate() {
            *o = self.column(begin + l).dot(&values);
        }
    }

    fn apply_block_sub(&self, begin: usize, delta: &[f64], resid: &mut [f64]) {
        for (l, &d) in delta.iter().enumerate() {
            if d == 0.0 {
                continue;
            }
            for (r, &x) in resid.iter_mut().zip(self.column(begin + l).iter()) {
                *r -= d * x;
            }
        }
    }

    fn col_sq_norm(&self, j: usize) -> f64 {
        let col = self.column(j);
        col.dot(&col)
    }
}

// =============================================================================
// Sparse
// =============================================================================

/// Sparse design stored column-compressed.
///
/// Row-compressed input is converted once at construction, since every solver
/// operation walks columns.
#[derive(Clone, Debug)]
pub struct SparseDesign {
    csc: CsMat<f64>,
}

impl SparseDesign {
    pub fn new(matrix: CsMat<f64>) -> Self {
        let csc = if matrix.is_csc() {
            matrix
        } else {
            matrix.to_csc()
        };
        Self { csc }
    }

    pub fn view(&self) -> CsMatView<'_, f64> {
        self.csc.view()
    }
}

impl GroupMatrix for SparseDesign {
    #[inline]
    fn rows(&self) -> usize {
        self.csc.rows()
    }

    #[inline]
    fn cols(&self) -> usize {
        self.csc.cols()
    }

    fn apply_block_t(&self, begin: usize, values: &[f64], out: &mut [f64]) {
        for (l, o) in out.iter_mut().enumerate() {
            *o = self
                .csc
                .outer_view(begin + l)
                .map_or(0.0, |col| col.iter().map(|(i, &x)| x * values[i]).sum());
        }
    }

    fn apply_block_sub(&self, begin: usize, delta: &[f64], resid: &mut [f64]) {
        for (l, &d) in delta.iter().enumerate() {
            if d == 0.0 {
                continue;
            }
            if let Some(col) = self.csc.outer_view(begin + l) {
                for (i, &x) in col.iter() {
                    resid[i] -= d * x;
                }
            }
        }
    }

    fn col_sq_norm(&self, j: usize) -> f64 {
        self.csc
            .outer_view(j)
            .map_or(0.0, |col| col.iter().map(|(_, &x)| x * x).sum())
    }
}

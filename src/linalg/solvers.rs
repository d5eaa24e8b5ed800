use crate::{
    assert,
    linalg::{
        cholesky::llt::{self, CholeskyError},
        gauss_jordan::{self, GaussJordanParams},
        lu::{partial_pivoting as lu, LuError},
        qr::no_pivoting as qr,
        svd::{self, SvdError, SvdParams},
    },
    mat::{Mat, MatMut, MatRef},
    progress::Progress,
};
use dyn_stack::{GlobalPodBuffer, PodStack};

/// Cholesky decomposition.
pub struct Cholesky {
    factors: Mat<f64>,
    diag: Vec<f64>,
}

/// LU decomposition with partial pivoting.
pub struct PartialPivLu {
    factors: Mat<f64>,
    perm: Vec<usize>,
    transposition_count: usize,
}

/// QR decomposition.
pub struct Qr {
    factors: Mat<f64>,
    householder_coeffs: Vec<f64>,
    params: qr::compute::QrParams,
}

/// Singular value decomposition.
pub struct Svd {
    u: Mat<f64>,
    s: Vec<f64>,
    v: Mat<f64>,
}

impl Cholesky {
    /// Returns the Cholesky factorization of the input matrix, or an error if the matrix is not
    /// positive definite.
    ///
    /// The factorization is such that $A = LL^\top$, where $L$ is lower triangular.
    ///
    /// The matrix is interpreted as symmetric, and only its upper triangular part is accessed.
    #[track_caller]
    pub fn try_new(matrix: MatRef<'_, f64>) -> Result<Self, CholeskyError> {
        assert!(matrix.nrows() == matrix.ncols());
        let dim = matrix.nrows();

        let mut factors = matrix.to_owned();
        let mut diag = vec![0.0; dim];
        llt::compute::cholesky_in_place(factors.as_mut(), &mut diag, Progress::none())?;
        Ok(Self { factors, diag })
    }

    fn dim(&self) -> usize {
        self.factors.nrows()
    }

    /// Returns the factor $L$ of the Cholesky decomposition.
    pub fn compute_l(&self) -> Mat<f64> {
        Mat::from_fn(self.dim(), self.dim(), |i, j| match i.cmp(&j) {
            core::cmp::Ordering::Less => 0.0,
            core::cmp::Ordering::Equal => self.diag[i],
            core::cmp::Ordering::Greater => self.factors.read(i, j),
        })
    }

    /// Solves the equation `self * X = rhs`, and stores the result in `rhs`.
    #[track_caller]
    pub fn solve_in_place(&self, rhs: MatMut<'_, f64>) {
        llt::solve::solve_in_place(self.factors.as_ref(), &self.diag, rhs);
    }

    /// Solves the equation `self * X = rhs`, and returns the result.
    #[track_caller]
    pub fn solve(&self, rhs: MatRef<'_, f64>) -> Mat<f64> {
        let mut sol = rhs.to_owned();
        self.solve_in_place(sol.as_mut());
        sol
    }

    /// Reconstructs the original matrix using the decomposition.
    pub fn reconstruct(&self) -> Mat<f64> {
        let mut rec = Mat::zeros(self.dim(), self.dim());
        llt::reconstruct::reconstruct(rec.as_mut(), self.factors.as_ref(), &self.diag);
        rec
    }
}

impl PartialPivLu {
    /// Returns the LU decomposition of the input matrix with partial (row) pivoting, or an error
    /// if the matrix is singular.
    ///
    /// The factorization is such that $PA = LU$, where $L$ is unit lower triangular, $U$ is upper
    /// triangular, and $P$ is the permutation arising from the pivoting.
    #[track_caller]
    pub fn try_new(matrix: MatRef<'_, f64>) -> Result<Self, LuError> {
        assert!(matrix.nrows() == matrix.ncols());
        let dim = matrix.nrows();

        let mut factors = matrix.to_owned();
        let mut perm = vec![0usize; dim];
        let info = lu::compute::lu_in_place(
            factors.as_mut(),
            &mut perm,
            Default::default(),
            Progress::none(),
        )?;

        Ok(Self {
            factors,
            perm,
            transposition_count: info.transposition_count,
        })
    }

    fn dim(&self) -> usize {
        self.factors.nrows()
    }

    /// Returns the row transpositions due to pivoting: row `i` was swapped with row
    /// `transpositions()[i]` at step `i`.
    pub fn transpositions(&self) -> &[usize] {
        &self.perm
    }

    /// Returns the number of transpositions that consitute the permutation.
    pub fn transposition_count(&self) -> usize {
        self.transposition_count
    }

    /// Returns the factor $L$ of the LU decomposition.
    pub fn compute_l(&self) -> Mat<f64> {
        Mat::from_fn(self.dim(), self.dim(), |i, j| match i.cmp(&j) {
            core::cmp::Ordering::Less => 0.0,
            core::cmp::Ordering::Equal => 1.0,
            core::cmp::Ordering::Greater => self.factors.read(i, j),
        })
    }

    /// Returns the factor $U$ of the LU decomposition.
    pub fn compute_u(&self) -> Mat<f64> {
        Mat::from_fn(self.dim(), self.dim(), |i, j| {
            if i <= j {
                self.factors.read(i, j)
            } else {
                0.0
            }
        })
    }

    /// Solves the equation `self * X = rhs`, and stores the result in `rhs`.
    #[track_caller]
    pub fn solve_in_place(&self, rhs: MatMut<'_, f64>) {
        lu::solve::solve_in_place(self.factors.as_ref(), &self.perm, rhs);
    }

    /// Solves the equation `self * X = rhs`, and returns the result.
    #[track_caller]
    pub fn solve(&self, rhs: MatRef<'_, f64>) -> Mat<f64> {
        let mut sol = rhs.to_owned();
        self.solve_in_place(sol.as_mut());
        sol
    }

    /// Computes the inverse of the original matrix using the decomposition.
    pub fn inverse(&self) -> Mat<f64> {
        let mut inv = Mat::zeros(self.dim(), self.dim());
        lu::inverse::invert(inv.as_mut(), self.factors.as_ref(), &self.perm);
        inv
    }

    /// Computes the determinant of the original matrix using the decomposition.
    pub fn determinant(&self) -> f64 {
        lu::determinant::determinant_from_factors(self.factors.as_ref(), self.transposition_count)
    }

    /// Reconstructs the original matrix using the decomposition.
    pub fn reconstruct(&self) -> Mat<f64> {
        let mut rec = Mat::zeros(self.dim(), self.dim());
        lu::reconstruct::reconstruct(rec.as_mut(), self.factors.as_ref(), &self.perm);
        rec
    }
}

impl Qr {
    /// Returns the QR decomposition of the input matrix without pivoting.
    ///
    /// The factorization is such that $A = QR$, where $R$ is upper trapezoidal and $Q$ is
    /// orthogonal.
    #[track_caller]
    pub fn new(matrix: MatRef<'_, f64>) -> Self {
        let nrows = matrix.nrows();
        let ncols = matrix.ncols();
        let params = qr::compute::QrParams::default();

        let mut factors = matrix.to_owned();
        let mut householder_coeffs = vec![0.0; Ord::min(nrows, ncols)];

        qr::compute::qr_in_place(
            factors.as_mut(),
            &mut householder_coeffs,
            params,
            PodStack::new(&mut GlobalPodBuffer::new(
                qr::compute::qr_in_place_req(nrows, ncols, params).unwrap(),
            )),
            Progress::none(),
        );

        Self {
            factors,
            householder_coeffs,
            params,
        }
    }

    fn nrows(&self) -> usize {
        self.factors.nrows()
    }

    fn ncols(&self) -> usize {
        self.factors.ncols()
    }

    /// Returns the factor $R$ of the QR decomposition.
    pub fn compute_r(&self) -> Mat<f64> {
        Mat::from_fn(self.nrows(), self.ncols(), |i, j| {
            if i <= j {
                self.factors.read(i, j)
            } else {
                0.0
            }
        })
    }

    /// Returns the top $r$ rows of the factor $R$ of the QR decomposition, where $r =
    /// \min(\text{nrows}(A), \text{ncols}(A))$.
    pub fn compute_thin_r(&self) -> Mat<f64> {
        let size = self.householder_coeffs.len();
        Mat::from_fn(size, self.ncols(), |i, j| {
            if i <= j {
                self.factors.read(i, j)
            } else {
                0.0
            }
        })
    }

    /// Returns the factor $Q$ of the QR decomposition.
    pub fn compute_q(&self) -> Mat<f64> {
        self.compute_q_impl(self.nrows())
    }

    /// Returns the leftmost $r$ columns of the factor $Q$ of the QR decomposition, where $r =
    /// \min(\text{nrows}(A), \text{ncols}(A))$.
    pub fn compute_thin_q(&self) -> Mat<f64> {
        self.compute_q_impl(self.householder_coeffs.len())
    }

    fn compute_q_impl(&self, ncols: usize) -> Mat<f64> {
        let m = self.nrows();
        let size = self.householder_coeffs.len();

        let mut q = Mat::zeros(m, ncols);
        q.as_mut()
            .subcols_mut(0, size)
            .copy_from(self.factors.as_ref().subcols(0, size));

        qr::reconstruct::expand_q(
            q.as_mut(),
            &self.householder_coeffs,
            self.params,
            PodStack::new(&mut GlobalPodBuffer::new(
                qr::reconstruct::expand_q_req(m, ncols, self.params).unwrap(),
            )),
            Progress::none(),
        );
        q
    }

    /// Solves the least squares problem $\min_X \|AX - B\|$ in place. On exit, the top
    /// `self.ncols()` rows of `rhs` hold the solution.
    ///
    /// # Panics
    /// Panics if the decomposed matrix has fewer rows than columns, or if `rhs` does not have as
    /// many rows as it.
    #[track_caller]
    pub fn solve_lstsq_in_place(&self, rhs: MatMut<'_, f64>) {
        let rhs_ncols = rhs.ncols();
        qr::solve::solve_lstsq_in_place(
            self.factors.as_ref(),
            &self.householder_coeffs,
            rhs,
            self.params,
            PodStack::new(&mut GlobalPodBuffer::new(
                qr::solve::solve_lstsq_in_place_req(
                    self.nrows(),
                    self.ncols(),
                    rhs_ncols,
                    self.params,
                )
                .unwrap(),
            )),
        );
    }

    /// Solves the least squares problem $\min_X \|AX - B\|$, and returns the solution.
    #[track_caller]
    pub fn solve_lstsq(&self, rhs: MatRef<'_, f64>) -> Mat<f64> {
        let mut sol = rhs.to_owned();
        self.solve_lstsq_in_place(sol.as_mut());
        sol.as_ref().subrows(0, self.ncols()).to_owned()
    }
}

impl Svd {
    /// Returns the SVD of the input matrix, with the singular values sorted in decreasing order.
    ///
    /// The factorization is such that $A = USV^\top$, where $U$ has the shape of $A$, and $S$ and
    /// $V$ are square with as many columns as $A$.
    #[track_caller]
    pub fn try_new(matrix: MatRef<'_, f64>) -> Result<Self, SvdError> {
        let m = matrix.nrows();
        let n = matrix.ncols();
        let params = SvdParams {
            sort_singular_values: true,
            ..Default::default()
        };

        let mut u = matrix.to_owned();
        let mut s = vec![0.0; n];
        let mut v = Mat::zeros(n, n);

        svd::compute_svd_in_place(
            u.as_mut(),
            &mut s,
            v.as_mut(),
            params,
            PodStack::new(&mut GlobalPodBuffer::new(
                svd::compute_svd_req(m, n).unwrap(),
            )),
            Progress::none(),
        )?;

        Ok(Self { u, s, v })
    }

    /// Returns the factor $U$ of the SVD.
    pub fn u(&self) -> MatRef<'_, f64> {
        self.u.as_ref()
    }

    /// Returns the diagonal of the factor $S$ of the SVD.
    pub fn s(&self) -> &[f64] {
        &self.s
    }

    /// Returns the factor $V$ of the SVD.
    pub fn v(&self) -> MatRef<'_, f64> {
        self.v.as_ref()
    }

    /// Reconstructs the original matrix using the decomposition.
    pub fn reconstruct(&self) -> Mat<f64> {
        let us = Mat::from_fn(self.u.nrows(), self.u.ncols(), |i, j| {
            self.u.read(i, j) * self.s[j]
        });
        &us * self.v.transpose()
    }

    /// Computes the pseudoinverse of the original matrix using the decomposition.
    pub fn pseudo_inverse(&self) -> Mat<f64> {
        let mut u = self.u.clone();
        let mut pinv = Mat::zeros(self.v.nrows(), self.u.nrows());
        svd::pseudo_inverse::pseudo_inverse_from_svd(
            pinv.as_mut(),
            u.as_mut(),
            &self.s,
            self.v.as_ref(),
        );
        pinv
    }
}

impl MatRef<'_, f64> {
    /// Returns the Cholesky decomposition of `self`. Only the upper triangular part is accessed.
    #[track_caller]
    pub fn cholesky(&self) -> Result<Cholesky, CholeskyError> {
        Cholesky::try_new(*self)
    }

    /// Returns the LU decomposition of `self` with partial (row) pivoting.
    #[track_caller]
    pub fn partial_piv_lu(&self) -> Result<PartialPivLu, LuError> {
        PartialPivLu::try_new(*self)
    }

    /// Returns the QR decomposition of `self`.
    #[track_caller]
    pub fn qr(&self) -> Qr {
        Qr::new(*self)
    }

    /// Returns the SVD of `self`.
    #[track_caller]
    pub fn svd(&self) -> Result<Svd, SvdError> {
        Svd::try_new(*self)
    }

    /// Returns the determinant of `self`, or zero if it is singular.
    #[track_caller]
    pub fn determinant(&self) -> f64 {
        assert!(self.nrows() == self.ncols());
        let n = self.nrows();
        let params = Default::default();
        lu::determinant::determinant(
            *self,
            params,
            PodStack::new(&mut GlobalPodBuffer::new(
                lu::determinant::determinant_req(n).unwrap(),
            )),
            Progress::none(),
        )
    }

    /// Returns the inverse of `self`, or an error if it is singular.
    #[track_caller]
    pub fn inverse(&self) -> Result<Mat<f64>, LuError> {
        assert!(self.nrows() == self.ncols());
        let n = self.nrows();
        let mut inv = self.to_owned();
        lu::inverse::invert_in_place(
            inv.as_mut(),
            Default::default(),
            PodStack::new(&mut GlobalPodBuffer::new(
                lu::inverse::invert_in_place_req(n).unwrap(),
            )),
            Progress::none(),
        )?;
        Ok(inv)
    }

    /// Returns the pseudoinverse of `self`.
    #[track_caller]
    pub fn pseudo_inverse(&self) -> Result<Mat<f64>, SvdError> {
        let m = self.nrows();
        let n = self.ncols();
        let mut pinv = Mat::zeros(n, m);
        svd::pseudo_inverse::pseudo_inverse(
            pinv.as_mut(),
            *self,
            Default::default(),
            PodStack::new(&mut GlobalPodBuffer::new(
                svd::pseudo_inverse::pseudo_inverse_req(m, n).unwrap(),
            )),
            Progress::none(),
        )?;
        Ok(pinv)
    }

    /// Solves the equation `self * X = rhs` with a few steps of iterative refinement, and returns
    /// the result.
    #[track_caller]
    pub fn solve_with_refinement(&self, rhs: MatRef<'_, f64>) -> Result<Mat<f64>, LuError> {
        let n = self.nrows();
        let mut sol = Mat::zeros(n, rhs.ncols());
        lu::refine::solve_with_refinement(
            sol.as_mut(),
            *self,
            rhs,
            Default::default(),
            PodStack::new(&mut GlobalPodBuffer::new(
                lu::refine::solve_with_refinement_req(n, rhs.ncols()).unwrap(),
            )),
            Progress::none(),
        )?;
        Ok(sol)
    }

    /// Solves the equation `self * X = rhs` by Gauss-Jordan elimination with full pivoting, and
    /// returns the inverse of `self` along with the solution.
    #[track_caller]
    pub fn gauss_jordan(&self, rhs: MatRef<'_, f64>) -> Result<(Mat<f64>, Mat<f64>), LuError> {
        let n = self.nrows();
        let mut inv = Mat::zeros(n, n);
        let mut sol = Mat::zeros(n, rhs.ncols());
        gauss_jordan::gauss_jordan(
            inv.as_mut(),
            sol.as_mut(),
            *self,
            rhs,
            GaussJordanParams::default(),
            PodStack::new(&mut GlobalPodBuffer::new(
                gauss_jordan::gauss_jordan_in_place_req(n).unwrap(),
            )),
            Progress::none(),
        )?;
        Ok((inv, sol))
    }
}

impl Mat<f64> {
    /// Returns the Cholesky decomposition of `self`. Only the upper triangular part is accessed.
    #[track_caller]
    pub fn cholesky(&self) -> Result<Cholesky, CholeskyError> {
        self.as_ref().cholesky()
    }

    /// Returns the LU decomposition of `self` with partial (row) pivoting.
    #[track_caller]
    pub fn partial_piv_lu(&self) -> Result<PartialPivLu, LuError> {
        self.as_ref().partial_piv_lu()
    }

    /// Returns the QR decomposition of `self`.
    #[track_caller]
    pub fn qr(&self) -> Qr {
        self.as_ref().qr()
    }

    /// Returns the SVD of `self`.
    #[track_caller]
    pub fn svd(&self) -> Result<Svd, SvdError> {
        self.as_ref().svd()
    }

    /// Returns the determinant of `self`, or zero if it is singular.
    #[track_caller]
    pub fn determinant(&self) -> f64 {
        self.as_ref().determinant()
    }

    /// Returns the inverse of `self`, or an error if it is singular.
    #[track_caller]
    pub fn inverse(&self) -> Result<Mat<f64>, LuError> {
        self.as_ref().inverse()
    }

    /// Returns the pseudoinverse of `self`.
    #[track_caller]
    pub fn pseudo_inverse(&self) -> Result<Mat<f64>, SvdError> {
        self.as_ref().pseudo_inverse()
    }

    /// Solves the equation `self * X = rhs` with a few steps of iterative refinement, and returns
    /// the result.
    #[track_caller]
    pub fn solve_with_refinement(&self, rhs: MatRef<'_, f64>) -> Result<Mat<f64>, LuError> {
        self.as_ref().solve_with_refinement(rhs)
    }

    /// Solves the equation `self * X = rhs` by Gauss-Jordan elimination with full pivoting, and
    /// returns the inverse of `self` along with the solution.
    #[track_caller]
    pub fn gauss_jordan(&self, rhs: MatRef<'_, f64>) -> Result<(Mat<f64>, Mat<f64>), LuError> {
        self.as_ref().gauss_jordan(rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{assert, linalg::reductions::norm_max, mat};
    use assert_approx_eq::assert_approx_eq;

    #[track_caller]
    fn assert_mat_approx_eq(a: MatRef<'_, f64>, b: MatRef<'_, f64>) {
        assert!(all(a.nrows() == b.nrows(), a.ncols() == b.ncols()));
        let diff = a - b;
        assert!(norm_max(diff.as_ref()) < 1e-9);
    }

    fn random_spd(n: usize) -> Mat<f64> {
        let a = Mat::from_fn(n, n, |_, _| rand::random::<f64>());
        let mut spd = &a * a.transpose();
        for i in 0..n {
            spd.write(i, i, spd.read(i, i) + n as f64);
        }
        spd
    }

    #[test]
    fn test_lu() {
        let n = 20;
        let a = Mat::from_fn(n, n, |_, _| rand::random::<f64>());
        let b = Mat::from_fn(n, 3, |_, _| rand::random::<f64>());
        let lu = a.partial_piv_lu().unwrap();

        let x = lu.solve(b.as_ref());
        assert_mat_approx_eq((&a * &x).as_ref(), b.as_ref());

        let inv = lu.inverse();
        assert_mat_approx_eq((&a * &inv).as_ref(), Mat::identity(n, n).as_ref());

        assert_mat_approx_eq(lu.reconstruct().as_ref(), a.as_ref());

        // P A = L U
        let mut pa = a.clone();
        for (i, &p) in lu.transpositions().iter().enumerate() {
            pa.as_mut().swap_rows(i, p);
        }
        let prod = &lu.compute_l() * &lu.compute_u();
        assert_mat_approx_eq(prod.as_ref(), pa.as_ref());
    }

    #[test]
    fn test_determinant_and_inverse() {
        let a = mat![[0.0, 2.0], [3.0, 1.0f64]];
        assert_approx_eq!(a.determinant(), -6.0);
        assert_approx_eq!(a.partial_piv_lu().unwrap().determinant(), -6.0);

        let inv = a.inverse().unwrap();
        assert_mat_approx_eq(
            inv.as_ref(),
            mat![[-1.0 / 6.0, 1.0 / 3.0], [0.5, 0.0f64]].as_ref(),
        );

        let singular = mat![[1.0, 2.0], [2.0, 4.0f64]];
        assert!(singular.determinant() == 0.0);
        assert!(singular.inverse().is_err());
        assert!(singular.partial_piv_lu().is_err());
    }

    #[test]
    fn test_cholesky() {
        let n = 15;
        let a = random_spd(n);
        let b = Mat::from_fn(n, 2, |_, _| rand::random::<f64>());
        let llt = a.cholesky().unwrap();

        let x = llt.solve(b.as_ref());
        assert_mat_approx_eq((&a * &x).as_ref(), b.as_ref());

        let l = llt.compute_l();
        assert_mat_approx_eq((&l * l.transpose()).as_ref(), a.as_ref());
        assert_mat_approx_eq(llt.reconstruct().as_ref(), a.as_ref());

        let not_spd = mat![[1.0, 2.0], [2.0, 1.0f64]];
        assert!(matches!(
            not_spd.cholesky(),
            Err(CholeskyError::NotPositiveDefinite { minor: 2 })
        ));
    }

    #[test]
    fn test_qr() {
        for (m, n) in [(20, 20), (30, 12), (12, 30)] {
            let a = Mat::from_fn(m, n, |_, _| rand::random::<f64>());
            let qr = a.qr();
            let size = Ord::min(m, n);

            let q = qr.compute_q();
            let r = qr.compute_r();
            assert_mat_approx_eq((&q * &r).as_ref(), a.as_ref());

            let thin_q = qr.compute_thin_q();
            let thin_r = qr.compute_thin_r();
            assert!(all(thin_q.ncols() == size, thin_r.nrows() == size));
            assert_mat_approx_eq((&thin_q * &thin_r).as_ref(), a.as_ref());
            assert_mat_approx_eq(
                (thin_q.transpose() * &thin_q).as_ref(),
                Mat::identity(size, size).as_ref(),
            );
        }
    }

    #[test]
    fn test_qr_lstsq() {
        let (m, n) = (40, 7);
        let a = Mat::from_fn(m, n, |_, _| rand::random::<f64>());
        let x_exact = Mat::from_fn(n, 2, |_, _| rand::random::<f64>());
        let b = &a * &x_exact;

        let x = a.qr().solve_lstsq(b.as_ref());
        assert_mat_approx_eq(x.as_ref(), x_exact.as_ref());
    }

    #[test]
    fn test_svd() {
        for (m, n) in [(15, 15), (25, 10), (10, 25)] {
            let a = Mat::from_fn(m, n, |_, _| rand::random::<f64>());
            let svd = a.svd().unwrap();

            assert!(svd.s().windows(2).all(|w| w[0] >= w[1]));
            assert!(svd.s().iter().all(|&x| x >= 0.0));
            assert_mat_approx_eq(svd.reconstruct().as_ref(), a.as_ref());

            let pinv = svd.pseudo_inverse();
            assert_mat_approx_eq(pinv.as_ref(), a.pseudo_inverse().unwrap().as_ref());
            assert_mat_approx_eq((&(&a * &pinv) * &a).as_ref(), a.as_ref());
        }
    }

    #[test]
    fn test_refinement_and_gauss_jordan() {
        let n = 12;
        let a = Mat::from_fn(n, n, |i, j| {
            rand::random::<f64>() + if i == j { 2.0 } else { 0.0 }
        });
        let b = Mat::from_fn(n, 3, |_, _| rand::random::<f64>());

        let x = a.solve_with_refinement(b.as_ref()).unwrap();
        assert_mat_approx_eq((&a * &x).as_ref(), b.as_ref());

        let (inv, sol) = a.gauss_jordan(b.as_ref()).unwrap();
        assert_mat_approx_eq(sol.as_ref(), x.as_ref());
        assert_mat_approx_eq((&a * &inv).as_ref(), Mat::identity(n, n).as_ref());
    }
}

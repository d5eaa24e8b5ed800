use crate::{
    assert,
    mat::{MatMut, MatRef},
};
use reborrow::*;

// Forward substitution starts at the first nonzero entry of the permuted right-hand side, since
// the leading zeros of `P b` stay zero through `L^-1`.
fn solve_column(lu_factors: MatRef<'_, f64>, perm: &[usize], mut col: MatMut<'_, f64>) {
    let n = lu_factors.nrows();
    let mut first_nonzero = None;

    unsafe {
        for i in 0..n {
            let p = perm[i];
            let mut sum = col.read_unchecked(p, 0);
            col.write_unchecked(p, 0, col.read_unchecked(i, 0));
            if let Some(first) = first_nonzero {
                for j in first..i {
                    sum -= lu_factors.read_unchecked(i, j) * col.read_unchecked(j, 0);
                }
            } else if sum != 0.0 {
                first_nonzero = Some(i);
            }
            col.write_unchecked(i, 0, sum);
        }

        for i in (0..n).rev() {
            let mut sum = col.read_unchecked(i, 0);
            for j in i + 1..n {
                sum -= lu_factors.read_unchecked(i, j) * col.read_unchecked(j, 0);
            }
            col.write_unchecked(i, 0, sum / lu_factors.read_unchecked(i, i));
        }
    }
}

/// Given the LU factors of a matrix $A$ and the transpositions of its row permutation, computes
/// the solution of the linear system
/// $$A X = B,$$
/// and stores the result in `rhs`, which holds $B$ on entry.
///
/// # Panics
/// - Panics if `lu_factors` is not a square matrix.
/// - Panics if `perm.len() != lu_factors.nrows()`.
/// - Panics if `rhs.nrows() != lu_factors.nrows()`.
#[track_caller]
pub fn solve_in_place(lu_factors: MatRef<'_, f64>, perm: &[usize], rhs: MatMut<'_, f64>) {
    let mut rhs = rhs;
    let n = lu_factors.nrows();
    assert!(all(
        lu_factors.ncols() == n,
        perm.len() == n,
        rhs.nrows() == n,
    ));

    for j in 0..rhs.ncols() {
        solve_column(lu_factors, perm, rhs.rb_mut().col_mut(j));
    }
}

/// Given the LU factors of a matrix $A$ and the transpositions of its row permutation, computes
/// the solution of the linear system
/// $$A X = B,$$
/// and stores the result in `dst`.
///
/// # Panics
/// - Panics if `lu_factors` is not a square matrix.
/// - Panics if `perm.len() != lu_factors.nrows()`.
/// - Panics if `rhs` and `dst` don't have the same shape, or their number of rows differs from
/// the dimension of `lu_factors`.
#[track_caller]
pub fn solve(
    dst: MatMut<'_, f64>,
    lu_factors: MatRef<'_, f64>,
    perm: &[usize],
    rhs: MatRef<'_, f64>,
) {
    let mut dst = dst;
    dst.copy_from(rhs);
    solve_in_place(lu_factors, perm, dst);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        assert,
        linalg::{
            lu::partial_pivoting::compute::lu_in_place, matmul::matmul, reductions::norm_max,
        },
        mat::Mat,
        Progress,
    };
    use rand::random;

    #[test]
    fn test_solve() {
        for n in [1, 2, 5, 31, 64] {
            let k = 3;
            let a = Mat::from_fn(n, n, |_, _| random::<f64>());
            let b = Mat::from_fn(n, k, |_, _| random::<f64>());

            let mut lu = a.clone();
            let mut perm = vec![0usize; n];
            lu_in_place(lu.as_mut(), &mut perm, Default::default(), Progress::none()).unwrap();

            let mut x = Mat::zeros(n, k);
            solve(x.as_mut(), lu.as_ref(), &perm, b.as_ref());

            let mut residual = b.clone();
            matmul(residual.as_mut(), a.as_ref(), x.as_ref(), Some(1.0), -1.0);
            assert!(norm_max(residual.as_ref()) < 1e-9);
        }
    }

    #[test]
    fn leading_zeros_in_rhs() {
        let n = 6;
        let a = Mat::from_fn(n, n, |_, _| random::<f64>());
        let b = Mat::from_fn(n, 1, |i, _| if i < 4 { 0.0 } else { random::<f64>() });

        let mut lu = a.clone();
        let mut perm = vec![0usize; n];
        lu_in_place(lu.as_mut(), &mut perm, Default::default(), Progress::none()).unwrap();

        let mut x = b.clone();
        solve_in_place(lu.as_ref(), &perm, x.as_mut());

        let mut residual = b.clone();
        matmul(residual.as_mut(), a.as_ref(), x.as_ref(), Some(1.0), -1.0);
        assert!(norm_max(residual.as_ref()) < 1e-9);
    }
}

use super::compute::{lu_in_place, PartialPivLuParams};
use crate::{
    assert,
    linalg::{temp_mat_req, temp_mat_uninit, temp_vec_req},
    mat::{MatMut, MatRef},
    progress::Progress,
};
use dyn_stack::{PodStack, SizeOverflow, StackReq};
use reborrow::*;

/// Computes the determinant of a matrix from its partial pivoting LU factors and the number of
/// transpositions of its row permutation.
///
/// # Panics
/// Panics if `lu_factors` is not a square matrix.
#[track_caller]
pub fn determinant_from_factors(lu_factors: MatRef<'_, f64>, transposition_count: usize) -> f64 {
    assert!(lu_factors.nrows() == lu_factors.ncols());
    let mut det = if transposition_count % 2 == 0 {
        1.0
    } else {
        -1.0
    };
    for i in 0..lu_factors.nrows() {
        det *= unsafe { lu_factors.read_unchecked(i, i) };
    }
    det
}

/// Computes the size and alignment of required workspace for computing the determinant of an
/// `n×n` matrix out of place.
pub fn determinant_req(n: usize) -> Result<StackReq, SizeOverflow> {
    StackReq::try_all_of([temp_mat_req(n, n)?, temp_vec_req::<usize>(n)?])
}

/// Computes the determinant of `matrix`, decomposing it in place.
///
/// The result is exactly zero when the decomposition finds the matrix singular.
///
/// # Panics
/// - Panics if `matrix` is not square.
/// - Panics if the provided memory in `stack` is insufficient (see [`determinant_req`]).
#[track_caller]
pub fn determinant_in_place(
    matrix: MatMut<'_, f64>,
    params: PartialPivLuParams,
    stack: PodStack<'_>,
    progress: Progress<'_>,
) -> f64 {
    let mut matrix = matrix;
    let n = matrix.nrows();
    assert!(matrix.ncols() == n);

    let (perm, _) = stack.make_raw::<usize>(n);
    match lu_in_place(matrix.rb_mut(), perm, params, progress) {
        Ok(info) => determinant_from_factors(matrix.rb(), info.transposition_count),
        Err(_) => 0.0,
    }
}

/// Computes the determinant of `matrix`, which is left untouched.
///
/// The result is exactly zero when the decomposition finds the matrix singular.
///
/// # Panics
/// - Panics if `matrix` is not square.
/// - Panics if the provided memory in `stack` is insufficient (see [`determinant_req`]).
#[track_caller]
pub fn determinant(
    matrix: MatRef<'_, f64>,
    params: PartialPivLuParams,
    stack: PodStack<'_>,
    progress: Progress<'_>,
) -> f64 {
    let n = matrix.nrows();
    assert!(matrix.ncols() == n);

    let (mut lu, stack) = temp_mat_uninit(n, n, stack);
    lu.copy_from(matrix);
    determinant_in_place(lu, params, stack, progress)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{assert, mat, mat::Mat};
    use assert_approx_eq::assert_approx_eq;

    macro_rules! make_stack {
        ($req: expr) => {
            ::dyn_stack::PodStack::new(&mut ::dyn_stack::GlobalPodBuffer::new($req.unwrap()))
        };
    }

    fn det(matrix: MatRef<'_, f64>) -> f64 {
        determinant(
            matrix,
            Default::default(),
            make_stack!(determinant_req(matrix.nrows())),
            Progress::none(),
        )
    }

    #[test]
    fn identity_and_known_values() {
        assert!(det(Mat::<f64>::identity(5, 5).as_ref()) == 1.0);
        assert_approx_eq!(det(mat![[1.0, 2.0], [3.0, 4.0f64]].as_ref()), -2.0);
        assert_approx_eq!(
            det(mat![[2.0, 0.0, 1.0], [1.0, 3.0, 2.0], [1.0, 1.0, 2.0f64]].as_ref()),
            6.0
        );
        assert!(det(Mat::<f64>::zeros(0, 0).as_ref()) == 1.0);
    }

    #[test]
    fn singular_is_exactly_zero() {
        let zero_row = mat![[1.0, 2.0, 3.0], [0.0, 0.0, 0.0], [4.0, 5.0, 6.0f64]];
        assert!(det(zero_row.as_ref()) == 0.0);
        assert!(det(Mat::<f64>::zeros(3, 3).as_ref()) == 0.0);
    }

    #[test]
    fn row_swap_flips_sign() {
        let n = 7;
        let a = Mat::from_fn(n, n, |_, _| rand::random::<f64>());
        let mut swapped = a.clone();
        swapped.as_mut().swap_rows(1, 4);

        let d = det(a.as_ref());
        assert_approx_eq!(det(swapped.as_ref()), -d, 1e-12 * d.abs().max(1.0));
    }
}

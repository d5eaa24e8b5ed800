//! Householder transformations.
//!
//! A Householder reflection is a linear transformation that describes a reflection about a
//! hyperplane that crosses the origin of the space. Here it is written as
//! $$H = I - \tau v v^\top,$$
//! where the vector $v$ has its first component equal to one, so that only the components after
//! the first (the "essential" part) need to be stored.
//!
//! A block Householder transformation is a sequence of such transformations
//! $H_0, H_1, \dots, H_{k-1}$ applied one after the other, with the restriction that the first
//! $i$ components of the vector $v_i$ of the $i$-th transformation are zero, and the component at
//! index $i$ is one. The matrix $V = [v_0\ v_1\ \dots\ v_{k-1}]$ is thus a lower trapezoidal
//! matrix with unit diagonal. We call it the Householder basis.
//!
//! There exists a unique upper triangular matrix $T$, that we call the Householder factor, such
//! that $$H_0 \times \dots \times H_{k-1} = I - VTV^\top.$$
//! Applying the whole block then costs a few matrix multiplications instead of $k$ rank one
//! updates.

use crate::{
    assert,
    linalg::{
        mat_ops::scale_in_place, matmul::matmul_with_threshold, reductions::norm_l2,
        temp_mat_req, temp_mat_uninit,
    },
    mat::{MatMut, MatRef},
};
use dyn_stack::{PodStack, SizeOverflow, StackReq};
use reborrow::*;

#[inline(always)]
fn sign(magnitude: f64, sign_of: f64) -> f64 {
    if sign_of >= 0.0 {
        magnitude.abs()
    } else {
        -magnitude.abs()
    }
}

/// Computes the Householder reflection $H = I - \tau v v^\top$ such that
/// $H \begin{pmatrix} \alpha \\ x \end{pmatrix} = \begin{pmatrix} \beta \\ 0 \end{pmatrix}$,
/// where $\alpha$ is `head` and $x$ is the column vector `essential`.
///
/// On exit, `head` holds $\beta$, `essential` holds the essential part of $v$, and $\tau$ is
/// returned. $\tau$ is zero (and $H$ the identity) when `essential` is already zero.
///
/// The sign of $\beta$ is chosen opposite to that of $\alpha$ so that no cancellation occurs, and
/// the vector is rescaled when $|\beta|$ would underflow.
#[track_caller]
pub fn make_householder_in_place(head: &mut f64, essential: MatMut<'_, f64>) -> f64 {
    let mut essential = essential;
    assert!(essential.ncols() == 1);

    let mut tail_norm = norm_l2(essential.rb());
    if tail_norm == 0.0 {
        return 0.0;
    }

    let safmin = f64::MIN_POSITIVE / f64::EPSILON;
    let rsafmin = 1.0 / safmin;

    let mut alpha = *head;
    let mut beta = -sign(alpha.hypot(tail_norm), alpha);

    let mut rescale_count = 0usize;
    if beta.abs() < safmin {
        loop {
            rescale_count += 1;
            scale_in_place(essential.rb_mut(), rsafmin);
            beta *= rsafmin;
            alpha *= rsafmin;
            if beta.abs() >= safmin || rescale_count >= 20 {
                break;
            }
        }
        tail_norm = norm_l2(essential.rb());
        beta = -sign(alpha.hypot(tail_norm), alpha);
    }

    let tau = (beta - alpha) / beta;
    scale_in_place(essential, 1.0 / (alpha - beta));
    for _ in 0..rescale_count {
        beta *= safmin;
    }
    *head = beta;
    tau
}

/// Applies the Householder reflection $I - \tau v v^\top$ to `matrix` from the left, where $v$
/// has a unit first component followed by `essential`.
///
/// # Panics
/// Panics if `essential` is not a column vector with `matrix.nrows() - 1` rows.
#[track_caller]
pub fn apply_householder_on_the_left(
    matrix: MatMut<'_, f64>,
    essential: MatRef<'_, f64>,
    tau: f64,
) {
    let mut matrix = matrix;
    let m = matrix.nrows();
    assert!(all(m > 0, essential.ncols() == 1, essential.nrows() == m - 1));
    if tau == 0.0 {
        return;
    }

    for j in 0..matrix.ncols() {
        unsafe {
            let mut w = matrix.read_unchecked(0, j);
            for i in 1..m {
                w += essential.read_unchecked(i - 1, 0) * matrix.read_unchecked(i, j);
            }
            w *= tau;
            matrix.write_unchecked(0, j, matrix.read_unchecked(0, j) - w);
            for i in 1..m {
                let x = matrix.read_unchecked(i, j) - w * essential.read_unchecked(i - 1, 0);
                matrix.write_unchecked(i, j, x);
            }
        }
    }
}

/// Computes the upper triangular Householder factor $T$ of the block reflector
/// $H_0 \times \dots \times H_{k-1} = I - VTV^\top$, where $V$ is the unit lower trapezoidal part
/// of `householder_basis` and `householder_coeffs` holds the $\tau_i$.
///
/// Only the upper triangle of `householder_factor` is written.
///
/// # Panics
/// Panics if `householder_factor` is not `k×k`, if `householder_basis` has fewer than `k` rows or
/// a number of columns other than `k`, or if `householder_coeffs.len() != k`.
#[track_caller]
pub fn make_householder_factor(
    householder_factor: MatMut<'_, f64>,
    householder_basis: MatRef<'_, f64>,
    householder_coeffs: &[f64],
) {
    let mut t = householder_factor;
    let v = householder_basis;
    let k = householder_coeffs.len();
    let m = v.nrows();
    assert!(all(
        t.nrows() == k,
        t.ncols() == k,
        v.ncols() == k,
        m >= k,
    ));

    for i in 0..k {
        let tau = householder_coeffs[i];
        unsafe {
            if tau == 0.0 {
                for j in 0..=i {
                    t.write_unchecked(j, i, 0.0);
                }
                continue;
            }

            // T[0..i, i] = -tau V[i.., 0..i]^T v_i
            for j in 0..i {
                let mut dot = v.read_unchecked(i, j);
                for r in i + 1..m {
                    dot += v.read_unchecked(r, j) * v.read_unchecked(r, i);
                }
                t.write_unchecked(j, i, -tau * dot);
            }

            // T[0..i, i] = T[0..i, 0..i] T[0..i, i]
            for j in 0..i {
                let mut acc = 0.0;
                for l in j..i {
                    acc += t.read_unchecked(j, l) * t.read_unchecked(l, i);
                }
                t.write_unchecked(j, i, acc);
            }

            t.write_unchecked(i, i, tau);
        }
    }
}

/// Computes the size and alignment of required workspace for applying a block Householder
/// transformation with a basis of `blocksize` columns to a matrix with `ncols` columns.
pub fn apply_block_householder_on_the_left_req(
    blocksize: usize,
    ncols: usize,
) -> Result<StackReq, SizeOverflow> {
    temp_mat_req(blocksize, ncols)
}

/// Computes the product of the block Householder transformation $I - VTV^\top$ (or its transpose
/// $I - VT^\top V^\top$ if `transpose` is `true`) and `matrix`, and stores the result in `matrix`.
///
/// $V$ is the unit lower trapezoidal part of `householder_basis`. The products with the trailing
/// rows go through the blocked multiply when their size exceeds `matmul_threshold`.
///
/// # Panics
/// Panics if the dimensions of the basis, the factor and the matrix do not agree.
#[track_caller]
pub fn apply_block_householder_on_the_left(
    matrix: MatMut<'_, f64>,
    householder_basis: MatRef<'_, f64>,
    householder_factor: MatRef<'_, f64>,
    transpose: bool,
    matmul_threshold: usize,
    stack: PodStack<'_>,
) {
    let k = householder_basis.ncols();
    let m = matrix.nrows();
    let n = matrix.ncols();
    assert!(all(
        householder_basis.nrows() == m,
        m >= k,
        householder_factor.nrows() == k,
        householder_factor.ncols() == k,
    ));

    let t = householder_factor;
    let (v1, v2) = householder_basis.split_at_row(k);
    let (mut c1, mut c2) = matrix.split_at_row_mut(k);
    let (mut w, _) = temp_mat_uninit(k, n, stack);

    // W = V1^T C1 + V2^T C2
    for j in 0..n {
        for i in 0..k {
            unsafe {
                let mut acc = c1.read_unchecked(i, j);
                for r in i + 1..k {
                    acc += v1.read_unchecked(r, i) * c1.read_unchecked(r, j);
                }
                w.write_unchecked(i, j, acc);
            }
        }
    }
    matmul_with_threshold(
        w.rb_mut(),
        v2.transpose(),
        c2.rb(),
        Some(1.0),
        1.0,
        matmul_threshold,
    );

    // W = op(T) W
    for j in 0..n {
        unsafe {
            if transpose {
                for i in (0..k).rev() {
                    let mut acc = 0.0;
                    for r in 0..=i {
                        acc += t.read_unchecked(r, i) * w.read_unchecked(r, j);
                    }
                    w.write_unchecked(i, j, acc);
                }
            } else {
                for i in 0..k {
                    let mut acc = 0.0;
                    for r in i..k {
                        acc += t.read_unchecked(i, r) * w.read_unchecked(r, j);
                    }
                    w.write_unchecked(i, j, acc);
                }
            }
        }
    }

    // C -= V W
    matmul_with_threshold(
        c2.rb_mut(),
        v2,
        w.rb(),
        Some(1.0),
        -1.0,
        matmul_threshold,
    );
    for j in 0..n {
        for r in 0..k {
            unsafe {
                let mut acc = w.read_unchecked(r, j);
                for i in 0..r {
                    acc += v1.read_unchecked(r, i) * w.read_unchecked(i, j);
                }
                c1.write_unchecked(r, j, c1.read_unchecked(r, j) - acc);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        assert,
        linalg::{matmul::DEFAULT_THRESHOLD, temp_mat_zeroed},
        mat::Mat,
    };
    use assert_approx_eq::assert_approx_eq;
    use dyn_stack::GlobalPodBuffer;

    #[test]
    fn reflector_annihilates_tail() {
        for (head, tail) in [
            (3.0, [4.0, 0.0]),
            (-1.0, [2.0, -2.0]),
            (0.0, [1e-310, 1e-310]),
        ] {
            let mut h = head;
            let mut ess = Mat::from_fn(2, 1, |i, _| tail[i]);
            let tau = make_householder_in_place(&mut h, ess.as_mut());
            let norm = (head * head + tail[0] * tail[0] + tail[1] * tail[1]).sqrt();
            assert!(h.abs() > 0.0);

            let mut x = Mat::from_fn(3, 1, |i, _| if i == 0 { head } else { tail[i - 1] });
            apply_householder_on_the_left(x.as_mut(), ess.as_ref(), tau);
            if norm > 1e-300 {
                assert_approx_eq!(x.read(0, 0), h, 1e-12 * norm);
                assert_approx_eq!(h.abs(), norm, 1e-12 * norm);
                assert!(x.read(1, 0).abs() < 1e-12 * norm);
                assert!(x.read(2, 0).abs() < 1e-12 * norm);
            }
        }
    }

    #[test]
    fn zero_tail_is_identity() {
        let mut h = 2.0;
        let mut ess = Mat::<f64>::zeros(3, 1);
        assert!(make_householder_in_place(&mut h, ess.as_mut()) == 0.0);
        assert!(h == 2.0);
    }

    #[test]
    fn block_matches_sequence() {
        let m = 9;
        let k = 4;
        let n = 5;

        let mut basis = Mat::from_fn(m, k, |_, _| rand::random::<f64>());
        let mut taus = [0.0; 4];
        for j in 0..k {
            let (_, _, _, mut rest) = basis.as_mut().split_at_mut(j, j);
            let (head, tail) = rest.rb_mut().col_mut(0).split_at_row_mut(1);
            let mut h = head.read(0, 0);
            taus[j] = make_householder_in_place(&mut h, tail);
        }

        let c = Mat::from_fn(m, n, |_, _| rand::random::<f64>());

        for transpose in [false, true] {
            let mut expected = c.clone();
            let order: Vec<usize> = if transpose {
                (0..k).collect()
            } else {
                (0..k).rev().collect()
            };
            for j in order {
                apply_householder_on_the_left(
                    expected.as_mut().subrows_mut(j, m - j),
                    basis.as_ref().submatrix(j + 1, j, m - j - 1, 1),
                    taus[j],
                );
            }

            let mut mem = GlobalPodBuffer::new(
                StackReq::try_all_of([
                    temp_mat_req(k, k).unwrap(),
                    apply_block_householder_on_the_left_req(k, n).unwrap(),
                ])
                .unwrap(),
            );
            let stack = PodStack::new(&mut mem);
            let (mut t, stack) = temp_mat_zeroed(k, k, stack);
            make_householder_factor(t.rb_mut(), basis.as_ref(), &taus);

            let mut actual = c.clone();
            apply_block_householder_on_the_left(
                actual.as_mut(),
                basis.as_ref(),
                t.rb(),
                transpose,
                DEFAULT_THRESHOLD,
                stack,
            );

            for j in 0..n {
                for i in 0..m {
                    assert_approx_eq!(actual.read(i, j), expected.read(i, j), 1e-12);
                }
            }
        }
    }
}

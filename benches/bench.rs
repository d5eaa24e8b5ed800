use criterion::{criterion_group, criterion_main, Criterion};
use dyn_stack::{GlobalPodBuffer, PodStack};
use rand::prelude::*;
use reborrow::*;

use densolve::{linalg, Mat, Progress};

fn random_mat(nrows: usize, ncols: usize) -> Mat<f64> {
    let rng = &mut StdRng::seed_from_u64(0);
    Mat::from_fn(nrows, ncols, |_, _| rng.gen::<f64>() - 0.5)
}

pub fn lu(c: &mut Criterion) {
    use linalg::lu::partial_pivoting::compute::*;

    for n in [32, 64, 128, 256, 512] {
        c.bench_function(&format!("densolve-lu-{n}"), |b| {
            let mat = random_mat(n, n);
            let mut copy = mat.clone();
            let mut perm = vec![0usize; n];

            b.iter(|| {
                copy.as_mut().copy_from(mat.as_ref());
                lu_in_place(
                    copy.as_mut(),
                    &mut perm,
                    Default::default(),
                    Progress::none(),
                )
                .unwrap();
            })
        });
    }
}

pub fn qr(c: &mut Criterion) {
    use linalg::qr::no_pivoting::compute::*;

    for n in [32, 64, 128, 256, 512] {
        c.bench_function(&format!("densolve-qr-{n}"), |b| {
            let mat = random_mat(n, n);
            let mut copy = mat.clone();
            let mut householder_coeffs = vec![0.0; n];
            let params = QrParams::default();
            let mut mem = GlobalPodBuffer::new(qr_in_place_req(n, n, params).unwrap());
            let mut stack = PodStack::new(&mut mem);

            b.iter(|| {
                copy.as_mut().copy_from(mat.as_ref());
                qr_in_place(
                    copy.as_mut(),
                    &mut householder_coeffs,
                    params,
                    stack.rb_mut(),
                    Progress::none(),
                );
            })
        });

        c.bench_function(&format!("densolve-qr-classic-{n}"), |b| {
            let mat = random_mat(n, n);
            let mut copy = mat.clone();
            let mut c_coeffs = vec![0.0; n];
            let mut d_coeffs = vec![0.0; n];

            b.iter(|| {
                copy.as_mut().copy_from(mat.as_ref());
                linalg::qr::classic::compute::qr_in_place(
                    copy.as_mut(),
                    &mut c_coeffs,
                    &mut d_coeffs,
                    Progress::none(),
                )
                .unwrap();
            })
        });
    }
}

pub fn svd(c: &mut Criterion) {
    use linalg::svd::*;

    for n in [16, 32, 64, 128, 256] {
        c.bench_function(&format!("densolve-svd-{n}"), |b| {
            let mat = random_mat(n, n);
            let mut u = mat.clone();
            let mut s = vec![0.0; n];
            let mut v = Mat::zeros(n, n);
            let mut mem = GlobalPodBuffer::new(compute_svd_req(n, n).unwrap());
            let mut stack = PodStack::new(&mut mem);

            b.iter(|| {
                u.as_mut().copy_from(mat.as_ref());
                compute_svd_in_place(
                    u.as_mut(),
                    &mut s,
                    v.as_mut(),
                    Default::default(),
                    stack.rb_mut(),
                    Progress::none(),
                )
                .unwrap();
            })
        });
    }
}

pub fn refinement(c: &mut Criterion) {
    use linalg::lu::partial_pivoting::refine::*;

    for n in [32, 64, 128, 256] {
        c.bench_function(&format!("densolve-refine-{n}"), |b| {
            let mat = random_mat(n, n);
            let rhs = random_mat(n, 4);
            let mut sol = Mat::zeros(n, 4);
            let mut mem = GlobalPodBuffer::new(solve_with_refinement_req(n, 4).unwrap());
            let mut stack = PodStack::new(&mut mem);

            b.iter(|| {
                solve_with_refinement(
                    sol.as_mut(),
                    mat.as_ref(),
                    rhs.as_ref(),
                    Default::default(),
                    stack.rb_mut(),
                    Progress::none(),
                )
                .unwrap();
            })
        });
    }
}

criterion_group!(benches, lu, qr, svd, refinement);
criterion_main!(benches);

use crate::vector::Mat3;

/// Pivots smaller than this fraction of the largest entry count as zero.
const PIVOT_RELATIVE_TOLERANCE: f64 = 1e-12;

/// Solve the 3x3 system `a · x = rhs` by Gauss-Jordan elimination with
/// partial pivoting on the augmented 3x4 matrix.
///
/// Returns `None` if `a` is singular or nearly so, or if anything in the
/// system isn't finite.
pub fn solve_normal_system(a: &Mat3, rhs: &[f64; 3]) -> Option<[f64; 3]> {
    let mut m = [[0.0; 4]; 3];
    for (row, (a_row, b)) in m.iter_mut().zip(a.iter().zip(rhs.iter())) {
        row[..3].copy_from_slice(a_row);
        row[3] = *b;
    }

    let scale = a
        .iter()
        .flatten()
        .fold(0.0, |acc: f64, x| libm::fmax(acc, x.abs()));
    let tolerance = libm::fmax(PIVOT_RELATIVE_TOLERANCE * scale, f64::MIN_POSITIVE);

    for col in 0..3 {
        // Partial pivoting: swap the row with the largest entry in this column into place.
        let pivot_row = (col..3)
            .max_by(|&i, &j| m[i][col].abs().total_cmp(&m[j][col].abs()))
            .unwrap_or(col);
        m.swap(col, pivot_row);

        let pivot = m[col][col];
        if pivot.is_nan() || pivot.abs() <= tolerance {
            return None;
        }
        for x in m[col].iter_mut() {
            *x /= pivot;
        }

        // Clear this column from every other row, above and below.
        let pivot_vals = m[col];
        for (r, row) in m.iter_mut().enumerate() {
            if r == col {
                continue;
            }
            let factor = row[col];
            for (x, p) in row.iter_mut().zip(pivot_vals.iter()) {
                *x -= factor * p;
            }
        }
    }

    let solution = [m[0][3], m[1][3], m[2][3]];
    solution.iter().all(|x| x.is_finite()).then_some(solution)
}

#[cfg(test)]
mod tests {
    use faer::{Col, Mat, prelude::Solve};
    use proptest::prelude::*;

    use super::*;
    use crate::tests::assert_nearly_eq;

    fn mat_vec(a: &Mat3, x: &[f64; 3]) -> [f64; 3] {
        [0, 1, 2].map(|i| a[i][0] * x[0] + a[i][1] * x[1] + a[i][2] * x[2])
    }

    #[test]
    fn identity() {
        let id = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
        let x = solve_normal_system(&id, &[4.0, -5.0, 6.0]).unwrap();
        assert_eq!(x, [4.0, -5.0, 6.0]);
    }

    #[test]
    fn needs_pivoting() {
        // Zero in the top-left corner, so naive elimination would divide by zero.
        let a = [[0.0, 2.0, 1.0], [1.0, 1.0, 0.0], [3.0, 0.0, 1.0]];
        let b = [5.0, 3.0, 6.0];
        let x = solve_normal_system(&a, &b).unwrap();
        let back = mat_vec(&a, &x);
        for (got, want) in back.iter().zip(b.iter()) {
            assert_nearly_eq(*got, *want);
        }
    }

    #[test]
    fn all_zero_is_singular() {
        assert!(solve_normal_system(&[[0.0; 3]; 3], &[1.0, 2.0, 3.0]).is_none());
    }

    #[test]
    fn rank_one_is_singular() {
        // J^T J for three identical Jacobian rows, e.g. three coincident anchors.
        let u = [0.6, 0.0, 0.8];
        let mut a = [[0.0; 3]; 3];
        for (i, row) in a.iter_mut().enumerate() {
            for (j, cell) in row.iter_mut().enumerate() {
                *cell = 3.0 * u[i] * u[j];
            }
        }
        assert!(solve_normal_system(&a, &[1.0, 1.0, 1.0]).is_none());
    }

    #[test]
    fn nan_is_rejected() {
        let mut a = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
        assert!(solve_normal_system(&a, &[f64::NAN, 0.0, 0.0]).is_none());
        a[1][1] = f64::NAN;
        assert!(solve_normal_system(&a, &[0.0, 0.0, 0.0]).is_none());
    }

    #[test]
    fn tiny_but_well_conditioned() {
        let a = [[1e-9, 0.0, 0.0], [0.0, 2e-9, 0.0], [0.0, 0.0, 4e-9]];
        let x = solve_normal_system(&a, &[1e-9, 1e-9, 1e-9]).unwrap();
        assert_nearly_eq(x[0], 1.0);
        assert_nearly_eq(x[1], 0.5);
        assert_nearly_eq(x[2], 0.25);
    }

    #[test]
    fn agrees_with_faer() {
        let a = [[4.0, 1.0, -2.0], [1.0, 5.0, 0.5], [-2.0, 0.5, 6.0]];
        let b = [1.0, -2.0, 3.0];
        let ours = solve_normal_system(&a, &b).unwrap();

        let a_faer = Mat::from_fn(3, 3, |i, j| a[i][j]);
        let b_faer = Col::from_fn(3, |i| b[i]);
        let theirs = a_faer.partial_piv_lu().solve(&b_faer);
        for (i, x) in ours.iter().enumerate() {
            assert_nearly_eq(*x, theirs[i]);
        }
    }

    /// Random symmetric positive-definite matrix, built as `m·mᵀ + εI`.
    fn spd() -> impl Strategy<Value = Mat3> {
        prop::array::uniform3(prop::array::uniform3(-10.0..10.0f64)).prop_map(|m| {
            let mut a = [[0.0; 3]; 3];
            for i in 0..3 {
                for j in 0..3 {
                    a[i][j] = (0..3).map(|k| m[i][k] * m[j][k]).sum();
                }
                a[i][i] += 0.1;
            }
            a
        })
    }

    proptest! {
        #[test]
        fn spd_round_trip(
            a in spd(),
            b in prop::array::uniform3(-100.0..100.0f64),
        ) {
            let x = solve_normal_system(&a, &b).expect("SPD matrices are invertible");
            let back = mat_vec(&a, &x);
            let b_norm = b.iter().map(|v| v * v).sum::<f64>().sqrt();
            let err = back
                .iter()
                .zip(b.iter())
                .map(|(p, q)| (p - q) * (p - q))
                .sum::<f64>()
                .sqrt();
            prop_assert!(err <= 1e-4 * b_norm.max(1.0), "residual {err} for |b| = {b_norm}");
        }
    }
}

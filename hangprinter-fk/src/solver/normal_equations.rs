use super::gauss_jordan::solve_normal_system;
use crate::vector::{Mat3, ZERO_MAT3};

/// The least-squares problem reduced to three unknowns:
/// `JᵀJ · δ = −Jᵀr`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NormalEquations {
    /// `JᵀJ`.
    pub jtj: Mat3,
    /// `Jᵀr`, the gradient of the cost.
    pub jtr: [f64; 3],
}

/// Sum `JᵀJ` and `Jᵀr` over every line.
/// `jacobian[i]` is the gradient of `residuals[i]`.
pub fn accumulate(jacobian: &[[f64; 3]], residuals: &[f64]) -> NormalEquations {
    debug_assert_eq!(
        jacobian.len(),
        residuals.len(),
        "every residual needs exactly one Jacobian row"
    );
    let mut jtj = ZERO_MAT3;
    let mut jtr = [0.0; 3];
    for (row, r) in jacobian.iter().zip(residuals.iter()) {
        for a in 0..3 {
            jtr[a] += row[a] * r;
            for b in 0..3 {
                jtj[a][b] += row[a] * row[b];
            }
        }
    }
    NormalEquations { jtj, jtr }
}

impl NormalEquations {
    /// Levenberg-Marquardt damping: add `eta` to the diagonal of `JᵀJ`.
    pub fn damped(mut self, eta: f64) -> Self {
        for (i, row) in self.jtj.iter_mut().enumerate() {
            row[i] += eta;
        }
        self
    }

    /// The Gauss-Newton step, or `None` if `JᵀJ` is singular.
    pub fn step(&self) -> Option<[f64; 3]> {
        let rhs = self.jtr.map(|g| -g);
        solve_normal_system(&self.jtj, &rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::assert_nearly_eq;

    #[test]
    fn sums_over_lines() {
        let jacobian = [[1.0, 0.0, 0.0], [0.0, 2.0, 0.0], [1.0, 1.0, 1.0]];
        let residuals = [1.0, -1.0, 0.5];
        let eqs = accumulate(&jacobian, &residuals);
        assert_eq!(
            eqs.jtj,
            [[2.0, 1.0, 1.0], [1.0, 5.0, 1.0], [1.0, 1.0, 1.0]]
        );
        assert_eq!(eqs.jtr, [1.5, -1.5, 0.5]);
    }

    #[test]
    fn jtj_is_symmetric() {
        let jacobian = [[0.3, -0.4, 0.1], [0.9, 0.2, -0.7], [-0.5, 0.5, 0.5], [0.0, 1.0, 0.2]];
        let eqs = accumulate(&jacobian, &[0.1, 0.2, 0.3, 0.4]);
        for a in 0..3 {
            for b in 0..3 {
                assert_nearly_eq(eqs.jtj[a][b], eqs.jtj[b][a]);
            }
        }
    }

    #[test]
    fn damping_only_touches_diagonal() {
        let eqs = accumulate(&[[1.0, 1.0, 0.0]], &[2.0]).damped(0.5);
        assert_eq!(eqs.jtj, [[1.5, 1.0, 0.0], [1.0, 1.5, 0.0], [0.0, 0.0, 0.5]]);
        assert_eq!(eqs.jtr, [2.0, 2.0, 0.0]);
    }

    #[test]
    fn step_solves_linear_least_squares() {
        // Residuals linear in the unknowns: r = x - (1, 2, 3).
        let jacobian = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
        let step = accumulate(&jacobian, &[-1.0, -2.0, -3.0]).step().unwrap();
        assert_nearly_eq(step[0], 1.0);
        assert_nearly_eq(step[1], 2.0);
        assert_nearly_eq(step[2], 3.0);
    }

    #[test]
    fn undamped_degenerate_jacobian_has_no_step() {
        let eqs = accumulate(&[[0.0; 3], [0.0; 3], [0.0; 3]], &[1.0, 1.0, 1.0]);
        assert!(eqs.step().is_none());
        assert!(eqs.damped(1e-3).step().is_some());
    }
}

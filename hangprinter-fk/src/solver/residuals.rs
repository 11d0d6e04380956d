use super::{DISTANCE_FLOOR, Model};
use crate::{
    MAX_ANCHORS,
    flex::{FlexModel, sample_flex},
    vector::{Mat3, V3, ZERO_MAT3},
};

/// Residuals and their derivatives at one trial position.
#[derive(Clone, Copy, Debug)]
pub struct Derivatives {
    residuals: [f64; MAX_ANCHORS],
    jacobian: [[f64; 3]; MAX_ANCHORS],
    hessians: Option<[Mat3; MAX_ANCHORS]>,
    cost: f64,
    len: usize,
}

impl Derivatives {
    /// Predicted minus measured line position, per line.
    pub fn residuals(&self) -> &[f64] {
        &self.residuals[..self.len]
    }

    /// Gradient of each residual with respect to effector position.
    pub fn jacobian(&self) -> &[[f64; 3]] {
        &self.jacobian[..self.len]
    }

    /// Hessian of each line's distance term, if it was asked for.
    pub fn hessians(&self) -> Option<&[Mat3]> {
        self.hessians.as_ref().map(|h| &h[..self.len])
    }

    /// `0.5 · Σ rᵢ²`.
    pub fn cost(&self) -> f64 {
        self.cost
    }
}

/// Distance from `anchor` to `position`, never below [`DISTANCE_FLOOR`].
#[inline(always)]
fn floored_distance(diff: V3) -> f64 {
    libm::fmax(diff.magnitude(), DISTANCE_FLOOR)
}

impl<F: FlexModel + ?Sized> Model<'_, F> {
    /// Evaluate every line's residual at `trial_position`, along with the
    /// Jacobian and, if `compute_hessian`, each line's distance Hessian.
    ///
    /// The Jacobian combines the analytic gradient of the distance with a
    /// central-difference gradient of the flex term. The Hessian covers the
    /// distance term only.
    pub fn residuals_and_derivatives(
        &self,
        trial_position: [f64; 3],
        compute_hessian: bool,
    ) -> Derivatives {
        let position = V3::from(trial_position);
        let flex = sample_flex(self.flex, position, self.impact_step);

        let mut out = Derivatives {
            residuals: [0.0; MAX_ANCHORS],
            jacobian: [[0.0; 3]; MAX_ANCHORS],
            hessians: compute_hessian.then_some([ZERO_MAT3; MAX_ANCHORS]),
            cost: 0.0,
            len: self.num_anchors(),
        };

        for i in 0..self.num_anchors() {
            let diff = position - V3::from(self.anchors[i]);
            let distance = floored_distance(diff);

            let residual = distance - self.origin_distances[i] + flex.flex[i] - self.measured[i];
            out.residuals[i] = residual;
            out.cost += 0.5 * residual * residual;

            let gradient = diff.scale(1.0 / distance) + flex.gradient[i];
            out.jacobian[i] = gradient.into();

            if let Some(hessians) = out.hessians.as_mut() {
                // d²‖d‖/dp² = (I − d⊗d / ‖d‖²) / ‖d‖
                let d = [diff.x, diff.y, diff.z];
                let dist_sq = distance * distance;
                for (a, row) in hessians[i].iter_mut().enumerate() {
                    for (b, cell) in row.iter_mut().enumerate() {
                        let identity = if a == b { 1.0 } else { 0.0 };
                        *cell = (identity - d[a] * d[b] / dist_sq) / distance;
                    }
                }
            }
        }
        out
    }

    /// Just the cost at `position`, evaluating the flex model once.
    pub(crate) fn cost_at(&self, position: [f64; 3]) -> f64 {
        let flex = self.flex.flex_distances(position);
        let position = V3::from(position);
        (0..self.num_anchors())
            .map(|i| {
                let distance = floored_distance(position - V3::from(self.anchors[i]));
                let residual =
                    distance - self.origin_distances[i] + flex[i] - self.measured[i];
                0.5 * residual * residual
            })
            .sum()
    }
}

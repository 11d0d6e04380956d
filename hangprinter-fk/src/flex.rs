//! Line flex: how much a line's spooled length deviates from the straight
//! anchor-to-effector distance, as a function of effector position.

use crate::{MAX_ANCHORS, vector::V3};

pub use static_force::StaticForceFlex;

/// Force balance based flex model.
mod static_force;

/// Perturbation used for the central-difference flex gradient by default.
pub const DEFAULT_IMPACT_STEP: f64 = 1e-3;

/// Something that knows how much each line flexes at a given position.
///
/// Implementations must be pure functions of position. Only the first
/// `num_anchors` entries of the output are read; the rest are ignored.
pub trait FlexModel {
    /// Signed correction to each line's spooled position, per anchor,
    /// when the effector is at `position`.
    fn flex_distances(&self, position: [f64; 3]) -> [f64; MAX_ANCHORS];
}

/// Lines that never stretch.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoFlex;

impl FlexModel for NoFlex {
    fn flex_distances(&self, _position: [f64; 3]) -> [f64; MAX_ANCHORS] {
        [0.0; MAX_ANCHORS]
    }
}

impl<F> FlexModel for F
where
    F: Fn([f64; 3]) -> [f64; MAX_ANCHORS],
{
    fn flex_distances(&self, position: [f64; 3]) -> [f64; MAX_ANCHORS] {
        self(position)
    }
}

/// Flex at one position, with its gradient.
#[derive(Clone, Copy, Debug)]
pub(crate) struct FlexSample {
    pub flex: [f64; MAX_ANCHORS],
    /// `gradient[i]` is d(flex of line i)/d(position).
    pub gradient: [V3; MAX_ANCHORS],
}

/// Evaluate `model` at `position`, plus once either side of it along each
/// axis, and take central differences.
pub(crate) fn sample_flex<M: FlexModel + ?Sized>(
    model: &M,
    position: V3,
    impact_step: f64,
) -> FlexSample {
    let flex = model.flex_distances(position.into());
    let mut gradient = [V3::ZERO; MAX_ANCHORS];
    let mut partials = [[0.0; MAX_ANCHORS]; 3];
    for (axis, partial) in partials.iter_mut().enumerate() {
        let plus = model.flex_distances(position.nudged(axis, impact_step).into());
        let minus = model.flex_distances(position.nudged(axis, -impact_step).into());
        for (out, (p, m)) in partial.iter_mut().zip(plus.iter().zip(minus.iter())) {
            *out = (p - m) / (2.0 * impact_step);
        }
    }
    for (i, g) in gradient.iter_mut().enumerate() {
        *g = V3::new(partials[0][i], partials[1][i], partials[2][i]);
    }
    FlexSample { flex, gradient }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::tests::assert_nearly_eq;

    #[test]
    fn rigid_lines_have_no_gradient() {
        let sample = sample_flex(&NoFlex, V3::new(1.0, 2.0, 3.0), DEFAULT_IMPACT_STEP);
        assert!(sample.flex.iter().all(|f| *f == 0.0));
        assert!(sample.gradient.iter().all(|g| *g == V3::ZERO));
    }

    #[test]
    fn central_difference_is_exact_for_quadratics() {
        // Line 0 flexes by x², line 1 by y*z.
        let model = |[x, y, z]: [f64; 3]| {
            let mut out = [0.0; MAX_ANCHORS];
            out[0] = x * x;
            out[1] = y * z;
            out
        };
        let sample = sample_flex(&model, V3::new(3.0, -2.0, 5.0), DEFAULT_IMPACT_STEP);
        assert_nearly_eq(sample.flex[0], 9.0);
        assert_nearly_eq(sample.flex[1], -10.0);
        assert_nearly_eq(sample.gradient[0].x, 6.0);
        assert_nearly_eq(sample.gradient[0].y, 0.0);
        assert_nearly_eq(sample.gradient[1].y, 5.0);
        assert_nearly_eq(sample.gradient[1].z, -2.0);
    }

    #[test]
    fn evaluates_seven_times() {
        let calls = Cell::new(0);
        let model = |_: [f64; 3]| {
            calls.set(calls.get() + 1);
            [0.0; MAX_ANCHORS]
        };
        sample_flex(&model, V3::ZERO, 0.5);
        assert_eq!(calls.get(), 7);
    }
}

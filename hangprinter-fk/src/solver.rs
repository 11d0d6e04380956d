use crate::{
    MAX_ANCHORS,
    datatypes::{AnchorValues, SolverResult},
    flex::{DEFAULT_IMPACT_STEP, FlexModel},
    vector::V3,
};

pub use gauss_jordan::solve_normal_system;
pub use normal_equations::{NormalEquations, accumulate};
pub use residuals::Derivatives;

/// 3x3 dense linear solves.
mod gauss_jordan;
/// Halley-then-LM state machine.
mod hybrid;
/// Reducing the per-line least-squares problem to 3 unknowns.
mod normal_equations;
/// Residuals, Jacobian and Hessians at a trial position.
mod residuals;

/// Distances are clamped to at least this, so an effector sitting exactly on
/// an anchor doesn't divide by zero.
pub const DISTANCE_FLOOR: f64 = 1e-6;

/// Tuning for the hybrid Halley / Levenberg-Marquardt iteration.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Config {
    /// Levenberg-Marquardt damping added to the diagonal of `JᵀJ`.
    pub eta: f64,
    /// Stop once a step is shorter than this.
    pub tol: f64,
    /// How many of the first iterations use the Halley correction.
    pub halley_iters: usize,
    /// Total iteration budget, Halley iterations included.
    pub max_iters: usize,
    /// Perturbation used to differentiate the flex model numerically.
    pub impact_step: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            eta: 1e-3,
            tol: 1e-3,
            halley_iters: 3,
            max_iters: 30,
            impact_step: DEFAULT_IMPACT_STEP,
        }
    }
}

impl Config {
    /// Plain damped Gauss-Newton, no Halley correction.
    pub fn levenberg_marquardt() -> Self {
        Self {
            halley_iters: 0,
            ..Self::default()
        }
    }

    /// Halley correction on every iteration.
    pub fn halley(max_iters: usize) -> Self {
        Self {
            halley_iters: max_iters,
            max_iters,
            ..Self::default()
        }
    }

    /// Set the damping.
    pub fn with_eta(mut self, eta: f64) -> Self {
        self.eta = eta;
        self
    }

    /// Set the step-length convergence threshold.
    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    /// Set how many iterations use the Halley correction.
    pub fn with_halley_iters(mut self, halley_iters: usize) -> Self {
        self.halley_iters = halley_iters;
        self
    }

    /// Set the total iteration budget.
    pub fn with_max_iters(mut self, max_iters: usize) -> Self {
        self.max_iters = max_iters;
        self
    }

    /// Set the flex differentiation step.
    pub fn with_impact_step(mut self, impact_step: f64) -> Self {
        self.impact_step = impact_step;
        self
    }
}

/// The problem to actually solve.
/// Everything here is read-only for the duration of a solve.
pub struct Model<'a, F: ?Sized> {
    anchors: &'a [[f64; 3]],
    /// Line length from each anchor to the coordinate origin.
    origin_distances: &'a [f64],
    /// Line positions derived from motor steps.
    measured: &'a [f64],
    flex: &'a F,
    impact_step: f64,
}

impl<'a, F: FlexModel + ?Sized> Model<'a, F> {
    /// Bundle a problem. All slices must have one entry per active anchor,
    /// and there must be between 1 and [`MAX_ANCHORS`] of them.
    pub fn new(
        anchors: &'a [[f64; 3]],
        origin_distances: &'a [f64],
        measured: &'a [f64],
        flex: &'a F,
        impact_step: f64,
    ) -> Self {
        debug_assert!(
            (1..=MAX_ANCHORS).contains(&anchors.len()),
            "between 1 and {MAX_ANCHORS} anchors are supported, got {}",
            anchors.len()
        );
        debug_assert_eq!(
            anchors.len(),
            origin_distances.len(),
            "one origin distance per anchor"
        );
        debug_assert_eq!(
            anchors.len(),
            measured.len(),
            "one measured line length per anchor"
        );
        Self {
            anchors,
            origin_distances,
            measured,
            flex,
            impact_step,
        }
    }

    /// How many lines take part.
    pub fn num_anchors(&self) -> usize {
        self.anchors.len()
    }
}

/// Line length from each anchor to the origin.
pub fn origin_distances(anchors: &[[f64; 3]]) -> AnchorValues {
    let mut out = AnchorValues::zeroed(anchors.len().min(MAX_ANCHORS));
    for (d, anchor) in out.as_mut_slice().iter_mut().zip(anchors.iter()) {
        *d = V3::from(*anchor).magnitude();
    }
    out
}

/// Find the effector position whose line lengths best match `measured`.
///
/// Inputs are assumed valid: 1 to [`MAX_ANCHORS`] anchors, with one origin
/// distance and one measurement each. Nothing here fails loudly; singular
/// systems and non-convergence are reported through the returned
/// [`SolverResult`].
pub fn solve<F: FlexModel + ?Sized>(
    anchors: &[[f64; 3]],
    origin_distances: &[f64],
    measured: &[f64],
    seed: [f64; 3],
    flex: &F,
    config: &Config,
) -> SolverResult {
    let model = Model::new(anchors, origin_distances, measured, flex, config.impact_step);
    hybrid::HybridSolver::new(&model, config, seed).run()
}

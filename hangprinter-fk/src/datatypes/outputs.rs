//! The final solved values.

/// Why the solver stopped.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Termination {
    /// Some step was shorter than the tolerance.
    Converged,
    /// A normal-equations solve hit a singular matrix.
    Failed,
    /// Ran out of iterations before converging.
    Exhausted,
}

/// Outcome of one forward-kinematics solve.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SolverResult {
    /// Effector position the solver settled on.
    pub position: [f64; 3],
    /// Did a step fall below the tolerance within the iteration budget?
    pub converged: bool,
    /// How many steps were applied.
    pub iterations: usize,
    /// Half the sum of squared residuals, evaluated at `position`.
    pub cost: f64,
    /// Which terminal state the solver reached.
    pub termination: Termination,
}

impl std::fmt::Display for SolverResult {
    #[mutants::skip]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let [x, y, z] = self.position;
        write!(
            f,
            "({x:.4}, {y:.4}, {z:.4}) after {} iterations, cost {:e} ({:?})",
            self.iterations, self.cost, self.termination
        )
    }
}

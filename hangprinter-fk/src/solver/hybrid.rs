use tracing::{debug, trace, warn};

use super::{Config, Model, normal_equations::accumulate};
use crate::{
    MAX_ANCHORS,
    datatypes::{SolverResult, Termination},
    flex::FlexModel,
    vector::V3,
};

/// Where the solver is. The first two states iterate, the rest are terminal.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Phase {
    /// Levenberg-Marquardt step with a second-order (Halley) correction.
    Halley,
    /// Plain Levenberg-Marquardt step.
    Lm,
    Converged,
    Failed,
    Exhausted,
}

impl Phase {
    fn is_terminal(self) -> bool {
        matches!(self, Phase::Converged | Phase::Failed | Phase::Exhausted)
    }

    /// Which phase runs next, given how many steps have been applied.
    fn scheduled(iterations: usize, config: &Config) -> Self {
        if iterations >= config.max_iters {
            Phase::Exhausted
        } else if iterations < config.halley_iters {
            Phase::Halley
        } else {
            Phase::Lm
        }
    }
}

pub(crate) struct HybridSolver<'m, 'a, F: ?Sized> {
    model: &'m Model<'a, F>,
    config: &'m Config,
    position: V3,
    /// Steps applied so far.
    iterations: usize,
    /// Lowest-cost position evaluated so far, and its cost.
    best: (V3, f64),
    phase: Phase,
}

impl<'m, 'a, F: FlexModel + ?Sized> HybridSolver<'m, 'a, F> {
    pub fn new(model: &'m Model<'a, F>, config: &'m Config, seed: [f64; 3]) -> Self {
        let position = V3::from(seed);
        Self {
            model,
            config,
            position,
            iterations: 0,
            best: (position, f64::INFINITY),
            phase: Phase::scheduled(0, config),
        }
    }

    pub fn run(mut self) -> SolverResult {
        while !self.phase.is_terminal() {
            self.advance();
        }
        self.finish()
    }

    /// Take one step in the current phase and move to the next.
    fn advance(&mut self) {
        let step = match self.phase {
            Phase::Halley => self.halley_step(),
            Phase::Lm => self.lm_step(),
            Phase::Converged | Phase::Failed | Phase::Exhausted => return,
        };
        let Some(delta) = step else {
            warn!(
                iterations = self.iterations,
                phase = ?self.phase,
                "normal equations are singular, stopping"
            );
            self.phase = Phase::Failed;
            return;
        };

        self.position += delta;
        self.iterations += 1;
        let step_norm = delta.magnitude();
        trace!(
            iteration = self.iterations,
            phase = ?self.phase,
            step_norm,
            "applied step"
        );

        // Convergence check: a short enough step means we're at a (local) minimum.
        self.phase = if step_norm < self.config.tol {
            Phase::Converged
        } else {
            Phase::scheduled(self.iterations, self.config)
        };
    }

    fn note_cost(&mut self, cost: f64) {
        if cost < self.best.1 {
            self.best = (self.position, cost);
        }
    }

    /// Damped Gauss-Newton step from the current position.
    fn lm_step(&mut self) -> Option<V3> {
        let d = self
            .model
            .residuals_and_derivatives(self.position.into(), false);
        self.note_cost(d.cost());
        let eqs = accumulate(d.jacobian(), d.residuals()).damped(self.config.eta);
        eqs.step().map(V3::from)
    }

    /// Damped Gauss-Newton step, re-solved with each Jacobian row corrected by
    /// half its Hessian times the uncorrected step.
    fn halley_step(&mut self) -> Option<V3> {
        let d = self
            .model
            .residuals_and_derivatives(self.position.into(), true);
        self.note_cost(d.cost());
        let eta = self.config.eta;
        let delta_lm = V3::from(
            accumulate(d.jacobian(), d.residuals())
                .damped(eta)
                .step()?,
        );

        /* J̄ᵢ = Jᵢ + ½ Hᵢ δ_lm
           The residuals stay as they were; only the Jacobian rows change.
        */
        let mut corrected = [[0.0; 3]; MAX_ANCHORS];
        let hessians = d.hessians().unwrap_or_default();
        for (i, (out, row)) in corrected.iter_mut().zip(d.jacobian().iter()).enumerate() {
            let mut row = V3::from(*row);
            if let Some(h) = hessians.get(i) {
                row += delta_lm.transformed_by(h).scale(0.5);
            }
            *out = row.into();
        }
        let n = d.residuals().len();
        accumulate(&corrected[..n], d.residuals())
            .damped(eta)
            .step()
            .map(V3::from)
    }

    fn finish(self) -> SolverResult {
        let position = if self.phase == Phase::Failed && self.best.1.is_finite() {
            self.best.0
        } else {
            self.position
        };
        let cost = self.model.cost_at(position.into());
        let termination = match self.phase {
            Phase::Converged => Termination::Converged,
            Phase::Failed => Termination::Failed,
            Phase::Halley | Phase::Lm | Phase::Exhausted => Termination::Exhausted,
        };
        debug!(
            iterations = self.iterations,
            cost,
            ?termination,
            "forward kinematics solve finished"
        );
        SolverResult {
            position: position.into(),
            converged: termination == Termination::Converged,
            iterations: self.iterations,
            cost,
            termination,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        flex::NoFlex,
        solver::{origin_distances, solve},
    };

    const ANCHORS: [[f64; 3]; 5] = [
        [0.0, -2000.0, -120.0],
        [2000.0, 0.0, -120.0],
        [0.0, 2000.0, -120.0],
        [-2000.0, 0.0, -120.0],
        [0.0, 0.0, 2000.0],
    ];

    fn line_positions(anchors: &[[f64; 3]], p: [f64; 3]) -> Vec<f64> {
        anchors
            .iter()
            .map(|a| V3::from(p).euclidean_distance(V3::from(*a)) - V3::from(*a).magnitude())
            .collect()
    }

    #[test]
    fn schedule() {
        let config = Config::default().with_halley_iters(2).with_max_iters(4);
        assert_eq!(Phase::scheduled(0, &config), Phase::Halley);
        assert_eq!(Phase::scheduled(1, &config), Phase::Halley);
        assert_eq!(Phase::scheduled(2, &config), Phase::Lm);
        assert_eq!(Phase::scheduled(3, &config), Phase::Lm);
        assert_eq!(Phase::scheduled(4, &config), Phase::Exhausted);

        // Halley iterations are still bounded by the overall budget.
        let config = Config::default().with_halley_iters(10).with_max_iters(1);
        assert_eq!(Phase::scheduled(0, &config), Phase::Halley);
        assert_eq!(Phase::scheduled(1, &config), Phase::Exhausted);

        // No budget at all.
        let config = Config::default().with_max_iters(0);
        assert_eq!(Phase::scheduled(0, &config), Phase::Exhausted);
    }

    #[test]
    fn halley_hands_over_to_lm() {
        let origin = origin_distances(&ANCHORS);
        let measured = line_positions(&ANCHORS, [400.0, -300.0, 900.0]);
        let model = Model::new(&ANCHORS, &origin, &measured, &NoFlex, 1e-3);
        let config = Config::default().with_halley_iters(1).with_tol(1e-12);
        let mut solver = HybridSolver::new(&model, &config, [0.0; 3]);
        assert_eq!(solver.phase, Phase::Halley);
        solver.advance();
        assert_eq!(solver.iterations, 1);
        assert_eq!(solver.phase, Phase::Lm);
    }

    #[test]
    fn halley_step_uses_corrected_jacobian() {
        let origin = origin_distances(&ANCHORS);
        let measured = line_positions(&ANCHORS, [400.0, -300.0, 900.0]);
        let model = Model::new(&ANCHORS, &origin, &measured, &NoFlex, 1e-3);
        let config = Config::default();
        let seed = [50.0, 20.0, -10.0];

        // J̄ᵢ = Jᵢ + ½ Hᵢ δ_lm, written out longhand.
        let d = model.residuals_and_derivatives(seed, true);
        let delta_lm = accumulate(d.jacobian(), d.residuals())
            .damped(config.eta)
            .step()
            .unwrap();
        let hessians = d.hessians().unwrap();
        let corrected: Vec<[f64; 3]> = d
            .jacobian()
            .iter()
            .zip(hessians.iter())
            .map(|(row, h)| {
                let mut out = *row;
                for (a, cell) in out.iter_mut().enumerate() {
                    for (b, step) in delta_lm.iter().enumerate() {
                        *cell += 0.5 * h[a][b] * step;
                    }
                }
                out
            })
            .collect();
        let expected = accumulate(&corrected, d.residuals())
            .damped(config.eta)
            .step()
            .unwrap();

        let mut solver = HybridSolver::new(&model, &config, seed);
        let halley = solver.halley_step().unwrap();
        let lm = solver.lm_step().unwrap();
        for (got, want) in <[f64; 3]>::from(halley).iter().zip(expected.iter()) {
            assert!((got - want).abs() < 1e-9, "{got} vs {want}");
        }
        // The second-order correction actually changes the step.
        assert!(halley.euclidean_distance(lm) > 1e-3, "{halley:?} vs {lm:?}");
        // Taking a step doesn't apply it.
        assert_eq!(solver.position, V3::from(seed));
        assert_eq!(solver.iterations, 0);
    }

    #[test]
    fn failure_returns_best_position_so_far() {
        let origin = origin_distances(&ANCHORS);
        let measured = line_positions(&ANCHORS, [600.0, 400.0, 1200.0]);
        let lm = Config::levenberg_marquardt().with_eta(0.0);

        // Where the first two rigid steps from the origin land.
        let after = |steps| {
            solve(&ANCHORS, &origin, &measured, [0.0; 3], &NoFlex, &lm.with_max_iters(steps)).position
        };
        let first = after(1);
        let second = after(2);
        let (r1, r2) = (V3::from(first).magnitude(), V3::from(second).magnitude());
        assert!(r2 > r1 + 10.0, "steps {r1} and {r2} are too close");

        // Lines are rigid near the origin, but the flex model breaks down
        // beyond the first step, so the second evaluation after it fails.
        let cutoff = 0.5 * (r1 + r2);
        let flex = move |p: [f64; 3]| {
            if V3::from(p).magnitude() < cutoff {
                [0.0; MAX_ANCHORS]
            } else {
                [f64::NAN; MAX_ANCHORS]
            }
        };
        let result = solve(&ANCHORS, &origin, &measured, [0.0; 3], &flex, &lm);
        assert_eq!(result.termination, Termination::Failed);
        assert!(!result.converged);
        assert_eq!(result.iterations, 2);

        // The first step had the lowest cost of everything evaluated.
        for (got, want) in result.position.iter().zip(first.iter()) {
            assert!((got - want).abs() < 1e-9, "{:?} vs {first:?}", result.position);
        }
        let model = Model::new(&ANCHORS, &origin, &measured, &flex, 1e-3);
        assert!(result.cost.is_finite());
        assert!(result.cost < model.cost_at([0.0; 3]));
        assert_eq!(result.cost, model.cost_at(result.position));
    }

    #[test]
    fn converges_when_step_is_short() {
        let origin = origin_distances(&ANCHORS);
        let truth = [100.0, -50.0, 300.0];
        let measured = line_positions(&ANCHORS, truth);
        let model = Model::new(&ANCHORS, &origin, &measured, &NoFlex, 1e-3);
        let config = Config::default();
        let mut solver = HybridSolver::new(&model, &config, truth);
        solver.advance();
        assert_eq!(solver.phase, Phase::Converged);
        // Terminal states don't move.
        solver.advance();
        assert_eq!(solver.iterations, 1);
    }

    #[test]
    fn zero_residual_fixed_point() {
        let origin = origin_distances(&ANCHORS);
        let truth = [100.0, -50.0, 300.0];
        let measured = line_positions(&ANCHORS, truth);
        let result = solve(&ANCHORS, &origin, &measured, truth, &NoFlex, &Config::default());
        assert!(result.converged);
        assert_eq!(result.iterations, 1);
        assert_eq!(result.termination, Termination::Converged);
        assert!(result.cost < 1e-12);
        for (got, want) in result.position.iter().zip(truth.iter()) {
            assert!((got - want).abs() < 1e-6);
        }
    }

    #[test]
    fn exhausts_budget() {
        let origin = origin_distances(&ANCHORS);
        let truth = [600.0, 400.0, 1200.0];
        let measured = line_positions(&ANCHORS, truth);
        let config = Config::default().with_max_iters(1).with_halley_iters(0);
        let result = solve(&ANCHORS, &origin, &measured, [0.0; 3], &NoFlex, &config);
        assert!(!result.converged);
        assert_eq!(result.iterations, 1);
        assert_eq!(result.termination, Termination::Exhausted);
        // Cost is reported at the returned position.
        let model = Model::new(&ANCHORS, &origin, &measured, &NoFlex, 1e-3);
        assert!((result.cost - model.cost_at(result.position)).abs() < 1e-12);
    }

    #[test]
    fn no_budget_returns_seed() {
        let origin = origin_distances(&ANCHORS);
        let measured = line_positions(&ANCHORS, [10.0, 10.0, 10.0]);
        let config = Config::default().with_max_iters(0);
        let seed = [1.0, 2.0, 3.0];
        let result = solve(&ANCHORS, &origin, &measured, seed, &NoFlex, &config);
        assert_eq!(result.position, seed);
        assert_eq!(result.iterations, 0);
        assert!(!result.converged);
        assert!(result.cost > 0.0);
    }

    #[test]
    fn singular_system_fails_without_looping() {
        // Every anchor in the same place: all Jacobian rows are identical.
        let anchors = [[0.0, 0.0, 2000.0]; 3];
        let origin = origin_distances(&anchors);
        let measured = [10.0, 10.0, 10.0];
        let config = Config::default().with_eta(0.0);
        let seed = [0.0, 0.0, 0.0];
        let result = solve(&anchors, &origin, &measured, seed, &NoFlex, &config);
        assert!(!result.converged);
        assert_eq!(result.termination, Termination::Failed);
        assert_eq!(result.iterations, 0);
        assert_eq!(result.position, seed);
        assert!(result.cost.is_finite());
    }

    #[test]
    fn non_finite_seed_fails() {
        let origin = origin_distances(&ANCHORS);
        let measured = line_positions(&ANCHORS, [10.0, 10.0, 10.0]);
        let result = solve(
            &ANCHORS,
            &origin,
            &measured,
            [f64::NAN, 0.0, 0.0],
            &NoFlex,
            &Config::default(),
        );
        assert!(!result.converged);
        assert_eq!(result.termination, Termination::Failed);
    }

    #[test]
    fn pure_lm_and_pure_halley_both_converge() {
        let origin = origin_distances(&ANCHORS);
        let truth = [300.0, -200.0, 500.0];
        let measured = line_positions(&ANCHORS, truth);
        for config in [Config::levenberg_marquardt(), Config::halley(30)] {
            let result = solve(&ANCHORS, &origin, &measured, [0.0; 3], &NoFlex, &config);
            assert!(result.converged, "{config:?} did not converge");
            for (got, want) in result.position.iter().zip(truth.iter()) {
                assert!((got - want).abs() < 1e-2, "{config:?}: {got} vs {want}");
            }
        }
    }
}

use super::FlexModel;
use crate::{
    MAX_ANCHORS,
    datatypes::{FlexConfig, LineConfig},
    solver::{DISTANCE_FLOOR, accumulate, solve_normal_system},
    vector::V3,
};

/// Flex from elastic line stretch under static load.
///
/// Line tensions are found by balancing gravity on the effector against the
/// pretension the motion planner keeps in the lines. Each line then stretches
/// in proportion to its tension and its total length (including guy wires).
/// Flex is reported relative to the stretch at the origin, so it is zero there.
#[derive(Clone, Copy, Debug)]
pub struct StaticForceFlex<'a> {
    anchors: &'a [[f64; 3]],
    lines: &'a [LineConfig],
    config: FlexConfig,
    /// The ceiling anchor carries the effector's weight and gets no pretension.
    top_anchor: usize,
    origin_stretch: [f64; MAX_ANCHORS],
}

impl<'a> StaticForceFlex<'a> {
    /// Flex model for these anchors, with one [`LineConfig`] per anchor.
    pub fn new(anchors: &'a [[f64; 3]], lines: &'a [LineConfig], config: FlexConfig) -> Self {
        debug_assert_eq!(anchors.len(), lines.len(), "one line per anchor");
        debug_assert!(anchors.len() <= MAX_ANCHORS);
        let top_anchor = anchors
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a[2].total_cmp(&b[2]))
            .map(|(i, _)| i)
            .unwrap_or_default();
        let mut out = Self {
            anchors,
            lines,
            config,
            top_anchor,
            origin_stretch: [0.0; MAX_ANCHORS],
        };
        out.origin_stretch = out.stretch_at(V3::ZERO);
        out
    }

    fn num_anchors(&self) -> usize {
        self.anchors.len()
    }

    /// Tension in each line while the effector hangs still at `position`.
    pub fn line_tensions(&self, position: [f64; 3]) -> [f64; MAX_ANCHORS] {
        let position = V3::from(position);
        let n = self.num_anchors();

        // Unit vectors pointing from the effector along each line.
        let mut directions = [[0.0; 3]; MAX_ANCHORS];
        for (dir, anchor) in directions.iter_mut().zip(self.anchors.iter()) {
            let diff = V3::from(*anchor) - position;
            *dir = diff.scale(1.0 / libm::fmax(diff.magnitude(), DISTANCE_FLOOR)).into();
        }

        let mut tensions = [0.0; MAX_ANCHORS];
        if !self.config.ignore_pretension {
            for (i, (t, line)) in tensions.iter_mut().zip(self.lines.iter()).enumerate() {
                if i != self.top_anchor {
                    *t = line.min_planned_force;
                }
            }
        }
        let weight = if self.config.ignore_gravity {
            0.0
        } else {
            self.config.mover_weight * self.config.gravity
        };

        // What the lines still have to supply to hold the effector up.
        let mut shortfall = V3::new(0.0, 0.0, weight);
        for (dir, t) in directions[..n].iter().zip(tensions.iter()) {
            shortfall = shortfall - V3::from(*dir).scale(*t);
        }

        // Smallest tension change that closes the shortfall: Δt = Uᵀy where (UUᵀ)y = shortfall.
        let uut = accumulate(&directions[..n], &[0.0; MAX_ANCHORS][..n]).jtj;
        if let Some(y) = solve_normal_system(&uut, &shortfall.into()) {
            let y = V3::from(y);
            for (t, dir) in tensions[..n].iter_mut().zip(directions.iter()) {
                *t += V3::from(*dir).dot(&y);
            }
        }

        // Lines can only pull, and never harder than planned.
        for (t, line) in tensions[..n].iter_mut().zip(self.lines.iter()) {
            *t = libm::fmax(libm::fmin(*t, line.max_planned_force), 0.0);
        }
        tensions
    }

    /// Elastic elongation of each line at `position`, expressed as effector distance.
    fn stretch_at(&self, position: V3) -> [f64; MAX_ANCHORS] {
        let mut stretch = [0.0; MAX_ANCHORS];
        if self.config.is_rigid() {
            return stretch;
        }
        let tensions = self.line_tensions(position.into());
        for (i, out) in stretch[..self.num_anchors()].iter_mut().enumerate() {
            let line = &self.lines[i];
            let mechanical_advantage = line.mechanical_advantage;
            let distance = libm::fmax(
                position.euclidean_distance(V3::from(self.anchors[i])),
                DISTANCE_FLOOR,
            );
            // The load is shared between the strands of a multi-fall line.
            let strand_force = tensions[i] / mechanical_advantage;
            let line_length = mechanical_advantage * distance + line.guy_wire_length;
            let elongation = strand_force * line_length / self.config.spring_k_per_unit_length;
            *out = elongation / mechanical_advantage;
        }
        stretch
    }
}

impl FlexModel for StaticForceFlex<'_> {
    fn flex_distances(&self, position: [f64; 3]) -> [f64; MAX_ANCHORS] {
        // A stretched line reaches further than the spool paid out.
        let stretch = self.stretch_at(position.into());
        let mut flex = [0.0; MAX_ANCHORS];
        for ((f, s), s0) in flex
            .iter_mut()
            .zip(stretch.iter())
            .zip(self.origin_stretch.iter())
            .take(self.num_anchors())
        {
            *f = s0 - s;
        }
        flex
    }
}

use crate::{
    MAX_ANCHORS, MachineError,
    datatypes::{FlexConfig, LineConfig, MeasuredLineLengths, MotorPositions, SolverResult},
    flex::{FlexModel, StaticForceFlex},
    motor::MotorUnitConverter,
    solver::{self, Config, DISTANCE_FLOOR},
    vector::V3,
};

/// A validated hangprinter: its anchors, how each line is spooled, and how
/// the lines stretch.
///
/// This is where inputs get checked. Once a `Machine` exists, solving with it
/// can't fail, only fail to converge.
#[derive(Clone, Debug)]
pub struct Machine {
    anchors: [[f64; 3]; MAX_ANCHORS],
    lines: [LineConfig; MAX_ANCHORS],
    converters: [MotorUnitConverter; MAX_ANCHORS],
    origin_distances: MeasuredLineLengths,
    flex: FlexConfig,
    steps_per_revolution: f64,
    num_anchors: usize,
}

impl Machine {
    /// Check and assemble a machine.
    /// There must be 1 to [`MAX_ANCHORS`] anchors, each with one [`LineConfig`].
    pub fn new(
        anchors: &[[f64; 3]],
        lines: &[LineConfig],
        flex: FlexConfig,
        steps_per_revolution: f64,
    ) -> Result<Self, MachineError> {
        let num_anchors = anchors.len();
        if num_anchors == 0 {
            return Err(MachineError::NoAnchors);
        }
        if num_anchors > MAX_ANCHORS {
            return Err(MachineError::TooManyAnchors(num_anchors));
        }
        if lines.len() != num_anchors {
            return Err(MachineError::WrongNumberLines {
                anchors: num_anchors,
                lines: lines.len(),
            });
        }
        if let Some(index) = anchors.iter().position(|a| !V3::from(*a).is_finite()) {
            return Err(MachineError::NonFiniteAnchor { index });
        }
        if !(steps_per_revolution.is_finite() && steps_per_revolution > 0.0) {
            return Err(MachineError::InvalidStepsPerRevolution(steps_per_revolution));
        }
        for (index, line) in lines.iter().enumerate() {
            if let Some((parameter, value)) = invalid_line_parameter(line) {
                return Err(MachineError::InvalidLineParameter {
                    index,
                    parameter,
                    value,
                });
            }
        }
        if let Some((parameter, value)) = invalid_flex_parameter(&flex) {
            return Err(MachineError::InvalidFlexParameter { parameter, value });
        }

        let mut anchor_buf = [[0.0; 3]; MAX_ANCHORS];
        anchor_buf[..num_anchors].copy_from_slice(anchors);
        let mut line_buf = [LineConfig::default(); MAX_ANCHORS];
        line_buf[..num_anchors].copy_from_slice(lines);
        let converters =
            std::array::from_fn(|i| MotorUnitConverter::new(&line_buf[i], steps_per_revolution));

        Ok(Self {
            anchors: anchor_buf,
            lines: line_buf,
            converters,
            origin_distances: solver::origin_distances(anchors),
            flex,
            steps_per_revolution,
            num_anchors,
        })
    }

    /// How many anchors (and lines, and motors) this machine has.
    pub fn num_anchors(&self) -> usize {
        self.num_anchors
    }

    /// Anchor positions.
    pub fn anchors(&self) -> &[[f64; 3]] {
        &self.anchors[..self.num_anchors]
    }

    /// Line configuration, one per anchor.
    pub fn lines(&self) -> &[LineConfig] {
        &self.lines[..self.num_anchors]
    }

    /// Line length from each anchor to the origin.
    pub fn origin_distances(&self) -> &[f64] {
        self.origin_distances.as_slice()
    }

    /// Parameters of the flex model.
    pub fn flex_config(&self) -> &FlexConfig {
        &self.flex
    }

    /// Motor steps per full motor revolution.
    pub fn steps_per_revolution(&self) -> f64 {
        self.steps_per_revolution
    }

    /// The built-in flex model for this machine.
    pub fn flex_model(&self) -> StaticForceFlex<'_> {
        StaticForceFlex::new(self.anchors(), self.lines(), self.flex)
    }

    /// Convert one motor position per anchor into line positions.
    pub fn measured_line_lengths(
        &self,
        motor_positions: &[f64],
    ) -> Result<MeasuredLineLengths, MachineError> {
        if motor_positions.len() != self.num_anchors {
            return Err(MachineError::WrongNumberMotorPositions {
                anchors: self.num_anchors,
                positions: motor_positions.len(),
            });
        }
        let mut out = MeasuredLineLengths::zeroed(self.num_anchors);
        for ((length, steps), converter) in out
            .as_mut_slice()
            .iter_mut()
            .zip(motor_positions.iter())
            .zip(self.converters.iter())
        {
            *length = converter.steps_to_line_position(*steps);
        }
        Ok(out)
    }

    /// Where is the effector, given the motor positions?
    /// Uses this machine's [`StaticForceFlex`] model.
    pub fn forward_transform(
        &self,
        motor_positions: &[f64],
        seed: [f64; 3],
        config: &Config,
    ) -> Result<SolverResult, MachineError> {
        let flex = self.flex_model();
        self.forward_transform_with(motor_positions, seed, config, &flex)
    }

    /// Like [`Machine::forward_transform`] but with a caller-supplied flex model.
    pub fn forward_transform_with<F: FlexModel + ?Sized>(
        &self,
        motor_positions: &[f64],
        seed: [f64; 3],
        config: &Config,
        flex: &F,
    ) -> Result<SolverResult, MachineError> {
        let measured = self.measured_line_lengths(motor_positions)?;
        Ok(solver::solve(
            self.anchors(),
            self.origin_distances(),
            &measured,
            seed,
            flex,
            config,
        ))
    }

    /// Motor positions that put the effector at `position`.
    pub fn inverse_transform(&self, position: [f64; 3]) -> MotorPositions {
        self.inverse_transform_with(position, &self.flex_model())
    }

    /// Like [`Machine::inverse_transform`] but with a caller-supplied flex model.
    pub fn inverse_transform_with<F: FlexModel + ?Sized>(
        &self,
        position: [f64; 3],
        flex: &F,
    ) -> MotorPositions {
        let flex = flex.flex_distances(position);
        let p = V3::from(position);
        let mut out = MotorPositions::zeroed(self.num_anchors);
        for (i, steps) in out.as_mut_slice().iter_mut().enumerate() {
            let distance = libm::fmax(p.euclidean_distance(V3::from(self.anchors[i])), DISTANCE_FLOOR);
            let line_position = distance - self.origin_distances[i] + flex[i];
            *steps = self.converters[i].line_position_to_steps(line_position);
        }
        out
    }
}

/// The first field of `line` the motor converter or flex model can't use.
fn invalid_line_parameter(line: &LineConfig) -> Option<(&'static str, f64)> {
    let positive = [
        ("spool_radius", line.spool_radius),
        ("mechanical_advantage", line.mechanical_advantage),
        ("lines_per_spool", line.lines_per_spool),
        ("spool_gear_teeth", line.spool_gear_teeth),
        ("motor_gear_teeth", line.motor_gear_teeth),
    ];
    let finite = [
        ("spool_buildup_factor", line.spool_buildup_factor),
        ("min_planned_force", line.min_planned_force),
        ("max_planned_force", line.max_planned_force),
        ("guy_wire_length", line.guy_wire_length),
    ];
    positive
        .into_iter()
        .find(|(_, v)| !(v.is_finite() && *v > 0.0))
        .or_else(|| finite.into_iter().find(|(_, v)| !v.is_finite()))
}

fn invalid_flex_parameter(flex: &FlexConfig) -> Option<(&'static str, f64)> {
    let k = flex.spring_k_per_unit_length;
    if !(k.is_finite() && k > 0.0) {
        return Some(("spring_k_per_unit_length", k));
    }
    [("mover_weight", flex.mover_weight), ("gravity", flex.gravity)]
        .into_iter()
        .find(|(_, v)| !v.is_finite())
}

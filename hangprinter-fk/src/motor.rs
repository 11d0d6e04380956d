use std::f64::consts::PI;

use crate::datatypes::LineConfig;

/// Converts between motor steps and line position for one spool.
///
/// Line wound onto a spool increases its effective radius, so the amount of
/// line delivered per step is not constant. With buildup factor `b`, the
/// radius after spooling `l` units of line through mechanical advantage `a`
/// over `n` lines per spool is `sqrt(r² − a·n·b·l)`, which integrates to a
/// square-root relation between steps and line position.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MotorUnitConverter {
    /// Steps per unit of line length, multiplied by the bare spool radius.
    steps_per_unit_times_r: f64,
    k0: f64,
    k2: f64,
    spool_radius: f64,
    spool_radius_sq: f64,
}

impl MotorUnitConverter {
    /// Build the converter for one line.
    /// `steps_per_revolution` counts (micro)steps per full motor revolution.
    pub fn new(line: &LineConfig, steps_per_revolution: f64) -> Self {
        let steps_per_unit_times_r = (line.mechanical_advantage
            * steps_per_revolution
            * line.spool_gear_teeth)
            / (2.0 * PI * line.motor_gear_teeth);
        // More line in the air means less line on the spool, hence the sign.
        let k2 = -line.mechanical_advantage * line.lines_per_spool * line.spool_buildup_factor;
        let k0 = if k2 == 0.0 {
            0.0
        } else {
            2.0 * steps_per_unit_times_r / k2
        };
        Self {
            steps_per_unit_times_r,
            k0,
            k2,
            spool_radius: line.spool_radius,
            spool_radius_sq: line.spool_radius * line.spool_radius,
        }
    }

    fn has_buildup(&self) -> bool {
        self.k2 != 0.0
    }

    /// Steps per unit of line length at the zero reference.
    pub fn steps_per_unit_at_origin(&self) -> f64 {
        self.steps_per_unit_times_r / self.spool_radius
    }

    /// Line position (line paid out since the zero reference) after `steps`.
    pub fn steps_to_line_position(&self, steps: f64) -> f64 {
        if !self.has_buildup() {
            return steps / self.steps_per_unit_at_origin();
        }
        let effective_radius = steps / self.k0 + self.spool_radius;
        (effective_radius * effective_radius - self.spool_radius_sq) / self.k2
    }

    /// Steps needed to pay out `line_position` units of line.
    pub fn line_position_to_steps(&self, line_position: f64) -> f64 {
        if !self.has_buildup() {
            return line_position * self.steps_per_unit_at_origin();
        }
        let radicand = libm::fmax(self.spool_radius_sq + line_position * self.k2, 0.0);
        self.k0 * (libm::sqrt(radicand) - self.spool_radius)
    }
}

//! Mechanical description of the machine.

use crate::MAX_ANCHORS;

/// Mechanical parameters of one line: its spool, gearing, and the forces the
/// motion planner is allowed to put through it.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(not(feature = "unstable-exhaustive"), non_exhaustive)]
pub struct LineConfig {
    /// Spool radius with no line wound on it, in length units.
    pub spool_radius: f64,
    /// How many times the line is routed between anchor and effector.
    pub mechanical_advantage: f64,
    /// How many lines wind onto this spool.
    pub lines_per_spool: f64,
    /// Teeth on the spool-side gear.
    pub spool_gear_teeth: f64,
    /// Teeth on the motor-side gear.
    pub motor_gear_teeth: f64,
    /// How much the spool radius grows per unit of wound line.
    pub spool_buildup_factor: f64,
    /// Lowest tension the planner keeps in this line (pretension).
    pub min_planned_force: f64,
    /// Highest tension the planner allows in this line.
    pub max_planned_force: f64,
    /// Extra stretchable line between the anchor and the spool, if any.
    pub guy_wire_length: f64,
}

impl Default for LineConfig {
    fn default() -> Self {
        Self {
            spool_radius: 75.0,
            mechanical_advantage: 2.0,
            lines_per_spool: 1.0,
            spool_gear_teeth: 255.0,
            motor_gear_teeth: 20.0,
            spool_buildup_factor: 0.007,
            min_planned_force: 20.0,
            max_planned_force: 120.0,
            guy_wire_length: 0.0,
        }
    }
}

impl LineConfig {
    /// Set the mechanical advantage.
    pub fn with_mechanical_advantage(mut self, mechanical_advantage: f64) -> Self {
        self.mechanical_advantage = mechanical_advantage;
        self
    }

    /// Set the bare spool radius.
    pub fn with_spool_radius(mut self, spool_radius: f64) -> Self {
        self.spool_radius = spool_radius;
        self
    }

    /// Set the spool buildup factor. Zero disables buildup compensation.
    pub fn with_spool_buildup_factor(mut self, spool_buildup_factor: f64) -> Self {
        self.spool_buildup_factor = spool_buildup_factor;
        self
    }

    /// Set the planned force range.
    pub fn with_planned_force(mut self, min: f64, max: f64) -> Self {
        self.min_planned_force = min;
        self.max_planned_force = max;
        self
    }

    /// Set the guy wire length.
    pub fn with_guy_wire_length(mut self, guy_wire_length: f64) -> Self {
        self.guy_wire_length = guy_wire_length;
        self
    }
}

/// Parameters shared by every line, used by the flex model.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(not(feature = "unstable-exhaustive"), non_exhaustive)]
pub struct FlexConfig {
    /// Line stiffness, i.e. force per unit strain (N for a length-normalised spring).
    pub spring_k_per_unit_length: f64,
    /// Effector mass in kg.
    pub mover_weight: f64,
    /// Gravitational acceleration.
    pub gravity: f64,
    /// Leave gravity out of the force balance.
    pub ignore_gravity: bool,
    /// Leave line pretension out of the force balance.
    pub ignore_pretension: bool,
}

impl Default for FlexConfig {
    fn default() -> Self {
        Self {
            spring_k_per_unit_length: 20000.0,
            mover_weight: 2.0,
            gravity: 9.81,
            ignore_gravity: false,
            ignore_pretension: false,
        }
    }
}

impl FlexConfig {
    /// No forces at all, so lines never stretch.
    pub fn rigid() -> Self {
        Self {
            ignore_gravity: true,
            ignore_pretension: true,
            ..Self::default()
        }
    }

    /// Set the effector mass.
    pub fn with_mover_weight(mut self, mover_weight: f64) -> Self {
        self.mover_weight = mover_weight;
        self
    }

    /// Set the line stiffness.
    pub fn with_spring_k_per_unit_length(mut self, k: f64) -> Self {
        self.spring_k_per_unit_length = k;
        self
    }

    /// Does the force balance produce any tension at all?
    pub(crate) fn is_rigid(&self) -> bool {
        self.ignore_gravity && self.ignore_pretension
    }
}

/// One `f64` per active anchor, stored inline.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AnchorValues {
    values: [f64; MAX_ANCHORS],
    len: usize,
}

/// Line positions converted from motor steps, one per active anchor.
pub type MeasuredLineLengths = AnchorValues;

/// Motor positions in steps, one per active anchor.
pub type MotorPositions = AnchorValues;

impl AnchorValues {
    /// Copy `values` into a new container.
    /// Returns `None` if there are more than [`MAX_ANCHORS`] of them.
    pub fn from_slice(values: &[f64]) -> Option<Self> {
        if values.len() > MAX_ANCHORS {
            return None;
        }
        let mut out = Self::zeroed(values.len());
        out.values[..values.len()].copy_from_slice(values);
        Some(out)
    }

    /// `len` zeroes.
    pub(crate) fn zeroed(len: usize) -> Self {
        debug_assert!(len <= MAX_ANCHORS);
        Self {
            values: [0.0; MAX_ANCHORS],
            len,
        }
    }

    /// How many anchors have a value.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Are there no values?
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The values, in anchor order.
    pub fn as_slice(&self) -> &[f64] {
        &self.values[..self.len]
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.values[..self.len]
    }
}

impl std::ops::Deref for AnchorValues {
    type Target = [f64];

    fn deref(&self) -> &Self::Target {
        self.as_slice()
    }
}

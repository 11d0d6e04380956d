//! Forward kinematics for Hangprinter-style cable robots.
//! Given motor positions, finds where the effector is.
//!
//! Each line runs from a fixed anchor to the effector. Motor steps tell us how
//! much line has been spooled out, and the solver looks for the effector
//! position whose anchor distances (corrected for line flex) best match those
//! line lengths. It runs a few Halley-corrected Levenberg-Marquardt steps and
//! then plain Levenberg-Marquardt until the step gets short.
//!
//! ```
//! use hangprinter_fk::{Config, MachineDescription};
//!
//! let machine = "
//! M669 A0:-2000:-120 B2000:0:-120 C0:2000:-120 D-2000:0:-120 E0:0:2000
//! M666 U2:2:2:2:4 J9000
//! "
//! .parse::<MachineDescription>()
//! .unwrap()
//! .to_machine()
//! .unwrap();
//! let steps = machine.inverse_transform([100.0, -50.0, 300.0]);
//! let result = machine
//!     .forward_transform(&steps, [0.0; 3], &Config::default())
//!     .unwrap();
//! assert!(result.converged);
//! ```

pub use crate::datatypes::{
    AnchorValues, FlexConfig, LineConfig, MeasuredLineLengths, MotorPositions, SolverResult,
    Termination,
};
pub use crate::error::{MachineError, TextualError};
pub use crate::flex::{DEFAULT_IMPACT_STEP, FlexModel, NoFlex, StaticForceFlex};
pub use crate::machine::Machine;
pub use crate::motor::MotorUnitConverter;
pub use crate::solver::{
    Config, DISTANCE_FLOOR, Derivatives, Model, NormalEquations, accumulate, origin_distances,
    solve, solve_normal_system,
};
pub use crate::textual::{DEFAULT_STEPS_PER_REVOLUTION, MachineDescription};
pub use crate::vector::Mat3;

/// Inputs and outputs of a solve.
pub mod datatypes;
/// Everything that can go wrong before solving starts.
mod error;
/// Line flex models.
pub mod flex;
/// Validated machine: motor steps in, position out, and back.
mod machine;
/// Motor steps to line length.
mod motor;
/// Numeric solver: residuals, normal equations, and the iteration itself.
mod solver;
/// Parser for the G-code machine configuration.
pub mod textual;
mod vector;

/// The most lines (and therefore anchors) a machine can have.
pub const MAX_ANCHORS: usize = 8;

#[cfg(test)]
const EPSILON: f64 = 1e-5;

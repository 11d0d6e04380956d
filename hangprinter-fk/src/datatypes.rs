//! Machine description consumed by the solver, and the values it hands back.

/// Anchors, line parameters and per-anchor value containers.
pub mod inputs;
/// What a solve returns.
pub mod outputs;

pub use inputs::{AnchorValues, FlexConfig, LineConfig, MeasuredLineLengths, MotorPositions};
pub use outputs::{SolverResult, Termination};

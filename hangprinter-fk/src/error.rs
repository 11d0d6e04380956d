use crate::MAX_ANCHORS;

/// Machine descriptions the solver can't work with.
/// These are caught before any solving starts.
#[derive(thiserror::Error, Debug, PartialEq)]
#[cfg_attr(not(feature = "unstable-exhaustive"), non_exhaustive)]
pub enum MachineError {
    /// A machine needs at least one anchor.
    #[error("A machine needs at least one anchor")]
    NoAnchors,
    /// More anchors than the solver has room for.
    #[error("At most {max} anchors are supported, but {0} were given", max = MAX_ANCHORS)]
    TooManyAnchors(usize),
    /// Every anchor needs exactly one line configuration.
    #[error(
        "There should be exactly 1 line configuration per anchor, but you supplied {anchors} anchors and {lines} line configurations"
    )]
    WrongNumberLines {
        /// How many anchors were given.
        anchors: usize,
        /// How many line configurations were given.
        lines: usize,
    },
    /// Every anchor needs exactly one motor position.
    #[error(
        "There should be exactly 1 motor position per anchor, but the machine has {anchors} anchors and you supplied {positions} motor positions"
    )]
    WrongNumberMotorPositions {
        /// How many anchors the machine has.
        anchors: usize,
        /// How many motor positions were given.
        positions: usize,
    },
    /// An anchor coordinate was NaN or infinite.
    #[error("Anchor {index} has a coordinate which isn't a finite number")]
    NonFiniteAnchor {
        /// Which anchor.
        index: usize,
    },
    /// Motors must have a positive, finite number of steps per revolution.
    #[error("Steps per motor revolution must be positive, got {0}")]
    InvalidStepsPerRevolution(f64),
    /// A line's spool or gearing can't turn motor steps into a length.
    #[error("Line {index}: {parameter} must be a positive finite number, got {value}")]
    InvalidLineParameter {
        /// Which line.
        index: usize,
        /// Which [`LineConfig`](crate::LineConfig) field.
        parameter: &'static str,
        /// The offending value.
        value: f64,
    },
    /// A flex parameter would make line stretch NaN or infinite.
    #[error("Flex parameter {parameter} is invalid, got {value}")]
    InvalidFlexParameter {
        /// Which [`FlexConfig`](crate::FlexConfig) field.
        parameter: &'static str,
        /// The offending value.
        value: f64,
    },
}

/// Errors from parsing the G-code style machine configuration.
#[derive(thiserror::Error, Debug, PartialEq)]
#[cfg_attr(not(feature = "unstable-exhaustive"), non_exhaustive)]
pub enum TextualError {
    /// The line isn't well-formed G-code.
    #[error("Line {line}: could not parse: {reason}")]
    Syntax {
        /// 1-based line number.
        line: usize,
        /// What the parser didn't like.
        reason: String,
    },
    /// Only M669 and M666 configure the machine.
    #[error("Line {line}: M{command} does not configure a hangprinter")]
    UnknownCommand {
        /// 1-based line number.
        line: usize,
        /// The M-code.
        command: u32,
    },
    /// This command has no such parameter.
    #[error("Line {line}: M{command} has no parameter {letter}")]
    UnknownParameter {
        /// 1-based line number.
        line: usize,
        /// The M-code.
        command: u32,
        /// The unexpected parameter.
        letter: char,
    },
    /// The same parameter was given twice on one line.
    #[error("Line {line}: parameter {letter} was given more than once")]
    DuplicateParameter {
        /// 1-based line number.
        line: usize,
        /// The repeated parameter.
        letter: char,
    },
    /// Anchors need exactly three coordinates.
    #[error("Anchor {letter} needs 3 coordinates separated by ':', but got {got}")]
    BadAnchor {
        /// Which anchor.
        letter: char,
        /// How many coordinates were given.
        got: usize,
    },
    /// Anchors must be named A, B, C... without skipping any.
    #[error("Anchor {missing} is missing, but a later anchor was defined")]
    MissingAnchor {
        /// The first anchor letter that wasn't given.
        missing: char,
    },
    /// `P` disagrees with the anchors actually listed.
    #[error("P{declared} declares {declared} anchors but {defined} were defined")]
    AnchorCountMismatch {
        /// The `P` value.
        declared: usize,
        /// How many anchors were listed.
        defined: usize,
    },
    /// A per-anchor parameter had the wrong number of values.
    #[error(
        "Parameter {letter} should have 1 value or 1 value per anchor ({anchors}), but it has {got}"
    )]
    WrongNumberValues {
        /// The parameter.
        letter: char,
        /// How many anchors there are.
        anchors: usize,
        /// How many values were given.
        got: usize,
    },
    /// A scalar parameter had more than one value.
    #[error("Parameter {letter} takes a single value, but got {got}")]
    NotAScalar {
        /// The parameter.
        letter: char,
        /// How many values were given.
        got: usize,
    },
    /// A parameter that counts something had a fractional, negative or non-finite value.
    #[error("Parameter {letter} must be a whole number, but got {got}")]
    NotAnInteger {
        /// The parameter.
        letter: char,
        /// The value given.
        got: f64,
    },
    /// The description parsed but the machine it describes is invalid.
    #[error("{0}")]
    Machine(#[from] MachineError),
}

//! Machine configuration in the G-code form the firmware reads.
//!
//! `M669` lists the anchors, `M666` the line, spool and flex parameters.
//! Per-anchor parameters are colon separated. A single value applies to every
//! anchor.
//!
//! ```text
//! M669 K6 P4 A0:-1620:-150 B1400:810:-150 C-1400:810:-150 D0:0:2300
//! M666 U2:2:2:4 J9000 W2
//! ```
mod parser;

use std::{fmt, str::FromStr};

use indexmap::IndexMap;

use crate::{
    MAX_ANCHORS, Machine,
    datatypes::{FlexConfig, LineConfig},
    error::TextualError,
};

/// Steps per motor revolution when `M666` doesn't give `J`.
pub const DEFAULT_STEPS_PER_REVOLUTION: f64 = 3200.0;

/// Kinematics number the firmware uses for hangprinters.
const HANGPRINTER_KINEMATICS: u32 = 6;

const ANCHOR_LETTERS: [char; MAX_ANCHORS] = ['A', 'B', 'C', 'D', 'E', 'F', 'G', 'H'];

/// Everything a configuration file says about a machine.
/// Not yet validated, see [`MachineDescription::to_machine`].
#[derive(Clone, Debug, PartialEq)]
pub struct MachineDescription {
    /// Anchor positions, in order A, B, C...
    pub anchors: Vec<[f64; 3]>,
    /// One per anchor.
    pub lines: Vec<LineConfig>,
    /// Flex parameters.
    pub flex: FlexConfig,
    /// Motor steps per motor revolution.
    pub steps_per_revolution: f64,
}

impl MachineDescription {
    /// Check the description and build the machine it describes.
    pub fn to_machine(&self) -> Result<Machine, TextualError> {
        let machine = Machine::new(
            &self.anchors,
            &self.lines,
            self.flex,
            self.steps_per_revolution,
        )?;
        Ok(machine)
    }
}

impl FromStr for MachineDescription {
    type Err = TextualError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let commands = parser::parse_commands(s)?;

        // Later lines override earlier ones, like the firmware applying each command in turn.
        let mut anchor_words = IndexMap::new();
        let mut line_words = IndexMap::new();
        for command in commands {
            let line = command.line;
            let (allowed, merged) = match command.code {
                669 => (M669_LETTERS, &mut anchor_words),
                666 => (M666_LETTERS, &mut line_words),
                other => {
                    return Err(TextualError::UnknownCommand {
                        line,
                        command: other,
                    });
                }
            };
            for (letter, values) in command.words {
                if !allowed.contains(&letter) {
                    return Err(TextualError::UnknownParameter {
                        line,
                        command: command.code,
                        letter,
                    });
                }
                merged.insert(letter, values);
            }
        }

        let anchors = anchors_from(&anchor_words)?;
        let (lines, flex, steps_per_revolution) = lines_from(&line_words, anchors.len())?;
        Ok(Self {
            anchors,
            lines,
            flex,
            steps_per_revolution,
        })
    }
}

const M669_LETTERS: &[char] = &['K', 'P', 'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H'];
const M666_LETTERS: &[char] = &['Q', 'R', 'U', 'O', 'L', 'H', 'J', 'W', 'S', 'I', 'X', 'Y'];

fn anchors_from(words: &IndexMap<char, Vec<f64>>) -> Result<Vec<[f64; 3]>, TextualError> {
    let mut anchors = Vec::new();
    let mut missing = None;
    for letter in ANCHOR_LETTERS {
        let Some(values) = words.get(&letter) else {
            missing = missing.or(Some(letter));
            continue;
        };
        if let Some(missing) = missing {
            return Err(TextualError::MissingAnchor { missing });
        }
        let [x, y, z] = values[..] else {
            return Err(TextualError::BadAnchor {
                letter,
                got: values.len(),
            });
        };
        anchors.push([x, y, z]);
    }
    if let Some(declared) = words.get(&'P') {
        let got = scalar('P', declared)?;
        if !(got.is_finite() && got >= 0.0 && got.fract() == 0.0) {
            return Err(TextualError::NotAnInteger { letter: 'P', got });
        }
        let declared = got as usize;
        if declared != anchors.len() {
            return Err(TextualError::AnchorCountMismatch {
                declared,
                defined: anchors.len(),
            });
        }
    }
    Ok(anchors)
}

fn lines_from(
    words: &IndexMap<char, Vec<f64>>,
    num_anchors: usize,
) -> Result<(Vec<LineConfig>, FlexConfig, f64), TextualError> {
    let mut lines = vec![LineConfig::default(); num_anchors];
    let per_line: [(char, fn(&mut LineConfig) -> &mut f64); 9] = [
        ('Q', |l| &mut l.spool_buildup_factor),
        ('R', |l| &mut l.spool_radius),
        ('U', |l| &mut l.mechanical_advantage),
        ('O', |l| &mut l.lines_per_spool),
        ('L', |l| &mut l.motor_gear_teeth),
        ('H', |l| &mut l.spool_gear_teeth),
        ('I', |l| &mut l.min_planned_force),
        ('X', |l| &mut l.max_planned_force),
        ('Y', |l| &mut l.guy_wire_length),
    ];
    for (letter, field) in per_line {
        let Some(values) = words.get(&letter) else {
            continue;
        };
        match values.len() {
            1 => lines.iter_mut().for_each(|l| *field(l) = values[0]),
            n if n == num_anchors => {
                for (l, v) in lines.iter_mut().zip(values.iter()) {
                    *field(l) = *v;
                }
            }
            got => {
                return Err(TextualError::WrongNumberValues {
                    letter,
                    anchors: num_anchors,
                    got,
                });
            }
        }
    }

    let mut flex = FlexConfig::default();
    if let Some(values) = words.get(&'W') {
        flex.mover_weight = scalar('W', values)?;
    }
    if let Some(values) = words.get(&'S') {
        flex.spring_k_per_unit_length = scalar('S', values)?;
    }
    let steps_per_revolution = match words.get(&'J') {
        Some(values) => scalar('J', values)?,
        None => DEFAULT_STEPS_PER_REVOLUTION,
    };
    Ok((lines, flex, steps_per_revolution))
}

fn scalar(letter: char, values: &[f64]) -> Result<f64, TextualError> {
    match values {
        [v] => Ok(*v),
        _ => Err(TextualError::NotAScalar {
            letter,
            got: values.len(),
        }),
    }
}

/// Writes the description back out as `M669` and `M666` lines.
/// Only what those commands can express is written, so gravity and the
/// `ignore_*` flags of [`FlexConfig`] don't survive a round trip.
impl fmt::Display for MachineDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "M669 K{HANGPRINTER_KINEMATICS} P{}", self.anchors.len())?;
        for (letter, [x, y, z]) in ANCHOR_LETTERS.iter().zip(self.anchors.iter()) {
            write!(f, " {letter}{x}:{y}:{z}")?;
        }
        writeln!(f)?;

        write!(f, "M666")?;
        if !self.lines.is_empty() {
            let per_line: [(char, fn(&LineConfig) -> f64); 9] = [
                ('Q', |l| l.spool_buildup_factor),
                ('R', |l| l.spool_radius),
                ('U', |l| l.mechanical_advantage),
                ('O', |l| l.lines_per_spool),
                ('L', |l| l.motor_gear_teeth),
                ('H', |l| l.spool_gear_teeth),
                ('I', |l| l.min_planned_force),
                ('X', |l| l.max_planned_force),
                ('Y', |l| l.guy_wire_length),
            ];
            for (letter, field) in per_line {
                write!(f, " {letter}")?;
                for (i, line) in self.lines.iter().enumerate() {
                    if i > 0 {
                        write!(f, ":")?;
                    }
                    write!(f, "{}", field(line))?;
                }
            }
        }
        writeln!(
            f,
            " J{} W{} S{}",
            self.steps_per_revolution, self.flex.mover_weight, self.flex.spring_k_per_unit_length
        )
    }
}

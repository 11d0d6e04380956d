use indexmap::IndexMap;
use winnow::{
    Result as WResult,
    ascii::{digit1, space0, space1},
    combinator::{alt, preceded, repeat, separated},
    prelude::*,
    token::one_of,
};

use crate::error::TextualError;

/// One G-code line, e.g. `M669 K6 P4 A0:-1620:-150`.
#[derive(Debug, PartialEq)]
pub(super) struct Command {
    /// 1-based line number in the source text.
    pub line: usize,
    /// The number after `M`.
    pub code: u32,
    /// Parameter words in the order they were written.
    pub words: IndexMap<char, Vec<f64>>,
}

/// Parse a whole configuration, skipping blank lines and `;` comments.
pub(super) fn parse_commands(s: &str) -> Result<Vec<Command>, TextualError> {
    let mut commands = Vec::new();
    for (i, raw) in s.lines().enumerate() {
        let line = i + 1;
        let text = raw.split(';').next().unwrap_or_default().trim();
        if text.is_empty() {
            continue;
        }
        let (code, words) = command.parse(text).map_err(|e| TextualError::Syntax {
            line,
            reason: e.to_string(),
        })?;
        let mut map = IndexMap::with_capacity(words.len());
        for (letter, values) in words {
            if map.insert(letter, values).is_some() {
                return Err(TextualError::DuplicateParameter { line, letter });
            }
        }
        commands.push(Command {
            line,
            code,
            words: map,
        });
    }
    Ok(commands)
}

// M666 Q0.007 R75:75:75:75:75
fn command(i: &mut &str) -> WResult<(u32, Vec<(char, Vec<f64>)>)> {
    let _ = one_of(['M', 'm']).parse_next(i)?;
    let code = digit1
        .verify_map(|s: &str| s.parse::<u32>().ok())
        .parse_next(i)?;
    let words = repeat(0.., preceded(space1, word)).parse_next(i)?;
    space0.parse_next(i)?;
    Ok((code, words))
}

// A0:-2000:-120
fn word(i: &mut &str) -> WResult<(char, Vec<f64>)> {
    let letter = one_of(|c: char| c.is_ascii_alphabetic()).parse_next(i)?;
    let values = separated(1.., parse_number, ':').parse_next(i)?;
    Ok((letter.to_ascii_uppercase(), values))
}

fn parse_number(i: &mut &str) -> WResult<f64> {
    fn myint(input: &mut &str) -> WResult<f64> {
        digit1
            .verify_map(|s: &str| s.parse::<f64>().ok())
            .parse_next(input)
    }

    fn myfloat(i: &mut &str) -> WResult<f64> {
        winnow::ascii::float.parse_next(i)
    }
    alt((myfloat, myint)).parse_next(i)
}

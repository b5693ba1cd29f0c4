//! Directive line parser.
//!
//! A directive is the first line of a test case: a command name followed by
//! named arguments, each with zero, one, or a parenthesized list of values.
//!
//! ```text
//! render  upper prefix=( a , b )  width=80
//! ```
//!
//! parses to the command `render` with the arguments `upper` (a flag),
//! `prefix` (two values) and `width` (one value). The canonical rendering of
//! the same directive is `render upper prefix=(a,b) width=80`.

use crate::lexical::{scan_word, skip_whitespace};
use std::fmt;

/// Errors raised while parsing a directive line.
///
/// Columns are 0-based byte offsets into the line.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DirectiveError {
    #[error("expected a command name at column {0}")]
    MissingCommand(usize),
    #[error("expected a value at column {0}")]
    MissingValue(usize),
    #[error("expected ',' or ')' to continue the value list at column {0}")]
    UnclosedList(usize),
    #[error("unexpected {found:?} at column {column}")]
    Unexpected { column: usize, found: char },
}

impl DirectiveError {
    /// Byte column within the line where parsing stopped.
    pub fn column(&self) -> usize {
        match self {
            DirectiveError::MissingCommand(column) => *column,
            DirectiveError::MissingValue(column) => *column,
            DirectiveError::UnclosedList(column) => *column,
            DirectiveError::Unexpected { column, .. } => *column,
        }
    }
}

/// A named argument and its values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Argument<'i> {
    pub name: &'i str,
    pub values: Vec<&'i str>,
}

impl<'i> Argument<'i> {
    /// The first value, if any.
    pub fn value(&self) -> Option<&'i str> {
        self.values.first().copied()
    }

    /// True for a bare flag without `=`.
    pub fn is_flag(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Display for Argument<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)?;
        match self.values.as_slice() {
            [] => Ok(()),
            [single] => write!(f, "={single}"),
            many => write!(f, "=({})", many.join(",")),
        }
    }
}

/// A parsed directive line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive<'i> {
    pub command: &'i str,
    pub arguments: Vec<Argument<'i>>,
}

impl<'i> Directive<'i> {
    /// Parse a single line (without its newline) into a directive.
    pub fn parse(line: &'i str) -> Result<Self, DirectiveError> {
        let bytes = line.as_bytes();
        let start = skip_whitespace(bytes, 0);
        let end = scan_word(bytes, start);
        if end == start {
            return Err(DirectiveError::MissingCommand(start));
        }

        let mut arguments = Vec::new();
        let mut at = end;
        loop {
            let next = skip_whitespace(bytes, at);
            if next == bytes.len() {
                break;
            }
            // Arguments must be separated from what precedes them by spacing
            if next == at {
                return Err(unexpected(line, at));
            }
            let (argument, after) = parse_argument(line, next)?;
            arguments.push(argument);
            at = after;
        }

        Ok(Directive {
            command: &line[start..end],
            arguments,
        })
    }

    /// Find the first argument with the given name.
    pub fn argument(&self, name: &str) -> Option<&Argument<'i>> {
        self.arguments.iter().find(|a| a.name == name)
    }

    /// True if an argument with the given name is present, with or without values.
    pub fn has(&self, name: &str) -> bool {
        self.argument(name).is_some()
    }

    /// The first value of the named argument.
    pub fn value(&self, name: &str) -> Option<&'i str> {
        self.argument(name).and_then(Argument::value)
    }
}

impl fmt::Display for Directive<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.command)?;
        for argument in &self.arguments {
            write!(f, " {argument}")?;
        }
        Ok(())
    }
}

fn unexpected(line: &str, column: usize) -> DirectiveError {
    DirectiveError::Unexpected {
        column,
        found: line[column..].chars().next().unwrap_or('\0'),
    }
}

/// Parse `name [= values]` starting at a non-whitespace byte. Returns the
/// argument and the offset just past it.
fn parse_argument(line: &str, at: usize) -> Result<(Argument<'_>, usize), DirectiveError> {
    let bytes = line.as_bytes();
    let end = scan_word(bytes, at);
    if end == at {
        return Err(unexpected(line, at));
    }
    let name = &line[at..end];

    let eq = skip_whitespace(bytes, end);
    if bytes.get(eq) != Some(&b'=') {
        return Ok((
            Argument {
                name,
                values: Vec::new(),
            },
            end,
        ));
    }

    let (values, after) = parse_values(line, eq + 1)?;
    Ok((Argument { name, values }, after))
}

fn parse_values(line: &str, from: usize) -> Result<(Vec<&str>, usize), DirectiveError> {
    let bytes = line.as_bytes();
    let at = skip_whitespace(bytes, from);

    if bytes.get(at) != Some(&b'(') {
        let end = scan_word(bytes, at);
        if end == at {
            return Err(DirectiveError::MissingValue(at));
        }
        return Ok((vec![&line[at..end]], end));
    }

    let mut values = Vec::new();
    let mut at = skip_whitespace(bytes, at + 1);
    loop {
        let end = scan_word(bytes, at);
        if end == at {
            return Err(DirectiveError::MissingValue(at));
        }
        values.push(&line[at..end]);

        let next = skip_whitespace(bytes, end);
        match bytes.get(next) {
            Some(b',') => at = skip_whitespace(bytes, next + 1),
            Some(b')') => return Ok((values, next + 1)),
            _ => return Err(DirectiveError::UnclosedList(next)),
        }
    }
}

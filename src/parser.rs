//! Fixture file scanner.
//!
//! [`ItemParser`] walks a fixture forward, one top-level item at a time:
//!
//! ```text
//! # comment            -> Item::Comment
//!                      -> Item::BlankLine
//! double upper         -> Item::Case, directive line
//! a                    ->   input block
//! ----                 ->   separator
//! A                    ->   expected output block
//! A                    ->
//!                      -> Item::BlankLine (ends the output block)
//! ```

use crate::case::{Item, TestCase};
use crate::directive::{Directive, DirectiveError};
use crate::lexical::{SEPARATOR, skip_whitespace};
use std::iter::FusedIterator;
use tracing::trace;

/// Errors raised while scanning a fixture.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("line {line}: {source}")]
    Directive {
        line: usize,
        #[source]
        source: DirectiveError,
    },
    #[error("line {line}: test case has no '----' line before end of file")]
    MissingSeparator { line: usize },
}

impl ParseError {
    /// 1-based line number of the directive that failed.
    pub fn line(&self) -> usize {
        match self {
            ParseError::Directive { line, .. } => *line,
            ParseError::MissingSeparator { line } => *line,
        }
    }
}

/// Position of the scanner within a fixture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    /// Byte offset of the next unread byte.
    pub offset: usize,
    /// 1-based number of the line starting at `offset`.
    pub line: usize,
}

impl Default for Cursor {
    fn default() -> Self {
        Cursor { offset: 0, line: 1 }
    }
}

/// Lazy, forward-only iterator over the items of a fixture.
///
/// Yields `Result<Item, ParseError>`; after the first error it yields nothing.
#[derive(Debug, Clone)]
pub struct ItemParser<'i> {
    source: &'i str,
    cursor: Cursor,
    failed: bool,
}

impl<'i> ItemParser<'i> {
    pub fn new(source: &'i str) -> Self {
        Self::resume(source, Cursor::default())
    }

    /// Continue scanning from a cursor previously returned by [`ItemParser::cursor`].
    pub fn resume(source: &'i str, cursor: Cursor) -> Self {
        ItemParser {
            source,
            cursor,
            failed: false,
        }
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    /// Consume one line, returning it without its newline. `None` at end of input.
    fn take_line(&mut self) -> Option<&'i str> {
        let start = self.cursor.offset;
        if start >= self.source.len() {
            return None;
        }
        let rest = &self.source[start..];
        let (line, width) = match rest.find('\n') {
            Some(end) => (&rest[..end], end + 1),
            None => (rest, rest.len()),
        };
        self.cursor.offset += width;
        self.cursor.line += 1;
        Some(line)
    }

    fn parse_case(&mut self) -> Result<TestCase<'i>, ParseError> {
        let line = self.cursor.line;
        let text = self.take_line().unwrap_or_default();
        let directive =
            Directive::parse(text).map_err(|source| ParseError::Directive { line, source })?;

        let input_start = self.cursor.offset;
        let input_end = loop {
            let before = self.cursor.offset;
            match self.take_line() {
                Some(SEPARATOR) => break before,
                Some(_) => {}
                None => return Err(ParseError::MissingSeparator { line }),
            }
        };

        let output_start = self.cursor.offset;
        let output_end = loop {
            let before = self.cursor;
            match self.take_line() {
                // The blank line is left for the next item
                Some("") => {
                    self.cursor = before;
                    break before.offset;
                }
                Some(_) => {}
                None => break self.source.len(),
            }
        };

        trace!(line, command = directive.command, "parsed test case");
        Ok(TestCase {
            line,
            directive,
            input: &self.source[input_start..input_end],
            output: &self.source[output_start..output_end],
        })
    }
}

impl<'i> Iterator for ItemParser<'i> {
    type Item = Result<Item<'i>, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        // Leading spacing decides nothing; an indented directive keeps its line
        let start = skip_whitespace(self.source.as_bytes(), self.cursor.offset);
        let first = *self.source.as_bytes().get(start)?;
        match first {
            b'\n' => {
                self.cursor.offset = start + 1;
                self.cursor.line += 1;
                Some(Ok(Item::BlankLine))
            }
            b'#' => {
                self.cursor.offset = start;
                self.take_line().map(|text| Ok(Item::Comment(text)))
            }
            _ => match self.parse_case() {
                Ok(case) => Some(Ok(Item::Case(case))),
                Err(e) => {
                    self.failed = true;
                    Some(Err(e))
                }
            },
        }
    }
}

impl FusedIterator for ItemParser<'_> {}

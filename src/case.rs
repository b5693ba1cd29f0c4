//! Parsed fixture items and their canonical rendering.

use crate::directive::Directive;
use crate::lexical::SEPARATOR;
use std::fmt;

/// One test case: a directive, its input block and its expected output.
///
/// `input` and `output` are verbatim slices of the fixture, including their
/// internal newlines but not the `----` separator or the terminating blank line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase<'i> {
    /// 1-based line number of the directive.
    pub line: usize,
    pub directive: Directive<'i>,
    pub input: &'i str,
    pub output: &'i str,
}

impl TestCase<'_> {
    /// Write everything up to and including the separator line.
    pub(crate) fn write_header(&self, out: &mut String) {
        use std::fmt::Write as _;
        let _ = write!(out, "{}\n{}{SEPARATOR}\n", self.directive, self.input);
    }
}

impl fmt::Display for TestCase<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\n{}{SEPARATOR}\n{}",
            self.directive, self.input, self.output
        )
    }
}

/// A top-level unit of a fixture file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Item<'i> {
    BlankLine,
    /// A full-line comment, including the leading `#` but not the newline.
    Comment(&'i str),
    Case(TestCase<'i>),
}

impl fmt::Display for Item<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Item::BlankLine => f.write_str("\n"),
            Item::Comment(text) => writeln!(f, "{text}"),
            Item::Case(case) => write!(f, "{case}"),
        }
    }
}

//! Data-driven golden-file testing.
//!
//! A fixture file holds a sequence of test cases. Each case is a directive
//! line, an input block, a `----` separator and the expected output, ended
//! by a blank line or the end of the file:
//!
//! ```text
//! # Lines are echoed twice
//! double upper
//! hello
//! ----
//! HELLO
//! HELLO
//! ```
//!
//! A test body drives a [`Runner`] over the file, computing the actual output
//! of each case from its [`Directive`] and input. With rewrite mode on, the
//! runner regenerates the file from the actual outputs instead of comparing.
//!
//! ```no_run
//! use goldtest::{TestCase, run_file};
//!
//! let rewrite = goldtest::env::rewrite_requested();
//! let mut handler = |case: &TestCase<'_>| -> Result<String, String> {
//!     match case.directive.command {
//!         "echo" => Ok(case.input.to_string()),
//!         other => Err(format!("unknown command {other}")),
//!     }
//! };
//! let outcome = run_file("tests/testdata/echo.txt", rewrite, &mut handler)?;
//! assert!(outcome.passed());
//! # Ok::<(), goldtest::Error>(())
//! ```

pub mod case;
pub mod commands;
pub mod config;
pub mod directive;
pub mod env;
pub mod lexical;
pub mod loader;
pub mod parser;
pub mod runner;

pub use case::{Item, TestCase};
pub use directive::{Argument, Directive, DirectiveError};
pub use parser::{ItemParser, ParseError};
pub use runner::{CaseResult, Error, FileResult, Handler, Runner, drive, run_file};

//! Test execution driver.
//!
//! A [`Runner`] streams through one fixture file, handing out test cases one
//! at a time and collecting their outcomes. The caller must report a result
//! (or a failure) for each case before asking for the next one:
//!
//! ```no_run
//! use goldtest::Runner;
//!
//! let mut runner = Runner::load("tests/testdata/lines.txt", false)?;
//! loop {
//!     let actual = match runner.next()? {
//!         Some(case) => case.input.to_uppercase(),
//!         None => break,
//!     };
//!     runner.result(&actual)?;
//! }
//! let outcome = runner.finish()?;
//! assert!(outcome.passed());
//! # Ok::<(), goldtest::Error>(())
//! ```
//!
//! In rewrite mode the runner compares nothing. It rebuilds the file with
//! each reported result in place of the recorded output and writes it back
//! in [`Runner::finish`].

use crate::case::{Item, TestCase};
use crate::parser::{Cursor, ItemParser, ParseError};
use serde::Serialize;
use std::borrow::Cow;
use std::fmt::Write as _;
use std::io::Write as _;
use std::ops::Range;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Errors raised while driving a fixture.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The fixture is malformed.
    #[error("{}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },
    /// `next()` was called while a test case still awaited its result.
    #[error("the previous test case has not reported a result")]
    UnprocessedTest,
    /// `result()` or `err()` was called with no test case in progress.
    #[error("no test case is in progress")]
    NoActiveTest,
    /// A driving call was made after the fixture was exhausted.
    #[error("every test case in the file has already been consumed")]
    FileCompleted,
    /// The test body reported a failure through `err()`.
    #[error("test failed: {0}")]
    Failed(String),
    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Outcome of a single test case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaseResult {
    /// Line of the directive in the fixture.
    pub line: usize,
    /// Canonical rendering of the directive.
    pub directive: String,
    pub passed: bool,
    pub expected: String,
    pub actual: String,
}

/// Outcome of a whole fixture file.
#[derive(Debug, Clone, Serialize)]
pub struct FileResult {
    pub path: PathBuf,
    /// True when the file was regenerated from actual results.
    pub rewritten: bool,
    pub cases: Vec<CaseResult>,
}

impl FileResult {
    pub fn passed(&self) -> bool {
        self.cases.iter().all(|c| c.passed)
    }

    pub fn failures(&self) -> impl Iterator<Item = &CaseResult> {
        self.cases.iter().filter(|c| !c.passed)
    }
}

/// The case currently awaiting a result.
#[derive(Debug)]
struct ActiveCase {
    line: usize,
    directive: String,
    /// Span of the recorded output within the fixture source.
    expected: Range<usize>,
}

#[derive(Debug)]
enum State {
    Pending,
    Running(ActiveCase),
    Completed,
}

/// Drives the test cases of one fixture file.
#[derive(Debug)]
pub struct Runner {
    path: PathBuf,
    source: String,
    cursor: Cursor,
    state: State,
    /// Regenerated file contents, present only in rewrite mode.
    rewrite: Option<String>,
    results: Vec<CaseResult>,
}

impl Runner {
    /// Read a fixture file in full and prepare to drive it.
    pub fn load(path: impl AsRef<Path>, rewrite: bool) -> Result<Self, Error> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), bytes = source.len(), rewrite, "loaded fixture");
        Ok(Self::from_source(path, source, rewrite))
    }

    /// Drive fixture contents already in memory. `path` is where
    /// [`Runner::finish`] writes in rewrite mode.
    pub fn from_source(path: impl Into<PathBuf>, source: impl Into<String>, rewrite: bool) -> Self {
        let source = source.into();
        Runner {
            path: path.into(),
            rewrite: rewrite.then(|| String::with_capacity(source.len())),
            source,
            cursor: Cursor::default(),
            state: State::Pending,
            results: Vec::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_rewriting(&self) -> bool {
        self.rewrite.is_some()
    }

    /// The regenerated contents accumulated so far, in rewrite mode.
    pub fn rewrite_buffer(&self) -> Option<&str> {
        self.rewrite.as_deref()
    }

    /// Outcomes recorded so far.
    pub fn results(&self) -> &[CaseResult] {
        &self.results
    }

    /// Advance to the next test case, or `None` once the file is exhausted.
    ///
    /// Blank lines and comments passed on the way are copied into the
    /// rewrite buffer.
    pub fn next(&mut self) -> Result<Option<TestCase<'_>>, Error> {
        match self.state {
            State::Pending => {}
            State::Running(_) => return Err(Error::UnprocessedTest),
            State::Completed => return Err(Error::FileCompleted),
        }

        let mut parser = ItemParser::resume(&self.source, self.cursor);
        loop {
            let item = match parser.next() {
                Some(Ok(item)) => item,
                Some(Err(source)) => {
                    self.state = State::Completed;
                    return Err(Error::Parse {
                        path: self.path.clone(),
                        source,
                    });
                }
                None => {
                    self.cursor = parser.cursor();
                    self.state = State::Completed;
                    debug!(path = %self.path.display(), cases = self.results.len(), "fixture exhausted");
                    return Ok(None);
                }
            };

            let case = match item {
                Item::Case(case) => case,
                other => {
                    if let Some(buffer) = &mut self.rewrite {
                        let _ = write!(buffer, "{other}");
                    }
                    continue;
                }
            };

            self.cursor = parser.cursor();
            if let Some(buffer) = &mut self.rewrite {
                case.write_header(buffer);
            }
            let directive = case.directive.to_string();
            debug!(line = case.line, %directive, "running test case");
            self.state = State::Running(ActiveCase {
                line: case.line,
                directive,
                expected: span_of(&self.source, case.output),
            });
            return Ok(Some(case));
        }
    }

    /// Report the actual output of the current test case.
    ///
    /// Outside rewrite mode a mismatch is printed and recorded as a failed
    /// case; it is not an error.
    pub fn result(&mut self, actual: &str) -> Result<(), Error> {
        let active = match std::mem::replace(&mut self.state, State::Pending) {
            State::Running(active) => active,
            State::Pending => return Err(Error::NoActiveTest),
            State::Completed => {
                self.state = State::Completed;
                return Err(Error::FileCompleted);
            }
        };

        let actual = terminated(actual);
        let expected = terminated(&self.source[active.expected]);

        let passed = match &mut self.rewrite {
            Some(buffer) => {
                if actual.split_terminator('\n').any(str::is_empty) {
                    warn!(
                        path = %self.path.display(),
                        line = active.line,
                        "actual output contains a blank line; the rewritten file will not parse back the same"
                    );
                }
                buffer.push_str(&actual);
                true
            }
            None => {
                let passed = expected == actual;
                if !passed {
                    eprintln!(
                        "{}:{}: {}\n{}",
                        self.path.display(),
                        active.line,
                        active.directive,
                        side_by_side(&expected, &actual)
                    );
                }
                passed
            }
        };

        self.results.push(CaseResult {
            line: active.line,
            directive: active.directive,
            passed,
            expected: expected.into_owned(),
            actual: actual.into_owned(),
        });
        Ok(())
    }

    /// Report that the current test case failed outright.
    ///
    /// Prints `message` and returns [`Error::Failed`], which should abort
    /// the run. Never returns `Ok`.
    pub fn err(&mut self, message: &str) -> Result<(), Error> {
        match &self.state {
            State::Pending => Err(Error::NoActiveTest),
            State::Completed => Err(Error::FileCompleted),
            State::Running(active) => {
                eprintln!(
                    "{}:{}: {}\n{message}",
                    self.path.display(),
                    active.line,
                    active.directive
                );
                Err(Error::Failed(message.to_string()))
            }
        }
    }

    /// Finish the run, writing the regenerated file in rewrite mode.
    pub fn finish(self) -> Result<FileResult, Error> {
        if !matches!(self.state, State::Completed) {
            warn!(path = %self.path.display(), "finishing before the fixture was exhausted");
        }

        let rewritten = match &self.rewrite {
            Some(buffer) => {
                replace_contents(&self.path, buffer.as_bytes()).map_err(|source| Error::Io {
                    path: self.path.clone(),
                    source,
                })?;
                debug!(path = %self.path.display(), bytes = buffer.len(), "rewrote fixture");
                true
            }
            None => false,
        };

        Ok(FileResult {
            path: self.path,
            rewritten,
            cases: self.results,
        })
    }
}

/// Something that can produce the actual output for a test case.
///
/// `Err` aborts the run through [`Runner::err`].
pub trait Handler {
    fn run(&mut self, case: &TestCase<'_>) -> Result<String, String>;
}

impl<F> Handler for F
where
    F: FnMut(&TestCase<'_>) -> Result<String, String>,
{
    fn run(&mut self, case: &TestCase<'_>) -> Result<String, String> {
        self(case)
    }
}

/// Feed every remaining test case of `runner` through `handler`.
pub fn drive<H: Handler + ?Sized>(runner: &mut Runner, handler: &mut H) -> Result<(), Error> {
    loop {
        let outcome = match runner.next()? {
            Some(case) => handler.run(&case),
            None => return Ok(()),
        };
        match outcome {
            Ok(actual) => runner.result(&actual)?,
            Err(message) => runner.err(&message)?,
        }
    }
}

/// Load, drive and finish one fixture file.
pub fn run_file<H: Handler + ?Sized>(
    path: impl AsRef<Path>,
    rewrite: bool,
    handler: &mut H,
) -> Result<FileResult, Error> {
    let mut runner = Runner::load(path, rewrite)?;
    drive(&mut runner, handler)?;
    runner.finish()
}

/// Byte range of `part` within `whole`. `part` must be a subslice of `whole`.
fn span_of(whole: &str, part: &str) -> Range<usize> {
    let start = part.as_ptr() as usize - whole.as_ptr() as usize;
    start..start + part.len()
}

/// Non-empty output always ends with a newline, so it cannot run into the
/// blank line that follows it in the file.
fn terminated(text: &str) -> Cow<'_, str> {
    if text.is_empty() || text.ends_with('\n') {
        Cow::Borrowed(text)
    } else {
        Cow::Owned(format!("{text}\n"))
    }
}

/// Expected and actual output in two columns, with `*` marking differing lines.
fn side_by_side(expected: &str, actual: &str) -> String {
    let left: Vec<&str> = expected.lines().collect();
    let right: Vec<&str> = actual.lines().collect();
    let width = left
        .iter()
        .map(|l| l.chars().count())
        .max()
        .unwrap_or(0)
        .max("expected".len());

    let mut out = String::new();
    let _ = writeln!(out, "{:<width$} | actual", "expected");
    let _ = writeln!(out, "{}-+-{}", "-".repeat(width), "-".repeat(width));
    for i in 0..left.len().max(right.len()) {
        let l = left.get(i).copied().unwrap_or("");
        let r = right.get(i).copied().unwrap_or("");
        let marker = if left.get(i) == right.get(i) { '|' } else { '*' };
        let row = format!("{l:<width$} {marker} {r}");
        let _ = writeln!(out, "{}", row.trim_end());
    }
    out
}

/// Replace the file at `path` with `contents` in one rename.
fn replace_contents(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut temp = tempfile::NamedTempFile::new_in(dir)?;
    temp.write_all(contents)?;
    if let Ok(metadata) = std::fs::metadata(path) {
        temp.as_file().set_permissions(metadata.permissions())?;
    }
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const FIXTURE: &str = "\
# shouting
upper
hello
----
HELLO

upper
a
b
----
A
B
";

    fn upper(case: &TestCase<'_>) -> Result<String, String> {
        Ok(case.input.to_uppercase())
    }

    /// Run a fixture held in memory through `handler` and return the outcome
    /// together with the rewrite buffer.
    fn run_in_memory<F>(source: &str, rewrite: bool, mut handler: F) -> (Vec<CaseResult>, Option<String>)
    where
        F: FnMut(&TestCase<'_>) -> Result<String, String>,
    {
        let mut runner = Runner::from_source("memory.txt", source, rewrite);
        drive(&mut runner, &mut handler).unwrap();
        let buffer = runner.rewrite_buffer().map(String::from);
        (runner.results().to_vec(), buffer)
    }

    // ==================== Protocol ====================

    #[test]
    fn test_next_twice_is_unprocessed() {
        let mut runner = Runner::from_source("f", FIXTURE, false);
        assert!(runner.next().unwrap().is_some());
        assert!(matches!(runner.next(), Err(Error::UnprocessedTest)));
    }

    #[test]
    fn test_result_before_next_has_no_active_test() {
        let mut runner = Runner::from_source("f", FIXTURE, false);
        assert!(matches!(runner.result("x"), Err(Error::NoActiveTest)));
        assert!(matches!(runner.err("x"), Err(Error::NoActiveTest)));
        // Still usable afterwards
        assert!(runner.next().unwrap().is_some());
    }

    #[test]
    fn test_calls_after_exhaustion_fail() {
        let mut runner = Runner::from_source("f", "upper\nx\n----\nX\n", false);
        assert!(runner.next().unwrap().is_some());
        runner.result("X\n").unwrap();
        assert!(runner.next().unwrap().is_none());

        assert!(matches!(runner.next(), Err(Error::FileCompleted)));
        assert!(matches!(runner.result("X\n"), Err(Error::FileCompleted)));
        assert!(matches!(runner.err("boom"), Err(Error::FileCompleted)));
    }

    #[test]
    fn test_empty_and_comment_only_files_complete_immediately() {
        for source in ["", "\n\n", "# only a comment\n\n# another"] {
            let mut runner = Runner::from_source("f", source, false);
            assert!(runner.next().unwrap().is_none(), "source {source:?}");
            assert!(matches!(runner.next(), Err(Error::FileCompleted)));
        }
    }

    #[test]
    fn test_err_is_fatal_and_keeps_case_active() {
        let mut runner = Runner::from_source("f", FIXTURE, false);
        runner.next().unwrap();
        match runner.err("handler exploded") {
            Err(Error::Failed(message)) => assert_eq!(message, "handler exploded"),
            other => panic!("expected Failed, got {other:?}"),
        }
        assert!(matches!(runner.next(), Err(Error::UnprocessedTest)));
    }

    #[test]
    fn test_parse_error_completes_the_run() {
        let mut runner = Runner::from_source("bad.txt", "cmd a=(b\nx\n----\n", false);
        match runner.next() {
            Err(Error::Parse { path, source }) => {
                assert_eq!(path, PathBuf::from("bad.txt"));
                assert_eq!(source.line(), 1);
            }
            other => panic!("expected parse error, got {other:?}"),
        }
        assert!(matches!(runner.next(), Err(Error::FileCompleted)));
    }

    #[test]
    fn test_case_exposes_directive_and_blocks() {
        let mut runner = Runner::from_source("f", "# c\nsingle prefix=(a,b)\nin\n----\nout\n", false);
        let case = runner.next().unwrap().unwrap();
        assert_eq!(case.line, 2);
        assert_eq!(case.directive.command, "single");
        assert_eq!(case.directive.argument("prefix").unwrap().values, ["a", "b"]);
        assert_eq!(case.input, "in\n");
        assert_eq!(case.output, "out\n");
    }

    // ==================== Comparison ====================

    #[test]
    fn test_matching_results_pass() {
        let (results, buffer) = run_in_memory(FIXTURE, false, upper);
        assert!(buffer.is_none());
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.passed), "results: {results:?}");
        assert_eq!(results[0].line, 2);
        assert_eq!(results[1].line, 7);
        assert_eq!(results[1].directive, "upper");
    }

    #[test]
    fn test_mismatch_is_recorded_not_raised() {
        let (results, _) = run_in_memory(FIXTURE, false, |case: &TestCase<'_>| {
            Ok(case.input.to_string())
        });
        assert_eq!(results.len(), 2);
        assert!(!results[0].passed);
        assert_eq!(results[0].expected, "HELLO\n");
        assert_eq!(results[0].actual, "hello\n");
    }

    #[test]
    fn test_missing_trailing_newline_is_normalized() {
        let (results, _) = run_in_memory("echo\n----\nvalue", false, |_: &TestCase<'_>| {
            Ok("value".to_string())
        });
        assert!(results[0].passed);
        assert_eq!(results[0].expected, "value\n");
    }

    #[test]
    fn test_empty_output_matches_empty_result() {
        let (results, _) = run_in_memory("noop\n----\n\n", false, |_: &TestCase<'_>| {
            Ok(String::new())
        });
        assert!(results[0].passed);
    }

    // ==================== Rewrite ====================

    #[test]
    fn test_rewrite_substitutes_actual_output() {
        let (results, buffer) = run_in_memory(FIXTURE, true, |case: &TestCase<'_>| {
            Ok(format!("<{}>", case.input.trim_end()))
        });
        assert!(results.iter().all(|r| r.passed));
        assert_eq!(
            buffer.unwrap(),
            "# shouting\nupper\nhello\n----\n<hello>\n\nupper\na\nb\n----\n<a\nb>\n"
        );
    }

    #[test]
    fn test_rewrite_canonicalizes_directives() {
        let source = "  cmd   b = ( 1 , 2 )  a=(x)\n----\nold\n";
        let (_, buffer) = run_in_memory(source, true, |_: &TestCase<'_>| Ok("new\n".to_string()));
        assert_eq!(buffer.unwrap(), "cmd b=(1,2) a=x\n----\nnew\n");
    }

    #[test]
    fn test_rewrite_is_idempotent() {
        let source = "# c\n\nsingle   x=(a)\nq\n----\nstale\n\n\ndouble\nr\n----\n";
        let handler = |case: &TestCase<'_>| Ok(format!("{}{}", case.directive.command, case.input));

        let (_, first) = run_in_memory(source, true, handler);
        let first = first.unwrap();
        let (_, second) = run_in_memory(&first, true, handler);
        assert_eq!(second.unwrap(), first);

        let (results, _) = run_in_memory(&first, false, handler);
        assert!(results.iter().all(|r| r.passed), "results: {results:?}");
    }

    #[test]
    fn test_finish_writes_rewritten_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cases.txt");
        // The regenerated file is shorter than the original
        std::fs::write(&path, "upper\nab\n----\nsomething much longer\nthan the result\n").unwrap();

        let outcome = run_file(&path, true, &mut upper).unwrap();
        assert!(outcome.rewritten);
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "upper\nab\n----\nAB\n"
        );
    }

    #[test]
    fn test_finish_without_rewrite_leaves_file_alone() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cases.txt");
        let original = "upper\nab\n----\nwrong\n";
        std::fs::write(&path, original).unwrap();

        let outcome = run_file(&path, false, &mut upper).unwrap();
        assert!(!outcome.rewritten);
        assert!(!outcome.passed());
        assert_eq!(outcome.failures().count(), 1);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), original);
    }

    #[test]
    fn test_finish_early_writes_partial_buffer() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cases.txt");
        std::fs::write(&path, FIXTURE).unwrap();

        let mut runner = Runner::load(&path, true).unwrap();
        runner.next().unwrap();
        runner.result("HI\n").unwrap();
        runner.finish().unwrap();

        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "# shouting\nupper\nhello\n----\nHI\n"
        );
    }

    #[test]
    fn test_handler_error_aborts_run_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cases.txt");
        std::fs::write(&path, FIXTURE).unwrap();

        let mut failing = |_: &TestCase<'_>| Err::<String, _>("unsupported".to_string());
        let result = run_file(&path, true, &mut failing);
        assert!(matches!(result, Err(Error::Failed(m)) if m == "unsupported"));
        // Nothing is written when the run aborts
        assert_eq!(std::fs::read_to_string(&path).unwrap(), FIXTURE);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempdir().unwrap();
        let result = Runner::load(dir.path().join("absent.txt"), false);
        assert!(matches!(result, Err(Error::Io { .. })));
    }

    // ==================== Helpers ====================

    #[test]
    fn test_side_by_side_marks_differences() {
        let report = side_by_side("one\ntwo\n", "one\n2\nthree\n");
        assert_eq!(
            report,
            "\
expected | actual
---------+---------
one      | one
two      * 2
         * three
"
        );
    }

    #[test]
    fn test_span_of_subslice() {
        let whole = "abcdef";
        assert_eq!(span_of(whole, &whole[2..4]), 2..4);
        assert_eq!(span_of(whole, &whole[6..]), 6..6);
    }
}

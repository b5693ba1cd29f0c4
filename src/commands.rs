//! Built-in line-processing commands.
//!
//! These are what the `goldtest` binary runs fixtures against:
//!
//! - `single` emits each input line once.
//! - `double` emits each input line twice.
//!
//! Both accept `upper` (uppercase every line), `reverse` (reverse the line
//! order) and `prefix=<v>` or `prefix=(v1,v2,...)` (prepend the values,
//! joined by spaces).

use crate::case::TestCase;
use crate::directive::Argument;
use crate::runner::Handler;

/// [`Handler`] for the `single` and `double` commands.
#[derive(Debug, Clone, Copy, Default)]
pub struct LineCommands;

impl Handler for LineCommands {
    fn run(&mut self, case: &TestCase<'_>) -> Result<String, String> {
        evaluate(case)
    }
}

#[derive(Debug, Default)]
struct Options {
    upper: bool,
    reverse: bool,
    prefix: Option<String>,
}

/// Run one test case through the line commands.
pub fn evaluate(case: &TestCase<'_>) -> Result<String, String> {
    let repeat = match case.directive.command {
        "single" => 1,
        "double" => 2,
        other => return Err(format!("unknown command {other:?}")),
    };

    let mut options = Options::default();
    for argument in &case.directive.arguments {
        match argument.name {
            "upper" => options.upper = flag(argument)?,
            "reverse" => options.reverse = flag(argument)?,
            "prefix" => {
                if argument.values.is_empty() {
                    return Err("prefix needs at least one value".to_string());
                }
                options.prefix = Some(argument.values.join(" "));
            }
            other => {
                return Err(format!(
                    "unknown argument {other:?} for {:?}",
                    case.directive.command
                ));
            }
        }
    }

    let mut lines: Vec<&str> = case.input.lines().collect();
    if options.reverse {
        lines.reverse();
    }

    let mut out = String::new();
    for line in lines {
        let text = if options.upper {
            line.to_uppercase()
        } else {
            line.to_string()
        };
        for _ in 0..repeat {
            if let Some(prefix) = &options.prefix {
                out.push_str(prefix);
                out.push(' ');
            }
            out.push_str(&text);
            out.push('\n');
        }
    }
    Ok(out)
}

fn flag(argument: &Argument<'_>) -> Result<bool, String> {
    if argument.is_flag() {
        Ok(true)
    } else {
        Err(format!("{} takes no value", argument.name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directive::Directive;

    fn run(directive: &str, input: &str) -> Result<String, String> {
        let case = TestCase {
            line: 1,
            directive: Directive::parse(directive).unwrap(),
            input,
            output: "",
        };
        LineCommands.run(&case)
    }

    #[test]
    fn single_echoes_lines() {
        assert_eq!(run("single", "a\nb\n").unwrap(), "a\nb\n");
    }

    #[test]
    fn double_repeats_lines() {
        assert_eq!(run("double", "a\nb\n").unwrap(), "a\na\nb\nb\n");
    }

    #[test]
    fn input_without_trailing_newline() {
        assert_eq!(run("single", "a\nb").unwrap(), "a\nb\n");
    }

    #[test]
    fn empty_input_gives_empty_output() {
        assert_eq!(run("double", "").unwrap(), "");
    }

    #[test]
    fn upper_and_reverse() {
        assert_eq!(
            run("double upper reverse", "ab\ncd\n").unwrap(),
            "CD\nCD\nAB\nAB\n"
        );
    }

    #[test]
    fn prefix_values_are_joined() {
        assert_eq!(run("single prefix=>", "x\n").unwrap(), "> x\n");
        assert_eq!(
            run("single prefix=(1,2)", "x\ny\n").unwrap(),
            "1 2 x\n1 2 y\n"
        );
    }

    #[test]
    fn unknown_command() {
        let err = run("triple", "x\n").unwrap_err();
        assert!(err.contains("unknown command"), "{err}");
    }

    #[test]
    fn unknown_argument() {
        let err = run("single loud", "x\n").unwrap_err();
        assert!(err.contains("\"loud\""), "{err}");
    }

    #[test]
    fn flags_reject_values() {
        assert_eq!(run("single upper=yes", "x\n").unwrap_err(), "upper takes no value");
    }
}

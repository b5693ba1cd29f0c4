use clap::{Parser, Subcommand, ValueEnum};
use goldtest::commands::LineCommands;
use goldtest::config::SuiteConfig;
use goldtest::{FileResult, loader, run_file};
use regex::Regex;
use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Clone, Copy, Default, ValueEnum)]
enum OutputFormat {
    /// Human-readable output with checkmarks
    #[default]
    Human,
    /// Machine-readable JSON output
    Json,
    /// JUnit XML output for CI systems
    Junit,
}

#[derive(Parser)]
#[command(name = "goldtest")]
#[command(about = "Run data-driven golden-file fixtures, or regenerate them")]
#[command(version)]
struct Cli {
    /// Show debug logging on stderr (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run fixtures through the built-in line commands
    Run {
        /// Path to fixtures (file or directory)
        path: PathBuf,
        /// Output format
        #[arg(short, long, default_value = "human")]
        output: OutputFormat,
        /// Only run fixtures whose path matches this regex
        #[arg(short, long)]
        filter: Option<String>,
        /// Regenerate expected outputs instead of comparing them.
        /// Also enabled by the REWRITE environment variable.
        #[arg(long)]
        rewrite: bool,
    },
    /// Parse fixtures without running them
    Validate {
        /// Path to fixtures (file or directory)
        path: PathBuf,
    },
    /// Scaffold a new fixture file
    Init {
        /// Output path for the new fixture
        #[arg(default_value = "tests/testdata/example.txt")]
        path: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Run {
            path,
            output,
            filter,
            rewrite,
        } => {
            let config = load_config(&path);
            let rewrite = rewrite || goldtest::env::rewrite_requested() || config.rewrite;

            let filter = match filter.as_deref().map(Regex::new).transpose() {
                Ok(f) => f,
                Err(e) => {
                    eprintln!("Invalid filter: {e}");
                    std::process::exit(1);
                }
            };

            let fixtures: Vec<PathBuf> = find_fixtures(&path, &config)
                .into_iter()
                .filter(|p| {
                    filter
                        .as_ref()
                        .is_none_or(|re| re.is_match(&p.display().to_string()))
                })
                .collect();

            if fixtures.is_empty() {
                eprintln!("No fixtures found at: {}", path.display());
                std::process::exit(1);
            }
            debug!(count = fixtures.len(), rewrite, "running fixtures");

            // Track total execution time
            let run_start = Instant::now();

            // Fixtures run one after another, in path order
            let file_results: Vec<(PathBuf, Result<FileResult, goldtest::Error>, Duration)> =
                fixtures
                    .into_iter()
                    .map(|fixture| {
                        let start = Instant::now();
                        let result = run_file(&fixture, rewrite, &mut LineCommands);
                        (fixture, result, start.elapsed())
                    })
                    .collect();

            let mut json_results = Vec::new();
            let mut junit_results = Vec::new();
            let mut total_passed = 0;
            let mut total_failed = 0;

            for (fixture, result, elapsed) in file_results {
                match result {
                    Err(e) => {
                        match output {
                            OutputFormat::Human => {
                                eprintln!("✗ {e}");
                            }
                            OutputFormat::Json => {
                                json_results.push(serde_json::json!({
                                    "file": fixture.display().to_string(),
                                    "error": e.to_string(),
                                }));
                            }
                            // For JUnit, an aborted fixture becomes one synthetic failed case
                            OutputFormat::Junit => {
                                junit_results.push(JunitFileResult {
                                    file: fixture.display().to_string(),
                                    cases: vec![JunitCase {
                                        name: "<run>".to_string(),
                                        failure: Some(e.to_string()),
                                    }],
                                    total_time: elapsed,
                                });
                            }
                        }
                        total_failed += 1;
                    }
                    Ok(file_result) => {
                        for case in &file_result.cases {
                            if case.passed {
                                total_passed += 1;
                            } else {
                                total_failed += 1;
                            }
                        }

                        match output {
                            OutputFormat::Human => {
                                println!("\n{}", fixture.display());
                                for case in &file_result.cases {
                                    let mark = if case.passed { '✓' } else { '✗' };
                                    println!("  {mark} line {}: {}", case.line, case.directive);
                                }
                                if file_result.rewritten {
                                    println!("  rewrote {} case(s)", file_result.cases.len());
                                }
                            }
                            OutputFormat::Json => {
                                json_results.push(serde_json::json!({
                                    "file": fixture.display().to_string(),
                                    "rewritten": file_result.rewritten,
                                    "cases": file_result.cases,
                                }));
                            }
                            OutputFormat::Junit => {
                                junit_results.push(JunitFileResult {
                                    file: fixture.display().to_string(),
                                    cases: file_result
                                        .cases
                                        .iter()
                                        .map(|case| JunitCase {
                                            name: format!("line {}: {}", case.line, case.directive),
                                            failure: (!case.passed).then(|| {
                                                format!(
                                                    "expected:\n{}actual:\n{}",
                                                    case.expected, case.actual
                                                )
                                            }),
                                        })
                                        .collect(),
                                    total_time: elapsed,
                                });
                            }
                        }
                    }
                }
            }

            let total_time = run_start.elapsed();

            match output {
                OutputFormat::Human => {
                    println!("\n{total_passed} passed, {total_failed} failed");
                }
                OutputFormat::Json => {
                    let output = serde_json::json!({
                        "passed": total_passed,
                        "failed": total_failed,
                        "rewrite": rewrite,
                        "results": json_results,
                    });
                    match serde_json::to_string_pretty(&output) {
                        Ok(json) => println!("{json}"),
                        Err(e) => {
                            eprintln!("Failed to serialize results: {e}");
                            std::process::exit(1);
                        }
                    }
                }
                OutputFormat::Junit => {
                    print!("{}", format_junit_xml(&junit_results, total_time));
                }
            }

            if total_failed > 0 {
                std::process::exit(1);
            }
        }
        Command::Validate { path } => {
            let config = load_config(&path);
            let fixtures = find_fixtures(&path, &config);

            if fixtures.is_empty() {
                eprintln!("No fixtures found at: {}", path.display());
                std::process::exit(1);
            }

            let mut errors = 0;
            for fixture in &fixtures {
                match loader::validate_fixture(fixture) {
                    Ok(cases) => {
                        println!("✓ {} ({cases} cases)", fixture.display());
                    }
                    Err(e) => {
                        eprintln!("✗ {e}");
                        errors += 1;
                    }
                }
            }

            if errors > 0 {
                eprintln!("\n{errors} fixture(s) failed validation");
                std::process::exit(1);
            }
            println!("\nAll {} fixture(s) valid", fixtures.len());
        }
        Command::Init { path } => {
            let template = r#"# Each case is a directive line, its input, a `----` separator and the
# expected output, ended by a blank line. Regenerate the expected output
# with `goldtest run --rewrite <file>` or by setting REWRITE.

single
hello world
----
hello world

double upper
hello
----
HELLO
HELLO

single prefix=(>,>) reverse
first
second
----
> > second
> > first
"#;
            if path.exists() {
                eprintln!("Error: file already exists: {}", path.display());
                std::process::exit(1);
            }
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
                && !parent.exists()
                && let Err(e) = fs::create_dir_all(parent)
            {
                eprintln!("Error creating directory: {e}");
                std::process::exit(1);
            }
            if let Err(e) = fs::write(&path, template) {
                eprintln!("Error writing file: {e}");
                std::process::exit(1);
            }
            println!("Created: {}", path.display());
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Load `goldtest.yaml` from the fixture root, falling back to defaults.
fn load_config(path: &std::path::Path) -> SuiteConfig {
    let root = if path.is_file() {
        path.parent().unwrap_or(path)
    } else {
        path
    };

    match loader::load_suite_config(root) {
        Ok(config) => config.unwrap_or_default(),
        Err(e) => {
            eprintln!("Error loading suite config: {e}");
            std::process::exit(1);
        }
    }
}

fn find_fixtures(path: &std::path::Path, config: &SuiteConfig) -> Vec<PathBuf> {
    match loader::find_fixtures(path, config) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Error finding fixtures at {}: {e}", path.display());
            std::process::exit(1);
        }
    }
}

/// A file result for JUnit output.
struct JunitFileResult {
    file: String,
    cases: Vec<JunitCase>,
    total_time: Duration,
}

struct JunitCase {
    name: String,
    failure: Option<String>,
}

/// Format results as JUnit XML.
fn format_junit_xml(results: &[JunitFileResult], total_time: Duration) -> String {
    let mut xml = String::new();
    xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");

    let total_tests: usize = results.iter().map(|r| r.cases.len()).sum();
    let total_failures: usize = results
        .iter()
        .flat_map(|r| &r.cases)
        .filter(|c| c.failure.is_some())
        .count();

    let _ = writeln!(
        xml,
        "<testsuites tests=\"{total_tests}\" failures=\"{total_failures}\" time=\"{:.3}\">",
        total_time.as_secs_f64()
    );

    for file_result in results {
        let tests = file_result.cases.len();
        let failures = file_result
            .cases
            .iter()
            .filter(|c| c.failure.is_some())
            .count();

        let _ = writeln!(
            xml,
            "  <testsuite name=\"{}\" tests=\"{tests}\" failures=\"{failures}\" time=\"{:.3}\">",
            escape_xml(&file_result.file),
            file_result.total_time.as_secs_f64()
        );

        for case in &file_result.cases {
            match &case.failure {
                None => {
                    let _ = writeln!(xml, "    <testcase name=\"{}\"/>", escape_xml(&case.name));
                }
                Some(failure) => {
                    let _ = writeln!(xml, "    <testcase name=\"{}\">", escape_xml(&case.name));
                    let _ = writeln!(xml, "      <failure message=\"case failed\">");
                    let _ = writeln!(xml, "{}", escape_xml(failure));
                    xml.push_str("      </failure>\n");
                    xml.push_str("    </testcase>\n");
                }
            }
        }

        xml.push_str("  </testsuite>\n");
    }

    xml.push_str("</testsuites>\n");
    xml
}

/// Escape special XML characters.
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

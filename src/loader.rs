//! Fixture discovery and suite config loading.

use crate::case::Item;
use crate::config::SuiteConfig;
use crate::parser::{ItemParser, ParseError};
use std::path::{Path, PathBuf};

/// Error type for loading operations.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid YAML in {}: {source}", .path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("{}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },
}

/// The name of the suite configuration file.
pub const SUITE_CONFIG_FILENAME: &str = "goldtest.yaml";

/// Load suite configuration from a directory.
///
/// Looks for `goldtest.yaml` in the given directory.
/// Returns `None` if the file doesn't exist, `Err` if it exists but is invalid.
pub fn load_suite_config(dir: &Path) -> Result<Option<SuiteConfig>, LoadError> {
    let config_path = dir.join(SUITE_CONFIG_FILENAME);

    if !config_path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&config_path).map_err(|source| LoadError::Io {
        path: config_path.clone(),
        source,
    })?;
    let config = serde_yaml::from_str(&contents).map_err(|source| LoadError::Yaml {
        path: config_path,
        source,
    })?;
    Ok(Some(config))
}

/// Find all fixture files in a directory or return the single file.
pub fn find_fixtures(path: &Path, config: &SuiteConfig) -> Result<Vec<PathBuf>, std::io::Error> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }

    let mut fixtures = Vec::new();
    collect_fixtures_recursive(path, config, &mut fixtures)?;
    fixtures.sort();
    Ok(fixtures)
}

fn collect_fixtures_recursive(
    dir: &Path,
    config: &SuiteConfig,
    fixtures: &mut Vec<PathBuf>,
) -> Result<(), std::io::Error> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();

        if path.is_dir() {
            collect_fixtures_recursive(&path, config, fixtures)?;
        } else if let Some(ext) = path.extension().and_then(|e| e.to_str())
            && config.is_fixture_extension(ext)
        {
            // Skip suite config file
            if path.file_name().is_some_and(|f| f == SUITE_CONFIG_FILENAME) {
                continue;
            }
            fixtures.push(path);
        }
    }
    Ok(())
}

/// Parse a fixture without running it, returning the number of test cases.
pub fn validate_fixture(path: &Path) -> Result<usize, LoadError> {
    let contents = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut cases = 0;
    for item in ItemParser::new(&contents) {
        let item = item.map_err(|source| LoadError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        if matches!(item, Item::Case(_)) {
            cases += 1;
        }
    }
    Ok(cases)
}

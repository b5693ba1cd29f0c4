//! Suite configuration.
//!
//! An optional `goldtest.yaml` in the fixture root sets defaults for every
//! fixture found beneath it:
//!
//! ```yaml
//! version: 1
//! rewrite: false
//! extensions: [txt, dd]
//! ```

use serde::{Deserialize, Serialize};

/// Suite-level configuration loaded from `goldtest.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SuiteConfig {
    /// Schema version (must match crate major version).
    #[serde(default = "default_version")]
    pub version: u32,

    /// Regenerate expected outputs instead of comparing them.
    #[serde(default)]
    pub rewrite: bool,

    /// File extensions treated as fixtures when searching a directory.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        SuiteConfig {
            version: default_version(),
            rewrite: false,
            extensions: default_extensions(),
        }
    }
}

impl SuiteConfig {
    /// True if `ext` (without the dot) names a fixture file.
    pub fn is_fixture_extension(&self, ext: &str) -> bool {
        self.extensions.iter().any(|e| e.trim_start_matches('.') == ext)
    }
}

fn default_version() -> u32 {
    1
}

fn default_extensions() -> Vec<String> {
    vec!["txt".to_string()]
}

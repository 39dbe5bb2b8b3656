//! Run configuration.

use std::fs;
use std::io;
use std::path::Path;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::backend::Backend;
use crate::errors::{BenchError, BenchResult};

/// What the harness does after a trial fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Stop at the first failing pair.
    #[default]
    Halt,
    /// Attempt every remaining pair and report all failures.
    Continue,
}

/// Options for a benchmark run. Every field has a default, so a partial file
/// is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchConfig {
    /// Backend identifiers to try, in order. Unknown identifiers are skipped.
    pub backends: Vec<String>,
    pub failure_policy: FailurePolicy,
    /// Seed for the input generator. A fresh entropy seed is used when unset.
    pub seed: Option<u64>,
    /// Log skipped device/backend combinations at warn instead of debug level.
    pub warn_on_skipped_pairs: bool,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            backends: Backend::ALL
                .iter()
                .map(|backend| backend.identifier().to_string())
                .collect(),
            failure_policy: FailurePolicy::Halt,
            seed: None,
            warn_on_skipped_pairs: false,
        }
    }
}

/// Configuration loader that handles JSON files with fallbacks
pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads `path` if given. A missing file falls back to the defaults with a
    /// warning; an unreadable or malformed one is an error.
    pub fn load(path: Option<&Path>) -> BenchResult<BenchConfig> {
        let Some(path) = path else {
            return Ok(BenchConfig::default());
        };

        match fs::read_to_string(path) {
            Ok(content) => Self::parse(path, &content),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!(
                    "Config file '{}' not found, using default configuration",
                    path.display()
                );
                Ok(BenchConfig::default())
            }
            Err(e) => Err(BenchError::Io { source: e }),
        }
    }

    pub fn parse(path: &Path, content: &str) -> BenchResult<BenchConfig> {
        serde_json::from_str(content).map_err(|e| BenchError::ConfigParse {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

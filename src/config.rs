use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::rewriter::RewriteMode;

/// Engine configuration.
///
/// Every field has a default, so a config file only needs the keys it
/// overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Pass cap for fixpoint transformation
    pub max_iterations: usize,
    /// Run a single rewrite pass instead of iterating to a fixpoint
    pub single_pass: bool,
    /// Transform top-level declarations on worker threads
    pub parallel: bool,
    /// Extra rule definitions appended to the built-in catalog
    pub rules_path: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_iterations: 32,
            single_pass: false,
            parallel: false,
            rules_path: None,
        }
    }
}

impl EngineConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: EngineConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(EngineError::Config(
                "maxIterations must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn mode(&self) -> RewriteMode {
        if self.single_pass {
            RewriteMode::SinglePass
        } else {
            RewriteMode::Fixpoint {
                max_iterations: self.max_iterations,
            }
        }
    }
}

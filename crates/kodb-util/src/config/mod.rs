//! Configuration loading and validation.

mod types;
mod validation;

pub use types::*;

use crate::error::Result;
use std::path::{Path, PathBuf};

/// Config file looked up in the working directory when none is given.
pub const DEFAULT_CONFIG_FILE_NAME: &str = "kodb-util-config.yaml";

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }

    /// Apply command-line overrides on top of the loaded file.
    pub fn with_overrides(mut self, overrides: Overrides) -> Result<Self> {
        if let Some(user) = overrides.db_user {
            self.database_config.user = user;
        }
        if let Some(pass) = overrides.db_pass {
            self.database_config.password = pass;
        }
        if let Some(dir) = overrides.schema_dir {
            self.gen_config.schema_dir = dir;
        }
        if let Some(size) = overrides.import_batch_size {
            self.gen_config.import_batch_size = Some(size);
        }
        self.validate()?;
        Ok(self)
    }
}

/// Values supplied on the command line that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub db_user: Option<String>,
    pub db_pass: Option<String>,
    pub schema_dir: Option<PathBuf>,
    pub import_batch_size: Option<usize>,
}

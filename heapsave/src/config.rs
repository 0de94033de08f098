//! Host configuration
//!
//! Every field has a default, so an empty JSON object is a valid
//! configuration file. CLI flags are applied on top of the loaded values.

use crate::error::{Error, Result};
use heapsave_support::DEFAULT_MIME_TYPE;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for [`crate::runtime::WasmRuntime`] and the directory platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Import module the guest resolves `download` from
    #[serde(default = "default_import_module")]
    pub import_module: String,

    /// Name of the guest's exported linear memory
    #[serde(default = "default_memory_export")]
    pub memory_export: String,

    /// Type tag given to every blob
    #[serde(default = "default_mime_type")]
    pub mime_type: String,

    /// Directory that saved files are written to
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Replace existing files instead of picking a new name
    #[serde(default)]
    pub overwrite: bool,

    /// Upper bound on guest memory growth
    #[serde(default = "default_max_memory_bytes")]
    pub max_memory_bytes: usize,
}

fn default_import_module() -> String {
    "env".to_string()
}

fn default_memory_export() -> String {
    "memory".to_string()
}

fn default_mime_type() -> String {
    DEFAULT_MIME_TYPE.to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("downloads")
}

fn default_max_memory_bytes() -> usize {
    4 * 1024 * 1024 * 1024
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            import_module: default_import_module(),
            memory_export: default_memory_export(),
            mime_type: default_mime_type(),
            output_dir: default_output_dir(),
            overwrite: false,
            max_memory_bytes: default_max_memory_bytes(),
        }
    }
}

impl RuntimeConfig {
    /// Load a configuration from a JSON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the configuration can be used
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] describing the first invalid field
    pub fn validate(&self) -> Result<()> {
        if self.import_module.is_empty() {
            return Err(Error::Config("import_module must not be empty".to_string()));
        }
        if self.memory_export.is_empty() {
            return Err(Error::Config("memory_export must not be empty".to_string()));
        }
        if self.mime_type.is_empty() {
            return Err(Error::Config("mime_type must not be empty".to_string()));
        }
        if self.max_memory_bytes == 0 {
            return Err(Error::Config("max_memory_bytes must be positive".to_string()));
        }
        Ok(())
    }
}

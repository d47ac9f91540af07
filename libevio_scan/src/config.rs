use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::constants::DEFAULT_REGION_SIZE_BYTES;
use super::error::ConfigError;
use super::mapped_region::WordOrder;

/// Structure representing the application configuration. Contains the files to scan and how
/// to read them.
/// Configs are seralizable and deserializable to YAML using serde and serde_yaml. Fields
/// missing from a file take their default value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub files: Vec<PathBuf>,
    pub byte_order: WordOrder,
    pub region_size_bytes: usize,
    pub report_path: Option<PathBuf>,
    pub n_threads: i32,
}

impl Default for Config {
    /// Generate a new Config object with no files
    fn default() -> Self {
        Self {
            files: vec![],
            byte_order: WordOrder::Big,
            region_size_bytes: DEFAULT_REGION_SIZE_BYTES,
            report_path: None,
            n_threads: 1,
        }
    }
}

impl Config {
    /// Read the configuration in a YAML file
    /// Returns a Config if successful
    pub fn read_config_file(config_path: &Path) -> Result<Self, ConfigError> {
        if !config_path.exists() {
            return Err(ConfigError::BadFilePath(config_path.to_path_buf()));
        }

        let yaml_str = std::fs::read_to_string(config_path)?;

        Ok(serde_yaml::from_str::<Self>(&yaml_str)?)
    }

    /// Write the configuration to a YAML file
    pub fn write_config_file(&self, config_path: &Path) -> Result<(), ConfigError> {
        let yaml_str = serde_yaml::to_string(self)?;
        std::fs::write(config_path, yaml_str)?;
        Ok(())
    }

    pub fn is_n_threads_valid(&self) -> bool {
        self.n_threads >= 1
    }

    pub fn has_report_path(&self) -> bool {
        self.report_path.is_some()
    }

    /// Get the path of the fault report for `source`, if reports were requested.
    /// The report directory must already exist.
    pub fn get_report_file_name(&self, source: &Path) -> Result<Option<PathBuf>, ConfigError> {
        let Some(report_dir) = &self.report_path else {
            return Ok(None);
        };
        if !report_dir.exists() {
            return Err(ConfigError::BadFilePath(report_dir.clone()));
        }
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| String::from("unnamed"));
        Ok(Some(report_dir.join(format!("{stem}.faults.yml"))))
    }
}

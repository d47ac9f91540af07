use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegionError {
    #[error("Could not map file because file {0:?} does not exist")]
    BadFilePath(PathBuf),
    #[error("MappedRegionSet failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Requested index {index} is beyond the end of the file (limit {limit})")]
    OutOfRange { index: u64, limit: u64 },
    #[error("Region size of {0} bytes is invalid; regions must hold at least one word")]
    InvalidRegionSize(usize),
}

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("File of {0} bytes is too small to contain a single container header")]
    FileTooSmall(u64),
    #[error("Scan failed due to MappedRegionSet error: {0}")]
    RegionError(#[from] RegionError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration as file {0:?} does not exist")]
    BadFilePath(PathBuf),
    #[error("Config failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Config failed to parse YAML: {0}")]
    ParsingError(#[from] serde_yaml::Error),
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("ReportWriter failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("ReportWriter failed to convert to yaml: {0}")]
    ParsingError(#[from] serde_yaml::Error),
}

#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("Processor failed due to Config error: {0}")]
    ConfigError(#[from] ConfigError),
    #[error("Processor failed due to MappedRegionSet error: {0}")]
    RegionError(#[from] RegionError),
    #[error("Processor failed due to Scan error: {0}")]
    ScanError(#[from] ScanError),
    #[error("Processor failed due to ReportWriter error: {0}")]
    ReportError(#[from] ReportError),
}

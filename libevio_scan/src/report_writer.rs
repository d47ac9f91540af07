use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};

use super::error::ReportError;
use super::fault::FaultCatalog;

/// This is the version of the report format
const REPORT_VERSION: &str = "1.0";

/// The YAML document written for each scanned file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaultReport {
    pub version: String,
    pub source: PathBuf,
    pub clean: bool,
    pub faulty_events: usize,
    pub catalog: FaultCatalog,
}

impl FaultReport {
    pub fn new(source: &Path, catalog: &FaultCatalog) -> Self {
        Self {
            version: format!("{}:{}", env!("CARGO_PKG_NAME"), REPORT_VERSION),
            source: source.to_path_buf(),
            clean: catalog.is_clean(),
            faulty_events: catalog.faulty_event_count(),
            catalog: catalog.clone(),
        }
    }
}

/// Write the catalog of `source` as YAML to `path`, replacing any existing report
pub fn write_report(path: &Path, source: &Path, catalog: &FaultCatalog) -> Result<(), ReportError> {
    let report = FaultReport::new(source, catalog);
    let mut file = std::fs::File::create(path)?;
    file.write_all(serde_yaml::to_string(&report)?.as_bytes())?;
    spdlog::info!("Wrote fault report to {}", path.to_string_lossy());
    Ok(())
}

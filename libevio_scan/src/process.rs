use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::config::Config;
use super::driver::FileScanDriver;
use super::error::ProcessorError;
use super::fault::{FaultCatalog, Termination};
use super::mapped_region::MappedRegionSet;
use super::report_writer::write_report;
use super::scan_status::ScanStatus;

/// Scan a single file.
///
/// Maps the file using the configured byte order and region size, runs the full scan, logs a
/// summary and, if a report directory is configured, writes the fault report.
pub fn scan_file(
    config: &Config,
    path: &Path,
    status: &Arc<ScanStatus>,
) -> Result<FaultCatalog, ProcessorError> {
    status.reset_progress();
    let regions =
        MappedRegionSet::open_with_region_size(path, config.byte_order, config.region_size_bytes)?;
    spdlog::info!(
        "Scanning {} ({}, {} regions)...",
        path.to_string_lossy(),
        human_bytes::human_bytes(regions.total_file_size() as f64),
        regions.region_count()
    );
    let catalog = FileScanDriver::new(&regions)
        .with_status(status.clone())
        .run()?;

    if catalog.is_clean() {
        spdlog::info!("{} has no faults.", path.to_string_lossy());
    } else {
        spdlog::warn!(
            "{} has {} faulty containers holding {} faulty events.",
            path.to_string_lossy(),
            catalog.faulty_containers.len(),
            catalog.faulty_event_count()
        );
    }
    match &catalog.termination {
        Termination::Complete => (),
        Termination::Cancelled => spdlog::warn!("Scan of {} was stopped.", path.to_string_lossy()),
        Termination::Aborted(fault) => {
            spdlog::warn!("Scan of {} ended early: {fault}", path.to_string_lossy())
        }
    }

    if let Some(report_path) = config.get_report_file_name(path)? {
        write_report(&report_path, path, &catalog)?;
    }
    status.finish_file();
    Ok(catalog)
}

/// Process a subset of files. Returns the number of files found to be faulty.
pub fn process_subset(
    config: Config,
    status: Arc<ScanStatus>,
    subset: Vec<PathBuf>,
) -> Result<usize, ProcessorError> {
    let mut n_faulty = 0;
    for path in subset {
        if status.is_stop_requested() {
            spdlog::info!("Worker {} stopped.", status.worker_id());
            break;
        }
        if !path.exists() {
            spdlog::info!("File {} does not exist, skipping...", path.to_string_lossy());
            continue;
        }
        let catalog = scan_file(&config, &path, &status)?;
        if !catalog.is_clean() {
            n_faulty += 1;
        }
    }
    Ok(n_faulty)
}

/// Divide the file list in to a set of subsets (per thread/worker)
pub fn create_subsets(config: &Config) -> Vec<Vec<PathBuf>> {
    let mut subsets: Vec<Vec<PathBuf>> = vec![Vec::new(); config.n_threads.max(1) as usize];
    let n_subsets = subsets.len();

    for (idx, file) in config.files.iter().enumerate() {
        subsets[idx % n_subsets].push(file.clone())
    }

    subsets
}

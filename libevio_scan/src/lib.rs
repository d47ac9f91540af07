//! # evio_scan
//!
//! evio_scan is a structural integrity scanner for EVIO files, written in Rust. It walks every
//! block (EVIO v4) or record (EVIO v6 and HIPO) of a file, and every bank, segment and
//! tag-segment of every event inside them, and reports where the layout of the file is broken:
//! lengths that do not add up, illegal data types or padding, event counts that do not match,
//! byte swapped files, and truncated tails.
//!
//! The scanner never decodes payload data and never modifies the file. Files are memory
//! mapped in fixed size regions, so files much larger than the available memory can be
//! scanned.
//!
//! ## Installation
//!
//! Currently the only method of install is from source. If you have not used Rust before,
//! you will most likely need to install the Rust tool chain. See the
//! [Rust docs](https://www.rust-lang.org/tools/install) for installation instructions.
//!
//! To build and install the CLI use `cargo install --path ./evio_scan_cli` from the top level
//! evio_scan repository. The binary will be installed to your cargo install location
//! (typically something like `~/.cargo/bin/`).
//!
//! ## Configuration
//!
//! The YAML format of a configuration file is as follows:
//!
//! ```yml
//! files:
//!   - /data/run_0001.evio
//!   - /data/run_0002.evio
//! byte_order: big
//! region_size_bytes: 209715200
//! report_path: null
//! n_threads: 1
//! ```
//!
//! - files: The EVIO files to scan
//! - byte_order: `big` or `little`. A file opened with the wrong byte order is reported as
//! such and is not scanned further.
//! - region_size_bytes: Size of each memory mapped region. Rounded down to a whole number of
//! 32-bit words. Only affects memory use, never the result of a scan.
//! - report_path: Optional directory to which a `<file stem>.faults.yml` report is written for
//! every file scanned
//! - n_threads: The number of parallel worker threads to divide the files amongst. Must be
//! at least 1.
//!
//! ## Faults
//!
//! What the scan finds is described in three layers (see [fault]):
//!
//! - A structure fault is attached to a node of an event's bank tree. Only the first fault of
//! an event is reported, together with the event itself.
//! - A container fault is attached to a block or record. A faulty event makes its container
//! faulty and ends the scan of that container; the scan continues with the next container,
//! which is always located using the declared length of the current one.
//! - A file fault ends the scan of the file (wrong endianness, bad magic number, a container
//! whose length makes the rest of the file unreachable, trailing bytes).
//!
//! ## Output
//!
//! Alongside the optional YAML reports, a log file is written by the CLI. Log files contain
//! the details of every fault found while scanning.
//!
//! ### Word addresses
//!
//! A word can be located either by its absolute index in the file or by a
//! (region, row, column) coordinate, where every region is displayed as rows of five words
//! and columns are numbered 1 to 5 (see [address]).
pub mod address;
pub mod config;
pub mod constants;
pub mod data_type;
pub mod driver;
pub mod error;
pub mod fault;
pub mod header;
pub mod mapped_region;
pub mod node;
pub mod process;
pub mod report_writer;
pub mod scan_status;
pub mod scanner;

#[cfg(test)]
mod test_util;

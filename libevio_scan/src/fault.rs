//! Faults are data, not errors.
//!
//! Everything the scan finds wrong with a file is described by one of the values in this
//! module and handed back in a [FaultCatalog]. Only failures which make a file unscannable
//! in the first place (I/O, a file too small to hold a header) are raised as
//! [ScanError](crate::error::ScanError).
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::constants::V6_HEADER_WORDS;
use super::data_type::DataType;
use super::header::{ContainerHeader, FormatVersion};
use super::node::StructureNode;

/// A layout violation inside the bank/segment/tag-segment tree of one event
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum StructureFault {
    #[error("buffer underflow: {needed} header word(s) needed at word {position} but only {available} remain")]
    BufferUnderflow {
        position: u64,
        needed: u64,
        available: u64,
    },
    #[error("bad data type {0:#x}")]
    BadDataType(u8),
    #[error("padding mismatch: {padding} padding byte(s) not allowed for type {data_type}")]
    PaddingMismatch { data_type: DataType, padding: u8 },
    #[error("bank length of 0 words cannot hold its own header")]
    LengthTooSmall,
    #[error("length mismatch: declared data length is {declared} words but children occupy {actual} words")]
    LengthMismatch { declared: u64, actual: u64 },
    #[error("structure of {length} words extends {overrun} words past the end of its container")]
    ExceedsContainer { length: u64, overrun: u64 },
    #[error("structures nested deeper than {0} levels")]
    NestingTooDeep(usize),
}

/// A violation of a block/record header, or of the relation between a container and its events
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ContainerFault {
    #[error("bad lengths: total length of {total_words} words with a header of {header_words} words")]
    BadLengths { total_words: u32, header_words: u32 },
    #[error("negative event count {0:#x}")]
    NegativeEventCount(u32),
    #[error("declared length of {total_words} words exceeds the {remaining_words} words remaining in the file")]
    LengthExceedsFile {
        total_words: u64,
        remaining_words: u64,
    },
    #[error("event {index} at word {position} is faulty")]
    FaultyEvent { index: u32, position: u64 },
    #[error("declared {declared} events but only {found} fit in the container")]
    EventCountMismatch { declared: u32, found: u32 },
    #[error("declared {declared} events but event {found} landed on a container header at word {position}")]
    LandedOnHeader {
        declared: u32,
        found: u32,
        position: u64,
    },
    #[error("payload is {declared_bytes} bytes but events occupy {event_bytes} bytes")]
    PayloadLengthMismatch {
        declared_bytes: u64,
        event_bytes: u64,
    },
    #[error("index array of {index_bytes} bytes does not match an event count of {event_count}")]
    IndexLengthMismatch { index_bytes: u32, event_count: u32 },
    #[error("index array lists {indexed_bytes} bytes for event {index} but the event occupies {event_bytes} bytes")]
    IndexEntryMismatch {
        index: u32,
        indexed_bytes: u32,
        event_bytes: u64,
    },
    #[error("index array entry for event {index} at word {position} cannot be read")]
    IndexEntryUnreadable { index: u32, position: u64 },
    #[error("dictionary of {dictionary_words} words exceeds the {available_words} words available in the container")]
    DictionaryExceedsContainer {
        dictionary_words: u64,
        available_words: u64,
    },
}

/// A condition which stops the scan of the whole file
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum FileFault {
    #[error("magic number {found:#010x} at word {position} is byte swapped, switch endianness")]
    WrongEndianness { position: u64, found: u32 },
    #[error("bad magic number {found:#010x} at word {position}, not an evio file or not a container header")]
    BadMagic { position: u64, found: u32 },
    #[error("unsupported format version {version} in header at word {position}")]
    UnsupportedVersion { position: u64, version: u8 },
    #[error("truncated header at word {position}: {needed} words needed but only {available} remain")]
    TruncatedHeader {
        position: u64,
        needed: u64,
        available: u64,
    },
    #[error("file header declares {header_words} words, less than the minimum of {min}", min = V6_HEADER_WORDS)]
    BadFileHeader { header_words: u32 },
    #[error("{count} extra byte(s) at end of file starting at byte {position}")]
    TrailingBytes { position: u64, count: u64 },
    #[error("container at word {position} declares a length of {total_words} words, the next container cannot be located")]
    UnnavigableContainer { position: u64, total_words: u32 },
}

/// How the scan of a file ended
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum Termination {
    /// Reached the exact end of the file
    #[default]
    Complete,
    /// The stop flag was raised
    Cancelled,
    /// A fault made the rest of the file unreadable
    Aborted(FileFault),
}

/// A container found faulty, with the faulty events found while scanning it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerReport {
    pub header: ContainerHeader,
    pub fault: Option<ContainerFault>,
    pub faulty_events: Vec<StructureNode>,
}

impl ContainerReport {
    pub fn new(header: ContainerHeader) -> Self {
        Self {
            header,
            fault: None,
            faulty_events: vec![],
        }
    }

    /// Record a fault against the container. The first fault recorded is kept.
    pub fn set_fault(&mut self, fault: ContainerFault) {
        if self.fault.is_none() {
            self.fault = Some(fault);
        }
    }

    pub fn is_faulty(&self) -> bool {
        self.fault.is_some() || !self.faulty_events.is_empty()
    }
}

/// The result of scanning one file
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FaultCatalog {
    pub format: Option<FormatVersion>,
    pub containers_scanned: u64,
    pub events_scanned: u64,
    pub faulty_containers: Vec<ContainerReport>,
    pub termination: Termination,
}

impl FaultCatalog {
    /// No faults anywhere and the scan reached the end of the file
    pub fn is_clean(&self) -> bool {
        self.faulty_containers.is_empty() && self.termination == Termination::Complete
    }

    pub fn faulty_event_count(&self) -> usize {
        self.faulty_containers
            .iter()
            .map(|c| c.faulty_events.len())
            .sum()
    }
}

use std::sync::Arc;

use super::constants::{
    BYTES_PER_WORD, CONTAINER_BIT_INFO_OFFSET, CONTAINER_HEADER_LENGTH_OFFSET,
    CONTAINER_MAGIC_OFFSET, MAGIC_NUMBER, V4_HEADER_WORDS, V6_HEADER_WORDS, VERSION_MASK,
};
use super::error::{RegionError, ScanError};
use super::fault::{ContainerFault, ContainerReport, FaultCatalog, FileFault, Termination};
use super::header::{check_magic, ContainerHeader, FileHeader, FormatVersion};
use super::mapped_region::MappedRegionSet;
use super::scan_status::ScanStatus;
use super::scanner::{Cancelled, StructuralScanner};

/// What to do after a container
enum Flow {
    /// Continue with the container at this word index
    Next(u64),
    Stop(Termination),
}

/// FileScanDriver walks every block (v4) or record (v6) of a file and scans every event in
/// them, building a [FaultCatalog].
///
/// Navigation from one container to the next always trusts the container's declared total
/// length, never the sum of its events, so one broken event cannot derail the rest of the
/// file. A fault in an event ends the scan of its container; the file level walk carries on.
#[derive(Debug)]
pub struct FileScanDriver<'a> {
    regions: &'a MappedRegionSet,
    status: Option<Arc<ScanStatus>>,
}

impl<'a> FileScanDriver<'a> {
    pub fn new(regions: &'a MappedRegionSet) -> Self {
        Self {
            regions,
            status: None,
        }
    }

    /// Report progress to, and observe the stop flag of, `status`
    pub fn with_status(mut self, status: Arc<ScanStatus>) -> Self {
        self.status = Some(status);
        self
    }

    /// Scan the whole file.
    ///
    /// Returns an error only if the file cannot be scanned at all. Everything else, including
    /// conditions which end the scan early, is reported in the catalog.
    pub fn run(&self) -> Result<FaultCatalog, ScanError> {
        let word_count = self.regions.word_count();
        if word_count < V4_HEADER_WORDS as u64 {
            return Err(ScanError::FileTooSmall(self.regions.total_file_size()));
        }

        let mut catalog = FaultCatalog::default();
        let mut scanner = StructuralScanner::new(self.regions);
        if let Some(status) = self.status.as_deref() {
            scanner = scanner.with_status(status);
        }

        // The first header decides both the byte order check and the layout
        let magic = self
            .regions
            .read_word_at(CONTAINER_MAGIC_OFFSET as u64)?;
        if let Err(fault) = check_magic(magic, CONTAINER_MAGIC_OFFSET as u64) {
            spdlog::error!("{fault}");
            catalog.termination = Termination::Aborted(fault);
            return Ok(catalog);
        }
        let version = (self
            .regions
            .read_word_at(CONTAINER_BIT_INFO_OFFSET as u64)?
            & VERSION_MASK) as u8;
        let Some(format) = FormatVersion::from_version(version) else {
            let fault = FileFault::UnsupportedVersion {
                position: 0,
                version,
            };
            spdlog::error!("{fault}");
            catalog.termination = Termination::Aborted(fault);
            return Ok(catalog);
        };
        catalog.format = Some(format);
        spdlog::info!(
            "Scanning {format} file of {} ({})",
            human_bytes::human_bytes(self.regions.total_file_size() as f64),
            self.regions.byte_order()
        );

        let mut position = match format {
            FormatVersion::V4 => 0,
            FormatVersion::V6 => match self.skip_file_header()? {
                Flow::Next(first_record) => first_record,
                Flow::Stop(termination) => {
                    catalog.termination = termination;
                    return Ok(catalog);
                }
            },
        };

        let mut container_index: u64 = 0;
        while position < word_count {
            if self.is_stop_requested() {
                spdlog::info!("Scan stopped at word {position}");
                catalog.termination = Termination::Cancelled;
                break;
            }
            self.report_progress(position, word_count);
            let flow =
                self.scan_container(&mut scanner, &mut catalog, format, position, container_index)?;
            match flow {
                Flow::Next(next) => position = next,
                Flow::Stop(termination) => {
                    catalog.termination = termination;
                    break;
                }
            }
            container_index += 1;
        }

        let extra_bytes = self.regions.extra_bytes();
        if catalog.termination == Termination::Complete && extra_bytes > 0 {
            catalog.termination = Termination::Aborted(FileFault::TrailingBytes {
                position: word_count * BYTES_PER_WORD,
                count: extra_bytes,
            });
        }
        if let Termination::Aborted(fault) = &catalog.termination {
            spdlog::error!("Scan aborted: {fault}");
        }
        self.report_progress(word_count, word_count);
        spdlog::info!(
            "Scanned {} containers and {} events, found {} faulty containers",
            catalog.containers_scanned,
            catalog.events_scanned,
            catalog.faulty_containers.len()
        );
        Ok(catalog)
    }

    /// Skip the v6 file header, its index array and its user header
    fn skip_file_header(&self) -> Result<Flow, ScanError> {
        let word_count = self.regions.word_count();
        if word_count < V6_HEADER_WORDS as u64 {
            return Ok(Flow::Stop(Termination::Aborted(
                FileFault::TruncatedHeader {
                    position: 0,
                    needed: V6_HEADER_WORDS as u64,
                    available: word_count,
                },
            )));
        }
        let header = FileHeader::decode_v6(&self.read_words(0)?, self.regions.byte_order());
        if header.header_words < V6_HEADER_WORDS {
            return Ok(Flow::Stop(Termination::Aborted(FileFault::BadFileHeader {
                header_words: header.header_words,
            })));
        }
        let occupied = header.occupied_words();
        if occupied > word_count {
            return Ok(Flow::Stop(Termination::Aborted(
                FileFault::TruncatedHeader {
                    position: 0,
                    needed: occupied,
                    available: word_count,
                },
            )));
        }
        spdlog::info!(
            "{} file header: file number {}, {} records declared, trailer at byte {}",
            if header.is_hipo() { "HIPO" } else { "EVIO" },
            header.file_number,
            header.record_count,
            header.trailer_position
        );
        Ok(Flow::Next(occupied))
    }

    fn scan_container(
        &self,
        scanner: &mut StructuralScanner,
        catalog: &mut FaultCatalog,
        format: FormatVersion,
        position: u64,
        container_index: u64,
    ) -> Result<Flow, ScanError> {
        let word_count = self.regions.word_count();
        let remaining = word_count - position;
        let min_header_words = format.min_header_words();
        if remaining < min_header_words as u64 {
            return Ok(Flow::Stop(Termination::Aborted(
                FileFault::TruncatedHeader {
                    position,
                    needed: min_header_words as u64,
                    available: remaining,
                },
            )));
        }

        let header = match format {
            FormatVersion::V4 => ContainerHeader::decode_v4(&self.read_words(position)?, position),
            FormatVersion::V6 => {
                ContainerHeader::decode_v6_record(&self.read_words(position)?, position)
            }
        };
        if let Err(fault) = check_magic(header.magic, position + CONTAINER_MAGIC_OFFSET as u64) {
            return Ok(Flow::Stop(Termination::Aborted(fault)));
        }
        catalog.containers_scanned += 1;
        let mut report = ContainerReport::new(header.clone());

        // Without a usable total length there is no way to find the next container
        if header.total_words < min_header_words || header.total_words as u64 > remaining {
            report.set_fault(if header.total_words < min_header_words {
                ContainerFault::BadLengths {
                    total_words: header.total_words,
                    header_words: header.header_words,
                }
            } else {
                ContainerFault::LengthExceedsFile {
                    total_words: header.total_words as u64,
                    remaining_words: remaining,
                }
            });
            Self::file_report(catalog, report);
            return Ok(Flow::Stop(Termination::Aborted(
                FileFault::UnnavigableContainer {
                    position,
                    total_words: header.total_words,
                },
            )));
        }
        let next = header.end();

        // Index and user header of a compressed record live inside the compressed data
        if header.header_words < min_header_words
            || (!header.is_compressed() && header.data_offset_words() > header.total_words as u64)
        {
            report.set_fault(ContainerFault::BadLengths {
                total_words: header.total_words,
                header_words: header.header_words,
            });
        } else if header.event_count_is_negative() {
            report.set_fault(ContainerFault::NegativeEventCount(header.event_count));
        } else {
            let first_container = container_index == 0;
            let outcome = self.scan_events(
                scanner,
                &header,
                first_container,
                &mut report,
                &mut catalog.events_scanned,
            );
            if outcome.is_err() {
                Self::file_report(catalog, report);
                return Ok(Flow::Stop(Termination::Cancelled));
            }
        }

        if FormatVersion::from_version(header.version()) != Some(format) {
            spdlog::warn!(
                "Container {} at word {position} has version {} in a {format} file",
                header.number,
                header.version()
            );
        }
        if header.is_last() && next < word_count {
            spdlog::warn!(
                "Container {} at word {position} is marked last but {} words follow",
                header.number,
                word_count - next
            );
        }
        Self::file_report(catalog, report);
        Ok(Flow::Next(next))
    }

    /// Scan the events of one container, recording faults in `report`.
    ///
    /// Stops at the first fault: past it, the positions of further events cannot be trusted.
    fn scan_events(
        &self,
        scanner: &mut StructuralScanner,
        header: &ContainerHeader,
        first_container: bool,
        report: &mut ContainerReport,
        events_scanned: &mut u64,
    ) -> Result<(), Cancelled> {
        if header.layout == FormatVersion::V6 && header.is_trailer() {
            return Ok(());
        }
        if header.is_compressed() {
            // True event sizes are not observable without decompressing
            spdlog::debug!(
                "Skipping {:?} compressed record {} at word {}",
                header.compression,
                header.number,
                header.position
            );
            return Ok(());
        }

        let end = header.end();
        let mut cursor = header.position + header.data_offset_words();
        let mut event_bytes: u64 = 0;

        if header.layout == FormatVersion::V4 && first_container && header.has_dictionary() {
            let available = end.saturating_sub(cursor);
            let dictionary_words = match self.regions.read_word_at(cursor) {
                Ok(length) => length as u64 + 1,
                Err(_) => available + 1,
            };
            if dictionary_words > available {
                report.set_fault(ContainerFault::DictionaryExceedsContainer {
                    dictionary_words,
                    available_words: available,
                });
                return Ok(());
            }
            cursor += dictionary_words;
            event_bytes += dictionary_words * BYTES_PER_WORD;
        }

        let index_start = if header.layout == FormatVersion::V6 && header.index_bytes > 0 {
            if header.index_bytes as u64 != header.event_count as u64 * BYTES_PER_WORD {
                report.set_fault(ContainerFault::IndexLengthMismatch {
                    index_bytes: header.index_bytes,
                    event_count: header.event_count,
                });
                return Ok(());
            }
            Some(header.position + header.header_words as u64)
        } else {
            None
        };

        for index in 0..header.event_count {
            let length_word = match self.regions.read_word_at(cursor) {
                Ok(word) if end.saturating_sub(cursor) >= 2 => word,
                _ => {
                    report.set_fault(ContainerFault::EventCountMismatch {
                        declared: header.event_count,
                        found: index,
                    });
                    return Ok(());
                }
            };
            if let Some(faulty) = scanner.scan_event(cursor, end)? {
                // A container header read as a bank does not parse
                if self.lands_on_header(cursor, header.layout) {
                    report.set_fault(ContainerFault::LandedOnHeader {
                        declared: header.event_count,
                        found: index,
                        position: cursor,
                    });
                    return Ok(());
                }
                *events_scanned += 1;
                spdlog::warn!("Faulty event {index} in container {}: {}", header.number, faulty);
                report.set_fault(ContainerFault::FaultyEvent {
                    index,
                    position: cursor,
                });
                report.faulty_events.push(faulty);
                return Ok(());
            }
            *events_scanned += 1;

            let event_words = length_word as u64 + 1;
            if let Some(index_start) = index_start {
                if let Some(fault) =
                    self.check_index_entry(index_start, index, event_words * BYTES_PER_WORD)
                {
                    report.set_fault(fault);
                    return Ok(());
                }
            }
            cursor += event_words;
            event_bytes += event_words * BYTES_PER_WORD;
        }

        let declared_bytes = header.payload_bytes();
        if event_bytes != declared_bytes {
            report.set_fault(ContainerFault::PayloadLengthMismatch {
                declared_bytes,
                event_bytes,
            });
        }
        Ok(())
    }

    /// An event position which looks exactly like the start of a container header means the
    /// declared event count was wrong
    fn lands_on_header(&self, position: u64, layout: FormatVersion) -> bool {
        let magic = self
            .regions
            .read_word_at(position + CONTAINER_MAGIC_OFFSET as u64);
        let header_words = self
            .regions
            .read_word_at(position + CONTAINER_HEADER_LENGTH_OFFSET as u64);
        matches!(
            (magic, header_words),
            (Ok(MAGIC_NUMBER), Ok(words)) if words == layout.min_header_words()
        )
    }

    /// Compare the index array entry of event `index` with the bytes the event occupies
    fn check_index_entry(
        &self,
        index_start: u64,
        index: u32,
        event_bytes: u64,
    ) -> Option<ContainerFault> {
        let position = index_start + index as u64;
        match self.regions.read_word_at(position) {
            Ok(indexed_bytes) if indexed_bytes as u64 == event_bytes => None,
            Ok(indexed_bytes) => Some(ContainerFault::IndexEntryMismatch {
                index,
                indexed_bytes,
                event_bytes,
            }),
            Err(_) => Some(ContainerFault::IndexEntryUnreadable { index, position }),
        }
    }

    fn file_report(catalog: &mut FaultCatalog, report: ContainerReport) {
        if report.is_faulty() {
            if let Some(fault) = &report.fault {
                spdlog::warn!(
                    "Container {} at word {}: {fault}",
                    report.header.number,
                    report.header.position
                );
            }
            catalog.faulty_containers.push(report);
        }
    }

    fn read_words<const N: usize>(&self, position: u64) -> Result<[u32; N], RegionError> {
        let mut words = [0u32; N];
        for (offset, word) in words.iter_mut().enumerate() {
            *word = self.regions.read_word_at(position + offset as u64)?;
        }
        Ok(words)
    }

    fn is_stop_requested(&self) -> bool {
        self.status
            .as_ref()
            .is_some_and(|status| status.is_stop_requested())
    }

    fn report_progress(&self, position: u64, word_count: u64) {
        if let Some(status) = &self.status {
            status.set_progress((position * 100 / word_count.max(1)) as u8);
        }
    }
}

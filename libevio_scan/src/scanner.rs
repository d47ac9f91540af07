use super::constants::{CANCEL_POLL_INTERVAL, MAX_NESTING_DEPTH};
use super::data_type::StructureKind;
use super::fault::StructureFault;
use super::header::{decode_bank, decode_segment, decode_tag_segment, validate_type_and_padding};
use super::mapped_region::MappedRegionSet;
use super::node::StructureNode;
use super::scan_status::ScanStatus;

/// Returned when the stop flag was observed in the middle of a scan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

/// StructuralScanner walks the bank/segment/tag-segment tree of one event at a time.
///
/// The walk is a depth first descent. Each header is decoded and validated on the way down;
/// on the way back up, the words occupied by the children of a container are compared with
/// the container's declared data length. The first fault found anywhere in the tree ends the
/// walk: a broken length usually invalidates everything after it, so there is nothing useful
/// left to find in that event.
#[derive(Debug)]
pub struct StructuralScanner<'a> {
    regions: &'a MappedRegionSet,
    status: Option<&'a ScanStatus>,
    word_count: u64,
    headers_visited: u64,
    until_poll: u64,
}

impl<'a> StructuralScanner<'a> {
    pub fn new(regions: &'a MappedRegionSet) -> Self {
        Self {
            regions,
            status: None,
            word_count: regions.word_count(),
            headers_visited: 0,
            until_poll: CANCEL_POLL_INTERVAL,
        }
    }

    /// Observe the stop flag of `status` while walking
    pub fn with_status(mut self, status: &'a ScanStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Scan the event (top-level bank) starting at word `position`.
    ///
    /// `limit` is the word index one past the end of the enclosing container; the event must
    /// fit before it. Returns None if the event is sound. Otherwise returns the event node
    /// with its fault set; if the fault belongs to a descendant, that descendant is attached as
    /// the event's `fault_child`.
    pub fn scan_event(
        &mut self,
        position: u64,
        limit: u64,
    ) -> Result<Option<StructureNode>, Cancelled> {
        self.check_stop()?;
        let limit = limit.min(self.word_count);
        let event = match self.read_node(StructureKind::Bank, position, limit) {
            Ok(node) => node,
            Err(underflow) => return Ok(Some(underflow)),
        };
        if let Some(fault) = Self::check_node(&event) {
            return Ok(Some(event.with_fault(fault)));
        }
        if event.end() > limit {
            let fault = StructureFault::ExceedsContainer {
                length: event.total_words(),
                overrun: event.end() - limit,
            };
            return Ok(Some(event.with_fault(fault)));
        }

        match self.descend(&event, 1)? {
            None => Ok(None),
            Some(faulty) if faulty.position == event.position => Ok(Some(faulty)),
            Some(faulty) => {
                let mut event = event;
                event.fault = faulty.fault.clone();
                event.fault_child = Some(Box::new(faulty));
                Ok(Some(event))
            }
        }
    }

    /// Number of headers decoded so far by this scanner
    pub fn headers_visited(&self) -> u64 {
        self.headers_visited
    }

    /// Walk the children of a container node. Returns the first faulty node found.
    fn descend(
        &mut self,
        parent: &StructureNode,
        depth: usize,
    ) -> Result<Option<StructureNode>, Cancelled> {
        let Some(child_kind) = parent.child_kind() else {
            return Ok(None);
        };
        if depth > MAX_NESTING_DEPTH {
            let fault = StructureFault::NestingTooDeep(MAX_NESTING_DEPTH);
            return Ok(Some(parent.clone().with_fault(fault)));
        }

        let header_words = child_kind.header_words();
        let end = parent.data_pos + parent.data_len;
        let mut cursor = parent.data_pos;
        let mut consumed: u64 = 0;
        while end.saturating_sub(cursor) >= header_words {
            self.poll_stop()?;
            let child = match self.read_node(child_kind, cursor, self.word_count) {
                Ok(node) => node,
                Err(underflow) => return Ok(Some(underflow)),
            };
            if let Some(fault) = Self::check_node(&child) {
                return Ok(Some(child.with_fault(fault)));
            }
            if let Some(faulty) = self.descend(&child, depth + 1)? {
                return Ok(Some(faulty));
            }
            consumed += child.total_words();
            cursor += child.total_words();
        }

        // Every child parsed, so any disagreement is the parent's
        if consumed != parent.data_len {
            let fault = StructureFault::LengthMismatch {
                declared: parent.data_len,
                actual: consumed,
            };
            return Ok(Some(parent.clone().with_fault(fault)));
        }
        Ok(None)
    }

    /// Read and decode the header at `position`. A header which does not fit before `limit`
    /// comes back as an underflow node.
    fn read_node(
        &mut self,
        kind: StructureKind,
        position: u64,
        limit: u64,
    ) -> Result<StructureNode, StructureNode> {
        let available = limit.saturating_sub(position);
        if available < kind.header_words() {
            return Err(StructureNode::underflow(kind, position, available));
        }
        let word = |index: u64| {
            self.regions
                .read_word_at(index)
                .map_err(|_| StructureNode::underflow(kind, position, available))
        };
        let fields = match kind {
            StructureKind::Bank => decode_bank(word(position)?, word(position + 1)?),
            StructureKind::Segment => decode_segment(word(position)?),
            StructureKind::TagSegment => decode_tag_segment(word(position)?),
        };
        self.headers_visited += 1;
        Ok(StructureNode::new(kind, position, fields))
    }

    fn check_node(node: &StructureNode) -> Option<StructureFault> {
        if let Err(fault) = validate_type_and_padding(node.raw_type, node.padding) {
            return Some(fault);
        }
        if node.kind == StructureKind::Bank && node.length == 0 {
            return Some(StructureFault::LengthTooSmall);
        }
        None
    }

    fn check_stop(&self) -> Result<(), Cancelled> {
        match self.status {
            Some(status) if status.is_stop_requested() => Err(Cancelled),
            _ => Ok(()),
        }
    }

    /// Check the stop flag once every `CANCEL_POLL_INTERVAL` child headers
    fn poll_stop(&mut self) -> Result<(), Cancelled> {
        self.until_poll -= 1;
        if self.until_poll == 0 {
            self.until_poll = CANCEL_POLL_INTERVAL;
            return self.check_stop();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_type::DataType;
    use crate::mapped_region::WordOrder;
    use crate::test_util::*;

    fn scan_words(words: &[u32], region_bytes: usize) -> Option<StructureNode> {
        let file = write_words(words, WordOrder::Big);
        let regions = open_file(&file, WordOrder::Big, region_bytes);
        let mut scanner = StructuralScanner::new(&regions);
        scanner
            .scan_event(0, words.len() as u64)
            .expect("nothing requested a stop")
    }

    #[test]
    fn test_valid_nested_event() {
        let event = nested_event();
        assert_eq!(scan_words(&event, 1024), None);
    }

    #[test]
    fn test_region_size_does_not_matter() {
        let mut event = nested_event();
        // break the int32 segment's type: 0x3f is not a data type
        let int32_segment = 2 + 2 + 2;
        event[int32_segment] = (event[int32_segment] & 0xff00_ffff) | (0x3f << 16);
        let reference = scan_words(&event, 1 << 20);
        assert!(reference.is_some());
        for region_bytes in [4, 8, 12, 20, 36] {
            assert_eq!(scan_words(&event, region_bytes), reference);
        }
        assert_eq!(scan_words(&nested_event(), 12), None);
    }

    #[test]
    fn test_deep_fault_is_attached_to_event() {
        let mut event = nested_event();
        let int32_segment = 6;
        event[int32_segment] = (event[int32_segment] & 0xff00_ffff) | (0x3f << 16);
        let faulty = scan_words(&event, 1024).unwrap();
        assert_eq!(faulty.position, 0);
        assert_eq!(faulty.fault, Some(StructureFault::BadDataType(0x3f)));
        let child = faulty.fault_child.as_ref().unwrap();
        assert_eq!(child.position, int32_segment as u64);
        assert_eq!(child.kind, StructureKind::Segment);
        assert_eq!(child.fault, Some(StructureFault::BadDataType(0x3f)));
        assert_eq!(faulty.faulty_node().position, int32_segment as u64);
    }

    #[test]
    fn test_padding_mismatch_on_event() {
        // uint32 data with one padding byte
        let event = bank_raw(1, (1 << 6) | DataType::Uint32.raw(), 0, &[1, 2]);
        let faulty = scan_words(&event, 1024).unwrap();
        assert_eq!(
            faulty.fault,
            Some(StructureFault::PaddingMismatch {
                data_type: DataType::Uint32,
                padding: 1
            })
        );
        assert!(faulty.fault_child.is_none());
    }

    #[test]
    fn test_children_shorter_than_parent() {
        // one 3-word child bank plus a stray word
        let mut children = bank(2, DataType::Uint32, 0, &[5]);
        children.push(0);
        let event = bank(1, DataType::Bank, 0, &children);
        let faulty = scan_words(&event, 1024).unwrap();
        assert_eq!(faulty.position, 0);
        assert_eq!(
            faulty.fault,
            Some(StructureFault::LengthMismatch {
                declared: 4,
                actual: 3
            })
        );
        assert!(faulty.fault_child.is_none());
    }

    #[test]
    fn test_child_length_overruns_parent() {
        let segments = [
            segment(1, DataType::Uint32, &[1, 2]),
            segment(2, DataType::Uint32, &[3]),
        ]
        .concat();
        let mut event = bank(1, DataType::Segment, 0, &segments);
        // first segment now claims 3 words, swallowing the second segment's header
        event[2] = (event[2] & 0xffff_0000) | 3;
        // the second segment's payload word then decodes as an unknown32 segment of 3 words
        let faulty = scan_words(&event, 1024).unwrap();
        assert_eq!(
            faulty.fault,
            Some(StructureFault::LengthMismatch {
                declared: 5,
                actual: 8
            })
        );
    }

    #[test]
    fn test_nested_container_mismatch_is_blamed_on_nested_parent() {
        // inner bank of banks: one 3-word bank plus a stray word
        let inner = bank(
            3,
            DataType::Bank,
            0,
            &[bank(4, DataType::Uint32, 0, &[9]), vec![0]].concat(),
        );
        let event = bank(1, DataType::Bank, 0, &inner);
        let faulty = scan_words(&event, 1024).unwrap();
        assert_eq!(faulty.position, 0);
        let child = faulty.fault_child.unwrap();
        assert_eq!(child.position, 2);
        assert_eq!(
            child.fault,
            Some(StructureFault::LengthMismatch {
                declared: 4,
                actual: 3
            })
        );
    }

    #[test]
    fn test_stray_word_read_as_header() {
        let inner = bank(
            3,
            DataType::Segment,
            0,
            &[segment(1, DataType::Uint32, &[1]), vec![0xffff_ffff]].concat(),
        );
        let event = bank(1, DataType::Bank, 0, &inner);
        let faulty = scan_words(&event, 1024).unwrap();
        let child = faulty.fault_child.unwrap();
        assert_eq!(child.position, 6);
        assert_eq!(child.fault, Some(StructureFault::BadDataType(0x3f)));
    }

    #[test]
    fn test_buffer_underflow() {
        let file = write_words(&[1], WordOrder::Big);
        let regions = open_file(&file, WordOrder::Big, 1024);
        let mut scanner = StructuralScanner::new(&regions);
        let faulty = scanner.scan_event(0, 10).unwrap().unwrap();
        assert_eq!(
            faulty.fault,
            Some(StructureFault::BufferUnderflow {
                position: 0,
                needed: 2,
                available: 1
            })
        );
    }

    #[test]
    fn test_event_overruns_container() {
        let event = vec![5, (1 << 16) | (0x10 << 8), 2, 1 << 8];
        let file = write_words(&event, WordOrder::Big);
        let regions = open_file(&file, WordOrder::Big, 1024);
        let mut scanner = StructuralScanner::new(&regions);
        let faulty = scanner.scan_event(0, 100).unwrap().unwrap();
        assert_eq!(
            faulty.fault,
            Some(StructureFault::ExceedsContainer {
                length: 6,
                overrun: 2
            })
        );
    }

    #[test]
    fn test_child_header_past_end_of_file() {
        // the event fits, but its child bank of banks claims 10 words
        let event = vec![3, (1 << 16) | (0x10 << 8), 10, (2 << 16) | (0x10 << 8)];
        let file = write_words(&event, WordOrder::Big);
        let regions = open_file(&file, WordOrder::Big, 1024);
        let mut scanner = StructuralScanner::new(&regions);
        let faulty = scanner.scan_event(0, 4).unwrap().unwrap();
        let child = faulty.fault_child.unwrap();
        assert_eq!(child.position, 4);
        assert_eq!(
            child.fault,
            Some(StructureFault::BufferUnderflow {
                position: 4,
                needed: 2,
                available: 0
            })
        );
    }

    #[test]
    fn test_zero_length_bank() {
        let event = vec![0, (1 << 16) | (0x1 << 8)];
        let faulty = scan_words(&event, 1024).unwrap();
        assert_eq!(faulty.fault, Some(StructureFault::LengthTooSmall));
    }

    #[test]
    fn test_nesting_guard() {
        let handle = std::thread::Builder::new()
            .stack_size(64 * 1024 * 1024)
            .spawn(|| {
                let mut event = bank(1, DataType::Uint32, 0, &[]);
                for _ in 0..=MAX_NESTING_DEPTH {
                    event = bank(1, DataType::Bank, 0, &event);
                }
                scan_words(&event, 1024)
            })
            .unwrap();
        let faulty = handle.join().unwrap().unwrap();
        let deepest = faulty.faulty_node();
        assert_eq!(
            deepest.fault,
            Some(StructureFault::NestingTooDeep(MAX_NESTING_DEPTH))
        );
        assert_eq!(deepest.position, 2 * MAX_NESTING_DEPTH as u64);
    }

    #[test]
    fn test_stop_is_observed() {
        let children = vec![(1 << 24) | (0x1 << 16); CANCEL_POLL_INTERVAL as usize + 8];
        let event = bank(1, DataType::Segment, 0, &children);
        let file = write_words(&event, WordOrder::Big);
        let regions = open_file(&file, WordOrder::Big, 1 << 20);
        let status = ScanStatus::new(0);

        let mut scanner = StructuralScanner::new(&regions).with_status(&status);
        assert_eq!(scanner.scan_event(0, event.len() as u64), Ok(None));

        status.request_stop();
        let mut scanner = StructuralScanner::new(&regions).with_status(&status);
        assert_eq!(scanner.scan_event(0, event.len() as u64), Err(Cancelled));
    }

    #[test]
    fn test_stop_is_observed_between_leaf_events() {
        let events: Vec<u32> = (0..16)
            .flat_map(|tag| bank(tag, DataType::Uint32, 0, &[tag as u32]))
            .collect();
        let file = write_words(&events, WordOrder::Big);
        let regions = open_file(&file, WordOrder::Big, 64);
        let status = ScanStatus::new(0);
        let mut scanner = StructuralScanner::new(&regions).with_status(&status);
        let limit = events.len() as u64;

        assert_eq!(scanner.scan_event(0, limit), Ok(None));
        assert_eq!(scanner.scan_event(3, limit), Ok(None));
        status.request_stop();
        assert_eq!(scanner.scan_event(6, limit), Err(Cancelled));
        assert_eq!(scanner.headers_visited(), 2);
    }

    #[test]
    fn test_poll_countdown_ignores_event_headers() {
        let file = write_words(&bank(1, DataType::Uint32, 0, &[1]), WordOrder::Big);
        let regions = open_file(&file, WordOrder::Big, 64);
        let status = ScanStatus::new(0);
        let mut scanner = StructuralScanner::new(&regions).with_status(&status);
        for _ in 0..10 {
            assert_eq!(scanner.scan_event(0, 3), Ok(None));
        }
        status.request_stop();
        for _ in 1..CANCEL_POLL_INTERVAL {
            assert_eq!(scanner.poll_stop(), Ok(()));
        }
        assert_eq!(scanner.poll_stop(), Err(Cancelled));
        assert_eq!(scanner.until_poll, CANCEL_POLL_INTERVAL);
    }
}

use serde::{Deserialize, Serialize};

use super::data_type::{DataType, StructureKind};
use super::fault::StructureFault;
use super::header::HeaderFields;

/// Header metadata of one bank, segment or tag-segment.
///
/// Nodes never hold payload data and never link to their parent, so building one for every
/// structure visited during a scan is cheap. The only tree that survives a scan is the path to
/// a fault: the event node handed back to the driver carries the deepest faulty node in
/// `fault_child`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureNode {
    pub kind: StructureKind,
    /// Absolute word index of the first header word
    pub position: u64,
    /// Declared length in words, excluding the length word itself for banks
    pub length: u32,
    pub tag: u16,
    pub num: u8,
    pub raw_type: u8,
    pub data_type: Option<DataType>,
    pub padding: u8,
    /// Absolute word index of the first data word
    pub data_pos: u64,
    /// Data length in words
    pub data_len: u64,
    pub fault: Option<StructureFault>,
    pub fault_child: Option<Box<StructureNode>>,
}

impl StructureNode {
    pub fn new(kind: StructureKind, position: u64, fields: HeaderFields) -> Self {
        let length = fields.length as u64;
        let (data_pos, data_len) = match kind {
            StructureKind::Bank => (position + 2, length.saturating_sub(1)),
            StructureKind::Segment | StructureKind::TagSegment => (position + 1, length),
        };
        Self {
            kind,
            position,
            length: fields.length,
            tag: fields.tag,
            num: fields.num,
            raw_type: fields.raw_type,
            data_type: DataType::from_raw(fields.raw_type),
            padding: fields.padding,
            data_pos,
            data_len,
            fault: None,
            fault_child: None,
        }
    }

    /// A node for a header which could not even be read
    pub fn underflow(kind: StructureKind, position: u64, available: u64) -> Self {
        Self {
            kind,
            position,
            length: 0,
            tag: 0,
            num: 0,
            raw_type: 0,
            data_type: None,
            padding: 0,
            data_pos: position,
            data_len: 0,
            fault: Some(StructureFault::BufferUnderflow {
                position,
                needed: kind.header_words(),
                available,
            }),
            fault_child: None,
        }
    }

    pub fn with_fault(mut self, fault: StructureFault) -> Self {
        self.fault = Some(fault);
        self
    }

    /// Words occupied by the whole structure, headers included
    pub fn total_words(&self) -> u64 {
        self.length as u64 + 1
    }

    /// Word index one past the end of the structure
    pub fn end(&self) -> u64 {
        self.position + self.total_words()
    }

    pub fn byte_length(&self) -> u64 {
        self.total_words() * 4
    }

    /// The kind of the children, if this node holds structures
    pub fn child_kind(&self) -> Option<StructureKind> {
        self.data_type.and_then(|dt| dt.container_kind())
    }

    pub fn is_faulty(&self) -> bool {
        self.fault.is_some()
    }

    /// The deepest node carrying the fault: the faulty descendant if there is one, else self
    pub fn faulty_node(&self) -> &StructureNode {
        match &self.fault_child {
            Some(child) => child,
            None => self,
        }
    }
}

impl std::fmt::Display for StructureNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let data_type = match self.data_type {
            Some(dt) => dt.name().to_string(),
            None => format!("{:#x}", self.raw_type),
        };
        write!(
            f,
            "{} at word {}: tag = {}, num = {}, type = {}, pad = {}, len = {}",
            self.kind, self.position, self.tag, self.num, data_type, self.padding, self.length
        )
    }
}

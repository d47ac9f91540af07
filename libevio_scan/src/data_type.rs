use serde::{Deserialize, Serialize};

/// The three nesting kinds of the structure hierarchy. They differ in header width and in
/// the widths of their header fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StructureKind {
    Bank,
    Segment,
    TagSegment,
}

impl StructureKind {
    /// Words occupied by the header of this kind
    pub fn header_words(&self) -> u64 {
        match self {
            Self::Bank => 2,
            Self::Segment | Self::TagSegment => 1,
        }
    }
}

impl std::fmt::Display for StructureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bank => write!(f, "bank"),
            Self::Segment => write!(f, "segment"),
            Self::TagSegment => write!(f, "tagsegment"),
        }
    }
}

/// Content type of a structure, as found in its header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    Unknown32,
    Uint32,
    Float32,
    CharStar8,
    Short16,
    Ushort16,
    Char8,
    Uchar8,
    Double64,
    Long64,
    Ulong64,
    Int32,
    TagSegment,
    AlsoSegment,
    AlsoBank,
    Composite,
    Bank,
    Segment,
    Hollerit,
    NValue,
}

impl DataType {
    /// Map a raw type value to a recognized data type, if there is one
    pub fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0x0 => Some(Self::Unknown32),
            0x1 => Some(Self::Uint32),
            0x2 => Some(Self::Float32),
            0x3 => Some(Self::CharStar8),
            0x4 => Some(Self::Short16),
            0x5 => Some(Self::Ushort16),
            0x6 => Some(Self::Char8),
            0x7 => Some(Self::Uchar8),
            0x8 => Some(Self::Double64),
            0x9 => Some(Self::Long64),
            0xa => Some(Self::Ulong64),
            0xb => Some(Self::Int32),
            0xc => Some(Self::TagSegment),
            0xd => Some(Self::AlsoSegment),
            0xe => Some(Self::AlsoBank),
            0xf => Some(Self::Composite),
            0x10 => Some(Self::Bank),
            0x20 => Some(Self::Segment),
            0x21 => Some(Self::Hollerit),
            0x22 => Some(Self::NValue),
            _ => None,
        }
    }

    pub fn raw(&self) -> u8 {
        match self {
            Self::Unknown32 => 0x0,
            Self::Uint32 => 0x1,
            Self::Float32 => 0x2,
            Self::CharStar8 => 0x3,
            Self::Short16 => 0x4,
            Self::Ushort16 => 0x5,
            Self::Char8 => 0x6,
            Self::Uchar8 => 0x7,
            Self::Double64 => 0x8,
            Self::Long64 => 0x9,
            Self::Ulong64 => 0xa,
            Self::Int32 => 0xb,
            Self::TagSegment => 0xc,
            Self::AlsoSegment => 0xd,
            Self::AlsoBank => 0xe,
            Self::Composite => 0xf,
            Self::Bank => 0x10,
            Self::Segment => 0x20,
            Self::Hollerit => 0x21,
            Self::NValue => 0x22,
        }
    }

    /// The kind of the children, if this type holds structures rather than data
    pub fn container_kind(&self) -> Option<StructureKind> {
        match self {
            Self::Bank | Self::AlsoBank => Some(StructureKind::Bank),
            Self::Segment | Self::AlsoSegment => Some(StructureKind::Segment),
            Self::TagSegment => Some(StructureKind::TagSegment),
            _ => None,
        }
    }

    pub fn is_container(&self) -> bool {
        self.container_kind().is_some()
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Unknown32 => "unknown32",
            Self::Uint32 => "uint32",
            Self::Float32 => "float32",
            Self::CharStar8 => "charstar8",
            Self::Short16 => "short16",
            Self::Ushort16 => "ushort16",
            Self::Char8 => "char8",
            Self::Uchar8 => "uchar8",
            Self::Double64 => "double64",
            Self::Long64 => "long64",
            Self::Ulong64 => "ulong64",
            Self::Int32 => "int32",
            Self::TagSegment => "tagsegment",
            Self::AlsoSegment => "alsosegment",
            Self::AlsoBank => "alsobank",
            Self::Composite => "composite",
            Self::Bank => "bank",
            Self::Segment => "segment",
            Self::Hollerit => "hollerit",
            Self::NValue => "nvalue",
        }
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Whether `padding` filler bytes may follow data of type `data_type`.
///
/// Only byte sized data (and composite data, which may end on any byte) can need 1 or 3
/// bytes of filler; 16-bit data may additionally need 2.
pub fn padding_is_legal(data_type: DataType, padding: u8) -> bool {
    match padding {
        0 => true,
        2 => matches!(
            data_type,
            DataType::Char8
                | DataType::Uchar8
                | DataType::Short16
                | DataType::Ushort16
                | DataType::Composite
        ),
        1 | 3 => matches!(
            data_type,
            DataType::Char8 | DataType::Uchar8 | DataType::Composite
        ),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_values_round_trip() {
        let mut recognized = 0;
        for raw in 0..=u8::MAX {
            if let Some(data_type) = DataType::from_raw(raw) {
                assert_eq!(data_type.raw(), raw);
                recognized += 1;
            }
        }
        assert_eq!(recognized, 20);
    }

    #[test]
    fn test_container_kinds() {
        assert_eq!(DataType::Bank.container_kind(), Some(StructureKind::Bank));
        assert_eq!(DataType::AlsoBank.container_kind(), Some(StructureKind::Bank));
        assert_eq!(
            DataType::AlsoSegment.container_kind(),
            Some(StructureKind::Segment)
        );
        assert_eq!(
            DataType::TagSegment.container_kind(),
            Some(StructureKind::TagSegment)
        );
        assert!(!DataType::Composite.is_container());
        assert!(!DataType::Uint32.is_container());
    }
}

use serde::{Deserialize, Serialize};

use super::constants::*;
use super::data_type::{padding_is_legal, DataType};
use super::fault::{FileFault, StructureFault};
use super::mapped_region::WordOrder;

/// The raw fields of a bank, segment or tag-segment header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderFields {
    pub length: u32,
    pub tag: u16,
    pub num: u8,
    pub raw_type: u8,
    pub padding: u8,
}

/// Split a type/padding byte into (type, padding).
///
/// A byte of exactly 0x40 is the legacy tag-segment marker: it carries no padding and takes
/// precedence over the normal 6-bit/2-bit split.
fn split_type_byte(byte: u8) -> (u8, u8) {
    if byte == LEGACY_TAG_SEGMENT_MARKER {
        (DataType::TagSegment.raw(), 0)
    } else {
        (byte & DATA_TYPE_MASK, byte >> PADDING_SHIFT)
    }
}

/// Decode the two header words of a bank: `length`, then `tag:16 | pad:2 type:6 | num:8`
pub fn decode_bank(length_word: u32, info_word: u32) -> HeaderFields {
    let (raw_type, padding) =
        split_type_byte(((info_word >> BANK_TYPE_SHIFT) & TYPE_BYTE_MASK) as u8);
    HeaderFields {
        length: length_word,
        tag: (info_word >> BANK_TAG_SHIFT) as u16,
        num: (info_word & BANK_NUM_MASK) as u8,
        raw_type,
        padding,
    }
}

/// Decode a segment header word: `tag:8 | pad:2 type:6 | len:16`
pub fn decode_segment(word: u32) -> HeaderFields {
    let (raw_type, padding) =
        split_type_byte(((word >> SEGMENT_TYPE_SHIFT) & TYPE_BYTE_MASK) as u8);
    HeaderFields {
        length: word & SHORT_LENGTH_MASK,
        tag: (word >> SEGMENT_TAG_SHIFT) as u16,
        num: 0,
        raw_type,
        padding,
    }
}

/// Decode a tag-segment header word: `tag:12 | type:4 | len:16`. There is no padding field.
pub fn decode_tag_segment(word: u32) -> HeaderFields {
    HeaderFields {
        length: word & SHORT_LENGTH_MASK,
        tag: (word >> TAG_SEGMENT_TAG_SHIFT) as u16,
        num: 0,
        raw_type: ((word >> TAG_SEGMENT_TYPE_SHIFT) & TAG_SEGMENT_TYPE_MASK) as u8,
        padding: 0,
    }
}

/// Check that the type is recognized and that the padding is legal for it
pub fn validate_type_and_padding(raw_type: u8, padding: u8) -> Result<DataType, StructureFault> {
    let data_type = DataType::from_raw(raw_type).ok_or(StructureFault::BadDataType(raw_type))?;
    if padding_is_legal(data_type, padding) {
        Ok(data_type)
    } else {
        Err(StructureFault::PaddingMismatch { data_type, padding })
    }
}

/// Verify a magic number word.
///
/// A value which is the byte-swapped magic number means the file was opened with the wrong
/// byte order; that is reported as such and never silently reinterpreted.
pub fn check_magic(word: u32, position: u64) -> Result<(), FileFault> {
    if word == MAGIC_NUMBER {
        Ok(())
    } else if word.swap_bytes() == MAGIC_NUMBER {
        Err(FileFault::WrongEndianness {
            position,
            found: word,
        })
    } else {
        Err(FileFault::BadMagic {
            position,
            found: word,
        })
    }
}

/// The two container layouts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FormatVersion {
    /// 8-word block headers
    V4,
    /// File header followed by 14-word record headers
    V6,
}

impl FormatVersion {
    pub fn from_version(version: u8) -> Option<Self> {
        match version {
            V4_VERSION => Some(Self::V4),
            V6_VERSION => Some(Self::V6),
            _ => None,
        }
    }

    /// Minimum size of a container header in words
    pub fn min_header_words(&self) -> u32 {
        match self {
            Self::V4 => V4_HEADER_WORDS,
            Self::V6 => V6_HEADER_WORDS,
        }
    }
}

impl std::fmt::Display for FormatVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::V4 => write!(f, "evio v4 (blocks)"),
            Self::V6 => write!(f, "evio v6 (records)"),
        }
    }
}

/// Compression of a v6 record's data section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CompressionType {
    #[default]
    None,
    Lz4,
    Lz4Best,
    Gzip,
    Unknown(u8),
}

impl From<u8> for CompressionType {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::None,
            1 => Self::Lz4,
            2 => Self::Lz4Best,
            3 => Self::Gzip,
            other => Self::Unknown(other),
        }
    }
}

/// A decoded block (v4) or record (v6) header. Decoded fresh for every header and never
/// modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerHeader {
    pub layout: FormatVersion,
    /// Absolute word index of the first header word
    pub position: u64,
    pub total_words: u32,
    pub header_words: u32,
    pub number: u32,
    pub event_count: u32,
    pub bit_info: u32,
    pub magic: u32,
    pub index_bytes: u32,
    pub user_header_bytes: u32,
    pub compression: CompressionType,
    pub compressed_words: u32,
    pub uncompressed_bytes: u32,
}

impl ContainerHeader {
    /// Decode an 8-word v4 block header
    pub fn decode_v4(words: &[u32; V4_HEADER_WORDS as usize], position: u64) -> Self {
        Self {
            layout: FormatVersion::V4,
            position,
            total_words: words[CONTAINER_LENGTH_OFFSET],
            header_words: words[CONTAINER_HEADER_LENGTH_OFFSET],
            number: words[CONTAINER_NUMBER_OFFSET],
            event_count: words[CONTAINER_EVENT_COUNT_OFFSET],
            bit_info: words[CONTAINER_BIT_INFO_OFFSET],
            magic: words[CONTAINER_MAGIC_OFFSET],
            index_bytes: 0,
            user_header_bytes: 0,
            compression: CompressionType::None,
            compressed_words: 0,
            uncompressed_bytes: 0,
        }
    }

    /// Decode the fixed 14 words of a v6 record header
    pub fn decode_v6_record(words: &[u32; V6_HEADER_WORDS as usize], position: u64) -> Self {
        let compression_word = words[V6_COMPRESSION_OFFSET];
        Self {
            layout: FormatVersion::V6,
            position,
            total_words: words[CONTAINER_LENGTH_OFFSET],
            header_words: words[CONTAINER_HEADER_LENGTH_OFFSET],
            number: words[CONTAINER_NUMBER_OFFSET],
            event_count: words[CONTAINER_EVENT_COUNT_OFFSET],
            bit_info: words[CONTAINER_BIT_INFO_OFFSET],
            magic: words[CONTAINER_MAGIC_OFFSET],
            index_bytes: words[V6_INDEX_LENGTH_OFFSET],
            user_header_bytes: words[V6_USER_HEADER_LENGTH_OFFSET],
            compression: CompressionType::from(
                (compression_word >> V6_COMPRESSION_TYPE_SHIFT) as u8,
            ),
            compressed_words: compression_word & V6_COMPRESSED_WORDS_MASK,
            uncompressed_bytes: words[V6_UNCOMPRESSED_LENGTH_OFFSET],
        }
    }

    pub fn version(&self) -> u8 {
        (self.bit_info & VERSION_MASK) as u8
    }

    /// For v4 the first block may carry a dictionary event which is not counted in the
    /// event count
    pub fn has_dictionary(&self) -> bool {
        match self.layout {
            FormatVersion::V4 => self.bit_info & V4_DICTIONARY_BIT != 0,
            FormatVersion::V6 => self.bit_info & V6_DICTIONARY_BIT != 0,
        }
    }

    pub fn is_last(&self) -> bool {
        match self.layout {
            FormatVersion::V4 => self.bit_info & V4_LAST_BLOCK_BIT != 0,
            FormatVersion::V6 => self.bit_info & V6_LAST_RECORD_BIT != 0,
        }
    }

    /// v4 only: event type stored in the bit-info word
    pub fn event_type(&self) -> Option<u8> {
        match self.layout {
            FormatVersion::V4 => {
                Some(((self.bit_info >> V4_EVENT_TYPE_SHIFT) & V4_EVENT_TYPE_MASK) as u8)
            }
            FormatVersion::V6 => None,
        }
    }

    /// v6 only: the header type nibble (record, file, trailer, for evio and hipo)
    pub fn header_type(&self) -> Option<u8> {
        match self.layout {
            FormatVersion::V4 => None,
            FormatVersion::V6 => Some((self.bit_info >> V6_HEADER_TYPE_SHIFT) as u8),
        }
    }

    pub fn is_trailer(&self) -> bool {
        matches!(self.header_type(), Some(3) | Some(7))
    }

    pub fn is_compressed(&self) -> bool {
        self.compression != CompressionType::None
    }

    pub fn event_count_is_negative(&self) -> bool {
        (self.event_count as i32) < 0
    }

    /// Words between the container start and its first event: the header, and for v6 the
    /// index array and the user header padded to a whole word
    pub fn data_offset_words(&self) -> u64 {
        self.header_words as u64
            + (self.index_bytes as u64).div_ceil(BYTES_PER_WORD)
            + (self.user_header_bytes as u64).div_ceil(BYTES_PER_WORD)
    }

    /// Bytes declared to be available for events
    pub fn payload_bytes(&self) -> u64 {
        (self.total_words as u64).saturating_sub(self.data_offset_words()) * BYTES_PER_WORD
    }

    /// Absolute word index one past the container
    pub fn end(&self) -> u64 {
        self.position + self.total_words as u64
    }
}

/// The v6 file header which precedes the first record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileHeader {
    pub file_type_id: u32,
    pub file_number: u32,
    pub header_words: u32,
    pub record_count: u32,
    pub index_bytes: u32,
    pub bit_info: u32,
    pub user_header_bytes: u32,
    pub magic: u32,
    pub trailer_position: u64,
}

impl FileHeader {
    /// Decode the fixed 14 words of a v6 file header.
    ///
    /// The trailer position is a 64-bit value, so its word order follows the file's byte order.
    pub fn decode_v6(words: &[u32; V6_HEADER_WORDS as usize], order: WordOrder) -> Self {
        let first = words[V6_TRAILER_POSITION_OFFSET] as u64;
        let second = words[V6_TRAILER_POSITION_OFFSET + 1] as u64;
        let trailer_position = match order {
            WordOrder::Big => (first << 32) | second,
            WordOrder::Little => (second << 32) | first,
        };
        Self {
            file_type_id: words[V6_FILE_TYPE_OFFSET],
            file_number: words[V6_FILE_NUMBER_OFFSET],
            header_words: words[CONTAINER_HEADER_LENGTH_OFFSET],
            record_count: words[V6_RECORD_COUNT_OFFSET],
            index_bytes: words[V6_INDEX_LENGTH_OFFSET],
            bit_info: words[CONTAINER_BIT_INFO_OFFSET],
            user_header_bytes: words[V6_USER_HEADER_LENGTH_OFFSET],
            magic: words[CONTAINER_MAGIC_OFFSET],
            trailer_position,
        }
    }

    pub fn is_hipo(&self) -> bool {
        self.file_type_id == HIPO_FILE_TYPE_ID
    }

    /// Words occupied by the file header, its index array and its padded user header
    pub fn occupied_words(&self) -> u64 {
        self.header_words as u64
            + (self.index_bytes as u64).div_ceil(BYTES_PER_WORD)
            + (self.user_header_bytes as u64).div_ceil(BYTES_PER_WORD)
    }
}

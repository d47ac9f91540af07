// Format constants. These are bit-exact with the EVIO v4 and EVIO v6/HIPO layouts.

/// Magic number found at word 7 of every block, record and file header
pub const MAGIC_NUMBER: u32 = 0xc0da0100;

// Container (block/record) header common word offsets
pub const CONTAINER_LENGTH_OFFSET: usize = 0;
pub const CONTAINER_NUMBER_OFFSET: usize = 1;
pub const CONTAINER_HEADER_LENGTH_OFFSET: usize = 2;
pub const CONTAINER_EVENT_COUNT_OFFSET: usize = 3;
pub const CONTAINER_BIT_INFO_OFFSET: usize = 5;
pub const CONTAINER_MAGIC_OFFSET: usize = 7;

// v4 block header
pub const V4_HEADER_WORDS: u32 = 8;
pub const V4_VERSION: u8 = 4;
pub const V4_DICTIONARY_BIT: u32 = 0x100;
pub const V4_LAST_BLOCK_BIT: u32 = 0x200;
pub const V4_EVENT_TYPE_SHIFT: u32 = 10;
pub const V4_EVENT_TYPE_MASK: u32 = 0xf;

// v6 record header
pub const V6_HEADER_WORDS: u32 = 14;
pub const V6_INDEX_LENGTH_OFFSET: usize = 4;
pub const V6_USER_HEADER_LENGTH_OFFSET: usize = 6;
pub const V6_UNCOMPRESSED_LENGTH_OFFSET: usize = 8;
pub const V6_COMPRESSION_OFFSET: usize = 9;
pub const V6_VERSION: u8 = 6;
pub const V6_DICTIONARY_BIT: u32 = 0x100;
pub const V6_LAST_RECORD_BIT: u32 = 0x200;
pub const V6_HEADER_TYPE_SHIFT: u32 = 28;
pub const V6_COMPRESSION_TYPE_SHIFT: u32 = 28;
pub const V6_COMPRESSED_WORDS_MASK: u32 = 0x0fff_ffff;

// v6 file header
pub const V6_FILE_TYPE_OFFSET: usize = 0;
pub const V6_FILE_NUMBER_OFFSET: usize = 1;
pub const V6_RECORD_COUNT_OFFSET: usize = 3;
pub const V6_TRAILER_POSITION_OFFSET: usize = 10;
pub const EVIO_FILE_TYPE_ID: u32 = 0x4556494f;
pub const HIPO_FILE_TYPE_ID: u32 = 0x4849504f;

/// Bits 0-7 of the bit-info word of every header hold the format version
pub const VERSION_MASK: u32 = 0xff;

// Bank second header word: tag:16 | type/padding:8 | num:8
pub const BANK_TAG_SHIFT: u32 = 16;
pub const BANK_TYPE_SHIFT: u32 = 8;
pub const BANK_NUM_MASK: u32 = 0xff;

// Segment header word: tag:8 | type/padding:8 | len:16
pub const SEGMENT_TAG_SHIFT: u32 = 24;
pub const SEGMENT_TYPE_SHIFT: u32 = 16;

// Tag-segment header word: tag:12 | type:4 | len:16
pub const TAG_SEGMENT_TAG_SHIFT: u32 = 20;
pub const TAG_SEGMENT_TYPE_SHIFT: u32 = 16;
pub const TAG_SEGMENT_TYPE_MASK: u32 = 0xf;

pub const SHORT_LENGTH_MASK: u32 = 0xffff;
pub const TYPE_BYTE_MASK: u32 = 0xff;
pub const DATA_TYPE_MASK: u8 = 0x3f;
pub const PADDING_SHIFT: u8 = 6;

/// A type/padding byte with only bit 6 set is the legacy tag-segment marker (no padding)
pub const LEGACY_TAG_SEGMENT_MARKER: u8 = 0x40;

/// Nominal byte size of one mapped region (200 MiB)
pub const DEFAULT_REGION_SIZE_BYTES: usize = 200 * 1024 * 1024;

pub const BYTES_PER_WORD: u64 = 4;

/// Number of data words displayed per row; column 0 and column 6 are not data columns
pub const WORDS_PER_ROW: usize = 5;
pub const FIRST_DATA_COLUMN: usize = 1;
pub const LAST_DATA_COLUMN: usize = WORDS_PER_ROW;

/// How many child headers the scanner walks between polls of the stop flag
pub const CANCEL_POLL_INTERVAL: u64 = 1 << 21;

/// Deepest structure nesting followed before a node is declared faulty
pub const MAX_NESTING_DEPTH: usize = 1000;

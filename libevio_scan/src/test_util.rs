//! Builders for small, well-formed evio files used by the unit tests
use byteorder::{BigEndian, LittleEndian, WriteBytesExt};
use std::io::Write;
use tempfile::NamedTempFile;

use crate::constants::{EVIO_FILE_TYPE_ID, MAGIC_NUMBER, V4_HEADER_WORDS, V6_HEADER_WORDS};
use crate::data_type::DataType;
use crate::mapped_region::{MappedRegionSet, WordOrder};

/// A bank with full control over the type/padding byte
pub fn bank_raw(tag: u16, type_byte: u8, num: u8, payload: &[u32]) -> Vec<u32> {
    let mut words = vec![
        payload.len() as u32 + 1,
        ((tag as u32) << 16) | ((type_byte as u32) << 8) | num as u32,
    ];
    words.extend_from_slice(payload);
    words
}

pub fn bank(tag: u16, data_type: DataType, num: u8, payload: &[u32]) -> Vec<u32> {
    bank_raw(tag, data_type.raw(), num, payload)
}

pub fn segment_raw(tag: u8, type_byte: u8, payload: &[u32]) -> Vec<u32> {
    let mut words =
        vec![((tag as u32) << 24) | ((type_byte as u32) << 16) | payload.len() as u32];
    words.extend_from_slice(payload);
    words
}

pub fn segment(tag: u8, data_type: DataType, payload: &[u32]) -> Vec<u32> {
    segment_raw(tag, data_type.raw(), payload)
}

pub fn tag_segment(tag: u16, data_type: DataType, payload: &[u32]) -> Vec<u32> {
    let mut words = vec![
        ((tag as u32) << 20) | ((data_type.raw() as u32 & 0xf) << 16) | payload.len() as u32,
    ];
    words.extend_from_slice(payload);
    words
}

/// An event exercising every structure kind:
/// bank of banks { bank of segments { char8 segment (pad 1), int32 segment },
///                 bank of tagsegments { 2 tagsegments },
///                 composite bank (pad 3), legacy 0x40 bank of tagsegments }
pub fn nested_event() -> Vec<u32> {
    let segments = [
        segment_raw(1, (1 << 6) | DataType::Char8.raw(), &[0x41424300]),
        segment(2, DataType::Int32, &[1, 2, 3]),
    ]
    .concat();
    let tag_segments = [
        tag_segment(0xabc, DataType::Uint32, &[7, 8]),
        tag_segment(0x001, DataType::Float32, &[]),
    ]
    .concat();
    let children = [
        bank(10, DataType::Segment, 1, &segments),
        bank(11, DataType::TagSegment, 2, &tag_segments),
        bank_raw(12, (3 << 6) | DataType::Composite.raw(), 3, &[0xdeadbeef, 0]),
        bank_raw(13, 0x40, 4, &tag_segment(5, DataType::Short16, &[0x00010002])),
    ]
    .concat();
    bank(1, DataType::Bank, 0, &children)
}

/// A v4 block holding `events`; `bit_info` is or-ed into the version word
pub fn v4_block(number: u32, events: &[Vec<u32>], bit_info: u32) -> Vec<u32> {
    v4_block_with_dictionary(number, &[], events, bit_info)
}

/// A v4 block whose first event is a dictionary not counted in the event count
pub fn v4_block_with_dictionary(
    number: u32,
    dictionary: &[u32],
    events: &[Vec<u32>],
    bit_info: u32,
) -> Vec<u32> {
    let event_words: usize = events.iter().map(Vec::len).sum();
    let total = V4_HEADER_WORDS as usize + dictionary.len() + event_words;
    let mut words = vec![
        total as u32,
        number,
        V4_HEADER_WORDS,
        events.len() as u32,
        0,
        4 | bit_info,
        0,
        MAGIC_NUMBER,
    ];
    words.extend_from_slice(dictionary);
    for event in events {
        words.extend_from_slice(event);
    }
    words
}

/// A v6 file header with a user header of arbitrary bytes, padded to a whole word
pub fn v6_file_header(user_header: &[u8]) -> Vec<u32> {
    let mut words = vec![
        EVIO_FILE_TYPE_ID,
        1,
        V6_HEADER_WORDS,
        0,
        0,
        6 | (1 << 28),
        user_header.len() as u32,
        MAGIC_NUMBER,
        0,
        0,
        0,
        0,
        0,
        0,
    ];
    for chunk in user_header.chunks(4) {
        let mut bytes = [0u8; 4];
        bytes[..chunk.len()].copy_from_slice(chunk);
        words.push(u32::from_be_bytes(bytes));
    }
    words
}

/// An uncompressed v6 record with an index array listing each event's byte length
pub fn v6_record(number: u32, events: &[Vec<u32>]) -> Vec<u32> {
    let event_words: usize = events.iter().map(Vec::len).sum();
    let index_words = events.len();
    let total = V6_HEADER_WORDS as usize + index_words + event_words;
    let mut words = vec![
        total as u32,
        number,
        V6_HEADER_WORDS,
        events.len() as u32,
        (index_words * 4) as u32,
        6,
        0,
        MAGIC_NUMBER,
        ((index_words + event_words) * 4) as u32,
        0,
        0,
        0,
        0,
        0,
    ];
    for event in events {
        words.push((event.len() * 4) as u32);
    }
    for event in events {
        words.extend_from_slice(event);
    }
    words
}

/// A compressed (lz4) v6 record; the data is opaque
pub fn v6_compressed_record(number: u32, event_count: u32, data: &[u32]) -> Vec<u32> {
    let mut words = vec![
        V6_HEADER_WORDS + data.len() as u32,
        number,
        V6_HEADER_WORDS,
        event_count,
        event_count * 4,
        6,
        0,
        MAGIC_NUMBER,
        data.len() as u32 * 8,
        (1 << 28) | data.len() as u32,
        0,
        0,
        0,
        0,
    ];
    words.extend_from_slice(data);
    words
}

pub fn words_to_bytes(words: &[u32], order: WordOrder) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(words.len() * 4);
    for word in words {
        match order {
            WordOrder::Big => bytes.write_u32::<BigEndian>(*word),
            WordOrder::Little => bytes.write_u32::<LittleEndian>(*word),
        }
        .expect("writing to a Vec cannot fail");
    }
    bytes
}

pub fn write_bytes(bytes: &[u8]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(bytes).unwrap();
    file.flush().unwrap();
    file
}

pub fn write_words(words: &[u32], order: WordOrder) -> NamedTempFile {
    write_bytes(&words_to_bytes(words, order))
}

pub fn open_file(file: &NamedTempFile, order: WordOrder, region_bytes: usize) -> MappedRegionSet {
    MappedRegionSet::open_with_region_size(file.path(), order, region_bytes).unwrap()
}

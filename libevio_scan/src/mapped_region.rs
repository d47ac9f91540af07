use byteorder::{BigEndian, ByteOrder, LittleEndian};
use memmap2::{Mmap, MmapOptions};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;

use super::constants::{BYTES_PER_WORD, DEFAULT_REGION_SIZE_BYTES};
use super::error::RegionError;

/// The byte order used to interpret every word of a file.
///
/// Endianness is file-global. Switching it reinterprets the already mapped bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WordOrder {
    #[default]
    Big,
    Little,
}

impl WordOrder {
    pub fn swapped(self) -> Self {
        match self {
            Self::Big => Self::Little,
            Self::Little => Self::Big,
        }
    }

    fn read_u32(self, buf: &[u8]) -> u32 {
        match self {
            Self::Big => BigEndian::read_u32(buf),
            Self::Little => LittleEndian::read_u32(buf),
        }
    }

    fn read_u16(self, buf: &[u8]) -> u16 {
        match self {
            Self::Big => BigEndian::read_u16(buf),
            Self::Little => LittleEndian::read_u16(buf),
        }
    }
}

impl std::fmt::Display for WordOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Big => write!(f, "big endian"),
            Self::Little => write!(f, "little endian"),
        }
    }
}

/// A read-only memory mapped window over `[start_byte, start_byte + len)` of a file
#[derive(Debug)]
pub struct MappedRegion {
    index: usize,
    start_byte: u64,
    map: Mmap,
}

impl MappedRegion {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn start_byte(&self) -> u64 {
        self.start_byte
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.map
    }
}

/// MappedRegionSet slices a file of arbitrary size into a series of bounded memory maps.
///
/// Files of this format routinely reach tens of gigabytes, so the file is never mapped in
/// one piece. Every region except the last one has the same, word aligned, nominal size;
/// the last region holds the remainder, including any tail bytes which do not make up a
/// full word. Words are addressed by their absolute index in the file and never straddle
/// two regions.
#[derive(Debug)]
pub struct MappedRegionSet {
    _file: File,
    regions: Vec<MappedRegion>,
    region_bytes: usize,
    file_size: u64,
    order: WordOrder,
}

impl MappedRegionSet {
    /// Map a file using the default region size
    pub fn open(path: &Path, order: WordOrder) -> Result<Self, RegionError> {
        Self::open_with_region_size(path, order, DEFAULT_REGION_SIZE_BYTES)
    }

    /// Map a file using a specific region size.
    ///
    /// The size is rounded down to a whole number of words.
    pub fn open_with_region_size(
        path: &Path,
        order: WordOrder,
        region_bytes: usize,
    ) -> Result<Self, RegionError> {
        if !path.exists() {
            return Err(RegionError::BadFilePath(path.to_path_buf()));
        }
        let aligned_bytes = region_bytes - region_bytes % BYTES_PER_WORD as usize;
        if aligned_bytes == 0 {
            return Err(RegionError::InvalidRegionSize(region_bytes));
        }

        let file = File::open(path)?;
        let file_size = file.metadata()?.len();

        let mut regions = Vec::new();
        let mut start_byte: u64 = 0;
        while start_byte < file_size {
            let len = (aligned_bytes as u64).min(file_size - start_byte) as usize;
            // The file is opened read-only and the maps are never written through
            let map = unsafe { MmapOptions::new().offset(start_byte).len(len).map(&file)? };
            regions.push(MappedRegion {
                index: regions.len(),
                start_byte,
                map,
            });
            start_byte += len as u64;
        }

        spdlog::debug!(
            "Mapped {} into {} region(s) of at most {}",
            path.display(),
            regions.len(),
            human_bytes::human_bytes(aligned_bytes as f64)
        );

        Ok(Self {
            _file: file,
            regions,
            region_bytes: aligned_bytes,
            file_size,
            order,
        })
    }

    /// Read the word at an absolute word index
    pub fn read_word_at(&self, word_index: u64) -> Result<u32, RegionError> {
        let limit = self.word_count();
        let out_of_range = RegionError::OutOfRange {
            index: word_index,
            limit,
        };
        if word_index >= limit {
            return Err(out_of_range);
        }
        let (region, offset) = self.locate_byte(word_index * BYTES_PER_WORD);
        match self
            .regions
            .get(region)
            .and_then(|r| r.map.get(offset..offset + BYTES_PER_WORD as usize))
        {
            Some(bytes) => Ok(self.order.read_u32(bytes)),
            None => Err(out_of_range),
        }
    }

    /// Read a single byte at an absolute byte index. Tail bytes are reachable this way.
    pub fn read_byte_at(&self, byte_index: u64) -> Result<u8, RegionError> {
        let (region, offset) = self.locate_byte(byte_index);
        self.regions
            .get(region)
            .and_then(|r| r.map.get(offset))
            .copied()
            .ok_or(RegionError::OutOfRange {
                index: byte_index,
                limit: self.file_size,
            })
    }

    /// Read a 16-bit value starting at an absolute byte index.
    ///
    /// The two bytes may live in different regions when the index is odd.
    pub fn read_short_at(&self, byte_index: u64) -> Result<u16, RegionError> {
        let bytes = [
            self.read_byte_at(byte_index)?,
            self.read_byte_at(byte_index + 1)?,
        ];
        Ok(self.order.read_u16(&bytes))
    }

    /// Table-view flavored read: anything past the end of the file reads as zero.
    ///
    /// The scanner must never use this, running out of data is a fault there.
    pub fn word_or_zero(&self, word_index: u64) -> u32 {
        self.read_word_at(word_index).unwrap_or(0)
    }

    /// Change how all subsequent reads are interpreted. Nothing is remapped.
    ///
    /// Requires exclusive access, so no decoded value borrowed from this set can outlive
    /// the switch.
    pub fn set_byte_order(&mut self, order: WordOrder) {
        if order != self.order {
            spdlog::info!("Switching byte order to {order}");
        }
        self.order = order;
    }

    pub fn byte_order(&self) -> WordOrder {
        self.order
    }

    pub fn region_count(&self) -> usize {
        self.regions.len()
    }

    /// Actual byte size of region `index`
    pub fn region_size(&self, index: usize) -> Option<usize> {
        self.regions.get(index).map(MappedRegion::len)
    }

    pub fn region(&self, index: usize) -> Option<&MappedRegion> {
        self.regions.get(index)
    }

    /// Nominal byte size of every region but the last
    pub fn region_bytes(&self) -> usize {
        self.region_bytes
    }

    pub fn total_file_size(&self) -> u64 {
        self.file_size
    }

    /// Number of complete words in the file
    pub fn word_count(&self) -> u64 {
        self.file_size / BYTES_PER_WORD
    }

    /// Number of bytes at the end of the file which do not make up a full word
    pub fn extra_bytes(&self) -> u64 {
        self.file_size % BYTES_PER_WORD
    }

    fn locate_byte(&self, byte_index: u64) -> (usize, usize) {
        let region_bytes = self.region_bytes as u64;
        (
            (byte_index / region_bytes) as usize,
            (byte_index % region_bytes) as usize,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn file_with_bytes(bytes: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(bytes).unwrap();
        file.flush().unwrap();
        file
    }

    const BYTES: [u8; 10] = [0x01, 0x02, 0x03, 0x04, 0xc0, 0xda, 0x01, 0x00, 0xaa, 0xbb];

    #[test]
    fn test_regions_split_file() {
        let file = file_with_bytes(&BYTES);
        let set = MappedRegionSet::open_with_region_size(file.path(), WordOrder::Big, 4).unwrap();
        assert_eq!(set.region_count(), 3);
        assert_eq!(set.region_size(0), Some(4));
        assert_eq!(set.region_size(1), Some(4));
        assert_eq!(set.region_size(2), Some(2));
        assert_eq!(set.region_size(3), None);
        assert_eq!(set.region(2).unwrap().start_byte(), 8);
        assert_eq!(set.total_file_size(), 10);
        assert_eq!(set.word_count(), 2);
        assert_eq!(set.extra_bytes(), 2);
    }

    #[test]
    fn test_region_size_rounds_to_words() {
        let file = file_with_bytes(&BYTES);
        let set = MappedRegionSet::open_with_region_size(file.path(), WordOrder::Big, 7).unwrap();
        assert_eq!(set.region_bytes(), 4);
        assert!(matches!(
            MappedRegionSet::open_with_region_size(file.path(), WordOrder::Big, 3),
            Err(RegionError::InvalidRegionSize(3))
        ));
    }

    #[test]
    fn test_read_words_both_orders() {
        let file = file_with_bytes(&BYTES);
        let mut set =
            MappedRegionSet::open_with_region_size(file.path(), WordOrder::Big, 4).unwrap();
        assert_eq!(set.read_word_at(0).unwrap(), 0x01020304);
        assert_eq!(set.read_word_at(1).unwrap(), 0xc0da0100);

        set.set_byte_order(WordOrder::Little);
        assert_eq!(set.byte_order(), WordOrder::Little);
        assert_eq!(set.read_word_at(0).unwrap(), 0x04030201);
        assert_eq!(set.read_word_at(1).unwrap(), 0x0001dac0);
    }

    #[test]
    fn test_read_past_end() {
        let file = file_with_bytes(&BYTES);
        let set = MappedRegionSet::open(file.path(), WordOrder::Big).unwrap();
        assert_eq!(set.region_count(), 1);
        assert!(matches!(
            set.read_word_at(2),
            Err(RegionError::OutOfRange { index: 2, limit: 2 })
        ));
        assert_eq!(set.word_or_zero(2), 0);
        assert_eq!(set.word_or_zero(1), 0xc0da0100);
        assert!(set.read_byte_at(10).is_err());
    }

    #[test]
    fn test_sub_word_access() {
        let file = file_with_bytes(&BYTES);
        let set = MappedRegionSet::open_with_region_size(file.path(), WordOrder::Big, 8).unwrap();
        assert_eq!(set.read_byte_at(9).unwrap(), 0xbb);
        assert_eq!(set.read_short_at(8).unwrap(), 0xaabb);
        // straddles the boundary between region 0 and region 1
        assert_eq!(set.read_short_at(7).unwrap(), 0x00aa);
        assert!(set.read_short_at(9).is_err());
    }

    #[test]
    fn test_empty_and_missing_files() {
        let file = file_with_bytes(&[]);
        let set = MappedRegionSet::open(file.path(), WordOrder::Big).unwrap();
        assert_eq!(set.region_count(), 0);
        assert_eq!(set.word_count(), 0);
        assert!(set.read_word_at(0).is_err());

        let missing = Path::new("/definitely/not/a/real/file.evio");
        assert!(matches!(
            MappedRegionSet::open(missing, WordOrder::Big),
            Err(RegionError::BadFilePath(_))
        ));
    }
}

use serde::{Deserialize, Serialize};

use super::constants::{BYTES_PER_WORD, FIRST_DATA_COLUMN, LAST_DATA_COLUMN, WORDS_PER_ROW};
use super::mapped_region::MappedRegionSet;

/// A word's position as seen by a tabular view of the file: region, row within the region
/// and data column within the row (1 to 5). Columns 0 and 6 are reserved for row labels and
/// comments, so they never address data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WordAddress {
    pub region: usize,
    pub row: usize,
    pub column: usize,
}

impl std::fmt::Display for WordAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "region {}, row {}, column {}",
            self.region, self.row, self.column
        )
    }
}

/// Converts between absolute word indices and [WordAddress] coordinates.
///
/// Pure arithmetic, parameterized by the nominal region size and the number of words in the
/// file. The two directions are exact inverses over every valid word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressTranslator {
    words_per_region: u64,
    word_count: u64,
}

impl AddressTranslator {
    /// `region_bytes` is expected to be word aligned, as produced by [MappedRegionSet]
    pub fn new(region_bytes: usize, word_count: u64) -> Self {
        Self {
            words_per_region: (region_bytes as u64 / BYTES_PER_WORD).max(1),
            word_count,
        }
    }

    pub fn for_regions(regions: &MappedRegionSet) -> Self {
        Self::new(regions.region_bytes(), regions.word_count())
    }

    /// Returns None if the word is beyond the last valid word of the file
    pub fn to_coordinate(&self, word_index: u64) -> Option<WordAddress> {
        if word_index >= self.word_count {
            return None;
        }
        let local = word_index % self.words_per_region;
        Some(WordAddress {
            region: (word_index / self.words_per_region) as usize,
            row: (local / WORDS_PER_ROW as u64) as usize,
            column: (local % WORDS_PER_ROW as u64) as usize + FIRST_DATA_COLUMN,
        })
    }

    /// Returns None for reserved columns and coordinates which address no word in the file
    pub fn to_word_index(&self, address: &WordAddress) -> Option<u64> {
        if !(FIRST_DATA_COLUMN..=LAST_DATA_COLUMN).contains(&address.column) {
            return None;
        }
        let local =
            (address.row * WORDS_PER_ROW + address.column - FIRST_DATA_COLUMN) as u64;
        if local >= self.words_per_region {
            return None;
        }
        let word_index = address.region as u64 * self.words_per_region + local;
        if word_index < self.word_count {
            Some(word_index)
        } else {
            None
        }
    }

    /// Number of words held by region `index`; zero past the last region
    pub fn words_in_region(&self, index: usize) -> u64 {
        let start = index as u64 * self.words_per_region;
        self.word_count
            .saturating_sub(start)
            .min(self.words_per_region)
    }

    /// Number of (possibly partial) rows needed to display region `index`
    pub fn rows_in_region(&self, index: usize) -> u64 {
        self.words_in_region(index).div_ceil(WORDS_PER_ROW as u64)
    }

    pub fn words_per_region(&self) -> u64 {
        self.words_per_region
    }

    /// The word displayed at `address`, or 0 if the coordinate addresses no word
    pub fn word_at(&self, regions: &MappedRegionSet, address: &WordAddress) -> u32 {
        self.to_word_index(address)
            .map_or(0, |word_index| regions.word_or_zero(word_index))
    }
}

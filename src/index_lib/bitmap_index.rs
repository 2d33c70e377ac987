use crate::error::{IndexResult, PhraseIndexError};
use crate::index_lib::array_index::PhraseArrayLevel;
use crate::index_lib::length_index::PhraseLengthIndex;
use crate::memory_chunk::{to_table_offset, write_u32_le, MemoryChunk, SharedChunk};
use crate::phrase_tokens::{PhraseToken, PhraseTokens, SearchFlags, Ucs4};
use crate::MAX_PHRASE_LENGTH;

/// Number of buckets in the top level of the index.
pub const PHRASE_NUMBER_OF_BITMAP_INDEX: usize = 256;

/// Size of the stored bucket table: one offset per bucket plus the trailing end.
pub const BITMAP_TABLE_SIZE: usize = (PHRASE_NUMBER_OF_BITMAP_INDEX + 1) * 4;

/// Bucket of a phrase starting with `first`.
///
/// Uses bits 8–15 of the first code point: BMP text puts most of its entropy
/// there. The formula is part of the file format and must not change.
///
/// ```
/// use phrase_large_table::PhraseBitmapIndex;
///
/// assert_eq!(PhraseBitmapIndex::bucket_of(0x4F60), 0x4F);
/// assert_eq!(PhraseBitmapIndex::bucket_of(0x4F00), 0x4F);
/// assert_eq!(PhraseBitmapIndex::bucket_of(0x2_4F60), 0x4F);
/// ```
#[inline]
pub const fn bucket_of(first: Ucs4) -> usize {
    ((first & 0xFF00) >> 8) as usize
}

/// Top level of the phrase index: 256 length tables selected by [`bucket_of`].
///
/// Buckets are created on first insert and only released by [`reset`](Self::reset).
///
/// # Stored layout
/// ```text
/// [256 × bucket_offset: u32] [end: u32] [length blocks in bucket order...]
/// ```
/// An offset of `0` marks an absent bucket (a real block always starts after the
/// table). A present bucket's block spans up to the next present bucket's offset,
/// the last one up to `end`.
///
/// # Example
/// ```
/// use phrase_large_table::{PhraseBitmapIndex, PhraseTokens, SearchFlags};
///
/// let mut index = PhraseBitmapIndex::new();
/// let ni: Vec<u32> = "你".chars().map(u32::from).collect();
/// index.add_index(&ni, 0x0000_0001).unwrap();
///
/// let mut tokens = PhraseTokens::all_enabled();
/// assert_eq!(index.search(&ni, &mut tokens), SearchFlags::OK);
/// assert_eq!(tokens.get(0), Some(&[1][..]));
/// ```
#[derive(Debug)]
pub struct PhraseBitmapIndex {
    buckets: Vec<Option<PhraseLengthIndex>>,
}

impl Default for PhraseBitmapIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl PhraseBitmapIndex {
    pub fn new() -> Self {
        Self {
            buckets: std::iter::repeat_with(|| None)
                .take(PHRASE_NUMBER_OF_BITMAP_INDEX)
                .collect(),
        }
    }

    /// See the free function [`bucket_of`].
    #[inline]
    pub const fn bucket_of(first: Ucs4) -> usize {
        bucket_of(first)
    }

    /// Releases every bucket.
    pub fn reset(&mut self) {
        for bucket in self.buckets.iter_mut() {
            *bucket = None;
        }
    }

    /// Total records in the index.
    pub fn len(&self) -> usize {
        self.buckets.iter().flatten().map(PhraseLengthIndex::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of buckets that have been created.
    pub fn bucket_count(&self) -> usize {
        self.buckets.iter().flatten().count()
    }

    pub fn bucket(&self, bucket: usize) -> Option<&PhraseLengthIndex> {
        self.buckets.get(bucket)?.as_ref()
    }

    /// Looks up `phrase` and appends matching tokens to the enabled sinks.
    ///
    /// The empty phrase matches nothing.
    pub fn search(&self, phrase: &[Ucs4], tokens: &mut PhraseTokens) -> SearchFlags {
        let Some(&first) = phrase.first() else {
            return SearchFlags::NONE;
        };

        match &self.buckets[bucket_of(first)] {
            Some(length_index) => length_index.search(phrase, tokens),
            None => SearchFlags::NONE,
        }
    }

    pub fn add_index(&mut self, phrase: &[Ucs4], token: PhraseToken) -> IndexResult<()> {
        if phrase.len() >= MAX_PHRASE_LENGTH {
            return Err(PhraseIndexError::PhraseTooLong(phrase.len()));
        }
        let Some(&first) = phrase.first() else {
            return Err(PhraseIndexError::EmptyPhrase);
        };

        self.buckets[bucket_of(first)]
            .get_or_insert_with(PhraseLengthIndex::new)
            .add_index(phrase, token)
    }

    pub fn remove_index(&mut self, phrase: &[Ucs4], token: PhraseToken) -> IndexResult<()> {
        let Some(&first) = phrase.first() else {
            return Err(PhraseIndexError::EmptyPhrase);
        };

        match &mut self.buckets[bucket_of(first)] {
            Some(length_index) => length_index.remove_index(phrase, token),
            None if phrase.len() >= MAX_PHRASE_LENGTH => {
                Err(PhraseIndexError::PhraseTooLong(phrase.len()))
            }
            None => Err(PhraseIndexError::ItemNotFound),
        }
    }

    /// Every record, in bucket, then length, then key order.
    pub fn records(&self) -> Vec<(Vec<Ucs4>, PhraseToken)> {
        let mut out = Vec::with_capacity(self.len());
        for length_index in self.buckets.iter().flatten() {
            for phrase_length in 1..=length_index.max_length() {
                if let Some(array) = length_index.array(phrase_length) {
                    out.extend(array.records());
                }
            }
        }
        out
    }

    pub(crate) fn bucket_mut(&mut self, bucket: usize) -> &mut PhraseLengthIndex {
        self.buckets[bucket].get_or_insert_with(PhraseLengthIndex::new)
    }

    /// Rebuilds the index from the block stored at `[offset, end)` of `chunk`.
    ///
    /// Every offset is validated before it is followed. On failure the index is
    /// left empty.
    pub fn load(&mut self, chunk: &SharedChunk, offset: usize, end: usize) -> IndexResult<()> {
        self.reset();
        let result = self.load_buckets(chunk, offset, end);
        if result.is_err() {
            self.reset();
        }
        result
    }

    fn load_buckets(&mut self, chunk: &SharedChunk, offset: usize, end: usize) -> IndexResult<()> {
        let table_end = match offset.checked_add(BITMAP_TABLE_SIZE) {
            Some(table_end) if table_end <= end => table_end,
            _ => {
                return Err(PhraseIndexError::corrupted(format!(
                    "bitmap table at {} does not fit before {}",
                    offset, end
                )))
            }
        };

        let table = chunk.read(offset, BITMAP_TABLE_SIZE)?;
        let offsets: Vec<usize> = table
            .chunks_exact(4)
            .map(|w| crate::memory_chunk::read_u32_le(w) as usize)
            .collect();
        let stored_end = offsets[PHRASE_NUMBER_OF_BITMAP_INDEX];
        if stored_end != end {
            return Err(PhraseIndexError::corrupted(format!(
                "bitmap block at {} ends at {}, expected {}",
                offset, stored_end, end
            )));
        }

        let present: Vec<(usize, usize)> = offsets[..PHRASE_NUMBER_OF_BITMAP_INDEX]
            .iter()
            .enumerate()
            .filter(|&(_, &start)| start != 0)
            .map(|(bucket, &start)| (bucket, start))
            .collect();

        for (i, &(bucket, start)) in present.iter().enumerate() {
            let bucket_end = present.get(i + 1).map_or(end, |&(_, next)| next);
            if start < table_end || start > bucket_end || bucket_end > end {
                return Err(PhraseIndexError::corrupted(format!(
                    "bucket {:#04x} spans [{}, {}) outside [{}, {})",
                    bucket, start, bucket_end, table_end, end
                )));
            }

            let mut length_index = PhraseLengthIndex::new();
            length_index.load(chunk, start, bucket_end)?;
            self.buckets[bucket] = Some(length_index);
        }

        Ok(())
    }

    /// Writes the whole index at `offset` and returns the new end.
    pub fn store(&self, chunk: &mut MemoryChunk, offset: usize) -> IndexResult<usize> {
        let mut table = Vec::with_capacity(BITMAP_TABLE_SIZE);
        let mut cursor = offset + BITMAP_TABLE_SIZE;
        chunk.set_content(offset, &[0u8; BITMAP_TABLE_SIZE]);

        for bucket in &self.buckets {
            match bucket {
                Some(length_index) => {
                    write_u32_le(&mut table, to_table_offset(cursor)?);
                    cursor = length_index.store(chunk, cursor)?;
                }
                None => write_u32_le(&mut table, 0),
            }
        }
        write_u32_le(&mut table, to_table_offset(cursor)?);
        chunk.set_content(offset, &table);

        Ok(cursor)
    }
}

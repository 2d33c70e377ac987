//! Sorted fixed-width record runs, one per phrase length.
//!
//! [`PhraseArrayIndex<L>`] stores records `(key: [Ucs4; L], token)` as a flat run
//! of little-endian words, sorted by key. The in-memory layout is the on-disk
//! layout, so `load` just keeps a [`ChunkSlice`] onto the shared buffer and the
//! run is only copied out the first time it is mutated.
//!
//! The length index owns these through the object-safe [`PhraseArrayLevel`]
//! trait; [`new_array_index`] maps a runtime length to the matching `L`.

use std::cmp::Ordering;
use std::fmt;
use std::ops::Range;

use crate::error::{IndexResult, PhraseIndexError};
use crate::memory_chunk::{read_u32_le, ChunkSlice, MemoryChunk, SharedChunk};
use crate::phrase_tokens::{PhraseToken, PhraseTokens, SearchFlags, Ucs4};
use crate::MAX_PHRASE_LENGTH;

/// Byte width of one record for keys of `phrase_length` code points.
#[inline]
pub const fn record_width(phrase_length: usize) -> usize {
    (phrase_length + 1) * 4
}

/// Uniform handle over array indexes of any key length.
pub trait PhraseArrayLevel: fmt::Debug + Send + Sync {
    /// Key length served by this array.
    fn phrase_length(&self) -> usize;

    /// Number of records.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Appends every token stored under `phrase` to its library's sink.
    ///
    /// `phrase.len()` must equal [`phrase_length`](Self::phrase_length).
    fn search(&self, phrase: &[Ucs4], tokens: &mut PhraseTokens) -> SearchFlags;

    fn add_index(&mut self, phrase: &[Ucs4], token: PhraseToken) -> IndexResult<()>;

    fn remove_index(&mut self, phrase: &[Ucs4], token: PhraseToken) -> IndexResult<()>;

    /// Views `[offset, end)` of `chunk` as this array's record run.
    fn load(&mut self, chunk: &SharedChunk, offset: usize, end: usize) -> IndexResult<()>;

    /// Writes the record run at `offset` and returns the new end.
    fn store(&self, chunk: &mut MemoryChunk, offset: usize) -> IndexResult<usize>;

    /// Replaces the contents with `records`, which must already be sorted by key.
    fn assign_sorted(&mut self, records: &[(Box<[Ucs4]>, PhraseToken)]);

    /// Decoded copy of all records in storage order.
    fn records(&self) -> Vec<(Vec<Ucs4>, PhraseToken)>;

    /// Whether keys are in non-decreasing order.
    fn is_sorted(&self) -> bool;
}

#[derive(Debug, Clone)]
enum RecordRun {
    Owned(Vec<u8>),
    Mapped(ChunkSlice),
}

/// Sorted run of `(key[L], token)` records.
#[derive(Debug, Clone)]
pub struct PhraseArrayIndex<const L: usize> {
    run: RecordRun,
}

impl<const L: usize> Default for PhraseArrayIndex<L> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const L: usize> PhraseArrayIndex<L> {
    const WIDTH: usize = record_width(L);

    pub fn new() -> Self {
        debug_assert!((1..=MAX_PHRASE_LENGTH).contains(&L));
        Self {
            run: RecordRun::Owned(Vec::new()),
        }
    }

    #[inline]
    fn bytes(&self) -> &[u8] {
        match &self.run {
            RecordRun::Owned(v) => v,
            RecordRun::Mapped(view) => view,
        }
    }

    /// Copies a mapped run out of the shared buffer before the first write.
    fn bytes_mut(&mut self) -> &mut Vec<u8> {
        if let RecordRun::Mapped(view) = &self.run {
            self.run = RecordRun::Owned(view.to_vec());
        }
        match &mut self.run {
            RecordRun::Owned(v) => v,
            RecordRun::Mapped(_) => unreachable!("mapped run was just copied"),
        }
    }

    #[inline]
    fn count(&self) -> usize {
        self.bytes().len() / Self::WIDTH
    }

    #[inline]
    fn record(&self, i: usize) -> &[u8] {
        &self.bytes()[i * Self::WIDTH..(i + 1) * Self::WIDTH]
    }

    #[inline]
    fn token_at(&self, i: usize) -> PhraseToken {
        read_u32_le(&self.record(i)[L * 4..])
    }

    /// Element-wise comparison of the stored key of `record` against `key`.
    fn compare_key(record: &[u8], key: &[Ucs4; L]) -> Ordering {
        for (word, &k) in record.chunks_exact(4).zip(key.iter()) {
            match read_u32_le(word).cmp(&k) {
                Ordering::Equal => continue,
                other => return other,
            }
        }
        Ordering::Equal
    }

    /// First index in `0..count` for which `pred` is false; `pred` must be monotone.
    fn partition_point(&self, mut pred: impl FnMut(&[u8]) -> bool) -> usize {
        let (mut lo, mut hi) = (0, self.count());
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if pred(self.record(mid)) {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        lo
    }

    fn equal_range(&self, key: &[Ucs4; L]) -> Range<usize> {
        let lower = self.partition_point(|r| Self::compare_key(r, key) == Ordering::Less);
        let upper = self.partition_point(|r| Self::compare_key(r, key) != Ordering::Greater);
        lower..upper.max(lower)
    }

    fn encode(key: &[Ucs4], token: PhraseToken, out: &mut Vec<u8>) {
        for &c in key {
            out.extend_from_slice(&c.to_le_bytes());
        }
        out.extend_from_slice(&token.to_le_bytes());
    }

    fn as_key(phrase: &[Ucs4]) -> &[Ucs4; L] {
        match phrase.try_into() {
            Ok(key) => key,
            Err(_) => panic!(
                "phrase of length {} routed to array index of length {}",
                phrase.len(),
                L
            ),
        }
    }
}

impl<const L: usize> PhraseArrayLevel for PhraseArrayIndex<L> {
    fn phrase_length(&self) -> usize {
        L
    }

    fn len(&self) -> usize {
        self.count()
    }

    fn search(&self, phrase: &[Ucs4], tokens: &mut PhraseTokens) -> SearchFlags {
        let key = Self::as_key(phrase);
        let mut result = SearchFlags::NONE;

        for i in self.equal_range(key) {
            // disabled libraries are filtered out here
            if tokens.push(self.token_at(i)) {
                result |= SearchFlags::OK;
            }
        }

        result
    }

    fn add_index(&mut self, phrase: &[Ucs4], token: PhraseToken) -> IndexResult<()> {
        let key = Self::as_key(phrase);
        let at = self.equal_range(key).end * Self::WIDTH;

        let mut record = Vec::with_capacity(Self::WIDTH);
        Self::encode(key, token, &mut record);
        self.bytes_mut().splice(at..at, record);
        Ok(())
    }

    fn remove_index(&mut self, phrase: &[Ucs4], token: PhraseToken) -> IndexResult<()> {
        let key = Self::as_key(phrase);
        let pos = self
            .equal_range(key)
            .find(|&i| self.token_at(i) == token)
            .ok_or(PhraseIndexError::ItemNotFound)?;

        let start = pos * Self::WIDTH;
        self.bytes_mut().drain(start..start + Self::WIDTH);
        Ok(())
    }

    fn load(&mut self, chunk: &SharedChunk, offset: usize, end: usize) -> IndexResult<()> {
        if end < offset || (end - offset) % Self::WIDTH != 0 {
            return Err(PhraseIndexError::corrupted(format!(
                "array of length {} spans [{}, {}), not a whole number of {}-byte records",
                L,
                offset,
                end,
                Self::WIDTH
            )));
        }
        self.run = RecordRun::Mapped(chunk.slice(offset, end)?);
        Ok(())
    }

    fn store(&self, chunk: &mut MemoryChunk, offset: usize) -> IndexResult<usize> {
        let bytes = self.bytes();
        chunk.set_content(offset, bytes);
        Ok(offset + bytes.len())
    }

    fn assign_sorted(&mut self, records: &[(Box<[Ucs4]>, PhraseToken)]) {
        let mut run = Vec::with_capacity(records.len() * Self::WIDTH);
        for (key, token) in records {
            assert_eq!(key.len(), L, "record key length mismatch");
            Self::encode(key, *token, &mut run);
        }
        self.run = RecordRun::Owned(run);
        debug_assert!(self.is_sorted(), "assign_sorted given unsorted records");
    }

    fn records(&self) -> Vec<(Vec<Ucs4>, PhraseToken)> {
        self.bytes()
            .chunks_exact(Self::WIDTH)
            .map(|r| {
                let key = r[..L * 4].chunks_exact(4).map(read_u32_le).collect();
                (key, read_u32_le(&r[L * 4..]))
            })
            .collect()
    }

    fn is_sorted(&self) -> bool {
        (1..self.count()).all(|i| {
            let prev = self.record(i - 1);
            let cur = self.record(i);
            let prev_key: Vec<Ucs4> = prev[..L * 4].chunks_exact(4).map(read_u32_le).collect();
            let cur_key: Vec<Ucs4> = cur[..L * 4].chunks_exact(4).map(read_u32_le).collect();
            prev_key <= cur_key
        })
    }
}

macro_rules! array_index_for_length {
    ($len:expr; $($n:literal),+ $(,)?) => {
        match $len {
            $( $n => Box::new(PhraseArrayIndex::<$n>::new()) as Box<dyn PhraseArrayLevel>, )+
            other => panic!("no array index for phrase length {}", other),
        }
    };
}

/// Creates an empty array index for keys of `phrase_length` code points.
///
/// # Panics
/// If `phrase_length` is outside `1..=MAX_PHRASE_LENGTH`; callers check the bound first.
pub fn new_array_index(phrase_length: usize) -> Box<dyn PhraseArrayLevel> {
    array_index_for_length!(phrase_length; 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16)
}

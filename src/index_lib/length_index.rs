use crate::error::{IndexResult, PhraseIndexError};
use crate::index_lib::array_index::{new_array_index, PhraseArrayLevel};
use crate::memory_chunk::{to_table_offset, MemoryChunk, SharedChunk};
use crate::phrase_tokens::{PhraseToken, PhraseTokens, SearchFlags, Ucs4};
use crate::MAX_PHRASE_LENGTH;

/// Size of one `(length: u8, array_offset: u32)` entry in a stored length block.
const LENGTH_ENTRY_SIZE: usize = 1 + 4;

/// Second level of the phrase index: one optional array per phrase length.
///
/// Slot `i` holds the array for phrases of `i + 1` code points. The table only
/// grows; its length is the longest phrase length ever inserted (or loaded), which
/// drives the [`SearchFlags::CONTINUED`] signal.
///
/// # Stored layout
/// ```text
/// [count: u32] [count × (length: u8, array_offset: u32)] [end: u32] [array runs...]
/// ```
/// Entries are in ascending length; array `i` spans up to the next entry's
/// offset, the last one up to `end`. Absent slots are not written.
#[derive(Debug, Default)]
pub struct PhraseLengthIndex {
    arrays: Vec<Option<Box<dyn PhraseArrayLevel>>>,
}

impl PhraseLengthIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Longest phrase length this table has a slot for.
    #[inline]
    pub fn max_length(&self) -> usize {
        self.arrays.len()
    }

    /// Total records across all lengths.
    pub fn len(&self) -> usize {
        self.arrays.iter().flatten().map(|a| a.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Array serving `phrase_length`, if one has been created.
    pub fn array(&self, phrase_length: usize) -> Option<&dyn PhraseArrayLevel> {
        let slot = self.arrays.get(phrase_length.checked_sub(1)?)?;
        slot.as_deref()
    }

    pub fn search(&self, phrase: &[Ucs4], tokens: &mut PhraseTokens) -> SearchFlags {
        let phrase_length = phrase.len();
        let mut result = SearchFlags::NONE;

        if phrase_length == 0 || self.arrays.len() < phrase_length {
            return result;
        }
        if self.arrays.len() > phrase_length {
            result |= SearchFlags::CONTINUED;
        }

        match self.array(phrase_length) {
            Some(array) => result | array.search(phrase, tokens),
            None => result,
        }
    }

    pub fn add_index(&mut self, phrase: &[Ucs4], token: PhraseToken) -> IndexResult<()> {
        let phrase_length = phrase.len();
        if phrase_length >= MAX_PHRASE_LENGTH {
            return Err(PhraseIndexError::PhraseTooLong(phrase_length));
        }
        if phrase_length == 0 {
            return Err(PhraseIndexError::EmptyPhrase);
        }

        self.slot_mut(phrase_length).add_index(phrase, token)
    }

    pub fn remove_index(&mut self, phrase: &[Ucs4], token: PhraseToken) -> IndexResult<()> {
        let phrase_length = phrase.len();
        if phrase_length >= MAX_PHRASE_LENGTH {
            return Err(PhraseIndexError::PhraseTooLong(phrase_length));
        }
        if phrase_length == 0 {
            return Err(PhraseIndexError::EmptyPhrase);
        }

        match self.arrays.get_mut(phrase_length - 1) {
            Some(Some(array)) => array.remove_index(phrase, token),
            _ => Err(PhraseIndexError::ItemNotFound),
        }
    }

    /// Replaces the array for `phrase_length` with already sorted `records`.
    pub(crate) fn assign_sorted(&mut self, phrase_length: usize, records: &[(Box<[Ucs4]>, PhraseToken)]) {
        self.slot_mut(phrase_length).assign_sorted(records);
    }

    fn slot_mut(&mut self, phrase_length: usize) -> &mut Box<dyn PhraseArrayLevel> {
        if self.arrays.len() < phrase_length {
            self.arrays.resize_with(phrase_length, || None);
        }
        self.arrays[phrase_length - 1].get_or_insert_with(|| new_array_index(phrase_length))
    }

    pub fn load(&mut self, chunk: &SharedChunk, offset: usize, end: usize) -> IndexResult<()> {
        self.arrays.clear();

        let count = chunk.read_u32(offset)? as usize;
        if count > MAX_PHRASE_LENGTH {
            return Err(PhraseIndexError::corrupted(format!(
                "length block at {} claims {} slots",
                offset, count
            )));
        }
        let header_len = 4 + count * LENGTH_ENTRY_SIZE + 4;
        let header_end = match offset.checked_add(header_len) {
            Some(header_end) if header_end <= end => header_end,
            _ => {
                return Err(PhraseIndexError::corrupted(format!(
                    "length block header of {} bytes at {} overruns its range end {}",
                    header_len, offset, end
                )))
            }
        };
        let entries_at = offset + 4;
        let trailer_at = header_end - 4;
        let stored_end = chunk.read_u32(trailer_at)? as usize;
        if stored_end != end {
            return Err(PhraseIndexError::corrupted(format!(
                "length block at {} ends at {}, expected {}",
                offset, stored_end, end
            )));
        }

        let mut entries = Vec::with_capacity(count);
        for i in 0..count {
            let at = entries_at + i * LENGTH_ENTRY_SIZE;
            let length = chunk.read_u8(at)? as usize;
            let start = chunk.read_u32(at + 1)? as usize;
            entries.push((length, start));
        }

        let mut prev_length = 0;
        for (i, &(length, start)) in entries.iter().enumerate() {
            if length == 0 || length > MAX_PHRASE_LENGTH || length <= prev_length {
                return Err(PhraseIndexError::corrupted(format!(
                    "bad length tag {} after {} in length block at {}",
                    length, prev_length, offset
                )));
            }
            prev_length = length;

            let array_end = entries.get(i + 1).map_or(end, |&(_, next)| next);
            if start < header_end || start > array_end || array_end > end {
                return Err(PhraseIndexError::corrupted(format!(
                    "array of length {} spans [{}, {}) outside [{}, {})",
                    length, start, array_end, header_end, end
                )));
            }

            let mut array = new_array_index(length);
            array.load(chunk, start, array_end)?;
            self.arrays.resize_with(length, || None);
            self.arrays[length - 1] = Some(array);
        }

        Ok(())
    }

    /// Writes this block at `offset` and returns the new end.
    pub fn store(&self, chunk: &mut MemoryChunk, offset: usize) -> IndexResult<usize> {
        let present: Vec<(usize, &dyn PhraseArrayLevel)> = self
            .arrays
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_deref().map(|a| (i + 1, a)))
            .collect();

        let entries_at = offset + 4;
        let trailer_at = entries_at + present.len() * LENGTH_ENTRY_SIZE;
        chunk.set_content(offset, &(present.len() as u32).to_le_bytes());

        let mut cursor = trailer_at + 4;
        for (i, (length, array)) in present.iter().enumerate() {
            let at = entries_at + i * LENGTH_ENTRY_SIZE;
            chunk.set_content(at, &[*length as u8]);
            chunk.set_content(at + 1, &to_table_offset(cursor)?.to_le_bytes());
            cursor = array.store(chunk, cursor)?;
        }
        chunk.set_content(trailer_at, &to_table_offset(cursor)?.to_le_bytes());

        Ok(cursor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn continued_only_below_max_length() {
        let mut index = PhraseLengthIndex::new();
        index.add_index(&[0x4F60, 0x597D], 1).unwrap();
        index.add_index(&[0x4F60, 0x597D, 0x5417, 0x3F], 2).unwrap();

        let mut tokens = PhraseTokens::all_enabled();
        let flags = index.search(&[0x4F60, 0x597D], &mut tokens);
        assert_eq!(flags, SearchFlags::OK | SearchFlags::CONTINUED);

        let flags = index.search(&[0x4F60, 0x597D, 0x5417, 0x3F], &mut tokens);
        assert_eq!(flags, SearchFlags::OK);

        // no array at length 3, but longer ones exist
        let flags = index.search(&[0x4F60, 0x597D, 0x5417], &mut tokens);
        assert_eq!(flags, SearchFlags::CONTINUED);

        // longer than anything stored
        let flags = index.search(&[1, 2, 3, 4, 5], &mut tokens);
        assert_eq!(flags, SearchFlags::NONE);
    }

    #[test]
    fn empty_key_finds_nothing() {
        let mut index = PhraseLengthIndex::new();
        index.add_index(&[1, 2], 1).unwrap();
        let mut tokens = PhraseTokens::all_enabled();
        assert_eq!(index.search(&[], &mut tokens), SearchFlags::NONE);
    }

    #[test]
    fn offsets_near_usize_max_are_rejected() {
        let shared = SharedChunk::from(vec![0u8; 16]);
        let mut loaded = PhraseLengthIndex::new();
        for offset in [usize::MAX - 2, usize::MAX - 4] {
            let err = loaded.load(&shared, offset, usize::MAX).unwrap_err();
            assert!(matches!(err, PhraseIndexError::CorruptedTable(_)));
        }
        // a header that fits the buffer but not the given range
        let err = loaded.load(&shared, 0, 4).unwrap_err();
        assert!(matches!(err, PhraseIndexError::CorruptedTable(_)));
    }

    #[test]
    fn length_bound_is_checked_first() {
        let mut index = PhraseLengthIndex::new();
        let too_long = [1u32; MAX_PHRASE_LENGTH];
        assert_eq!(
            index.add_index(&too_long, 1),
            Err(PhraseIndexError::PhraseTooLong(MAX_PHRASE_LENGTH))
        );
        assert_eq!(
            index.remove_index(&too_long, 1),
            Err(PhraseIndexError::PhraseTooLong(MAX_PHRASE_LENGTH))
        );
        assert_eq!(index.max_length(), 0);

        let longest = [1u32; MAX_PHRASE_LENGTH - 1];
        index.add_index(&longest, 1).unwrap();
        assert_eq!(index.max_length(), MAX_PHRASE_LENGTH - 1);
    }

    #[test]
    fn remove_without_slot_is_not_found() {
        let mut index = PhraseLengthIndex::new();
        index.add_index(&[1, 2, 3], 1).unwrap();
        assert_eq!(index.remove_index(&[1, 2], 1), Err(PhraseIndexError::ItemNotFound));
        assert_eq!(index.remove_index(&[1, 2, 3, 4], 1), Err(PhraseIndexError::ItemNotFound));
        assert_eq!(index.remove_index(&[1, 2, 3], 1), Ok(()));
    }

    #[test]
    fn store_skips_absent_slots() {
        let mut index = PhraseLengthIndex::new();
        index.add_index(&[7], 1).unwrap();
        index.add_index(&[7, 8, 9], 2).unwrap();

        let mut chunk = MemoryChunk::new();
        let end = index.store(&mut chunk, 0).unwrap();
        let header = 4 + 2 * LENGTH_ENTRY_SIZE + 4;
        assert_eq!(end, header + 8 + 16);

        let shared = chunk.into_shared();
        assert_eq!(shared.read_u32(0).unwrap(), 2);
        assert_eq!(shared.read_u8(4).unwrap(), 1);
        assert_eq!(shared.read_u8(4 + LENGTH_ENTRY_SIZE).unwrap(), 3);

        let mut loaded = PhraseLengthIndex::new();
        loaded.load(&shared, 0, end).unwrap();
        assert_eq!(loaded.max_length(), 3);
        assert!(loaded.array(2).is_none());
        assert_eq!(loaded.len(), 2);
    }

    #[test]
    fn load_rejects_descending_lengths() {
        let mut a = PhraseLengthIndex::new();
        a.add_index(&[7], 1).unwrap();
        a.add_index(&[7, 8], 2).unwrap();
        let mut chunk = MemoryChunk::new();
        let end = a.store(&mut chunk, 0).unwrap();

        // swap the two length tags
        chunk.set_content(4, &[2]);
        chunk.set_content(4 + LENGTH_ENTRY_SIZE, &[1]);
        let mut loaded = PhraseLengthIndex::new();
        let err = loaded.load(&chunk.into_shared(), 0, end).unwrap_err();
        assert!(matches!(err, PhraseIndexError::CorruptedTable(_)));
    }
}

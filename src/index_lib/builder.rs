use rayon::prelude::*;
use rustc_hash::FxHashMap;

use crate::debug_note;
use crate::index_lib::bitmap_index::{bucket_of, PhraseBitmapIndex};
use crate::phrase_tokens::{PhraseToken, Ucs4};
use crate::MAX_PHRASE_LENGTH;

type RecordGroup = Vec<(Box<[Ucs4]>, PhraseToken)>;

impl PhraseBitmapIndex {
    /// Builds an index from `(phrase, token)` records in one pass.
    ///
    /// Records are grouped by `(bucket, length)`, each group is sorted on the
    /// rayon pool, and the sorted runs are installed directly as arrays. The
    /// sort is stable, so the result (including the order of duplicate keys)
    /// is identical to calling [`add_index`](Self::add_index) for each record
    /// in iteration order.
    ///
    /// Empty phrases and phrases of `MAX_PHRASE_LENGTH` or more are skipped.
    ///
    /// # Example
    /// ```
    /// use phrase_large_table::{PhraseBitmapIndex, PhraseTokens};
    ///
    /// let index = PhraseBitmapIndex::build_from_records(vec![
    ///     (vec![0x4F60, 0x597D], 1),
    ///     (vec![0x4E16, 0x754C], 2),
    ///     (vec![0x4F60], 3),
    /// ]);
    /// assert_eq!(index.len(), 3);
    ///
    /// let mut tokens = PhraseTokens::all_enabled();
    /// assert!(index.search(&[0x4F60], &mut tokens).is_continued());
    /// ```
    pub fn build_from_records<I, K>(records: I) -> Self
    where
        I: IntoIterator<Item = (K, PhraseToken)>,
        K: Into<Box<[Ucs4]>>,
    {
        let mut groups: FxHashMap<(usize, usize), RecordGroup> = FxHashMap::default();

        for (phrase, token) in records {
            let phrase: Box<[Ucs4]> = phrase.into();
            let Some(&first) = phrase.first() else {
                debug_note!("empty phrase skipped: token={:#010x}", token);
                continue;
            };
            if phrase.len() >= MAX_PHRASE_LENGTH {
                debug_note!(
                    "phrase too long skipped: len={}, token={:#010x}",
                    phrase.len(),
                    token
                );
                continue;
            }

            groups
                .entry((bucket_of(first), phrase.len()))
                .or_default()
                .push((phrase, token));
        }

        let mut groups: Vec<((usize, usize), RecordGroup)> = groups.into_iter().collect();
        groups
            .par_iter_mut()
            .for_each(|(_, records)| records.sort_by(|a, b| a.0.cmp(&b.0)));

        let mut index = PhraseBitmapIndex::new();
        for ((bucket, phrase_length), records) in &groups {
            index
                .bucket_mut(*bucket)
                .assign_sorted(*phrase_length, records);
        }
        index
    }
}
